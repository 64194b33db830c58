//! The seam between a machine and the object it drives.
//!
//! A machine never touches an object's fields directly. Attribute reads and
//! writes, error invalidation and transaction boundaries all go through an
//! [`Integration`], which lets the same machine definition drive plain
//! structs, database rows or anything else.

use crate::error::Error;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Why an object was invalidated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidationReason {
    /// An event exists but cannot fire from the current state.
    InvalidTransition,
    /// No event with the requested name exists.
    InvalidEvent,
}

/// A failure recorded against an object's state attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct Invalidation {
    pub reason: InvalidationReason,
    pub params: Vec<(String, String)>,
}

impl Invalidation {
    pub fn new(reason: InvalidationReason) -> Self {
        Self {
            reason,
            params: Vec::new(),
        }
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Default English description of the failure.
    pub fn message(&self) -> String {
        match self.reason {
            InvalidationReason::InvalidTransition => {
                format!("cannot transition via \"{}\"", self.get("event").unwrap_or(""))
            }
            InvalidationReason::InvalidEvent => "is invalid".to_string(),
        }
    }
}

impl fmt::Display for Invalidation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

/// Attribute I/O, invalidation and transaction capabilities for objects of
/// type `O` holding states of type `S`.
///
/// Only `read` and `write` are required. The defaults record nothing and run
/// transaction blocks directly.
pub trait Integration<O, S>: Send + Sync {
    /// Current value of `attribute`, or `None` when unset.
    fn read(&self, object: &O, attribute: &str) -> Option<S>;

    fn write(&self, object: &mut O, attribute: &str, value: S);

    fn invalidate(&self, _object: &mut O, _attribute: &str, _invalidation: &Invalidation) {}

    fn reset_errors(&self, _object: &mut O) {}

    /// Run `block` inside a transaction. A block returning `Ok(false)` asks
    /// for the transaction to be rolled back.
    fn within_transaction(
        &self,
        object: &mut O,
        block: &mut dyn FnMut(&mut O) -> Result<bool, Error>,
    ) -> Result<bool, Error> {
        block(object)
    }
}

type Reader<O, S> = Arc<dyn Fn(&O) -> Option<S> + Send + Sync>;
type Writer<O, S> = Arc<dyn Fn(&mut O, S) + Send + Sync>;

/// Closure-backed integration for a single attribute.
///
/// # Example
///
/// ```rust
/// use switchyard::effects::{Accessor, Integration};
///
/// struct Vehicle {
///     state: Option<String>,
/// }
///
/// let accessor = Accessor::new(
///     |v: &Vehicle| v.state.clone(),
///     |v: &mut Vehicle, state| v.state = Some(state),
/// );
///
/// let mut vehicle = Vehicle { state: None };
/// accessor.write(&mut vehicle, "state", "parked".to_string());
/// assert_eq!(accessor.read(&vehicle, "state"), Some("parked".to_string()));
/// ```
pub struct Accessor<O, S> {
    reader: Reader<O, S>,
    writer: Writer<O, S>,
    _phantom: PhantomData<fn(&O) -> S>,
}

impl<O, S> Accessor<O, S> {
    pub fn new<R, W>(reader: R, writer: W) -> Self
    where
        R: Fn(&O) -> Option<S> + Send + Sync + 'static,
        W: Fn(&mut O, S) + Send + Sync + 'static,
    {
        Self {
            reader: Arc::new(reader),
            writer: Arc::new(writer),
            _phantom: PhantomData,
        }
    }
}

impl<O, S> Clone for Accessor<O, S> {
    fn clone(&self) -> Self {
        Self {
            reader: Arc::clone(&self.reader),
            writer: Arc::clone(&self.writer),
            _phantom: PhantomData,
        }
    }
}

impl<O, S> Integration<O, S> for Accessor<O, S> {
    fn read(&self, object: &O, _attribute: &str) -> Option<S> {
        (self.reader)(object)
    }

    fn write(&self, object: &mut O, _attribute: &str, value: S) {
        (self.writer)(object, value)
    }
}
