//! Guard predicates for branch and callback conditions.
//!
//! Guards are evaluated against the domain object being transitioned. A
//! branch only matches when all of its `if` guards pass and none of its
//! `unless` guards do.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Predicate over the domain object that controls whether a branch applies.
///
/// # Example
///
/// ```rust
/// use switchyard::core::Guard;
///
/// struct Vehicle {
///     seatbelt_on: bool,
/// }
///
/// let buckled = Guard::new(|v: &Vehicle| v.seatbelt_on);
///
/// assert!(buckled.check(&Vehicle { seatbelt_on: true }));
/// assert!(!buckled.check(&Vehicle { seatbelt_on: false }));
/// ```
pub struct Guard<O> {
    predicate: Arc<dyn Fn(&O) -> bool + Send + Sync>,
    _phantom: PhantomData<fn(&O)>,
}

impl<O> Guard<O> {
    /// Create a guard from a predicate.
    ///
    /// The predicate should not mutate anything it captures; guards may be
    /// evaluated any number of times while resolving a single event.
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&O) -> bool + Send + Sync + 'static,
    {
        Guard {
            predicate: Arc::new(predicate),
            _phantom: PhantomData,
        }
    }

    /// A guard that ignores the object.
    pub fn constant(value: bool) -> Self {
        Self::new(move |_: &O| value)
    }

    /// Check the guard against an object.
    pub fn check(&self, object: &O) -> bool {
        (self.predicate)(object)
    }
}

impl<O> Clone for Guard<O> {
    fn clone(&self) -> Self {
        Self {
            predicate: Arc::clone(&self.predicate),
            _phantom: PhantomData,
        }
    }
}

impl<O> fmt::Debug for Guard<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Guard(..)")
    }
}
