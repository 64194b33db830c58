//! The engine: machines, events, callbacks and transition execution.
//!
//! Everything here that touches a domain object goes through the
//! [`Integration`] seam, so the pure matching rules in [`crate::core`] stay
//! free of I/O.
//!
//! # Key Concepts
//!
//! - **Machine**: one state attribute with its events, callbacks and action
//! - **Transition**: a resolved change of that attribute, persisted or rolled back
//! - **TransitionCollection**: several transitions performed all-or-nothing

pub(crate) mod callback;
mod collection;
mod event;
mod integration;
pub(crate) mod machine;
mod registry;
mod transition;

pub use callback::{AroundHandler, Callback, CallbackKind, Handler, Next, Terminator};
pub use collection::{ActionBlock, TransitionCollection};
pub use event::Event;
pub use integration::{Accessor, Integration, Invalidation, InvalidationReason};
pub use machine::Machine;
pub use registry::MachineCollection;
pub use transition::{BlockOutcome, RunOptions, Transition};

use serde_json::Value;

/// Whether a handler or action result counts as success.
///
/// Only `null` and `false` are falsy.
pub fn truthy(value: &Value) -> bool {
    !matches!(value, Value::Null | Value::Bool(false))
}
