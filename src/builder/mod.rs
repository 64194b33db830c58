//! Builder API for ergonomic machine construction.
//!
//! This module provides fluent builders and macros for defining branches,
//! events, callbacks and machines. Construction problems are collected and
//! reported as [`BuildError`]s rather than panicking.

pub mod branch;
pub mod callback;
pub mod error;
pub mod event;
pub mod machine;
pub mod macros;

pub use branch::BranchBuilder;
pub use callback::CallbackBuilder;
pub use error::BuildError;
pub use event::EventBuilder;
pub use machine::MachineBuilder;

use crate::core::State;

/// Create an event with a single `from -> to` transition.
///
/// # Example
///
/// ```
/// use switchyard::builder::simple_event;
/// use switchyard::state_enum;
///
/// state_enum! {
///     enum Light {
///         Red,
///         Green,
///     }
/// }
///
/// let event = simple_event::<(), Light>("go", Light::Red, Light::Green)
///     .unwrap()
///     .build();
/// assert_eq!(event.known_states(), &[Light::Red, Light::Green]);
/// ```
pub fn simple_event<O, S: State>(
    name: impl Into<String>,
    from: S,
    to: S,
) -> Result<EventBuilder<O, S>, BuildError> {
    EventBuilder::new(name).transition(BranchBuilder::new().from(from).to(to))
}
