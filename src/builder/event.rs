//! Builder for events.

use crate::builder::branch::BranchBuilder;
use crate::builder::error::{check, validate, BuildError};
use crate::core::State;
use crate::effects::Event;

/// Fluent builder for [`Event`].
///
/// Each [`transition`](Self::transition) adds one branch. The branch is
/// restricted to this event automatically, so it may not name events itself.
///
/// # Example
///
/// ```rust
/// use switchyard::builder::{BranchBuilder, EventBuilder};
/// use switchyard::effects::Event;
///
/// let event: Event<(), String> = EventBuilder::new("ignite")
///     .transition(BranchBuilder::new().from("parked".to_string()).to("idling".to_string()))
///     .unwrap()
///     .build();
///
/// assert_eq!(event.branches().len(), 1);
/// assert_eq!(event.known_states(), &["parked".to_string(), "idling".to_string()]);
/// ```
pub struct EventBuilder<O, S> {
    event: Event<O, S>,
}

impl<O, S: State> EventBuilder<O, S> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            event: Event::new(name),
        }
    }

    pub fn name(&self) -> &str {
        self.event.name()
    }

    /// Override the default human name (the name with spaces).
    pub fn human_name(mut self, human_name: impl Into<String>) -> Self {
        self.event.set_human_name(human_name);
        self
    }

    /// Add a branch.
    pub fn transition(mut self, branch: BranchBuilder<O, S>) -> Result<Self, BuildError> {
        validate(vec![
            check(
                !branch.has_event_requirement(),
                BuildError::EventRequirementNotAllowed,
            ),
            check(
                branch.has_state_requirements(),
                BuildError::NoRequirements {
                    event: self.event.name().to_string(),
                },
            ),
        ])?;

        let branch = branch.on(self.event.name()).build()?;
        self.event.add_branch(branch);
        Ok(self)
    }

    pub(crate) fn merge(mut self, other: EventBuilder<O, S>) -> Self {
        for branch in other.event.into_branches() {
            self.event.add_branch(branch);
        }
        self
    }

    pub fn build(self) -> Event<O, S> {
        self.event
    }
}
