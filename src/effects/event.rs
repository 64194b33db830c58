//! Named events and transition resolution.

use crate::core::{Branch, Query, State};
use crate::effects::integration::{Invalidation, InvalidationReason};
use crate::effects::machine::Machine;
use crate::effects::transition::{RunOptions, Transition};
use crate::error::Error;
use serde_json::Value;
use std::fmt;
use std::sync::OnceLock;

/// An event owns the branches describing where it may go from each state.
///
/// Resolution walks the branches in declaration order and the first one
/// that matches the object wins.
pub struct Event<O, S> {
    name: String,
    qualified_name: String,
    human_name: String,
    branches: Vec<Branch<O, S>>,
    known_states: OnceLock<Vec<S>>,
}

impl<O, S: State> Event<O, S> {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            qualified_name: name.clone(),
            human_name: name.replace('_', " "),
            name,
            branches: Vec::new(),
            known_states: OnceLock::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name including the machine's namespace, e.g. `ignite_alarm`.
    pub fn qualified_name(&self) -> &str {
        &self.qualified_name
    }

    pub fn human_name(&self) -> &str {
        &self.human_name
    }

    pub(crate) fn set_human_name(&mut self, human_name: impl Into<String>) {
        self.human_name = human_name.into();
    }

    pub(crate) fn set_namespace(&mut self, namespace: Option<&str>) {
        self.qualified_name = match namespace {
            Some(namespace) => format!("{}_{}", self.name, namespace),
            None => self.name.clone(),
        };
    }

    pub fn branches(&self) -> &[Branch<O, S>] {
        &self.branches
    }

    pub(crate) fn into_branches(self) -> Vec<Branch<O, S>> {
        self.branches
    }

    pub fn add_branch(&mut self, branch: Branch<O, S>) {
        self.branches.push(branch);
        self.known_states = OnceLock::new();
    }

    /// States referenced by any branch, in order of first appearance.
    pub fn known_states(&self) -> &[S] {
        self.known_states.get_or_init(|| {
            let mut states: Vec<S> = Vec::new();
            for state in self.branches.iter().flat_map(|b| b.known_states()) {
                if !states.contains(state) {
                    states.push(state.clone());
                }
            }
            states
        })
    }

    /// Resolve the transition this event would perform.
    ///
    /// Without `query.from` the object's current state is used, and an
    /// unknown current state is an error. Within a branch, a `to` that was
    /// not requested explicitly is picked from the current state first, then
    /// the machine's states in order; a branch whose target matcher accepts
    /// none of them is skipped.
    pub fn transition_for(
        &self,
        machine: &Machine<O, S>,
        object: &O,
        query: &Query<S>,
    ) -> Result<Option<Transition<O, S>>, Error> {
        let custom_from = query.from.is_some();
        let from = match &query.from {
            Some(from) => from.clone(),
            None => machine.current_state(object)?,
        };
        let requirements = Query {
            from: Some(from.clone()),
            ..query.clone()
        };

        for branch in &self.branches {
            let Some(matched) = branch.match_requirement(object, &requirements) else {
                continue;
            };

            let to = if matched.to.is_loopback() {
                Some(from.clone())
            } else {
                let candidates = match &query.to {
                    Some(to) => vec![to.clone()],
                    None => std::iter::once(from.clone())
                        .chain(machine.state_values().iter().filter(|s| **s != from).cloned())
                        .collect(),
                };
                matched.to.filter(&candidates).into_iter().next()
            };

            if let Some(to) = to {
                tracing::debug!(
                    "Resolved {}: {} -> {} for {}",
                    self.name,
                    from.name(),
                    to.name(),
                    machine.attribute()
                );
                return Ok(Some(
                    Transition::new(machine, &self.name, from, to).transient(!custom_from),
                ));
            }
        }

        tracing::debug!(
            "No transition for {} from {} on {}",
            self.name,
            from.name(),
            machine.attribute()
        );
        Ok(None)
    }

    pub fn can_fire(
        &self,
        machine: &Machine<O, S>,
        object: &O,
        query: &Query<S>,
    ) -> Result<bool, Error> {
        Ok(self.transition_for(machine, object, query)?.is_some())
    }

    /// Fire the event. Returns `false` when no transition matched or the
    /// transition halted.
    pub fn fire(
        &self,
        machine: &Machine<O, S>,
        object: &mut O,
        args: Vec<Value>,
    ) -> Result<bool, Error> {
        machine.reset(object);
        match self.transition_for(machine, object, &Query::default())? {
            Some(mut transition) => transition.perform(object, args, true),
            None => {
                self.on_failure(machine, object, args)?;
                Ok(false)
            }
        }
    }

    /// Like [`fire`](Self::fire), but a `false` outcome becomes
    /// [`Error::InvalidTransition`].
    pub fn fire_strict(
        &self,
        machine: &Machine<O, S>,
        object: &mut O,
        args: Vec<Value>,
    ) -> Result<(), Error> {
        if self.fire(machine, object, args)? {
            return Ok(());
        }

        let state = machine
            .read(object)
            .map(|s| s.name().to_string())
            .unwrap_or_else(|| "nil".to_string());
        Err(Error::InvalidTransition {
            attribute: machine.attribute().to_string(),
            event: self.name.clone(),
            state,
        })
    }

    /// Record that the event could not fire and run failure callbacks on a
    /// loopback transition from the current state.
    pub fn on_failure(
        &self,
        machine: &Machine<O, S>,
        object: &mut O,
        args: Vec<Value>,
    ) -> Result<(), Error> {
        let state = machine.current_state(object)?;
        let invalidation = Invalidation::new(InvalidationReason::InvalidTransition)
            .param("event", self.human_name.clone())
            .param("state", state.name());
        machine.invalidate(object, &invalidation);

        let transition = Transition::new(machine, &self.name, state.clone(), state).with_args(args);
        transition.run_callbacks(
            object,
            RunOptions {
                before: false,
                after: true,
            },
            None,
        )?;
        Ok(())
    }
}

impl<O, S: fmt::Debug> fmt::Debug for Event<O, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("name", &self.name)
            .field("qualified_name", &self.qualified_name)
            .field("branches", &self.branches.len())
            .finish()
    }
}
