//! Coordinated execution of several transitions on one object.
//!
//! A collection performs one transition per state attribute as a single
//! unit: before callbacks nest in collection order, every attribute is
//! persisted before actions run, and a failure anywhere rolls every
//! attribute back.

use crate::config::CollectionOptions;
use crate::core::State;
use crate::effects::transition::{BlockOutcome, RunOptions, Transition};
use crate::effects::truthy;
use crate::error::{Error, Interrupt};
use serde_json::Value;

/// Caller-supplied action run in place of the machines' own actions.
pub type ActionBlock<'a, O> = dyn FnMut(&mut O) -> Result<Value, Error> + 'a;

/// An ordered group of transitions performed all-or-nothing.
///
/// # Example
///
/// ```rust
/// use switchyard::builder::{simple_event, MachineBuilder};
/// use switchyard::config::CollectionOptions;
/// use switchyard::effects::TransitionCollection;
///
/// struct Vehicle {
///     state: Option<String>,
/// }
///
/// let machine = MachineBuilder::new("state")
///     .initial("parked".to_string())
///     .event(simple_event("ignite", "parked".to_string(), "idling".to_string()).unwrap())
///     .accessor(|v: &Vehicle| v.state.clone(), |v: &mut Vehicle, s| v.state = Some(s))
///     .build()
///     .unwrap();
///
/// let mut vehicle = Vehicle { state: Some("parked".to_string()) };
/// let transition = machine.transition_for(&vehicle, "ignite").unwrap();
///
/// let mut collection =
///     TransitionCollection::new([transition], CollectionOptions::default()).unwrap();
/// let result = collection.perform(&mut vehicle, None).unwrap();
///
/// assert_eq!(result, serde_json::Value::Bool(true));
/// assert_eq!(vehicle.state.as_deref(), Some("idling"));
/// ```
pub struct TransitionCollection<O, S> {
    transitions: Vec<Transition<O, S>>,
    valid: bool,
    options: CollectionOptions,
}

impl<O, S: State> TransitionCollection<O, S> {
    /// Build a collection.
    ///
    /// `None` items are failure markers: they are dropped, but a collection
    /// that received one never performs. Two transitions on the same
    /// attribute, or deferred after callbacks on a machine with around
    /// callbacks, are configuration errors.
    pub fn new(
        transitions: impl IntoIterator<Item = Option<Transition<O, S>>>,
        options: CollectionOptions,
    ) -> Result<Self, Error> {
        let mut valid = true;
        let mut kept: Vec<Transition<O, S>> = Vec::new();

        for transition in transitions {
            let Some(transition) = transition else {
                tracing::warn!("Transition collection received a failure marker");
                valid = false;
                continue;
            };

            if kept
                .iter()
                .any(|t| t.attribute() == transition.attribute())
            {
                return Err(Error::Configuration(format!(
                    "cannot perform multiple transitions in parallel for the same state machine attribute: {}",
                    transition.attribute()
                )));
            }

            if !options.after && transition.machine().has_around_callbacks() {
                return Err(Error::Configuration(format!(
                    "after callbacks cannot be deferred: {} machine has around callbacks",
                    transition.attribute()
                )));
            }

            kept.push(transition);
        }

        Ok(Self {
            transitions: kept,
            valid,
            options,
        })
    }

    pub fn transitions(&self) -> &[Transition<O, S>] {
        &self.transitions
    }

    pub fn into_transitions(self) -> Vec<Transition<O, S>> {
        self.transitions
    }

    pub fn options(&self) -> CollectionOptions {
        self.options
    }

    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    /// Whether no failure marker was supplied.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Distinct action names, in collection order.
    pub fn actions(&self) -> Vec<String> {
        let mut actions: Vec<String> = Vec::new();
        for name in self.transitions.iter().filter_map(|t| t.action_name()) {
            if !actions.iter().any(|a| a == name) {
                actions.push(name.to_string());
            }
        }
        actions
    }

    /// Perform every transition as one unit.
    ///
    /// With `block`, the block runs once in place of the machines' actions and
    /// its result is shared by every transition. Returns the action result
    /// when exactly one action ran, otherwise whether the whole unit
    /// succeeded. A collection that received a failure marker returns `false`
    /// without running anything; an empty one just runs the block.
    pub fn perform(
        &mut self,
        object: &mut O,
        block: Option<&mut ActionBlock<'_, O>>,
    ) -> Result<Value, Error> {
        if !self.valid {
            tracing::debug!("Skipping collection with failure markers");
            return Ok(Value::Bool(false));
        }

        if self.transitions.is_empty() {
            return match block {
                Some(block) => block(object),
                None => Ok(Value::Bool(true)),
            };
        }

        let actions = self.actions();
        let use_transactions = self.options.use_transactions
            && self.transitions[0].machine().settings().use_transactions;
        let transitions = &self.transitions;
        tracing::debug!(
            "Performing {} transition(s): {}",
            transitions.len(),
            describe(transitions)
        );

        let mut execution = Execution {
            options: self.options,
            block,
            actions,
            results: Vec::new(),
            success: false,
        };

        let mut run = |object: &mut O| -> Result<bool, Error> {
            match run_nested(transitions, 0, object, &mut execution) {
                Ok(()) => {}
                Err(Interrupt::Halt) => {
                    tracing::debug!("Collection halted: {}", describe(transitions))
                }
                Err(Interrupt::Error(e)) => return Err(e),
            }

            if !execution.success {
                tracing::debug!("Rolling back: {}", describe(transitions));
                for transition in transitions {
                    transition.rollback(object);
                }
            }
            Ok(execution.success)
        };

        let success = if use_transactions {
            transitions[0].within_transaction(object, &mut run)?
        } else {
            run(object)?
        };
        if success {
            tracing::debug!("Committed: {}", describe(transitions));
        }

        Ok(execution.outcome())
    }
}

struct Execution<'a, 'b, O> {
    options: CollectionOptions,
    block: Option<&'a mut ActionBlock<'b, O>>,
    actions: Vec<String>,
    results: Vec<(String, Value)>,
    success: bool,
}

impl<O> Execution<'_, '_, O> {
    fn result(&self, action: Option<&str>) -> Option<Value> {
        let action = action?;
        self.results
            .iter()
            .find(|(name, _)| name == action)
            .map(|(_, value)| value.clone())
    }

    fn outcome(&self) -> Value {
        match self.actions.as_slice() {
            [action] => self
                .result(Some(action))
                .unwrap_or(Value::Bool(self.success)),
            _ => Value::Bool(self.success),
        }
    }

    fn run_actions<S: State>(
        &mut self,
        transitions: &[Transition<O, S>],
        object: &mut O,
    ) -> Result<(), Error> {
        if let Some(block) = self.block.as_mut() {
            let result = block(object)?;
            for action in &self.actions {
                self.results.push((action.clone(), result.clone()));
            }
            self.success = truthy(&result);
            return Ok(());
        }

        if self.options.actions {
            for action in &self.actions {
                let owner = transitions
                    .iter()
                    .find(|t| t.action_name() == Some(action.as_str()));
                if let Some(transition) = owner {
                    let result = transition
                        .machine()
                        .run_action(object, transition.args())?;
                    self.results.push((action.clone(), result));
                }
            }
        }
        self.success = self.results.iter().all(|(_, value)| truthy(value));
        Ok(())
    }
}

/// Run transition `index`'s callbacks around the rest of the collection.
///
/// The innermost level persists every transition and runs the actions. A
/// halt from an inner transition is reported to the outer ones as a failed
/// block so that each of them still runs its failure callbacks.
fn run_nested<O, S: State>(
    transitions: &[Transition<O, S>],
    index: usize,
    object: &mut O,
    execution: &mut Execution<'_, '_, O>,
) -> Result<(), Interrupt> {
    let Some(transition) = transitions.get(index) else {
        return run_innermost(transitions, object, execution);
    };

    let options = RunOptions {
        before: true,
        after: execution.options.after,
    };
    let mut block = |object: &mut O| -> Result<BlockOutcome, Interrupt> {
        match run_nested(transitions, index + 1, object, &mut *execution) {
            Ok(()) => {}
            Err(Interrupt::Halt) => execution.success = false,
            Err(e) => return Err(e),
        }
        Ok(BlockOutcome {
            result: execution.result(transition.action_name()),
            success: execution.success,
        })
    };

    if transition.run_callbacks(object, options, Some(&mut block))? {
        Ok(())
    } else {
        Err(Interrupt::Halt)
    }
}

fn run_innermost<O, S: State>(
    transitions: &[Transition<O, S>],
    object: &mut O,
    execution: &mut Execution<'_, '_, O>,
) -> Result<(), Interrupt> {
    for transition in transitions {
        transition.persist(object);
    }

    if let Err(e) = execution.run_actions(transitions, object) {
        tracing::debug!("Action failed, rolling back: {}", e);
        for transition in transitions {
            transition.rollback(object);
        }
        return Err(e.into());
    }

    // After callbacks run in collection order here. Failure callbacks are
    // left to each level while unwinding, which reverses them.
    if execution.success && execution.options.after {
        for transition in transitions {
            transition.set_success(true);
            transition.run_after(object)?;
        }
    }
    Ok(())
}

fn describe<O, S: State>(transitions: &[Transition<O, S>]) -> String {
    transitions
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
