//! A single resolved state change.

use crate::config::CollectionOptions;
use crate::core::State;
use crate::effects::collection::TransitionCollection;
use crate::effects::machine::Machine;
use crate::error::{Error, Interrupt};
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::fmt;

/// Which callback phases [`Transition::run_callbacks`] runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    pub before: bool,
    pub after: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            before: true,
            after: true,
        }
    }
}

/// What the block run between the before and after phases reports back.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockOutcome {
    pub result: Option<Value>,
    pub success: bool,
}

impl Default for BlockOutcome {
    fn default() -> Self {
        Self {
            result: None,
            success: true,
        }
    }
}

pub(crate) type Block<'a, O> = dyn FnMut(&mut O) -> Result<BlockOutcome, Interrupt> + 'a;

/// One state change of one attribute, from `from` to `to` via `event`.
///
/// Transitions do not hold the object they change: every operation takes it
/// explicitly. Execution flags use interior mutability so that the callbacks
/// of several transitions can nest while each of them is borrowed.
///
/// Two transitions are equal when they change the same attribute through the
/// same event between the same states.
pub struct Transition<O, S> {
    machine: Machine<O, S>,
    event: String,
    from: S,
    to: S,
    args: Vec<Value>,
    transient: bool,
    result: RefCell<Option<Value>>,
    persisted: Cell<bool>,
    before_run: Cell<bool>,
    after_run: Cell<bool>,
    success: Cell<bool>,
    unwind_halted: Cell<bool>,
}

impl<O, S: State> Transition<O, S> {
    pub fn new(machine: &Machine<O, S>, event: impl Into<String>, from: S, to: S) -> Self {
        Self {
            machine: machine.clone(),
            event: event.into(),
            from,
            to,
            args: Vec::new(),
            transient: false,
            result: RefCell::new(None),
            persisted: Cell::new(false),
            before_run: Cell::new(false),
            after_run: Cell::new(false),
            success: Cell::new(false),
            unwind_halted: Cell::new(false),
        }
    }

    pub(crate) fn transient(mut self, transient: bool) -> Self {
        self.transient = transient;
        self
    }

    pub fn with_args(mut self, args: Vec<Value>) -> Self {
        self.args = args;
        self
    }

    pub fn machine(&self) -> &Machine<O, S> {
        &self.machine
    }

    pub fn attribute(&self) -> &str {
        self.machine.attribute()
    }

    pub fn event(&self) -> &str {
        &self.event
    }

    /// The event name with the machine's namespace applied.
    pub fn qualified_event(&self) -> String {
        self.machine.qualify(&self.event)
    }

    pub fn from(&self) -> &S {
        &self.from
    }

    pub fn to(&self) -> &S {
        &self.to
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    pub fn set_args(&mut self, args: Vec<Value>) {
        self.args = args;
    }

    /// Result of the action, once one has run.
    pub fn result(&self) -> Option<Value> {
        self.result.borrow().clone()
    }

    /// Whether `from` was read from the object rather than supplied.
    pub fn is_transient(&self) -> bool {
        self.transient
    }

    pub fn is_loopback(&self) -> bool {
        self.from == self.to
    }

    pub fn action_name(&self) -> Option<&str> {
        self.machine.action_name()
    }

    pub fn is_persisted(&self) -> bool {
        self.persisted.get()
    }

    /// Whether an around handler halted after its continuation returned.
    pub(crate) fn is_unwind_halted(&self) -> bool {
        self.unwind_halted.get()
    }

    pub(crate) fn mark_unwind_halted(&self) {
        self.unwind_halted.set(true);
    }

    /// Whether the last run's block reported success.
    pub fn is_successful(&self) -> bool {
        self.success.get()
    }

    /// Write `to` into the object. Only the first call writes until
    /// [`reset`](Self::reset) or [`rollback`](Self::rollback).
    pub fn persist(&self, object: &mut O) {
        if !self.persisted.get() {
            self.machine.write(object, self.to.clone());
            self.persisted.set(true);
        }
    }

    /// Write `from` back into the object.
    pub fn rollback(&self, object: &mut O) {
        self.persisted.set(false);
        self.machine.write(object, self.from.clone());
    }

    /// Clear the execution flags so the transition can run again.
    pub fn reset(&self) {
        self.before_run.set(false);
        self.persisted.set(false);
        self.after_run.set(false);
        self.unwind_halted.set(false);
    }

    pub fn within_transaction(
        &self,
        object: &mut O,
        block: &mut dyn FnMut(&mut O) -> Result<bool, Error>,
    ) -> Result<bool, Error> {
        self.machine.within_transaction(object, block)
    }

    /// Run the machine's callbacks around `block`.
    ///
    /// Before and around callbacks run first, in declaration order, each
    /// around callback wrapping the rest of the phase, the block and the after
    /// callbacks that follow a successful block. Failure callbacks run once
    /// the around chain is gone, when the block fails or the before phase
    /// halted. Returns whether the before phase completed.
    ///
    /// Skipping after callbacks is a configuration error when the machine has
    /// around callbacks, since their continuations cannot be suspended.
    pub fn run_callbacks(
        &self,
        object: &mut O,
        options: RunOptions,
        mut block: Option<&mut Block<'_, O>>,
    ) -> Result<bool, Error> {
        if !options.after && self.machine.has_around_callbacks() {
            return Err(Error::Configuration(format!(
                "after callbacks cannot be deferred: {} machine has around callbacks",
                self.attribute()
            )));
        }

        self.success.set(false);
        self.unwind_halted.set(false);
        let halted = if options.before {
            match run_before(self, object, 0, options.after, &mut block) {
                Ok(()) => false,
                Err(Interrupt::Halt) => {
                    tracing::debug!("Callbacks halted for {}", self);
                    true
                }
                Err(Interrupt::Error(e)) => return Err(e),
            }
        } else {
            false
        };

        if !(self.before_run.get() && halted) && (options.after || !self.success.get()) {
            self.run_after(object)?;
        }

        Ok(self.before_run.get())
    }

    /// Run after or failure callbacks, once.
    pub(crate) fn run_after(&self, object: &mut O) -> Result<(), Error> {
        if self.after_run.get() {
            return Ok(());
        }

        let callbacks = if self.success.get() {
            self.machine.after_callbacks()
        } else {
            self.machine.failure_callbacks()
        };
        for callback in callbacks {
            match callback.call(object, self) {
                Ok(_) => {}
                Err(Interrupt::Halt) => break,
                Err(Interrupt::Error(e)) => return Err(e),
            }
        }

        self.after_run.set(true);
        Ok(())
    }

    pub(crate) fn set_success(&self, success: bool) {
        self.success.set(success);
    }

    /// Perform this transition on its own: callbacks, persistence and,
    /// when `run_action` is set, the machine's action.
    pub fn perform(&mut self, object: &mut O, args: Vec<Value>, run_action: bool) -> Result<bool, Error> {
        self.args = args;

        let mut options = CollectionOptions::default();
        if !run_action {
            options = options.skip_actions();
        }

        let mut collection = TransitionCollection::new([Some(self.clone())], options)?;
        let result = collection.perform(object, None)?;
        if let Some(transition) = collection.into_transitions().pop() {
            *self = transition;
        }

        Ok(crate::effects::truthy(&result))
    }
}

fn run_before<O, S: State>(
    transition: &Transition<O, S>,
    object: &mut O,
    start: usize,
    after: bool,
    block: &mut Option<&mut Block<'_, O>>,
) -> Result<(), Interrupt> {
    if !transition.before_run.get() {
        let callbacks = transition.machine.before_callbacks();
        let mut index = start;

        while let Some(callback) = callbacks.get(index) {
            index += 1;

            if !callback.is_around() {
                callback.call(object, transition)?;
                continue;
            }

            // The around callback wraps everything after it. A failed block
            // cancels the chain so its after-yield code never runs.
            let mut cancelled = false;
            let outcome = {
                let mut rest = |object: &mut O| -> Result<(), Interrupt> {
                    run_before(transition, object, index, after, &mut *block)?;
                    if transition.success.get() {
                        Ok(())
                    } else {
                        cancelled = true;
                        Err(Interrupt::Halt)
                    }
                };
                callback.call_around(object, transition, &mut rest)
            };

            match outcome {
                Ok(true) => return Ok(()),
                Ok(false) => {}
                Err(Interrupt::Halt) if cancelled => return Ok(()),
                Err(e) => return Err(e),
            }
        }

        transition.before_run.set(true);
    }

    let outcome = match block.as_mut() {
        Some(block) => block(object)?,
        None => BlockOutcome::default(),
    };
    *transition.result.borrow_mut() = outcome.result;
    transition.success.set(outcome.success);
    if after && outcome.success {
        transition.run_after(object)?;
    }
    Ok(())
}

impl<O, S: Clone> Clone for Transition<O, S> {
    fn clone(&self) -> Self {
        Self {
            machine: self.machine.clone(),
            event: self.event.clone(),
            from: self.from.clone(),
            to: self.to.clone(),
            args: self.args.clone(),
            transient: self.transient,
            result: self.result.clone(),
            persisted: self.persisted.clone(),
            before_run: self.before_run.clone(),
            after_run: self.after_run.clone(),
            success: self.success.clone(),
            unwind_halted: self.unwind_halted.clone(),
        }
    }
}

impl<O, S: PartialEq> PartialEq for Transition<O, S> {
    fn eq(&self, other: &Self) -> bool {
        self.machine.attribute() == other.machine.attribute()
            && self.event == other.event
            && self.from == other.from
            && self.to == other.to
    }
}

impl<O, S: State> fmt::Display for Transition<O, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} --{}--> {}",
            self.attribute(),
            self.from.name(),
            self.event,
            self.to.name()
        )
    }
}

impl<O, S: fmt::Debug> fmt::Debug for Transition<O, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transition")
            .field("attribute", &self.machine.attribute())
            .field("event", &self.event)
            .field("from", &self.from)
            .field("to", &self.to)
            .field("args", &self.args)
            .field("result", &self.result.borrow())
            .field("transient", &self.transient)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{CallbackBuilder, MachineBuilder};
    use serde_json::json;

    #[derive(Default, Debug)]
    struct Vehicle {
        state: Option<String>,
        writes: usize,
        log: Vec<String>,
    }

    fn s(value: &str) -> String {
        value.to_string()
    }

    fn parked() -> Vehicle {
        Vehicle {
            state: Some(s("parked")),
            ..Vehicle::default()
        }
    }

    type Callbacks = CallbackBuilder<Vehicle, String>;

    fn builder() -> MachineBuilder<Vehicle, String> {
        MachineBuilder::new("state")
            .initial(s("parked"))
            .states([s("parked"), s("idling")])
            .accessor(
                |v: &Vehicle| v.state.clone(),
                |v: &mut Vehicle, state| {
                    v.writes += 1;
                    v.state = Some(state);
                },
            )
    }

    fn log(label: &'static str) -> impl Fn(&mut Vehicle, &Transition<Vehicle, String>) -> Result<(), Interrupt> {
        move |v, _| {
            v.log.push(label.to_string());
            Ok(())
        }
    }

    fn ignite(machine: &Machine<Vehicle, String>) -> Transition<Vehicle, String> {
        Transition::new(machine, "ignite", s("parked"), s("idling"))
    }

    #[test]
    fn persist_is_idempotent_until_reset() {
        let machine = builder().build().unwrap();
        let transition = ignite(&machine);
        let mut vehicle = parked();

        transition.persist(&mut vehicle);
        vehicle.state = Some(s("parked"));
        transition.persist(&mut vehicle);

        assert_eq!(vehicle.writes, 1);
        assert_eq!(vehicle.state.as_deref(), Some("parked"));

        transition.reset();
        transition.persist(&mut vehicle);
        assert_eq!(vehicle.writes, 2);
        assert_eq!(vehicle.state.as_deref(), Some("idling"));
    }

    #[test]
    fn rollback_writes_from_state() {
        let machine = builder().build().unwrap();
        let transition = ignite(&machine);
        let mut vehicle = parked();

        transition.persist(&mut vehicle);
        transition.rollback(&mut vehicle);

        assert_eq!(vehicle.state.as_deref(), Some("parked"));
        assert!(!transition.is_persisted());
    }

    #[test]
    fn equality_ignores_args_and_results() {
        let machine = builder().build().unwrap();
        let first = ignite(&machine).with_args(vec![json!(1)]);
        let second = ignite(&machine);
        let park = Transition::new(&machine, "park", s("idling"), s("parked"));

        assert_eq!(first, second);
        assert_ne!(first, park);
        assert!(!first.is_loopback());
        assert_eq!(first.to_string(), "state: parked --ignite--> idling");
    }

    #[test]
    fn run_callbacks_orders_phases() {
        let machine = builder()
            .callback(Callbacks::before().run(log("before")))
            .unwrap()
            .callback(Callbacks::after().run(log("after")))
            .unwrap()
            .callback(Callbacks::failure().run(log("failure")))
            .unwrap()
            .build()
            .unwrap();
        let transition = ignite(&machine);
        let mut vehicle = parked();

        let completed = transition
            .run_callbacks(
                &mut vehicle,
                RunOptions::default(),
                Some(&mut |v: &mut Vehicle| -> Result<BlockOutcome, Interrupt> {
                    v.log.push(s("block"));
                    Ok(BlockOutcome {
                        result: Some(json!("done")),
                        success: true,
                    })
                }),
            )
            .unwrap();

        assert!(completed);
        assert!(transition.is_successful());
        assert_eq!(transition.result(), Some(json!("done")));
        assert_eq!(vehicle.log, vec!["before", "block", "after"]);
    }

    #[test]
    fn failed_block_runs_failure_callbacks() {
        let machine = builder()
            .callback(Callbacks::after().run(log("after")))
            .unwrap()
            .callback(Callbacks::failure().run(log("failure")))
            .unwrap()
            .build()
            .unwrap();
        let transition = ignite(&machine);
        let mut vehicle = parked();

        let completed = transition
            .run_callbacks(
                &mut vehicle,
                RunOptions::default(),
                Some(&mut |_: &mut Vehicle| -> Result<BlockOutcome, Interrupt> {
                    Ok(BlockOutcome {
                        result: None,
                        success: false,
                    })
                }),
            )
            .unwrap();

        assert!(completed);
        assert_eq!(vehicle.log, vec!["failure"]);
    }

    #[test]
    fn before_halt_skips_block_and_runs_failure_callbacks() {
        let machine = builder()
            .callback(Callbacks::before().run(|_: &mut Vehicle, _: &Transition<Vehicle, String>| -> Result<(), Interrupt> {
                crate::halt()
            }))
            .unwrap()
            .callback(Callbacks::after().run(log("after")))
            .unwrap()
            .callback(Callbacks::failure().run(log("failure")))
            .unwrap()
            .build()
            .unwrap();
        let transition = ignite(&machine);
        let mut vehicle = parked();

        let completed = transition
            .run_callbacks(
                &mut vehicle,
                RunOptions::default(),
                Some(&mut |v: &mut Vehicle| -> Result<BlockOutcome, Interrupt> {
                    v.log.push(s("block"));
                    Ok(BlockOutcome::default())
                }),
            )
            .unwrap();

        assert!(!completed);
        assert_eq!(vehicle.log, vec!["failure"]);
    }

    #[test]
    fn around_callbacks_wrap_block() {
        let machine = builder()
            .callback(Callbacks::around().run_around(|v, _, next| {
                v.log.push(s("A-before"));
                next.run(v)?;
                v.log.push(s("A-after"));
                Ok(())
            }))
            .unwrap()
            .callback(Callbacks::around().run_around(|v, _, next| {
                v.log.push(s("B-before"));
                next.run(v)?;
                v.log.push(s("B-after"));
                Ok(())
            }))
            .unwrap()
            .callback(Callbacks::after().run(log("after")))
            .unwrap()
            .build()
            .unwrap();
        let transition = ignite(&machine);
        let mut vehicle = parked();

        transition
            .run_callbacks(
                &mut vehicle,
                RunOptions::default(),
                Some(&mut |v: &mut Vehicle| -> Result<BlockOutcome, Interrupt> {
                    v.log.push(s("action"));
                    Ok(BlockOutcome::default())
                }),
            )
            .unwrap();

        assert_eq!(
            vehicle.log,
            vec!["A-before", "B-before", "action", "after", "B-after", "A-after"]
        );
    }

    #[test]
    fn after_callbacks_run_inside_around_on_every_entry_point() {
        let machine = builder()
            .event(crate::builder::simple_event("ignite", s("parked"), s("idling")).unwrap())
            .action("start", |v: &mut Vehicle, _: &[Value]| {
                v.log.push(s("action"));
                Ok(true)
            })
            .callback(Callbacks::around().run_around(|v, _, next| {
                v.log.push(s("A-before"));
                next.run(v)?;
                v.log.push(s("A-after"));
                Ok(())
            }))
            .unwrap()
            .callback(Callbacks::after().run(log("after")))
            .unwrap()
            .build()
            .unwrap();

        let mut fired = parked();
        assert!(machine.fire(&mut fired, "ignite", vec![]).unwrap());

        let mut direct = parked();
        ignite(&machine)
            .run_callbacks(
                &mut direct,
                RunOptions::default(),
                Some(&mut |v: &mut Vehicle| -> Result<BlockOutcome, Interrupt> {
                    v.log.push(s("action"));
                    Ok(BlockOutcome::default())
                }),
            )
            .unwrap();

        assert_eq!(fired.log, vec!["A-before", "action", "after", "A-after"]);
        assert_eq!(direct.log, fired.log);
    }

    #[test]
    fn unwind_halt_in_inner_around_callback_keeps_outer_after_code() {
        let machine = builder()
            .callback(Callbacks::around().run_around(|v, _, next| {
                v.log.push(s("A-before"));
                next.run(v)?;
                v.log.push(s("A-after"));
                Ok(())
            }))
            .unwrap()
            .callback(Callbacks::around().run_around(|v, _, next| {
                v.log.push(s("B-before"));
                next.run(v)?;
                crate::halt::<()>()?;
                v.log.push(s("B-after"));
                Ok(())
            }))
            .unwrap()
            .callback(Callbacks::failure().run(log("failure")))
            .unwrap()
            .build()
            .unwrap();
        let transition = ignite(&machine);
        let mut vehicle = parked();

        let completed = transition
            .run_callbacks(
                &mut vehicle,
                RunOptions::default(),
                Some(&mut |v: &mut Vehicle| -> Result<BlockOutcome, Interrupt> {
                    v.log.push(s("action"));
                    Ok(BlockOutcome::default())
                }),
            )
            .unwrap();

        assert!(completed);
        assert!(transition.is_successful());
        assert_eq!(vehicle.log, vec!["A-before", "B-before", "action", "A-after"]);
    }

    #[test]
    fn failed_block_cancels_around_after_code() {
        let machine = builder()
            .callback(Callbacks::around().run_around(|v, _, next| {
                next.run(v)?;
                v.log.push(s("around-after"));
                Ok(())
            }))
            .unwrap()
            .callback(Callbacks::failure().run(log("failure")))
            .unwrap()
            .build()
            .unwrap();
        let transition = ignite(&machine);
        let mut vehicle = parked();

        let completed = transition
            .run_callbacks(
                &mut vehicle,
                RunOptions::default(),
                Some(&mut |_: &mut Vehicle| -> Result<BlockOutcome, Interrupt> {
                    Ok(BlockOutcome {
                        result: None,
                        success: false,
                    })
                }),
            )
            .unwrap();

        assert!(completed);
        assert_eq!(vehicle.log, vec!["failure"]);
    }

    #[test]
    fn deferring_after_with_around_callbacks_is_rejected() {
        let machine = builder()
            .callback(Callbacks::around().run_around(|v, _, next| next.run(v)))
            .unwrap()
            .build()
            .unwrap();
        let transition = ignite(&machine);
        let mut vehicle = parked();

        let result = transition.run_callbacks(
            &mut vehicle,
            RunOptions {
                before: true,
                after: false,
            },
            None,
        );

        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn skipping_before_runs_failure_callbacks_only() {
        let machine = builder()
            .callback(Callbacks::before().run(log("before")))
            .unwrap()
            .callback(Callbacks::failure().run(log("failure")))
            .unwrap()
            .build()
            .unwrap();
        let transition = Transition::new(&machine, "ignite", s("idling"), s("idling"));
        let mut vehicle = parked();

        let completed = transition
            .run_callbacks(
                &mut vehicle,
                RunOptions {
                    before: false,
                    after: true,
                },
                None,
            )
            .unwrap();

        assert!(!completed);
        assert_eq!(vehicle.log, vec!["failure"]);
    }

    #[test]
    fn perform_persists_and_reports_success() {
        let machine = builder().build().unwrap();
        let mut transition = ignite(&machine);
        let mut vehicle = parked();

        assert!(transition.perform(&mut vehicle, vec![], true).unwrap());
        assert_eq!(vehicle.state.as_deref(), Some("idling"));
        assert!(transition.is_persisted());
    }
}
