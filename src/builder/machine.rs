//! Builder for constructing state machines.

use crate::builder::callback::CallbackBuilder;
use crate::builder::error::BuildError;
use crate::builder::event::EventBuilder;
use crate::config::Settings;
use crate::core::State;
use crate::effects::machine::{Action, Definition, Initial};
use crate::effects::{Accessor, Callback, CallbackKind, Integration, Machine, Terminator};
use crate::error::Error;
use serde_json::Value;
use std::sync::Arc;

/// Builder for constructing machines with a fluent API.
///
/// Known states are collected in declaration order: the fixed initial
/// state, explicitly listed states, then states referenced by events and
/// callbacks.
pub struct MachineBuilder<O, S> {
    attribute: String,
    namespace: Option<String>,
    initial: Option<Initial<O, S>>,
    states: Vec<S>,
    events: Vec<EventBuilder<O, S>>,
    callbacks: Vec<Callback<O, S>>,
    action: Option<Action<O>>,
    settings: Settings,
    terminator: Option<Terminator>,
    integration: Option<Arc<dyn Integration<O, S>>>,
}

impl<O: 'static, S: State + 'static> MachineBuilder<O, S> {
    /// Create a builder for the machine driving `attribute`.
    pub fn new(attribute: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            namespace: None,
            initial: None,
            states: Vec::new(),
            events: Vec::new(),
            callbacks: Vec::new(),
            action: None,
            settings: Settings::default(),
            terminator: None,
            integration: None,
        }
    }

    /// Suffix event names with `namespace` when qualifying them.
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn initial(mut self, state: S) -> Self {
        self.initial = Some(Initial::Fixed(state));
        self
    }

    /// Derive the initial state from the object.
    pub fn initial_with<F>(mut self, initial: F) -> Self
    where
        F: Fn(&O) -> S + Send + Sync + 'static,
    {
        self.initial = Some(Initial::Dynamic(Arc::new(initial)));
        self
    }

    pub fn state(mut self, state: S) -> Self {
        self.states.push(state);
        self
    }

    pub fn states(mut self, states: impl IntoIterator<Item = S>) -> Self {
        self.states.extend(states);
        self
    }

    /// Add an event. Branches of an event with the same name are appended to
    /// the existing one.
    pub fn event(mut self, event: EventBuilder<O, S>) -> Self {
        match self.events.iter().position(|e| e.name() == event.name()) {
            Some(index) => {
                let existing = self.events.remove(index);
                self.events.insert(index, existing.merge(event));
            }
            None => self.events.push(event),
        }
        self
    }

    /// Add a callback using a builder.
    /// Returns an error if the builder fails validation.
    pub fn callback(mut self, builder: CallbackBuilder<O, S>) -> Result<Self, BuildError> {
        self.callbacks.push(builder.build()?);
        Ok(self)
    }

    /// Set the action run after the new state is persisted.
    pub fn action<F, R>(mut self, name: impl Into<String>, action: F) -> Self
    where
        F: Fn(&mut O, &[Value]) -> Result<R, Error> + Send + Sync + 'static,
        R: Into<Value>,
    {
        self.action = Some(Action {
            name: name.into(),
            run: Arc::new(move |object: &mut O, args: &[Value]| -> Result<Value, Error> {
                action(object, args).map(Into::into)
            }),
        });
        self
    }

    /// Read and write the attribute through a pair of closures.
    pub fn accessor<R, W>(self, reader: R, writer: W) -> Self
    where
        R: Fn(&O) -> Option<S> + Send + Sync + 'static,
        W: Fn(&mut O, S) + Send + Sync + 'static,
    {
        self.integration(Accessor::new(reader, writer))
    }

    pub fn integration(mut self, integration: impl Integration<O, S> + 'static) -> Self {
        self.integration = Some(Arc::new(integration));
        self
    }

    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    /// Default terminator for callbacks that do not set their own. Takes
    /// precedence over `halt_on_false`.
    pub fn terminator<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.terminator = Some(Arc::new(predicate));
        self
    }

    /// Build the machine.
    /// Returns an error if no integration was configured.
    pub fn build(self) -> Result<Machine<O, S>, BuildError> {
        let integration = self.integration.ok_or_else(|| BuildError::MissingIntegration {
            attribute: self.attribute.clone(),
        })?;

        let terminator: Option<Terminator> = match self.terminator {
            Some(terminator) => Some(terminator),
            None if self.settings.halt_on_false => {
                let halt_on_false: Terminator = Arc::new(|value: &Value| value == &Value::Bool(false));
                Some(halt_on_false)
            }
            None => None,
        };

        let events: Vec<_> = self
            .events
            .into_iter()
            .map(|builder| {
                let mut event = builder.build();
                event.set_namespace(self.namespace.as_deref());
                event
            })
            .collect();

        let mut states: Vec<S> = Vec::new();
        let fixed = match &self.initial {
            Some(Initial::Fixed(state)) => Some(state),
            _ => None,
        };
        let referenced = fixed
            .into_iter()
            .chain(&self.states)
            .chain(events.iter().flat_map(|e| e.known_states()))
            .chain(self.callbacks.iter().flat_map(|c| c.branch().known_states()));
        for state in referenced {
            if !states.contains(state) {
                states.push(state.clone());
            }
        }

        let mut before = Vec::new();
        let mut after = Vec::new();
        let mut failure = Vec::new();
        for callback in self.callbacks {
            let callback = callback.with_default_terminator(terminator.as_ref());
            match callback.kind() {
                CallbackKind::Before | CallbackKind::Around => before.push(callback),
                CallbackKind::After => after.push(callback),
                CallbackKind::Failure => failure.push(callback),
            }
        }

        tracing::debug!(
            "Built {} machine with {} states and {} events",
            self.attribute,
            states.len(),
            events.len()
        );

        Ok(Machine::from_definition(Definition {
            attribute: self.attribute,
            namespace: self.namespace,
            initial: self.initial,
            states,
            events,
            before,
            after,
            failure,
            action: self.action,
            settings: self.settings,
            integration,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{simple_event, BranchBuilder};
    use crate::effects::Transition;
    use crate::error::Interrupt;

    #[derive(Default)]
    struct Vehicle {
        state: Option<String>,
        log: Vec<String>,
    }

    fn s(value: &str) -> String {
        value.to_string()
    }

    fn builder() -> MachineBuilder<Vehicle, String> {
        MachineBuilder::new("state").accessor(
            |v: &Vehicle| v.state.clone(),
            |v: &mut Vehicle, state| v.state = Some(state),
        )
    }

    #[test]
    fn builder_requires_integration() {
        let result = MachineBuilder::<Vehicle, String>::new("state")
            .initial(s("parked"))
            .build();

        assert!(matches!(
            result,
            Err(BuildError::MissingIntegration { attribute }) if attribute == "state"
        ));
    }

    #[test]
    fn states_are_collected_in_order() {
        let machine = builder()
            .initial(s("parked"))
            .states([s("stalled"), s("parked")])
            .event(simple_event("ignite", s("parked"), s("idling")).unwrap())
            .callback(
                CallbackBuilder::after()
                    .to(s("first_gear"))
                    .run(|_: &mut Vehicle, _: &Transition<Vehicle, String>| Ok(())),
            )
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(
            machine.state_values(),
            &[s("parked"), s("stalled"), s("idling"), s("first_gear")]
        );
    }

    #[test]
    fn events_with_same_name_are_merged() {
        let machine = builder()
            .initial(s("parked"))
            .event(simple_event("ignite", s("parked"), s("idling")).unwrap())
            .event(
                EventBuilder::new("ignite")
                    .transition(BranchBuilder::new().from(s("stalled")).loopback())
                    .unwrap(),
            )
            .build()
            .unwrap();

        assert_eq!(machine.events().len(), 1);
        assert_eq!(machine.events()[0].branches().len(), 2);
    }

    #[test]
    fn callbacks_are_split_by_kind() {
        let noop = |_: &mut Vehicle, _: &Transition<Vehicle, String>| -> Result<(), Interrupt> { Ok(()) };
        let machine = builder()
            .initial(s("parked"))
            .callback(CallbackBuilder::before().run(noop))
            .unwrap()
            .callback(CallbackBuilder::around().run_around(|v, _, next| next.run(v)))
            .unwrap()
            .callback(CallbackBuilder::after().run(noop))
            .unwrap()
            .callback(CallbackBuilder::failure().run(noop))
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(machine.before_callbacks().len(), 2);
        assert!(machine.before_callbacks()[1].is_around());
        assert_eq!(machine.after_callbacks().len(), 1);
        assert_eq!(machine.failure_callbacks().len(), 1);
    }

    #[test]
    fn halt_on_false_installs_default_terminator() {
        let machine = builder()
            .initial(s("parked"))
            .event(simple_event("ignite", s("parked"), s("idling")).unwrap())
            .settings(Settings {
                halt_on_false: true,
                ..Settings::default()
            })
            .callback(
                CallbackBuilder::before()
                    .run(|_: &mut Vehicle, _: &Transition<Vehicle, String>| Ok(false)),
            )
            .unwrap()
            .callback(CallbackBuilder::before().run(
                |v: &mut Vehicle, _: &Transition<Vehicle, String>| -> Result<(), Interrupt> {
                    v.log.push(s("second"));
                    Ok(())
                },
            ))
            .unwrap()
            .build()
            .unwrap();
        let mut vehicle = Vehicle {
            state: Some(s("parked")),
            ..Vehicle::default()
        };

        assert!(machine.before_callbacks()[0].has_terminator());
        assert!(!machine.fire(&mut vehicle, "ignite", vec![]).unwrap());
        assert_eq!(vehicle.state.as_deref(), Some("parked"));
        assert!(vehicle.log.is_empty());
    }

    #[test]
    fn custom_default_terminator() {
        let machine = builder()
            .initial(s("parked"))
            .terminator(|value| value.is_string())
            .callback(
                CallbackBuilder::before()
                    .run(|_: &mut Vehicle, _: &Transition<Vehicle, String>| Ok(1)),
            )
            .unwrap()
            .build()
            .unwrap();

        assert!(machine.before_callbacks()[0].has_terminator());
    }
}
