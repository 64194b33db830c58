//! A state machine bound to one attribute of a domain object.

use crate::config::Settings;
use crate::core::{Query, State};
use crate::effects::callback::Callback;
use crate::effects::event::Event;
use crate::effects::integration::{Integration, Invalidation};
use crate::effects::transition::Transition;
use crate::error::Error;
use crate::paths::{PathCollection, PathOptions};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

pub(crate) type InitialFn<O, S> = Arc<dyn Fn(&O) -> S + Send + Sync>;
pub(crate) type ActionFn<O> = Arc<dyn Fn(&mut O, &[Value]) -> Result<Value, Error> + Send + Sync>;

pub(crate) enum Initial<O, S> {
    Fixed(S),
    Dynamic(InitialFn<O, S>),
}

pub(crate) struct Action<O> {
    pub(crate) name: String,
    pub(crate) run: ActionFn<O>,
}

pub(crate) struct Definition<O, S> {
    pub(crate) attribute: String,
    pub(crate) namespace: Option<String>,
    pub(crate) initial: Option<Initial<O, S>>,
    pub(crate) states: Vec<S>,
    pub(crate) events: Vec<Event<O, S>>,
    pub(crate) before: Vec<Callback<O, S>>,
    pub(crate) after: Vec<Callback<O, S>>,
    pub(crate) failure: Vec<Callback<O, S>>,
    pub(crate) action: Option<Action<O>>,
    pub(crate) settings: Settings,
    pub(crate) integration: Arc<dyn Integration<O, S>>,
}

/// A state machine for one attribute.
///
/// Machines are immutable once built and cheap to clone: clones share the
/// same definition. Build one with [`MachineBuilder`](crate::builder::MachineBuilder).
///
/// # Example
///
/// ```rust
/// use switchyard::builder::{simple_event, MachineBuilder};
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
/// let mut vehicle = Vehicle { state: None };
/// machine.initialize_state(&mut vehicle);
///
/// assert!(machine.fire(&mut vehicle, "ignite", vec![]).unwrap());
/// assert_eq!(vehicle.state.as_deref(), Some("idling"));
/// assert!(!machine.fire(&mut vehicle, "ignite", vec![]).unwrap());
/// ```
pub struct Machine<O, S> {
    inner: Arc<Definition<O, S>>,
}

impl<O, S> Machine<O, S> {
    pub(crate) fn from_definition(definition: Definition<O, S>) -> Self {
        Self {
            inner: Arc::new(definition),
        }
    }

    pub fn attribute(&self) -> &str {
        &self.inner.attribute
    }

    pub fn namespace(&self) -> Option<&str> {
        self.inner.namespace.as_deref()
    }

    /// Apply the namespace to a name: `ignite` becomes `ignite_alarm`.
    pub fn qualify(&self, name: &str) -> String {
        match &self.inner.namespace {
            Some(namespace) => format!("{}_{}", name, namespace),
            None => name.to_string(),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    /// Known states in declaration order.
    pub fn state_values(&self) -> &[S] {
        &self.inner.states
    }

    pub fn events(&self) -> &[Event<O, S>] {
        &self.inner.events
    }

    /// Before and around callbacks, in declaration order.
    pub fn before_callbacks(&self) -> &[Callback<O, S>] {
        &self.inner.before
    }

    pub fn after_callbacks(&self) -> &[Callback<O, S>] {
        &self.inner.after
    }

    pub fn failure_callbacks(&self) -> &[Callback<O, S>] {
        &self.inner.failure
    }

    pub fn action_name(&self) -> Option<&str> {
        self.inner.action.as_ref().map(|a| a.name.as_str())
    }

    /// Whether two handles share one definition.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<O, S: State> Machine<O, S> {
    pub fn read(&self, object: &O) -> Option<S> {
        self.inner.integration.read(object, &self.inner.attribute)
    }

    pub fn write(&self, object: &mut O, value: S) {
        self.inner
            .integration
            .write(object, &self.inner.attribute, value)
    }

    /// The object's current state, which must be a known state.
    pub fn current_state(&self, object: &O) -> Result<S, Error> {
        match self.read(object) {
            Some(state) if self.is_known_state(&state) => Ok(state),
            other => Err(Error::UnknownState {
                attribute: self.inner.attribute.clone(),
                value: other
                    .map(|s| s.name().to_string())
                    .unwrap_or_else(|| "nil".to_string()),
            }),
        }
    }

    pub fn initial_state(&self, object: &O) -> Option<S> {
        match &self.inner.initial {
            Some(Initial::Fixed(state)) => Some(state.clone()),
            Some(Initial::Dynamic(initial)) => Some(initial(object)),
            None => None,
        }
    }

    /// Write the initial state when the attribute is unset.
    pub fn initialize_state(&self, object: &mut O) {
        if self.read(object).is_none() {
            if let Some(initial) = self.initial_state(object) {
                self.write(object, initial);
            }
        }
    }

    pub fn reset(&self, object: &mut O) {
        self.inner.integration.reset_errors(object)
    }

    pub fn invalidate(&self, object: &mut O, invalidation: &Invalidation) {
        tracing::debug!("Invalidating {}: {}", self.inner.attribute, invalidation);
        self.inner
            .integration
            .invalidate(object, &self.inner.attribute, invalidation)
    }

    /// Run `block` inside the integration's transaction. Callers decide
    /// whether a transaction is wanted; see `Settings::use_transactions`.
    pub fn within_transaction(
        &self,
        object: &mut O,
        block: &mut dyn FnMut(&mut O) -> Result<bool, Error>,
    ) -> Result<bool, Error> {
        self.inner.integration.within_transaction(object, block)
    }

    pub fn has_around_callbacks(&self) -> bool {
        self.inner.before.iter().any(|c| c.is_around())
    }

    pub fn is_known_state(&self, state: &S) -> bool {
        self.inner.states.contains(state)
    }

    /// A state is final when no event can leave it for another state.
    pub fn is_final_state(&self, state: &S) -> bool {
        !self.inner.events.iter().any(|event| {
            event.branches().iter().any(|branch| {
                branch.state_requirements().iter().any(|requirement| {
                    requirement.from.matches(state, None)
                        && !requirement.to.matches(state, Some(state))
                })
            })
        })
    }

    pub fn event(&self, name: &str) -> Option<&Event<O, S>> {
        self.inner.events.iter().find(|e| e.name() == name)
    }

    pub fn event_by_qualified_name(&self, qualified_name: &str) -> Option<&Event<O, S>> {
        self.inner
            .events
            .iter()
            .find(|e| e.qualified_name() == qualified_name)
    }

    fn require_event(&self, name: &str) -> Result<&Event<O, S>, Error> {
        self.event(name).ok_or_else(|| Error::InvalidEvent {
            event: name.to_string(),
        })
    }

    /// Resolve the transition `event` would perform from the current state.
    pub fn transition_for(
        &self,
        object: &O,
        event: &str,
    ) -> Result<Option<Transition<O, S>>, Error> {
        self.require_event(event)?
            .transition_for(self, object, &Query::default())
    }

    pub fn can_fire(&self, object: &O, event: &str) -> Result<bool, Error> {
        self.require_event(event)?
            .can_fire(self, object, &Query::default())
    }

    pub fn fire(&self, object: &mut O, event: &str, args: Vec<Value>) -> Result<bool, Error> {
        self.require_event(event)?.fire(self, object, args)
    }

    pub fn fire_strict(&self, object: &mut O, event: &str, args: Vec<Value>) -> Result<(), Error> {
        self.require_event(event)?.fire_strict(self, object, args)
    }

    /// Events that can fire from the object's current state.
    pub fn valid_events(&self, object: &O) -> Result<Vec<&Event<O, S>>, Error> {
        let mut valid = Vec::new();
        for event in &self.inner.events {
            if event.can_fire(self, object, &Query::default())? {
                valid.push(event);
            }
        }
        Ok(valid)
    }

    /// One transition per event that can fire for `query`.
    ///
    /// `query.on` restricts the events considered.
    pub fn transitions_for(
        &self,
        object: &O,
        query: &Query<S>,
    ) -> Result<Vec<Transition<O, S>>, Error> {
        let mut transitions = Vec::new();
        for event in &self.inner.events {
            if query.on.as_deref().is_some_and(|on| on != event.name()) {
                continue;
            }
            if let Some(transition) = event.transition_for(self, object, query)? {
                transitions.push(transition);
            }
        }
        Ok(transitions)
    }

    pub fn paths_for(&self, object: &O, options: PathOptions<S>) -> Result<PathCollection<O, S>, Error> {
        PathCollection::new(self, object, options)
    }

    /// Run the machine's action, if it has one.
    pub fn run_action(&self, object: &mut O, args: &[Value]) -> Result<Value, Error> {
        match &self.inner.action {
            Some(action) => {
                tracing::trace!("Running action {} for {}", action.name, self.inner.attribute);
                (action.run)(object, args)
            }
            None => Ok(Value::Bool(true)),
        }
    }
}

impl<O, S> Clone for Machine<O, S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<O, S: fmt::Debug> fmt::Debug for Machine<O, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Machine")
            .field("attribute", &self.inner.attribute)
            .field("namespace", &self.inner.namespace)
            .field("states", &self.inner.states)
            .field("events", &self.inner.events.len())
            .field("action", &self.action_name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{simple_event, BranchBuilder, CallbackBuilder, EventBuilder, MachineBuilder};

    #[derive(Default, Clone, Debug)]
    struct Vehicle {
        state: Option<String>,
        heated: bool,
        log: Vec<String>,
    }

    fn s(value: &str) -> String {
        value.to_string()
    }

    fn machine() -> Machine<Vehicle, String> {
        MachineBuilder::new("state")
            .initial_with(|v: &Vehicle| if v.heated { s("idling") } else { s("parked") })
            .event(simple_event("ignite", s("parked"), s("idling")).unwrap())
            .event(simple_event("park", s("idling"), s("parked")).unwrap())
            .event(
                EventBuilder::new("crash")
                    .transition(BranchBuilder::new().except_from([s("stalled")]).to(s("stalled")))
                    .unwrap(),
            )
            .accessor(
                |v: &Vehicle| v.state.clone(),
                |v: &mut Vehicle, state| v.state = Some(state),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn states_follow_declaration_order() {
        let machine = machine();
        assert_eq!(machine.state_values(), &[s("parked"), s("idling"), s("stalled")]);
        assert!(machine.is_known_state(&s("stalled")));
        assert!(!machine.is_known_state(&s("flying")));
    }

    #[test]
    fn dynamic_initial_state() {
        let machine = machine();
        let mut cold = Vehicle::default();
        let mut warm = Vehicle {
            heated: true,
            ..Vehicle::default()
        };

        machine.initialize_state(&mut cold);
        machine.initialize_state(&mut warm);

        assert_eq!(cold.state.as_deref(), Some("parked"));
        assert_eq!(warm.state.as_deref(), Some("idling"));
    }

    #[test]
    fn initialize_state_keeps_existing_value() {
        let machine = machine();
        let mut vehicle = Vehicle {
            state: Some(s("stalled")),
            ..Vehicle::default()
        };

        machine.initialize_state(&mut vehicle);
        assert_eq!(vehicle.state.as_deref(), Some("stalled"));
    }

    #[test]
    fn final_states_have_no_way_out() {
        let machine = machine();
        assert!(machine.is_final_state(&s("stalled")));
        assert!(!machine.is_final_state(&s("parked")));
    }

    #[test]
    fn fire_unknown_event_is_an_error() {
        let machine = machine();
        let mut vehicle = Vehicle {
            state: Some(s("parked")),
            ..Vehicle::default()
        };

        let result = machine.fire(&mut vehicle, "fly", vec![]);
        assert!(matches!(result, Err(Error::InvalidEvent { .. })));
    }

    #[test]
    fn current_state_must_be_known() {
        let machine = machine();
        let vehicle = Vehicle {
            state: Some(s("flying")),
            ..Vehicle::default()
        };

        let error = machine.current_state(&vehicle).unwrap_err();
        assert_eq!(error.to_string(), "flying is not a known state value");
    }

    #[test]
    fn valid_events_for_current_state() {
        let machine = machine();
        let vehicle = Vehicle {
            state: Some(s("parked")),
            ..Vehicle::default()
        };

        let names: Vec<&str> = machine
            .valid_events(&vehicle)
            .unwrap()
            .into_iter()
            .map(|e| e.name())
            .collect();
        assert_eq!(names, vec!["ignite", "crash"]);
    }

    #[test]
    fn transitions_for_custom_from_and_event() {
        let machine = machine();
        let vehicle = Vehicle::default();

        let all = machine
            .transitions_for(&vehicle, &Query::new().from(s("idling")))
            .unwrap();
        assert_eq!(all.len(), 2);

        let crash_only = machine
            .transitions_for(&vehicle, &Query::new().from(s("idling")).on("crash"))
            .unwrap();
        assert_eq!(crash_only.len(), 1);
        assert_eq!(crash_only[0].to(), &s("stalled"));
    }

    #[test]
    fn namespace_qualifies_events() {
        let machine = MachineBuilder::new("alarm_state")
            .namespace("alarm")
            .initial(s("active"))
            .event(simple_event("disable", s("active"), s("off")).unwrap())
            .accessor(
                |v: &Vehicle| v.state.clone(),
                |v: &mut Vehicle, state| v.state = Some(state),
            )
            .build()
            .unwrap();

        assert!(machine.event_by_qualified_name("disable_alarm").is_some());
        assert!(machine.event_by_qualified_name("disable").is_none());
        assert_eq!(machine.qualify("enable"), "enable_alarm");
    }

    #[test]
    fn around_callbacks_are_detected() {
        let wrapped = MachineBuilder::new("state")
            .initial(s("parked"))
            .callback(CallbackBuilder::<Vehicle, String>::around().run_around(|v, _, next| next.run(v)))
            .unwrap()
            .accessor(
                |v: &Vehicle| v.state.clone(),
                |v: &mut Vehicle, state| v.state = Some(state),
            )
            .build()
            .unwrap();

        assert!(wrapped.has_around_callbacks());
        assert!(!machine().has_around_callbacks());
    }

    #[test]
    fn action_receives_args() {
        let machine = MachineBuilder::new("state")
            .initial(s("parked"))
            .event(simple_event("ignite", s("parked"), s("idling")).unwrap())
            .action("start_engine", |v: &mut Vehicle, args: &[Value]| {
                v.log.push(format!("{} args", args.len()));
                Ok(true)
            })
            .accessor(
                |v: &Vehicle| v.state.clone(),
                |v: &mut Vehicle, state| v.state = Some(state),
            )
            .build()
            .unwrap();
        let mut vehicle = Vehicle {
            state: Some(s("parked")),
            ..Vehicle::default()
        };

        assert!(machine
            .fire(&mut vehicle, "ignite", vec![Value::from(1), Value::from("key")])
            .unwrap());
        assert_eq!(vehicle.log, vec!["2 args"]);
        assert_eq!(machine.action_name(), Some("start_engine"));
    }

    #[test]
    fn clones_share_definition() {
        let machine = machine();
        let clone = machine.clone();
        assert!(machine.ptr_eq(&clone));
    }
}
