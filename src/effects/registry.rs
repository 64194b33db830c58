//! Machines for several attributes of one object type.

use crate::config::CollectionOptions;
use crate::core::{Query, State};
use crate::effects::collection::TransitionCollection;
use crate::effects::event::Event;
use crate::effects::integration::{Invalidation, InvalidationReason};
use crate::effects::machine::Machine;
use crate::effects::transition::Transition;
use crate::effects::truthy;
use crate::error::Error;

/// Registry of machines keyed by attribute.
///
/// Events are addressed by qualified name, so machines sharing event names
/// should be namespaced.
///
/// # Example
///
/// ```rust
/// use switchyard::builder::{simple_event, MachineBuilder};
/// use switchyard::effects::MachineCollection;
///
/// #[derive(Default)]
/// struct Vehicle {
///     state: Option<String>,
///     alarm_state: Option<String>,
/// }
///
/// let state = MachineBuilder::new("state")
///     .initial("parked".to_string())
///     .event(simple_event("ignite", "parked".to_string(), "idling".to_string()).unwrap())
///     .accessor(|v: &Vehicle| v.state.clone(), |v: &mut Vehicle, s| v.state = Some(s))
///     .build()
///     .unwrap();
/// let alarm = MachineBuilder::new("alarm_state")
///     .namespace("alarm")
///     .initial("active".to_string())
///     .event(simple_event("disable", "active".to_string(), "off".to_string()).unwrap())
///     .accessor(|v: &Vehicle| v.alarm_state.clone(), |v: &mut Vehicle, s| v.alarm_state = Some(s))
///     .build()
///     .unwrap();
///
/// let mut machines = MachineCollection::new();
/// machines.add(state).unwrap();
/// machines.add(alarm).unwrap();
///
/// let mut vehicle = Vehicle::default();
/// machines.initialize_states(&mut vehicle);
///
/// assert!(machines.fire_events(&mut vehicle, &["ignite", "disable_alarm"], true).unwrap());
/// assert_eq!(vehicle.state.as_deref(), Some("idling"));
/// assert_eq!(vehicle.alarm_state.as_deref(), Some("off"));
/// ```
pub struct MachineCollection<O, S> {
    machines: Vec<Machine<O, S>>,
}

impl<O, S: State> MachineCollection<O, S> {
    pub fn new() -> Self {
        Self {
            machines: Vec::new(),
        }
    }

    /// Register a machine. Each attribute may only be registered once.
    pub fn add(&mut self, machine: Machine<O, S>) -> Result<(), Error> {
        if self.get(machine.attribute()).is_some() {
            return Err(Error::Configuration(format!(
                "a machine is already registered for {}",
                machine.attribute()
            )));
        }
        self.machines.push(machine);
        Ok(())
    }

    pub fn get(&self, attribute: &str) -> Option<&Machine<O, S>> {
        self.machines.iter().find(|m| m.attribute() == attribute)
    }

    pub fn machines(&self) -> &[Machine<O, S>] {
        &self.machines
    }

    /// Write each machine's initial state where the attribute is unset.
    pub fn initialize_states(&self, object: &mut O) {
        for machine in &self.machines {
            machine.initialize_state(object);
        }
    }

    fn find_event(&self, qualified_name: &str) -> Option<(&Machine<O, S>, &Event<O, S>)> {
        self.machines.iter().find_map(|machine| {
            machine
                .event_by_qualified_name(qualified_name)
                .map(|event| (machine, event))
        })
    }

    /// Fire several events, one per attribute, as a single unit.
    ///
    /// Every event must be able to fire; the ones that cannot are reported
    /// through their machine's failure handling and nothing is performed.
    /// An unknown event name is an error.
    pub fn fire_events(&self, object: &mut O, events: &[&str], run_action: bool) -> Result<bool, Error> {
        let mut transitions = Vec::with_capacity(events.len());
        for name in events {
            let (machine, event) = self.find_event(name).ok_or_else(|| Error::InvalidEvent {
                event: name.to_string(),
            })?;

            let transition = event.transition_for(machine, object, &Query::default())?;
            if transition.is_none() {
                event.on_failure(machine, object, Vec::new())?;
            }
            transitions.push(transition);
        }

        if self.machines.is_empty() {
            return Ok(true);
        }
        let mut options = CollectionOptions::default();
        if !run_action {
            options = options.skip_actions();
        }

        let mut collection = TransitionCollection::new(transitions, options)?;
        let result = collection.perform(object, None)?;
        Ok(truthy(&result))
    }

    /// Resolve one transition per requested event.
    ///
    /// Names no machine knows are invalidated against the first machine,
    /// events that cannot fire against their own machine. Both yield `None`.
    pub fn transitions_for(
        &self,
        object: &mut O,
        events: &[&str],
    ) -> Result<Vec<Option<Transition<O, S>>>, Error> {
        let mut transitions = Vec::with_capacity(events.len());
        for name in events {
            let Some((machine, event)) = self.find_event(name) else {
                if let Some(first) = self.machines.first() {
                    let invalidation = Invalidation::new(InvalidationReason::InvalidEvent)
                        .param("event", name.to_string());
                    first.invalidate(object, &invalidation);
                }
                transitions.push(None);
                continue;
            };

            let transition = event.transition_for(machine, object, &Query::default())?;
            if transition.is_none() {
                let state = machine.current_state(object)?;
                let invalidation = Invalidation::new(InvalidationReason::InvalidTransition)
                    .param("event", event.human_name())
                    .param("state", state.name());
                machine.invalidate(object, &invalidation);
            }
            transitions.push(transition);
        }
        Ok(transitions)
    }
}

impl<O, S: State> Default for MachineCollection<O, S> {
    fn default() -> Self {
        Self::new()
    }
}
