//! Switchyard: an embeddable state machine runtime
//!
//! A machine drives one state attribute of a domain object. It resolves which
//! transition a named event performs from the object's current state, runs
//! guarded callback chains around that transition, persists the new state and
//! runs the attribute's action. Several machines on the same object can be
//! coordinated as one all-or-nothing unit.
//!
//! The object is never owned by the engine: attribute reads and writes,
//! invalidation and transactions all go through an [`Integration`](effects::Integration).
//!
//! # Core Concepts
//!
//! - **Matcher**: set membership over states or event names
//! - **Branch**: guarded from/to/event requirements
//! - **Callback**: before, after, around and failure handler chains that can halt
//! - **Transition**: one resolved change, persisted or rolled back
//! - **TransitionCollection**: several transitions performed as a unit
//! - **Path**: a walk through the transition graph
//!
//! # Example
//!
//! ```rust
//! use switchyard::builder::{simple_event, CallbackBuilder, MachineBuilder};
//! use switchyard::effects::Transition;
//! use switchyard::state_enum;
//! use switchyard::Interrupt;
//!
//! state_enum! {
//!     enum Gear {
//!         Parked,
//!         Idling,
//!     }
//! }
//!
//! #[derive(Default)]
//! struct Vehicle {
//!     state: Option<Gear>,
//!     log: Vec<String>,
//! }
//!
//! let machine = MachineBuilder::new("state")
//!     .initial(Gear::Parked)
//!     .event(simple_event("ignite", Gear::Parked, Gear::Idling).unwrap())
//!     .callback(CallbackBuilder::after().run(
//!         |v: &mut Vehicle, t: &Transition<Vehicle, Gear>| -> Result<(), Interrupt> {
//!             v.log.push(t.to_string());
//!             Ok(())
//!         },
//!     ))
//!     .unwrap()
//!     .accessor(|v: &Vehicle| v.state.clone(), |v: &mut Vehicle, s| v.state = Some(s))
//!     .build()
//!     .unwrap();
//!
//! let mut vehicle = Vehicle::default();
//! machine.initialize_state(&mut vehicle);
//!
//! assert!(machine.fire(&mut vehicle, "ignite", vec![]).unwrap());
//! assert_eq!(vehicle.state, Some(Gear::Idling));
//! assert_eq!(vehicle.log, vec!["state: Parked --ignite--> Idling"]);
//! ```

pub mod builder;
pub mod config;
pub mod core;
pub mod effects;
pub mod error;
pub mod paths;

// Re-export commonly used types
pub use builder::{BuildError, MachineBuilder};
pub use core::{Guard, Matcher, Query, State};
pub use effects::{Machine, Transition, TransitionCollection};
pub use error::{halt, Error, Interrupt};
