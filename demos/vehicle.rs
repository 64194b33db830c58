//! Vehicle State Machines
//!
//! This example drives a vehicle with two state attributes: the engine
//! state and an alarm state.
//!
//! Key concepts:
//! - Guarded branches (shifting needs a seatbelt)
//! - Before, after, around and failure callbacks
//! - Firing events on several machines as one unit
//! - Enumerating paths through a cyclic graph
//!
//! Run with: RUST_LOG=switchyard=debug cargo run --example vehicle

use serde_json::Value;
use switchyard::builder::{simple_event, BranchBuilder, CallbackBuilder, EventBuilder, MachineBuilder};
use switchyard::effects::{Invalidation, MachineCollection};
use switchyard::paths::PathOptions;
use switchyard::{state_enum, Interrupt, Machine, Transition};

// Both attributes share one state type so they can be fired together.
state_enum! {
    enum Gear {
        Parked,
        Idling,
        FirstGear,
        Stalled,
        Armed,
        Disarmed,
    }
}

#[derive(Default)]
struct Vehicle {
    state: Option<Gear>,
    alarm_state: Option<Gear>,
    seatbelt_on: bool,
    errors: Vec<String>,
}

struct Errors;

impl switchyard::effects::Integration<Vehicle, Gear> for Errors {
    fn read(&self, object: &Vehicle, _attribute: &str) -> Option<Gear> {
        object.state.clone()
    }

    fn write(&self, object: &mut Vehicle, _attribute: &str, value: Gear) {
        object.state = Some(value);
    }

    fn invalidate(&self, object: &mut Vehicle, attribute: &str, invalidation: &Invalidation) {
        object.errors.push(format!("{} {}", attribute, invalidation));
    }

    fn reset_errors(&self, object: &mut Vehicle) {
        object.errors.clear();
    }
}

fn announce(_vehicle: &mut Vehicle, transition: &Transition<Vehicle, Gear>) -> Result<(), Interrupt> {
    println!("  after:   {}", transition);
    Ok(())
}

fn engine() -> Machine<Vehicle, Gear> {
    MachineBuilder::new("state")
        .initial(Gear::Parked)
        .event(simple_event("ignite", Gear::Parked, Gear::Idling).unwrap())
        .event(simple_event("park", Gear::Idling, Gear::Parked).unwrap())
        .event(
            EventBuilder::new("shift_up")
                .transition(
                    BranchBuilder::new()
                        .from(Gear::Idling)
                        .to(Gear::FirstGear)
                        .when(|v: &Vehicle| v.seatbelt_on),
                )
                .unwrap(),
        )
        .event(simple_event("shift_down", Gear::FirstGear, Gear::Idling).unwrap())
        .event(
            EventBuilder::new("crash")
                .transition(BranchBuilder::new().except_from([Gear::Stalled]).to(Gear::Stalled))
                .unwrap(),
        )
        .callback(CallbackBuilder::before().on("ignite").run(
            |_: &mut Vehicle, t: &Transition<Vehicle, Gear>| -> Result<(), Interrupt> {
                println!("  before:  {}", t);
                Ok(())
            },
        ))
        .unwrap()
        .callback(CallbackBuilder::around().to(Gear::FirstGear).run_around(|v, t, next| {
            println!("  around:  entering {}", t);
            next.run(v)?;
            println!("  around:  leaving {}", t);
            Ok(())
        }))
        .unwrap()
        .callback(CallbackBuilder::after().run(announce))
        .unwrap()
        .callback(CallbackBuilder::failure().run(
            |_: &mut Vehicle, t: &Transition<Vehicle, Gear>| -> Result<(), Interrupt> {
                println!("  failure: {}", t);
                Ok(())
            },
        ))
        .unwrap()
        .integration(Errors)
        .build()
        .unwrap()
}

fn alarm() -> Machine<Vehicle, Gear> {
    MachineBuilder::new("alarm_state")
        .namespace("alarm")
        .initial(Gear::Armed)
        .event(simple_event("disable", Gear::Armed, Gear::Disarmed).unwrap())
        .action("save_alarm", |_: &mut Vehicle, _: &[Value]| Ok(true))
        .accessor(
            |v: &Vehicle| v.alarm_state.clone(),
            |v: &mut Vehicle, state| v.alarm_state = Some(state),
        )
        .build()
        .unwrap()
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("=== Vehicle State Machines ===\n");

    let engine = engine();
    let mut vehicle = Vehicle::default();
    engine.initialize_state(&mut vehicle);
    println!("Initial state: {:?}\n", vehicle.state);

    println!("Firing ignite:");
    let fired = engine.fire(&mut vehicle, "ignite", vec![]).unwrap();
    println!("  fired = {}, state = {:?}\n", fired, vehicle.state);

    println!("Shifting up without a seatbelt:");
    let fired = engine.fire(&mut vehicle, "shift_up", vec![]).unwrap();
    println!("  fired = {}, errors = {:?}\n", fired, vehicle.errors);

    println!("Shifting up with a seatbelt:");
    vehicle.seatbelt_on = true;
    let fired = engine.fire(&mut vehicle, "shift_up", vec![]).unwrap();
    println!("  fired = {}, state = {:?}\n", fired, vehicle.state);

    let events: Vec<String> = engine
        .valid_events(&vehicle)
        .unwrap()
        .iter()
        .map(|e| e.name().to_string())
        .collect();
    println!("Valid events from {:?}: {:?}\n", vehicle.state, events);

    println!("Paths back to Parked:");
    let paths = engine
        .paths_for(&vehicle, PathOptions::new().to(Gear::Parked))
        .unwrap();
    for path in paths.paths() {
        println!("  {:?}", path.events());
    }
    println!();

    println!("Parking and disabling the alarm together:");
    let mut machines = MachineCollection::new();
    machines.add(engine).unwrap();
    machines.add(alarm()).unwrap();
    machines.initialize_states(&mut vehicle);
    engine_down(&machines, &mut vehicle);

    println!("\n=== Example Complete ===");
}

fn engine_down(machines: &MachineCollection<Vehicle, Gear>, vehicle: &mut Vehicle) {
    if let Err(e) = machines.fire_events(vehicle, &["shift_down"], true) {
        println!("  error: {}", e);
        return;
    }
    match machines.fire_events(vehicle, &["park", "disable_alarm"], true) {
        Ok(fired) => println!(
            "  fired = {}, state = {:?}, alarm = {:?}",
            fired, vehicle.state, vehicle.alarm_state
        ),
        Err(e) => println!("  error: {}", e),
    }
}
