//! Core machine-definition values.
//!
//! This module contains the pure building blocks of a machine definition:
//! - State values via the `State` trait
//! - Guard predicates over the domain object
//! - Matchers over state and event values
//! - Branches combining matchers and guards into transition rules
//!
//! Nothing in here reads or writes the domain object's state; that is the
//! job of `effects`.

mod branch;
mod guard;
mod matcher;
mod state;

pub use branch::{Branch, BranchMatch, Query, StateRequirement};
pub use guard::Guard;
pub use matcher::Matcher;
pub use state::State;
