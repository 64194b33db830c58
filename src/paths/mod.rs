//! Reachability: walks through a machine's transition graph.
//!
//! A [`PathCollection`] starts from one state and extends paths depth-first,
//! one fireable transition at a time. A transition is never repeated within
//! the part of a path that could loop, so enumeration always terminates,
//! even on cyclic graphs.

mod collection;
mod path;

pub use collection::{PathCollection, PathOptions};
pub use path::Path;
