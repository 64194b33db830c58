//! Enumeration of every path between two states.

use crate::core::{Query, State};
use crate::effects::Machine;
use crate::error::Error;
use crate::paths::path::{merge_unique, Path};

/// Constraints for a [`PathCollection`].
#[derive(Debug, Clone, PartialEq)]
pub struct PathOptions<S> {
    /// Start state. Defaults to the object's current state.
    pub from: Option<S>,
    /// Target state. Without one, paths run until they reach a dead end.
    pub to: Option<S>,
    /// Keep walking past the target to find longer paths through it.
    pub deep: bool,
    /// Evaluate branch guards against the object.
    pub guard: bool,
}

impl<S> Default for PathOptions<S> {
    fn default() -> Self {
        Self {
            from: None,
            to: None,
            deep: false,
            guard: true,
        }
    }
}

impl<S> PathOptions<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from(mut self, state: S) -> Self {
        self.from = Some(state);
        self
    }

    pub fn to(mut self, state: S) -> Self {
        self.to = Some(state);
        self
    }

    pub fn deep(mut self) -> Self {
        self.deep = true;
        self
    }

    pub fn without_guards(mut self) -> Self {
        self.guard = false;
        self
    }
}

/// All complete paths from a start state, optionally to a target.
///
/// # Example
///
/// ```rust
/// use switchyard::builder::{simple_event, MachineBuilder};
/// use switchyard::paths::PathOptions;
///
/// struct Vehicle {
///     state: Option<String>,
/// }
///
/// let machine = MachineBuilder::new("state")
///     .initial("parked".to_string())
///     .event(simple_event("ignite", "parked".to_string(), "idling".to_string()).unwrap())
///     .event(simple_event("park", "idling".to_string(), "parked".to_string()).unwrap())
///     .accessor(|v: &Vehicle| v.state.clone(), |v: &mut Vehicle, s| v.state = Some(s))
///     .build()
///     .unwrap();
///
/// let vehicle = Vehicle { state: Some("parked".to_string()) };
/// let paths = machine.paths_for(&vehicle, PathOptions::new()).unwrap();
///
/// assert_eq!(paths.len(), 1);
/// assert_eq!(paths.events(), vec!["ignite".to_string(), "park".to_string()]);
/// ```
pub struct PathCollection<O, S> {
    from: S,
    to: Option<S>,
    deep: bool,
    paths: Vec<Path<O, S>>,
}

impl<O, S: State> PathCollection<O, S> {
    /// Walk the machine's graph for `object`.
    ///
    /// Explicit `from` and `to` states must be known to the machine.
    pub fn new(machine: &Machine<O, S>, object: &O, options: PathOptions<S>) -> Result<Self, Error> {
        let from = match options.from {
            Some(from) => known(machine, from)?,
            None => machine.current_state(object)?,
        };
        let to = options.to.map(|to| known(machine, to)).transpose()?;

        let mut collection = Self {
            from,
            to,
            deep: options.deep,
            paths: Vec::new(),
        };

        let mut query = Query::new().from(collection.from.clone());
        query.guard = options.guard;
        for transition in machine.transitions_for(object, &query)? {
            let mut path = Path::new(machine, collection.to.clone(), options.guard);
            path.push(transition);
            collection.walk(object, path)?;
        }

        tracing::debug!(
            "Found {} path(s) from {} for {}",
            collection.paths.len(),
            collection.from.name(),
            machine.attribute()
        );
        Ok(collection)
    }

    fn walk(&mut self, object: &O, path: Path<O, S>) -> Result<(), Error> {
        let complete = path.is_complete(object)?;
        let extensions = if complete && self.to.is_some() && !self.deep {
            Vec::new()
        } else {
            path.walk(object)?
        };

        if complete {
            self.paths.push(path);
        }
        for next in extensions {
            self.walk(object, next)?;
        }
        Ok(())
    }

    pub fn from_state(&self) -> &S {
        &self.from
    }

    pub fn to_state(&self) -> Option<&S> {
        self.to.as_ref()
    }

    pub fn paths(&self) -> &[Path<O, S>] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn from_states(&self) -> Vec<S> {
        let mut states = Vec::new();
        for path in &self.paths {
            merge_unique(&mut states, path.from_states());
        }
        states
    }

    pub fn to_states(&self) -> Vec<S> {
        let mut states = Vec::new();
        for path in &self.paths {
            merge_unique(&mut states, path.to_states());
        }
        states
    }

    pub fn events(&self) -> Vec<String> {
        let mut events = Vec::new();
        for path in &self.paths {
            merge_unique(&mut events, path.events());
        }
        events
    }
}

fn known<O, S: State>(machine: &Machine<O, S>, state: S) -> Result<S, Error> {
    if machine.is_known_state(&state) {
        Ok(state)
    } else {
        Err(Error::UnknownState {
            attribute: machine.attribute().to_string(),
            value: state.name().to_string(),
        })
    }
}
