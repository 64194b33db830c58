//! A single walk through a machine's transition graph.

use crate::core::{Query, State};
use crate::effects::{Machine, Transition};
use crate::error::Error;

/// An ordered sequence of transitions, each starting where the previous
/// one ended.
pub struct Path<O, S> {
    machine: Machine<O, S>,
    target: Option<S>,
    guard: bool,
    transitions: Vec<Transition<O, S>>,
}

impl<O, S: State> Path<O, S> {
    /// An empty path. `target` is the state the walk should end in, if any.
    pub fn new(machine: &Machine<O, S>, target: Option<S>, guard: bool) -> Self {
        Self {
            machine: machine.clone(),
            target,
            guard,
            transitions: Vec::new(),
        }
    }

    pub fn push(&mut self, transition: Transition<O, S>) {
        self.transitions.push(transition);
    }

    pub fn transitions(&self) -> &[Transition<O, S>] {
        &self.transitions
    }

    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    pub fn from_state(&self) -> Option<&S> {
        self.transitions.first().map(|t| t.from())
    }

    pub fn to_state(&self) -> Option<&S> {
        self.transitions.last().map(|t| t.to())
    }

    pub fn from_states(&self) -> Vec<S> {
        unique(self.transitions.iter().map(|t| t.from().clone()))
    }

    pub fn to_states(&self) -> Vec<S> {
        unique(self.transitions.iter().map(|t| t.to().clone()))
    }

    pub fn events(&self) -> Vec<String> {
        unique(self.transitions.iter().map(|t| t.event().to_string()))
    }

    /// Transitions that may extend this path.
    ///
    /// A transition is skipped when it was already walked. Once the target
    /// has been passed, only the part of the path after the target counts.
    pub fn next_transitions(&self, object: &O) -> Result<Vec<Transition<O, S>>, Error> {
        let Some(end) = self.to_state() else {
            return Ok(Vec::new());
        };

        let mut query = Query::new().from(end.clone());
        query.guard = self.guard;

        Ok(self
            .machine
            .transitions_for(object, &query)?
            .into_iter()
            .filter(|transition| !self.recently_walked(transition))
            .collect())
    }

    fn recently_walked(&self, transition: &Transition<O, S>) -> bool {
        let mut walked = self.transitions.as_slice();
        if let Some(target) = &self.target {
            if self.to_state() != Some(target) {
                if let Some(index) = walked.iter().position(|t| t.to() == target) {
                    walked = &walked[index + 1..];
                }
            }
        }
        walked.contains(transition)
    }

    /// Whether this path is a finished walk: it ends in the target, or
    /// without a target, it cannot be extended any further.
    pub fn is_complete(&self, object: &O) -> Result<bool, Error> {
        if self.transitions.is_empty() {
            return Ok(false);
        }
        match &self.target {
            Some(target) => Ok(self.to_state() == Some(target)),
            None => Ok(self.next_transitions(object)?.is_empty()),
        }
    }

    /// Every one-step extension of this path.
    pub fn walk(&self, object: &O) -> Result<Vec<Path<O, S>>, Error> {
        Ok(self
            .next_transitions(object)?
            .into_iter()
            .map(|transition| {
                let mut path = self.clone();
                path.push(transition);
                path
            })
            .collect())
    }
}

fn unique<T: PartialEq>(values: impl Iterator<Item = T>) -> Vec<T> {
    let mut unique = Vec::new();
    for value in values {
        if !unique.contains(&value) {
            unique.push(value);
        }
    }
    unique
}

pub(crate) fn merge_unique<T: PartialEq>(into: &mut Vec<T>, values: Vec<T>) {
    for value in values {
        if !into.contains(&value) {
            into.push(value);
        }
    }
}

impl<O, S: Clone> Clone for Path<O, S> {
    fn clone(&self) -> Self {
        Self {
            machine: self.machine.clone(),
            target: self.target.clone(),
            guard: self.guard,
            transitions: self.transitions.clone(),
        }
    }
}

impl<O, S: std::fmt::Debug> std::fmt::Debug for Path<O, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(&self.transitions).finish()
    }
}
