//! Guarded transition requirements.
//!
//! A branch combines state requirements (pairs of `from`/`to` matchers), an
//! event requirement and guard predicates into a single "does this
//! transition request match" test. Events own branches that describe where
//! they may go; callbacks own a branch that describes when they run.

use crate::core::guard::Guard;
use crate::core::matcher::Matcher;
use crate::core::state::State;

/// Transition request tested against a branch.
///
/// Slots left as `None` are not tested. Guards are evaluated unless the
/// query disables them.
#[derive(Clone, Debug, PartialEq)]
pub struct Query<S> {
    pub from: Option<S>,
    pub to: Option<S>,
    pub on: Option<String>,
    pub guard: bool,
}

impl<S> Default for Query<S> {
    fn default() -> Self {
        Self {
            from: None,
            to: None,
            on: None,
            guard: true,
        }
    }
}

impl<S> Query<S> {
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

    pub fn on(mut self, event: impl Into<String>) -> Self {
        self.on = Some(event.into());
        self
    }

    /// Skip guard evaluation for this query.
    pub fn without_guards(mut self) -> Self {
        self.guard = false;
        self
    }
}

/// One `from`/`to` pair of a branch.
#[derive(Clone, Debug, PartialEq)]
pub struct StateRequirement<S> {
    pub from: Matcher<S>,
    pub to: Matcher<S>,
}

impl<S> Default for StateRequirement<S> {
    fn default() -> Self {
        Self {
            from: Matcher::All,
            to: Matcher::All,
        }
    }
}

/// The matchers of a branch that accepted a query.
#[derive(Debug, PartialEq)]
pub struct BranchMatch<'a, S> {
    pub from: &'a Matcher<S>,
    pub to: &'a Matcher<S>,
    pub on: &'a Matcher<String>,
}

/// A single transition rule.
///
/// Built through [`BranchBuilder`](crate::builder::BranchBuilder); immutable
/// afterwards.
pub struct Branch<O, S> {
    state_requirements: Vec<StateRequirement<S>>,
    event_requirement: Matcher<String>,
    if_guards: Vec<Guard<O>>,
    unless_guards: Vec<Guard<O>>,
    known_states: Vec<S>,
}

impl<O, S: State> Branch<O, S> {
    pub(crate) fn new(
        state_requirements: Vec<StateRequirement<S>>,
        event_requirement: Matcher<String>,
        if_guards: Vec<Guard<O>>,
        unless_guards: Vec<Guard<O>>,
    ) -> Self {
        let state_requirements = if state_requirements.is_empty() {
            vec![StateRequirement::default()]
        } else {
            state_requirements
        };

        // Track states in the order they first appear: from before to, one
        // requirement at a time.
        let mut known_states: Vec<S> = Vec::new();
        for requirement in &state_requirements {
            for value in requirement
                .from
                .values()
                .iter()
                .chain(requirement.to.values())
            {
                if !known_states.contains(value) {
                    known_states.push(value.clone());
                }
            }
        }

        Self {
            state_requirements,
            event_requirement,
            if_guards,
            unless_guards,
            known_states,
        }
    }

    /// A branch that accepts any query and has no guards.
    pub fn any() -> Self {
        Self::new(Vec::new(), Matcher::All, Vec::new(), Vec::new())
    }

    pub fn state_requirements(&self) -> &[StateRequirement<S>] {
        &self.state_requirements
    }

    pub fn event_requirement(&self) -> &Matcher<String> {
        &self.event_requirement
    }

    /// Explicit states referenced by this branch, in order of first
    /// appearance.
    pub fn known_states(&self) -> &[S] {
        &self.known_states
    }

    pub fn matches(&self, object: &O, query: &Query<S>) -> bool {
        self.match_requirement(object, query).is_some()
    }

    /// Like [`matches`](Self::matches), but returns the matchers that
    /// accepted the query.
    ///
    /// When several state requirements exist, the first pair accepting the
    /// query wins. Guards apply to the branch as a whole.
    pub fn match_requirement(&self, object: &O, query: &Query<S>) -> Option<BranchMatch<'_, S>> {
        let matched = self.match_query(query)?;
        if self.matches_conditions(object, query) {
            Some(matched)
        } else {
            None
        }
    }

    fn match_query(&self, query: &Query<S>) -> Option<BranchMatch<'_, S>> {
        let event_matches = query
            .on
            .as_ref()
            .map_or(true, |event| self.event_requirement.matches(event, None));
        if !event_matches {
            return None;
        }

        self.state_requirements
            .iter()
            .find(|requirement| {
                slot_matches(&requirement.from, query.from.as_ref(), query)
                    && slot_matches(&requirement.to, query.to.as_ref(), query)
            })
            .map(|requirement| BranchMatch {
                from: &requirement.from,
                to: &requirement.to,
                on: &self.event_requirement,
            })
    }

    fn matches_conditions(&self, object: &O, query: &Query<S>) -> bool {
        !query.guard
            || (self.if_guards.iter().all(|guard| guard.check(object))
                && !self.unless_guards.iter().any(|guard| guard.check(object)))
    }
}

fn slot_matches<S: State>(matcher: &Matcher<S>, value: Option<&S>, query: &Query<S>) -> bool {
    value.map_or(true, |value| matcher.matches(value, query.from.as_ref()))
}
