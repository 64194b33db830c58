//! Builder for transition branches.

use crate::builder::error::{check, validate, BuildError};
use crate::core::{Branch, Guard, Matcher, State, StateRequirement};

/// Fluent builder for [`Branch`].
///
/// Explicit `from`/`to` options and implicit `map` pairs are mutually
/// exclusive, as are each option and its `except_` form. Every violation is
/// reported at [`build`](Self::build).
///
/// # Example
///
/// ```rust
/// use switchyard::builder::BranchBuilder;
/// use switchyard::core::{Branch, Query};
///
/// let branch: Branch<(), String> = BranchBuilder::new()
///     .from("parked".to_string())
///     .to("idling".to_string())
///     .build()
///     .unwrap();
///
/// let query = Query::new().from("parked".to_string()).to("idling".to_string());
/// assert!(branch.matches(&(), &query));
/// ```
pub struct BranchBuilder<O, S> {
    from: Option<Matcher<S>>,
    except_from: Option<Vec<S>>,
    to: Option<Matcher<S>>,
    except_to: Option<Vec<S>>,
    on: Option<Matcher<String>>,
    except_on: Option<Vec<String>>,
    implicit: Vec<StateRequirement<S>>,
    if_guards: Vec<Guard<O>>,
    unless_guards: Vec<Guard<O>>,
}

impl<O, S: State> BranchBuilder<O, S> {
    pub fn new() -> Self {
        Self {
            from: None,
            except_from: None,
            to: None,
            except_to: None,
            on: None,
            except_on: None,
            implicit: Vec::new(),
            if_guards: Vec::new(),
            unless_guards: Vec::new(),
        }
    }

    pub fn from(self, state: S) -> Self {
        self.from_any([state])
    }

    pub fn from_any(self, states: impl IntoIterator<Item = S>) -> Self {
        self.from_matcher(Matcher::whitelist(states))
    }

    pub fn from_matcher(mut self, matcher: Matcher<S>) -> Self {
        self.from = Some(matcher);
        self
    }

    pub fn except_from(mut self, states: impl IntoIterator<Item = S>) -> Self {
        self.except_from = Some(states.into_iter().collect());
        self
    }

    pub fn to(self, state: S) -> Self {
        self.to_any([state])
    }

    pub fn to_any(self, states: impl IntoIterator<Item = S>) -> Self {
        self.to_matcher(Matcher::whitelist(states))
    }

    pub fn to_matcher(mut self, matcher: Matcher<S>) -> Self {
        self.to = Some(matcher);
        self
    }

    /// Target the current state, whatever it is.
    pub fn loopback(self) -> Self {
        self.to_matcher(Matcher::Loopback)
    }

    pub fn except_to(mut self, states: impl IntoIterator<Item = S>) -> Self {
        self.except_to = Some(states.into_iter().collect());
        self
    }

    pub fn on(self, event: impl Into<String>) -> Self {
        self.on_any([event])
    }

    pub fn on_any<E: Into<String>>(mut self, events: impl IntoIterator<Item = E>) -> Self {
        self.on = Some(Matcher::whitelist(events.into_iter().map(Into::into)));
        self
    }

    pub fn except_on<E: Into<String>>(mut self, events: impl IntoIterator<Item = E>) -> Self {
        self.except_on = Some(events.into_iter().map(Into::into).collect());
        self
    }

    /// Add an implicit `from => to` requirement.
    ///
    /// Each call adds one state requirement; the branch matches when any of
    /// them does.
    pub fn map(self, from: impl IntoIterator<Item = S>, to: S) -> Self {
        self.map_matcher(Matcher::whitelist(from), Matcher::whitelist([to]))
    }

    pub fn map_matcher(mut self, from: Matcher<S>, to: Matcher<S>) -> Self {
        self.implicit.push(StateRequirement { from, to });
        self
    }

    /// Require a predicate to hold.
    pub fn when<F>(self, predicate: F) -> Self
    where
        F: Fn(&O) -> bool + Send + Sync + 'static,
    {
        self.guard(Guard::new(predicate))
    }

    /// Require a predicate NOT to hold.
    pub fn unless<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&O) -> bool + Send + Sync + 'static,
    {
        self.unless_guards.push(Guard::new(predicate));
        self
    }

    pub fn guard(mut self, guard: Guard<O>) -> Self {
        self.if_guards.push(guard);
        self
    }

    pub(crate) fn has_state_requirements(&self) -> bool {
        self.from.is_some()
            || self.except_from.is_some()
            || self.to.is_some()
            || self.except_to.is_some()
            || !self.implicit.is_empty()
    }

    pub(crate) fn has_event_requirement(&self) -> bool {
        self.on.is_some() || self.except_on.is_some()
    }

    /// Build the branch, accumulating every configuration error.
    pub fn build(self) -> Result<Branch<O, S>, BuildError> {
        let explicit_states = self.from.is_some()
            || self.except_from.is_some()
            || self.to.is_some()
            || self.except_to.is_some();

        validate(vec![
            check(
                !(self.from.is_some() && self.except_from.is_some()),
                BuildError::ConflictingOptions {
                    first: "from",
                    second: "except_from",
                },
            ),
            check(
                !(self.to.is_some() && self.except_to.is_some()),
                BuildError::ConflictingOptions {
                    first: "to",
                    second: "except_to",
                },
            ),
            check(
                !(self.on.is_some() && self.except_on.is_some()),
                BuildError::ConflictingOptions {
                    first: "on",
                    second: "except_on",
                },
            ),
            check(
                self.implicit.is_empty() || !explicit_states,
                BuildError::MixedRequirements,
            ),
        ])?;

        let event_requirement = resolve(self.on, self.except_on)?;
        let state_requirements = if !self.implicit.is_empty() {
            self.implicit
        } else if explicit_states {
            vec![StateRequirement {
                from: resolve(self.from, self.except_from)?,
                to: resolve(self.to, self.except_to)?,
            }]
        } else {
            Vec::new()
        };

        Ok(Branch::new(
            state_requirements,
            event_requirement,
            self.if_guards,
            self.unless_guards,
        ))
    }
}

fn resolve<T: Clone + PartialEq>(
    matcher: Option<Matcher<T>>,
    except: Option<Vec<T>>,
) -> Result<Matcher<T>, BuildError> {
    match (matcher, except) {
        (Some(matcher), _) => Ok(matcher),
        (None, Some(values)) => Matcher::All.difference(values),
        (None, None) => Ok(Matcher::All),
    }
}

impl<O, S: State> Default for BranchBuilder<O, S> {
    fn default() -> Self {
        Self::new()
    }
}
