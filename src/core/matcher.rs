//! Value-set matchers for state and event requirements.
//!
//! A matcher answers "does this value belong to my set". Branches use one
//! matcher per requirement slot (`from`, `to`, `on`).

use crate::builder::BuildError;
use std::fmt::{self, Debug};

/// Membership test over a set of values.
///
/// `All` and `Loopback` carry no values and are plain unit variants, so
/// every instance of them is interchangeable.
///
/// # Example
///
/// ```rust
/// use switchyard::core::Matcher;
///
/// let parked = Matcher::whitelist(["parked"]);
/// let moving = Matcher::blacklist(["parked"]);
///
/// assert!(parked.matches(&"parked", None));
/// assert!(!moving.matches(&"parked", None));
/// assert_eq!(moving.filter(&["parked", "idling"]), vec!["idling"]);
/// ```
#[derive(Clone, PartialEq, Eq)]
pub enum Matcher<T> {
    /// Matches every value.
    All,
    /// Matches only the listed values.
    Whitelist(Vec<T>),
    /// Matches everything except the listed values.
    Blacklist(Vec<T>),
    /// Matches only the `from` value of the query being tested.
    Loopback,
}

impl<T: Clone + PartialEq> Matcher<T> {
    pub fn whitelist(values: impl IntoIterator<Item = T>) -> Self {
        Matcher::Whitelist(dedup(values))
    }

    pub fn blacklist(values: impl IntoIterator<Item = T>) -> Self {
        Matcher::Blacklist(dedup(values))
    }

    /// The explicit values this matcher was built from.
    ///
    /// Empty for `All` and `Loopback`.
    pub fn values(&self) -> &[T] {
        match self {
            Matcher::Whitelist(values) | Matcher::Blacklist(values) => values,
            Matcher::All | Matcher::Loopback => &[],
        }
    }

    /// Test a value. `from` is the runtime `from` value, only consulted by
    /// `Loopback`.
    pub fn matches(&self, value: &T, from: Option<&T>) -> bool {
        match self {
            Matcher::All => true,
            Matcher::Whitelist(values) => values.contains(value),
            Matcher::Blacklist(values) => !values.contains(value),
            Matcher::Loopback => from == Some(value),
        }
    }

    /// Narrow a list of candidate values down to the ones this matcher
    /// accepts.
    ///
    /// Whitelists return candidates in their own declared order; blacklists
    /// keep the candidates' order. Loopback cannot be enumerated statically
    /// and always yields nothing.
    pub fn filter(&self, candidates: &[T]) -> Vec<T> {
        match self {
            Matcher::All => candidates.to_vec(),
            Matcher::Whitelist(values) => values
                .iter()
                .filter(|value| candidates.contains(*value))
                .cloned()
                .collect(),
            Matcher::Blacklist(values) => candidates
                .iter()
                .filter(|candidate| !values.contains(*candidate))
                .cloned()
                .collect(),
            Matcher::Loopback => Vec::new(),
        }
    }

    /// `All - values`, i.e. a blacklist. Only `All` supports subtraction.
    pub fn difference(&self, values: impl IntoIterator<Item = T>) -> Result<Self, BuildError> {
        match self {
            Matcher::All => Ok(Matcher::blacklist(values)),
            _ => Err(BuildError::UnsupportedDifference),
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Matcher::All)
    }

    pub fn is_loopback(&self) -> bool {
        matches!(self, Matcher::Loopback)
    }
}

impl<T> Default for Matcher<T> {
    fn default() -> Self {
        Matcher::All
    }
}

impl<T: Debug> fmt::Display for Matcher<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Matcher::All => f.write_str("all"),
            Matcher::Loopback => f.write_str("same"),
            Matcher::Whitelist(values) if values.len() == 1 => write!(f, "{:?}", values[0]),
            Matcher::Whitelist(values) => write!(f, "{:?}", values),
            Matcher::Blacklist(values) if values.len() == 1 => {
                write!(f, "all - {:?}", values[0])
            }
            Matcher::Blacklist(values) => write!(f, "all - {:?}", values),
        }
    }
}

impl<T: Debug> Debug for Matcher<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Matcher({})", self)
    }
}

fn dedup<T: PartialEq>(values: impl IntoIterator<Item = T>) -> Vec<T> {
    let mut unique = Vec::new();
    for value in values {
        if !unique.contains(&value) {
            unique.push(value);
        }
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_matches_everything() {
        let matcher: Matcher<&str> = Matcher::All;
        assert!(matcher.matches(&"parked", None));
        assert!(matcher.matches(&"", Some(&"idling")));
        assert!(matcher.values().is_empty());
    }

    #[test]
    fn whitelist_matches_members_only() {
        let matcher = Matcher::whitelist(["parked", "idling"]);
        assert!(matcher.matches(&"parked", None));
        assert!(!matcher.matches(&"stalled", None));
    }

    #[test]
    fn blacklist_excludes_members() {
        let matcher = Matcher::blacklist(["parked"]);
        assert!(!matcher.matches(&"parked", None));
        assert!(matcher.matches(&"idling", None));
    }

    #[test]
    fn loopback_compares_against_from() {
        let matcher = Matcher::Loopback;
        assert!(matcher.matches(&"parked", Some(&"parked")));
        assert!(!matcher.matches(&"idling", Some(&"parked")));
        assert!(!matcher.matches(&"parked", None));
    }

    #[test]
    fn filter_preserves_whitelist_order() {
        let matcher = Matcher::whitelist(["stalled", "parked"]);
        assert_eq!(
            matcher.filter(&["parked", "idling", "stalled"]),
            vec!["stalled", "parked"]
        );
    }

    #[test]
    fn filter_preserves_candidate_order_for_blacklist() {
        let matcher = Matcher::blacklist(["idling"]);
        assert_eq!(
            matcher.filter(&["stalled", "idling", "parked"]),
            vec!["stalled", "parked"]
        );
    }

    #[test]
    fn loopback_filter_is_empty() {
        let matcher: Matcher<&str> = Matcher::Loopback;
        assert!(matcher.filter(&["parked"]).is_empty());
    }

    #[test]
    fn difference_of_all_is_blacklist() {
        let matcher: Matcher<&str> = Matcher::All;
        assert_eq!(
            matcher.difference(["parked"]).unwrap(),
            Matcher::Blacklist(vec!["parked"])
        );
    }

    #[test]
    fn difference_requires_all() {
        let matcher = Matcher::whitelist(["parked"]);
        assert_eq!(
            matcher.difference(["idling"]),
            Err(BuildError::UnsupportedDifference)
        );
    }

    #[test]
    fn constructors_drop_duplicates() {
        let matcher = Matcher::whitelist(["parked", "parked", "idling"]);
        assert_eq!(matcher.values(), &["parked", "idling"]);
    }

    #[test]
    fn display_describes_matcher() {
        assert_eq!(Matcher::<&str>::All.to_string(), "all");
        assert_eq!(Matcher::<&str>::Loopback.to_string(), "same");
        assert_eq!(Matcher::whitelist(["parked"]).to_string(), "\"parked\"");
        assert_eq!(
            Matcher::whitelist(["parked", "idling"]).to_string(),
            "[\"parked\", \"idling\"]"
        );
        assert_eq!(
            Matcher::blacklist(["parked"]).to_string(),
            "all - \"parked\""
        );
    }
}
