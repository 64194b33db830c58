//! Build errors for branches, events, callbacks and machines.

use stillwater::validation::Validation;
use stillwater::NonEmptyVec;
use thiserror::Error;

/// Errors that can occur when building machine definitions.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BuildError {
    #[error("Conflicting options: .{first}() and .{second}() cannot both be used")]
    ConflictingOptions {
        first: &'static str,
        second: &'static str,
    },

    #[error("Implicit .map() requirements cannot be combined with .from()/.to() options")]
    MixedRequirements,

    #[error("Event transitions cannot restrict events. Remove .on()/.except_on()")]
    EventRequirementNotAllowed,

    #[error("Event transition for '{event}' has no requirements. Call .from(), .to() or .map()")]
    NoRequirements { event: String },

    #[error("Callback has no handlers. Call .run(handler) or .run_around(handler)")]
    NoHandlers,

    #[error("Handler kind does not match callback kind '{kind}'")]
    HandlerKindMismatch { kind: &'static str },

    #[error("No integration for attribute '{attribute}'. Call .accessor() or .integration()")]
    MissingIntegration { attribute: String },

    #[error("Only Matcher::All supports difference")]
    UnsupportedDifference,

    #[error("{} build errors: {}", .0.len(), join(.0))]
    Multiple(Vec<BuildError>),
}

fn join(errors: &[BuildError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

pub(crate) type Check = Validation<(), NonEmptyVec<BuildError>>;

pub(crate) fn check(ok: bool, error: BuildError) -> Check {
    if ok {
        Validation::success(())
    } else {
        Validation::fail(error)
    }
}

/// Collapse accumulated checks into a single result.
///
/// A single violation is returned as-is; several are wrapped in
/// [`BuildError::Multiple`].
pub(crate) fn validate(checks: Vec<Check>) -> Result<(), BuildError> {
    match Validation::all_vec(checks).map(|_| ()) {
        Validation::Success(_) => Ok(()),
        Validation::Failure(errors) => {
            let mut errors: Vec<BuildError> = errors.iter().cloned().collect();
            if errors.len() == 1 {
                Err(errors.remove(0))
            } else {
                Err(BuildError::Multiple(errors))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_passes_when_all_checks_pass() {
        let checks = vec![
            check(true, BuildError::MixedRequirements),
            check(true, BuildError::NoHandlers),
        ];
        assert_eq!(validate(checks), Ok(()));
    }

    #[test]
    fn validate_returns_single_error_unwrapped() {
        let checks = vec![
            check(true, BuildError::MixedRequirements),
            check(false, BuildError::NoHandlers),
        ];
        assert_eq!(validate(checks), Err(BuildError::NoHandlers));
    }

    #[test]
    fn validate_accumulates_all_errors() {
        let checks = vec![
            check(false, BuildError::MixedRequirements),
            check(false, BuildError::NoHandlers),
        ];

        match validate(checks) {
            Err(BuildError::Multiple(errors)) => {
                assert_eq!(errors.len(), 2);
                assert!(errors.contains(&BuildError::MixedRequirements));
                assert!(errors.contains(&BuildError::NoHandlers));
            }
            other => panic!("Expected accumulated errors, got {:?}", other),
        }
    }

    #[test]
    fn multiple_error_message_lists_causes() {
        let error = BuildError::Multiple(vec![
            BuildError::UnsupportedDifference,
            BuildError::MixedRequirements,
        ]);
        assert!(error.to_string().starts_with("2 build errors: "));
    }
}
