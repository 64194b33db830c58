//! Crate-level error and callback control types.

use crate::builder::BuildError;
use thiserror::Error;

/// Errors surfaced by the engine.
///
/// A halted callback chain is never reported through this type; halts travel
/// as [`Interrupt::Halt`] and end up as a `false` outcome.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Build(#[from] BuildError),

    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("{value} is not a known {attribute} value")]
    UnknownState { attribute: String, value: String },

    #[error("{event} is an unknown state machine event")]
    InvalidEvent { event: String },

    #[error("cannot transition {attribute} via :{event} from {state}")]
    InvalidTransition {
        attribute: String,
        event: String,
        state: String,
    },

    #[error("action failed: {0}")]
    Action(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Wrap an arbitrary error raised by an action or callback handler.
    pub fn action(error: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Error::Action(error.into())
    }

    /// Returns an error code suitable for logs and integration layers.
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Build(_) | Error::Configuration(_) => "CONFIGURATION",
            Error::UnknownState { .. } => "UNKNOWN_STATE",
            Error::InvalidEvent { .. } => "INVALID_EVENT",
            Error::InvalidTransition { .. } => "INVALID_TRANSITION",
            Error::Action(_) => "ACTION_FAILED",
            Error::Json(_) => "BAD_REQUEST",
        }
    }
}

/// Why a callback chain stopped before running to completion.
///
/// Handlers return `Result<_, Interrupt>`; `?` on a `Result<_, Error>`
/// converts into [`Interrupt::Error`].
#[derive(Debug)]
pub enum Interrupt {
    /// Stop the chain. Not an error: the operation reports `false`.
    Halt,
    /// Propagate an error to the caller.
    Error(Error),
}

impl Interrupt {
    pub fn is_halt(&self) -> bool {
        matches!(self, Interrupt::Halt)
    }
}

impl From<Error> for Interrupt {
    fn from(error: Error) -> Self {
        Interrupt::Error(error)
    }
}

/// Halt the current callback chain.
///
/// ```rust
/// use switchyard::{halt, Interrupt};
///
/// let outcome: Result<(), Interrupt> = halt();
/// assert!(outcome.unwrap_err().is_halt());
/// ```
pub fn halt<T>() -> Result<T, Interrupt> {
    Err(Interrupt::Halt)
}
