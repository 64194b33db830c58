//! Machine settings and collection options.
//!
//! Both structs deserialize from JSON with defaults for every missing field
//! and reject unknown keys.

use crate::error::Error;
use serde::{Deserialize, Serialize};

/// Settings applied to a machine at build time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Wrap collection execution in the integration's transaction boundary.
    pub use_transactions: bool,
    /// Halt callback chains whenever a handler returns `false`.
    pub halt_on_false: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            use_transactions: true,
            halt_on_false: false,
        }
    }
}

impl Settings {
    pub fn from_json(json: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Execution options for a [`TransitionCollection`](crate::effects::TransitionCollection).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CollectionOptions {
    /// Run the machines' actions.
    pub actions: bool,
    /// Run after callbacks. When false they are deferred to a later perform.
    pub after: bool,
    pub use_transactions: bool,
}

impl Default for CollectionOptions {
    fn default() -> Self {
        Self {
            actions: true,
            after: true,
            use_transactions: true,
        }
    }
}

impl CollectionOptions {
    /// Parse options, rejecting unsupported keys as a configuration error.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        serde_json::from_str(json).map_err(|e| Error::Configuration(e.to_string()))
    }

    pub fn skip_actions(self) -> Self {
        Self {
            actions: false,
            ..self
        }
    }

    pub fn skip_after(self) -> Self {
        Self {
            after: false,
            ..self
        }
    }

    pub fn without_transactions(self) -> Self {
        Self {
            use_transactions: false,
            ..self
        }
    }
}
