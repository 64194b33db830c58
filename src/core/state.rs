//! The `State` trait for state attribute values.
//!
//! A machine never stores state itself; it reads and writes values of a
//! type implementing this trait through its integration.

use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Trait for values a state attribute can hold.
///
/// # Required Traits
///
/// - `Clone`: values are copied into transitions and paths
/// - `PartialEq`: matchers compare values for membership
/// - `Debug`: values appear in matcher descriptions and errors
/// - `Serialize` + `Deserialize`: values can travel through integrations
///
/// # Example
///
/// ```rust
/// use switchyard::core::State;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
/// enum Door {
///     Open,
///     Closed,
/// }
///
/// impl State for Door {
///     fn name(&self) -> &str {
///         match self {
///             Self::Open => "open",
///             Self::Closed => "closed",
///         }
///     }
/// }
///
/// assert_eq!(Door::Open.name(), "open");
/// ```
pub trait State:
    Clone + PartialEq + Debug + Serialize + for<'de> Deserialize<'de> + Send + Sync
{
    /// Name used in logs, invalidation messages and errors.
    fn name(&self) -> &str;
}

impl State for String {
    fn name(&self) -> &str {
        self.as_str()
    }
}
