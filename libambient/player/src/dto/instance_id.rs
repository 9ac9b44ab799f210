use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifies one coordinator instance (one tab). Ordering is used to break ties when two
/// instances claim ownership at the same time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceId(Uuid);

impl InstanceId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }
}

impl Default for InstanceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The short form is enough to tell tabs apart in logs
        write!(f, "{}", &self.0.simple().to_string()[..8])
    }
}
