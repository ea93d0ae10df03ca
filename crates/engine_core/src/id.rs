//! Scene object identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier of a scene object.
///
/// Identifiers are handed out by a monotonically increasing counter and are never
/// reused within a process, so a stale id can never alias a newer object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(pub u64);

impl ObjectId {
    pub fn raw(self) -> u64 {
        self.0
    }

    /// Parse the textual form produced by `Display` (`#12`) or a bare number (`12`).
    pub fn parse(text: &str) -> Option<Self> {
        let digits = text.strip_prefix('#').unwrap_or(text);
        digits.parse::<u64>().ok().map(ObjectId)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
