//! Attention topics.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A named attention channel with one arbitration winner at a time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct Topic(pub String);

impl Topic {
    /// The default topic consumed by eye/neck actuation.
    pub const LOOK: &'static str = "look";

    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn look() -> Self {
        Self(Self::LOOK.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Topic {
    fn default() -> Self {
        Self::look()
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Topic {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}
