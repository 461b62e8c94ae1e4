//! Strongly-typed identifiers used across lineage.
//!
//! Plans and activities get globally unique UUID ids; revisions are opaque
//! strings owned by the history provider (commit shas for git).

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! new_id {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Ord, PartialOrd,
        )]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Fresh random id.
            pub fn generate() -> Self {
                Self(Uuid::new_v4())
            }
            pub const fn from_uuid(v: Uuid) -> Self {
                Self(v)
            }
            pub const fn get(self) -> Uuid {
                self.0
            }
            /// Lowercase hex without dashes, used in generated names.
            pub fn simple(self) -> String {
                self.0.simple().to_string()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }
    };
}

new_id!(PlanId);
new_id!(ActivityId);

/// Opaque revision identifier (a commit sha for git-backed histories).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Ord, PartialOrd)]
#[serde(transparent)]
pub struct RevisionId(String);

impl RevisionId {
    pub fn new(v: impl Into<String>) -> Self {
        Self(v.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 8 characters, for log lines and reports.
    pub fn short(&self) -> &str {
        let end = self
            .0
            .char_indices()
            .nth(8)
            .map(|(i, _)| i)
            .unwrap_or(self.0.len());
        &self.0[..end]
    }
}

impl fmt::Display for RevisionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RevisionId {
    fn from(v: &str) -> Self {
        Self::new(v)
    }
}

impl From<String> for RevisionId {
    fn from(v: String) -> Self {
        Self(v)
    }
}
