//! Identifier types shared by the engine
//!
//! - PartitionKey: identifies the window/partition that owns a UDF instance

use serde::{Deserialize, Serialize};
use std::fmt;

/// Key of the window or partition that owns a UDF instance
///
/// The windowing scheduler chooses the key; this crate only requires that two
/// partitions which must not share accumulator state have different keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PartitionKey(String);

impl PartitionKey {
    /// Create a partition key from any string-like value
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Get the key as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the key, returning the inner string
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PartitionKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for PartitionKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&String> for PartitionKey {
    fn from(s: &String) -> Self {
        Self(s.clone())
    }
}

impl From<i64> for PartitionKey {
    fn from(n: i64) -> Self {
        Self(n.to_string())
    }
}

impl From<u64> for PartitionKey {
    fn from(n: u64) -> Self {
        Self(n.to_string())
    }
}

impl AsRef<str> for PartitionKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
