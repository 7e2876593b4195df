//! Error types for the UDF engine
//!
//! All failures surfaced to the stream engine are represented by [`Error`].
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! # Categories
//!
//! | Variant | Raised by | Meaning |
//! |---------|-----------|---------|
//! | `Compile` | `Registry::register` | Bad source or missing entry points |
//! | `NotFound` | `Registry::lookup`, `Dispatcher::dispatch` | Unknown UDF name |
//! | `InstanceRetired` | `Instance` hook calls | Call after `retire()` |
//! | `MissingHook` | `Instance::create` | Context lost a hook the definition declared |
//! | `ScriptExecution` | hook calls | Runtime fault inside the script |
//! | `Config` | `ScriptConfig` | Unreadable or invalid configuration |
//!
//! No variant is retried automatically; only the engine knows whether replaying
//! a window into a fresh instance is safe.

use crate::definition::Hook;
use sluice_core::PartitionKey;
use thiserror::Error;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the UDF engine
#[derive(Debug, Error)]
pub enum Error {
    /// Source failed to compile, failed during top-level initialization, or
    /// defines no usable entry points
    #[error("compile error in udf '{name}': {reason}")]
    Compile {
        /// UDF name being registered
        name: String,
        /// What went wrong
        reason: String,
    },

    /// No definition registered under this name
    #[error("udf not found: {name}")]
    NotFound {
        /// Requested UDF name
        name: String,
    },

    /// Hook invoked on an instance that has been retired
    #[error("instance retired: udf '{name}' partition '{partition}'")]
    InstanceRetired {
        /// UDF name
        name: String,
        /// Owning partition
        partition: PartitionKey,
    },

    /// A hook recorded on the definition is not a function in the execution context
    #[error("hook '{hook}' is undefined in udf '{name}'")]
    MissingHook {
        /// UDF name
        name: String,
        /// Missing hook
        hook: Hook,
    },

    /// Runtime fault raised inside a hook
    #[error("script execution failed: udf '{udf}' partition '{partition}' hook '{hook}': {cause}")]
    ScriptExecution {
        /// UDF name
        udf: String,
        /// Owning partition
        partition: PartitionKey,
        /// Entry point that faulted (a hook name, or `init` for top-level code)
        hook: &'static str,
        /// Underlying script runtime error
        #[source]
        cause: mlua::Error,
    },

    /// Invalid configuration
    #[error("config error: {reason}")]
    Config {
        /// What went wrong
        reason: String,
    },
}

impl Error {
    /// Create a compile error
    pub fn compile(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Compile {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create a not-found error
    pub fn not_found(name: impl Into<String>) -> Self {
        Error::NotFound { name: name.into() }
    }

    /// Create a config error
    pub fn config(reason: impl Into<String>) -> Self {
        Error::Config {
            reason: reason.into(),
        }
    }

    /// Check if this is a compile error
    pub fn is_compile(&self) -> bool {
        matches!(self, Error::Compile { .. })
    }

    /// Check if this is a not-found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    /// Check if this is a retired-instance error
    pub fn is_retired(&self) -> bool {
        matches!(self, Error::InstanceRetired { .. })
    }

    /// Check if this is a script runtime fault
    pub fn is_script_execution(&self) -> bool {
        matches!(self, Error::ScriptExecution { .. })
    }

    /// Partition the error is attached to, if any
    pub fn partition(&self) -> Option<&PartitionKey> {
        match self {
            Error::InstanceRetired { partition, .. } | Error::ScriptExecution { partition, .. } => {
                Some(partition)
            }
            _ => None,
        }
    }
}
