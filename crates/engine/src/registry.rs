//! UDF registry
//!
//! Maps UDF names to compiled [`Definition`]s. Populated while plans are
//! compiled, read on every dispatch, torn down at shutdown.
//!
//! Compilation happens before the write lock is taken, so a slow or failing
//! registration never blocks concurrent lookups, and a failed re-registration
//! leaves the previous definition in place.

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::ScriptConfig;
use crate::definition::Definition;
use crate::env::Environment;
use crate::error::{Error, Result};

// =============================================================================
// Global Registry
// =============================================================================
//
// Engines that run a single plan compiler per process share one registry
// through `Registry::global()`. Embedders that need separate namespaces (tests,
// multi-tenant hosts) construct their own `Registry` instead.
//
// Uses parking_lot::RwLock so a panicking writer does not poison readers.

/// Process-wide registry with the default configuration
pub static GLOBAL_REGISTRY: Lazy<Arc<Registry>> = Lazy::new(|| Arc::new(Registry::new()));

/// Name-to-definition map
#[derive(Debug)]
pub struct Registry {
    definitions: RwLock<HashMap<String, Arc<Definition>>>,
    env: Arc<Environment>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Create an empty registry with the default configuration
    pub fn new() -> Self {
        Self {
            definitions: RwLock::new(HashMap::new()),
            env: Arc::new(Environment::default()),
        }
    }

    /// Create an empty registry whose definitions use `config`
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the configuration names an unknown library.
    pub fn with_config(config: &ScriptConfig) -> Result<Self> {
        Ok(Self {
            definitions: RwLock::new(HashMap::new()),
            env: Arc::new(Environment::from_config(config)?),
        })
    }

    /// Shared process-wide registry
    pub fn global() -> Arc<Registry> {
        Arc::clone(&GLOBAL_REGISTRY)
    }

    /// Compile `source` and store it under `name`
    ///
    /// Replaces any existing definition for instances created afterwards;
    /// existing instances keep the definition they were created with.
    ///
    /// # Errors
    ///
    /// Returns `Error::Compile` if the source is invalid. The registry is
    /// unchanged in that case.
    pub fn register(&self, name: &str, source: &str) -> Result<Arc<Definition>> {
        let definition = match Definition::compile_in(name, source, Arc::clone(&self.env)) {
            Ok(definition) => Arc::new(definition),
            Err(e) => {
                warn!(target: "sluice::registry", udf = name, error = %e, "Registration rejected");
                return Err(e);
            }
        };

        let previous = self
            .definitions
            .write()
            .insert(name.to_string(), Arc::clone(&definition));

        match previous {
            Some(_) => {
                info!(target: "sluice::registry", udf = %definition, "Replaced udf definition")
            }
            None => info!(target: "sluice::registry", udf = %definition, "Registered udf"),
        }
        Ok(definition)
    }

    /// Resolve a definition by name
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` for an unknown name.
    pub fn lookup(&self, name: &str) -> Result<Arc<Definition>> {
        self.definitions
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| Error::not_found(name))
    }

    /// Remove a definition; existing instances keep running
    pub fn unregister(&self, name: &str) -> Option<Arc<Definition>> {
        let removed = self.definitions.write().remove(name);
        if removed.is_some() {
            info!(target: "sluice::registry", udf = name, "Unregistered udf");
        }
        removed
    }

    /// Check whether `name` is registered
    pub fn contains(&self, name: &str) -> bool {
        self.definitions.read().contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.definitions.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of registered definitions
    pub fn len(&self) -> usize {
        self.definitions.read().len()
    }

    /// Check if nothing is registered
    pub fn is_empty(&self) -> bool {
        self.definitions.read().is_empty()
    }

    /// Drop every definition
    pub fn clear(&self) {
        let mut definitions = self.definitions.write();
        let count = definitions.len();
        definitions.clear();
        info!(target: "sluice::registry", count, "Registry cleared");
    }
}
