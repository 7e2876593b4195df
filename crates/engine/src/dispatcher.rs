//! Event routing
//!
//! The [`Dispatcher`] turns engine events into hook calls on the instance that
//! owns `(udf, partition)`, creating it on the first event.
//!
//! | Event | Hook |
//! |-------|------|
//! | `Arrive(tuple)` | `evaluate` |
//! | `Depart(tuple)` | `exclude` |
//! | `Reset` | `clear` |
//!
//! Events for one partition are delivered sequentially by the engine; distinct
//! partitions may be dispatched from different threads. Instances are indexed
//! by UDF name, then partition, so routing a warm event borrows both keys
//! without allocating. Each instance sits behind its own mutex and partitions
//! never contend with each other.

use dashmap::DashMap;
use parking_lot::Mutex;
use sluice_core::{PartitionKey, Value};
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::Result;
use crate::instance::{Instance, InstanceState};
use crate::registry::Registry;

/// Engine event delivered to a UDF instance
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A tuple entered the window
    Arrive(Value),
    /// A tuple left the window
    Depart(Value),
    /// The window was reset
    Reset,
}

type SharedInstance = Arc<Mutex<Instance>>;
type Partitions = DashMap<PartitionKey, SharedInstance>;

/// Routes events to per-partition instances
pub struct Dispatcher {
    registry: Arc<Registry>,
    instances: DashMap<String, Partitions>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("registry", &self.registry)
            .field("active_instances", &self.active_instances())
            .finish()
    }
}

impl Dispatcher {
    /// Create a dispatcher resolving definitions through `registry`
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            instances: DashMap::new(),
        }
    }

    /// Registry used to resolve definitions
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Deliver `event` to the instance owning `(udf, partition)`
    ///
    /// `Reset` returns `Value::Null`.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if `udf` is not registered, and propagates
    /// instance creation failures and script faults unchanged.
    pub fn dispatch(&self, udf: &str, partition: &PartitionKey, event: Event) -> Result<Value> {
        let definition = self.registry.lookup(udf)?;

        let instance = match self.live(udf, partition) {
            Some(instance) => instance,
            None => {
                let created = Instance::create(definition, partition.clone())?;
                let partitions = self.instances.entry(udf.to_string()).or_default();
                let entry = partitions
                    .entry(partition.clone())
                    .or_insert_with(|| Arc::new(Mutex::new(created)));
                Arc::clone(entry.value())
            }
        };

        let mut instance = instance.lock();
        match event {
            Event::Arrive(value) => instance.evaluate(&value),
            Event::Depart(value) => instance.exclude(&value),
            Event::Reset => instance.clear().map(|()| Value::Null),
        }
    }

    /// Live instance for `(udf, partition)`. Both shard guards are released
    /// on return, before any `entry` call can take a write lock.
    fn live(&self, udf: &str, partition: &PartitionKey) -> Option<SharedInstance> {
        let partitions = self.instances.get(udf)?;
        let instance = partitions.get(partition).map(|entry| Arc::clone(entry.value()));
        instance
    }

    /// Retire the instance owning `(udf, partition)`, if any
    ///
    /// Returns whether an instance was retired. The next event for the pair
    /// creates a fresh instance from the current definition.
    pub fn retire(&self, udf: &str, partition: &PartitionKey) -> Result<bool> {
        let removed = match self.instances.get(udf) {
            Some(partitions) => partitions.remove(partition),
            None => None,
        };
        match removed {
            Some((_, instance)) => {
                instance.lock().retire()?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Retire every instance owned by `partition`; returns how many
    pub fn retire_partition(&self, partition: &PartitionKey) -> Result<usize> {
        let removed: Vec<SharedInstance> = self
            .instances
            .iter()
            .filter_map(|partitions| partitions.remove(partition))
            .map(|(_, instance)| instance)
            .collect();

        for instance in &removed {
            instance.lock().retire()?;
        }
        let retired = removed.len();
        debug!(target: "sluice::dispatch", partition = %partition, retired, "Partition retired");
        Ok(retired)
    }

    /// Retire every instance
    pub fn shutdown(&self) -> Result<usize> {
        let udfs: Vec<String> = self.instances.iter().map(|e| e.key().clone()).collect();

        let mut retired = 0;
        for udf in udfs {
            if let Some((_, partitions)) = self.instances.remove(&udf) {
                for (_, instance) in partitions {
                    instance.lock().retire()?;
                    retired += 1;
                }
            }
        }
        info!(target: "sluice::dispatch", retired, "Dispatcher shut down");
        Ok(retired)
    }

    /// Number of live instances
    pub fn active_instances(&self) -> usize {
        self.instances.iter().map(|partitions| partitions.len()).sum()
    }

    /// State of the instance owning `(udf, partition)`
    ///
    /// Pairs with no live instance report `Uninitialized`: the next event
    /// creates one.
    pub fn instance_state(&self, udf: &str, partition: &PartitionKey) -> InstanceState {
        match self.live(udf, partition) {
            Some(instance) => instance.lock().state(),
            None => InstanceState::Uninitialized,
        }
    }
}
