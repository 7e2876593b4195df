//! Sluice - scripted user-defined functions for stream processing
//!
//! Sluice lets a stream engine plug Lua functions into per-tuple evaluation
//! and windowed aggregation. A UDF defines `evaluate(value)` and optionally
//! `exclude(value)` and `clear()`.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use sluice::{Dispatcher, Event, PartitionKey, Registry, Value};
//!
//! # fn main() -> sluice::Result<()> {
//! let registry = Arc::new(Registry::new());
//! registry.register("sum", r#"
//!     local total = 0
//!     function evaluate(v) total = total + v return total end
//!     function exclude(v) total = total - v return total end
//!     function clear() total = 0 end
//! "#)?;
//!
//! let dispatcher = Dispatcher::new(registry);
//! let window = PartitionKey::from("window-1");
//! dispatcher.dispatch("sum", &window, Event::Arrive(Value::Int(2)))?;
//! let total = dispatcher.dispatch("sum", &window, Event::Arrive(Value::Int(3)))?;
//! assert_eq!(total, Value::Int(5));
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! Engine values live in `sluice-core`; compilation, instances and dispatch
//! live in `sluice-engine`. This crate re-exports both.

pub use sluice_core::{List, Map, PartitionKey, Record, RecordBuilder, Value};
pub use sluice_engine::*;
