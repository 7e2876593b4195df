//! Core types for Sluice
//!
//! This crate defines the engine-native types that cross the UDF boundary:
//! - Value: Unified value enum (scalars, List, Map, Record)
//! - List / Map: Shared collection handles (clones alias storage)
//! - Record: Fixed-schema structure with named, ordered fields
//! - PartitionKey: Identifies the window/partition owning a UDF instance

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod types;
pub mod value;

pub use types::PartitionKey;
pub use value::{List, Map, Record, RecordBuilder, Value};
