//! Scripted UDF engine
//!
//! This crate hosts user-defined functions written in Lua:
//! - Registry: compiles sources into immutable definitions by name
//! - Instance: one private execution context per (udf, partition)
//! - Dispatcher: routes arrive/depart/reset events to the right instance
//! - TypeBridge: converts engine values to and from script values
//!
//! The engine is the only component that knows about:
//! - Hook discovery (`evaluate`, `exclude`, `clear`)
//! - Execution context isolation
//! - Script fault reporting with partition context

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bridge;
pub mod config;
pub mod definition;
pub mod dispatcher;
mod env;
pub mod error;
pub mod instance;
pub mod registry;

pub use bridge::TypeBridge;
pub use config::{ScriptConfig, CONFIG_FILE_NAME};
pub use definition::{Definition, FunctionKind, Hook, HookSet};
pub use dispatcher::{Dispatcher, Event};
pub use env::HELPER_TABLE;
pub use error::{Error, Result};
pub use instance::{Instance, InstanceState};
pub use registry::{Registry, GLOBAL_REGISTRY};
