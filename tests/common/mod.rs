//! Shared test utilities for the integration suites.
//!
//! Import via `mod common;` from a suite's main.rs.

#![allow(dead_code)]

use std::sync::{Arc, Once};

pub use sluice::{
    Dispatcher, Error, Event, FunctionKind, Hook, Instance, InstanceState, List, Map,
    PartitionKey, Record, Registry, ScriptConfig, Value,
};

// ============================================================================
// Initialization
// ============================================================================

static INIT_TRACING: Once = Once::new();

/// Route engine logs to the test harness output (`RUST_LOG` filters them).
pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

// ============================================================================
// Fixtures
// ============================================================================

/// Running sum; skips anything that is not a number.
pub const SUM_SCRIPT: &str = r#"
local total = 0

function evaluate(value)
  if type(value) == "number" then
    total = total + value
  end
  return total
end

function exclude(value)
  if type(value) == "number" then
    total = total - value
  end
  return total
end

function clear()
  total = 0
end
"#;

/// Appends to sequences, adds a key to mappings, tags everything else.
pub const ECHO_SCRIPT: &str = r#"
function evaluate(value)
  local shape = udf.shape(value)
  if shape == "sequence" then
    value:add("lua")
    return value
  elseif shape == "mapping" then
    value:put("lua", "value")
    return value
  end
  return "lua 1:" .. tostring(value)
end
"#;

/// Stateless transform with no retraction support.
pub const EVALUATE_ONLY: &str = r#"
function evaluate(value)
  return value
end
"#;

/// Counts tuples; resettable but not retractable.
pub const COUNT_SCRIPT: &str = r#"
local n = 0

function evaluate(value)
  n = n + 1
  return n
end

function clear()
  n = 0
end
"#;

/// Faults on null tuples.
pub const STRICT_SCRIPT: &str = r#"
function evaluate(value)
  if value == nil then
    error("null tuple")
  end
  return value
end
"#;

/// Builds fresh collections from plain tables.
pub const SUMMARY_SCRIPT: &str = r#"
function evaluate(value)
  local keys = {}
  for i = 1, #value do
    keys[i] = value[i]
  end
  return { count = #value, items = keys }
end
"#;

// ============================================================================
// Helpers
// ============================================================================

/// Registry with every fixture registered under its conventional name.
pub fn fixture_registry() -> Arc<Registry> {
    init_tracing();
    let registry = Arc::new(Registry::new());
    for (name, source) in [
        ("sum", SUM_SCRIPT),
        ("echo", ECHO_SCRIPT),
        ("ident", EVALUATE_ONLY),
        ("count", COUNT_SCRIPT),
        ("strict", STRICT_SCRIPT),
        ("summary", SUMMARY_SCRIPT),
    ] {
        registry.register(name, source).unwrap();
    }
    registry
}

/// Dispatcher over [`fixture_registry`].
pub fn fixture_dispatcher() -> Dispatcher {
    Dispatcher::new(fixture_registry())
}

/// Shorthand for a partition key.
pub fn partition(key: &str) -> PartitionKey {
    PartitionKey::from(key)
}

/// Deliver `Arrive(value)` and unwrap the result.
pub fn arrive(d: &Dispatcher, udf: &str, p: &PartitionKey, value: impl Into<Value>) -> Value {
    d.dispatch(udf, p, Event::Arrive(value.into())).unwrap()
}

/// Deliver `Depart(value)` and unwrap the result.
pub fn depart(d: &Dispatcher, udf: &str, p: &PartitionKey, value: impl Into<Value>) -> Value {
    d.dispatch(udf, p, Event::Depart(value.into())).unwrap()
}
