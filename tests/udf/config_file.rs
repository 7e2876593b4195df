//! Configuration Tests
//!
//! Registries built from a `sluice.toml` apply its settings to every
//! execution context.

use crate::common::*;
use sluice::CONFIG_FILE_NAME;
use std::sync::Arc;
use tempfile::TempDir;

fn registry_from(toml: &str) -> Arc<Registry> {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    std::fs::write(&path, toml).unwrap();

    let config = ScriptConfig::from_file(&path).unwrap();
    Arc::new(Registry::with_config(&config).unwrap())
}

#[test]
fn opaque_prefix_is_configurable() {
    let registry = registry_from("opaque_prefix = \"udf\"\n");
    registry
        .register("fn", "function evaluate(v) return print end")
        .unwrap();
    let d = Dispatcher::new(registry);

    let result = arrive(&d, "fn", &partition("p"), 1);
    assert!(result.as_str().unwrap().starts_with("udf:"));
}

#[test]
fn libraries_follow_config() {
    let registry = registry_from("libs = [\"math\"]\n");
    registry
        .register("floor", "function evaluate(v) return math.floor(v) end")
        .unwrap();
    let err = registry
        .register("upper", "local up = string.upper\nfunction evaluate(v) return v end")
        .unwrap_err();
    assert!(err.is_compile());

    let d = Dispatcher::new(registry);
    assert_eq!(arrive(&d, "floor", &partition("p"), 2.7), Value::Int(2));
}

#[test]
fn script_logging_can_be_disabled() {
    let registry = registry_from("script_logging = false\n");
    registry
        .register("noisy", "function evaluate(v) udf.log(udf.LOG_INFO, 'x') return v end")
        .unwrap();
    let d = Dispatcher::new(registry);

    let err = d
        .dispatch("noisy", &partition("p"), Event::Arrive(Value::Int(1)))
        .unwrap_err();
    assert!(err.is_script_execution());
}

#[test]
fn script_logging_reaches_tracing() {
    let registry = fixture_registry();
    registry
        .register(
            "chatty",
            "function evaluate(v) udf.log(udf.LOG_WARN, udf.name .. '@' .. udf.partition) return v end",
        )
        .unwrap();
    let d = Dispatcher::new(registry);
    assert_eq!(arrive(&d, "chatty", &partition("w1"), 1), Value::Int(1));
}

#[test]
fn invalid_config_is_rejected() {
    let err = ScriptConfig::from_toml_str("libs = [\"debug\"]").unwrap_err();
    assert!(matches!(err, Error::Config { .. }));
}
