//! Partition Isolation Tests
//!
//! Instances of the same definition never observe each other's state.

use crate::common::*;
use std::sync::Arc;

#[test]
fn partitions_keep_separate_totals() {
    let d = fixture_dispatcher();
    let a = partition("a");
    let b = partition("b");

    assert_eq!(arrive(&d, "sum", &a, 123), Value::Int(123));
    assert_eq!(arrive(&d, "sum", &b, 123), Value::Int(123));
    assert_eq!(arrive(&d, "sum", &a, 123), Value::Int(246));
    assert_eq!(arrive(&d, "sum", &b, 1), Value::Int(124));
}

#[test]
fn reset_is_scoped_to_one_partition() {
    let d = fixture_dispatcher();
    let a = partition("a");
    let b = partition("b");

    arrive(&d, "sum", &a, 10);
    arrive(&d, "sum", &b, 20);
    d.dispatch("sum", &a, Event::Reset).unwrap();

    assert_eq!(arrive(&d, "sum", &a, 1), Value::Int(1));
    assert_eq!(arrive(&d, "sum", &b, 1), Value::Int(21));
}

#[test]
fn udfs_sharing_a_partition_are_independent() {
    let d = fixture_dispatcher();
    let w = partition("w");

    arrive(&d, "sum", &w, 5);
    arrive(&d, "count", &w, 5);
    assert_eq!(arrive(&d, "sum", &w, 5), Value::Int(10));
    assert_eq!(arrive(&d, "count", &w, 5), Value::Int(2));
}

#[test]
fn globals_written_by_a_hook_stay_private() {
    init_tracing();
    let registry = Arc::new(Registry::new());
    registry
        .register(
            "leaky",
            "function evaluate(v) if v ~= nil then shared = v end return shared end",
        )
        .unwrap();
    let d = Dispatcher::new(registry);

    assert_eq!(arrive(&d, "leaky", &partition("a"), "secret"), Value::from("secret"));
    assert_eq!(arrive(&d, "leaky", &partition("b"), Value::Null), Value::Null);
}

#[test]
fn retire_then_recreate_starts_fresh() {
    let d = fixture_dispatcher();
    let w = partition("w");

    arrive(&d, "sum", &w, 40);
    assert!(d.retire("sum", &w).unwrap());
    assert_eq!(d.instance_state("sum", &w), InstanceState::Uninitialized);
    assert_eq!(arrive(&d, "sum", &w, 2), Value::Int(2));
}

#[test]
fn direct_instances_are_isolated() {
    let registry = fixture_registry();
    let def = registry.lookup("sum").unwrap();

    let mut first = Instance::create(Arc::clone(&def), "first").unwrap();
    let mut second = Instance::create(def, "second").unwrap();

    assert_eq!(first.evaluate(&Value::Int(123)).unwrap(), Value::Int(123));
    assert_eq!(first.evaluate(&Value::Int(123)).unwrap(), Value::Int(246));
    assert_eq!(second.evaluate(&Value::Int(123)).unwrap(), Value::Int(123));

    first.retire().unwrap();
    assert!(first.evaluate(&Value::Int(1)).unwrap_err().is_retired());
    assert_eq!(second.evaluate(&Value::Int(1)).unwrap(), Value::Int(124));
}
