//! Windowed Aggregation Tests
//!
//! Drives aggregate UDFs through arrive/depart/reset sequences the way a
//! sliding window would.

use crate::common::*;

// ============================================================================
// Running sum
// ============================================================================

#[test]
fn add_then_retract() {
    let d = fixture_dispatcher();
    let w = partition("w1");

    assert_eq!(arrive(&d, "sum", &w, 2), Value::Int(2));
    assert_eq!(arrive(&d, "sum", &w, 3), Value::Int(5));
    assert_eq!(depart(&d, "sum", &w, 2), Value::Int(3));
}

#[test]
fn reset_restarts_accumulation() {
    let d = fixture_dispatcher();
    let w = partition("w1");

    arrive(&d, "sum", &w, 2);
    assert_eq!(arrive(&d, "sum", &w, 3), Value::Int(5));
    assert_eq!(d.dispatch("sum", &w, Event::Reset).unwrap(), Value::Null);
    assert_eq!(arrive(&d, "sum", &w, 4), Value::Int(4));
}

#[test]
fn sliding_window_of_three() {
    let d = fixture_dispatcher();
    let w = partition("sliding");
    let stream: [i64; 6] = [5, 1, 4, 2, 8, 3];
    let mut expected = Vec::new();
    let mut actual = Vec::new();

    for (i, v) in stream.iter().enumerate() {
        let mut result = arrive(&d, "sum", &w, *v);
        if i >= 3 {
            result = depart(&d, "sum", &w, stream[i - 3]);
        }
        actual.push(result);

        let lo = i.saturating_sub(2);
        expected.push(Value::Int(stream[lo..=i].iter().sum()));
    }
    assert_eq!(actual, expected);
}

#[test]
fn mixed_tuples_are_skipped() {
    let d = fixture_dispatcher();
    let w = partition("w");

    assert_eq!(arrive(&d, "sum", &w, 123), Value::Int(123));
    assert_eq!(arrive(&d, "sum", &w, 37), Value::Int(160));
    assert_eq!(arrive(&d, "sum", &w, Value::Null), Value::Int(160));
    assert_eq!(arrive(&d, "sum", &w, "xyz"), Value::Int(160));
    assert_eq!(arrive(&d, "sum", &w, 20), Value::Int(180));
    assert_eq!(depart(&d, "sum", &w, 123), Value::Int(57));

    d.dispatch("sum", &w, Event::Reset).unwrap();
    assert_eq!(arrive(&d, "sum", &w, 20), Value::Int(20));
    assert_eq!(arrive(&d, "sum", &w, 100.5), Value::Float(120.5));
    assert_eq!(depart(&d, "sum", &w, 100.5), Value::Float(20.0));
}

// ============================================================================
// Partial hook sets
// ============================================================================

#[test]
fn depart_without_exclude_repeats_last_result() {
    let d = fixture_dispatcher();
    let w = partition("w");

    assert_eq!(arrive(&d, "ident", &w, 5), Value::Int(5));
    assert_eq!(depart(&d, "ident", &w, 5), Value::Int(5));
}

#[test]
fn reset_without_clear_is_noop() {
    let d = fixture_dispatcher();
    let w = partition("w");

    arrive(&d, "ident", &w, 7);
    assert_eq!(d.dispatch("ident", &w, Event::Reset).unwrap(), Value::Null);
    assert_eq!(depart(&d, "ident", &w, 7), Value::Int(7));
}

#[test]
fn clear_without_exclude() {
    let d = fixture_dispatcher();
    let w = partition("w");

    arrive(&d, "count", &w, "a");
    assert_eq!(arrive(&d, "count", &w, "b"), Value::Int(2));
    assert_eq!(depart(&d, "count", &w, "a"), Value::Int(2));
    d.dispatch("count", &w, Event::Reset).unwrap();
    assert_eq!(arrive(&d, "count", &w, "c"), Value::Int(1));
}

#[test]
fn depart_after_reset_returns_null_without_exclude() {
    let d = fixture_dispatcher();
    let w = partition("w");

    assert_eq!(arrive(&d, "count", &w, 5), Value::Int(1));
    assert_eq!(d.dispatch("count", &w, Event::Reset).unwrap(), Value::Null);
    assert_eq!(depart(&d, "count", &w, 5), Value::Null);
}

// ============================================================================
// Faults
// ============================================================================

#[test]
fn script_fault_is_surfaced_not_swallowed() {
    let d = fixture_dispatcher();
    let w = partition("w3");

    let err = d.dispatch("strict", &w, Event::Arrive(Value::Null)).unwrap_err();
    match &err {
        Error::ScriptExecution {
            udf,
            partition,
            hook,
            ..
        } => {
            assert_eq!(udf, "strict");
            assert_eq!(partition, &w);
            assert_eq!(*hook, "evaluate");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().contains("null tuple"));

    // The instance survives; the engine decides whether to keep it.
    assert_eq!(arrive(&d, "strict", &w, 1), Value::Int(1));
}

#[test]
fn init_fault_leaves_no_instance() {
    init_tracing();
    let registry = std::sync::Arc::new(Registry::new());
    registry
        .register(
            "flaky",
            "if udf.partition == 'bad' then error('cannot start') end\nfunction evaluate(v) return v end",
        )
        .unwrap();
    let d = Dispatcher::new(registry);

    let err = d
        .dispatch("flaky", &partition("bad"), Event::Arrive(Value::Int(1)))
        .unwrap_err();
    assert!(err.is_script_execution());
    assert!(err.to_string().contains("init"));
    assert_eq!(d.active_instances(), 0);

    assert_eq!(arrive(&d, "flaky", &partition("good"), 1), Value::Int(1));
}
