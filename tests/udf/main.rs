//! Scripted UDF integration tests
//!
//! End-to-end behavior through the public `sluice` API: registration,
//! dispatch, windowed aggregation, value bridging and concurrency.

#[path = "../common/mod.rs"]
mod common;

mod concurrency;
mod config_file;
mod isolation;
mod windowed_sum;
