//! Alerting test suite.
//!
//! Drives the alert pipeline, queue and task endpoints end-to-end against the
//! in-memory result store. No database or mail relay is required.
//!
//! Run with: cargo test --test alerting

mod test_helpers;

mod test_concurrency;
mod test_queue;
mod test_scenarios;
