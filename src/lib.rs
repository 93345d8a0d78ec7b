//! Testwatch server library.
//!
//! Tracks the health of periodically executed tests. Each completed run is
//! diffed against the stored status of its test, the new status is committed
//! under optimistic concurrency, and subscribers receive one alert digest
//! when the set of failing test cases changes.

pub mod api;
pub mod config;
pub mod db;
pub mod entity;
pub mod error;
pub mod middleware;
pub mod migration;
pub mod models;
pub mod services;
pub mod store;
