//! API endpoint modules.

pub mod health;
pub mod openapi;
pub mod tasks;

pub use health::configure_health_routes;
pub use openapi::ApiDoc;
pub use tasks::configure_routes as configure_task_routes;
