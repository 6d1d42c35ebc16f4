//! HTTP API handlers for mta-engine

pub mod health;
pub mod meetings;
pub mod tasks;
pub mod webhook;

pub use health::health_routes;
pub use meetings::meeting_routes;
pub use tasks::task_routes;
pub use webhook::webhook_routes;
