//! mta-engine library interface
//!
//! Exposes the application state and router for the binary and for
//! integration tests.

pub mod api;
pub mod error;
pub mod models;
pub mod services;
pub mod state;
pub mod utils;
pub mod validators;

pub use crate::error::{ApiError, ApiResult};

use std::sync::Arc;

use axum::Router;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;

use crate::services::{LocalTaskTracker, MeetingRegistry, Pipeline};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Webhook processing pipeline
    pub pipeline: Arc<Pipeline>,
    /// Monitored meeting sessions
    pub registry: Arc<MeetingRegistry>,
    /// Set when the local tracker is in use; enables `/tasks`
    pub local_tasks: Option<Arc<LocalTaskTracker>>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last server-side error for diagnostics
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(pipeline: Pipeline, local_tasks: Option<Arc<LocalTaskTracker>>) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            registry: Arc::new(MeetingRegistry::new()),
            local_tasks,
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }

    /// Remember a failure for `/health`
    pub async fn record_error(&self, message: impl Into<String>) {
        *self.last_error.write().await = Some(message.into());
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::webhook_routes())
        .merge(api::meeting_routes())
        .merge(api::task_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
