//! aipr-rank library interface
//!
//! Exposes repositories, services and the HTTP router for the binary and
//! for integration tests.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod json_db;
pub mod pagination;
pub mod repository;
pub mod services;

pub use crate::error::{ApiError, ApiResult};
pub use crate::repository::{open_repositories, Repositories};

use aipr_common::events::EventBus;
use axum::Router;
use chrono::{DateTime, Utc};
use services::QualitativeExtractor;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Tools, news and rankings behind the configured backend
    pub repos: Repositories,
    /// Event bus for SSE broadcasting
    pub event_bus: EventBus,
    /// Present when an OpenRouter key is configured
    pub extractor: Option<Arc<dyn QualitativeExtractor>>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last error for diagnostic purposes
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(repos: Repositories, event_bus: EventBus) -> Self {
        Self {
            repos,
            event_bus,
            extractor: None,
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }

    pub fn with_extractor(mut self, extractor: Option<Arc<dyn QualitativeExtractor>>) -> Self {
        self.extractor = extractor;
        self
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    Router::new()
        .merge(api::rankings_routes())
        .merge(api::tools_routes())
        .merge(api::news_routes())
        .route("/events", get(api::event_stream))
        .merge(api::health_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
