//! Liveness and diagnostics

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// "ok", or "degraded" when the rankings store cannot be read
    pub status: &'static str,
    pub module: &'static str,
    pub version: &'static str,
    pub uptime_seconds: u64,
    pub ai_available: bool,
    pub current_period: Option<String>,
    pub sse_clients: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime_seconds = Utc::now()
        .signed_duration_since(state.startup_time)
        .num_seconds()
        .max(0) as u64;

    let (status, current_period) = match state.repos.rankings.get_current_period().await {
        Ok(period) => ("ok", period),
        Err(e) => {
            tracing::warn!("Health check could not read rankings: {}", e);
            ("degraded", None)
        }
    };

    Json(HealthResponse {
        status,
        module: "aipr-rank",
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds,
        ai_available: state.extractor.is_some(),
        current_period,
        sse_clients: state.event_bus.subscriber_count(),
        last_error: state.last_error.read().await.clone(),
    })
}

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
