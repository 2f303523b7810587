//! Ranking period handlers
//!
//! GET /api/rankings, GET /api/rankings/periods, GET /api/rankings/trending,
//! GET /api/rankings/:period, POST /api/admin/rankings/build,
//! POST /api/admin/rankings/preview, PUT /api/admin/rankings/current,
//! DELETE /api/admin/rankings/:period

use axum::{
    extract::{Path, Query, State},
    routing::{delete, get, post, put},
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
    error::{ApiError, ApiResult},
    services::{
        delete_period_and_relink, trending_for, BuildOptions, BuildSummary, RankingBuilder,
        RankingPreview, TrendingAnalysis,
    },
    AppState,
};
use aipr_common::events::RankingEvent;
use aipr_common::models::{ranking::ensure_safe_period, RankingPeriod};

/// GET /api/rankings/periods response
#[derive(Debug, Serialize)]
pub struct PeriodsResponse {
    /// Newest first
    pub periods: Vec<String>,
    pub current: Option<String>,
}

/// POST /api/admin/rankings/build request
#[derive(Debug, Deserialize)]
pub struct BuildRequest {
    pub period: String,
    #[serde(default)]
    pub preview_date: Option<NaiveDate>,
    #[serde(default)]
    pub enable_ai: bool,
    #[serde(default)]
    pub set_current: bool,
}

impl BuildRequest {
    fn options(&self) -> BuildOptions {
        BuildOptions {
            preview_date: self.preview_date,
            enable_ai: self.enable_ai,
            set_current: self.set_current,
        }
    }

    fn builder(&self, state: &AppState) -> ApiResult<RankingBuilder> {
        if self.period.trim().is_empty() {
            return Err(ApiError::BadRequest(
                "Period is required (YYYY-MM or YYYY-MM-DD)".to_string(),
            ));
        }
        if self.enable_ai && state.extractor.is_none() {
            return Err(ApiError::BadRequest(
                "AI analysis requested but no OpenRouter API key is configured".to_string(),
            ));
        }
        Ok(RankingBuilder::new(state.repos.clone())
            .with_extractor(state.extractor.clone())
            .with_event_bus(state.event_bus.clone()))
    }
}

/// GET /api/rankings/trending query
#[derive(Debug, Deserialize)]
pub struct TrendingQuery {
    /// Number of recent months, or `all`
    pub months: Option<String>,
}

/// PUT /api/admin/rankings/current request
#[derive(Debug, Deserialize)]
pub struct SetCurrentRequest {
    pub period: String,
}

/// DELETE /api/admin/rankings/:period response
#[derive(Debug, Serialize)]
pub struct DeletePeriodResponse {
    pub deleted: String,
    pub relinked_period: Option<String>,
    pub new_current: Option<String>,
}

/// GET /api/rankings
pub async fn get_current_rankings(State(state): State<AppState>) -> ApiResult<Json<RankingPeriod>> {
    state
        .repos
        .rankings
        .get_current_rankings()
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("No current ranking period".to_string()))
}

/// GET /api/rankings/periods
pub async fn list_periods(State(state): State<AppState>) -> ApiResult<Json<PeriodsResponse>> {
    let periods = state.repos.rankings.get_periods().await?;
    let current = state.repos.rankings.get_current_period().await?;
    Ok(Json(PeriodsResponse { periods, current }))
}

/// GET /api/rankings/:period
pub async fn get_period(
    State(state): State<AppState>,
    Path(period): Path<String>,
) -> ApiResult<Json<RankingPeriod>> {
    ensure_safe_period(&period)?;
    state
        .repos
        .rankings
        .get_period(&period)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Ranking period not found: {}", period)))
}

/// POST /api/admin/rankings/build
pub async fn build_rankings(
    State(state): State<AppState>,
    Json(request): Json<BuildRequest>,
) -> ApiResult<Json<BuildSummary>> {
    let builder = request.builder(&state)?;
    match builder.build(&request.period, &request.options()).await {
        Ok(summary) => Ok(Json(summary)),
        Err(e) => {
            tracing::error!(period = %request.period, error = %e, "Ranking build failed");
            *state.last_error.write().await = Some(format!("Build {}: {}", request.period, e));
            Err(e.into())
        }
    }
}

/// POST /api/admin/rankings/preview
pub async fn preview_rankings(
    State(state): State<AppState>,
    Json(request): Json<BuildRequest>,
) -> ApiResult<Json<RankingPreview>> {
    let builder = request.builder(&state)?;
    Ok(Json(builder.preview(&request.period, &request.options()).await?))
}

/// GET /api/rankings/trending
pub async fn get_trending(
    State(state): State<AppState>,
    Query(query): Query<TrendingQuery>,
) -> ApiResult<Json<TrendingAnalysis>> {
    let months = match query.months.as_deref().map(str::trim) {
        None | Some("") | Some("all") => None,
        Some(raw) => match raw.parse::<u32>() {
            Ok(n) if n > 0 => Some(n),
            _ => {
                return Err(ApiError::BadRequest(format!(
                    "months must be a positive number or 'all', got '{}'",
                    raw
                )))
            }
        },
    };
    let today = chrono::Utc::now().date_naive();
    let analysis = trending_for(state.repos.rankings.as_ref(), months, today).await?;
    Ok(Json(analysis))
}

/// PUT /api/admin/rankings/current
pub async fn set_current_period(
    State(state): State<AppState>,
    Json(request): Json<SetCurrentRequest>,
) -> ApiResult<Json<PeriodsResponse>> {
    ensure_safe_period(&request.period)?;
    state.repos.rankings.set_current_period(&request.period).await?;

    tracing::info!(period = %request.period, "Current ranking period changed");
    state.event_bus.emit_lossy(RankingEvent::CurrentPeriodChanged {
        period: request.period.clone(),
        timestamp: chrono::Utc::now(),
    });

    let periods = state.repos.rankings.get_periods().await?;
    Ok(Json(PeriodsResponse {
        periods,
        current: Some(request.period),
    }))
}

/// DELETE /api/admin/rankings/:period
pub async fn delete_period(
    State(state): State<AppState>,
    Path(period): Path<String>,
) -> ApiResult<Json<DeletePeriodResponse>> {
    ensure_safe_period(&period)?;
    let outcome = delete_period_and_relink(state.repos.rankings.as_ref(), &period).await?;
    if !outcome.deleted {
        return Err(ApiError::NotFound(format!(
            "Ranking period not found: {}",
            period
        )));
    }

    let now = chrono::Utc::now();
    state.event_bus.emit_lossy(RankingEvent::RankingPeriodDeleted {
        period: period.clone(),
        relinked_period: outcome.relinked_period.clone(),
        timestamp: now,
    });
    if let Some(current) = &outcome.new_current {
        state.event_bus.emit_lossy(RankingEvent::CurrentPeriodChanged {
            period: current.clone(),
            timestamp: now,
        });
    }

    Ok(Json(DeletePeriodResponse {
        deleted: period,
        relinked_period: outcome.relinked_period,
        new_current: outcome.new_current,
    }))
}

/// Build ranking routes
pub fn rankings_routes() -> Router<AppState> {
    Router::new()
        .route("/api/rankings", get(get_current_rankings))
        .route("/api/rankings/periods", get(list_periods))
        .route("/api/rankings/trending", get(get_trending))
        .route("/api/rankings/:period", get(get_period))
        .route("/api/admin/rankings/build", post(build_rankings))
        .route("/api/admin/rankings/preview", post(preview_rankings))
        .route("/api/admin/rankings/current", put(set_current_period))
        .route("/api/admin/rankings/:period", delete(delete_period))
}
