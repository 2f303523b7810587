//! Tool catalog handlers

use axum::{
    extract::{Path, Query, State},
    routing::{get, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::{ApiError, ApiResult},
    AppState,
};
use aipr_common::events::RankingEvent;
use aipr_common::models::{Tool, ToolStatus};

/// GET /api/tools query parameters
#[derive(Debug, Default, Deserialize)]
pub struct ToolsQuery {
    pub category: Option<String>,
    pub status: Option<String>,
    /// Free-text search
    pub q: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ToolsResponse {
    pub tools: Vec<Tool>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: usize,
}

/// GET /api/tools
///
/// Filters combine: search first, then category and status.
pub async fn list_tools(
    State(state): State<AppState>,
    Query(query): Query<ToolsQuery>,
) -> ApiResult<Json<ToolsResponse>> {
    let status = match query.status.as_deref() {
        Some(s) => Some(
            ToolStatus::parse(s)
                .ok_or_else(|| ApiError::BadRequest(format!("Unknown status: {}", s)))?,
        ),
        None => None,
    };

    let mut tools = match query.q.as_deref().filter(|q| !q.trim().is_empty()) {
        Some(q) => state.repos.tools.search(q).await?,
        None => state.repos.tools.get_all().await?,
    };
    if let Some(category) = &query.category {
        tools.retain(|t| &t.category == category);
    }
    if let Some(status) = status {
        tools.retain(|t| t.status == status);
    }

    Ok(Json(ToolsResponse {
        total: tools.len(),
        tools,
    }))
}

/// GET /api/tools/categories
pub async fn list_categories(State(state): State<AppState>) -> ApiResult<Json<Vec<CategoryCount>>> {
    let categories = state
        .repos
        .tools
        .categories_with_counts()
        .await?
        .into_iter()
        .map(|(category, count)| CategoryCount { category, count })
        .collect();
    Ok(Json(categories))
}

/// GET /api/tools/:slug
pub async fn get_tool(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<Json<Tool>> {
    state
        .repos
        .tools
        .get_by_slug(&slug)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Tool not found: {}", slug)))
}

/// PUT /api/admin/tools
///
/// Creates or replaces a tool by id.
pub async fn upsert_tool(
    State(state): State<AppState>,
    Json(mut tool): Json<Tool>,
) -> ApiResult<Json<Tool>> {
    if tool.id.trim().is_empty() || tool.slug.trim().is_empty() || tool.name.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "Tool id, slug and name are required".to_string(),
        ));
    }
    tool.updated_at = chrono::Utc::now();
    state.repos.tools.upsert(tool.clone()).await?;

    tracing::info!(tool_id = %tool.id, slug = %tool.slug, "Tool saved");
    state.event_bus.emit_lossy(RankingEvent::ToolUpdated {
        tool_id: tool.id.clone(),
        slug: tool.slug.clone(),
        timestamp: tool.updated_at,
    });

    Ok(Json(tool))
}

/// Build tool routes
pub fn tools_routes() -> Router<AppState> {
    Router::new()
        .route("/api/tools", get(list_tools))
        .route("/api/tools/categories", get(list_categories))
        .route("/api/tools/:slug", get(get_tool))
        .route("/api/admin/tools", put(upsert_tool))
}
