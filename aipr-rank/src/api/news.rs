//! News handlers
//!
//! GET /api/news, GET /api/news/:id, POST /api/admin/news,
//! DELETE /api/admin/news/:id

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;

use crate::{
    error::{ApiError, ApiResult},
    pagination::{Page, DEFAULT_PAGE_SIZE},
    services::{ingest_article, IngestRequest},
    AppState,
};
use aipr_common::models::NewsArticle;

/// GET /api/news query parameters
///
/// At most one filter applies, checked in the order tool, tag, month, q.
#[derive(Debug, Default, Deserialize)]
pub struct NewsQuery {
    pub page: Option<usize>,
    pub limit: Option<usize>,
    /// Tool id
    pub tool: Option<String>,
    pub tag: Option<String>,
    /// `YYYY-MM`
    pub month: Option<String>,
    pub q: Option<String>,
}

/// GET /api/news
pub async fn list_news(
    State(state): State<AppState>,
    Query(query): Query<NewsQuery>,
) -> ApiResult<Json<Page<NewsArticle>>> {
    let page = query.page.unwrap_or(1);
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE);
    let news = &state.repos.news;

    let filtered = if let Some(tool) = &query.tool {
        Some(news.get_by_tool_mention(tool).await?)
    } else if let Some(tag) = &query.tag {
        Some(news.get_by_tag(tag).await?)
    } else if let Some(month) = &query.month {
        Some(news.get_by_month(month).await?)
    } else if let Some(q) = query.q.as_deref().filter(|q| !q.trim().is_empty()) {
        Some(news.search(q).await?)
    } else {
        None
    };

    let result = match filtered {
        Some(articles) => Page::from_vec(articles, page, limit),
        None => news.get_paginated(page, limit).await?,
    };
    Ok(Json(result))
}

/// GET /api/news/:id
///
/// Accepts an article id or slug.
pub async fn get_article(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<NewsArticle>> {
    let news = &state.repos.news;
    let article = match news.get_by_id(&id).await? {
        Some(article) => Some(article),
        None => news.get_by_slug(&id).await?,
    };
    article
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Article not found: {}", id)))
}

/// POST /api/admin/news
pub async fn create_article(
    State(state): State<AppState>,
    Json(request): Json<IngestRequest>,
) -> ApiResult<(StatusCode, Json<NewsArticle>)> {
    let article = ingest_article(&state.repos, Some(&state.event_bus), request).await?;
    Ok((StatusCode::CREATED, Json(article)))
}

/// DELETE /api/admin/news/:id
pub async fn delete_article(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    if state.repos.news.delete(&id).await? {
        tracing::info!(article_id = %id, "Article deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("Article not found: {}", id)))
    }
}

/// Build news routes
pub fn news_routes() -> Router<AppState> {
    Router::new()
        .route("/api/news", get(list_news))
        .route("/api/news/:id", get(get_article))
        .route("/api/admin/news", post(create_article))
        .route("/api/admin/news/:id", delete(delete_article))
}
