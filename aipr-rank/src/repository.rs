//! Repository traits shared by the JSON and SQLite backends
//!
//! Services and handlers only see these traits; `open_repositories` picks the
//! backend named in configuration.

use crate::pagination::Page;
use aipr_common::config::StorageBackend;
use aipr_common::models::{NewsArticle, RankingPeriod, Tool, ToolStatus};
use aipr_common::Result;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

#[async_trait]
pub trait ToolsRepository: Send + Sync {
    /// All tools ordered by name
    async fn get_all(&self) -> Result<Vec<Tool>>;
    async fn get_by_id(&self, id: &str) -> Result<Option<Tool>>;
    async fn get_by_slug(&self, slug: &str) -> Result<Option<Tool>>;
    async fn get_by_category(&self, category: &str) -> Result<Vec<Tool>>;
    async fn get_by_status(&self, status: ToolStatus) -> Result<Vec<Tool>>;
    /// Insert or replace by id; a slug owned by another tool is a conflict
    async fn upsert(&self, tool: Tool) -> Result<()>;
    /// Returns false when no tool had this id
    async fn delete(&self, id: &str) -> Result<bool>;
    /// Case-insensitive match on name, slug, summary and description
    async fn search(&self, query: &str) -> Result<Vec<Tool>>;
    /// `(category, tool count)` ordered by category
    async fn categories_with_counts(&self) -> Result<Vec<(String, usize)>>;
}

#[async_trait]
pub trait NewsRepository: Send + Sync {
    /// All articles, newest first
    async fn get_all(&self) -> Result<Vec<NewsArticle>>;
    async fn get_by_id(&self, id: &str) -> Result<Option<NewsArticle>>;
    async fn get_by_slug(&self, slug: &str) -> Result<Option<NewsArticle>>;
    /// Articles published in a `YYYY-MM` month, newest first
    async fn get_by_month(&self, month: &str) -> Result<Vec<NewsArticle>>;
    async fn get_recent(&self, limit: usize) -> Result<Vec<NewsArticle>>;
    async fn get_by_tool_mention(&self, tool_id: &str) -> Result<Vec<NewsArticle>>;
    async fn get_by_tag(&self, tag: &str) -> Result<Vec<NewsArticle>>;
    /// Case-insensitive match on title, summary and content
    async fn search(&self, query: &str) -> Result<Vec<NewsArticle>>;
    /// Insert or replace by id; a slug owned by another article is a conflict
    async fn upsert(&self, article: NewsArticle) -> Result<()>;
    async fn delete(&self, id: &str) -> Result<bool>;
    async fn get_paginated(&self, page: usize, limit: usize) -> Result<Page<NewsArticle>>;
}

#[async_trait]
pub trait RankingsRepository: Send + Sync {
    /// Stored period identifiers, newest first
    async fn get_periods(&self) -> Result<Vec<String>>;
    async fn get_current_period(&self) -> Result<Option<String>>;
    /// A stored period; `is_current` reflects the current pointer
    async fn get_period(&self, period: &str) -> Result<Option<RankingPeriod>>;
    /// Create or overwrite a period
    ///
    /// A period flagged `is_current` becomes current. Re-saving the current
    /// period keeps it current.
    async fn save_period(&self, period: RankingPeriod) -> Result<()>;
    /// Fails with `NotFound` when the period is not stored
    async fn set_current_period(&self, period: &str) -> Result<()>;
    /// Remove a period; when it was current the newest remaining period
    /// becomes current. Returns false when nothing was stored.
    async fn delete_period(&self, period: &str) -> Result<bool>;
    /// Returns false when `old` is missing; `Conflict` when `new` exists
    async fn rename_period(&self, old: &str, new: &str) -> Result<bool>;

    async fn get_current_rankings(&self) -> Result<Option<RankingPeriod>> {
        match self.get_current_period().await? {
            Some(period) => self.get_period(&period).await,
            None => Ok(None),
        }
    }
}

/// The three repositories behind one backend
#[derive(Clone)]
pub struct Repositories {
    pub tools: Arc<dyn ToolsRepository>,
    pub news: Arc<dyn NewsRepository>,
    pub rankings: Arc<dyn RankingsRepository>,
}

/// Open the configured backend rooted at `data_dir`
///
/// JSON documents live under `<data_dir>/json/`, the SQLite database at
/// `<data_dir>/aipr.db`.
pub async fn open_repositories(backend: StorageBackend, data_dir: &Path) -> Result<Repositories> {
    match backend {
        StorageBackend::Json => {
            let root = data_dir.join("json");
            info!(root = %root.display(), "Using JSON file storage");
            Ok(Repositories {
                tools: Arc::new(crate::json_db::JsonToolsRepository::open(&root).await?),
                news: Arc::new(crate::json_db::JsonNewsRepository::open(&root).await?),
                rankings: Arc::new(crate::json_db::JsonRankingsRepository::open(&root).await?),
            })
        }
        StorageBackend::Sqlite => {
            let db_path = data_dir.join("aipr.db");
            info!(db = %db_path.display(), "Using SQLite storage");
            let pool = crate::db::init_database_pool(&db_path).await?;
            Ok(Repositories {
                tools: Arc::new(crate::db::SqlToolsRepository::new(pool.clone())),
                news: Arc::new(crate::db::SqlNewsRepository::new(pool.clone())),
                rankings: Arc::new(crate::db::SqlRankingsRepository::new(pool)),
            })
        }
    }
}

/// Lowercased substring match helper shared by both backends
pub(crate) fn matches_query(query: &str, fields: &[&str]) -> bool {
    let needle = query.to_lowercase();
    fields.iter().any(|f| f.to_lowercase().contains(&needle))
}
