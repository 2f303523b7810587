//! Shared fixtures for aipr-rank integration tests

#![allow(dead_code)]

use aipr_common::config::StorageBackend;
use aipr_common::models::{
    FactorScores, Movement, NewsArticle, RankingEntry, RankingPeriod, Tier, Tool, ToolInfo,
    ToolStatus, ALGORITHM_VERSION,
};
use aipr_rank::db::{init_memory_pool, SqlNewsRepository, SqlRankingsRepository, SqlToolsRepository};
use aipr_rank::{open_repositories, Repositories};
use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;
use tempfile::TempDir;

/// Repositories plus whatever keeps their storage alive
pub struct Backend {
    pub name: &'static str,
    pub repos: Repositories,
    _dir: Option<TempDir>,
}

pub async fn json_backend() -> Backend {
    let dir = TempDir::new().unwrap();
    let repos = open_repositories(StorageBackend::Json, dir.path()).await.unwrap();
    Backend {
        name: "json",
        repos,
        _dir: Some(dir),
    }
}

pub async fn sqlite_backend() -> Backend {
    let pool = init_memory_pool().await.unwrap();
    Backend {
        name: "sqlite",
        repos: Repositories {
            tools: Arc::new(SqlToolsRepository::new(pool.clone())),
            news: Arc::new(SqlNewsRepository::new(pool.clone())),
            rankings: Arc::new(SqlRankingsRepository::new(pool)),
        },
        _dir: None,
    }
}

pub async fn all_backends() -> Vec<Backend> {
    vec![json_backend().await, sqlite_backend().await]
}

pub fn utc(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
}

pub fn tool(id: &str, name: &str, category: &str) -> Tool {
    let created = utc(2024, 1, 1);
    Tool {
        id: id.to_string(),
        slug: id.to_string(),
        name: name.to_string(),
        category: category.to_string(),
        status: ToolStatus::Active,
        company_id: None,
        launch_date: None,
        aliases: vec![],
        info: ToolInfo::default(),
        tags: vec![],
        created_at: created,
        updated_at: created,
    }
}

pub fn article(id: &str, published: DateTime<Utc>, mentions: &[&str]) -> NewsArticle {
    NewsArticle {
        id: id.to_string(),
        slug: format!("{}-slug", id),
        title: format!("Article {}", id),
        content: "Plain coverage.".to_string(),
        summary: None,
        author: None,
        source: None,
        source_url: None,
        published_date: published,
        tags: vec![],
        tool_mentions: mentions.iter().map(|m| m.to_string()).collect(),
        sentiment_score: None,
        importance_score: None,
        extracted_metrics: vec![],
        created_at: published,
        updated_at: published,
    }
}

pub fn entry(id: &str, position: u32, score: f64) -> RankingEntry {
    RankingEntry {
        tool_id: id.to_string(),
        tool_name: id.to_string(),
        position,
        score,
        tier: Tier::from_position(position),
        factor_scores: FactorScores::default(),
        sentiment_analysis: None,
        movement: Movement::new_entry(),
        change_analysis: None,
        news_impact: None,
    }
}

pub fn period(id: &str, entries: Vec<RankingEntry>, is_current: bool) -> RankingPeriod {
    RankingPeriod {
        period: id.to_string(),
        algorithm_version: ALGORITHM_VERSION.to_string(),
        is_current,
        created_at: Utc::now(),
        preview_date: None,
        rankings: entries,
        metadata: None,
    }
}
