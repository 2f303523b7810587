//! News table operations

use super::{decode, decode_all, timestamp_key};
use crate::pagination::{calculate_pagination, Page};
use crate::repository::{matches_query, NewsRepository};
use aipr_common::models::NewsArticle;
use aipr_common::{time, Error, Result};
use async_trait::async_trait;
use sqlx::SqlitePool;
use tracing::debug;

const NEWEST_FIRST: &str = "ORDER BY published_date DESC, id ASC";

pub struct SqlNewsRepository {
    pool: SqlitePool,
}

impl SqlNewsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn fetch_where(&self, clause: &str, bind: &str) -> Result<Vec<NewsArticle>> {
        let sql = format!("SELECT data FROM news WHERE {} {}", clause, NEWEST_FIRST);
        let rows: Vec<String> = sqlx::query_scalar(&sql)
            .bind(bind)
            .fetch_all(&self.pool)
            .await?;
        decode_all(rows)
    }
}

#[async_trait]
impl NewsRepository for SqlNewsRepository {
    async fn get_all(&self) -> Result<Vec<NewsArticle>> {
        let sql = format!("SELECT data FROM news {}", NEWEST_FIRST);
        let rows: Vec<String> = sqlx::query_scalar(&sql).fetch_all(&self.pool).await?;
        decode_all(rows)
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<NewsArticle>> {
        let row: Option<String> = sqlx::query_scalar("SELECT data FROM news WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_deref().map(decode).transpose()
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<NewsArticle>> {
        let row: Option<String> = sqlx::query_scalar("SELECT data FROM news WHERE slug = ?")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        row.as_deref().map(decode).transpose()
    }

    async fn get_by_month(&self, month: &str) -> Result<Vec<NewsArticle>> {
        time::parse_month_key(month)?;
        self.fetch_where("month = ?", month).await
    }

    async fn get_recent(&self, limit: usize) -> Result<Vec<NewsArticle>> {
        let sql = format!("SELECT data FROM news {} LIMIT ?", NEWEST_FIRST);
        let rows: Vec<String> = sqlx::query_scalar(&sql)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;
        decode_all(rows)
    }

    async fn get_by_tool_mention(&self, tool_id: &str) -> Result<Vec<NewsArticle>> {
        self.fetch_where(
            "EXISTS (SELECT 1 FROM json_each(news.data, '$.tool_mentions') WHERE value = ?)",
            tool_id,
        )
        .await
    }

    // Tag and text matching happen in Rust: SQLite's lower() only folds ASCII
    async fn get_by_tag(&self, tag: &str) -> Result<Vec<NewsArticle>> {
        let tag = tag.to_lowercase();
        let mut articles = self.get_all().await?;
        articles.retain(|a| a.tags.iter().any(|t| t.to_lowercase() == tag));
        Ok(articles)
    }

    async fn search(&self, query: &str) -> Result<Vec<NewsArticle>> {
        let mut articles = self.get_all().await?;
        articles.retain(|a| {
            matches_query(
                query,
                &[
                    a.title.as_str(),
                    a.summary.as_deref().unwrap_or_default(),
                    a.content.as_str(),
                ],
            )
        });
        Ok(articles)
    }

    async fn upsert(&self, article: NewsArticle) -> Result<()> {
        let data = serde_json::to_string(&article)?;
        let mut tx = self.pool.begin().await?;

        let owner: Option<String> =
            sqlx::query_scalar("SELECT id FROM news WHERE slug = ? AND id != ?")
                .bind(&article.slug)
                .bind(&article.id)
                .fetch_optional(&mut *tx)
                .await?;
        if let Some(owner) = owner {
            return Err(Error::Conflict(format!(
                "Slug {} already belongs to article {}",
                article.slug, owner
            )));
        }

        sqlx::query(
            r#"
            INSERT INTO news (id, slug, title, published_date, month, data)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                slug = excluded.slug,
                title = excluded.title,
                published_date = excluded.published_date,
                month = excluded.month,
                data = excluded.data
            "#,
        )
        .bind(&article.id)
        .bind(&article.slug)
        .bind(&article.title)
        .bind(timestamp_key(article.published_date))
        .bind(article.month_key())
        .bind(&data)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        debug!(article_id = %article.id, "Saved article");
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM news WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_paginated(&self, page: usize, limit: usize) -> Result<Page<NewsArticle>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM news")
            .fetch_one(&self.pool)
            .await?;
        let p = calculate_pagination(total.max(0) as usize, page, limit);

        let sql = format!("SELECT data FROM news {} LIMIT ? OFFSET ?", NEWEST_FIRST);
        let rows: Vec<String> = sqlx::query_scalar(&sql)
            .bind(p.limit as i64)
            .bind(p.offset as i64)
            .fetch_all(&self.pool)
            .await?;

        Ok(Page {
            items: decode_all(rows)?,
            total: total.max(0) as usize,
            page: p.page,
            limit: p.limit,
            total_pages: p.total_pages,
        })
    }
}
