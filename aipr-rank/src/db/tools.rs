//! Tool table operations

use super::{decode, decode_all, timestamp_key};
use crate::repository::{matches_query, ToolsRepository};
use aipr_common::models::{tool::ensure_safe_slug, Tool, ToolStatus};
use aipr_common::{Error, Result};
use async_trait::async_trait;
use sqlx::SqlitePool;
use tracing::debug;

pub struct SqlToolsRepository {
    pool: SqlitePool,
}

impl SqlToolsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ToolsRepository for SqlToolsRepository {
    async fn get_all(&self) -> Result<Vec<Tool>> {
        let rows: Vec<String> = sqlx::query_scalar("SELECT data FROM tools ORDER BY name, id")
            .fetch_all(&self.pool)
            .await?;
        decode_all(rows)
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Tool>> {
        let row: Option<String> = sqlx::query_scalar("SELECT data FROM tools WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_deref().map(decode).transpose()
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Tool>> {
        let row: Option<String> = sqlx::query_scalar("SELECT data FROM tools WHERE slug = ?")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        row.as_deref().map(decode).transpose()
    }

    async fn get_by_category(&self, category: &str) -> Result<Vec<Tool>> {
        let rows: Vec<String> =
            sqlx::query_scalar("SELECT data FROM tools WHERE category = ? ORDER BY name, id")
                .bind(category)
                .fetch_all(&self.pool)
                .await?;
        decode_all(rows)
    }

    async fn get_by_status(&self, status: ToolStatus) -> Result<Vec<Tool>> {
        let rows: Vec<String> =
            sqlx::query_scalar("SELECT data FROM tools WHERE status = ? ORDER BY name, id")
                .bind(status.as_str())
                .fetch_all(&self.pool)
                .await?;
        decode_all(rows)
    }

    async fn upsert(&self, tool: Tool) -> Result<()> {
        ensure_safe_slug(&tool.slug)?;
        let data = serde_json::to_string(&tool)?;
        let mut tx = self.pool.begin().await?;

        let owner: Option<String> =
            sqlx::query_scalar("SELECT id FROM tools WHERE slug = ? AND id != ?")
                .bind(&tool.slug)
                .bind(&tool.id)
                .fetch_optional(&mut *tx)
                .await?;
        if let Some(owner) = owner {
            return Err(Error::Conflict(format!(
                "Slug {} already belongs to tool {}",
                tool.slug, owner
            )));
        }

        sqlx::query(
            r#"
            INSERT INTO tools (id, slug, name, category, status, data, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                slug = excluded.slug,
                name = excluded.name,
                category = excluded.category,
                status = excluded.status,
                data = excluded.data,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&tool.id)
        .bind(&tool.slug)
        .bind(&tool.name)
        .bind(&tool.category)
        .bind(tool.status.as_str())
        .bind(&data)
        .bind(timestamp_key(tool.updated_at))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        debug!(tool_id = %tool.id, slug = %tool.slug, "Saved tool");
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM tools WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // Filtered in Rust: SQLite's lower() only folds ASCII
    async fn search(&self, query: &str) -> Result<Vec<Tool>> {
        let mut tools = self.get_all().await?;
        tools.retain(|t| {
            matches_query(
                query,
                &[
                    t.name.as_str(),
                    t.slug.as_str(),
                    t.info.summary.as_str(),
                    t.info.description.as_str(),
                ],
            )
        });
        Ok(tools)
    }

    async fn categories_with_counts(&self) -> Result<Vec<(String, usize)>> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT category, COUNT(*) FROM tools GROUP BY category ORDER BY category",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(category, count)| (category, count.max(0) as usize))
            .collect())
    }
}
