//! Rankings table operations

use super::{decode, timestamp_key};
use crate::repository::RankingsRepository;
use aipr_common::models::ranking::{ensure_safe_period, validate_period};
use aipr_common::models::RankingPeriod;
use aipr_common::{Error, Result};
use async_trait::async_trait;
use sqlx::SqlitePool;
use tracing::{info, warn};

pub struct SqlRankingsRepository {
    pool: SqlitePool,
}

impl SqlRankingsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RankingsRepository for SqlRankingsRepository {
    async fn get_periods(&self) -> Result<Vec<String>> {
        let rows: Vec<String> =
            sqlx::query_scalar("SELECT period FROM rankings ORDER BY period DESC")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows)
    }

    async fn get_current_period(&self) -> Result<Option<String>> {
        let row: Option<String> =
            sqlx::query_scalar("SELECT period FROM rankings WHERE is_current = 1 LIMIT 1")
                .fetch_optional(&self.pool)
                .await?;
        Ok(row)
    }

    async fn get_period(&self, period: &str) -> Result<Option<RankingPeriod>> {
        ensure_safe_period(period)?;
        let row: Option<(String, bool)> =
            sqlx::query_as("SELECT data, is_current FROM rankings WHERE period = ?")
                .bind(period)
                .fetch_optional(&self.pool)
                .await?;
        match row {
            Some((data, is_current)) => {
                let mut stored: RankingPeriod = decode(&data)?;
                stored.is_current = is_current;
                Ok(Some(stored))
            }
            None => Ok(None),
        }
    }

    async fn save_period(&self, mut period: RankingPeriod) -> Result<()> {
        validate_period(&period.period)?;
        let mut tx = self.pool.begin().await?;

        let already_current: Option<bool> =
            sqlx::query_scalar("SELECT is_current FROM rankings WHERE period = ?")
                .bind(&period.period)
                .fetch_optional(&mut *tx)
                .await?;
        if already_current == Some(true) {
            period.is_current = true;
        }
        if period.is_current {
            sqlx::query("UPDATE rankings SET is_current = 0 WHERE period != ?")
                .bind(&period.period)
                .execute(&mut *tx)
                .await?;
        }

        let data = serde_json::to_string(&period)?;
        sqlx::query(
            r#"
            INSERT INTO rankings (period, algorithm_version, is_current, created_at, data)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(period) DO UPDATE SET
                algorithm_version = excluded.algorithm_version,
                is_current = excluded.is_current,
                created_at = excluded.created_at,
                data = excluded.data
            "#,
        )
        .bind(&period.period)
        .bind(&period.algorithm_version)
        .bind(period.is_current)
        .bind(timestamp_key(period.created_at))
        .bind(&data)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        info!(
            period = %period.period,
            entries = period.rankings.len(),
            is_current = period.is_current,
            "Rankings saved"
        );
        Ok(())
    }

    async fn set_current_period(&self, period: &str) -> Result<()> {
        ensure_safe_period(period)?;
        let mut tx = self.pool.begin().await?;

        let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM rankings WHERE period = ?")
            .bind(period)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(Error::NotFound(format!("Period {} does not exist", period)));
        }

        sqlx::query("UPDATE rankings SET is_current = (period = ?)")
            .bind(period)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!(period = %period, "Current ranking period set");
        Ok(())
    }

    async fn delete_period(&self, period: &str) -> Result<bool> {
        ensure_safe_period(period)?;
        let mut tx = self.pool.begin().await?;

        let was_current: Option<bool> =
            sqlx::query_scalar("SELECT is_current FROM rankings WHERE period = ?")
                .bind(period)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(was_current) = was_current else {
            return Ok(false);
        };

        sqlx::query("DELETE FROM rankings WHERE period = ?")
            .bind(period)
            .execute(&mut *tx)
            .await?;

        if was_current {
            let newest: Option<String> =
                sqlx::query_scalar("SELECT period FROM rankings ORDER BY period DESC LIMIT 1")
                    .fetch_optional(&mut *tx)
                    .await?;
            match newest {
                Some(next) => {
                    sqlx::query("UPDATE rankings SET is_current = 1 WHERE period = ?")
                        .bind(&next)
                        .execute(&mut *tx)
                        .await?;
                    info!(period = %period, new_current = %next, "Deleted current period");
                }
                None => warn!(period = %period, "Deleted the only ranking period"),
            }
        } else {
            info!(period = %period, "Ranking period deleted");
        }

        tx.commit().await?;
        Ok(true)
    }

    async fn rename_period(&self, old: &str, new: &str) -> Result<bool> {
        ensure_safe_period(old)?;
        validate_period(new)?;
        let mut tx = self.pool.begin().await?;

        let row: Option<String> = sqlx::query_scalar("SELECT data FROM rankings WHERE period = ?")
            .bind(old)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(data) = row else {
            return Ok(false);
        };

        let taken: Option<i64> = sqlx::query_scalar("SELECT 1 FROM rankings WHERE period = ?")
            .bind(new)
            .fetch_optional(&mut *tx)
            .await?;
        if taken.is_some() {
            return Err(Error::Conflict(format!("Period {} already exists", new)));
        }

        let mut stored: RankingPeriod = decode(&data)?;
        stored.period = new.to_string();
        sqlx::query("UPDATE rankings SET period = ?, data = ? WHERE period = ?")
            .bind(new)
            .bind(serde_json::to_string(&stored)?)
            .bind(old)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!(from = %old, to = %new, "Ranking period renamed");
        Ok(true)
    }
}
