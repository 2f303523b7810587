//! Ranking storage: `rankings/index.json` plus one file per period

use super::{read_json, remove_if_exists, with_suffix, write_json_atomic, IndexMetadata};
use crate::repository::RankingsRepository;
use aipr_common::models::ranking::{ensure_safe_period, validate_period};
use aipr_common::models::RankingPeriod;
use aipr_common::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

/// Contents of `rankings/index.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingsIndex {
    /// Newest first
    pub periods: Vec<String>,
    #[serde(default)]
    pub current: Option<String>,
    pub metadata: IndexMetadata,
}

impl RankingsIndex {
    fn empty() -> Self {
        Self {
            periods: Vec::new(),
            current: None,
            metadata: IndexMetadata::touched(0),
        }
    }

    fn sort(&mut self) {
        self.periods.sort_by(|a, b| b.cmp(a));
        self.periods.dedup();
        self.metadata = IndexMetadata::touched(self.periods.len());
    }
}

pub struct JsonRankingsRepository {
    dir: PathBuf,
    /// Serializes index read-modify-write cycles
    index: Mutex<RankingsIndex>,
}

impl JsonRankingsRepository {
    /// Open (and create if needed) `<root>/rankings`
    pub async fn open(root: &Path) -> Result<Self> {
        let dir = root.join("rankings");
        tokio::fs::create_dir_all(dir.join("periods")).await?;

        let index_path = dir.join("index.json");
        let mut index = match read_json::<RankingsIndex>(&index_path).await? {
            Some(index) => index,
            None => {
                let index = RankingsIndex::empty();
                write_json_atomic(&index_path, &index).await?;
                index
            }
        };
        // An empty current pointer in older files means "none"
        if index.current.as_deref() == Some("") {
            index.current = None;
        }
        index.sort();
        info!(periods = index.periods.len(), current = ?index.current, "Loaded ranking index");

        Ok(Self {
            dir,
            index: Mutex::new(index),
        })
    }

    fn index_path(&self) -> PathBuf {
        self.dir.join("index.json")
    }

    fn period_path(&self, period: &str) -> PathBuf {
        self.dir.join("periods").join(format!("{}.json", period))
    }

    async fn read_period(&self, period: &str) -> Result<Option<RankingPeriod>> {
        read_json(&self.period_path(period)).await
    }

    /// Rewrite a period file's `is_current` flag if the file exists
    async fn write_flag(&self, period: &str, is_current: bool) -> Result<()> {
        if let Some(mut stored) = self.read_period(period).await? {
            if stored.is_current != is_current {
                stored.is_current = is_current;
                write_json_atomic(&self.period_path(period), &stored).await?;
            }
        }
        Ok(())
    }

    async fn write_period_with_backup(
        &self,
        index: &mut RankingsIndex,
        period: &RankingPeriod,
    ) -> Result<()> {
        let path = self.period_path(&period.period);
        let backup = with_suffix(&path, ".backup");
        let had_previous = tokio::fs::try_exists(&path).await?;
        if had_previous {
            tokio::fs::copy(&path, &backup).await?;
        }

        let mut next = index.clone();
        if !next.periods.contains(&period.period) {
            next.periods.push(period.period.clone());
        }
        if period.is_current {
            next.current = Some(period.period.clone());
        }
        next.sort();

        let result = async {
            write_json_atomic(&path, period).await?;
            write_json_atomic(&self.index_path(), &next).await
        }
        .await;

        match result {
            Ok(()) => {
                *index = next;
                Ok(())
            }
            Err(e) => {
                error!(period = %period.period, "Failed to save rankings: {}", e);
                if had_previous {
                    if let Err(restore) = tokio::fs::copy(&backup, &path).await {
                        error!(period = %period.period, "Backup restore failed: {}", restore);
                    }
                }
                Err(e)
            }
        }
    }
}

#[async_trait]
impl RankingsRepository for JsonRankingsRepository {
    async fn get_periods(&self) -> Result<Vec<String>> {
        Ok(self.index.lock().await.periods.clone())
    }

    async fn get_current_period(&self) -> Result<Option<String>> {
        Ok(self.index.lock().await.current.clone())
    }

    async fn get_period(&self, period: &str) -> Result<Option<RankingPeriod>> {
        ensure_safe_period(period)?;
        let current = self.index.lock().await.current.clone();
        let stored = self.read_period(period).await?;
        Ok(stored.map(|mut p| {
            p.is_current = current.as_deref() == Some(period);
            p
        }))
    }

    async fn save_period(&self, mut period: RankingPeriod) -> Result<()> {
        validate_period(&period.period)?;
        let mut index = self.index.lock().await;

        if index.current.as_deref() == Some(period.period.as_str()) {
            period.is_current = true;
        }
        let previous_current = index.current.clone();

        self.write_period_with_backup(&mut index, &period).await?;

        if period.is_current {
            if let Some(old) = previous_current.filter(|old| old != &period.period) {
                self.write_flag(&old, false).await?;
            }
        }

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
        let mut index = self.index.lock().await;
        if !index.periods.iter().any(|p| p == period)
            || !tokio::fs::try_exists(self.period_path(period)).await?
        {
            return Err(Error::NotFound(format!("Period {} does not exist", period)));
        }

        let mut next = index.clone();
        let previous = next.current.replace(period.to_string());
        next.metadata = IndexMetadata::touched(next.periods.len());
        write_json_atomic(&self.index_path(), &next).await?;
        *index = next;

        if let Some(old) = previous.filter(|old| old != period) {
            self.write_flag(&old, false).await?;
        }
        self.write_flag(period, true).await?;

        info!(period = %period, "Current ranking period set");
        Ok(())
    }

    async fn delete_period(&self, period: &str) -> Result<bool> {
        ensure_safe_period(period)?;
        let mut index = self.index.lock().await;
        let path = self.period_path(period);
        if !tokio::fs::try_exists(&path).await? {
            return Ok(false);
        }

        tokio::fs::copy(&path, with_suffix(&path, ".deleted.backup")).await?;
        remove_if_exists(&path).await?;
        // The overwrite backup is meaningless once the period is gone
        remove_if_exists(&with_suffix(&path, ".backup")).await?;

        index.periods.retain(|p| p != period);
        let was_current = index.current.as_deref() == Some(period);
        if was_current {
            index.current = index.periods.first().cloned();
        }
        index.sort();
        write_json_atomic(&self.index_path(), &*index).await?;

        if was_current {
            match index.current.clone() {
                Some(next) => {
                    self.write_flag(&next, true).await?;
                    info!(period = %period, new_current = %next, "Deleted current period");
                }
                None => warn!(period = %period, "Deleted the only ranking period"),
            }
        } else {
            info!(period = %period, "Ranking period deleted");
        }
        Ok(true)
    }

    async fn rename_period(&self, old: &str, new: &str) -> Result<bool> {
        ensure_safe_period(old)?;
        validate_period(new)?;
        let mut index = self.index.lock().await;

        let Some(mut stored) = self.read_period(old).await? else {
            return Ok(false);
        };
        let new_path = self.period_path(new);
        if tokio::fs::try_exists(&new_path).await? {
            return Err(Error::Conflict(format!("Period {} already exists", new)));
        }

        stored.period = new.to_string();
        write_json_atomic(&new_path, &stored).await?;
        remove_if_exists(&self.period_path(old)).await?;

        for p in index.periods.iter_mut() {
            if p.as_str() == old {
                *p = new.to_string();
            }
        }
        if index.current.as_deref() == Some(old) {
            index.current = Some(new.to_string());
        }
        index.sort();
        write_json_atomic(&self.index_path(), &*index).await?;

        info!(from = %old, to = %new, "Ranking period renamed");
        Ok(true)
    }
}
