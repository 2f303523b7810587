//! Tool storage: one file per tool plus a lookup index

use super::{read_json, remove_if_exists, write_json_atomic, IndexMetadata};
use crate::repository::{matches_query, ToolsRepository};
use aipr_common::models::{tool::ensure_safe_slug, Tool, ToolStatus};
use aipr_common::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Contents of `tools-index.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolsIndex {
    /// id -> slug
    pub by_id: BTreeMap<String, String>,
    /// slug -> id
    pub by_slug: BTreeMap<String, String>,
    /// category -> ids
    pub by_category: BTreeMap<String, Vec<String>>,
    pub metadata: IndexMetadata,
}

impl ToolsIndex {
    fn build<'a>(tools: impl Iterator<Item = &'a Tool>) -> Self {
        let mut by_id = BTreeMap::new();
        let mut by_slug = BTreeMap::new();
        let mut by_category: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for tool in tools {
            by_id.insert(tool.id.clone(), tool.slug.clone());
            by_slug.insert(tool.slug.clone(), tool.id.clone());
            by_category
                .entry(tool.category.clone())
                .or_default()
                .push(tool.id.clone());
        }
        let total = by_id.len();
        Self {
            by_id,
            by_slug,
            by_category,
            metadata: IndexMetadata::touched(total),
        }
    }
}

/// Tools keyed by id, loaded once and kept in memory
pub struct JsonToolsRepository {
    dir: PathBuf,
    cache: RwLock<BTreeMap<String, Tool>>,
}

impl JsonToolsRepository {
    /// Open (and create if needed) `<root>/tools`
    pub async fn open(root: &Path) -> Result<Self> {
        let dir = root.join("tools");
        tokio::fs::create_dir_all(dir.join("individual")).await?;

        let repo = Self {
            dir,
            cache: RwLock::new(BTreeMap::new()),
        };
        let tools = repo.load().await?;
        info!(count = tools.len(), "Loaded tools");
        *repo.cache.write().await = tools;
        Ok(repo)
    }

    fn index_path(&self) -> PathBuf {
        self.dir.join("tools-index.json")
    }

    fn tool_path(&self, slug: &str) -> PathBuf {
        self.dir.join("individual").join(format!("{}.json", slug))
    }

    /// Load tools through the index, rebuilding it from the individual files
    /// when it is missing or out of step with them
    async fn load(&self) -> Result<BTreeMap<String, Tool>> {
        if let Some(index) = read_json::<ToolsIndex>(&self.index_path()).await? {
            let mut tools = BTreeMap::new();
            let mut stale = false;
            for slug in index.by_slug.keys() {
                match read_json::<Tool>(&self.tool_path(slug)).await? {
                    Some(tool) => {
                        tools.insert(tool.id.clone(), tool);
                    }
                    None => {
                        stale = true;
                        break;
                    }
                }
            }
            if !stale && tools.len() == self.count_files().await? {
                return Ok(tools);
            }
            warn!("Tools index is stale, rebuilding from individual files");
        } else {
            debug!("No tools index found, rebuilding from individual files");
        }

        let tools = self.scan_files().await?;
        write_json_atomic(&self.index_path(), &ToolsIndex::build(tools.values())).await?;
        Ok(tools)
    }

    async fn count_files(&self) -> Result<usize> {
        let mut entries = tokio::fs::read_dir(self.dir.join("individual")).await?;
        let mut count = 0;
        while let Some(entry) = entries.next_entry().await? {
            if entry.path().extension().is_some_and(|e| e == "json") {
                count += 1;
            }
        }
        Ok(count)
    }

    async fn scan_files(&self) -> Result<BTreeMap<String, Tool>> {
        let mut tools = BTreeMap::new();
        let mut entries = tokio::fs::read_dir(self.dir.join("individual")).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !path.extension().is_some_and(|e| e == "json") {
                continue;
            }
            match read_json::<Tool>(&path).await {
                Ok(Some(tool)) => {
                    tools.insert(tool.id.clone(), tool);
                }
                Ok(None) => {}
                Err(e) => warn!(path = %path.display(), "Skipping unreadable tool file: {}", e),
            }
        }
        Ok(tools)
    }

    async fn write_index(&self, tools: &BTreeMap<String, Tool>) -> Result<()> {
        write_json_atomic(&self.index_path(), &ToolsIndex::build(tools.values())).await
    }

    fn sorted(mut tools: Vec<Tool>) -> Vec<Tool> {
        tools.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        tools
    }

    async fn filtered(&self, pred: impl Fn(&Tool) -> bool) -> Vec<Tool> {
        let cache = self.cache.read().await;
        Self::sorted(cache.values().filter(|t| pred(t)).cloned().collect())
    }
}

#[async_trait]
impl ToolsRepository for JsonToolsRepository {
    async fn get_all(&self) -> Result<Vec<Tool>> {
        Ok(self.filtered(|_| true).await)
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Tool>> {
        Ok(self.cache.read().await.get(id).cloned())
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Tool>> {
        Ok(self
            .cache
            .read()
            .await
            .values()
            .find(|t| t.slug == slug)
            .cloned())
    }

    async fn get_by_category(&self, category: &str) -> Result<Vec<Tool>> {
        Ok(self.filtered(|t| t.category == category).await)
    }

    async fn get_by_status(&self, status: ToolStatus) -> Result<Vec<Tool>> {
        Ok(self.filtered(|t| t.status == status).await)
    }

    async fn upsert(&self, tool: Tool) -> Result<()> {
        ensure_safe_slug(&tool.slug)?;
        let mut cache = self.cache.write().await;

        if let Some(owner) = cache.values().find(|t| t.slug == tool.slug && t.id != tool.id) {
            return Err(Error::Conflict(format!(
                "Slug {} already belongs to tool {}",
                tool.slug, owner.id
            )));
        }

        write_json_atomic(&self.tool_path(&tool.slug), &tool).await?;

        // Slug changed: drop the file under the old name
        if let Some(previous) = cache.get(&tool.id) {
            if previous.slug != tool.slug {
                remove_if_exists(&self.tool_path(&previous.slug)).await?;
            }
        }

        debug!(tool_id = %tool.id, slug = %tool.slug, "Saved tool");
        cache.insert(tool.id.clone(), tool);
        self.write_index(&cache).await
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let mut cache = self.cache.write().await;
        let Some(tool) = cache.remove(id) else {
            return Ok(false);
        };
        remove_if_exists(&self.tool_path(&tool.slug)).await?;
        self.write_index(&cache).await?;
        info!(tool_id = %id, "Deleted tool");
        Ok(true)
    }

    async fn search(&self, query: &str) -> Result<Vec<Tool>> {
        Ok(self
            .filtered(|t| {
                matches_query(
                    query,
                    &[
                        t.name.as_str(),
                        t.slug.as_str(),
                        t.info.summary.as_str(),
                        t.info.description.as_str(),
                    ],
                )
            })
            .await)
    }

    async fn categories_with_counts(&self) -> Result<Vec<(String, usize)>> {
        let cache = self.cache.read().await;
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for tool in cache.values() {
            *counts.entry(tool.category.clone()).or_default() += 1;
        }
        Ok(counts.into_iter().collect())
    }
}
