//! News storage: a single `news.json` holding articles and their indices

use super::{read_json, write_json_atomic, IndexMetadata};
use crate::pagination::Page;
use crate::repository::{matches_query, NewsRepository};
use aipr_common::models::NewsArticle;
use aipr_common::{time, Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Lookup tables over the article list, all keyed to article ids
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewsIndices {
    pub by_slug: BTreeMap<String, String>,
    /// `YYYY-MM` -> ids
    pub by_month: BTreeMap<String, Vec<String>>,
    /// tool id -> ids
    pub by_tool: BTreeMap<String, Vec<String>>,
}

/// Contents of `news.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsStore {
    /// Newest first
    pub articles: Vec<NewsArticle>,
    #[serde(default)]
    pub indices: NewsIndices,
    pub metadata: IndexMetadata,
}

impl NewsStore {
    fn empty() -> Self {
        Self {
            articles: Vec::new(),
            indices: NewsIndices::default(),
            metadata: IndexMetadata::touched(0),
        }
    }

    /// Re-sort articles and rebuild every index
    fn reindex(&mut self) {
        self.articles.sort_by(|a, b| {
            b.published_date
                .cmp(&a.published_date)
                .then_with(|| a.id.cmp(&b.id))
        });

        let mut indices = NewsIndices::default();
        for article in &self.articles {
            indices
                .by_slug
                .insert(article.slug.clone(), article.id.clone());
            indices
                .by_month
                .entry(article.month_key())
                .or_default()
                .push(article.id.clone());
            for tool_id in &article.tool_mentions {
                indices
                    .by_tool
                    .entry(tool_id.clone())
                    .or_default()
                    .push(article.id.clone());
            }
        }
        self.indices = indices;
        self.metadata = IndexMetadata::touched(self.articles.len());
    }

    fn by_ids(&self, ids: Option<&Vec<String>>) -> Vec<NewsArticle> {
        let Some(ids) = ids else {
            return Vec::new();
        };
        // ids are pushed in article order, so the result stays newest first
        self.articles
            .iter()
            .filter(|a| ids.contains(&a.id))
            .cloned()
            .collect()
    }
}

pub struct JsonNewsRepository {
    path: PathBuf,
    store: RwLock<NewsStore>,
}

impl JsonNewsRepository {
    /// Open (and create if needed) `<root>/news/news.json`
    pub async fn open(root: &Path) -> Result<Self> {
        let path = root.join("news").join("news.json");
        let mut store = match read_json::<NewsStore>(&path).await? {
            Some(store) => store,
            None => {
                let store = NewsStore::empty();
                write_json_atomic(&path, &store).await?;
                store
            }
        };
        // Indices on disk are advisory; trust the article list
        store.reindex();
        info!(count = store.articles.len(), "Loaded news articles");

        Ok(Self {
            path,
            store: RwLock::new(store),
        })
    }

    async fn filtered(&self, pred: impl Fn(&NewsArticle) -> bool) -> Vec<NewsArticle> {
        self.store
            .read()
            .await
            .articles
            .iter()
            .filter(|a| pred(a))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl NewsRepository for JsonNewsRepository {
    async fn get_all(&self) -> Result<Vec<NewsArticle>> {
        Ok(self.store.read().await.articles.clone())
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<NewsArticle>> {
        Ok(self
            .store
            .read()
            .await
            .articles
            .iter()
            .find(|a| a.id == id)
            .cloned())
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<NewsArticle>> {
        let store = self.store.read().await;
        let Some(id) = store.indices.by_slug.get(slug) else {
            return Ok(None);
        };
        Ok(store.articles.iter().find(|a| &a.id == id).cloned())
    }

    async fn get_by_month(&self, month: &str) -> Result<Vec<NewsArticle>> {
        time::parse_month_key(month)?;
        let store = self.store.read().await;
        Ok(store.by_ids(store.indices.by_month.get(month)))
    }

    async fn get_recent(&self, limit: usize) -> Result<Vec<NewsArticle>> {
        let store = self.store.read().await;
        Ok(store.articles.iter().take(limit).cloned().collect())
    }

    async fn get_by_tool_mention(&self, tool_id: &str) -> Result<Vec<NewsArticle>> {
        let store = self.store.read().await;
        Ok(store.by_ids(store.indices.by_tool.get(tool_id)))
    }

    async fn get_by_tag(&self, tag: &str) -> Result<Vec<NewsArticle>> {
        let tag = tag.to_lowercase();
        Ok(self
            .filtered(|a| a.tags.iter().any(|t| t.to_lowercase() == tag))
            .await)
    }

    async fn search(&self, query: &str) -> Result<Vec<NewsArticle>> {
        Ok(self
            .filtered(|a| {
                matches_query(
                    query,
                    &[
                        a.title.as_str(),
                        a.summary.as_deref().unwrap_or_default(),
                        a.content.as_str(),
                    ],
                )
            })
            .await)
    }

    async fn upsert(&self, article: NewsArticle) -> Result<()> {
        let mut store = self.store.write().await;

        if let Some(owner) = store.indices.by_slug.get(&article.slug) {
            if owner != &article.id {
                return Err(Error::Conflict(format!(
                    "Slug {} already belongs to article {}",
                    article.slug, owner
                )));
            }
        }

        let mut next = store.clone();
        match next.articles.iter_mut().find(|a| a.id == article.id) {
            Some(existing) => *existing = article,
            None => next.articles.push(article),
        }
        next.reindex();

        write_json_atomic(&self.path, &next).await?;
        debug!(total = next.articles.len(), "Saved news store");
        *store = next;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let mut store = self.store.write().await;
        if !store.articles.iter().any(|a| a.id == id) {
            return Ok(false);
        }

        let mut next = store.clone();
        next.articles.retain(|a| a.id != id);
        next.reindex();

        write_json_atomic(&self.path, &next).await?;
        *store = next;
        info!(article_id = %id, "Deleted article");
        Ok(true)
    }

    async fn get_paginated(&self, page: usize, limit: usize) -> Result<Page<NewsArticle>> {
        let articles = self.store.read().await.articles.clone();
        Ok(Page::from_vec(articles, page, limit))
    }
}
