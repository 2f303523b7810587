//! News article ingestion
//!
//! Validates an incoming article, finds the tools it mentions, records any
//! metric phrases and stores it.

use super::news_metric_analyzer::analyze_article;
use super::tool_detector::ToolDetector;
use crate::repository::Repositories;
use aipr_common::events::{EventBus, RankingEvent};
use aipr_common::models::NewsArticle;
use aipr_common::{Error, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, info};
use uuid::Uuid;

const MAX_SLUG_LEN: usize = 80;

/// An article submitted for ingestion
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IngestRequest {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub source_url: Option<String>,
    /// Defaults to now
    #[serde(default)]
    pub published_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Tool ids or slugs known to be covered, merged with detected ones
    #[serde(default)]
    pub tool_mentions: Vec<String>,
    #[serde(default)]
    pub sentiment_score: Option<f64>,
    #[serde(default)]
    pub importance_score: Option<f64>,
}

impl IngestRequest {
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::InvalidInput("Article title is required".to_string()));
        }
        if self.content.trim().is_empty() {
            return Err(Error::InvalidInput("Article content is required".to_string()));
        }
        if let Some(s) = self.sentiment_score {
            if !(-1.0..=1.0).contains(&s) {
                return Err(Error::InvalidInput(format!(
                    "sentiment_score must be between -1 and 1, got {}",
                    s
                )));
            }
        }
        if let Some(i) = self.importance_score {
            if !(0.0..=10.0).contains(&i) {
                return Err(Error::InvalidInput(format!(
                    "importance_score must be between 0 and 10, got {}",
                    i
                )));
            }
        }
        Ok(())
    }
}

/// Lowercase, hyphen-separated form of a title
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let mut slug = slug.trim_end_matches('-').to_string();
    if slug.len() > MAX_SLUG_LEN {
        slug.truncate(MAX_SLUG_LEN);
        slug = slug.trim_end_matches('-').to_string();
    }
    if slug.is_empty() {
        slug.push_str("article");
    }
    slug
}

/// Validate, enrich and store an article
pub async fn ingest_article(
    repos: &Repositories,
    event_bus: Option<&EventBus>,
    request: IngestRequest,
) -> Result<NewsArticle> {
    request.validate()?;

    let tools = repos.tools.get_all().await?;
    let detector = ToolDetector::new(&tools);
    let mut mentions = detector.detect(&request.title, &request.content);

    for requested in &request.tool_mentions {
        let resolved = tools
            .iter()
            .find(|t| &t.id == requested || &t.slug == requested)
            .map(|t| t.id.clone());
        match resolved {
            Some(id) if !mentions.contains(&id) => mentions.push(id),
            Some(_) => {}
            None => {
                return Err(Error::InvalidInput(format!(
                    "Unknown tool in tool_mentions: {}",
                    requested
                )))
            }
        }
    }

    let analysis = analyze_article(&request.title, &request.content);
    debug!(
        impacts = analysis.impacts.len(),
        metrics = analysis.extracted_metrics.len(),
        "Article analyzed"
    );

    let id = Uuid::new_v4().to_string();
    let mut slug = slugify(&request.title);
    if repos.news.get_by_slug(&slug).await?.is_some() {
        slug = format!("{}-{}", slug, &id[..8]);
    }

    let now = Utc::now();
    let article = NewsArticle {
        id,
        slug,
        title: request.title.trim().to_string(),
        content: request.content,
        summary: request.summary,
        author: request.author,
        source: request.source,
        source_url: request.source_url,
        published_date: request.published_date.unwrap_or(now),
        tags: request.tags,
        tool_mentions: mentions,
        sentiment_score: request.sentiment_score,
        importance_score: request.importance_score,
        extracted_metrics: analysis.extracted_metrics,
        created_at: now,
        updated_at: now,
    };

    repos.news.upsert(article.clone()).await?;
    info!(
        article_id = %article.id,
        slug = %article.slug,
        mentions = ?article.tool_mentions,
        "Article ingested"
    );

    if let Some(bus) = event_bus {
        bus.emit_lossy(RankingEvent::ArticleIngested {
            article_id: article.id.clone(),
            slug: article.slug.clone(),
            tool_mentions: article.tool_mentions.clone(),
            timestamp: now,
        });
    }

    Ok(article)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Cursor 1.0 ships Background Agents!"), "cursor-1-0-ships-background-agents");
        assert_eq!(slugify("  --Hello--  "), "hello");
        assert_eq!(slugify("¿¿??"), "article");
        assert!(slugify(&"word ".repeat(40)).len() <= MAX_SLUG_LEN);
        assert!(!slugify(&"word ".repeat(40)).ends_with('-'));
    }

    #[test]
    fn test_validate_rejects_bad_requests() {
        let ok = IngestRequest {
            title: "T".to_string(),
            content: "C".to_string(),
            ..Default::default()
        };
        assert!(ok.validate().is_ok());

        let blank = IngestRequest {
            title: "  ".to_string(),
            ..ok.clone()
        };
        assert!(blank.validate().is_err());

        let sentiment = IngestRequest {
            sentiment_score: Some(1.5),
            ..ok.clone()
        };
        assert!(sentiment.validate().is_err());

        let importance = IngestRequest {
            importance_score: Some(-1.0),
            ..ok
        };
        assert!(importance.validate().is_err());
    }
}
