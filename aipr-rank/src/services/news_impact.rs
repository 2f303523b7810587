//! Time-decayed news impact
//!
//! Older articles count for less: an article's weight halves every
//! [`HALF_LIFE_DAYS`] days of age relative to the ranking cutoff.

use aipr_common::models::NewsArticle;
use aipr_common::time;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Days after which an article's weight is halved
pub const HALF_LIFE_DAYS: f64 = 90.0;

/// Most recent articles considered per tool
pub const MAX_ARTICLES_PER_TOOL: usize = 10;

const DEFAULT_SENTIMENT: f64 = 0.0;
const DEFAULT_IMPORTANCE: f64 = 5.0;

/// Weight of an article published `age_days` before the cutoff
pub fn decay_weight(age_days: f64) -> f64 {
    0.5_f64.powf(age_days.max(0.0) / HALF_LIFE_DAYS)
}

/// Articles mentioning `tool_id` published at or before `cutoff`, newest first
pub fn recent_mentions<'a>(
    tool_id: &str,
    articles: &'a [NewsArticle],
    cutoff: DateTime<Utc>,
    limit: usize,
) -> Vec<&'a NewsArticle> {
    let mut matching: Vec<&NewsArticle> = articles
        .iter()
        .filter(|a| a.mentions(tool_id) && a.published_date <= cutoff)
        .collect();
    matching.sort_by(|a, b| b.published_date.cmp(&a.published_date));
    matching.truncate(limit);
    matching
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NewsImpact {
    /// Σ sentiment × importance/10 × decay
    pub total_impact: f64,
    pub article_count: usize,
    pub last_news_date: Option<DateTime<Utc>>,
}

impl NewsImpact {
    pub fn none() -> Self {
        Self {
            total_impact: 0.0,
            article_count: 0,
            last_news_date: None,
        }
    }
}

/// Aggregate sentiment impact of the most recent articles about a tool
pub fn calculate_tool_news_impact(
    tool_id: &str,
    articles: &[NewsArticle],
    cutoff: DateTime<Utc>,
) -> NewsImpact {
    let recent = recent_mentions(tool_id, articles, cutoff, MAX_ARTICLES_PER_TOOL);
    if recent.is_empty() {
        return NewsImpact::none();
    }

    let total_impact = recent
        .iter()
        .map(|article| {
            let sentiment = article.sentiment_score.unwrap_or(DEFAULT_SENTIMENT);
            let importance = article.importance_score.unwrap_or(DEFAULT_IMPORTANCE);
            let weight = decay_weight(time::age_in_days(article.published_date, cutoff));
            sentiment * (importance / 10.0) * weight
        })
        .sum();

    NewsImpact {
        total_impact,
        article_count: recent.len(),
        last_news_date: recent.first().map(|a| a.published_date),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::article;
    use chrono::Duration;

    #[test]
    fn test_decay_weight_halves_every_half_life() {
        assert!((decay_weight(0.0) - 1.0).abs() < 1e-12);
        assert!((decay_weight(90.0) - 0.5).abs() < 1e-12);
        assert!((decay_weight(180.0) - 0.25).abs() < 1e-12);
        // Future-dated articles are not boosted
        assert!((decay_weight(-30.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_no_articles_means_no_impact() {
        let cutoff = Utc::now();
        let impact = calculate_tool_news_impact("cursor", &[], cutoff);
        assert_eq!(impact, NewsImpact::none());
    }

    #[test]
    fn test_impact_uses_defaults_and_decay() {
        let cutoff = Utc::now();
        let mut fresh = article("a1", cutoff, &["cursor"]);
        fresh.sentiment_score = Some(0.8);
        fresh.importance_score = Some(10.0);
        let mut old = article("a2", cutoff - Duration::days(90), &["cursor"]);
        old.sentiment_score = Some(1.0);
        // importance defaults to 5
        let unrelated = article("a3", cutoff, &["devin"]);

        let impact = calculate_tool_news_impact("cursor", &[old, fresh, unrelated], cutoff);
        assert_eq!(impact.article_count, 2);
        assert!((impact.total_impact - (0.8 + 0.25)).abs() < 1e-6);
        assert_eq!(impact.last_news_date, Some(cutoff));
    }

    #[test]
    fn test_articles_after_cutoff_are_ignored() {
        let cutoff = Utc::now();
        let mut later = article("a1", cutoff + Duration::days(1), &["cursor"]);
        later.sentiment_score = Some(1.0);
        let impact = calculate_tool_news_impact("cursor", &[later], cutoff);
        assert_eq!(impact.article_count, 0);
    }

    #[test]
    fn test_only_ten_newest_articles_count() {
        let cutoff = Utc::now();
        let articles: Vec<_> = (0..15)
            .map(|i| {
                let mut a = article(&format!("a{}", i), cutoff - Duration::days(i), &["cursor"]);
                a.sentiment_score = Some(if i < 10 { 1.0 } else { -1.0 });
                a
            })
            .collect();
        let impact = calculate_tool_news_impact("cursor", &articles, cutoff);
        assert_eq!(impact.article_count, MAX_ARTICLES_PER_TOOL);
        assert!(impact.total_impact > 0.0);
    }
}
