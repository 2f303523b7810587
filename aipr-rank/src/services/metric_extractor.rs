//! Quantitative metrics pulled from news text
//!
//! Scans the articles that mention a tool for SWE-bench scores, valuation,
//! funding, ARR and user counts. The first article (in the order given)
//! that yields a metric wins; later matches never overwrite it.

use aipr_common::models::{NewsArticle, Tool};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::debug;

static SWE_BENCH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+\.?\d*)\s*%?\s*(?:on\s+)?swe[- ]bench").expect("valid regex"));
static VALUATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d+\.?\d*)\s*billion\s*(?:dollar\s*)?valuation").expect("valid regex")
});
static FUNDING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"raised?\s*\$?(\d+\.?\d*)\s*(million|billion)").expect("valid regex")
});
static ARR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$?(\d+\.?\d*)\s*([mb])\s*arr").expect("valid regex"));
static USERS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+\.?\d*)\s*([km])?\s*users").expect("valid regex"));

/// Metrics found in a tool's news coverage
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct QuantitativeMetrics {
    pub swe_bench_score: Option<f64>,
    pub funding: Option<f64>,
    pub valuation: Option<f64>,
    pub monthly_arr: Option<f64>,
    pub estimated_users: Option<f64>,
}

impl QuantitativeMetrics {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

fn number(caps: &regex::Captures<'_>, group: usize) -> Option<f64> {
    caps.get(group)?.as_str().parse().ok()
}

fn scale(unit: &str) -> f64 {
    match unit {
        "billion" | "b" => 1_000_000_000.0,
        "million" | "m" => 1_000_000.0,
        "k" => 1_000.0,
        _ => 1.0,
    }
}

/// Extract metrics from `title + content` of every article mentioning the tool
///
/// With a cutoff, articles published after it are ignored.
pub fn extract_quantitative_metrics(
    tool_id: &str,
    articles: &[NewsArticle],
    cutoff: Option<DateTime<Utc>>,
) -> QuantitativeMetrics {
    let mut metrics = QuantitativeMetrics::default();

    let relevant = articles
        .iter()
        .filter(|a| a.mentions(tool_id))
        .filter(|a| cutoff.map_or(true, |c| a.published_date <= c));

    for article in relevant {
        let text = format!("{} {}", article.title, article.content).to_lowercase();

        if metrics.swe_bench_score.is_none() {
            metrics.swe_bench_score = SWE_BENCH.captures(&text).and_then(|c| number(&c, 1));
        }

        if metrics.valuation.is_none() {
            metrics.valuation = VALUATION
                .captures(&text)
                .and_then(|c| number(&c, 1))
                .map(|v| v * 1_000_000_000.0);
        }

        if metrics.funding.is_none() {
            metrics.funding = FUNDING.captures(&text).and_then(|c| {
                let amount = number(&c, 1)?;
                Some(amount * scale(c.get(2)?.as_str()))
            });
        }

        if metrics.monthly_arr.is_none() {
            // Articles quote annual figures
            metrics.monthly_arr = ARR.captures(&text).and_then(|c| {
                let amount = number(&c, 1)?;
                Some(amount * scale(c.get(2)?.as_str()) / 12.0)
            });
        }

        if metrics.estimated_users.is_none() {
            metrics.estimated_users = USERS.captures(&text).and_then(|c| {
                let amount = number(&c, 1)?;
                let unit = c.get(2).map(|m| m.as_str()).unwrap_or("");
                Some(amount * scale(unit))
            });
        }
    }

    metrics
}

/// Overwrite the tool's stored figures with any found in the news
pub fn apply_quantitative_metrics(tool: &mut Tool, metrics: &QuantitativeMetrics) {
    if let Some(score) = metrics.swe_bench_score {
        debug!(tool = %tool.slug, score, "SWE-bench score from news");
        tool.info.technical.swe_bench_score = Some(score);
    }

    let stored = &mut tool.info.metrics;
    if let Some(funding) = metrics.funding {
        stored.funding = Some(funding);
    }
    if let Some(valuation) = metrics.valuation {
        stored.valuation = Some(valuation);
    }
    if let Some(arr) = metrics.monthly_arr {
        stored.monthly_arr = Some(arr);
    }
    if let Some(users) = metrics.estimated_users {
        stored.users = Some(users);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::{article, tool};
    use chrono::Duration;

    fn with_text(id: &str, title: &str, content: &str, at: DateTime<Utc>) -> NewsArticle {
        let mut a = article(id, at, &["cursor"]);
        a.title = title.to_string();
        a.content = content.to_string();
        a
    }

    #[test]
    fn test_extracts_every_metric_kind() {
        let now = Utc::now();
        let a = with_text(
            "a1",
            "Cursor hits 72.5% on SWE-bench",
            "The company raised $900 million at a 9.9 billion dollar valuation. \
             It crossed $500M ARR with 2M users.",
            now,
        );

        let m = extract_quantitative_metrics("cursor", &[a], None);
        assert_eq!(m.swe_bench_score, Some(72.5));
        assert_eq!(m.funding, Some(900_000_000.0));
        assert_eq!(m.valuation, Some(9_900_000_000.0));
        assert_eq!(m.monthly_arr, Some(500_000_000.0 / 12.0));
        assert_eq!(m.estimated_users, Some(2_000_000.0));
    }

    #[test]
    fn test_first_article_wins() {
        let now = Utc::now();
        let first = with_text("a1", "Now with 50k users", "", now);
        let second = with_text("a2", "Now with 90k users", "", now);
        let m = extract_quantitative_metrics("cursor", &[first, second], None);
        assert_eq!(m.estimated_users, Some(50_000.0));
    }

    #[test]
    fn test_cutoff_and_mentions_filter_articles() {
        let now = Utc::now();
        let late = with_text("a1", "Raised $20 million", "", now + Duration::days(2));
        let mut other = with_text("a2", "Raised $30 million", "", now);
        other.tool_mentions = vec!["devin".to_string()];

        let m = extract_quantitative_metrics("cursor", &[late, other], Some(now));
        assert!(m.is_empty());
    }

    #[test]
    fn test_apply_overwrites_stored_values() {
        let mut t = tool("cursor", "Cursor");
        t.info.metrics.users = Some(10.0);
        let metrics = QuantitativeMetrics {
            estimated_users: Some(1_000_000.0),
            swe_bench_score: Some(55.0),
            ..Default::default()
        };
        apply_quantitative_metrics(&mut t, &metrics);
        assert_eq!(t.info.metrics.users, Some(1_000_000.0));
        assert_eq!(t.info.technical.swe_bench_score, Some(55.0));
        assert_eq!(t.info.metrics.funding, None);
    }
}
