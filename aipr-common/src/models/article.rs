//! News article documents

use crate::time;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A news article about one or more tools
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsArticle {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    pub published_date: DateTime<Utc>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Ids of tools this article mentions
    #[serde(default)]
    pub tool_mentions: Vec<String>,
    /// Editorial sentiment in [-1, 1]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment_score: Option<f64>,
    /// Editorial importance in [0, 10]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub importance_score: Option<f64>,
    /// Metric phrases found in the text at ingestion time
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extracted_metrics: Vec<ExtractedMetric>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NewsArticle {
    pub fn mentions(&self, tool_id: &str) -> bool {
        self.tool_mentions.iter().any(|m| m == tool_id)
    }

    /// `YYYY-MM` bucket of the publication date
    pub fn month_key(&self) -> String {
        time::month_key(self.published_date)
    }
}

/// Kind of metric phrase recognised in article text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    Funding,
    Users,
    Benchmark,
    ContextWindow,
    Github,
    ReleaseFrequency,
}

/// A metric phrase with surrounding context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedMetric {
    pub kind: MetricKind,
    pub value: String,
    pub context: String,
}
