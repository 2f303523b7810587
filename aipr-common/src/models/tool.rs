//! Tool catalog documents

use crate::{Error, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Lifecycle status of a tracked tool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolStatus {
    Active,
    Beta,
    Deprecated,
    Discontinued,
    Acquired,
    Inactive,
}

impl ToolStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolStatus::Active => "active",
            ToolStatus::Beta => "beta",
            ToolStatus::Deprecated => "deprecated",
            ToolStatus::Discontinued => "discontinued",
            ToolStatus::Acquired => "acquired",
            ToolStatus::Inactive => "inactive",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(ToolStatus::Active),
            "beta" => Some(ToolStatus::Beta),
            "deprecated" => Some(ToolStatus::Deprecated),
            "discontinued" => Some(ToolStatus::Discontinued),
            "acquired" => Some(ToolStatus::Acquired),
            "inactive" => Some(ToolStatus::Inactive),
            _ => None,
        }
    }
}

/// A tracked AI coding product (e.g. Cursor, Claude Code)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    pub id: String,
    pub slug: String,
    pub name: String,
    pub category: String,
    pub status: ToolStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub launch_date: Option<NaiveDate>,
    /// Alternate names matched during news mention detection
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub info: ToolInfo,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tool {
    pub fn is_active(&self) -> bool {
        self.status == ToolStatus::Active
    }

    /// Date the tool became available: launch date, else creation date
    pub fn available_since(&self) -> NaiveDate {
        self.launch_date
            .unwrap_or_else(|| self.created_at.date_naive())
    }
}

/// Reject slugs that would escape their directory
///
/// Checked by every backend so a tool accepted by one can be moved to the other.
pub fn ensure_safe_slug(slug: &str) -> Result<()> {
    if slug.is_empty() || slug.contains('/') || slug.contains('\\') || slug.contains("..") {
        return Err(Error::InvalidInput(format!("Invalid slug: {:?}", slug)));
    }
    Ok(())
}

/// Descriptive and quantitative information about a tool
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolInfo {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub website: String,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub technical: TechnicalInfo,
    #[serde(default)]
    pub business: BusinessInfo,
    #[serde(default)]
    pub metrics: ToolMetrics,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TechnicalInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_window: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multi_file_support: Option<bool>,
    #[serde(default)]
    pub language_support: Vec<String>,
    #[serde(default)]
    pub llm_providers: Vec<String>,
    /// Legacy single SWE-bench figure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub swe_bench_score: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BusinessInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pricing_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_price: Option<f64>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub pricing_details: HashMap<String, String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SweBench {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lite: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolMetrics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub swe_bench: Option<SweBench>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub news_mentions: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub users: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monthly_arr: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valuation: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub funding: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_stars: Option<u64>,
}
