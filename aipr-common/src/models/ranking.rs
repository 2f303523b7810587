//! Ranking period documents

use super::factors::{FactorScores, Tier};
use crate::{time, Error, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Algorithm version stamped on newly built periods
pub const ALGORITHM_VERSION: &str = "v7.0";

/// A snapshot of tool positions for one period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingPeriod {
    /// `YYYY-MM` or `YYYY-MM-DD`
    pub period: String,
    pub algorithm_version: String,
    #[serde(default)]
    pub is_current: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_date: Option<NaiveDate>,
    #[serde(default)]
    pub rankings: Vec<RankingEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<PeriodMetadata>,
}

impl RankingPeriod {
    /// Position of a tool in this period, if ranked
    pub fn position_of(&self, tool_id: &str) -> Option<u32> {
        self.rankings
            .iter()
            .find(|e| e.tool_id == tool_id)
            .map(|e| e.position)
    }

    pub fn entry(&self, tool_id: &str) -> Option<&RankingEntry> {
        self.rankings.iter().find(|e| e.tool_id == tool_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodMetadata {
    pub total_tools: usize,
    pub calculation_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// One tool's row within a ranking period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingEntry {
    pub tool_id: String,
    pub tool_name: String,
    /// 1-based rank
    pub position: u32,
    /// Overall score, 0-100 with one decimal
    pub score: f64,
    pub tier: Tier,
    pub factor_scores: FactorScores,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment_analysis: Option<SentimentAnalysis>,
    pub movement: Movement,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_analysis: Option<ChangeAnalysis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub news_impact: Option<NewsImpactSummary>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementDirection {
    Up,
    Down,
    Same,
    New,
}

/// Position change versus the previous period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_position: Option<u32>,
    /// Absolute number of places moved
    pub change: u32,
    pub direction: MovementDirection,
}

impl Movement {
    pub fn new_entry() -> Self {
        Self {
            previous_position: None,
            change: 0,
            direction: MovementDirection::New,
        }
    }

    /// Signed change: positive when the tool climbed
    pub fn signed_change(&self) -> i64 {
        match self.direction {
            MovementDirection::Up => self.change as i64,
            MovementDirection::Down => -(self.change as i64),
            MovementDirection::Same | MovementDirection::New => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeAnalysis {
    pub primary_reason: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub secondary_reasons: Vec<String>,
    pub narrative_explanation: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentAnalysis {
    pub raw_sentiment: f64,
    pub adjusted_sentiment: f64,
    pub news_impact: f64,
}

/// Per-factor nudges derived from AI-extracted qualitative signals
///
/// Values are on a small scale (single digits); the engine multiplies
/// them by ten before applying them to 0-100 factor scores.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct QualitativeAdjustments {
    pub innovation_boost: f64,
    pub business_sentiment_adjust: f64,
    pub development_velocity_boost: f64,
    pub market_traction_boost: f64,
    pub technical_performance_boost: f64,
}

impl QualitativeAdjustments {
    pub fn is_zero(&self) -> bool {
        self.innovation_boost == 0.0
            && self.business_sentiment_adjust == 0.0
            && self.development_velocity_boost == 0.0
            && self.market_traction_boost == 0.0
            && self.technical_performance_boost == 0.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsImpactSummary {
    pub articles_analyzed: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_news_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub significant_events: Vec<SignificantEvent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qualitative_boosts: Option<QualitativeAdjustments>,
}

/// A high-significance event reported in a tool's recent news
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignificantEvent {
    pub event: String,
    /// Publication date of the reporting article
    pub date: DateTime<Utc>,
    /// positive, negative, neutral or mixed
    pub impact: String,
}

/// Validate a period identifier (`YYYY-MM` or `YYYY-MM-DD`)
pub fn validate_period(period: &str) -> Result<()> {
    time::period_start(period).map(|_| ())
}

/// Reject identifiers that could escape the storage directory
pub fn ensure_safe_period(period: &str) -> Result<()> {
    if period.is_empty()
        || period.contains('/')
        || period.contains('\\')
        || period.contains("..")
    {
        return Err(Error::InvalidInput(format!("Invalid period: {}", period)));
    }
    Ok(())
}
