//! AI-extracted qualitative signals
//!
//! An extractor reads one article and returns structured judgments
//! (launches, partnerships, milestones, sentiment, development activity,
//! competitive position, key events). Those are converted into small
//! per-factor adjustments and aggregated over a tool's recent news with
//! the same time decay used for sentiment impact.

use super::news_impact::{decay_weight, recent_mentions, MAX_ARTICLES_PER_TOOL};
use aipr_common::models::{NewsArticle, QualitativeAdjustments, SignificantEvent, Tool};
use aipr_common::time;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Key events at or above this significance are reported
const SIGNIFICANT_EVENT_THRESHOLD: f64 = 7.0;
const MAX_SIGNIFICANT_EVENTS: usize = 5;

/// Errors from a qualitative extraction backend
#[derive(Debug, Error)]
pub enum ExtractorError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("API error {0}: {1}")]
    ApiError(u16, String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Extractor not configured: {0}")]
    NotConfigured(String),
}

impl ExtractorError {
    /// Whether a retry could plausibly succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            ExtractorError::NetworkError(_) => true,
            ExtractorError::ApiError(status, _) => *status == 429 || *status >= 500,
            ExtractorError::ParseError(_) | ExtractorError::NotConfigured(_) => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LaunchSignificance {
    Breakthrough,
    Major,
    #[serde(other)]
    Incremental,
}

impl LaunchSignificance {
    fn weight(self) -> f64 {
        match self {
            LaunchSignificance::Breakthrough => 1.0,
            LaunchSignificance::Major => 0.6,
            LaunchSignificance::Incremental => 0.3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductLaunch {
    pub feature: String,
    pub significance: LaunchSignificance,
    /// 0-10
    pub impact: f64,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Partnership {
    pub partner: String,
    /// strategic, integration, distribution or technology
    #[serde(rename = "type", default)]
    pub kind: String,
    /// 0-10
    pub significance: f64,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MilestoneCategory {
    Performance,
    Capability,
    Scale,
    Reliability,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnicalMilestone {
    pub achievement: String,
    pub category: MilestoneCategory,
    /// Percentage improvement when quantified
    #[serde(default)]
    pub improvement: Option<f64>,
    /// 0-10
    pub impact: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SentimentAspects {
    #[serde(default)]
    pub product: f64,
    #[serde(default)]
    pub leadership: f64,
    #[serde(default)]
    pub competition: f64,
    #[serde(default)]
    pub future: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Sentiment {
    /// -1 to 1
    #[serde(default)]
    pub overall: f64,
    /// 0 to 1
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub aspects: SentimentAspects,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReleaseCadence {
    Accelerating,
    Steady,
    Slowing,
    #[default]
    #[serde(other)]
    Unknown,
}

impl ReleaseCadence {
    fn multiplier(self) -> f64 {
        match self {
            ReleaseCadence::Accelerating => 1.5,
            ReleaseCadence::Steady => 1.0,
            ReleaseCadence::Slowing => 0.5,
            ReleaseCadence::Unknown => 0.8,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DevelopmentActivity {
    #[serde(default, alias = "releaseCadence")]
    pub release_cadence: ReleaseCadence,
    /// 0-10
    #[serde(default, alias = "featureVelocity")]
    pub feature_velocity: f64,
    /// increasing, high, medium, low or declining
    #[serde(default, alias = "communityEngagement")]
    pub community_engagement: String,
    #[serde(default, alias = "openSourceActivity")]
    pub open_source_activity: Option<bool>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Positioning {
    Leader,
    Challenger,
    Follower,
    Niche,
    #[default]
    #[serde(other)]
    Unclear,
}

impl Positioning {
    fn multiplier(self) -> f64 {
        match self {
            Positioning::Leader => 1.2,
            Positioning::Challenger => 1.0,
            Positioning::Follower => 0.8,
            Positioning::Niche | Positioning::Unclear => 0.6,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompetitivePosition {
    #[serde(default)]
    pub mentioned_competitors: Vec<String>,
    #[serde(default)]
    pub positioning: Positioning,
    #[serde(default)]
    pub differentiators: Vec<String>,
    #[serde(default)]
    pub threats: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyEvent {
    pub event: String,
    /// funding, acquisition, leadership, crisis, expansion or other
    #[serde(rename = "type", default)]
    pub kind: String,
    /// positive, negative, neutral or mixed
    #[serde(default)]
    pub impact: String,
    /// 0-10
    pub significance: f64,
}

/// Structured judgments about one article
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualitativeMetrics {
    #[serde(default, alias = "productLaunches")]
    pub product_launches: Vec<ProductLaunch>,
    #[serde(default)]
    pub partnerships: Vec<Partnership>,
    #[serde(default, alias = "technicalMilestones")]
    pub technical_milestones: Vec<TechnicalMilestone>,
    #[serde(default)]
    pub sentiment: Sentiment,
    #[serde(default, alias = "developmentActivity")]
    pub development_activity: DevelopmentActivity,
    #[serde(default, alias = "competitivePosition")]
    pub competitive_position: CompetitivePosition,
    #[serde(default, alias = "keyEvents")]
    pub key_events: Vec<KeyEvent>,
}

/// Source of qualitative judgments for an article
#[async_trait]
pub trait QualitativeExtractor: Send + Sync {
    async fn extract(
        &self,
        article: &NewsArticle,
        tool_name: &str,
        tool_context: Option<&str>,
    ) -> Result<QualitativeMetrics, ExtractorError>;
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Convert one article's judgments into factor adjustments
pub fn metrics_to_adjustments(metrics: &QualitativeMetrics) -> QualitativeAdjustments {
    let from_launches: f64 = metrics
        .product_launches
        .iter()
        .map(|l| l.impact * l.significance.weight())
        .sum::<f64>()
        / 10.0;
    let from_milestones: f64 =
        metrics.technical_milestones.iter().map(|m| m.impact).sum::<f64>() / 10.0;
    let innovation = ((from_launches + from_milestones) * 0.5).min(2.0);

    let s = &metrics.sentiment;
    let sentiment = (s.overall * 2.0
        + s.aspects.product
        + s.aspects.future
        + s.aspects.competition * 0.5)
        / 4.0;

    let activity = &metrics.development_activity;
    let velocity = activity.feature_velocity / 10.0 * activity.release_cadence.multiplier();

    let partnership_value: f64 =
        metrics.partnerships.iter().map(|p| p.significance).sum::<f64>() / 10.0;
    let traction = partnership_value * metrics.competitive_position.positioning.multiplier();

    let technical: f64 = metrics
        .technical_milestones
        .iter()
        .filter(|m| {
            matches!(
                m.category,
                MilestoneCategory::Performance | MilestoneCategory::Capability
            )
        })
        .map(|m| m.impact)
        .sum::<f64>()
        / 20.0;

    QualitativeAdjustments {
        innovation_boost: round2(innovation),
        business_sentiment_adjust: round2(sentiment),
        development_velocity_boost: round2(velocity),
        market_traction_boost: round2(traction),
        technical_performance_boost: round2(technical),
    }
}

/// Decayed sum of adjustments across a tool's recent articles
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QualitativeImpact {
    pub adjustments: QualitativeAdjustments,
    pub processed_articles: usize,
    pub significant_events: Vec<SignificantEvent>,
}

fn cap(adj: QualitativeAdjustments) -> QualitativeAdjustments {
    QualitativeAdjustments {
        innovation_boost: adj.innovation_boost.min(3.0),
        business_sentiment_adjust: adj.business_sentiment_adjust.clamp(-2.0, 2.0),
        development_velocity_boost: adj.development_velocity_boost.min(2.0),
        market_traction_boost: adj.market_traction_boost.min(2.0),
        technical_performance_boost: adj.technical_performance_boost.min(1.0),
    }
}

/// Run the extractor over a tool's most recent articles and aggregate
///
/// Articles whose extraction fails are logged and skipped.
pub async fn aggregate_qualitative_impact(
    extractor: &dyn QualitativeExtractor,
    tool: &Tool,
    articles: &[NewsArticle],
    cutoff: DateTime<Utc>,
) -> QualitativeImpact {
    let recent = recent_mentions(&tool.id, articles, cutoff, MAX_ARTICLES_PER_TOOL);
    let context = Some(tool.info.summary.as_str()).filter(|s| !s.trim().is_empty());

    let mut total = QualitativeAdjustments::default();
    let mut events = Vec::new();
    let mut processed = 0;

    for article in recent {
        let metrics = match extractor.extract(article, &tool.name, context).await {
            Ok(metrics) => metrics,
            Err(e) => {
                warn!(
                    tool = %tool.slug,
                    article_id = %article.id,
                    "Qualitative extraction failed, skipping article: {}",
                    e
                );
                continue;
            }
        };

        let adj = metrics_to_adjustments(&metrics);
        let weight = decay_weight(time::age_in_days(article.published_date, cutoff));
        total.innovation_boost += adj.innovation_boost * weight;
        total.business_sentiment_adjust += adj.business_sentiment_adjust * weight;
        total.development_velocity_boost += adj.development_velocity_boost * weight;
        total.market_traction_boost += adj.market_traction_boost * weight;
        total.technical_performance_boost += adj.technical_performance_boost * weight;

        events.extend(
            metrics
                .key_events
                .into_iter()
                .filter(|e| e.significance >= SIGNIFICANT_EVENT_THRESHOLD)
                .map(|e| SignificantEvent {
                    event: e.event,
                    date: article.published_date,
                    impact: e.impact,
                }),
        );

        processed += 1;
        debug!(tool = %tool.slug, article_id = %article.id, weight, "Article analyzed");
    }

    events.truncate(MAX_SIGNIFICANT_EVENTS);
    let adjustments = cap(total);
    if processed > 0 {
        info!(
            tool = %tool.slug,
            articles = processed,
            events = events.len(),
            innovation = adjustments.innovation_boost,
            sentiment = adjustments.business_sentiment_adjust,
            "Qualitative analysis complete"
        );
    }

    QualitativeImpact {
        adjustments,
        processed_articles: processed,
        significant_events: events,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::{article, tool, FakeExtractor};
    use chrono::Duration;

    fn sample_metrics() -> QualitativeMetrics {
        QualitativeMetrics {
            product_launches: vec![ProductLaunch {
                feature: "Background agents".to_string(),
                significance: LaunchSignificance::Breakthrough,
                impact: 8.0,
                description: String::new(),
            }],
            partnerships: vec![Partnership {
                partner: "Acme".to_string(),
                kind: "integration".to_string(),
                significance: 5.0,
                description: String::new(),
            }],
            technical_milestones: vec![TechnicalMilestone {
                achievement: "2x faster".to_string(),
                category: MilestoneCategory::Performance,
                improvement: Some(100.0),
                impact: 6.0,
            }],
            sentiment: Sentiment {
                overall: 0.5,
                confidence: 0.9,
                aspects: SentimentAspects {
                    product: 0.6,
                    leadership: 0.0,
                    competition: 0.4,
                    future: 0.8,
                },
            },
            development_activity: DevelopmentActivity {
                release_cadence: ReleaseCadence::Accelerating,
                feature_velocity: 8.0,
                community_engagement: "high".to_string(),
                open_source_activity: None,
            },
            competitive_position: CompetitivePosition {
                positioning: Positioning::Leader,
                ..Default::default()
            },
            key_events: vec![
                KeyEvent {
                    event: "Series C".to_string(),
                    kind: "funding".to_string(),
                    impact: "positive".to_string(),
                    significance: 8.0,
                },
                KeyEvent {
                    event: "Blog post".to_string(),
                    kind: "other".to_string(),
                    impact: "neutral".to_string(),
                    significance: 2.0,
                },
            ],
        }
    }

    #[test]
    fn test_metrics_to_adjustments() {
        let adj = metrics_to_adjustments(&sample_metrics());
        // (0.8 + 0.6) * 0.5
        assert_eq!(adj.innovation_boost, 0.7);
        // (1.0 + 0.6 + 0.8 + 0.2) / 4
        assert_eq!(adj.business_sentiment_adjust, 0.65);
        assert_eq!(adj.development_velocity_boost, 1.2);
        assert_eq!(adj.market_traction_boost, 0.6);
        assert_eq!(adj.technical_performance_boost, 0.3);
    }

    #[test]
    fn test_empty_metrics_use_unknown_defaults() {
        let metrics: QualitativeMetrics = serde_json::from_str("{}").unwrap();
        let adj = metrics_to_adjustments(&metrics);
        assert!(adj.is_zero());
        assert_eq!(
            metrics.development_activity.release_cadence,
            ReleaseCadence::Unknown
        );
    }

    #[test]
    fn test_camel_case_and_unknown_enum_values_parse() {
        let json = r#"{
            "productLaunches": [{"feature": "x", "significance": "minor", "impact": 4}],
            "competitivePosition": {"positioning": "dominant"},
            "developmentActivity": {"releaseCadence": "steady", "featureVelocity": 5}
        }"#;
        let metrics: QualitativeMetrics = serde_json::from_str(json).unwrap();
        assert_eq!(
            metrics.product_launches[0].significance,
            LaunchSignificance::Incremental
        );
        assert_eq!(metrics.competitive_position.positioning, Positioning::Unclear);
        assert_eq!(
            metrics.development_activity.release_cadence,
            ReleaseCadence::Steady
        );
    }

    #[tokio::test]
    async fn test_aggregate_decays_caps_and_skips_failures() {
        let cutoff = Utc::now();
        let t = tool("cursor", "Cursor");
        let articles = vec![
            article("fresh", cutoff, &["cursor"]),
            article("old", cutoff - Duration::days(90), &["cursor"]),
            article("broken", cutoff - Duration::days(1), &["cursor"]),
        ];
        let extractor = FakeExtractor::new(sample_metrics()).failing_on("broken");

        let impact = aggregate_qualitative_impact(&extractor, &t, &articles, cutoff).await;
        assert_eq!(impact.processed_articles, 2);
        // 1.2 * (1 + 0.5) = 1.8
        assert!((impact.adjustments.development_velocity_boost - 1.8).abs() < 1e-9);
        // 0.3 * 1.5 = 0.45
        assert!((impact.adjustments.technical_performance_boost - 0.45).abs() < 1e-9);
        assert_eq!(impact.significant_events.len(), 2);
        assert_eq!(impact.significant_events[0].event, "Series C");
    }

    #[tokio::test]
    async fn test_aggregate_caps_large_totals() {
        let cutoff = Utc::now();
        let t = tool("cursor", "Cursor");
        let articles: Vec<_> = (0..10)
            .map(|i| article(&format!("a{}", i), cutoff, &["cursor"]))
            .collect();
        let extractor = FakeExtractor::new(sample_metrics());

        let impact = aggregate_qualitative_impact(&extractor, &t, &articles, cutoff).await;
        assert_eq!(impact.processed_articles, 10);
        assert_eq!(impact.adjustments.development_velocity_boost, 2.0);
        assert_eq!(impact.adjustments.business_sentiment_adjust, 2.0);
        assert_eq!(impact.adjustments.technical_performance_boost, 1.0);
        assert_eq!(impact.significant_events.len(), MAX_SIGNIFICANT_EVENTS);
    }
}
