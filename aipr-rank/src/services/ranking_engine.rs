//! Factor scoring (algorithm v7)
//!
//! Every factor is scored on a 0-100 scale from whatever the tool document
//! provides, falling back to proxy signals (news mentions, pricing model,
//! feature count, category) when direct measurements are missing.

use super::news_impact::NewsImpact;
use aipr_common::models::{
    Factor, FactorScores, QualitativeAdjustments, SentimentAnalysis, Tool, ToolStatus,
};
use serde::Serialize;

const INNOVATION_KEYWORDS: &[&str] = &[
    "specification-driven",
    "autonomous",
    "agent",
    "mcp",
    "scaffolding",
    "multi-modal",
    "reasoning",
    "planning",
    "orchestration",
];

/// Qualitative adjustments are on a 0-10 scale
const QUALITATIVE_SCALE: f64 = 10.0;

fn category_agentic_bonus(category: &str) -> f64 {
    match category {
        "autonomous-agent" => 20.0,
        "code-editor" | "proprietary-ide" => 15.0,
        "ide-assistant" | "devops-assistant" => 10.0,
        "open-source-framework" => 5.0,
        _ => 0.0,
    }
}

fn positive(value: Option<f64>) -> Option<f64> {
    value.filter(|v| *v > 0.0)
}

/// Score of one tool for one period
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolScore {
    pub tool_id: String,
    /// Weighted sum rounded to one decimal
    pub overall_score: f64,
    pub factor_scores: FactorScores,
    pub sentiment_analysis: Option<SentimentAnalysis>,
}

pub struct RankingEngine {
    weights: FactorScores,
}

impl Default for RankingEngine {
    fn default() -> Self {
        Self::new(FactorScores::default_weights())
    }
}

impl RankingEngine {
    pub fn new(weights: FactorScores) -> Self {
        Self { weights }
    }

    fn agentic_capability(tool: &Tool) -> f64 {
        let info = &tool.info;
        let swe = info.metrics.swe_bench.unwrap_or_default();

        let mut score = if let Some(verified) = positive(swe.verified) {
            (verified / 70.0 * 100.0).min(100.0)
        } else if let Some(bench) = positive(swe.lite).or(positive(swe.full)) {
            (bench / 30.0 * 80.0).min(100.0)
        } else if let Some(legacy) = positive(info.technical.swe_bench_score) {
            (legacy / 50.0 * 80.0).min(100.0)
        } else {
            50.0
        };

        score = (score + category_agentic_bonus(&tool.category)).min(100.0);
        if info.technical.multi_file_support == Some(true) {
            score = (score + 10.0).min(100.0);
        }
        score
    }

    fn innovation(tool: &Tool) -> f64 {
        let features = tool.info.features.len();
        let mut score = if features > 0 {
            (30.0 + features as f64 * 5.0).min(80.0)
        } else {
            30.0
        };

        let text = format!("{} {}", tool.info.summary, tool.info.description).to_lowercase();
        let matched = INNOVATION_KEYWORDS
            .iter()
            .filter(|k| text.contains(*k))
            .count();
        score = (score + matched as f64 * 10.0).min(100.0);
        score
    }

    fn technical_performance(tool: &Tool) -> f64 {
        let technical = &tool.info.technical;
        let context = technical.context_window.unwrap_or(0);
        let mut score = match context {
            c if c >= 200_000 => 90.0,
            c if c >= 100_000 => 70.0,
            c if c > 0 => 50.0 + c as f64 / 100_000.0 * 20.0,
            _ => 40.0,
        };

        let languages = technical.language_support.len();
        if languages >= 10 {
            score += 10.0;
        } else {
            score += languages as f64;
        }

        let providers = technical.llm_providers.len();
        if providers >= 3 {
            score += 10.0;
        } else {
            score += providers as f64 * 3.0;
        }

        score.min(100.0)
    }

    fn developer_adoption(tool: &Tool) -> f64 {
        let metrics = &tool.info.metrics;
        let mut score: f64 = match metrics.news_mentions.unwrap_or(0) {
            n if n >= 15 => 90.0,
            n if n >= 10 => 80.0,
            n if n >= 5 => 70.0,
            n if n >= 2 => 60.0,
            n if n >= 1 => 50.0,
            _ => 30.0,
        };

        let stars = metrics.github_stars.unwrap_or(0);
        if stars >= 50_000 {
            score += 20.0;
        } else if stars >= 10_000 {
            score += 15.0;
        } else if stars >= 1_000 {
            score += 10.0;
        }

        let users = metrics.users.unwrap_or(0.0);
        if users >= 1_000_000.0 {
            score += 20.0;
        } else if users >= 100_000.0 {
            score += 15.0;
        } else if users >= 10_000.0 {
            score += 10.0;
        }

        score.min(100.0)
    }

    fn market_traction(tool: &Tool) -> f64 {
        let business = &tool.info.business;
        let base_price = business.base_price.unwrap_or(0.0);
        let mut score: f64 = match business.pricing_model.as_deref() {
            Some("subscription") if base_price >= 20.0 => 70.0,
            Some("freemium") => 60.0,
            Some("subscription") => 50.0,
            Some("free") => 40.0,
            _ => 30.0,
        };

        let metrics = &tool.info.metrics;
        let monthly_arr = metrics.monthly_arr.unwrap_or(0.0);
        if monthly_arr >= 400_000_000.0 {
            score = 100.0;
        } else if monthly_arr >= 100_000_000.0 {
            score = score.max(90.0);
        } else if monthly_arr >= 10_000_000.0 {
            score = score.max(80.0);
        } else if monthly_arr >= 1_000_000.0 {
            score = score.max(70.0);
        }

        if metrics.valuation.unwrap_or(0.0) >= 1_000_000_000.0
            || metrics.funding.unwrap_or(0.0) >= 100_000_000.0
        {
            score = (score + 10.0).min(100.0);
        }
        score
    }

    fn business_sentiment(tool: &Tool, news: Option<&NewsImpact>) -> f64 {
        let mut score: f64 = match tool.info.metrics.news_mentions.unwrap_or(0) {
            n if n >= 10 => 75.0,
            n if n >= 5 => 70.0,
            n if n >= 1 => 65.0,
            _ => 60.0,
        };

        if let Some(impact) = news.filter(|n| n.total_impact.is_finite()) {
            score = (score + impact.total_impact * 10.0).clamp(0.0, 100.0);
        }

        if matches!(tool.category.as_str(), "autonomous-agent" | "code-editor") {
            score = (score + 10.0).min(100.0);
        }
        score
    }

    fn development_velocity(tool: &Tool) -> f64 {
        let mut score = if tool.status == ToolStatus::Active {
            60.0
        } else {
            50.0
        };
        let features = tool.info.features.len();
        if features >= 10 {
            score += 20.0;
        } else if features >= 5 {
            score += 10.0;
        }
        score
    }

    fn platform_resilience(tool: &Tool) -> f64 {
        let mut score: f64 = match tool.info.technical.llm_providers.len() {
            n if n >= 3 => 80.0,
            2 => 70.0,
            1 => 60.0,
            _ => 50.0,
        };
        if tool.category == "open-source-framework" {
            score += 20.0;
        }
        if matches!(
            tool.info.business.pricing_model.as_deref(),
            Some("free") | Some("freemium")
        ) {
            score += 10.0;
        }
        score.min(100.0)
    }

    /// Factor scores before any qualitative adjustment
    pub fn factor_scores(&self, tool: &Tool, news: Option<&NewsImpact>) -> FactorScores {
        let mut scores = FactorScores::default();
        scores.set(Factor::AgenticCapability, Self::agentic_capability(tool));
        scores.set(Factor::Innovation, Self::innovation(tool));
        scores.set(Factor::TechnicalPerformance, Self::technical_performance(tool));
        scores.set(Factor::DeveloperAdoption, Self::developer_adoption(tool));
        scores.set(Factor::MarketTraction, Self::market_traction(tool));
        scores.set(Factor::BusinessSentiment, Self::business_sentiment(tool, news));
        scores.set(Factor::DevelopmentVelocity, Self::development_velocity(tool));
        scores.set(Factor::PlatformResilience, Self::platform_resilience(tool));
        scores
    }

    /// Score a tool, optionally nudged by news and AI-extracted adjustments
    pub fn calculate_tool_score(
        &self,
        tool: &Tool,
        news: Option<&NewsImpact>,
        qualitative: Option<&QualitativeAdjustments>,
    ) -> ToolScore {
        let mut scores = self.factor_scores(tool, news);
        if let Some(adj) = qualitative {
            apply_qualitative(&mut scores, adj);
        }

        let overall = scores.weighted_sum(&self.weights);
        ToolScore {
            tool_id: tool.id.clone(),
            overall_score: (overall * 10.0).round() / 10.0,
            factor_scores: scores,
            sentiment_analysis: news
                .filter(|n| n.total_impact.is_finite())
                .map(|n| SentimentAnalysis {
                    raw_sentiment: 0.0,
                    adjusted_sentiment: 0.0,
                    news_impact: n.total_impact,
                }),
        }
    }
}

/// Add scaled adjustments to the affected factors, keeping each in 0-100
pub fn apply_qualitative(scores: &mut FactorScores, adj: &QualitativeAdjustments) {
    let nudges = [
        (Factor::Innovation, adj.innovation_boost),
        (Factor::BusinessSentiment, adj.business_sentiment_adjust),
        (Factor::DevelopmentVelocity, adj.development_velocity_boost),
        (Factor::MarketTraction, adj.market_traction_boost),
        (Factor::TechnicalPerformance, adj.technical_performance_boost),
    ];
    for (factor, nudge) in nudges {
        let value = scores.get(factor) + nudge * QUALITATIVE_SCALE;
        scores.set(factor, value.clamp(0.0, 100.0));
    }
}
