//! Ranking factors, factor score sets and tiers

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the eight weighted sub-scores that make up a tool's overall score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Factor {
    AgenticCapability,
    Innovation,
    TechnicalPerformance,
    DeveloperAdoption,
    MarketTraction,
    BusinessSentiment,
    DevelopmentVelocity,
    PlatformResilience,
}

impl Factor {
    /// All factors in canonical order
    pub const ALL: [Factor; 8] = [
        Factor::AgenticCapability,
        Factor::Innovation,
        Factor::TechnicalPerformance,
        Factor::DeveloperAdoption,
        Factor::MarketTraction,
        Factor::BusinessSentiment,
        Factor::DevelopmentVelocity,
        Factor::PlatformResilience,
    ];

    /// Stable snake_case key (matches the serialized field name)
    pub fn key(&self) -> &'static str {
        match self {
            Factor::AgenticCapability => "agentic_capability",
            Factor::Innovation => "innovation",
            Factor::TechnicalPerformance => "technical_performance",
            Factor::DeveloperAdoption => "developer_adoption",
            Factor::MarketTraction => "market_traction",
            Factor::BusinessSentiment => "business_sentiment",
            Factor::DevelopmentVelocity => "development_velocity",
            Factor::PlatformResilience => "platform_resilience",
        }
    }

    /// Human readable name used in change narratives
    pub fn display_name(&self) -> &'static str {
        match self {
            Factor::AgenticCapability => "Agentic Capability",
            Factor::Innovation => "Innovation",
            Factor::TechnicalPerformance => "Technical Performance",
            Factor::DeveloperAdoption => "Developer Adoption",
            Factor::MarketTraction => "Market Traction",
            Factor::BusinessSentiment => "Business Sentiment",
            Factor::DevelopmentVelocity => "Development Velocity",
            Factor::PlatformResilience => "Platform Resilience",
        }
    }

    /// Default weight of this factor in the overall score
    ///
    /// Weights sum to 1.0.
    pub fn default_weight(&self) -> f64 {
        match self {
            Factor::AgenticCapability => 0.25,
            Factor::Innovation => 0.125,
            Factor::TechnicalPerformance => 0.125,
            Factor::DeveloperAdoption => 0.125,
            Factor::MarketTraction => 0.125,
            Factor::BusinessSentiment => 0.15,
            Factor::DevelopmentVelocity => 0.05,
            Factor::PlatformResilience => 0.05,
        }
    }
}

impl fmt::Display for Factor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// A value per factor
///
/// Used both for factor scores (0-100) and for factor weights. Older period
/// files used camelCase keys, so those are accepted on read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FactorScores {
    #[serde(default, alias = "agenticCapability")]
    pub agentic_capability: f64,
    #[serde(default)]
    pub innovation: f64,
    #[serde(default, alias = "technicalPerformance")]
    pub technical_performance: f64,
    #[serde(default, alias = "developerAdoption")]
    pub developer_adoption: f64,
    #[serde(default, alias = "marketTraction")]
    pub market_traction: f64,
    #[serde(default, alias = "businessSentiment")]
    pub business_sentiment: f64,
    #[serde(default, alias = "developmentVelocity")]
    pub development_velocity: f64,
    #[serde(default, alias = "platformResilience")]
    pub platform_resilience: f64,
}

impl FactorScores {
    /// The default factor weights
    pub fn default_weights() -> Self {
        let mut weights = Self::default();
        for factor in Factor::ALL {
            weights.set(factor, factor.default_weight());
        }
        weights
    }

    pub fn get(&self, factor: Factor) -> f64 {
        match factor {
            Factor::AgenticCapability => self.agentic_capability,
            Factor::Innovation => self.innovation,
            Factor::TechnicalPerformance => self.technical_performance,
            Factor::DeveloperAdoption => self.developer_adoption,
            Factor::MarketTraction => self.market_traction,
            Factor::BusinessSentiment => self.business_sentiment,
            Factor::DevelopmentVelocity => self.development_velocity,
            Factor::PlatformResilience => self.platform_resilience,
        }
    }

    pub fn set(&mut self, factor: Factor, value: f64) {
        let slot = match factor {
            Factor::AgenticCapability => &mut self.agentic_capability,
            Factor::Innovation => &mut self.innovation,
            Factor::TechnicalPerformance => &mut self.technical_performance,
            Factor::DeveloperAdoption => &mut self.developer_adoption,
            Factor::MarketTraction => &mut self.market_traction,
            Factor::BusinessSentiment => &mut self.business_sentiment,
            Factor::DevelopmentVelocity => &mut self.development_velocity,
            Factor::PlatformResilience => &mut self.platform_resilience,
        };
        *slot = value;
    }

    /// Iterate `(factor, value)` pairs in canonical order
    pub fn iter(&self) -> impl Iterator<Item = (Factor, f64)> + '_ {
        Factor::ALL.iter().map(move |f| (*f, self.get(*f)))
    }

    /// Weighted sum of these scores
    pub fn weighted_sum(&self, weights: &FactorScores) -> f64 {
        self.iter().map(|(f, v)| v * weights.get(f)).sum()
    }
}

/// Coarse bucket derived from rank position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Tier {
    S,
    A,
    B,
    C,
    D,
}

impl Tier {
    /// Tier for a 1-based rank position
    ///
    /// S: 1-3, A: 4-8, B: 9-15, C: 16-25, D: 26+
    pub fn from_position(position: u32) -> Self {
        match position {
            0..=3 => Tier::S,
            4..=8 => Tier::A,
            9..=15 => Tier::B,
            16..=25 => Tier::C,
            _ => Tier::D,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::S => "S",
            Tier::A => "A",
            Tier::B => "B",
            Tier::C => "C",
            Tier::D => "D",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
