//! Article-level metric analysis
//!
//! Finds metric phrases (funding, users, benchmarks, context windows, GitHub
//! activity, release cadence) in an article and turns them into factor
//! impacts for display alongside the article.

use aipr_common::models::{ExtractedMetric, Factor, MetricKind};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// Characters of surrounding text kept on each side of a match
const CONTEXT_WINDOW: usize = 100;

static FUNDING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\$(\d+\.?\d*)\s*(million|billion|M|B)\s*(funding|investment|raised|round|valuation)",
    )
    .expect("valid regex")
});
static USERS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(\d+\.?\d*)\s*(million|thousand|K|M)?\s*(users|customers|developers|downloads|installs)",
    )
    .expect("valid regex")
});
static BENCHMARK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\d+\.?\d*)%?\s*(on\s+)?(SWE-bench|HumanEval|benchmark|accuracy|performance)")
        .expect("valid regex")
});
static CONTEXT_TOKENS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\d+[,.]?\d*[KM]?)\s*(tokens?|context)").expect("valid regex")
});
static GITHUB: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\d+[,.]?\d*[KM]?)\s*(stars|forks|contributors)").expect("valid regex")
});
static RELEASES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(daily|weekly|monthly|quarterly)\s*(releases?|updates?|deployments?)")
        .expect("valid regex")
});
static LEADING_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+\.?\d*").expect("valid regex"));

const POSITIVE_SIGNALS: &[&str] = &[
    "loved by developers",
    "developers love",
    "community favorite",
    "highly rated",
    "top choice",
    "breakthrough",
    "game-changer",
    "revolutionary",
];

const NEGATIVE_SIGNALS: &[&str] = &[
    "criticism",
    "concerns",
    "issues",
    "problems",
    "backlash",
    "controversy",
    "complaints",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImpactDirection {
    Positive,
    Negative,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Magnitude {
    Low,
    Medium,
    High,
}

/// Expected effect of an article on one ranking factor
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricImpact {
    pub factor: Factor,
    pub impact: ImpactDirection,
    pub magnitude: Magnitude,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub description: String,
    pub evidence: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ArticleAnalysis {
    pub impacts: Vec<MetricImpact>,
    pub extracted_metrics: Vec<ExtractedMetric>,
}

/// Analyze an article's text for metric phrases and factor impacts
pub fn analyze_article(title: &str, content: &str) -> ArticleAnalysis {
    let extracted_metrics = extract_metrics(content);
    let impacts = calculate_impacts(title, content, &extracted_metrics);
    ArticleAnalysis {
        impacts,
        extracted_metrics,
    }
}

fn push_matches(
    out: &mut Vec<ExtractedMetric>,
    content: &str,
    re: &Regex,
    kind: MetricKind,
    keep: impl Fn(&regex::Captures<'_>) -> bool,
) {
    for caps in re.captures_iter(content) {
        let Some(whole) = caps.get(0) else { continue };
        if !keep(&caps) {
            continue;
        }
        out.push(ExtractedMetric {
            kind,
            value: whole.as_str().to_string(),
            context: context_around(content, whole.start()),
        });
    }
}

/// Every metric phrase in `content`, grouped by kind in a fixed order
pub fn extract_metrics(content: &str) -> Vec<ExtractedMetric> {
    let mut metrics = Vec::new();
    push_matches(&mut metrics, content, &FUNDING, MetricKind::Funding, |_| true);
    push_matches(&mut metrics, content, &USERS, MetricKind::Users, |_| true);
    push_matches(&mut metrics, content, &BENCHMARK, MetricKind::Benchmark, |_| true);
    // Bare numbers next to "context" are usually not window sizes
    push_matches(
        &mut metrics,
        content,
        &CONTEXT_TOKENS,
        MetricKind::ContextWindow,
        |caps| caps.get(1).map_or(false, |v| parse_token_value(v.as_str()) > 1000.0),
    );
    push_matches(&mut metrics, content, &GITHUB, MetricKind::Github, |_| true);
    push_matches(&mut metrics, content, &RELEASES, MetricKind::ReleaseFrequency, |_| true);
    metrics
}

fn of_kind(metrics: &[ExtractedMetric], kind: MetricKind) -> Vec<&ExtractedMetric> {
    metrics.iter().filter(|m| m.kind == kind).collect()
}

fn evidence(metrics: &[&ExtractedMetric]) -> Vec<String> {
    metrics.iter().map(|m| m.context.clone()).collect()
}

fn leading_number(value: &str) -> f64 {
    LEADING_NUMBER
        .find(value)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0.0)
}

fn calculate_impacts(title: &str, content: &str, metrics: &[ExtractedMetric]) -> Vec<MetricImpact> {
    let mut impacts = Vec::new();
    let lower = content.to_lowercase();
    // Headlines carry launch and sentiment wording too
    let headline_and_body = format!("{} {}", title.to_lowercase(), lower);

    let funding = of_kind(metrics, MetricKind::Funding);
    if let Some(first) = funding.first() {
        let significant = funding.iter().any(|m| {
            let value = m.value.to_lowercase();
            value.contains("billion") || (value.contains("million") && leading_number(&value) >= 50.0)
        });
        impacts.push(MetricImpact {
            factor: Factor::MarketTraction,
            impact: ImpactDirection::Positive,
            magnitude: if significant { Magnitude::High } else { Magnitude::Medium },
            value: Some(first.value.clone()),
            description: "New funding or valuation milestone demonstrates strong investor confidence"
                .to_string(),
            evidence: evidence(&funding),
        });
    }

    let benchmarks = of_kind(metrics, MetricKind::Benchmark);
    if !benchmarks.is_empty() {
        let best = benchmarks
            .iter()
            .map(|m| leading_number(&m.value))
            .fold(0.0_f64, f64::max);
        impacts.push(MetricImpact {
            factor: Factor::TechnicalPerformance,
            impact: if best > 20.0 {
                ImpactDirection::Positive
            } else {
                ImpactDirection::Neutral
            },
            magnitude: if best > 50.0 {
                Magnitude::High
            } else if best > 20.0 {
                Magnitude::Medium
            } else {
                Magnitude::Low
            },
            value: Some(format!("{}%", best)),
            description: "Benchmark performance indicates technical advancement".to_string(),
            evidence: evidence(&benchmarks),
        });
    }

    let context = of_kind(metrics, MetricKind::ContextWindow);
    if let Some(first) = context.first() {
        impacts.push(MetricImpact {
            factor: Factor::TechnicalPerformance,
            impact: ImpactDirection::Positive,
            magnitude: Magnitude::Medium,
            value: Some(first.value.clone()),
            description: "Expanded context window enhances capability for complex tasks"
                .to_string(),
            evidence: evidence(&context),
        });
    }

    let users = of_kind(metrics, MetricKind::Users);
    if let Some(first) = users.first() {
        let millions = users.iter().any(|m| m.value.to_lowercase().contains("million"));
        impacts.push(MetricImpact {
            factor: Factor::DeveloperAdoption,
            impact: ImpactDirection::Positive,
            magnitude: if millions { Magnitude::High } else { Magnitude::Medium },
            value: Some(first.value.clone()),
            description: "Growing user base indicates strong developer adoption".to_string(),
            evidence: evidence(&users),
        });
    }

    let github = of_kind(metrics, MetricKind::Github);
    if let Some(first) = github.first() {
        impacts.push(MetricImpact {
            factor: Factor::DeveloperAdoption,
            impact: ImpactDirection::Positive,
            magnitude: Magnitude::Medium,
            value: Some(first.value.clone()),
            description: "GitHub activity shows developer engagement".to_string(),
            evidence: evidence(&github),
        });
    }

    let releases = of_kind(metrics, MetricKind::ReleaseFrequency);
    let new_features = ["new feature", "introduces", "launches"]
        .iter()
        .any(|s| headline_and_body.contains(s));
    if !releases.is_empty() || new_features {
        let frequent = releases.iter().any(|m| {
            let value = m.value.to_lowercase();
            value.contains("daily") || value.contains("weekly")
        });
        impacts.push(MetricImpact {
            factor: Factor::DevelopmentVelocity,
            impact: ImpactDirection::Positive,
            magnitude: if frequent { Magnitude::High } else { Magnitude::Medium },
            value: releases.first().map(|m| m.value.clone()),
            description: "Active development and feature releases".to_string(),
            evidence: evidence(&releases),
        });
    }

    let multi_provider = ["multi-model", "multiple providers", "provider agnostic"]
        .iter()
        .any(|s| lower.contains(s));
    let open_source = lower.contains("open source") || lower.contains("open-source");
    if multi_provider || open_source {
        let anchor = if multi_provider { "multi" } else { "open" };
        let at = lower.find(anchor).unwrap_or(0);
        impacts.push(MetricImpact {
            factor: Factor::PlatformResilience,
            impact: ImpactDirection::Positive,
            magnitude: if multi_provider && open_source {
                Magnitude::High
            } else {
                Magnitude::Medium
            },
            value: None,
            description: if multi_provider {
                "Multi-provider support increases platform resilience"
            } else {
                "Open source nature enhances platform flexibility"
            }
            .to_string(),
            evidence: vec![context_around(content, at)],
        });
    }

    let positive = POSITIVE_SIGNALS.iter().any(|s| headline_and_body.contains(s));
    let negative = NEGATIVE_SIGNALS.iter().any(|s| headline_and_body.contains(s));
    if positive || negative {
        impacts.push(MetricImpact {
            factor: Factor::BusinessSentiment,
            impact: if negative {
                ImpactDirection::Negative
            } else {
                ImpactDirection::Positive
            },
            magnitude: Magnitude::Medium,
            value: None,
            description: if positive {
                "Positive community reception and developer satisfaction"
            } else {
                "Community concerns may affect sentiment scores"
            }
            .to_string(),
            evidence: Vec::new(),
        });
    }

    impacts
}

/// `...text...` spanning [`CONTEXT_WINDOW`] characters either side of `byte_index`
fn context_around(content: &str, byte_index: usize) -> String {
    let mut index = byte_index.min(content.len());
    while !content.is_char_boundary(index) {
        index -= 1;
    }

    let before = content[..index]
        .char_indices()
        .rev()
        .nth(CONTEXT_WINDOW - 1)
        .map_or(0, |(i, _)| i);
    let after = content[index..]
        .char_indices()
        .nth(CONTEXT_WINDOW)
        .map_or(content.len(), |(i, _)| index + i);

    format!("...{}...", content[before..after].trim())
}

/// Token count from strings like `200K`, `1M` or `128,000`
fn parse_token_value(value: &str) -> f64 {
    let cleaned: String = value.chars().filter(|c| *c != ',').collect();
    let upper = cleaned.to_uppercase();
    let (digits, multiplier) = if let Some(n) = upper.strip_suffix('K') {
        (n, 1_000.0)
    } else if let Some(n) = upper.strip_suffix('M') {
        (n, 1_000_000.0)
    } else {
        (upper.as_str(), 1.0)
    };
    digits.parse::<f64>().map(|n| n * multiplier).unwrap_or(0.0)
}
