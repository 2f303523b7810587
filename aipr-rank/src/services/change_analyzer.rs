//! Explanations for rank changes between two periods
//!
//! Factor deltas are weighted to find what drove a tool's movement; the
//! weights here emphasise agentic capability more than the scoring weights
//! so narratives lead with it.

use aipr_common::models::{ChangeAnalysis, Factor, RankingEntry, RankingPeriod};
use serde::Serialize;
use std::collections::BTreeMap;

/// Primary reasons that mean "nothing notable happened"
pub const NO_CHANGE_REASONS: [&str; 2] = [
    "Minor adjustments across multiple factors",
    "Minor score adjustments",
];

/// Rank places moved before an analysis is attached regardless of reason
const ATTACH_RANK_CHANGE: i64 = 3;

/// Factor delta below which a change is considered noise
const SIGNIFICANT_DELTA: f64 = 0.5;

/// Report lists at most this many movers per direction
const TOP_MOVERS: usize = 5;

fn impact_weight(factor: Factor) -> f64 {
    match factor {
        Factor::AgenticCapability => 0.3,
        Factor::Innovation => 0.15,
        Factor::TechnicalPerformance
        | Factor::DeveloperAdoption
        | Factor::MarketTraction => 0.125,
        Factor::BusinessSentiment => 0.075,
        Factor::DevelopmentVelocity | Factor::PlatformResilience => 0.05,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeCategory {
    NewEntry,
    MajorRise,
    Rise,
    Stable,
    Decline,
    MajorDecline,
}

impl ChangeCategory {
    fn classify(rank_change: i64, is_new: bool) -> Self {
        match rank_change {
            _ if is_new => ChangeCategory::NewEntry,
            c if c >= 5 => ChangeCategory::MajorRise,
            c if c >= 1 => ChangeCategory::Rise,
            c if c <= -5 => ChangeCategory::MajorDecline,
            c if c <= -1 => ChangeCategory::Decline,
            _ => ChangeCategory::Stable,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FactorChange {
    pub factor: Factor,
    pub previous: f64,
    pub current: f64,
    pub change: f64,
    /// Weighted contribution to the overall movement
    pub impact: f64,
}

impl FactorChange {
    fn reason(&self) -> String {
        let arrow = format!("({:.1} → {:.1})", self.previous, self.current);
        let strong = self.change.abs() > 2.0;
        let improved = self.change > 0.0;
        let direction = if improved { "improved" } else { "declined" };

        match self.factor {
            Factor::AgenticCapability => {
                let what = if improved {
                    "improved agentic capabilities"
                } else {
                    "weaker agentic performance"
                };
                if strong {
                    format!("Significantly {} {}", what, arrow)
                } else {
                    format!("{}{} {}", what[..1].to_uppercase(), &what[1..], arrow)
                }
            }
            Factor::Innovation if improved => format!("New innovations boosted score {}", arrow),
            Factor::Innovation => format!("Innovation score decayed over time {}", arrow),
            factor => {
                let label = match factor {
                    Factor::MarketTraction => "Market traction",
                    Factor::DeveloperAdoption => "Developer adoption",
                    Factor::TechnicalPerformance => "Technical benchmarks",
                    other => other.display_name(),
                };
                if strong {
                    format!("{} {} significantly {}", label, direction, arrow)
                } else {
                    format!("{} {} {}", label, direction, arrow)
                }
            }
        }
    }
}

/// Movement explanation for one tool
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntryChange {
    pub tool_id: String,
    pub tool_name: String,
    pub previous_rank: Option<u32>,
    pub current_rank: u32,
    /// Positive when the tool climbed
    pub rank_change: i64,
    pub previous_score: f64,
    pub current_score: f64,
    pub score_change: f64,
    pub category: ChangeCategory,
    pub primary_reason: String,
    pub secondary_reasons: Vec<String>,
    pub factor_changes: Vec<FactorChange>,
    pub narrative: String,
}

impl EntryChange {
    /// Whether this explanation is worth storing on the ranking entry
    pub fn should_attach(&self) -> bool {
        self.rank_change.abs() >= ATTACH_RANK_CHANGE
            || !NO_CHANGE_REASONS.contains(&self.primary_reason.as_str())
    }

    pub fn to_change_analysis(&self) -> ChangeAnalysis {
        ChangeAnalysis {
            primary_reason: self.primary_reason.clone(),
            secondary_reasons: self.secondary_reasons.clone(),
            narrative_explanation: self.narrative.clone(),
        }
    }
}

/// Explain how `current` moved relative to its entry in the previous period
pub fn analyze_entry(current: &RankingEntry, previous: Option<&RankingEntry>) -> EntryChange {
    let previous_rank = previous.map(|p| p.position);
    let previous_score = previous.map(|p| p.score).unwrap_or(0.0);
    let rank_change = previous_rank
        .map(|p| p as i64 - current.position as i64)
        .unwrap_or(0);
    let score_change = current.score - previous_score;
    let category = ChangeCategory::classify(rank_change, previous.is_none());

    let mut factor_changes: Vec<FactorChange> = Factor::ALL
        .iter()
        .map(|&factor| {
            let now = current.factor_scores.get(factor);
            let before = previous.map(|p| p.factor_scores.get(factor)).unwrap_or(0.0);
            let change = now - before;
            FactorChange {
                factor,
                previous: before,
                current: now,
                change,
                impact: change * impact_weight(factor),
            }
        })
        .collect();
    factor_changes.sort_by(|a, b| b.impact.abs().total_cmp(&a.impact.abs()));

    let (primary_reason, secondary_reasons) = reasons(&factor_changes, category);
    let narrative = narrative(
        &current.tool_name,
        category,
        rank_change,
        score_change,
        &factor_changes,
        &primary_reason,
    );

    EntryChange {
        tool_id: current.tool_id.clone(),
        tool_name: current.tool_name.clone(),
        previous_rank,
        current_rank: current.position,
        rank_change,
        previous_score,
        current_score: current.score,
        score_change,
        category,
        primary_reason,
        secondary_reasons,
        factor_changes,
        narrative,
    }
}

fn reasons(changes: &[FactorChange], category: ChangeCategory) -> (String, Vec<String>) {
    let significant: Vec<&FactorChange> = changes
        .iter()
        .filter(|c| c.change.abs() > SIGNIFICANT_DELTA)
        .collect();

    if category == ChangeCategory::NewEntry {
        let strengths = significant
            .iter()
            .take(3)
            .map(|c| format!("Strong {} ({:.1}/100)", c.factor.display_name(), c.current))
            .collect();
        return ("New entry to rankings".to_string(), strengths);
    }

    match significant.split_first() {
        None => (NO_CHANGE_REASONS[0].to_string(), Vec::new()),
        Some((primary, rest)) => (
            primary.reason(),
            rest.iter().take(3).map(|c| c.reason()).collect(),
        ),
    }
}

fn factor_list(changes: &[&FactorChange], joiner: &str) -> String {
    changes
        .iter()
        .map(|c| c.factor.display_name().to_lowercase())
        .collect::<Vec<_>>()
        .join(joiner)
}

fn plural(n: i64) -> &'static str {
    if n.abs() == 1 {
        ""
    } else {
        "s"
    }
}

fn narrative(
    tool_name: &str,
    category: ChangeCategory,
    rank_change: i64,
    score_change: f64,
    changes: &[FactorChange],
    primary_reason: &str,
) -> String {
    let improvements: Vec<&FactorChange> = changes.iter().filter(|c| c.change > 1.0).take(3).collect();
    let declines: Vec<&FactorChange> = changes.iter().filter(|c| c.change < -1.0).take(3).collect();
    let places = rank_change.abs();
    let reason = primary_reason.to_lowercase();

    match category {
        ChangeCategory::MajorRise => {
            let mut text = format!("{} surged {} positions due to {}.", tool_name, places, reason);
            if improvements.len() > 1 {
                text.push_str(&format!(
                    " Multiple factors contributed to this rise, including improvements in {}.",
                    factor_list(&improvements[..2], " and ")
                ));
            }
            text
        }
        ChangeCategory::Rise => format!(
            "{} climbed {} position{} primarily due to {}.",
            tool_name,
            places,
            plural(places),
            reason
        ),
        ChangeCategory::MajorDecline => {
            let mut text = format!("{} dropped {} positions. {}.", tool_name, places, primary_reason);
            if declines.len() > 1 {
                text.push_str(&format!(
                    " Additional factors include declining {}.",
                    factor_list(&declines[1..], " and ")
                ));
            }
            text
        }
        ChangeCategory::Decline => format!(
            "{} fell {} position{} due to {}.",
            tool_name,
            places,
            plural(places),
            reason
        ),
        ChangeCategory::Stable if score_change.abs() > 0.1 => format!(
            "{} maintained its position despite {} in {}.",
            tool_name,
            if score_change > 0.0 { "improvements" } else { "declines" },
            reason
        ),
        ChangeCategory::Stable => format!(
            "{} held steady with minimal changes across all ranking factors.",
            tool_name
        ),
        ChangeCategory::NewEntry if improvements.is_empty() => {
            format!("{} enters the rankings.", tool_name)
        }
        ChangeCategory::NewEntry => format!(
            "{} enters the rankings with strong scores in {}.",
            tool_name,
            factor_list(&improvements, ", ")
        ),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mover {
    pub tool_id: String,
    pub tool_name: String,
    pub rank_change: i64,
    pub current_rank: u32,
}

impl From<&EntryChange> for Mover {
    fn from(change: &EntryChange) -> Self {
        Self {
            tool_id: change.tool_id.clone(),
            tool_name: change.tool_name.clone(),
            rank_change: change.rank_change,
            current_rank: change.current_rank,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FactorTrend {
    pub improving: usize,
    pub declining: usize,
}

/// A tool ranked in the previous period that is missing from the new one
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DroppedEntry {
    pub tool_id: String,
    pub tool_name: String,
    pub previous_rank: u32,
    pub previous_score: f64,
}

/// Entries of `previous` with no counterpart in `current`, best rank first
pub fn dropped_entries(current: &[RankingEntry], previous: Option<&RankingPeriod>) -> Vec<DroppedEntry> {
    let Some(previous) = previous else {
        return Vec::new();
    };
    let mut dropped: Vec<DroppedEntry> = previous
        .rankings
        .iter()
        .filter(|p| !current.iter().any(|c| c.tool_id == p.tool_id))
        .map(|p| DroppedEntry {
            tool_id: p.tool_id.clone(),
            tool_name: p.tool_name.clone(),
            previous_rank: p.position,
            previous_score: p.score,
        })
        .collect();
    dropped.sort_by_key(|d| d.previous_rank);
    dropped
}

/// Period-level summary of all entry changes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeReport {
    pub summary: String,
    pub categories: BTreeMap<ChangeCategory, usize>,
    pub major_rises: Vec<Mover>,
    pub major_declines: Vec<Mover>,
    pub dropped: Vec<DroppedEntry>,
    pub factor_trends: BTreeMap<&'static str, FactorTrend>,
    pub narrative: String,
}

pub fn change_report(changes: &[EntryChange], dropped: &[DroppedEntry]) -> ChangeReport {
    let mut categories = BTreeMap::new();
    for change in changes {
        *categories.entry(change.category).or_insert(0) += 1;
    }

    let mut rises: Vec<&EntryChange> = changes
        .iter()
        .filter(|c| c.category == ChangeCategory::MajorRise)
        .collect();
    rises.sort_by(|a, b| b.rank_change.cmp(&a.rank_change));
    let mut declines: Vec<&EntryChange> = changes
        .iter()
        .filter(|c| c.category == ChangeCategory::MajorDecline)
        .collect();
    declines.sort_by(|a, b| a.rank_change.cmp(&b.rank_change));

    let mut trends: BTreeMap<&'static str, FactorTrend> = Factor::ALL
        .iter()
        .map(|f| (f.key(), FactorTrend::default()))
        .collect();
    for change in changes {
        for fc in &change.factor_changes {
            if let Some(trend) = trends.get_mut(fc.factor.key()) {
                if fc.change > SIGNIFICANT_DELTA {
                    trend.improving += 1;
                } else if fc.change < -SIGNIFICANT_DELTA {
                    trend.declining += 1;
                }
            }
        }
    }

    let mut narrative = report_narrative(changes, &rises, &declines, &trends);
    let mut summary = format!(
        "{} tools analyzed. {} major rises, {} major declines.",
        changes.len(),
        rises.len(),
        declines.len()
    );
    if !dropped.is_empty() {
        summary.push_str(&format!(" {} dropped.", dropped.len()));
        narrative.push_str(&format!(
            " {} tool{} left the rankings, including {}.",
            dropped.len(),
            if dropped.len() > 1 { "s" } else { "" },
            dropped.iter().take(2).map(|d| d.tool_name.as_str()).collect::<Vec<_>>().join(" and ")
        ));
    }

    ChangeReport {
        summary,
        categories,
        major_rises: rises.iter().take(TOP_MOVERS).map(|c| Mover::from(*c)).collect(),
        major_declines: declines.iter().take(TOP_MOVERS).map(|c| Mover::from(*c)).collect(),
        dropped: dropped.to_vec(),
        factor_trends: trends,
        narrative,
    }
}

fn report_narrative(
    changes: &[EntryChange],
    rises: &[&EntryChange],
    declines: &[&EntryChange],
    trends: &BTreeMap<&'static str, FactorTrend>,
) -> String {
    let mut text = String::from(
        "This period's rankings show movement across the AI coding tools landscape.",
    );

    if let Some(top) = rises.first() {
        text.push_str(&format!(
            " {} led the gains, climbing {} positions.",
            top.tool_name, top.rank_change
        ));
    }
    if let Some(bottom) = declines.first() {
        text.push_str(&format!(
            " On the other side, {} experienced the largest drop, falling {} positions.",
            bottom.tool_name,
            bottom.rank_change.abs()
        ));
    }

    let trending = Factor::ALL
        .iter()
        .filter_map(|f| trends.get(f.key()).map(|t| (*f, *t)))
        .max_by_key(|(_, t)| (t.improving as i64 - t.declining as i64).abs());
    if let Some((factor, trend)) = trending {
        if trend.improving as i64 - trend.declining as i64 > 5 {
            text.push_str(&format!(
                " {} emerged as a key differentiator, with {} tools showing improvement.",
                factor.display_name(),
                trend.improving
            ));
        }
    }

    let new_entries: Vec<&str> = changes
        .iter()
        .filter(|c| c.category == ChangeCategory::NewEntry)
        .map(|c| c.tool_name.as_str())
        .collect();
    if !new_entries.is_empty() {
        text.push_str(&format!(
            " {} new tool{} entered the rankings, including {}.",
            new_entries.len(),
            if new_entries.len() > 1 { "s" } else { "" },
            new_entries.iter().take(2).copied().collect::<Vec<_>>().join(" and ")
        ));
    }

    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::entry;

    #[test]
    fn test_new_entry_lists_strengths() {
        let mut current = entry("cursor", 2, 80.0);
        current.factor_scores.agentic_capability = 85.0;
        current.factor_scores.innovation = 60.0;

        let change = analyze_entry(&current, None);
        assert_eq!(change.category, ChangeCategory::NewEntry);
        assert_eq!(change.primary_reason, "New entry to rankings");
        assert_eq!(change.secondary_reasons[0], "Strong Agentic Capability (85.0/100)");
        assert!(change.should_attach());
        assert!(change.narrative.contains("enters the rankings"));
    }

    #[test]
    fn test_major_rise_led_by_weighted_factor() {
        let mut before = entry("devin", 9, 60.0);
        before.factor_scores.agentic_capability = 60.0;
        before.factor_scores.platform_resilience = 50.0;
        let mut after = entry("devin", 3, 72.0);
        after.factor_scores.agentic_capability = 70.0;
        // Bigger raw delta, smaller weight
        after.factor_scores.platform_resilience = 70.0;

        let change = analyze_entry(&after, Some(&before));
        assert_eq!(change.rank_change, 6);
        assert_eq!(change.category, ChangeCategory::MajorRise);
        assert_eq!(change.factor_changes[0].factor, Factor::AgenticCapability);
        assert!(change
            .primary_reason
            .starts_with("Significantly improved agentic capabilities"));
        assert_eq!(change.secondary_reasons.len(), 1);
        assert!(change.narrative.starts_with("devin surged 6 positions"));
    }

    #[test]
    fn test_stable_entry_without_factor_changes_is_not_attached() {
        let before = entry("aider", 4, 65.0);
        let after = entry("aider", 5, 65.0);
        let change = analyze_entry(&after, Some(&before));
        assert_eq!(change.category, ChangeCategory::Decline);
        assert_eq!(change.primary_reason, NO_CHANGE_REASONS[0]);
        assert!(!change.should_attach());
    }

    #[test]
    fn test_large_move_is_attached_even_without_reason() {
        let before = entry("aider", 1, 65.0);
        let after = entry("aider", 4, 65.0);
        let change = analyze_entry(&after, Some(&before));
        assert!(change.should_attach());
        assert_eq!(change.narrative, "aider fell 3 positions due to minor adjustments across multiple factors.");
    }

    #[test]
    fn test_change_report_counts_and_movers() {
        let mut up_before = entry("a", 10, 50.0);
        up_before.factor_scores.innovation = 40.0;
        let mut up_after = entry("a", 1, 80.0);
        up_after.factor_scores.innovation = 60.0;
        let down_before = entry("b", 1, 80.0);
        let down_after = entry("b", 7, 60.0);
        let fresh = entry("c", 2, 70.0);

        let changes = vec![
            analyze_entry(&up_after, Some(&up_before)),
            analyze_entry(&down_after, Some(&down_before)),
            analyze_entry(&fresh, None),
        ];
        let report = change_report(&changes, &[]);

        assert_eq!(report.summary, "3 tools analyzed. 1 major rises, 1 major declines.");
        assert!(report.dropped.is_empty());
        assert_eq!(report.categories.get(&ChangeCategory::NewEntry), Some(&1));
        assert_eq!(report.major_rises[0].tool_id, "a");
        assert_eq!(report.major_declines[0].rank_change, -6);
        assert_eq!(report.factor_trends["innovation"].improving, 1);
        assert!(report.narrative.contains("a led the gains, climbing 9 positions"));
        assert!(report.narrative.contains("1 new tool entered the rankings, including c"));
    }

    #[test]
    fn test_dropped_entries_are_reported() {
        use aipr_common::models::ALGORITHM_VERSION;

        let previous = RankingPeriod {
            period: "2025-05".to_string(),
            algorithm_version: ALGORITHM_VERSION.to_string(),
            is_current: true,
            created_at: chrono::Utc::now(),
            preview_date: None,
            rankings: vec![entry("a", 1, 90.0), entry("gone", 2, 85.0), entry("b", 3, 70.0)],
            metadata: None,
        };
        let current = vec![entry("a", 1, 91.0), entry("b", 2, 72.0)];

        let dropped = dropped_entries(&current, Some(&previous));
        assert_eq!(dropped.len(), 1);
        assert_eq!(dropped[0].tool_id, "gone");
        assert_eq!(dropped[0].previous_rank, 2);
        assert_eq!(dropped[0].previous_score, 85.0);
        assert!(dropped_entries(&current, None).is_empty());

        let changes: Vec<EntryChange> = current
            .iter()
            .map(|c| analyze_entry(c, previous.entry(&c.tool_id)))
            .collect();
        let report = change_report(&changes, &dropped);
        assert_eq!(report.dropped, dropped);
        assert!(report.summary.ends_with(" 1 dropped."));
        assert!(report.narrative.contains("1 tool left the rankings, including gone"));
    }
}
