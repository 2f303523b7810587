//! Side-by-side comparison of freshly computed rankings with a stored period
//!
//! Produced by `RankingBuilder::preview`; nothing here touches storage.

use super::change_analyzer::{ChangeReport, DroppedEntry};
use aipr_common::models::{RankingEntry, RankingPeriod};
use serde::Serialize;

/// Movers listed per direction
const TOP_MOVERS: usize = 10;

/// Positions at or above this one count as top-ten changes
const TOP_POSITIONS: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ComparisonMovement {
    Up,
    Down,
    Same,
    New,
    Dropped,
}

/// One tool's stored versus computed standing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankingComparison {
    pub tool_id: String,
    pub tool_name: String,
    pub current_position: Option<u32>,
    /// None when the tool would drop out
    pub new_position: Option<u32>,
    pub current_score: Option<f64>,
    pub new_score: Option<f64>,
    /// Positive when the tool would climb
    pub position_change: i64,
    pub score_change: f64,
    pub movement: ComparisonMovement,
}

impl RankingComparison {
    fn touches_top(&self) -> bool {
        self.new_position.is_some_and(|p| p <= TOP_POSITIONS)
            || self.current_position.is_some_and(|p| p <= TOP_POSITIONS)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PreviewSummary {
    pub tools_moved_up: usize,
    pub tools_moved_down: usize,
    pub tools_unchanged: usize,
    pub new_entries: usize,
    pub dropped_entries: usize,
    /// Mean score change over tools ranked in both periods
    pub average_score_change: f64,
    pub highest_score: f64,
    pub lowest_score: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BiggestMovers {
    pub up: Vec<RankingComparison>,
    pub down: Vec<RankingComparison>,
}

/// Result of a dry-run build
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankingPreview {
    pub period: String,
    pub algorithm_version: String,
    pub total_tools: usize,
    /// Stored period the computed rankings were compared with
    pub compared_to: Option<String>,
    pub ai_articles_processed: usize,
    pub summary: PreviewSummary,
    pub comparisons: Vec<RankingComparison>,
    pub top_10_changes: Vec<RankingComparison>,
    pub biggest_movers: BiggestMovers,
    pub change_report: ChangeReport,
    /// Entries exactly as a build would store them
    pub rankings: Vec<RankingEntry>,
}

fn compare_entry(entry: &RankingEntry, stored: Option<&RankingEntry>) -> RankingComparison {
    let (position_change, movement) = match stored {
        None => (0, ComparisonMovement::New),
        Some(s) => {
            let change = s.position as i64 - entry.position as i64;
            let movement = match change {
                c if c > 0 => ComparisonMovement::Up,
                c if c < 0 => ComparisonMovement::Down,
                _ => ComparisonMovement::Same,
            };
            (change, movement)
        }
    };
    RankingComparison {
        tool_id: entry.tool_id.clone(),
        tool_name: entry.tool_name.clone(),
        current_position: stored.map(|s| s.position),
        new_position: Some(entry.position),
        current_score: stored.map(|s| s.score),
        new_score: Some(entry.score),
        position_change,
        score_change: entry.score - stored.map(|s| s.score).unwrap_or(0.0),
        movement,
    }
}

fn compare_dropped(dropped: &DroppedEntry) -> RankingComparison {
    RankingComparison {
        tool_id: dropped.tool_id.clone(),
        tool_name: dropped.tool_name.clone(),
        current_position: Some(dropped.previous_rank),
        new_position: None,
        current_score: Some(dropped.previous_score),
        new_score: None,
        position_change: -(dropped.previous_rank as i64),
        score_change: -dropped.previous_score,
        movement: ComparisonMovement::Dropped,
    }
}

/// Comparisons for every computed entry followed by every dropped one
pub fn compare_rankings(
    entries: &[RankingEntry],
    stored: Option<&RankingPeriod>,
    dropped: &[DroppedEntry],
) -> Vec<RankingComparison> {
    entries
        .iter()
        .map(|e| compare_entry(e, stored.and_then(|s| s.entry(&e.tool_id))))
        .chain(dropped.iter().map(compare_dropped))
        .collect()
}

pub fn summarize(comparisons: &[RankingComparison]) -> PreviewSummary {
    let count = |m: ComparisonMovement| comparisons.iter().filter(|c| c.movement == m).count();

    let continuing: Vec<f64> = comparisons
        .iter()
        .filter(|c| c.current_score.is_some() && c.new_score.is_some())
        .map(|c| c.score_change)
        .collect();
    let average_score_change = if continuing.is_empty() {
        0.0
    } else {
        continuing.iter().sum::<f64>() / continuing.len() as f64
    };

    let new_scores: Vec<f64> = comparisons.iter().filter_map(|c| c.new_score).collect();
    let (highest_score, lowest_score) = if new_scores.is_empty() {
        (0.0, 0.0)
    } else {
        (
            new_scores.iter().copied().fold(f64::MIN, f64::max),
            new_scores.iter().copied().fold(f64::MAX, f64::min),
        )
    };

    PreviewSummary {
        tools_moved_up: count(ComparisonMovement::Up),
        tools_moved_down: count(ComparisonMovement::Down),
        tools_unchanged: count(ComparisonMovement::Same),
        new_entries: count(ComparisonMovement::New),
        dropped_entries: count(ComparisonMovement::Dropped),
        average_score_change,
        highest_score,
        lowest_score,
    }
}

/// Largest climbs and falls among tools ranked in both periods
pub fn biggest_movers(comparisons: &[RankingComparison]) -> BiggestMovers {
    let mut up: Vec<RankingComparison> = comparisons
        .iter()
        .filter(|c| c.movement == ComparisonMovement::Up)
        .cloned()
        .collect();
    up.sort_by(|a, b| b.position_change.cmp(&a.position_change));
    up.truncate(TOP_MOVERS);

    let mut down: Vec<RankingComparison> = comparisons
        .iter()
        .filter(|c| c.movement == ComparisonMovement::Down)
        .cloned()
        .collect();
    down.sort_by(|a, b| a.position_change.cmp(&b.position_change));
    down.truncate(TOP_MOVERS);

    BiggestMovers { up, down }
}

pub fn top_10_changes(comparisons: &[RankingComparison]) -> Vec<RankingComparison> {
    comparisons.iter().filter(|c| c.touches_top()).cloned().collect()
}
