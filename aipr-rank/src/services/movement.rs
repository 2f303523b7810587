//! Position movement between ranking periods
//!
//! Movement is always measured against the closest earlier period that is
//! still stored. Deleting a period therefore changes the baseline of the
//! period that followed it, which is recomputed here.

use crate::repository::RankingsRepository;
use aipr_common::models::{
    ChangeAnalysis, Movement, MovementDirection, RankingEntry, RankingPeriod,
};
use aipr_common::Result;
use std::collections::HashMap;
use tracing::info;

/// Places moved at which a re-linked entry without analysis gets a reason
const NOTABLE_MOVE: u32 = 5;

/// Movement from `previous` to `position`; no previous position means "new"
pub fn compute_movement(previous: Option<u32>, position: u32) -> Movement {
    let Some(prev) = previous else {
        return Movement::new_entry();
    };
    let change = prev as i64 - position as i64;
    Movement {
        previous_position: Some(prev),
        change: change.unsigned_abs() as u32,
        direction: match change {
            c if c > 0 => MovementDirection::Up,
            c if c < 0 => MovementDirection::Down,
            _ => MovementDirection::Same,
        },
    }
}

/// Greatest stored period strictly before `period`
///
/// Identifiers compare as strings, so `2025-06` < `2025-06-15` < `2025-07`.
pub fn previous_period<'a>(periods: &'a [String], period: &str) -> Option<&'a String> {
    periods.iter().filter(|p| p.as_str() < period).max()
}

/// Smallest stored period strictly after `period`
pub fn next_period<'a>(periods: &'a [String], period: &str) -> Option<&'a String> {
    periods.iter().filter(|p| p.as_str() > period).min()
}

/// Recompute every entry's movement against `baseline` (or mark all new)
///
/// Entries moving at least [`NOTABLE_MOVE`] places that carry no change
/// analysis receive a generic primary reason.
pub fn relink_entries(entries: &mut [RankingEntry], baseline: Option<&RankingPeriod>) {
    let previous: HashMap<&str, u32> = baseline
        .map(|b| {
            b.rankings
                .iter()
                .map(|e| (e.tool_id.as_str(), e.position))
                .collect()
        })
        .unwrap_or_default();

    for entry in entries.iter_mut() {
        entry.movement = compute_movement(previous.get(entry.tool_id.as_str()).copied(), entry.position);
        if entry.movement.change >= NOTABLE_MOVE && entry.change_analysis.is_none() {
            entry.change_analysis = Some(generic_analysis(entry));
        }
    }
}

fn generic_analysis(entry: &RankingEntry) -> ChangeAnalysis {
    let (reason, verb) = match entry.movement.direction {
        MovementDirection::Up => ("Performance improvements", "rose"),
        _ => ("Competitive pressure", "fell"),
    };
    ChangeAnalysis {
        primary_reason: reason.to_string(),
        secondary_reasons: Vec::new(),
        narrative_explanation: format!(
            "{} {} {} positions to #{}.",
            entry.tool_name, verb, entry.movement.change, entry.position
        ),
    }
}

/// Result of deleting a period
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteOutcome {
    pub deleted: bool,
    /// Period whose movement was recomputed
    pub relinked_period: Option<String>,
    /// Period that replaced it as current, when it was current
    pub new_current: Option<String>,
}

/// Delete `period` and re-link the period that followed it
pub async fn delete_period_and_relink(
    repo: &dyn RankingsRepository,
    period: &str,
) -> Result<DeleteOutcome> {
    let was_current = repo.get_current_period().await?.as_deref() == Some(period);
    if !repo.delete_period(period).await? {
        return Ok(DeleteOutcome::default());
    }

    let periods = repo.get_periods().await?;
    let new_current = if was_current {
        repo.get_current_period().await?
    } else {
        None
    };

    let Some(next) = next_period(&periods, period).cloned() else {
        return Ok(DeleteOutcome {
            deleted: true,
            relinked_period: None,
            new_current,
        });
    };

    let Some(mut next_data) = repo.get_period(&next).await? else {
        return Ok(DeleteOutcome {
            deleted: true,
            relinked_period: None,
            new_current,
        });
    };

    let baseline_id = previous_period(&periods, &next).cloned();
    let baseline = match &baseline_id {
        Some(id) => repo.get_period(id).await?,
        None => None,
    };

    relink_entries(&mut next_data.rankings, baseline.as_ref());
    repo.save_period(next_data).await?;

    info!(
        deleted = %period,
        relinked = %next,
        baseline = ?baseline_id,
        "Re-linked movement after period deletion"
    );

    Ok(DeleteOutcome {
        deleted: true,
        relinked_period: Some(next),
        new_current,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::entry;

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_compute_movement() {
        assert_eq!(compute_movement(None, 3), Movement::new_entry());

        let up = compute_movement(Some(7), 2);
        assert_eq!(up.direction, MovementDirection::Up);
        assert_eq!(up.change, 5);
        assert_eq!(up.previous_position, Some(7));

        let down = compute_movement(Some(1), 4);
        assert_eq!(down.direction, MovementDirection::Down);
        assert_eq!(down.change, 3);

        let same = compute_movement(Some(4), 4);
        assert_eq!(same.direction, MovementDirection::Same);
        assert_eq!(same.change, 0);
    }

    #[test]
    fn test_previous_and_next_period_ordering() {
        let periods = ids(&["2025-07", "2025-06-15", "2025-06", "2025-05"]);
        assert_eq!(
            previous_period(&periods, "2025-07").map(String::as_str),
            Some("2025-06-15")
        );
        assert_eq!(
            previous_period(&periods, "2025-06-15").map(String::as_str),
            Some("2025-06")
        );
        assert_eq!(previous_period(&periods, "2025-05"), None);
        // Works for periods that are not stored yet
        assert_eq!(
            previous_period(&periods, "2025-08").map(String::as_str),
            Some("2025-07")
        );
        assert_eq!(
            next_period(&periods, "2025-06").map(String::as_str),
            Some("2025-06-15")
        );
        assert_eq!(next_period(&periods, "2025-07"), None);
    }

    #[test]
    fn test_relink_without_baseline_marks_all_new() {
        let mut entries = vec![entry("a", 1, 80.0), entry("b", 2, 70.0)];
        entries[0].movement = compute_movement(Some(9), 1);
        relink_entries(&mut entries, None);
        assert!(entries
            .iter()
            .all(|e| e.movement.direction == MovementDirection::New));
        assert!(entries.iter().all(|e| e.change_analysis.is_none()));
    }

    #[test]
    fn test_relink_adds_generic_reason_for_big_moves() {
        let baseline = RankingPeriod {
            period: "2025-05".to_string(),
            algorithm_version: "v7.0".to_string(),
            is_current: false,
            created_at: chrono::Utc::now(),
            preview_date: None,
            rankings: vec![entry("a", 8, 60.0), entry("b", 1, 90.0), entry("c", 3, 70.0)],
            metadata: None,
        };
        let mut entries = vec![entry("a", 1, 85.0), entry("b", 6, 65.0), entry("c", 4, 68.0)];
        relink_entries(&mut entries, Some(&baseline));

        let a = entries[0].change_analysis.as_ref().unwrap();
        assert_eq!(a.primary_reason, "Performance improvements");
        let b = entries[1].change_analysis.as_ref().unwrap();
        assert_eq!(b.primary_reason, "Competitive pressure");
        assert!(entries[2].change_analysis.is_none());
        assert_eq!(entries[2].movement.direction, MovementDirection::Down);
    }
}
