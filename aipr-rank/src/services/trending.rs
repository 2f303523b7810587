//! Position history of the leading tools across stored periods
//!
//! Every tool that reached the top ten in any period is tracked, along with
//! the tools in the latest top ten even where they ranked lower, so chart
//! lines show how today's leaders climbed.

use crate::repository::RankingsRepository;
use aipr_common::models::RankingPeriod;
use aipr_common::{time, Result};
use chrono::{Months, NaiveDate};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, warn};

const TOP_POSITIONS: u32 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrendingTool {
    pub tool_id: String,
    pub tool_name: String,
    pub periods_in_top10: usize,
    pub first_appearance: String,
    pub last_appearance: String,
    pub best_position: u32,
    pub worst_position: u32,
    /// Position in the latest period, when tracked there
    pub current_position: Option<u32>,
}

/// One period on the chart: tool id to position, null when not tracked
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartPoint {
    pub period: String,
    /// Display label such as `Jun 2025`
    pub date: String,
    #[serde(flatten)]
    pub positions: BTreeMap<String, Option<u32>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TrendingMetadata {
    pub total_periods: usize,
    pub date_range: DateRange,
    pub top_tools_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TrendingAnalysis {
    pub periods: Vec<String>,
    pub tools: Vec<TrendingTool>,
    pub chart_data: Vec<ChartPoint>,
    pub metadata: TrendingMetadata,
}

impl TrendingAnalysis {
    fn from_parts(tools: Vec<TrendingTool>, chart_data: Vec<ChartPoint>) -> Self {
        let periods: Vec<String> = chart_data.iter().map(|p| p.period.clone()).collect();
        let date_range = DateRange {
            start: periods.first().cloned().unwrap_or_default(),
            end: periods.last().cloned().unwrap_or_default(),
        };
        Self {
            metadata: TrendingMetadata {
                total_periods: periods.len(),
                date_range,
                top_tools_count: tools.len(),
            },
            periods,
            tools,
            chart_data,
        }
    }
}

fn period_label(period: &str) -> String {
    match time::period_start(period) {
        Ok(date) if period.len() == 7 => date.format("%b %Y").to_string(),
        Ok(date) => date.format("%b %-d, %Y").to_string(),
        Err(_) => period.to_string(),
    }
}

/// Build the trending view from ranking periods in any order
pub fn analyze_trending(periods: &[RankingPeriod]) -> TrendingAnalysis {
    let mut sorted: Vec<&RankingPeriod> = periods.iter().collect();
    sorted.sort_by(|a, b| a.period.cmp(&b.period));
    let Some(latest) = sorted.last() else {
        return TrendingAnalysis::default();
    };

    let leaders: HashSet<&str> = latest
        .rankings
        .iter()
        .filter(|e| e.position <= TOP_POSITIONS)
        .map(|e| e.tool_id.as_str())
        .collect();

    let mut tracked: HashMap<String, TrendingTool> = HashMap::new();
    let mut chart_data = Vec::with_capacity(sorted.len());

    for period in &sorted {
        let is_latest = period.period == latest.period;
        let mut positions = BTreeMap::new();

        for entry in period
            .rankings
            .iter()
            .filter(|e| e.position <= TOP_POSITIONS || leaders.contains(e.tool_id.as_str()))
        {
            positions.insert(entry.tool_id.clone(), Some(entry.position));
            let in_top = usize::from(entry.position <= TOP_POSITIONS);

            let tool = tracked
                .entry(entry.tool_id.clone())
                .or_insert_with(|| TrendingTool {
                    tool_id: entry.tool_id.clone(),
                    tool_name: entry.tool_name.clone(),
                    periods_in_top10: 0,
                    first_appearance: period.period.clone(),
                    last_appearance: period.period.clone(),
                    best_position: entry.position,
                    worst_position: entry.position,
                    current_position: None,
                });
            tool.periods_in_top10 += in_top;
            tool.last_appearance = period.period.clone();
            tool.best_position = tool.best_position.min(entry.position);
            tool.worst_position = tool.worst_position.max(entry.position);
            if is_latest {
                tool.current_position = Some(entry.position);
            }
        }

        chart_data.push(ChartPoint {
            period: period.period.clone(),
            date: period_label(&period.period),
            positions,
        });
    }

    let mut tools: Vec<TrendingTool> = tracked.into_values().collect();
    tools.sort_by(|a, b| match (a.current_position, b.current_position) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a
            .best_position
            .cmp(&b.best_position)
            .then_with(|| b.periods_in_top10.cmp(&a.periods_in_top10))
            .then_with(|| a.tool_id.cmp(&b.tool_id)),
    });

    for point in &mut chart_data {
        for tool in &tools {
            point.positions.entry(tool.tool_id.clone()).or_insert(None);
        }
    }

    TrendingAnalysis::from_parts(tools, chart_data)
}

/// Keep periods starting within `months` of `today`, and the tools seen in them
pub fn filter_by_months(analysis: TrendingAnalysis, months: u32, today: NaiveDate) -> TrendingAnalysis {
    let Some(cutoff) = today.checked_sub_months(Months::new(months)) else {
        return analysis;
    };

    let chart_data: Vec<ChartPoint> = analysis
        .chart_data
        .into_iter()
        .filter(|p| time::period_start(&p.period).is_ok_and(|start| start >= cutoff))
        .collect();
    let tools: Vec<TrendingTool> = analysis
        .tools
        .into_iter()
        .filter(|t| {
            chart_data
                .iter()
                .any(|p| p.positions.get(&t.tool_id).copied().flatten().is_some())
        })
        .collect();

    TrendingAnalysis::from_parts(tools, chart_data)
}

/// Trending view over every stored period, optionally limited to recent months
pub async fn trending_for(
    rankings: &dyn RankingsRepository,
    months: Option<u32>,
    today: NaiveDate,
) -> Result<TrendingAnalysis> {
    let ids = rankings.get_periods().await?;
    let mut periods = Vec::with_capacity(ids.len());
    for id in &ids {
        match rankings.get_period(id).await? {
            Some(period) => periods.push(period),
            None => warn!(period = %id, "Listed ranking period could not be loaded"),
        }
    }

    let analysis = analyze_trending(&periods);
    let analysis = match months {
        Some(months) => filter_by_months(analysis, months, today),
        None => analysis,
    };
    debug!(
        periods = analysis.metadata.total_periods,
        tools = analysis.metadata.top_tools_count,
        months = ?months,
        "Trending analysis computed"
    );
    Ok(analysis)
}
