//! Ranking period builder
//!
//! Pulls tools and news from the repositories, scores every eligible tool,
//! orders them and stores the result as a ranking period. Movement and
//! change analysis are measured against the closest earlier stored period.
//! `preview` runs the same computation and reports it without storing.

use super::change_analyzer::{
    analyze_entry, change_report, dropped_entries, ChangeReport, EntryChange,
};
use super::metric_extractor::{apply_quantitative_metrics, extract_quantitative_metrics};
use super::movement::{compute_movement, previous_period};
use super::news_impact::calculate_tool_news_impact;
use super::qualitative::{aggregate_qualitative_impact, QualitativeExtractor, QualitativeImpact};
use super::ranking_engine::{RankingEngine, ToolScore};
use super::ranking_preview::{
    biggest_movers, compare_rankings, summarize, top_10_changes, RankingPreview,
};
use crate::repository::Repositories;
use aipr_common::events::{EventBus, RankingEvent};
use aipr_common::models::{
    ranking::validate_period, NewsArticle, NewsImpactSummary, PeriodMetadata, RankingEntry,
    RankingPeriod, Tier, Tool, ToolStatus, ALGORITHM_VERSION,
};
use aipr_common::{time, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Options for a single build
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildOptions {
    /// Rank as of this date: later tools and news are ignored
    #[serde(default)]
    pub preview_date: Option<NaiveDate>,
    /// Run the qualitative extractor over each tool's recent news
    #[serde(default)]
    pub enable_ai: bool,
    /// Make the new period current
    #[serde(default)]
    pub set_current: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BuildStats {
    pub average_score: f64,
    pub highest_score: f64,
    pub lowest_score: f64,
    pub new_entries: usize,
    pub tools_moved_up: usize,
    pub tools_moved_down: usize,
}

impl BuildStats {
    fn from_entries(entries: &[RankingEntry]) -> Self {
        use aipr_common::models::MovementDirection as Dir;

        if entries.is_empty() {
            return Self::default();
        }
        let scores = entries.iter().map(|e| e.score);
        let count_dir = |dir: Dir| entries.iter().filter(|e| e.movement.direction == dir).count();
        Self {
            average_score: scores.clone().sum::<f64>() / entries.len() as f64,
            highest_score: scores.clone().fold(f64::MIN, f64::max),
            lowest_score: scores.fold(f64::MAX, f64::min),
            new_entries: count_dir(Dir::New),
            tools_moved_up: count_dir(Dir::Up),
            tools_moved_down: count_dir(Dir::Down),
        }
    }
}

/// What a build produced
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuildSummary {
    pub period: String,
    pub algorithm_version: String,
    pub total_tools: usize,
    pub is_current: bool,
    /// Period movement was measured against
    pub previous_period: Option<String>,
    pub ai_articles_processed: usize,
    pub stats: BuildStats,
    pub change_report: ChangeReport,
}

/// Ordered entries for one period, not yet stored
struct Computed {
    entries: Vec<RankingEntry>,
    changes: Vec<EntryChange>,
    /// Stored period movement was measured against
    previous: Option<RankingPeriod>,
    ai_articles: usize,
}

/// A tool with its computed score, before positions are assigned
#[derive(Debug, Clone)]
pub struct ScoredTool {
    pub tool: Tool,
    pub score: ToolScore,
    pub news_impact: Option<NewsImpactSummary>,
}

/// Order by score, then agentic capability, then name
fn rank_order(a: &ScoredTool, b: &ScoredTool) -> Ordering {
    b.score
        .overall_score
        .total_cmp(&a.score.overall_score)
        .then_with(|| {
            b.score
                .factor_scores
                .agentic_capability
                .total_cmp(&a.score.factor_scores.agentic_capability)
        })
        .then_with(|| a.tool.name.cmp(&b.tool.name))
}

/// Sort scored tools and turn them into ranking entries
///
/// Returns the entries together with the change analysis of each one.
pub fn assign_positions(
    mut scored: Vec<ScoredTool>,
    previous: Option<&RankingPeriod>,
) -> (Vec<RankingEntry>, Vec<EntryChange>) {
    scored.sort_by(rank_order);

    let mut entries = Vec::with_capacity(scored.len());
    let mut changes = Vec::with_capacity(scored.len());

    for (index, item) in scored.into_iter().enumerate() {
        let position = index as u32 + 1;
        let previous_entry = previous.and_then(|p| p.entry(&item.tool.id));

        let mut entry = RankingEntry {
            tool_id: item.tool.id,
            tool_name: item.tool.name,
            position,
            score: item.score.overall_score,
            tier: Tier::from_position(position),
            factor_scores: item.score.factor_scores,
            sentiment_analysis: item.score.sentiment_analysis,
            movement: compute_movement(previous_entry.map(|p| p.position), position),
            change_analysis: None,
            news_impact: item.news_impact,
        };

        let change = analyze_entry(&entry, previous_entry);
        if change.should_attach() {
            entry.change_analysis = Some(change.to_change_analysis());
        }
        entries.push(entry);
        changes.push(change);
    }

    (entries, changes)
}

pub struct RankingBuilder {
    repos: Repositories,
    engine: RankingEngine,
    extractor: Option<Arc<dyn QualitativeExtractor>>,
    event_bus: Option<EventBus>,
}

impl RankingBuilder {
    pub fn new(repos: Repositories) -> Self {
        Self {
            repos,
            engine: RankingEngine::default(),
            extractor: None,
            event_bus: None,
        }
    }

    pub fn with_extractor(mut self, extractor: Option<Arc<dyn QualitativeExtractor>>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    /// Compute and store the ranking period `period`
    pub async fn build(&self, period: &str, options: &BuildOptions) -> Result<BuildSummary> {
        let computed = self.compute(period, options).await?;
        let stats = BuildStats::from_entries(&computed.entries);
        let dropped = dropped_entries(&computed.entries, computed.previous.as_ref());
        let report = change_report(&computed.changes, &dropped);
        let total_tools = computed.entries.len();

        let now = Utc::now();
        let ranking_period = RankingPeriod {
            period: period.to_string(),
            algorithm_version: ALGORITHM_VERSION.to_string(),
            is_current: options.set_current,
            created_at: now,
            preview_date: options.preview_date,
            rankings: computed.entries,
            metadata: Some(PeriodMetadata {
                total_tools,
                calculation_date: now,
                notes: options
                    .preview_date
                    .map(|d| format!("Preview as of {}", d)),
            }),
        };
        self.repos.rankings.save_period(ranking_period).await?;

        let is_current =
            self.repos.rankings.get_current_period().await?.as_deref() == Some(period);
        let previous_id = computed.previous.map(|p| p.period);

        info!(
            period = %period,
            total_tools,
            is_current,
            previous = ?previous_id,
            dropped = dropped.len(),
            average = stats.average_score,
            "Rankings built"
        );

        if let Some(bus) = &self.event_bus {
            bus.emit_lossy(RankingEvent::RankingsBuilt {
                period: period.to_string(),
                total_tools,
                is_current,
                timestamp: now,
            });
        }

        Ok(BuildSummary {
            period: period.to_string(),
            algorithm_version: ALGORITHM_VERSION.to_string(),
            total_tools,
            is_current,
            previous_period: previous_id,
            ai_articles_processed: computed.ai_articles,
            stats,
            change_report: report,
        })
    }

    /// Compute `period` exactly as `build` would, without storing anything
    ///
    /// The result is compared with the same stored period `build` measures
    /// movement against. `set_current` is ignored and no event is emitted.
    pub async fn preview(&self, period: &str, options: &BuildOptions) -> Result<RankingPreview> {
        let computed = self.compute(period, options).await?;
        let previous = computed.previous.as_ref();
        let dropped = dropped_entries(&computed.entries, previous);
        let comparisons = compare_rankings(&computed.entries, previous, &dropped);
        let summary = summarize(&comparisons);

        info!(
            period = %period,
            total_tools = computed.entries.len(),
            compared_to = ?previous.map(|p| p.period.as_str()),
            moved_up = summary.tools_moved_up,
            moved_down = summary.tools_moved_down,
            dropped = summary.dropped_entries,
            "Rankings previewed"
        );

        Ok(RankingPreview {
            period: period.to_string(),
            algorithm_version: ALGORITHM_VERSION.to_string(),
            total_tools: computed.entries.len(),
            compared_to: previous.map(|p| p.period.clone()),
            ai_articles_processed: computed.ai_articles,
            change_report: change_report(&computed.changes, &dropped),
            top_10_changes: top_10_changes(&comparisons),
            biggest_movers: biggest_movers(&comparisons),
            summary,
            comparisons,
            rankings: computed.entries,
        })
    }

    /// Score, order and analyse every eligible tool for `period`
    async fn compute(&self, period: &str, options: &BuildOptions) -> Result<Computed> {
        validate_period(period)?;

        let tools = self.eligible_tools(options.preview_date).await?;
        let articles = self.repos.news.get_all().await?;
        let cutoff = time::start_of_day(match options.preview_date {
            Some(date) => date,
            None => time::period_start(period)?,
        });

        let extractor = match (&self.extractor, options.enable_ai) {
            (Some(extractor), true) => Some(extractor.as_ref()),
            (None, true) => {
                warn!(period = %period, "AI analysis requested but no extractor is configured");
                None
            }
            _ => None,
        };

        info!(
            period = %period,
            tools = tools.len(),
            articles = articles.len(),
            cutoff = %cutoff,
            ai = extractor.is_some(),
            "Computing rankings"
        );

        let mut scored = Vec::with_capacity(tools.len());
        let mut ai_articles = 0;
        for tool in tools {
            let (item, processed) = self.score_tool(tool, &articles, cutoff, extractor).await;
            ai_articles += processed;
            scored.push(item);
        }

        let stored_periods = self.repos.rankings.get_periods().await?;
        let previous = match previous_period(&stored_periods, period) {
            Some(id) => self.repos.rankings.get_period(id).await?,
            None => None,
        };

        let (entries, changes) = assign_positions(scored, previous.as_ref());
        Ok(Computed {
            entries,
            changes,
            previous,
            ai_articles,
        })
    }

    /// Active tools, minus those not yet available at the preview date
    async fn eligible_tools(&self, preview_date: Option<NaiveDate>) -> Result<Vec<Tool>> {
        let active = self.repos.tools.get_by_status(ToolStatus::Active).await?;
        let Some(date) = preview_date else {
            return Ok(active);
        };

        let before = active.len();
        let eligible: Vec<Tool> = active
            .into_iter()
            .filter(|t| t.available_since() <= date)
            .collect();
        if eligible.len() != before {
            info!(
                preview_date = %date,
                before,
                after = eligible.len(),
                "Filtered tools by availability date"
            );
        }
        Ok(eligible)
    }

    async fn score_tool(
        &self,
        mut tool: Tool,
        articles: &[NewsArticle],
        cutoff: DateTime<Utc>,
        extractor: Option<&dyn QualitativeExtractor>,
    ) -> (ScoredTool, usize) {
        let mentions = articles
            .iter()
            .filter(|a| a.mentions(&tool.id) && a.published_date <= cutoff)
            .count();
        tool.info.metrics.news_mentions = Some(mentions as u32);

        let quantitative = extract_quantitative_metrics(&tool.id, articles, Some(cutoff));
        if !quantitative.is_empty() {
            apply_quantitative_metrics(&mut tool, &quantitative);
        }

        let news = calculate_tool_news_impact(&tool.id, articles, cutoff);
        let qualitative = match extractor {
            Some(extractor) => aggregate_qualitative_impact(extractor, &tool, articles, cutoff).await,
            None => QualitativeImpact::default(),
        };

        let adjustments = Some(qualitative.adjustments).filter(|a| !a.is_zero());
        let score = self
            .engine
            .calculate_tool_score(&tool, Some(&news), adjustments.as_ref());

        debug!(
            tool = %tool.slug,
            score = score.overall_score,
            mentions,
            news_impact = news.total_impact,
            "Tool scored"
        );

        let news_impact = (news.article_count > 0 || qualitative.processed_articles > 0).then(|| {
            NewsImpactSummary {
                articles_analyzed: news.article_count,
                last_news_date: news.last_news_date,
                significant_events: qualitative.significant_events,
                qualitative_boosts: adjustments,
            }
        });

        (
            ScoredTool {
                tool,
                score,
                news_impact,
            },
            qualitative.processed_articles,
        )
    }
}
