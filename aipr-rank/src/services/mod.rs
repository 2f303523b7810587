//! Scoring, extraction and ranking services

pub mod article_ingestion;
pub mod change_analyzer;
pub mod metric_extractor;
pub mod movement;
pub mod news_impact;
pub mod news_metric_analyzer;
pub mod openrouter_client;
pub mod qualitative;
pub mod ranking_builder;
pub mod ranking_engine;
pub mod ranking_preview;
pub mod tool_detector;
pub mod trending;

pub use article_ingestion::{ingest_article, IngestRequest};
pub use change_analyzer::{
    analyze_entry, change_report, dropped_entries, ChangeReport, DroppedEntry, EntryChange,
};
pub use movement::{compute_movement, delete_period_and_relink, DeleteOutcome};
pub use news_impact::{calculate_tool_news_impact, NewsImpact};
pub use openrouter_client::OpenRouterClient;
pub use qualitative::{aggregate_qualitative_impact, ExtractorError, QualitativeExtractor};
pub use ranking_builder::{BuildOptions, BuildSummary, RankingBuilder};
pub use ranking_engine::{RankingEngine, ToolScore};
pub use ranking_preview::{ComparisonMovement, RankingComparison, RankingPreview};
pub use tool_detector::ToolDetector;
pub use trending::{analyze_trending, trending_for, TrendingAnalysis};
