//! Document models shared by repositories, services and the API

pub mod article;
pub mod factors;
pub mod ranking;
pub mod tool;

pub use article::{ExtractedMetric, MetricKind, NewsArticle};
pub use factors::{Factor, FactorScores, Tier};
pub use ranking::{
    ChangeAnalysis, Movement, MovementDirection, NewsImpactSummary, PeriodMetadata,
    QualitativeAdjustments, RankingEntry, RankingPeriod, SentimentAnalysis, SignificantEvent,
    ALGORITHM_VERSION,
};
pub use tool::{BusinessInfo, SweBench, TechnicalInfo, Tool, ToolInfo, ToolMetrics, ToolStatus};
