//! # AI Power Rankings Common Library
//!
//! Shared code for the ranking service and its tooling:
//! - Document models (tools, news articles, ranking periods)
//! - Event types (RankingEvent) and the EventBus
//! - Configuration loading
//! - Error types
//! - Time and period helpers

pub mod config;
pub mod error;
pub mod events;
pub mod models;
pub mod time;

pub use error::{Error, Result};
pub use models::{Factor, FactorScores, Tier};
