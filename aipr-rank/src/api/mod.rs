//! HTTP API handlers for aipr-rank
//!
//! Public read routes under `/api`, mutating routes under `/api/admin`,
//! plus `/health` and the `/events` SSE stream.

pub mod health;
pub mod news;
pub mod rankings;
pub mod sse;
pub mod tools;

pub use health::health_routes;
pub use news::news_routes;
pub use rankings::rankings_routes;
pub use sse::event_stream;
pub use tools::tools_routes;
