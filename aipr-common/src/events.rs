//! Event types and the in-process event bus
//!
//! Services emit `RankingEvent`s after state changes; the HTTP layer relays
//! them to SSE clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Events published by the ranking service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RankingEvent {
    /// A ranking period was computed and stored
    RankingsBuilt {
        period: String,
        total_tools: usize,
        is_current: bool,
        timestamp: DateTime<Utc>,
    },

    /// A ranking period was removed
    RankingPeriodDeleted {
        period: String,
        /// Period whose movement was recomputed, if any
        relinked_period: Option<String>,
        timestamp: DateTime<Utc>,
    },

    /// The period served as "current" changed
    CurrentPeriodChanged {
        period: String,
        timestamp: DateTime<Utc>,
    },

    /// A news article was stored
    ArticleIngested {
        article_id: String,
        slug: String,
        tool_mentions: Vec<String>,
        timestamp: DateTime<Utc>,
    },

    /// A tool document was created or replaced
    ToolUpdated {
        tool_id: String,
        slug: String,
        timestamp: DateTime<Utc>,
    },
}

impl RankingEvent {
    /// Event type name, used as the SSE event name
    pub fn event_type(&self) -> &str {
        match self {
            RankingEvent::RankingsBuilt { .. } => "RankingsBuilt",
            RankingEvent::RankingPeriodDeleted { .. } => "RankingPeriodDeleted",
            RankingEvent::CurrentPeriodChanged { .. } => "CurrentPeriodChanged",
            RankingEvent::ArticleIngested { .. } => "ArticleIngested",
            RankingEvent::ToolUpdated { .. } => "ToolUpdated",
        }
    }
}

/// Broadcast bus for `RankingEvent`s
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<RankingEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus buffering up to `capacity` events per slow subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<RankingEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: RankingEvent,
    ) -> std::result::Result<usize, broadcast::error::SendError<RankingEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: RankingEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn built(period: &str) -> RankingEvent {
        RankingEvent::RankingsBuilt {
            period: period.to_string(),
            total_tools: 3,
            is_current: false,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let json = serde_json::to_value(built("2025-06")).unwrap();
        assert_eq!(json["type"], "RankingsBuilt");
        assert_eq!(json["period"], "2025-06");
    }

    #[test]
    fn test_emit_without_subscribers_is_err() {
        let bus = EventBus::new(10);
        assert!(bus.emit(built("2025-06")).is_err());
        bus.emit_lossy(built("2025-06"));
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_subscriber_receives_event() {
        let bus = EventBus::new(10);
        let mut rx = bus.subscribe();
        assert_eq!(bus.emit(built("2025-07")).unwrap(), 1);

        let event = rx.recv().await.unwrap();
        assert_eq!(event.event_type(), "RankingsBuilt");
    }
}
