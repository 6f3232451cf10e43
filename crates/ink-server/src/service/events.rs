//! In-process event bus.
//!
//! Ingest, sync and delete operations publish events so the cache layer
//! and any observer can react. Ordering is guaranteed per emitter only;
//! slow subscribers may observe lag and should treat events as hints, not
//! as a journal.

use ink_postgres::types::VectorKind;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Tracing target for event publication.
const TRACING_TARGET: &str = "ink_server::service::events";

/// Buffered events per subscriber before lag kicks in.
const CHANNEL_CAPACITY: usize = 256;

/// Events observable on the gateway bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GatewayEvent {
    /// A chunk was ingested.
    Ingested {
        /// The stored chunk.
        chunk_id: Uuid,
        /// Modality of the ingested content.
        kind: IngestedKind,
    },
    /// A chunk was written by the sync core.
    Synced {
        /// The written chunk.
        chunk_id: Uuid,
    },
    /// Chunks were deleted (root first for cascades).
    Deleted {
        /// Every removed chunk id.
        chunk_ids: Vec<Uuid>,
    },
    /// Cache entries were invalidated.
    CacheInvalidated {
        /// Number of removed entries.
        entries: usize,
    },
}

/// Modality of an ingested chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestedKind {
    /// Plain text chunk.
    Text,
    /// Image chunk.
    Image,
}

impl From<VectorKind> for IngestedKind {
    fn from(kind: VectorKind) -> Self {
        match kind {
            VectorKind::Text => Self::Text,
            VectorKind::Image => Self::Image,
        }
    }
}

/// Cheap-to-clone broadcast bus for [`GatewayEvent`]s.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<GatewayEvent>,
}

impl EventBus {
    /// Creates a new bus.
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Publishes an event; delivery is best-effort.
    pub fn publish(&self, event: GatewayEvent) {
        tracing::trace!(target: TRACING_TARGET, event = ?event, "publishing event");
        // send only fails when no subscriber exists, which is fine
        let _ = self.sender.send(event);
    }

    /// Subscribes to the bus.
    pub fn subscribe(&self) -> broadcast::Receiver<GatewayEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn events_reach_subscribers_in_order() {
        let bus = EventBus::new();
        let mut receiver = bus.subscribe();

        let first = Uuid::now_v7();
        let second = Uuid::now_v7();
        bus.publish(GatewayEvent::Ingested {
            chunk_id: first,
            kind: IngestedKind::Text,
        });
        bus.publish(GatewayEvent::Ingested {
            chunk_id: second,
            kind: IngestedKind::Image,
        });

        match receiver.recv().await.unwrap() {
            GatewayEvent::Ingested { chunk_id, .. } => assert_eq!(chunk_id, first),
            other => panic!("unexpected event: {other:?}"),
        }
        match receiver.recv().await.unwrap() {
            GatewayEvent::Ingested { chunk_id, .. } => assert_eq!(chunk_id, second),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn publish_without_subscribers_is_silent() {
        let bus = EventBus::new();
        bus.publish(GatewayEvent::CacheInvalidated { entries: 3 });
    }
}
