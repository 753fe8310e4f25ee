//! Leadership event delivery to the host.
//!
//! Subscribers bind by topic name without importing engine internals; the
//! payload carries the lease name so one subscriber can multiplex several
//! electors.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

/// Topic name for leadership-gained notifications.
pub const ELECTED_TOPIC: &str = "leader.elected";

/// Topic name for leadership-lost notifications.
pub const LOST_TOPIC: &str = "leader.lost";

/// Buffered events per subscriber before the slowest one starts lagging.
pub(crate) const EVENT_CHANNEL_CAPACITY: usize = 16;

/// A leadership transition observed by this participant.
///
/// Serializes as `{"kind": "elected"|"lost", "leaseName": ...}` for hosts
/// that forward events onto an external bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum LeadershipEvent {
    Elected { lease_name: String },
    Lost { lease_name: String },
}

impl LeadershipEvent {
    pub(crate) fn elected(lease_name: &str) -> Self {
        LeadershipEvent::Elected {
            lease_name: lease_name.to_string(),
        }
    }

    pub(crate) fn lost(lease_name: &str) -> Self {
        LeadershipEvent::Lost {
            lease_name: lease_name.to_string(),
        }
    }

    /// Fixed topic string for this event kind.
    pub fn topic(&self) -> &'static str {
        match self {
            LeadershipEvent::Elected { .. } => ELECTED_TOPIC,
            LeadershipEvent::Lost { .. } => LOST_TOPIC,
        }
    }

    /// Name of the lease this transition concerns.
    pub fn lease_name(&self) -> &str {
        match self {
            LeadershipEvent::Elected { lease_name } | LeadershipEvent::Lost { lease_name } => {
                lease_name
            }
        }
    }
}

/// Fire-and-forget fan-out of leadership events.
///
/// Delivery failures (no subscribers, lagged subscribers) never propagate
/// back into the engine.
#[derive(Clone)]
pub struct EventSink {
    tx: broadcast::Sender<LeadershipEvent>,
}

impl EventSink {
    pub(crate) fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Register a new subscriber. Events emitted before this call are not
    /// replayed.
    pub fn subscribe(&self) -> broadcast::Receiver<LeadershipEvent> {
        self.tx.subscribe()
    }

    pub(crate) fn emit(&self, event: LeadershipEvent) {
        debug!(
            topic = event.topic(),
            lease_name = event.lease_name(),
            "emitting leadership event"
        );
        // A send error only means nobody is subscribed right now.
        let _ = self.tx.send(event);
    }
}
