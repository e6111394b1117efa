//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is shared via `Arc<EventBus>` across the application and is
//! handed to the progression engine as its `EventPublisher`.

use chrono::{DateTime, Utc};
use levelup_core::events::{EventPublisher, ProgressionEvent, Topic};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// FanoutEvent
// ---------------------------------------------------------------------------

/// A progression event addressed to a topic, already serialized for the
/// wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FanoutEvent {
    pub topic: Topic,

    /// Kebab-case event name, e.g. `"xp-gained"`.
    pub event_type: String,

    /// The serialized [`ProgressionEvent`].
    pub payload: serde_json::Value,

    pub timestamp: DateTime<Utc>,
}

impl FanoutEvent {
    pub fn new(topic: Topic, event: &ProgressionEvent) -> Result<Self, serde_json::Error> {
        Ok(Self {
            topic,
            event_type: event.event_type().to_string(),
            payload: serde_json::to_value(event)?,
            timestamp: Utc::now(),
        })
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// # Usage
///
/// ```rust
/// use levelup_core::events::{EventPublisher, ProgressionEvent, Topic};
/// use levelup_events::EventBus;
///
/// let bus = EventBus::default();
/// let mut rx = bus.subscribe();
///
/// bus.publish(Topic::User(1), ProgressionEvent::FocusCompleted { minutes: 25 });
/// ```
pub struct EventBus {
    sender: broadcast::Sender<FanoutEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed messages are dropped
    /// and slow receivers will observe a `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Send an already-built event to all current subscribers.
    ///
    /// Returns the number of subscribers that will see it; zero means the
    /// event was dropped.
    pub fn send(&self, event: FanoutEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    /// Subscribe to all events published on this bus.
    pub fn subscribe(&self) -> broadcast::Receiver<FanoutEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl EventPublisher for EventBus {
    fn publish(&self, topic: Topic, event: ProgressionEvent) {
        match FanoutEvent::new(topic, &event) {
            Ok(fanout) => {
                let delivered = self.send(fanout);
                tracing::trace!(%topic, event_type = event.event_type(), delivered, "Event published");
            }
            Err(e) => {
                tracing::warn!(%topic, event_type = event.event_type(), error = %e, "Failed to serialize event");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
