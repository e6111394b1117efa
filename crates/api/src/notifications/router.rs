//! Topic-to-socket routing.
//!
//! [`FanoutRouter`] subscribes to the [`EventBus`](levelup_events::EventBus)
//! and pushes each event to the sockets its topic addresses: a user topic
//! reaches that user's connections, the leaderboard topic reaches everyone.

use std::sync::Arc;

use axum::extract::ws::Message;
use levelup_core::events::Topic;
use levelup_events::FanoutEvent;
use tokio::sync::broadcast;

use crate::ws::WsManager;

pub struct FanoutRouter {
    ws_manager: Arc<WsManager>,
}

impl FanoutRouter {
    pub fn new(ws_manager: Arc<WsManager>) -> Self {
        Self { ws_manager }
    }

    /// Run the routing loop until the bus is dropped.
    pub async fn run(self, mut receiver: broadcast::Receiver<FanoutEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    let delivered = self.deliver(&event).await;
                    tracing::trace!(
                        topic = %event.topic,
                        event_type = %event.event_type,
                        delivered,
                        "Event fanned out",
                    );
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Fan-out router lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, fan-out router shutting down");
                    break;
                }
            }
        }
    }

    /// Push one event to its audience. Returns the number of sockets reached.
    pub async fn deliver(&self, event: &FanoutEvent) -> usize {
        let msg = serde_json::json!({
            "type": "event",
            "topic": event.topic.to_string(),
            "event_type": event.event_type,
            "payload": event.payload,
            "timestamp": event.timestamp,
        });
        let ws_msg = Message::Text(msg.to_string().into());

        match event.topic {
            Topic::User(user_id) => self.ws_manager.send_to_user(user_id, ws_msg).await,
            Topic::Leaderboard => self.ws_manager.broadcast(ws_msg).await,
        }
    }
}
