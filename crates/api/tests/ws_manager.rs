//! Unit tests for `WsManager` and topic routing through `FanoutRouter`.
//!
//! No HTTP upgrades are performed; connections are registered directly.

use std::sync::Arc;

use axum::extract::ws::Message;
use levelup_api::notifications::FanoutRouter;
use levelup_api::ws::WsManager;
use levelup_core::events::{EventPublisher, ProgressionEvent, Topic};
use levelup_events::{EventBus, FanoutEvent};

fn text(message: Message) -> serde_json::Value {
    match message {
        Message::Text(body) => serde_json::from_str(body.as_str()).unwrap(),
        other => panic!("expected a text frame, got {other:?}"),
    }
}

#[tokio::test]
async fn add_and_remove_track_connection_count() {
    let manager = WsManager::new();
    assert_eq!(manager.connection_count().await, 0);

    let _rx1 = manager.add("conn-1".to_string(), 1).await;
    let _rx2 = manager.add("conn-2".to_string(), 1).await;
    assert_eq!(manager.connection_count().await, 2);

    manager.remove("nonexistent").await;
    assert_eq!(manager.connection_count().await, 2);

    manager.remove("conn-1").await;
    assert_eq!(manager.connection_count().await, 1);
}

#[tokio::test]
async fn get_by_user_lists_only_that_users_connections() {
    let manager = WsManager::new();
    let _a = manager.add("a".to_string(), 1).await;
    let _b = manager.add("b".to_string(), 2).await;
    let _c = manager.add("c".to_string(), 1).await;

    let mut ids = manager.get_by_user(1).await;
    ids.sort();
    assert_eq!(ids, vec!["a".to_string(), "c".to_string()]);
    assert!(manager.get_by_user(3).await.is_empty());
}

#[tokio::test]
async fn send_to_user_skips_other_users_and_closed_channels() {
    let manager = WsManager::new();
    let mut mine = manager.add("mine".to_string(), 1).await;
    let closed = manager.add("closed".to_string(), 1).await;
    let mut theirs = manager.add("theirs".to_string(), 2).await;
    drop(closed);

    let sent = manager
        .send_to_user(1, Message::Text("hello".into()))
        .await;

    assert_eq!(sent, 1);
    assert!(matches!(mine.try_recv(), Ok(Message::Text(_))));
    assert!(theirs.try_recv().is_err());
}

#[tokio::test]
async fn shutdown_all_sends_close_and_clears() {
    let manager = WsManager::new();
    let mut rx = manager.add("conn-1".to_string(), 1).await;

    manager.shutdown_all().await;

    assert_eq!(manager.connection_count().await, 0);
    assert!(matches!(rx.recv().await, Some(Message::Close(None))));
}

#[tokio::test]
async fn user_topic_reaches_only_that_user() {
    let manager = Arc::new(WsManager::new());
    let mut ada = manager.add("ada".to_string(), 1).await;
    let mut bob = manager.add("bob".to_string(), 2).await;
    let router = FanoutRouter::new(Arc::clone(&manager));

    let event = FanoutEvent::new(
        Topic::User(1),
        &ProgressionEvent::XpGained {
            amount: 11,
            total: 21,
        },
    )
    .unwrap();
    assert_eq!(router.deliver(&event).await, 1);

    let json = text(ada.try_recv().unwrap());
    assert_eq!(json["type"], "event");
    assert_eq!(json["topic"], "user:1");
    assert_eq!(json["event_type"], "xp-gained");
    assert_eq!(json["payload"]["amount"], 11);
    assert!(bob.try_recv().is_err());
}

#[tokio::test]
async fn leaderboard_topic_reaches_everyone() {
    let manager = Arc::new(WsManager::new());
    let mut ada = manager.add("ada".to_string(), 1).await;
    let mut bob = manager.add("bob".to_string(), 2).await;
    let router = FanoutRouter::new(Arc::clone(&manager));

    let event = FanoutEvent::new(
        Topic::Leaderboard,
        &ProgressionEvent::LeaderboardUpdate {
            user_id: 1,
            username: "ada".into(),
            xp: 21,
            level: 1,
        },
    )
    .unwrap();
    assert_eq!(router.deliver(&event).await, 2);

    assert_eq!(text(ada.try_recv().unwrap())["event_type"], "leaderboard-update");
    assert_eq!(text(bob.try_recv().unwrap())["topic"], "leaderboard");
}

#[tokio::test]
async fn router_forwards_bus_events_until_the_bus_closes() {
    let manager = Arc::new(WsManager::new());
    let mut rx = manager.add("ada".to_string(), 1).await;
    let bus = EventBus::default();
    let handle = tokio::spawn(FanoutRouter::new(Arc::clone(&manager)).run(bus.subscribe()));

    bus.publish(Topic::User(1), ProgressionEvent::FocusCompleted { minutes: 25 });

    let json = text(rx.recv().await.unwrap());
    assert_eq!(json["event_type"], "focus-completed");

    drop(bus);
    handle.await.unwrap();
}
