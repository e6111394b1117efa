//! Shared helpers for the API integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use levelup_core::achievements::catalog;
use levelup_core::types::DbId;
use levelup_core::ProgressionEngine;
use levelup_db::models::user::CreateUser;
use levelup_db::repositories::{AchievementRepo, UserRepo};
use levelup_db::PgProgressionStore;
use levelup_events::EventBus;
use sqlx::PgPool;
use tower::ServiceExt;

use levelup_api::auth::jwt::{generate_access_token, JwtConfig};
use levelup_api::config::ServerConfig;
use levelup_api::router::build_app_router;
use levelup_api::state::AppState;
use levelup_api::ws::WsManager;

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        leaderboard_limit: 10,
        jwt: JwtConfig {
            secret: "test-secret-that-is-long-enough-for-hmac".to_string(),
            access_token_expiry_mins: 15,
        },
    }
}

/// Application state wired to `pool`, with a fresh bus and engine.
pub fn test_state(pool: PgPool) -> AppState {
    let event_bus = Arc::new(EventBus::default());
    let store = Arc::new(PgProgressionStore::new(pool.clone()));
    let engine = Arc::new(ProgressionEngine::new(store, event_bus.clone()));

    AppState {
        pool,
        config: Arc::new(test_config()),
        ws_manager: Arc::new(WsManager::new()),
        event_bus,
        engine,
    }
}

/// Build the full application router (same middleware stack as the binary)
/// with the achievement catalog seeded.
pub async fn build_test_app(pool: PgPool) -> Router {
    build_test_app_with_state(test_state(pool)).await
}

pub async fn build_test_app_with_state(state: AppState) -> Router {
    AchievementRepo::seed(&state.pool, &catalog())
        .await
        .expect("seeding the catalog should succeed");
    let config = state.config.clone();
    build_app_router(state, &config)
}

/// Create a user directly in the database.
pub async fn create_user(pool: &PgPool, username: &str) -> DbId {
    let input = CreateUser {
        username: username.to_string(),
    };
    UserRepo::create(pool, &input)
        .await
        .expect("user creation should succeed")
        .id
}

/// A valid access token for `user_id` under [`test_config`].
pub fn token_for(user_id: DbId) -> String {
    generate_access_token(user_id, &test_config().jwt).expect("token generation should succeed")
}

async fn send(
    app: Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response {
    send(app, Method::GET, uri, None, None).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response {
    send(app, Method::GET, uri, Some(token), None).await
}

pub async fn post_auth(app: Router, uri: &str, token: &str) -> Response {
    send(app, Method::POST, uri, Some(token), None).await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response {
    send(app, Method::POST, uri, None, Some(body)).await
}

pub async fn post_json_auth(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Response {
    send(app, Method::POST, uri, Some(token), Some(body)).await
}

pub async fn put_json_auth(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Response {
    send(app, Method::PUT, uri, Some(token), Some(body)).await
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
