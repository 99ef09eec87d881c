// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::Response;
use rundown_backend::config::Config;
use rundown_backend::db::Database;
use rundown_backend::models::CredentialBundle;
use rundown_backend::routes::create_router;
use rundown_backend::AppState;
use std::sync::Arc;
use std::time::Duration;

/// Create an in-memory test database.
#[allow(dead_code)]
pub async fn test_db() -> Database {
    Database::new("sqlite::memory:")
        .await
        .expect("Failed to open in-memory database")
}

/// Create a test app over an in-memory database.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub async fn create_test_app() -> (axum::Router, Arc<AppState>) {
    create_test_app_with_config(Config::test_default()).await
}

/// Create a test app with a custom config (e.g. Strava URLs pointing at a
/// mock server).
#[allow(dead_code)]
pub async fn create_test_app_with_config(config: Config) -> (axum::Router, Arc<AppState>) {
    let db = Database::new(&config.database_url)
        .await
        .expect("Failed to open test database");
    let state = Arc::new(AppState::new(config, db));
    (create_router(state.clone()), state)
}

/// Config whose Strava API and OAuth URLs point at `base_url`.
#[allow(dead_code)]
pub fn config_for_mock(base_url: &str) -> Config {
    let mut config = Config::test_default();
    config.strava_api_url = format!("{}/api/v3", base_url);
    config.strava_oauth_url = format!("{}/oauth", base_url);
    config
}

/// A credential bundle for `athlete_id`.
#[allow(dead_code)]
pub fn bundle(athlete_id: i64, access_token: &str, expires_in_secs: i64) -> CredentialBundle {
    CredentialBundle {
        athlete_id,
        access_token: access_token.to_string(),
        refresh_token: format!("refresh-{}", athlete_id),
        expires_at: chrono::Utc::now() + chrono::Duration::seconds(expires_in_secs),
        username: Some(format!("athlete{}", athlete_id)),
        firstname: Some("Test".to_string()),
        lastname: Some("Runner".to_string()),
        profile: None,
    }
}

#[allow(dead_code)]
pub fn json_request(method: Method, uri: &str, body: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

#[allow(dead_code)]
pub fn empty_request(method: Method, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Read a response body as JSON.
#[allow(dead_code)]
pub async fn body_json(response: Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

/// Wait until the webhook worker has finished `count` events.
#[allow(dead_code)]
pub async fn wait_for_completed(state: &AppState, count: u64) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while state.tasks_service.completed() < count {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("webhook worker did not finish in time");
}
