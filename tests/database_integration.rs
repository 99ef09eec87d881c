// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Integration tests for the SQLite credential and webhook event store.

use rundown_backend::error::AppError;
use rundown_backend::models::WebhookEvent;
use serde_json::json;
use std::time::Duration;

mod common;

#[tokio::test]
async fn test_upsert_creates_then_overwrites() {
    let db = common::test_db().await;

    let first = db
        .upsert_credential(&common::bundle(42, "first", 3600))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(5)).await;

    let mut second_bundle = common::bundle(42, "second", 7200);
    second_bundle.firstname = Some("Changed".to_string());
    second_bundle.username = None;
    let second = db.upsert_credential(&second_bundle).await.unwrap();

    // Same row, new values, created_at preserved.
    assert_eq!(second.id, first.id);
    assert_eq!(second.created_at, first.created_at);
    assert!(second.updated_at > first.updated_at);
    assert_eq!(second.access_token, "second");
    assert_eq!(second.firstname.as_deref(), Some("Changed"));
    assert!(second.username.is_none(), "profile is overwritten wholesale");

    let stored = db.get_credential(42).await.unwrap();
    assert_eq!(stored.access_token, "second");
    assert_eq!(stored.updated_at, second.updated_at);
}

#[tokio::test]
async fn test_upsert_with_identical_values_still_touches_updated_at() {
    let db = common::test_db().await;
    let bundle = common::bundle(7, "same", 3600);

    let first = db.upsert_credential(&bundle).await.unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;
    let second = db.upsert_credential(&bundle).await.unwrap();

    assert!(second.updated_at > first.updated_at);
}

#[tokio::test]
async fn test_distinct_athletes_get_distinct_rows() {
    let db = common::test_db().await;

    let a = db.upsert_credential(&common::bundle(1, "a", 60)).await.unwrap();
    let b = db.upsert_credential(&common::bundle(2, "b", 60)).await.unwrap();

    assert_ne!(a.id, b.id);
    assert_eq!(db.get_credential(1).await.unwrap().access_token, "a");
    assert_eq!(db.get_credential(2).await.unwrap().access_token, "b");
}

#[tokio::test]
async fn test_get_after_delete_is_not_found() {
    let db = common::test_db().await;
    db.upsert_credential(&common::bundle(42, "abc", 3600))
        .await
        .unwrap();

    db.delete_credential(42).await.unwrap();

    assert!(matches!(
        db.get_credential(42).await,
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(
        db.delete_credential(42).await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_update_tokens() {
    let db = common::test_db().await;
    let original = db
        .upsert_credential(&common::bundle(42, "old", -60))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(5)).await;

    let new_expiry = chrono::DateTime::from_timestamp(1_900_000_000, 0).unwrap();
    db.update_tokens(42, "new-access", "new-refresh", new_expiry)
        .await
        .unwrap();

    let updated = db.get_credential(42).await.unwrap();
    assert_eq!(updated.access_token, "new-access");
    assert_eq!(updated.refresh_token, "new-refresh");
    assert_eq!(updated.expires_at, new_expiry);
    assert!(updated.updated_at > original.updated_at);
    // Profile fields are untouched by a token update.
    assert_eq!(updated.firstname, original.firstname);
    assert_eq!(updated.username, original.username);
}

#[tokio::test]
async fn test_update_tokens_for_missing_athlete_is_not_found() {
    let db = common::test_db().await;
    let expiry = chrono::Utc::now();

    let result = db.update_tokens(404, "a", "r", expiry).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn test_webhook_event_storage() {
    let db = common::test_db().await;
    let event: WebhookEvent = serde_json::from_value(json!({
        "object_type": "activity",
        "object_id": 12345678901_i64,
        "aspect_type": "update",
        "updates": {"title": "Evening Ride"},
        "owner_id": 42,
        "subscription_id": 777,
        "event_time": 1_700_000_000
    }))
    .unwrap();

    let id = db
        .insert_webhook_event(&event, event.event_time_utc().unwrap())
        .await
        .unwrap();

    let stored = db.get_webhook_event(id).await.unwrap().unwrap();
    assert_eq!(stored.object_type, "activity");
    assert_eq!(stored.object_id, 12345678901);
    assert_eq!(stored.aspect_type, "update");
    assert_eq!(stored.updates, json!({"title": "Evening Ride"}));
    assert_eq!(stored.owner_id, 42);
    assert_eq!(stored.subscription_id, Some(777));
    assert_eq!(stored.event_time.timestamp(), 1_700_000_000);
    assert!(!stored.processed);

    db.mark_event_processed(id).await.unwrap();
    assert!(db.get_webhook_event(id).await.unwrap().unwrap().processed);

    assert_eq!(db.count_webhook_events().await.unwrap(), 1);
    assert_eq!(db.webhook_events_for_owner(42).await.unwrap().len(), 1);
    assert!(db.webhook_events_for_owner(43).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_events_survive_credential_deletion() {
    let db = common::test_db().await;
    db.upsert_credential(&common::bundle(42, "abc", 3600))
        .await
        .unwrap();

    let event: WebhookEvent = serde_json::from_value(json!({
        "object_type": "activity",
        "object_id": 1,
        "aspect_type": "create",
        "owner_id": 42,
        "event_time": 1_700_000_000
    }))
    .unwrap();
    db.insert_webhook_event(&event, event.event_time_utc().unwrap())
        .await
        .unwrap();

    db.delete_credential(42).await.unwrap();

    assert_eq!(db.webhook_events_for_owner(42).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_closed_pool_reports_database_error() {
    let db = common::test_db().await;
    db.close().await;

    let result = db.upsert_credential(&common::bundle(1, "a", 60)).await;
    assert!(matches!(result, Err(AppError::Database(_))));
}

#[tokio::test]
async fn test_migrate_is_idempotent() {
    let db = common::test_db().await;
    db.upsert_credential(&common::bundle(5, "keep", 60))
        .await
        .unwrap();

    db.migrate().await.unwrap();

    assert_eq!(db.get_credential(5).await.unwrap().access_token, "keep");
}
