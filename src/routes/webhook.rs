// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Webhook routes for Strava events and push subscription management.

use crate::error::{AppError, Result};
use crate::models::WebhookEvent;
use crate::routes::json_body;
use crate::services::tasks::ClassifyEventPayload;
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, Json, Query, State},
    routing::{delete, get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use subtle::ConstantTimeEq;

/// Webhook routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/webhooks/strava", get(verify).post(handle_event))
        .route("/api/webhooks/strava/subscribe", post(subscribe))
        .route("/api/webhooks/strava/unsubscribe", delete(unsubscribe))
        .route("/api/webhooks/strava/subscriptions", get(list_subscriptions))
}

/// Strava webhook verification query params.
#[derive(Deserialize)]
struct VerifyParams {
    #[serde(rename = "hub.mode")]
    mode: Option<String>,
    #[serde(rename = "hub.challenge")]
    challenge: Option<String>,
    #[serde(rename = "hub.verify_token")]
    verify_token: Option<String>,
}

/// Verification response.
#[derive(Serialize)]
pub struct VerifyResponse {
    #[serde(rename = "hub.challenge")]
    pub challenge: String,
}

/// Constant-time comparison of the presented verify token.
fn verify_token_matches(presented: &str, expected: &str) -> bool {
    presented.as_bytes().ct_eq(expected.as_bytes()).into()
}

/// Verify webhook subscription (GET).
async fn verify(
    State(state): State<Arc<AppState>>,
    Query(params): Query<VerifyParams>,
) -> Result<Json<VerifyResponse>> {
    let mode_ok = params.mode.as_deref() == Some("subscribe");
    let token_ok = params
        .verify_token
        .as_deref()
        .is_some_and(|t| verify_token_matches(t, &state.config.webhook_verify_token));

    match params.challenge {
        Some(challenge) if mode_ok && token_ok => {
            tracing::info!("Webhook subscription verified");
            Ok(Json(VerifyResponse { challenge }))
        }
        _ => {
            tracing::warn!(
                mode = ?params.mode,
                token_ok,
                "Webhook verification failed"
            );
            Err(AppError::Forbidden)
        }
    }
}

#[derive(Serialize)]
pub struct EventAck {
    pub status: String,
    pub event_id: i64,
}

/// Handle incoming webhook events (POST).
///
/// The event is stored, acknowledged, and classified afterwards by the task
/// queue.
async fn handle_event(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<Json<EventAck>> {
    let payload = json_body(payload)?;
    tracing::debug!(payload = %payload, "Webhook event received (raw)");

    let event: WebhookEvent = serde_json::from_value(payload).map_err(|e| {
        tracing::warn!(error = %e, "Failed to parse webhook event");
        AppError::BadRequest(format!("Invalid webhook event: {}", e))
    })?;

    let event_time = event
        .event_time_utc()
        .ok_or_else(|| AppError::BadRequest("event_time is out of range".to_string()))?;

    let event_id = state.db.insert_webhook_event(&event, event_time).await?;

    tracing::info!(
        event_id,
        object_type = %event.object_type,
        object_id = event.object_id,
        aspect_type = %event.aspect_type,
        owner_id = event.owner_id,
        "Webhook event stored"
    );

    // Strava gets its acknowledgement even when the event cannot be queued.
    if let Err(e) = state
        .tasks_service
        .queue_event(ClassifyEventPayload { event_id, event })
    {
        tracing::debug!(error = %e, event_id, "Classification skipped");
    }

    Ok(Json(EventAck {
        status: "received".to_string(),
        event_id,
    }))
}

#[derive(Deserialize)]
struct SubscribeParams {
    callback_url: Option<String>,
}

#[derive(Serialize)]
pub struct SubscribeResponse {
    pub message: String,
    pub subscription_id: i64,
    pub callback_url: String,
}

/// Register our webhook endpoint with Strava.
async fn subscribe(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SubscribeParams>,
) -> Result<Json<SubscribeResponse>> {
    let callback_url = params
        .callback_url
        .filter(|url| !url.trim().is_empty())
        .or_else(|| state.config.webhook_callback_url.clone())
        .ok_or_else(|| AppError::BadRequest("callback_url is required".to_string()))?;

    let subscription = state
        .strava_service
        .subscribe(&callback_url, &state.config.webhook_verify_token)
        .await?;

    Ok(Json(SubscribeResponse {
        message: "Webhook subscription created".to_string(),
        subscription_id: subscription.id,
        callback_url,
    }))
}

#[derive(Deserialize)]
struct UnsubscribeParams {
    subscription_id: Option<String>,
}

#[derive(Serialize)]
pub struct UnsubscribeResponse {
    pub message: String,
}

/// Remove a Strava webhook subscription.
async fn unsubscribe(
    State(state): State<Arc<AppState>>,
    Query(params): Query<UnsubscribeParams>,
) -> Result<Json<UnsubscribeResponse>> {
    let subscription_id = params
        .subscription_id
        .as_deref()
        .and_then(|id| id.trim().parse::<i64>().ok())
        .ok_or_else(|| {
            AppError::BadRequest("subscription_id must be a numeric ID".to_string())
        })?;

    state.strava_service.unsubscribe(subscription_id).await?;

    Ok(Json(UnsubscribeResponse {
        message: "Webhook subscription deleted".to_string(),
    }))
}

/// Subscriptions Strava has on file for this client.
async fn list_subscriptions(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<serde_json::Value>>> {
    let subscriptions = state.strava_service.subscriptions().await?;
    Ok(Json(subscriptions))
}
