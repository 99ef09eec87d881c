// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava connection routes: store, fetch and remove an athlete's
//! credentials.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::{delete, get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use validator::Validate;

use crate::error::{AppError, Result};
use crate::models::{ConnectRequest, StravaCredential};
use crate::routes::{json_body, parse_athlete_id};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/auth/strava/connect", post(connect))
        .route("/api/auth/strava/user/{athlete_id}", get(get_user))
        .route(
            "/api/auth/strava/disconnect/{athlete_id}",
            delete(disconnect),
        )
}

#[derive(Serialize)]
pub struct ConnectResponse {
    pub message: String,
    pub user: StravaCredential,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Store the tokens the client obtained from Strava's OAuth exchange.
async fn connect(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<ConnectRequest>, JsonRejection>,
) -> Result<Json<ConnectResponse>> {
    let request = json_body(payload)?;
    request
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let bundle = request
        .into_bundle()
        .ok_or_else(|| AppError::BadRequest("expires_at is out of range".to_string()))?;

    let user = state.db.upsert_credential(&bundle).await?;

    tracing::info!(
        athlete_id = user.athlete_id,
        user_id = user.id,
        "Strava account connected"
    );

    Ok(Json(ConnectResponse {
        message: "Successfully connected to Strava".to_string(),
        user,
    }))
}

/// Get the stored record for an athlete.
async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(athlete_id): Path<String>,
) -> Result<Json<StravaCredential>> {
    let athlete_id = parse_athlete_id(&athlete_id)?;
    let user = state.db.get_credential(athlete_id).await?;
    Ok(Json(user))
}

/// Forget an athlete's credentials.
async fn disconnect(
    State(state): State<Arc<AppState>>,
    Path(athlete_id): Path<String>,
) -> Result<Json<MessageResponse>> {
    let athlete_id = parse_athlete_id(&athlete_id)?;
    state.db.delete_credential(athlete_id).await?;

    tracing::info!(athlete_id, "Strava account disconnected");

    Ok(Json(MessageResponse {
        message: "Successfully disconnected from Strava".to_string(),
    }))
}
