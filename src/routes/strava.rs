// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava API pass-through routes.

use crate::error::Result;
use crate::routes::parse_athlete_id;
use crate::AppState;
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/strava/activities/{athlete_id}", get(get_activities))
        .route(
            "/api/strava/refresh-token/{athlete_id}",
            post(refresh_token),
        )
}

/// Athlete's activities exactly as Strava returned them.
///
/// 401 once the stored token has expired; the client must call
/// refresh-token first.
async fn get_activities(
    State(state): State<Arc<AppState>>,
    Path(athlete_id): Path<String>,
) -> Result<Json<Vec<serde_json::Value>>> {
    let athlete_id = parse_athlete_id(&athlete_id)?;
    let activities = state.strava_service.activities_for(athlete_id).await?;

    tracing::debug!(athlete_id, count = activities.len(), "Fetched activities");
    Ok(Json(activities))
}

#[derive(Serialize)]
pub struct RefreshResponse {
    pub message: String,
    pub access_token: String,
    /// Unix seconds, as Strava sent it
    pub expires_at: i64,
}

/// Refresh an athlete's tokens with Strava and store them.
async fn refresh_token(
    State(state): State<Arc<AppState>>,
    Path(athlete_id): Path<String>,
) -> Result<Json<RefreshResponse>> {
    let athlete_id = parse_athlete_id(&athlete_id)?;
    let tokens = state.strava_service.refresh_for(athlete_id).await?;

    Ok(Json(RefreshResponse {
        message: "Token refreshed successfully".to_string(),
        access_token: tokens.access_token,
        expires_at: tokens.expires_at,
    }))
}
