// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava credential model for storage and API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::time_utils::from_unix_seconds;

/// Stored OAuth credentials for one Strava athlete.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct StravaCredential {
    /// Surrogate row ID
    pub id: i64,
    pub access_token: String,
    pub refresh_token: String,
    /// When the access token stops working
    pub expires_at: DateTime<Utc>,
    /// Strava athlete ID (unique)
    pub athlete_id: i64,
    pub username: Option<String>,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    /// Avatar URL
    pub profile: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StravaCredential {
    /// Whether the access token has expired as of `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Everything needed to insert or overwrite a credential record.
#[derive(Debug, Clone)]
pub struct CredentialBundle {
    pub athlete_id: i64,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub username: Option<String>,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub profile: Option<String>,
}

/// Body of `POST /api/auth/strava/connect`: the token exchange result the
/// client obtained from Strava.
#[derive(Debug, Deserialize, Validate)]
pub struct ConnectRequest {
    #[validate(length(min = 1, message = "access_token must not be empty"))]
    pub access_token: String,
    #[validate(length(min = 1, message = "refresh_token must not be empty"))]
    pub refresh_token: String,
    /// Unix seconds
    pub expires_at: i64,
    #[validate(nested)]
    pub athlete: ConnectAthlete,
}

/// Athlete summary nested in the connect request.
#[derive(Debug, Deserialize, Validate)]
pub struct ConnectAthlete {
    #[validate(range(min = 1, message = "athlete id must be positive"))]
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub firstname: Option<String>,
    #[serde(default)]
    pub lastname: Option<String>,
    #[serde(default)]
    pub profile_medium: Option<String>,
}

impl ConnectRequest {
    /// Convert into a storable bundle, or `None` if `expires_at` is not a
    /// representable timestamp.
    pub fn into_bundle(self) -> Option<CredentialBundle> {
        let expires_at = from_unix_seconds(self.expires_at)?;
        Some(CredentialBundle {
            athlete_id: self.athlete.id,
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            username: self.athlete.username,
            firstname: self.athlete.firstname,
            lastname: self.athlete.lastname,
            profile: self.athlete.profile_medium,
        })
    }
}
