// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava API client and the service that ties it to stored credentials.
//!
//! Handles:
//! - Listing an athlete's activities (opaque pass-through)
//! - Refreshing an access token
//! - Creating, deleting and listing webhook push subscriptions
//!
//! Every call is a single request; nothing is retried.

use crate::config::Config;
use crate::db::Database;
use crate::error::AppError;
use crate::time_utils::{format_utc_rfc3339, from_unix_seconds};
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

/// Strava API client.
#[derive(Clone)]
pub struct StravaClient {
    http: reqwest::Client,
    api_url: String,
    oauth_url: String,
    client_id: String,
    client_secret: String,
}

impl StravaClient {
    /// Create a new Strava client from the application config.
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: config.strava_api_url.trim_end_matches('/').to_string(),
            oauth_url: config.strava_oauth_url.trim_end_matches('/').to_string(),
            client_id: config.strava_client_id.clone(),
            client_secret: config.strava_client_secret.clone(),
        }
    }

    /// List the authenticated athlete's activities.
    ///
    /// The activity objects are returned as Strava sent them.
    pub async fn list_activities(
        &self,
        access_token: &str,
    ) -> Result<Vec<serde_json::Value>, AppError> {
        let url = format!("{}/athlete/activities", self.api_url);

        let response = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AppError::StravaApi(format!("Activities request failed: {}", e)))?;

        // Only 200 carries the activity list.
        let status = response.status();
        if status.is_success() && status != StatusCode::OK {
            tracing::warn!(status = %status, "Unexpected status listing activities");
            return Err(AppError::Upstream {
                status,
                message: "Failed to fetch activities from Strava".to_string(),
            });
        }

        self.check_response_json(response, "Failed to fetch activities from Strava")
            .await
    }

    /// Exchange a refresh token for a new token pair.
    pub async fn refresh_token(
        &self,
        refresh_token: &str,
    ) -> Result<TokenRefreshResponse, AppError> {
        let body = RefreshRequest {
            client_id: &self.client_id,
            client_secret: &self.client_secret,
            refresh_token,
            grant_type: "refresh_token",
        };

        let response = self
            .http
            .post(format!("{}/token", self.oauth_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::StravaApi(format!("Token refresh request failed: {}", e)))?;

        self.check_response_json(response, "Failed to refresh token with Strava")
            .await
    }

    /// Register a webhook push subscription. Only `201 Created` counts as
    /// success.
    pub async fn create_subscription(
        &self,
        callback_url: &str,
        verify_token: &str,
    ) -> Result<PushSubscription, AppError> {
        let response = self
            .http
            .post(format!("{}/push_subscriptions", self.api_url))
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("callback_url", callback_url),
                ("verify_token", verify_token),
            ])
            .send()
            .await
            .map_err(|e| AppError::StravaApi(format!("Subscription request failed: {}", e)))?;

        let status = response.status();
        if status != StatusCode::CREATED {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(
                status = %status,
                body = %body,
                callback_url,
                "Strava rejected webhook subscription"
            );
            return Err(AppError::Upstream {
                status,
                message: "Failed to create webhook subscription".to_string(),
            });
        }

        response
            .json()
            .await
            .map_err(|e| AppError::StravaApi(format!("JSON parse error: {}", e)))
    }

    /// Remove a webhook push subscription. Only `204 No Content` counts as
    /// success.
    pub async fn delete_subscription(&self, subscription_id: i64) -> Result<(), AppError> {
        let response = self
            .http
            .delete(format!(
                "{}/push_subscriptions/{}",
                self.api_url, subscription_id
            ))
            .query(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AppError::StravaApi(format!("Unsubscribe request failed: {}", e)))?;

        let status = response.status();
        if status != StatusCode::NO_CONTENT {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(
                status = %status,
                body = %body,
                subscription_id,
                "Strava rejected webhook unsubscribe"
            );
            return Err(AppError::Upstream {
                status,
                message: "Failed to delete webhook subscription".to_string(),
            });
        }

        Ok(())
    }

    /// List the webhook subscriptions registered for this client.
    pub async fn list_subscriptions(&self) -> Result<Vec<serde_json::Value>, AppError> {
        let response = self
            .http
            .get(format!("{}/push_subscriptions", self.api_url))
            .query(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AppError::StravaApi(format!("Subscription list request failed: {}", e)))?;

        self.check_response_json(response, "Failed to list webhook subscriptions")
            .await
    }

    /// Check response status and parse the JSON body.
    ///
    /// Non-success statuses become `AppError::Upstream` carrying Strava's
    /// status and `message`; the body is only logged.
    async fn check_response_json<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
        message: &str,
    ) -> Result<T, AppError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if status == StatusCode::TOO_MANY_REQUESTS {
                tracing::warn!("Strava rate limit hit (429)");
            } else {
                tracing::warn!(status = %status, body = %body, "Strava request failed");
            }
            return Err(AppError::Upstream {
                status,
                message: message.to_string(),
            });
        }

        response
            .json()
            .await
            .map_err(|e| AppError::StravaApi(format!("JSON parse error: {}", e)))
    }
}

/// Token refresh request body.
#[derive(Serialize)]
struct RefreshRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    refresh_token: &'a str,
    grant_type: &'a str,
}

/// Token refresh response from Strava.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenRefreshResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Unix seconds
    pub expires_at: i64,
}

impl TokenRefreshResponse {
    pub fn expires_at_utc(&self) -> Option<DateTime<Utc>> {
        from_unix_seconds(self.expires_at)
    }
}

/// Subscription created by Strava.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PushSubscription {
    pub id: i64,
}

// ─────────────────────────────────────────────────────────────────────────────
// StravaService - client calls backed by stored credentials
// ─────────────────────────────────────────────────────────────────────────────

/// High-level Strava service: looks up an athlete's credentials, then calls
/// the client on their behalf.
///
/// Expired access tokens are reported, never refreshed implicitly; refresh
/// is a separate, caller-triggered operation.
#[derive(Clone)]
pub struct StravaService {
    client: StravaClient,
    db: Database,
}

impl StravaService {
    pub fn new(client: StravaClient, db: Database) -> Self {
        Self { client, db }
    }

    /// Fetch an athlete's activities with their stored access token.
    ///
    /// Fails with `TokenExpired` (without contacting Strava) once the stored
    /// expiry has passed.
    pub async fn activities_for(
        &self,
        athlete_id: i64,
    ) -> Result<Vec<serde_json::Value>, AppError> {
        let credential = self.db.get_credential(athlete_id).await?;

        if credential.is_expired_at(Utc::now()) {
            tracing::info!(
                athlete_id,
                expired_at = %format_utc_rfc3339(credential.expires_at),
                "Access token expired, refresh required"
            );
            return Err(AppError::TokenExpired {
                expired_at: credential.expires_at,
            });
        }

        self.client.list_activities(&credential.access_token).await
    }

    /// Refresh an athlete's tokens with Strava and store the new pair.
    pub async fn refresh_for(&self, athlete_id: i64) -> Result<TokenRefreshResponse, AppError> {
        let credential = self.db.get_credential(athlete_id).await?;

        let tokens = self.client.refresh_token(&credential.refresh_token).await?;
        let expires_at = tokens.expires_at_utc().ok_or_else(|| {
            AppError::StravaApi(format!(
                "Strava returned an invalid expires_at: {}",
                tokens.expires_at
            ))
        })?;

        self.db
            .update_tokens(
                athlete_id,
                &tokens.access_token,
                &tokens.refresh_token,
                expires_at,
            )
            .await?;

        tracing::info!(
            athlete_id,
            expires_at = %format_utc_rfc3339(expires_at),
            "Tokens refreshed and stored"
        );
        Ok(tokens)
    }

    /// Register the webhook callback with Strava.
    pub async fn subscribe(
        &self,
        callback_url: &str,
        verify_token: &str,
    ) -> Result<PushSubscription, AppError> {
        let subscription = self
            .client
            .create_subscription(callback_url, verify_token)
            .await?;
        tracing::info!(
            subscription_id = subscription.id,
            callback_url,
            "Webhook subscription created"
        );
        Ok(subscription)
    }

    /// Remove a webhook subscription.
    pub async fn unsubscribe(&self, subscription_id: i64) -> Result<(), AppError> {
        self.client.delete_subscription(subscription_id).await?;
        tracing::info!(subscription_id, "Webhook subscription deleted");
        Ok(())
    }

    /// List webhook subscriptions registered for this client.
    pub async fn subscriptions(&self) -> Result<Vec<serde_json::Value>, AppError> {
        self.client.list_subscriptions().await
    }
}
