// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Classification of stored webhook events.
//!
//! Activity events are only logged. An athlete update that revokes our
//! access removes that athlete's stored credentials. Everything else is
//! ignored.

use crate::db::Database;
use crate::error::AppError;
use crate::models::{AspectType, EventKind, WebhookEvent};

/// What classifying one event did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    /// Activity event, logged only.
    ActivityLogged(AspectType),
    /// Athlete revoked access; `removed` is false when no credentials were
    /// stored for them.
    AthleteDeauthorized { removed: bool },
    /// Nothing to do for this event.
    Ignored,
    /// Classification hit an error (already logged).
    Failed,
}

/// Classifies webhook events and applies their side effects.
#[derive(Clone)]
pub struct EventProcessor {
    db: Database,
}

impl EventProcessor {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Classify one event. Errors are logged and reported as
    /// `EventOutcome::Failed`, never returned.
    pub async fn process(&self, event: &WebhookEvent) -> EventOutcome {
        match event.kind() {
            EventKind::Activity { aspect, updates } => {
                match &aspect {
                    AspectType::Create => {
                        tracing::info!(
                            activity_id = event.object_id,
                            athlete_id = event.owner_id,
                            "Activity created"
                        );
                    }
                    AspectType::Update => {
                        tracing::info!(
                            activity_id = event.object_id,
                            athlete_id = event.owner_id,
                            title = ?updates.title,
                            activity_type = ?updates.activity_type,
                            private = ?updates.private,
                            "Activity updated"
                        );
                    }
                    AspectType::Delete => {
                        tracing::info!(
                            activity_id = event.object_id,
                            athlete_id = event.owner_id,
                            "Activity deleted"
                        );
                    }
                    AspectType::Other(other) => {
                        tracing::debug!(
                            activity_id = event.object_id,
                            aspect_type = %other,
                            "Unknown activity aspect"
                        );
                    }
                }
                EventOutcome::ActivityLogged(aspect)
            }
            EventKind::Athlete {
                aspect: AspectType::Update,
                updates,
            } if updates.is_deauthorization() => self.deauthorize(event.owner_id).await,
            EventKind::Athlete { aspect, .. } => {
                tracing::debug!(
                    athlete_id = event.owner_id,
                    aspect_type = %aspect,
                    "Athlete event without deauthorization, ignoring"
                );
                EventOutcome::Ignored
            }
            EventKind::Other {
                object_type,
                aspect,
            } => {
                tracing::debug!(
                    object_type = %object_type,
                    aspect_type = %aspect,
                    "Ignoring unhandled event type"
                );
                EventOutcome::Ignored
            }
        }
    }

    /// Remove the credentials of an athlete who revoked access.
    async fn deauthorize(&self, athlete_id: i64) -> EventOutcome {
        match self.db.delete_credential(athlete_id).await {
            Ok(()) => {
                tracing::info!(athlete_id, "Athlete deauthorized, credentials removed");
                EventOutcome::AthleteDeauthorized { removed: true }
            }
            Err(AppError::NotFound(_)) => {
                tracing::info!(athlete_id, "Athlete deauthorized, no stored credentials");
                EventOutcome::AthleteDeauthorized { removed: false }
            }
            Err(e) => {
                tracing::error!(error = %e, athlete_id, "Failed to remove deauthorized athlete");
                EventOutcome::Failed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CredentialBundle;
    use chrono::Utc;
    use serde_json::json;

    async fn test_db() -> Database {
        Database::new("sqlite::memory:").await.unwrap()
    }

    async fn store_athlete(db: &Database, athlete_id: i64) {
        db.upsert_credential(&CredentialBundle {
            athlete_id,
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            expires_at: Utc::now(),
            username: None,
            firstname: Some("Test".to_string()),
            lastname: None,
            profile: None,
        })
        .await
        .unwrap();
    }

    fn event(body: serde_json::Value) -> WebhookEvent {
        serde_json::from_value(body).unwrap()
    }

    #[tokio::test]
    async fn test_deauthorization_removes_credentials() {
        let db = test_db().await;
        store_athlete(&db, 42).await;
        let processor = EventProcessor::new(db.clone());

        let outcome = processor
            .process(&event(json!({
                "object_type": "athlete",
                "object_id": 42,
                "aspect_type": "update",
                "updates": {"authorized": "false"},
                "owner_id": 42,
                "event_time": 1_700_000_000
            })))
            .await;

        assert_eq!(outcome, EventOutcome::AthleteDeauthorized { removed: true });
        assert!(matches!(
            db.get_credential(42).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_deauthorization_without_credentials() {
        let processor = EventProcessor::new(test_db().await);

        let outcome = processor
            .process(&event(json!({
                "object_type": "athlete",
                "object_id": 7,
                "aspect_type": "update",
                "updates": {"authorized": false},
                "owner_id": 7,
                "event_time": 1_700_000_000
            })))
            .await;

        assert_eq!(outcome, EventOutcome::AthleteDeauthorized { removed: false });
    }

    #[tokio::test]
    async fn test_athlete_update_without_key_keeps_credentials() {
        let db = test_db().await;
        store_athlete(&db, 42).await;
        let processor = EventProcessor::new(db.clone());

        let outcome = processor
            .process(&event(json!({
                "object_type": "athlete",
                "object_id": 42,
                "aspect_type": "update",
                "updates": {"firstname": "New"},
                "owner_id": 42,
                "event_time": 1_700_000_000
            })))
            .await;

        assert_eq!(outcome, EventOutcome::Ignored);
        assert!(db.get_credential(42).await.is_ok());
    }

    #[tokio::test]
    async fn test_activity_events_do_not_touch_store() {
        let db = test_db().await;
        store_athlete(&db, 5).await;
        let processor = EventProcessor::new(db.clone());

        for aspect in ["create", "update", "delete"] {
            let outcome = processor
                .process(&event(json!({
                    "object_type": "activity",
                    "object_id": 1234,
                    "aspect_type": aspect,
                    "owner_id": 5,
                    "event_time": 1_700_000_000
                })))
                .await;
            assert_eq!(
                outcome,
                EventOutcome::ActivityLogged(AspectType::from(aspect.to_string()))
            );
        }

        assert!(db.get_credential(5).await.is_ok());
    }

    #[tokio::test]
    async fn test_storage_failure_is_swallowed() {
        let db = test_db().await;
        let processor = EventProcessor::new(db.clone());
        db.close().await;

        let outcome = processor
            .process(&event(json!({
                "object_type": "athlete",
                "object_id": 1,
                "aspect_type": "update",
                "updates": {"authorized": "false"},
                "owner_id": 1,
                "event_time": 1
            })))
            .await;

        assert_eq!(outcome, EventOutcome::Failed);
    }
}
