// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! SQLite client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Strava credentials (upsert, lookup, token rotation, removal)
//! - Webhook events (append-only audit rows)
//!
//! Every operation is a single auto-committed statement.

use crate::error::AppError;
use crate::models::{CredentialBundle, StravaCredential, WebhookEvent, WebhookEventRecord};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;

const MAX_CONNECTIONS: u32 = 10;

const CREDENTIAL_COLUMNS: &str = "id, access_token, refresh_token, expires_at, athlete_id, \
     username, firstname, lastname, profile, created_at, updated_at";

const EVENT_COLUMNS: &str = "id, object_type, object_id, aspect_type, updates, owner_id, \
     subscription_id, event_time, processed, created_at";

/// SQLite database client.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connect to the database and create tables if they are missing.
    ///
    /// `sqlite::memory:` gets a single long-lived connection, since every
    /// connection to an in-memory database sees its own empty database.
    pub async fn new(database_url: &str) -> Result<Self, AppError> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| AppError::Database(format!("Invalid database URL: {}", e)))?
            .create_if_missing(true);

        let in_memory = database_url.contains(":memory:");
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(MAX_CONNECTIONS)
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to database: {}", e)))?;

        let db = Self { pool };
        db.migrate().await?;

        tracing::info!(in_memory, "Connected to database");
        Ok(db)
    }

    /// Create tables and indexes if absent.
    pub async fn migrate(&self) -> Result<(), AppError> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS strava_users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                access_token TEXT NOT NULL,
                refresh_token TEXT NOT NULL,
                expires_at TEXT NOT NULL,
                athlete_id INTEGER NOT NULL UNIQUE,
                username TEXT,
                firstname TEXT,
                lastname TEXT,
                profile TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_strava_users_athlete_id ON strava_users(athlete_id)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS webhook_events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                object_type TEXT NOT NULL,
                object_id INTEGER NOT NULL,
                aspect_type TEXT NOT NULL,
                updates TEXT NOT NULL,
                owner_id INTEGER NOT NULL,
                subscription_id INTEGER,
                event_time TEXT NOT NULL,
                processed INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_webhook_events_owner_id ON webhook_events(owner_id)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_webhook_events_processed ON webhook_events(processed)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Close every pooled connection. Later operations fail with
    /// `AppError::Database`.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    // ─── Credential Operations ───────────────────────────────────

    /// Insert a credential record, or overwrite every non-key field of the
    /// existing one for the same athlete.
    pub async fn upsert_credential(
        &self,
        bundle: &CredentialBundle,
    ) -> Result<StravaCredential, AppError> {
        let now = Utc::now();
        let sql = format!(
            r"
            INSERT INTO strava_users (
                access_token, refresh_token, expires_at, athlete_id,
                username, firstname, lastname, profile, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (athlete_id) DO UPDATE SET
                access_token = excluded.access_token,
                refresh_token = excluded.refresh_token,
                expires_at = excluded.expires_at,
                username = excluded.username,
                firstname = excluded.firstname,
                lastname = excluded.lastname,
                profile = excluded.profile,
                updated_at = excluded.updated_at
            RETURNING {CREDENTIAL_COLUMNS}
            "
        );

        let credential = sqlx::query_as::<_, StravaCredential>(&sql)
            .bind(&bundle.access_token)
            .bind(&bundle.refresh_token)
            .bind(bundle.expires_at)
            .bind(bundle.athlete_id)
            .bind(&bundle.username)
            .bind(&bundle.firstname)
            .bind(&bundle.lastname)
            .bind(&bundle.profile)
            .bind(now)
            .bind(now)
            .fetch_one(&self.pool)
            .await?;

        Ok(credential)
    }

    /// Get the credential record for an athlete.
    pub async fn get_credential(&self, athlete_id: i64) -> Result<StravaCredential, AppError> {
        let sql = format!("SELECT {CREDENTIAL_COLUMNS} FROM strava_users WHERE athlete_id = ?");

        sqlx::query_as::<_, StravaCredential>(&sql)
            .bind(athlete_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", athlete_id)))
    }

    /// Delete the credential record for an athlete.
    pub async fn delete_credential(&self, athlete_id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM strava_users WHERE athlete_id = ?")
            .bind(athlete_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User {} not found", athlete_id)));
        }
        Ok(())
    }

    /// Replace the token triple after a refresh.
    ///
    /// Reports `NotFound` when no record matches, like the other mutating
    /// operations.
    pub async fn update_tokens(
        &self,
        athlete_id: i64,
        access_token: &str,
        refresh_token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let result = sqlx::query(
            r"
            UPDATE strava_users
            SET access_token = ?, refresh_token = ?, expires_at = ?, updated_at = ?
            WHERE athlete_id = ?
            ",
        )
        .bind(access_token)
        .bind(refresh_token)
        .bind(expires_at)
        .bind(Utc::now())
        .bind(athlete_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User {} not found", athlete_id)));
        }
        Ok(())
    }

    // ─── Webhook Event Operations ────────────────────────────────

    /// Append a webhook event and return its row ID.
    pub async fn insert_webhook_event(
        &self,
        event: &WebhookEvent,
        event_time: DateTime<Utc>,
    ) -> Result<i64, AppError> {
        let updates = serde_json::to_string(&event.updates)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to encode updates: {}", e)))?;

        let result = sqlx::query(
            r"
            INSERT INTO webhook_events (
                object_type, object_id, aspect_type, updates, owner_id,
                subscription_id, event_time, processed, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, 0, ?)
            ",
        )
        .bind(event.object_type.as_str())
        .bind(event.object_id)
        .bind(event.aspect_type.as_str())
        .bind(updates)
        .bind(event.owner_id)
        .bind(event.subscription_id)
        .bind(event_time)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Flag an event as classified.
    pub async fn mark_event_processed(&self, event_id: i64) -> Result<(), AppError> {
        sqlx::query("UPDATE webhook_events SET processed = 1 WHERE id = ?")
            .bind(event_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Get a stored webhook event by row ID.
    pub async fn get_webhook_event(
        &self,
        event_id: i64,
    ) -> Result<Option<WebhookEventRecord>, AppError> {
        let sql = format!("SELECT {EVENT_COLUMNS} FROM webhook_events WHERE id = ?");

        let row = sqlx::query(&sql)
            .bind(event_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| Self::row_to_event(&r)).transpose()
    }

    /// All stored events for an athlete, oldest first.
    pub async fn webhook_events_for_owner(
        &self,
        owner_id: i64,
    ) -> Result<Vec<WebhookEventRecord>, AppError> {
        let sql =
            format!("SELECT {EVENT_COLUMNS} FROM webhook_events WHERE owner_id = ? ORDER BY id");

        let rows = sqlx::query(&sql)
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(Self::row_to_event).collect()
    }

    /// Total number of stored webhook events.
    pub async fn count_webhook_events(&self) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM webhook_events")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    fn row_to_event(row: &SqliteRow) -> Result<WebhookEventRecord, AppError> {
        let updates: String = row.try_get("updates")?;
        let updates = serde_json::from_str(&updates)
            .map_err(|e| AppError::Database(format!("Corrupt updates column: {}", e)))?;

        Ok(WebhookEventRecord {
            id: row.try_get("id")?,
            object_type: row.try_get("object_type")?,
            object_id: row.try_get("object_id")?,
            aspect_type: row.try_get("aspect_type")?,
            updates,
            owner_id: row.try_get("owner_id")?,
            subscription_id: row.try_get("subscription_id")?,
            event_time: row.try_get("event_time")?,
            processed: row.try_get("processed")?,
            created_at: row.try_get("created_at")?,
        })
    }
}
