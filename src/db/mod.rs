// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer (SQLite via sqlx).
//!
//! Two tables:
//! - `strava_users`: OAuth credentials, one row per Strava athlete
//! - `webhook_events`: append-only audit trail of received webhook events

pub mod sqlite;

pub use sqlite::Database;
