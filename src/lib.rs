// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Rundown backend: brokers Strava OAuth credentials for the Rundown app.
//!
//! This crate stores per-athlete Strava tokens, forwards a few Strava API
//! calls on the athlete's behalf, and receives Strava webhook events.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::Database;
use services::{StravaClient, StravaService, TasksService};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: Database,
    pub strava_service: StravaService,
    pub tasks_service: TasksService,
}

impl AppState {
    /// Wire up services over an open database. Spawns the webhook worker,
    /// so it must run inside a Tokio runtime.
    pub fn new(config: Config, db: Database) -> Self {
        let strava_service = StravaService::new(StravaClient::new(&config), db.clone());
        let tasks_service = TasksService::start(db.clone(), config.webhook_queue_capacity);

        Self {
            config,
            db,
            strava_service,
            tasks_service,
        }
    }
}
