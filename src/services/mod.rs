// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod events;
pub mod strava;
pub mod tasks;

pub use events::{EventOutcome, EventProcessor};
pub use strava::{PushSubscription, StravaClient, StravaService, TokenRefreshResponse};
pub use tasks::{ClassifyEventPayload, QueueError, TasksService};
