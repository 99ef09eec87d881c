// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod credential;
pub mod webhook;

pub use credential::{ConnectRequest, CredentialBundle, StravaCredential};
pub use webhook::{
    ActivityUpdates, AspectType, AthleteUpdates, EventKind, ObjectType, WebhookEvent,
    WebhookEventRecord,
};
