// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava webhook event model.
//!
//! Strava pushes `{object_type, object_id, aspect_type, updates, owner_id,
//! subscription_id, event_time}`. The `updates` object is free-form; the
//! fields we understand are lifted into typed structs by [`WebhookEvent::kind`]
//! and everything else is carried along untouched.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::time_utils::from_unix_seconds;

/// Kind of object an event refers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ObjectType {
    Activity,
    Athlete,
    /// Anything Strava may add later, kept verbatim.
    Other(String),
}

impl ObjectType {
    pub fn as_str(&self) -> &str {
        match self {
            ObjectType::Activity => "activity",
            ObjectType::Athlete => "athlete",
            ObjectType::Other(s) => s,
        }
    }
}

impl From<String> for ObjectType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "activity" => ObjectType::Activity,
            "athlete" => ObjectType::Athlete,
            _ => ObjectType::Other(s),
        }
    }
}

impl From<ObjectType> for String {
    fn from(t: ObjectType) -> Self {
        t.as_str().to_string()
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Nature of the change an event reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AspectType {
    Create,
    Update,
    Delete,
    Other(String),
}

impl AspectType {
    pub fn as_str(&self) -> &str {
        match self {
            AspectType::Create => "create",
            AspectType::Update => "update",
            AspectType::Delete => "delete",
            AspectType::Other(s) => s,
        }
    }
}

impl From<String> for AspectType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "create" => AspectType::Create,
            "update" => AspectType::Update,
            "delete" => AspectType::Delete,
            _ => AspectType::Other(s),
        }
    }
}

impl From<AspectType> for String {
    fn from(t: AspectType) -> Self {
        t.as_str().to_string()
    }
}

impl fmt::Display for AspectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strava webhook event payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEvent {
    pub object_type: ObjectType,
    pub object_id: i64,
    pub aspect_type: AspectType,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub updates: Map<String, Value>,
    /// Strava athlete ID of the subject
    pub owner_id: i64,
    #[serde(default)]
    pub subscription_id: Option<i64>,
    /// Unix seconds
    pub event_time: i64,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Map<String, Value>>::deserialize(deserializer)?.unwrap_or_default())
}

impl WebhookEvent {
    /// Absolute event time, if `event_time` is representable.
    pub fn event_time_utc(&self) -> Option<DateTime<Utc>> {
        from_unix_seconds(self.event_time)
    }

    /// Classify the event into one of the shapes Strava documents.
    pub fn kind(&self) -> EventKind {
        match &self.object_type {
            ObjectType::Activity => EventKind::Activity {
                aspect: self.aspect_type.clone(),
                updates: ActivityUpdates::from_map(&self.updates),
            },
            ObjectType::Athlete => EventKind::Athlete {
                aspect: self.aspect_type.clone(),
                updates: AthleteUpdates::from_map(&self.updates),
            },
            ObjectType::Other(object_type) => EventKind::Other {
                object_type: object_type.clone(),
                aspect: self.aspect_type.clone(),
            },
        }
    }
}

/// Typed view of a webhook event.
#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    Activity {
        aspect: AspectType,
        updates: ActivityUpdates,
    },
    Athlete {
        aspect: AspectType,
        updates: AthleteUpdates,
    },
    Other {
        object_type: String,
        aspect: AspectType,
    },
}

/// Fields Strava sends in `updates` for activity events.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActivityUpdates {
    pub title: Option<String>,
    pub activity_type: Option<String>,
    pub private: Option<bool>,
    /// Unrecognized keys
    pub extra: Map<String, Value>,
}

impl ActivityUpdates {
    fn from_map(map: &Map<String, Value>) -> Self {
        let mut extra = map.clone();
        let title = extra.remove("title");
        let activity_type = extra.remove("type");
        let private = extra.remove("private");
        Self {
            title: title.as_ref().and_then(Value::as_str).map(str::to_string),
            activity_type: activity_type
                .as_ref()
                .and_then(Value::as_str)
                .map(str::to_string),
            private: private.as_ref().and_then(provider_bool),
            extra,
        }
    }
}

/// Fields Strava sends in `updates` for athlete events.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AthleteUpdates {
    /// `Some(false)` when the athlete revoked our access.
    pub authorized: Option<bool>,
    pub extra: Map<String, Value>,
}

impl AthleteUpdates {
    fn from_map(map: &Map<String, Value>) -> Self {
        let mut extra = map.clone();
        let authorized = extra.remove("authorized");
        Self {
            authorized: authorized.as_ref().and_then(provider_bool),
            extra,
        }
    }

    pub fn is_deauthorization(&self) -> bool {
        self.authorized == Some(false)
    }
}

/// Strava sends booleans either as JSON booleans or as the strings
/// "true"/"false"; accept both.
fn provider_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) if s.eq_ignore_ascii_case("true") => Some(true),
        Value::String(s) if s.eq_ignore_ascii_case("false") => Some(false),
        _ => None,
    }
}

/// A webhook event as stored in the audit table.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookEventRecord {
    pub id: i64,
    pub object_type: String,
    pub object_id: i64,
    pub aspect_type: String,
    pub updates: Value,
    pub owner_id: i64,
    pub subscription_id: Option<i64>,
    pub event_time: DateTime<Utc>,
    pub processed: bool,
    pub created_at: DateTime<Utc>,
}
