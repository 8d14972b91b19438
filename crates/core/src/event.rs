// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event log entry types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of an entry in the upstream event log.
///
/// Ids are positive and strictly increasing across the log, though the
/// sequence observed by a poller may contain holes (entries recorded
/// out of order, or never at all).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct EventId(pub u64);

impl EventId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn value(self) -> u64 {
        self.0
    }

    /// The id immediately following this one.
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// The id immediately preceding this one, saturating at zero.
    pub fn prev(self) -> Self {
        Self(self.0.saturating_sub(1))
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for EventId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// A single entry from the upstream event log.
///
/// The engine only interprets the fields below; everything else the
/// upstream recorded for the entry rides along in `payload` and is
/// handed to callbacks untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub event_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute_name: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_uuid: Option<String>,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub payload: serde_json::Value,
}

impl Event {
    /// Compact one-line description for log output.
    pub fn log_summary(&self) -> String {
        match self.attribute_name.as_deref() {
            Some(attr) => format!("id={} type={} attr={}", self.id, self.event_type, attr),
            None => format!("id={} type={}", self.id, self.event_type),
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
