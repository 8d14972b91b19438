// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Builders and helpers for tests in this crate and downstream crates.
#![allow(clippy::unwrap_used)]

use crate::event::{Event, EventId};
use chrono::{DateTime, TimeZone, Utc};

/// A fixed, readable instant for tests that do not care about time.
pub fn test_epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 15, 12, 0, 0).unwrap()
}

/// Builder for [`Event`] values in tests.
#[derive(Debug, Clone)]
pub struct EventBuilder {
    event: Event,
}

impl EventBuilder {
    pub fn new(id: u64) -> Self {
        Self {
            event: Event {
                id: EventId::new(id),
                event_type: "Task_Change".to_string(),
                attribute_name: None,
                created_at: test_epoch(),
                session_uuid: None,
                payload: serde_json::Value::Null,
            },
        }
    }

    pub fn event_type(mut self, event_type: &str) -> Self {
        self.event.event_type = event_type.to_string();
        self
    }

    pub fn attribute(mut self, attribute_name: &str) -> Self {
        self.event.attribute_name = Some(attribute_name.to_string());
        self
    }

    pub fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.event.created_at = created_at;
        self
    }

    pub fn session_uuid(mut self, uuid: &str) -> Self {
        self.event.session_uuid = Some(uuid.to_string());
        self
    }

    pub fn payload(mut self, payload: serde_json::Value) -> Self {
        self.event.payload = payload;
        self
    }

    pub fn build(self) -> Event {
        self.event
    }
}
