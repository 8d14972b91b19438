// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Upstream event-log adapters.
//!
//! The upstream is the remote project-management service whose event
//! log the daemon consumes. The engine only ever sees this trait; the
//! wire protocol lives in the HTTP implementation.

mod http;

pub use http::{HttpUpstream, HttpUpstreamFactory};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeUpstream, FakeUpstreamFactory};

use relay_core::{Event, EventId};
use thiserror::Error;

/// Errors from upstream calls. All variants are transient from the
/// engine's point of view and go through the same retry policy.
#[derive(Debug, Clone, Error)]
pub enum UpstreamError {
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("response error: {0}")]
    Response(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("unknown error: {0}")]
    Unknown(String),
}

/// API credentials of one registered script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub script_name: String,
    pub script_key: String,
}

impl Credentials {
    pub fn new(script_name: impl Into<String>, script_key: impl Into<String>) -> Self {
        Self {
            script_name: script_name.into(),
            script_key: script_key.into(),
        }
    }
}

/// Connection to the upstream event log.
///
/// Calls block the calling thread; the engine is a single cooperative
/// worker and treats these as its suspension points.
pub trait UpstreamClient: Send + Sync + 'static {
    /// Highest event id currently recorded upstream, or `None` while
    /// the log is empty.
    fn last_event_id(&self) -> Result<Option<EventId>, UpstreamError>;

    /// Ordered batch of events with `id >= since`, ascending, at most
    /// `limit` entries.
    fn events_since(&self, since: EventId, limit: usize) -> Result<Vec<Event>, UpstreamError>;

    /// Attach a session uuid to subsequent calls so upstream UIs can
    /// correlate writes with the originating user session.
    fn set_session_uuid(&self, uuid: Option<&str>);
}

/// Builds upstream connections bound to a script's credentials. Each
/// callback owns a private connection created through this factory.
pub trait UpstreamFactory: Send + Sync + 'static {
    fn connect(
        &self,
        credentials: &Credentials,
    ) -> Result<std::sync::Arc<dyn UpstreamClient>, UpstreamError>;
}
