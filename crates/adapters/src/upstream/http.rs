// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP implementation of the upstream event-log interface.

use super::{Credentials, UpstreamClient, UpstreamError, UpstreamFactory};
use parking_lot::Mutex;
use relay_core::{Event, EventId};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

// Bounds stalls on a wedged connection; the engine accepts blocking up
// to this long per call.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct LastIdResponse {
    id: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct EventsResponse {
    events: Vec<Event>,
}

/// Upstream connection over the service's JSON API.
pub struct HttpUpstream {
    http: reqwest::blocking::Client,
    base_url: String,
    credentials: Credentials,
    session_uuid: Mutex<Option<String>>,
}

impl HttpUpstream {
    fn request(&self, path: &str, query: &[(&str, String)]) -> Result<reqwest::blocking::Response, UpstreamError> {
        let url = format!("{}/api/v1/{}", self.base_url.trim_end_matches('/'), path);
        let mut req = self
            .http
            .get(&url)
            .header("X-Script-Name", &self.credentials.script_name)
            .header("X-Script-Key", &self.credentials.script_key)
            .query(query);
        if let Some(uuid) = self.session_uuid.lock().as_deref() {
            req = req.header("X-Session-Uuid", uuid);
        }

        let response = req.send().map_err(classify_transport)?;
        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Response(format!(
                "{} returned {}",
                url, status
            )));
        }
        Ok(response)
    }
}

impl UpstreamClient for HttpUpstream {
    fn last_event_id(&self) -> Result<Option<EventId>, UpstreamError> {
        let response = self.request("event_log/last_id", &[])?;
        let body: LastIdResponse = response
            .json()
            .map_err(|e| UpstreamError::Protocol(e.to_string()))?;
        Ok(body.id.map(EventId::new))
    }

    fn events_since(&self, since: EventId, limit: usize) -> Result<Vec<Event>, UpstreamError> {
        let response = self.request(
            "event_log",
            &[
                ("since", since.to_string()),
                ("limit", limit.to_string()),
            ],
        )?;
        let body: EventsResponse = response
            .json()
            .map_err(|e| UpstreamError::Protocol(e.to_string()))?;
        debug!(count = body.events.len(), since = %since, "fetched events");
        Ok(body.events)
    }

    fn set_session_uuid(&self, uuid: Option<&str>) {
        *self.session_uuid.lock() = uuid.map(str::to_string);
    }
}

fn classify_transport(err: reqwest::Error) -> UpstreamError {
    if err.is_timeout() || err.is_connect() {
        UpstreamError::Transport(err.to_string())
    } else if err.is_decode() {
        UpstreamError::Protocol(err.to_string())
    } else {
        UpstreamError::Unknown(err.to_string())
    }
}

/// Builds [`HttpUpstream`] connections against one server.
#[derive(Debug, Clone)]
pub struct HttpUpstreamFactory {
    base_url: String,
    proxy: Option<String>,
    timeout: Duration,
}

impl HttpUpstreamFactory {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            proxy: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_proxy(mut self, proxy: Option<String>) -> Self {
        self.proxy = proxy.filter(|p| !p.is_empty());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl UpstreamFactory for HttpUpstreamFactory {
    fn connect(&self, credentials: &Credentials) -> Result<Arc<dyn UpstreamClient>, UpstreamError> {
        let mut builder = reqwest::blocking::Client::builder().timeout(self.timeout);
        if let Some(proxy) = &self.proxy {
            let proxy = reqwest::Proxy::all(proxy)
                .map_err(|e| UpstreamError::Transport(e.to_string()))?;
            builder = builder.proxy(proxy);
        }
        let http = builder
            .build()
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;

        Ok(Arc::new(HttpUpstream {
            http,
            base_url: self.base_url.clone(),
            credentials: credentials.clone(),
            session_uuid: Mutex::new(None),
        }))
    }
}
