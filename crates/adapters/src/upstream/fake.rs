// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake upstream event log for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{Credentials, UpstreamClient, UpstreamError, UpstreamFactory};
use parking_lot::Mutex;
use relay_core::{Event, EventId};
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

#[derive(Default)]
struct FakeUpstreamState {
    log: BTreeMap<EventId, Event>,
    fail_next: VecDeque<UpstreamError>,
    session_uuids: Vec<Option<String>>,
    fetches: Vec<(EventId, usize)>,
}

/// In-memory upstream log with scripted failures.
#[derive(Clone, Default)]
pub struct FakeUpstream {
    inner: Arc<Mutex<FakeUpstreamState>>,
}

impl FakeUpstream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an event in the fake log.
    pub fn push_event(&self, event: Event) {
        self.inner.lock().log.insert(event.id, event);
    }

    pub fn push_events(&self, events: impl IntoIterator<Item = Event>) {
        let mut state = self.inner.lock();
        for event in events {
            state.log.insert(event.id, event);
        }
    }

    /// Remove an event, as if it never materialised upstream.
    pub fn remove_event(&self, id: EventId) {
        self.inner.lock().log.remove(&id);
    }

    /// Queue an error returned by the next upstream call.
    pub fn fail_next(&self, error: UpstreamError) {
        self.inner.lock().fail_next.push_back(error);
    }

    /// Session uuids observed via `set_session_uuid`, in call order.
    pub fn session_uuids(&self) -> Vec<Option<String>> {
        self.inner.lock().session_uuids.clone()
    }

    /// `(since, limit)` pairs of every `events_since` call.
    pub fn fetches(&self) -> Vec<(EventId, usize)> {
        self.inner.lock().fetches.clone()
    }

    fn take_failure(&self) -> Option<UpstreamError> {
        self.inner.lock().fail_next.pop_front()
    }
}

impl UpstreamClient for FakeUpstream {
    fn last_event_id(&self) -> Result<Option<EventId>, UpstreamError> {
        if let Some(err) = self.take_failure() {
            return Err(err);
        }
        Ok(self.inner.lock().log.keys().next_back().copied())
    }

    fn events_since(&self, since: EventId, limit: usize) -> Result<Vec<Event>, UpstreamError> {
        self.inner.lock().fetches.push((since, limit));
        if let Some(err) = self.take_failure() {
            return Err(err);
        }
        Ok(self
            .inner
            .lock()
            .log
            .range(since..)
            .take(limit)
            .map(|(_, event)| event.clone())
            .collect())
    }

    fn set_session_uuid(&self, uuid: Option<&str>) {
        self.inner
            .lock()
            .session_uuids
            .push(uuid.map(str::to_string));
    }
}

/// Factory handing out clones of one shared [`FakeUpstream`], recording
/// the credentials of every connection.
#[derive(Clone, Default)]
pub struct FakeUpstreamFactory {
    upstream: FakeUpstream,
    connects: Arc<Mutex<Vec<Credentials>>>,
}

impl FakeUpstreamFactory {
    pub fn new(upstream: FakeUpstream) -> Self {
        Self {
            upstream,
            connects: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// The shared upstream every connection points at.
    pub fn upstream(&self) -> &FakeUpstream {
        &self.upstream
    }

    /// Credentials of every `connect` call, in order.
    pub fn connects(&self) -> Vec<Credentials> {
        self.connects.lock().clone()
    }
}

impl UpstreamFactory for FakeUpstreamFactory {
    fn connect(&self, credentials: &Credentials) -> Result<Arc<dyn UpstreamClient>, UpstreamError> {
        self.connects.lock().push(credentials.clone());
        Ok(Arc::new(self.upstream.clone()))
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
