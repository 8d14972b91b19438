// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The engine: owns the poll loop and the durable cursor map.
//!
//! One logical worker drives fetch → dispatch → persist → sleep. There
//! is no internal parallelism: ordering between plugins and within a
//! plugin comes from sorted iteration, and cursor persistence is a
//! plain sequential write. Upstream calls, sleeps, and user callbacks
//! are the suspension points; a slow callback stalls the loop and that
//! is accepted.

use crate::collection::{Collection, CursorSeed};
use crate::env::PluginEnv;
use crate::error::EngineError;
use crate::logger::TimingLogger;
use crate::registrar::ModuleRegistry;
use crate::stop::StopToken;
use relay_adapters::{ErrorSink, UpstreamClient, UpstreamError, UpstreamFactory};
use relay_core::{Clock, Event, EventId};
use relay_storage::{CollectionCursors, CursorMap, LoadedCursors, PluginCursor};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Tuning knobs of the engine, filled in from the daemon config.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Plugin directories, one collection each.
    pub plugin_paths: Vec<PathBuf>,
    /// Where the cursor map is persisted.
    pub cursor_path: PathBuf,
    /// Attempts per upstream fetch before giving up for the iteration.
    pub max_conn_retries: u32,
    /// Sleep after the final failed attempt.
    pub conn_retry_sleep: Duration,
    /// Idle sleep once caught up with the upstream.
    pub fetch_interval: Duration,
    /// Upper bound on a fetched batch.
    pub max_event_batch_size: usize,
    /// Dispatch whole batches instead of single events.
    pub batch_mode: bool,
    /// Propagate event session uuids to upstream connections.
    pub use_session_uuid: bool,
    /// Timing log file, when enabled.
    pub timing_log: Option<PathBuf>,
    /// Directory for per-plugin log files, when enabled.
    pub plugin_log_dir: Option<PathBuf>,
}

impl EngineConfig {
    pub fn new(plugin_paths: Vec<PathBuf>, cursor_path: PathBuf) -> Self {
        Self {
            plugin_paths,
            cursor_path,
            max_conn_retries: 5,
            conn_retry_sleep: Duration::from_secs(60),
            fetch_interval: Duration::from_secs(5),
            max_event_batch_size: 500,
            batch_mode: false,
            use_session_uuid: false,
            timing_log: None,
            plugin_log_dir: None,
        }
    }
}

/// The event-dispatch engine.
pub struct Engine {
    config: EngineConfig,
    env: PluginEnv,
    upstream: Arc<dyn UpstreamClient>,
    collections: Vec<Collection>,
    cursor_data: CursorMap,
    stop: StopToken,
    started: bool,
}

impl Engine {
    pub fn new(
        config: EngineConfig,
        upstream: Arc<dyn UpstreamClient>,
        factory: Arc<dyn UpstreamFactory>,
        registry: Arc<ModuleRegistry>,
        sink: Arc<dyn ErrorSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let timing = config
            .timing_log
            .as_ref()
            .map(|path| TimingLogger::new(path.clone()));
        let env = PluginEnv {
            registry,
            factory,
            sink,
            clock,
            timing,
            plugin_log_dir: config.plugin_log_dir.clone(),
            batch_mode: config.batch_mode,
            use_session_uuid: config.use_session_uuid,
        };
        Self {
            config,
            env,
            upstream,
            collections: Vec::new(),
            cursor_data: CursorMap::new(),
            stop: StopToken::new(),
            started: false,
        }
    }

    /// Token shared with the supervisor; stopping it ends `run`.
    pub fn stop_token(&self) -> StopToken {
        self.stop.clone()
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn collections(&self) -> &[Collection] {
        &self.collections
    }

    #[cfg(any(test, feature = "test-support"))]
    pub fn collections_mut(&mut self) -> &mut [Collection] {
        &mut self.collections
    }

    /// Load collections from disk and restore cursors, then the engine
    /// is ready to `run`.
    pub fn start(&mut self) -> Result<(), EngineError> {
        debug!("Starting the event processing loop.");
        let mut collections = Vec::new();
        for path in &self.config.plugin_paths {
            let mut collection = Collection::new(&self.env, path)?;
            collection.load();
            collections.push(collection);
        }
        info!(
            "Loaded {} plugin collection(s) from {} path(s).",
            collections.len(),
            self.config.plugin_paths.len()
        );
        self.collections = collections;
        self.load_cursor_data()?;
        self.started = true;
        Ok(())
    }

    /// Poll until the stop token fires.
    pub fn run(&mut self) -> Result<(), EngineError> {
        while !self.stop.is_stopped() {
            self.poll_once()?;
        }
        Ok(())
    }

    /// Request a cooperative stop, observed between iterations.
    pub fn stop(&self) {
        debug!("Shutting down event processing loop.");
        self.stop.stop();
    }

    /// One iteration: fetch, dispatch, persist, idle, reload.
    pub fn poll_once(&mut self) -> Result<(), EngineError> {
        let events = self.fetch_new_events();

        if self.config.batch_mode {
            if !events.is_empty() {
                for collection in &mut self.collections {
                    collection.process_batch(&events);
                }
            }
        } else {
            for event in &events {
                for collection in &mut self.collections {
                    collection.process(event);
                }
            }
        }

        if !events.is_empty() {
            self.save_cursor_data();
        }

        // A short batch means we are caught up with the upstream; idle
        // until the next poll. A full batch means we are draining lag,
        // so go straight back for more.
        if events.len() < self.config.max_event_batch_size && !self.stop.is_stopped() {
            std::thread::sleep(self.config.fetch_interval);
        }

        for collection in &mut self.collections {
            collection.load();
        }

        // Plugins discovered by the reload inherit persisted cursors.
        if !events.is_empty() {
            self.resolve_cursor_data();
        }

        Ok(())
    }

    /// Compute the next id to ask for and fetch a batch. Transient
    /// upstream failures are retried here; exhausting the retries
    /// yields an empty batch and leaves every cursor untouched.
    fn fetch_new_events(&mut self) -> Vec<Event> {
        let next_id = self
            .collections
            .iter_mut()
            .filter_map(Collection::next_unprocessed_event_id)
            .min();

        let Some(next_id) = next_id else {
            // No active plugin is seeded. Bootstrap only when no plugin
            // anywhere carries state: an inactive plugin may be
            // preserving a real cursor across a failed reload, and a
            // blanket reseed would skip every event it missed.
            if self.collections.iter().all(Collection::is_empty)
                || self.collections.iter().any(Collection::has_state)
            {
                return Vec::new();
            }
            if let Some(head) = self.wait_for_head() {
                for collection in &mut self.collections {
                    collection.set_state(CursorSeed::All(head));
                }
                self.save_cursor_data();
            }
            return Vec::new();
        };

        for attempt in 0..self.config.max_conn_retries {
            match self
                .upstream
                .events_since(next_id, self.config.max_event_batch_size)
            {
                Ok(events) => {
                    if let (Some(first), Some(last)) = (events.first(), events.last()) {
                        debug!(
                            "Got {} events: {} to {}.",
                            events.len(),
                            first.id,
                            last.id
                        );
                    }
                    return events;
                }
                Err(err) => self.log_connection_attempt(attempt, &err),
            }
        }
        Vec::new()
    }

    /// Block until the upstream reports a head id, under the retry
    /// policy. An empty upstream log is waited out, not treated as an
    /// error. Returns `None` only on cooperative stop.
    fn wait_for_head(&self) -> Option<EventId> {
        let mut attempt = 0;
        loop {
            if self.stop.is_stopped() {
                return None;
            }
            match self.upstream.last_event_id() {
                Ok(Some(id)) => {
                    info!("Last event id ({id}) from the upstream log.");
                    return Some(id);
                }
                Ok(None) => {
                    debug!("Upstream log is empty; waiting for the first event.");
                    std::thread::sleep(self.config.conn_retry_sleep);
                    attempt = 0;
                }
                Err(err) => {
                    self.log_connection_attempt(attempt, &err);
                    attempt = (attempt + 1) % self.config.max_conn_retries.max(1);
                }
            }
        }
    }

    /// Warning below the final attempt, error plus the retry sleep on
    /// the final one.
    fn log_connection_attempt(&self, attempt: u32, err: &UpstreamError) {
        let attempts = attempt + 1;
        let max = self.config.max_conn_retries;
        if attempts >= max {
            error!("Unable to connect to upstream (attempt {attempts} of {max}): {err}");
            std::thread::sleep(self.config.conn_retry_sleep);
        } else {
            warn!("Unable to connect to upstream (attempt {attempts} of {max}): {err}");
        }
    }

    /// Restore cursors from disk, falling back to the legacy format or
    /// an upstream bootstrap when there is no file yet.
    fn load_cursor_data(&mut self) -> Result<(), EngineError> {
        match relay_storage::load(&self.config.cursor_path)? {
            Some(LoadedCursors::Map(map)) => {
                self.cursor_data = map;
                self.resolve_cursor_data();
            }
            Some(LoadedCursors::Legacy(id)) => {
                debug!("Read last event id ({id}) from file.");
                for collection in &mut self.collections {
                    collection.set_state(CursorSeed::All(id));
                }
            }
            None => {
                if let Some(head) = self.wait_for_head() {
                    for collection in &mut self.collections {
                        collection.set_state(CursorSeed::All(head));
                    }
                }
                self.save_cursor_data();
            }
        }
        Ok(())
    }

    /// Hand each collection its persisted cursors. A collection path
    /// absent from the map gets the name-based fallback: adopt the
    /// highest cursor recorded for each plugin name anywhere in the
    /// map (the plugin directory may have moved), and seed names never
    /// seen before at the upstream head.
    fn resolve_cursor_data(&mut self) {
        let mut no_state: Vec<usize> = Vec::new();
        for (index, collection) in self.collections.iter_mut().enumerate() {
            match self.cursor_data.get(&collection.path_key()) {
                Some(cursors) if !cursors.is_empty() => {
                    collection.set_state(CursorSeed::Map(cursors.clone()));
                }
                _ => no_state.push(index),
            }
        }
        if no_state.is_empty() {
            return;
        }

        let best = self.cursor_data.max_cursors_by_name();
        let mut states: Vec<(usize, CollectionCursors)> = no_state
            .into_iter()
            .map(|index| (index, self.collections[index].get_state()))
            .collect();

        let any_unmatched = states
            .iter()
            .flat_map(|(_, state)| state.keys())
            .any(|name| !best.contains_key(name));
        let head = if any_unmatched {
            self.wait_for_head()
        } else {
            None
        };

        for (index, state) in &mut states {
            for (name, cursor) in state.iter_mut() {
                if let Some(known) = best.get(name) {
                    *cursor = known.clone();
                } else if let Some(head) = head {
                    *cursor = PluginCursor::seed(head);
                }
            }
            self.collections[*index].set_state(CursorSeed::Map(state.clone()));
        }
    }

    /// One write of the full cursor map. Skipped with a warning while
    /// no plugin has any state; write failures are logged and the loop
    /// carries on (events may be re-delivered after a restart).
    fn save_cursor_data(&mut self) {
        for collection in &mut self.collections {
            let key = collection.path_key();
            let state = collection.get_state();
            self.cursor_data.set(key, state);
        }
        if self.cursor_data.is_empty() {
            warn!("No state was found. Not saving to disk.");
            return;
        }
        if let Err(err) = relay_storage::save(&self.config.cursor_path, &self.cursor_data) {
            error!(
                "Can not write cursor data to {}: {err}",
                self.config.cursor_path.display()
            );
        }
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
