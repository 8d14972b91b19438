// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A plugin: one manifest file on disk, its callbacks, and its cursor.
//!
//! The cursor is the pair `(last_id, backlog)`. `last_id` only ever
//! moves forward. When an event arrives with a gap behind it, the
//! missing ids either go into the backlog (the event is fresh enough
//! that stragglers may still materialise upstream) or are written off
//! as never having happened. Backlogged ids are re-requested on every
//! poll until they arrive or their timeout lapses.

use crate::callback::{panic_message, Callback, DispatchOutcome};
use crate::env::PluginEnv;
use crate::error::EngineError;
use crate::logger::PluginLogger;
use crate::registrar::Registrar;
use chrono::{DateTime, Duration, Utc};
use relay_core::{Event, EventId};
use relay_storage::PluginCursor;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::info;

// Window after which a pending event id is considered to never happen.
const BACKLOG_TIMEOUT_MINUTES: i64 = 5;

pub(crate) fn backlog_timeout() -> Duration {
    Duration::minutes(BACKLOG_TIMEOUT_MINUTES)
}

/// On-disk plugin manifest.
#[derive(Debug, Deserialize)]
struct Manifest {
    /// Entry name in the module registry.
    module: String,
    /// Opaque bag handed to the module at registration.
    #[serde(default)]
    options: serde_json::Value,
}

/// A manifest file on disk that registers one or more callbacks.
pub struct Plugin {
    path: PathBuf,
    name: String,
    env: PluginEnv,
    logger: PluginLogger,
    mtime: Option<SystemTime>,
    active: bool,
    callbacks: Vec<Callback>,
    last_id: Option<EventId>,
    backlog: BTreeMap<EventId, DateTime<Utc>>,
}

impl Plugin {
    pub fn new(env: &PluginEnv, path: &Path) -> Result<Self, EngineError> {
        if !path.is_file() {
            return Err(EngineError::PluginNotAFile {
                path: path.display().to_string(),
            });
        }
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        let logger = PluginLogger::new(&name, env.plugin_log_dir.as_deref());
        Ok(Self {
            path: path.to_path_buf(),
            name,
            env: env.clone(),
            logger,
            mtime: None,
            active: true,
            callbacks: Vec::new(),
            last_id: None,
            backlog: BTreeMap::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Should this plugin's callbacks be run?
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn callbacks(&self) -> &[Callback] {
        &self.callbacks
    }

    pub(crate) fn logger(&self) -> &PluginLogger {
        &self.logger
    }

    pub(crate) fn env(&self) -> &PluginEnv {
        &self.env
    }

    pub(crate) fn add_callback(&mut self, callback: Callback) {
        self.callbacks.push(callback);
    }

    /// Current cursor, for persistence.
    pub fn cursor(&self) -> PluginCursor {
        PluginCursor {
            last_id: self.last_id,
            backlog: self.backlog.clone(),
        }
    }

    /// Restore a persisted cursor. Survives reloads and restarts.
    pub fn set_cursor(&mut self, cursor: PluginCursor) {
        self.last_id = cursor.last_id;
        self.backlog = cursor.backlog;
    }

    /// Start from `id` with a clean backlog.
    pub fn seed_cursor(&mut self, id: EventId) {
        self.last_id = Some(id);
        self.backlog.clear();
    }

    /// The oldest id this plugin still needs: the id after `last_id`,
    /// or an unexpired backlog id below it. Expired backlog entries are
    /// dropped here. `None` until the plugin has been seeded.
    pub fn next_unprocessed_event_id(&mut self) -> Option<EventId> {
        let mut next = self.last_id.map(EventId::next);

        let now = self.env.clock.now();
        let expired: Vec<EventId> = self
            .backlog
            .iter()
            .filter(|(_, expiration)| **expiration < now)
            .map(|(id, _)| *id)
            .collect();
        for id in expired {
            self.logger
                .warn(&format!("Timeout elapsed on backlog event id {id}."));
            self.backlog.remove(&id);
        }

        if let Some(oldest) = self.backlog.keys().next().copied() {
            next = Some(match next {
                Some(n) if n < oldest => n,
                _ => oldest,
            });
        }
        next
    }

    /// Load or reload the manifest. No-op while the file's mtime is
    /// unchanged. Any failure deactivates the plugin but preserves the
    /// cursor, so a later successful reload picks up where it left off.
    pub fn load(&mut self) {
        let mtime = match std::fs::metadata(&self.path).and_then(|meta| meta.modified()) {
            Ok(mtime) => mtime,
            Err(err) => {
                self.active = false;
                self.logger.error(&format!(
                    "Could not stat plugin at {}: {err}",
                    self.path.display()
                ));
                return;
            }
        };

        match self.mtime {
            None => info!("Loading plugin at {}", self.path.display()),
            Some(prev) if prev < mtime => info!("Reloading plugin at {}", self.path.display()),
            Some(_) => return,
        }

        self.mtime = Some(mtime);
        self.callbacks.clear();
        self.active = true;
        self.logger.set_recipients(None);

        let manifest = match self.read_manifest() {
            Ok(manifest) => manifest,
            Err(message) => {
                self.active = false;
                self.logger.critical(&message);
                return;
            }
        };

        let Some(module) = self.env.registry.get(&manifest.module) else {
            self.active = false;
            self.logger.critical(&format!(
                "No module named {} is registered for plugin at {}.",
                manifest.module,
                self.path.display()
            ));
            return;
        };

        let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| {
            let mut registrar = Registrar::new(self);
            module.register_callbacks(&mut registrar, &manifest.options)
        }));
        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                self.active = false;
                self.logger.critical(&format!(
                    "Error registering callbacks for plugin at {}: {err}",
                    self.path.display()
                ));
            }
            Err(payload) => {
                self.active = false;
                self.logger.critical(&format!(
                    "Registration panicked for plugin at {}: {}",
                    self.path.display(),
                    panic_message(payload.as_ref())
                ));
            }
        }
    }

    fn read_manifest(&self) -> Result<Manifest, String> {
        let raw = std::fs::read_to_string(&self.path).map_err(|err| {
            format!("Could not load the plugin at {}: {err}", self.path.display())
        })?;
        toml::from_str(&raw).map_err(|err| {
            format!("Could not load the plugin at {}: {err}", self.path.display())
        })
    }

    /// Route one event. Returns whether the plugin is still active.
    pub fn process(&mut self, event: &Event) -> bool {
        if self.backlog.contains_key(&event.id) {
            if self.dispatch(event) {
                self.logger
                    .info(&format!("Processed id {} from backlog.", event.id));
                self.backlog.remove(&event.id);
                self.advance(event);
            }
        } else if let Some(last) = self.last_id.filter(|last| event.id <= *last) {
            // Ordered delivery absorbing a re-offered event.
            self.logger.debug(&format!(
                "Event {} is too old. Last event processed was ({last}).",
                event.id
            ));
        } else if self.dispatch(event) {
            self.advance(event);
        }
        self.active
    }

    /// Route a batch. The backlog subset and the new subset are
    /// resolved in separate passes across polls: when any backlog id is
    /// present the whole batch is dispatched but only the backlog
    /// subset advances the cursor.
    pub fn process_batch(&mut self, events: &[Event]) -> bool {
        let in_backlog: Vec<Event> = events
            .iter()
            .filter(|event| self.backlog.contains_key(&event.id))
            .cloned()
            .collect();
        let stale: Vec<EventId> = events
            .iter()
            .filter(|event| self.last_id.is_some_and(|last| event.id <= last))
            .map(|event| event.id)
            .collect();

        if !in_backlog.is_empty() {
            if self.dispatch_batch(events) {
                for event in &in_backlog {
                    self.logger
                        .info(&format!("Processed id {} from backlog.", event.id));
                    self.backlog.remove(&event.id);
                    self.advance(event);
                }
            }
        } else if !stale.is_empty() {
            let ids = stale
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            let last = self.last_id.map(|id| id.to_string()).unwrap_or_default();
            self.logger.debug(&format!(
                "Events {ids} are too old. Last event processed was ({last})."
            ));
        } else if self.dispatch_batch(events) {
            for event in events {
                self.advance(event);
            }
        }
        self.active
    }

    /// Run the callbacks for one event, in registration order. Returns
    /// whether the plugin survived the dispatch.
    fn dispatch(&mut self, event: &Event) -> bool {
        let mut fatal = false;
        for callback in &mut self.callbacks {
            if !callback.is_active() {
                self.logger.debug(&format!(
                    "Skipping inactive callback {} in plugin.",
                    callback.name()
                ));
                continue;
            }
            if !callback.can_process(event) {
                continue;
            }
            self.logger.debug(&format!(
                "Dispatching event {} to callback {}.",
                event.id,
                callback.name()
            ));
            if callback.process(event) == DispatchOutcome::PluginFatal {
                fatal = true;
                break;
            }
        }
        if fatal {
            self.active = false;
        }
        self.active
    }

    fn dispatch_batch(&mut self, events: &[Event]) -> bool {
        let mut fatal = false;
        for callback in &mut self.callbacks {
            if !callback.is_active() {
                self.logger.debug(&format!(
                    "Skipping inactive callback {} in plugin.",
                    callback.name()
                ));
                continue;
            }
            let matching: Vec<Event> = events
                .iter()
                .filter(|event| callback.can_process(event))
                .cloned()
                .collect();
            if matching.is_empty() {
                continue;
            }
            let ids = matching
                .iter()
                .map(|event| event.id.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            self.logger.debug(&format!(
                "Dispatching events {ids} to callback {}.",
                callback.name()
            ));
            if callback.process_batch(&matching) == DispatchOutcome::PluginFatal {
                fatal = true;
                break;
            }
        }
        if fatal {
            self.active = false;
        }
        self.active
    }

    /// Move `last_id` up to `event`, filing or writing off any ids the
    /// jump skips over. A backlog replay carries an id below `last_id`;
    /// the cursor never moves backwards for it, or everything between
    /// the replay and the head would be offered to callbacks again.
    fn advance(&mut self, event: &Event) {
        if let Some(last) = self.last_id {
            if event.id > last.next() {
                let now = self.env.clock.now();
                let first_missing = last.next();
                let last_missing = event.id.prev();
                if now - event.created_at > backlog_timeout() {
                    // Anything below this event's id should have shown
                    // up in the log by now if it actually happened.
                    if first_missing == last_missing {
                        self.logger
                            .info(&format!("Event {first_missing} never happened - ignoring."));
                    } else {
                        self.logger.info(&format!(
                            "Events {first_missing}-{last_missing} never happened - ignoring."
                        ));
                    }
                } else {
                    let expiration = now + backlog_timeout();
                    for id in first_missing.value()..=last_missing.value() {
                        self.logger
                            .info(&format!("Adding event id {id} to backlog."));
                        self.backlog.insert(EventId::new(id), expiration);
                    }
                }
            }
            if event.id > last {
                self.last_id = Some(event.id);
            }
        } else {
            self.last_id = Some(event.id);
        }
    }
}

#[cfg(test)]
#[path = "plugin_tests.rs"]
mod tests;
