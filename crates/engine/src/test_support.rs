// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scripted plugin modules and environment builders for tests.
#![allow(clippy::panic)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use crate::env::PluginEnv;
use crate::registrar::{ModuleRegistry, PluginModule, RegisterError, Registrar};
use parking_lot::Mutex;
use relay_adapters::{FakeErrorSink, FakeUpstream, FakeUpstreamFactory};
use relay_core::test_support::test_epoch;
use relay_core::{EventFilter, FakeClock};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// One dispatched event, as seen from inside a scripted callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchEntry {
    pub plugin: String,
    pub callback: String,
    pub event_id: u64,
}

/// Shared journal of everything scripted callbacks received.
#[derive(Clone, Default)]
pub struct DispatchJournal {
    entries: Arc<Mutex<Vec<DispatchEntry>>>,
}

impl DispatchJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, plugin: &str, callback: &str, event_id: u64) {
        self.entries.lock().push(DispatchEntry {
            plugin: plugin.to_string(),
            callback: callback.to_string(),
            event_id,
        });
    }

    pub fn entries(&self) -> Vec<DispatchEntry> {
        self.entries.lock().clone()
    }

    /// Event ids seen by one callback, in dispatch order.
    pub fn ids_for(&self, plugin: &str, callback: &str) -> Vec<u64> {
        self.entries
            .lock()
            .iter()
            .filter(|entry| entry.plugin == plugin && entry.callback == callback)
            .map(|entry| entry.event_id)
            .collect()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

/// Description of one callback a [`ScriptedModule`] registers.
#[derive(Debug, Clone, Default)]
pub struct ScriptedCallback {
    pub name: String,
    pub filter: Option<EventFilter>,
    pub stop_on_error: bool,
    /// Event ids for which the callback returns an error.
    pub fail_on: BTreeSet<u64>,
    /// Event ids for which the callback panics.
    pub panic_on: BTreeSet<u64>,
}

impl ScriptedCallback {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn with_filter(mut self, filter: EventFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn stop_on_error(mut self) -> Self {
        self.stop_on_error = true;
        self
    }

    pub fn fail_on(mut self, id: u64) -> Self {
        self.fail_on.insert(id);
        self
    }

    pub fn panic_on(mut self, id: u64) -> Self {
        self.panic_on.insert(id);
        self
    }
}

/// Module registering scripted callbacks that record into a journal.
pub struct ScriptedModule {
    journal: DispatchJournal,
    callbacks: Vec<ScriptedCallback>,
    batch: bool,
}

impl ScriptedModule {
    pub fn new(journal: DispatchJournal) -> Self {
        Self {
            journal,
            callbacks: vec![ScriptedCallback::named("record")],
            batch: false,
        }
    }

    /// Same, but registers batch callbacks.
    pub fn batch(journal: DispatchJournal) -> Self {
        Self {
            batch: true,
            ..Self::new(journal)
        }
    }

    /// Replace the default single `record` callback.
    pub fn with_callbacks(mut self, callbacks: Vec<ScriptedCallback>) -> Self {
        self.callbacks = callbacks;
        self
    }
}

impl PluginModule for ScriptedModule {
    fn register_callbacks(
        &self,
        registrar: &mut Registrar<'_>,
        _options: &serde_json::Value,
    ) -> Result<(), RegisterError> {
        for spec in &self.callbacks {
            let journal = self.journal.clone();
            let spec = spec.clone();
            let name = spec.name.clone();
            let filter = spec.filter.clone();
            let stop_on_error = spec.stop_on_error;
            if self.batch {
                registrar.register_batch_callback(
                    "specs-script",
                    "specs-key",
                    &name,
                    move |_upstream, logger, events, _args| {
                        for event in events {
                            journal.push(logger.plugin_name(), &spec.name, event.id.value());
                        }
                        if let Some(event) =
                            events.iter().find(|e| spec.panic_on.contains(&e.id.value()))
                        {
                            panic!("scripted panic for event {}", event.id);
                        }
                        if let Some(event) =
                            events.iter().find(|e| spec.fail_on.contains(&e.id.value()))
                        {
                            return Err(format!("scripted failure for event {}", event.id).into());
                        }
                        Ok(())
                    },
                    filter,
                    None,
                    stop_on_error,
                )?;
            } else {
                registrar.register_callback(
                    "specs-script",
                    "specs-key",
                    &name,
                    move |_upstream, logger, event, _args| {
                        journal.push(logger.plugin_name(), &spec.name, event.id.value());
                        if spec.panic_on.contains(&event.id.value()) {
                            panic!("scripted panic for event {}", event.id);
                        }
                        if spec.fail_on.contains(&event.id.value()) {
                            return Err(format!("scripted failure for event {}", event.id).into());
                        }
                        Ok(())
                    },
                    filter,
                    None,
                    stop_on_error,
                )?;
            }
        }
        Ok(())
    }
}

/// Module whose registration always fails.
pub struct BrokenModule;

impl PluginModule for BrokenModule {
    fn register_callbacks(
        &self,
        _registrar: &mut Registrar<'_>,
        _options: &serde_json::Value,
    ) -> Result<(), RegisterError> {
        Err(RegisterError::Options("broken on purpose".to_string()))
    }
}

/// Everything a test needs to drive plugins and engines with fakes.
pub struct TestEnv {
    pub env: PluginEnv,
    pub upstream: FakeUpstream,
    pub factory: FakeUpstreamFactory,
    pub sink: FakeErrorSink,
    pub clock: FakeClock,
}

/// Build a [`PluginEnv`] wired to fakes. The clock starts at
/// `test_epoch()`.
pub fn test_env(registry: ModuleRegistry) -> TestEnv {
    let clock = FakeClock::new(test_epoch());
    let factory = FakeUpstreamFactory::default();
    let sink = FakeErrorSink::new();
    let env = PluginEnv {
        registry: Arc::new(registry),
        factory: Arc::new(factory.clone()),
        sink: Arc::new(sink.clone()),
        clock: Arc::new(clock.clone()),
        timing: None,
        plugin_log_dir: None,
        batch_mode: false,
        use_session_uuid: false,
    };
    TestEnv {
        upstream: factory.upstream().clone(),
        env,
        factory,
        sink,
        clock,
    }
}

/// Write a plugin manifest naming `module` and return its path.
pub fn write_manifest(dir: &Path, basename: &str, module: &str) -> PathBuf {
    let path = dir.join(basename);
    std::fs::write(&path, format!("module = \"{module}\"\n")).unwrap();
    path
}

/// Bump a manifest's mtime so the next load reloads it.
pub fn touch(path: &Path) {
    let file = std::fs::OpenOptions::new().append(true).open(path).unwrap();
    let bumped = std::time::SystemTime::now() + std::time::Duration::from_secs(2);
    file.set_modified(bumped).unwrap();
}
