// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared harness for the behavioral specs.

use relay_adapters::{FakeErrorSink, FakeUpstream, FakeUpstreamFactory};
use relay_core::test_support::{test_epoch, EventBuilder};
use relay_core::{Clock, EventId, FakeClock};
use relay_engine::test_support::{write_manifest, DispatchJournal, ScriptedCallback, ScriptedModule};
use relay_engine::{Engine, EngineConfig, ModuleRegistry};
use relay_storage::LoadedCursors;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// A real engine wired to fakes, plus everything needed to observe it.
pub struct Harness {
    pub engine: Engine,
    pub upstream: FakeUpstream,
    pub journal: DispatchJournal,
    pub clock: FakeClock,
    pub sink: FakeErrorSink,
    pub cursor_path: PathBuf,
    plugins: Vec<(String, Vec<ScriptedCallback>)>,
    plugin_dir: tempfile::TempDir,
    _state_dir: tempfile::TempDir,
}

impl Harness {
    /// One plugin (`audit.toml`) whose module registers `callbacks`.
    pub fn new(callbacks: Vec<ScriptedCallback>) -> Self {
        Self::with_manifests(callbacks, &["audit.toml"])
    }

    /// Several plugins, all registering the same callbacks.
    pub fn with_manifests(callbacks: Vec<ScriptedCallback>, manifests: &[&str]) -> Self {
        Self::with_plugins(
            manifests
                .iter()
                .map(|basename| (basename.to_string(), callbacks.clone()))
                .collect(),
        )
    }

    /// Full control: each plugin file with its own callback script.
    pub fn with_plugins(plugins: Vec<(String, Vec<ScriptedCallback>)>) -> Self {
        let journal = DispatchJournal::new();
        let clock = FakeClock::new(test_epoch());
        let upstream = FakeUpstream::new();
        let sink = FakeErrorSink::new();

        let plugin_dir = tempfile::tempdir().unwrap();
        for (basename, _) in &plugins {
            let module = basename.trim_end_matches(".toml");
            write_manifest(plugin_dir.path(), basename, module);
        }
        let state_dir = tempfile::tempdir().unwrap();
        let cursor_path = state_dir.path().join("relayd.id");

        let engine = build_engine(
            &plugins,
            &journal,
            &clock,
            &upstream,
            &sink,
            plugin_dir.path().to_path_buf(),
            cursor_path.clone(),
        );
        Self {
            engine,
            upstream,
            journal,
            clock,
            sink,
            cursor_path,
            plugins,
            plugin_dir,
            _state_dir: state_dir,
        }
    }

    /// Swap in a fresh engine over the same state, as after a process
    /// restart. The journal, clock, and upstream survive.
    pub fn restart(&mut self) {
        self.engine = build_engine(
            &self.plugins,
            &self.journal,
            &self.clock,
            &self.upstream,
            &self.sink,
            self.plugin_dir.path().to_path_buf(),
            self.cursor_path.clone(),
        );
    }

    /// Record an event upstream, created "now".
    pub fn push(&self, id: u64) {
        self.upstream.push_event(self.fresh_event(id));
    }

    /// Record an event upstream, created `minutes` ago.
    pub fn push_aged(&self, id: u64, minutes: i64) {
        self.upstream.push_event(
            EventBuilder::new(id)
                .created_at(self.clock.now() - chrono::Duration::minutes(minutes))
                .build(),
        );
    }

    pub fn fresh_event(&self, id: u64) -> relay_core::Event {
        EventBuilder::new(id).created_at(self.clock.now()).build()
    }

    /// In-memory cursor of a plugin in the first collection.
    pub fn last_id(&self, basename: &str) -> Option<u64> {
        self.engine.collections()[0]
            .plugin(basename)
            .and_then(|plugin| plugin.cursor().last_id)
            .map(EventId::value)
    }

    /// Persisted cursor of a plugin, read back from the cursor file.
    pub fn persisted_last_id(&self, basename: &str) -> Option<u64> {
        let Some(LoadedCursors::Map(map)) = relay_storage::load(&self.cursor_path).unwrap() else {
            return None;
        };
        let key = self.plugin_dir.path().to_string_lossy().into_owned();
        let name = basename.trim_end_matches(".toml");
        map.get(&key)
            .and_then(|cursors| cursors.get(name))
            .and_then(|cursor| cursor.last_id)
            .map(EventId::value)
    }

    /// Event ids the default `record` callback saw for a plugin.
    pub fn dispatched(&self, plugin: &str) -> Vec<u64> {
        self.journal.ids_for(plugin, "record")
    }

    /// Directory holding the plugin manifests.
    pub fn plugin_dir(&self) -> &std::path::Path {
        self.plugin_dir.path()
    }
}

fn build_engine(
    plugins: &[(String, Vec<ScriptedCallback>)],
    journal: &DispatchJournal,
    clock: &FakeClock,
    upstream: &FakeUpstream,
    sink: &FakeErrorSink,
    plugin_dir: PathBuf,
    cursor_path: PathBuf,
) -> Engine {
    let mut registry = ModuleRegistry::new();
    for (basename, callbacks) in plugins {
        let module = basename.trim_end_matches(".toml");
        registry.register(
            module,
            Arc::new(ScriptedModule::new(journal.clone()).with_callbacks(callbacks.clone())),
        );
    }
    let factory = FakeUpstreamFactory::new(upstream.clone());

    let mut config = EngineConfig::new(vec![plugin_dir], cursor_path);
    config.max_conn_retries = 2;
    config.conn_retry_sleep = Duration::ZERO;
    config.fetch_interval = Duration::ZERO;

    Engine::new(
        config,
        Arc::new(upstream.clone()),
        Arc::new(factory),
        Arc::new(registry),
        Arc::new(sink.clone()),
        Arc::new(clock.clone()),
    )
}

/// The default single recording callback.
pub fn recording() -> Vec<ScriptedCallback> {
    vec![ScriptedCallback::named("record")]
}
