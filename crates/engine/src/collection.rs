// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A directory of plugins.
//!
//! Iteration order over plugins is the lexicographic sort of their
//! basenames, so dispatch order is reproducible across runs.

use crate::env::PluginEnv;
use crate::error::EngineError;
use crate::plugin::Plugin;
use relay_core::{Event, EventId};
use relay_storage::CollectionCursors;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{error, warn};

/// How to seed a collection's cursors.
#[derive(Debug, Clone)]
pub enum CursorSeed {
    /// Seed every stateless plugin at this id with an empty backlog.
    /// A plugin that already carries a cursor keeps it, active or not:
    /// a deactivated plugin preserves its place across a failed reload
    /// and must not be reseeded out from under it.
    All(EventId),
    /// Per-plugin cursors. Names without a matching plugin are kept
    /// around until that plugin appears.
    Map(CollectionCursors),
}

/// A group of plugin files in one location on disk.
pub struct Collection {
    path: PathBuf,
    env: PluginEnv,
    plugins: BTreeMap<String, Plugin>,
    state_data: CollectionCursors,
}

impl Collection {
    pub fn new(env: &PluginEnv, path: &Path) -> Result<Self, EngineError> {
        if !path.is_dir() {
            return Err(EngineError::InvalidPluginPath {
                path: path.display().to_string(),
            });
        }
        Ok(Self {
            path: path.to_path_buf(),
            env: env.clone(),
            plugins: BTreeMap::new(),
            state_data: CollectionCursors::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The collection path as it is keyed in the persisted cursor map.
    pub fn path_key(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// True when any plugin here, active or not, carries cursor state.
    pub fn has_state(&self) -> bool {
        self.plugins
            .values()
            .any(|plugin| plugin.cursor().has_state())
    }

    pub fn plugins(&self) -> impl Iterator<Item = &Plugin> {
        self.plugins.values()
    }

    pub fn plugin(&self, basename: &str) -> Option<&Plugin> {
        self.plugins.get(basename)
    }

    #[cfg(any(test, feature = "test-support"))]
    pub fn plugin_mut(&mut self, basename: &str) -> Option<&mut Plugin> {
        self.plugins.get_mut(basename)
    }

    /// Scan the directory: pick up new manifests, refresh known ones,
    /// drop plugins whose file disappeared. A freshly discovered plugin
    /// inherits any cursor retained for its name.
    pub fn load(&mut self) {
        let entries = match std::fs::read_dir(&self.path) {
            Ok(entries) => entries,
            Err(err) => {
                error!(
                    "Could not list plugin directory {}: {err}",
                    self.path.display()
                );
                return;
            }
        };

        let mut keep: BTreeMap<String, Plugin> = BTreeMap::new();
        for entry in entries.flatten() {
            let basename = entry.file_name().to_string_lossy().into_owned();
            if !basename.ends_with(".toml") || basename.starts_with('.') {
                continue;
            }

            let mut plugin = match self.plugins.remove(&basename) {
                Some(plugin) => plugin,
                None => match Plugin::new(&self.env, &self.path.join(&basename)) {
                    Ok(mut plugin) => {
                        if let Some(cursor) = self.state_data.get(plugin.name()) {
                            plugin.set_cursor(cursor.clone());
                        }
                        plugin
                    }
                    Err(err) => {
                        warn!("Skipping plugin entry {basename}: {err}");
                        continue;
                    }
                },
            };
            plugin.load();
            keep.insert(basename, plugin);
        }
        self.plugins = keep;
    }

    /// Dispatch one event to every active plugin, in basename order.
    pub fn process(&mut self, event: &Event) {
        for plugin in self.plugins.values_mut() {
            if plugin.is_active() {
                plugin.process(event);
            } else {
                plugin.logger().debug("Skipping: inactive.");
            }
        }
    }

    /// Dispatch a batch to every active plugin, in basename order.
    pub fn process_batch(&mut self, events: &[Event]) {
        for plugin in self.plugins.values_mut() {
            if plugin.is_active() {
                plugin.process_batch(events);
            } else {
                plugin.logger().debug("Skipping: inactive.");
            }
        }
    }

    pub fn set_state(&mut self, seed: CursorSeed) {
        match seed {
            CursorSeed::All(id) => {
                for plugin in self.plugins.values_mut() {
                    if !plugin.cursor().has_state() {
                        plugin.seed_cursor(id);
                    }
                    self.state_data
                        .insert(plugin.name().to_string(), plugin.cursor());
                }
            }
            CursorSeed::Map(map) => {
                self.state_data = map;
                for plugin in self.plugins.values_mut() {
                    if let Some(cursor) = self.state_data.get(plugin.name()) {
                        plugin.set_cursor(cursor.clone());
                    }
                }
            }
        }
    }

    /// Refresh the cursor map from the current plugins and return it.
    pub fn get_state(&mut self) -> CollectionCursors {
        for plugin in self.plugins.values() {
            self.state_data
                .insert(plugin.name().to_string(), plugin.cursor());
        }
        self.state_data.clone()
    }

    /// Minimum next-unprocessed id over active plugins.
    pub fn next_unprocessed_event_id(&mut self) -> Option<EventId> {
        let mut next: Option<EventId> = None;
        for plugin in self.plugins.values_mut() {
            if !plugin.is_active() {
                continue;
            }
            if let Some(id) = plugin.next_unprocessed_event_id() {
                next = Some(match next {
                    Some(current) if current < id => current,
                    _ => id,
                });
            }
        }
        next
    }
}

#[cfg(test)]
#[path = "collection_tests.rs"]
mod tests;
