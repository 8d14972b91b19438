// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory form of the persisted cursor map.

use chrono::{DateTime, Utc};
use relay_core::EventId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Dispatch position of one plugin.
///
/// `last_id` is the highest event id the plugin has fully acknowledged;
/// `backlog` maps each skipped id to the wall-clock instant at which the
/// daemon stops waiting for it to appear upstream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PluginCursor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_id: Option<EventId>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub backlog: BTreeMap<EventId, DateTime<Utc>>,
}

impl PluginCursor {
    /// Cursor starting at `id` with an empty backlog.
    pub fn seed(id: EventId) -> Self {
        Self {
            last_id: Some(id),
            backlog: BTreeMap::new(),
        }
    }

    /// True once the plugin has acknowledged at least one event.
    pub fn has_state(&self) -> bool {
        self.last_id.is_some() || !self.backlog.is_empty()
    }
}

/// Cursors of every plugin in one collection, keyed by plugin name.
pub type CollectionCursors = BTreeMap<String, PluginCursor>;

/// The durable commit record: collection path → plugin name → cursor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CursorMap {
    pub collections: BTreeMap<String, CollectionCursors>,
}

impl CursorMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, collection_path: &str) -> Option<&CollectionCursors> {
        self.collections.get(collection_path)
    }

    pub fn set(&mut self, collection_path: impl Into<String>, cursors: CollectionCursors) {
        self.collections.insert(collection_path.into(), cursors);
    }

    /// True when no plugin anywhere has acknowledged anything.
    pub fn is_empty(&self) -> bool {
        !self
            .collections
            .values()
            .flat_map(|cursors| cursors.values())
            .any(PluginCursor::has_state)
    }

    /// Highest cursor recorded for each plugin name across all
    /// collections. Used to re-adopt state when a plugin directory moves.
    pub fn max_cursors_by_name(&self) -> BTreeMap<String, PluginCursor> {
        let mut best: BTreeMap<String, PluginCursor> = BTreeMap::new();
        for cursors in self.collections.values() {
            for (name, cursor) in cursors {
                match best.get(name) {
                    Some(existing) if existing.last_id >= cursor.last_id => {}
                    _ => {
                        best.insert(name.clone(), cursor.clone());
                    }
                }
            }
        }
        best
    }
}

#[cfg(test)]
#[path = "cursor_tests.rs"]
mod tests;
