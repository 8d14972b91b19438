// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! First start with no cursor file.

use crate::prelude::*;
use relay_core::EventId;
use relay_storage::{CollectionCursors, CursorMap, PluginCursor};

#[test]
fn fresh_daemon_seeds_every_plugin_at_the_upstream_head() {
    let mut h = Harness::with_manifests(recording(), &["audit.toml", "notify.toml"]);
    h.push(100);

    h.engine.start().unwrap();

    assert_eq!(h.last_id("audit.toml"), Some(100));
    assert_eq!(h.last_id("notify.toml"), Some(100));
    // Nothing was dispatched, and the seed was persisted.
    assert!(h.journal.entries().is_empty());
    assert_eq!(h.persisted_last_id("audit.toml"), Some(100));
    assert_eq!(h.persisted_last_id("notify.toml"), Some(100));
}

#[test]
fn seeded_daemon_only_sees_events_after_the_head() {
    let mut h = Harness::new(recording());
    h.push(100);
    h.engine.start().unwrap();

    h.push(101);
    h.engine.poll_once().unwrap();

    assert_eq!(h.dispatched("audit"), vec![101]);
    assert_eq!(h.last_id("audit.toml"), Some(101));
}

#[test]
fn a_failed_plugin_keeps_its_place_instead_of_being_reseeded() {
    let mut h = Harness::new(recording());
    // A manifest naming an unregistered module: the plugin loads
    // inactive, but the cursor persisted by an earlier run must
    // survive so no events are skipped once it recovers.
    std::fs::write(
        h.plugin_dir().join("broken.toml"),
        "module = \"unregistered\"\n",
    )
    .unwrap();
    let mut cursors = CollectionCursors::new();
    cursors.insert("broken".to_string(), PluginCursor::seed(EventId::new(500)));
    let mut map = CursorMap::new();
    map.set(h.plugin_dir().to_string_lossy().into_owned(), cursors);
    relay_storage::save(&h.cursor_path, &map).unwrap();
    h.push(600);

    h.engine.start().unwrap();
    h.engine.poll_once().unwrap();

    // The sibling active plugin is unseeded, but that must not trigger
    // a head reseed over the preserved cursor.
    assert_eq!(h.last_id("broken.toml"), Some(500));
    assert_eq!(h.last_id("audit.toml"), None);
    assert!(h.journal.entries().is_empty());
    assert_eq!(h.persisted_last_id("broken.toml"), Some(500));
}
