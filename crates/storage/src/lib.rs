// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Durable cursor storage for the Relay event daemon

mod cursor;
mod cursor_file;

pub use cursor::{CollectionCursors, CursorMap, PluginCursor};
pub use cursor_file::{load, save, CursorStoreError, LoadedCursors, CURRENT_CURSOR_VERSION};
