// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the dispatch engine

use relay_storage::CursorStoreError;
use thiserror::Error;

/// Errors that abort engine startup. Everything recoverable is handled
/// in place and logged instead.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid plugin path: {path}")]
    InvalidPluginPath { path: String },
    #[error("plugin is not a file: {path}")]
    PluginNotAFile { path: String },
    #[error("could not load cursor data: {0}")]
    Storage(#[from] CursorStoreError),
}
