// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cursor persistence: a versioned, zstd-compressed JSON blob written
//! with atomic whole-file replace.
//!
//! Write ordering is tmp → fsync → rename → directory fsync, so a crash
//! leaves either the previous blob or the new one, never a torn file.
//! On read, a blob that fails to decode falls back to the legacy format:
//! a single ASCII integer on the first line (the last processed id of a
//! daemon generation that kept one cursor for everything).

use crate::cursor::CursorMap;
use relay_core::EventId;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Version written into new cursor blobs.
pub const CURRENT_CURSOR_VERSION: u32 = 1;

// zstd level 3 is a good balance of speed and compression
const COMPRESSION_LEVEL: i32 = 3;

/// Errors from cursor persistence.
#[derive(Debug, Error)]
pub enum CursorStoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("compression error: {0}")]
    Compress(String),
    #[error("unsupported cursor file version: {0}")]
    UnsupportedVersion(u32),
    #[error("cursor file is neither a cursor blob nor a legacy id: {path}")]
    Unrecognized { path: String },
}

/// On-disk envelope around the cursor map.
#[derive(Debug, Serialize, Deserialize)]
struct CursorFile {
    version: u32,
    cursors: CursorMap,
}

/// What a read of the cursor file produced.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadedCursors {
    /// Current format: the full per-collection cursor map.
    Map(CursorMap),
    /// Legacy format: one id that seeds every plugin.
    Legacy(EventId),
}

/// Write the full cursor map in a single atomic replace.
pub fn save(path: &Path, cursors: &CursorMap) -> Result<(), CursorStoreError> {
    let file = CursorFile {
        version: CURRENT_CURSOR_VERSION,
        cursors: cursors.clone(),
    };
    let json = serde_json::to_vec(&file)?;
    let compressed = zstd::encode_all(json.as_slice(), COMPRESSION_LEVEL)
        .map_err(|e| CursorStoreError::Compress(e.to_string()))?;

    let tmp_path = path.with_extension("tmp");
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut tmp = File::create(&tmp_path)?;
    tmp.write_all(&compressed)?;
    tmp.sync_all()?;
    drop(tmp);

    std::fs::rename(&tmp_path, path)?;
    if let Some(parent) = path.parent() {
        File::open(parent)?.sync_all()?;
    }

    debug!(path = %path.display(), bytes = compressed.len(), "wrote cursor file");
    Ok(())
}

/// Read the cursor file, accepting both the current blob and the legacy
/// single-integer format. `Ok(None)` means the file does not exist.
pub fn load(path: &Path) -> Result<Option<LoadedCursors>, CursorStoreError> {
    if !path.exists() {
        return Ok(None);
    }

    let mut raw = Vec::new();
    File::open(path)?.read_to_end(&mut raw)?;

    match decode_blob(&raw) {
        Ok(file) => {
            if file.version > CURRENT_CURSOR_VERSION {
                return Err(CursorStoreError::UnsupportedVersion(file.version));
            }
            Ok(Some(LoadedCursors::Map(file.cursors)))
        }
        Err(_) => match parse_legacy(&raw) {
            Some(id) => Ok(Some(LoadedCursors::Legacy(id))),
            None => Err(CursorStoreError::Unrecognized {
                path: path.display().to_string(),
            }),
        },
    }
}

fn decode_blob(raw: &[u8]) -> Result<CursorFile, CursorStoreError> {
    let json =
        zstd::decode_all(raw).map_err(|e| CursorStoreError::Compress(e.to_string()))?;
    Ok(serde_json::from_slice(&json)?)
}

fn parse_legacy(raw: &[u8]) -> Option<EventId> {
    let text = std::str::from_utf8(raw).ok()?;
    let line = text.lines().next()?.trim();
    if line.is_empty() || !line.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    line.parse::<u64>().ok().map(EventId::new)
}

#[cfg(test)]
#[path = "cursor_file_tests.rs"]
mod tests;
