// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-instance pid file.
//!
//! The daemon assumes a single active instance; the pid file carries an
//! exclusive advisory lock so a second `foreground` run refuses to
//! start instead of double-dispatching events. The external watchdog
//! reads the pid from it.

use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Held for the lifetime of the daemon; the lock releases on drop.
pub struct PidFile {
    // NOTE(lifetime): Held to maintain the exclusive file lock
    #[allow(dead_code)]
    file: File,
    path: PathBuf,
}

impl PidFile {
    /// Acquire the lock and write our pid. `Ok(None)` means another
    /// instance holds it.
    pub fn acquire(path: &Path) -> std::io::Result<Option<Self>> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
        if file.try_lock_exclusive().is_err() {
            return Ok(None);
        }
        file.set_len(0)?;
        writeln!(file, "{}", std::process::id())?;
        file.flush()?;
        Ok(Some(Self {
            file,
            path: path.to_path_buf(),
        }))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for PidFile {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

#[cfg(test)]
#[path = "pidfile_tests.rs"]
mod tests;
