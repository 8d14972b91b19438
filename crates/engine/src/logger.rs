// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-plugin log sinks and the callback timing log.
//!
//! Each plugin gets an explicit logger capability built at load time
//! and passed into its callbacks, instead of a process-global logger
//! hierarchy. When a log directory is configured the logger also
//! appends to `plugin.<name>.log`; every message is additionally
//! emitted as a tracing event tagged with the plugin name.
//!
//! Append failures are logged via tracing but never propagate;
//! logging must not break the engine.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use relay_core::{format_delta, EventId};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Logger handed to one plugin and its callbacks.
#[derive(Clone)]
pub struct PluginLogger {
    plugin: String,
    file: Option<Arc<PathBuf>>,
    recipients: Arc<Mutex<Option<Vec<String>>>>,
}

impl PluginLogger {
    pub fn new(plugin: &str, log_dir: Option<&Path>) -> Self {
        Self {
            plugin: plugin.to_string(),
            file: log_dir.map(|dir| Arc::new(dir.join(format!("plugin.{plugin}.log")))),
            recipients: Arc::new(Mutex::new(None)),
        }
    }

    pub fn plugin_name(&self) -> &str {
        &self.plugin
    }

    /// Error-report address override installed via the registrar.
    pub fn recipients(&self) -> Option<Vec<String>> {
        self.recipients.lock().clone()
    }

    pub fn set_recipients(&self, recipients: Option<Vec<String>>) {
        *self.recipients.lock() = recipients;
    }

    pub fn debug(&self, message: &str) {
        tracing::debug!(plugin = %self.plugin, "{message}");
        self.append("DEBUG", message);
    }

    pub fn info(&self, message: &str) {
        tracing::info!(plugin = %self.plugin, "{message}");
        self.append("INFO", message);
    }

    pub fn warn(&self, message: &str) {
        tracing::warn!(plugin = %self.plugin, "{message}");
        self.append("WARNING", message);
    }

    pub fn error(&self, message: &str) {
        tracing::error!(plugin = %self.plugin, "{message}");
        self.append("ERROR", message);
    }

    /// Highest severity: callback failures and load errors.
    pub fn critical(&self, message: &str) {
        tracing::error!(plugin = %self.plugin, critical = true, "{message}");
        self.append("CRITICAL", message);
    }

    fn append(&self, level: &str, message: &str) {
        let Some(path) = &self.file else {
            return;
        };
        if let Err(e) = append_line(path, level, message) {
            tracing::warn!(
                plugin = %self.plugin,
                error = %e,
                "failed to write plugin log"
            );
        }
    }
}

fn append_line(path: &Path, level: &str, message: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    let ts = Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
    writeln!(file, "{ts} {level} {message}")?;
    Ok(())
}

/// One callback invocation, as written to the timing log.
#[derive(Debug, Clone)]
pub struct TimingRecord {
    pub event_id: EventId,
    pub created_at: DateTime<Utc>,
    /// Qualified `<plugin>.<callback>` name.
    pub callback: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub error: bool,
}

/// Append-only log of per-callback dispatch timings.
#[derive(Clone)]
pub struct TimingLogger {
    path: Arc<PathBuf>,
}

impl TimingLogger {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path: Arc::new(path),
        }
    }

    /// Write one record. `duration` is end − start; `delay` is how long
    /// after its creation the event reached the callback.
    pub fn record(&self, record: &TimingRecord) {
        let line = format!(
            "event_id={} created_at={} callback={} start={} end={} duration={} error={} delay={}",
            record.event_id,
            record.created_at.to_rfc3339(),
            record.callback,
            record.start.to_rfc3339(),
            record.end.to_rfc3339(),
            format_delta(record.end - record.start),
            record.error,
            format_delta(record.start - record.created_at),
        );
        if let Err(e) = self.append(&line) {
            tracing::warn!(error = %e, "failed to write timing log");
        }
    }

    fn append(&self, line: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path.as_ref())?;
        writeln!(file, "{line}")?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "logger_tests.rs"]
mod tests;
