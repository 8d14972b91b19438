// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared environment handed from the engine down to collections,
//! plugins, and callbacks.

use crate::logger::TimingLogger;
use crate::registrar::ModuleRegistry;
use relay_adapters::{ErrorSink, UpstreamFactory};
use relay_core::Clock;
use std::path::PathBuf;
use std::sync::Arc;

/// Capabilities a plugin needs at load and dispatch time.
#[derive(Clone)]
pub struct PluginEnv {
    /// Named plugin modules compiled into the host.
    pub registry: Arc<ModuleRegistry>,
    /// Builds per-callback upstream connections.
    pub factory: Arc<dyn UpstreamFactory>,
    /// Receives captured callback failures.
    pub sink: Arc<dyn ErrorSink>,
    /// Wall clock for backlog-timeout decisions and timing records.
    pub clock: Arc<dyn Clock>,
    /// Timing log, when enabled.
    pub timing: Option<TimingLogger>,
    /// Directory for per-plugin log files, when enabled.
    pub plugin_log_dir: Option<PathBuf>,
    /// Collections dispatch whole batches instead of single events.
    pub batch_mode: bool,
    /// Propagate event session uuids to upstream connections.
    pub use_session_uuid: bool,
}
