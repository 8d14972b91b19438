// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plugin modules and the registration façade handed to them.
//!
//! Plugin code is compiled into the host and registered by name in a
//! [`ModuleRegistry`]; manifests on disk pick a module and feed it
//! options. During (re)load the owning plugin hands the module a
//! [`Registrar`], which is the only surface plugin code gets to see.

use crate::callback::{BatchCallbackFn, Callback, CallbackKind, CallbackResult, EventCallbackFn};
use crate::logger::PluginLogger;
use crate::plugin::Plugin;
use relay_adapters::{Credentials, UpstreamClient, UpstreamError};
use relay_core::{Event, EventFilter};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Errors surfaced to plugin code during registration. Any of these
/// deactivates the plugin until its next successful reload.
#[derive(Debug, Error)]
pub enum RegisterError {
    #[error("could not connect to upstream: {0}")]
    Connect(#[from] UpstreamError),
    #[error("collection is in batch mode; register a batch callback")]
    BatchModeRequired,
    #[error("collection is not in batch mode; register a per-event callback")]
    SingleModeRequired,
    #[error("invalid plugin options: {0}")]
    Options(String),
}

/// A unit of plugin code with a well-known entry point.
pub trait PluginModule: Send + Sync + 'static {
    /// Register zero or more callbacks. `options` is the opaque bag
    /// from the plugin manifest.
    fn register_callbacks(
        &self,
        registrar: &mut Registrar<'_>,
        options: &serde_json::Value,
    ) -> Result<(), RegisterError>;
}

/// Named plugin modules available to manifests.
#[derive(Default)]
pub struct ModuleRegistry {
    modules: HashMap<String, Arc<dyn PluginModule>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, module: Arc<dyn PluginModule>) {
        self.modules.insert(name.into(), module);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn PluginModule>> {
        self.modules.get(name).cloned()
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.modules.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Registration façade wrapping one plugin.
///
/// Exposes exactly the logger, the error-mail override, and callback
/// registration; everything else about the plugin stays private.
pub struct Registrar<'a> {
    plugin: &'a mut Plugin,
}

impl<'a> Registrar<'a> {
    pub(crate) fn new(plugin: &'a mut Plugin) -> Self {
        Self { plugin }
    }

    /// The logger configured for this plugin.
    pub fn logger(&self) -> PluginLogger {
        self.plugin.logger().clone()
    }

    /// Override where this plugin's captured failures are addressed.
    /// `None` restores the daemon-wide default.
    pub fn set_emails(&mut self, recipients: Option<Vec<String>>) {
        self.plugin.logger().set_recipients(recipients);
    }

    /// Register a per-event callback bound to its own upstream
    /// connection under the given script credentials.
    #[allow(clippy::too_many_arguments)]
    pub fn register_callback<F>(
        &mut self,
        script_name: &str,
        script_key: &str,
        name: &str,
        callback: F,
        match_events: Option<EventFilter>,
        args: Option<serde_json::Value>,
        stop_on_error: bool,
    ) -> Result<(), RegisterError>
    where
        F: Fn(&dyn UpstreamClient, &PluginLogger, &Event, &serde_json::Value) -> CallbackResult
            + Send
            + Sync
            + 'static,
    {
        if self.plugin.env().batch_mode {
            return Err(RegisterError::BatchModeRequired);
        }
        let user_fn: EventCallbackFn = Arc::new(callback);
        self.add(
            script_name,
            script_key,
            name,
            CallbackKind::Single(user_fn),
            match_events,
            args,
            stop_on_error,
        )
    }

    /// Register a batch callback; only valid in batch mode.
    #[allow(clippy::too_many_arguments)]
    pub fn register_batch_callback<F>(
        &mut self,
        script_name: &str,
        script_key: &str,
        name: &str,
        callback: F,
        match_events: Option<EventFilter>,
        args: Option<serde_json::Value>,
        stop_on_error: bool,
    ) -> Result<(), RegisterError>
    where
        F: Fn(&dyn UpstreamClient, &PluginLogger, &[Event], &serde_json::Value) -> CallbackResult
            + Send
            + Sync
            + 'static,
    {
        if !self.plugin.env().batch_mode {
            return Err(RegisterError::SingleModeRequired);
        }
        let user_fn: BatchCallbackFn = Arc::new(callback);
        self.add(
            script_name,
            script_key,
            name,
            CallbackKind::Batch(user_fn),
            match_events,
            args,
            stop_on_error,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn add(
        &mut self,
        script_name: &str,
        script_key: &str,
        name: &str,
        kind: CallbackKind,
        match_events: Option<EventFilter>,
        args: Option<serde_json::Value>,
        stop_on_error: bool,
    ) -> Result<(), RegisterError> {
        let env = self.plugin.env().clone();
        let upstream = env
            .factory
            .connect(&Credentials::new(script_name, script_key))?;
        let callback = Callback::new(
            name,
            kind,
            upstream,
            self.plugin.logger().clone(),
            match_events.unwrap_or_default(),
            args.unwrap_or(serde_json::Value::Null),
            stop_on_error,
            env,
        );
        self.plugin.add_callback(callback);
        Ok(())
    }
}

#[cfg(test)]
#[path = "registrar_tests.rs"]
mod tests;
