// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Built-in plugin modules shipped with the daemon.
//!
//! Deployments embedding relay as a library register their own modules
//! on top of these; the `event_log` module doubles as a smoke-test
//! plugin and as the reference module implementation.

use relay_engine::{ModuleRegistry, PluginModule, RegisterError, Registrar};
use std::sync::Arc;

/// Logs every matching event at info level through the plugin logger.
///
/// Manifest options: `script_name` / `script_key` override the
/// credentials of the module's upstream connection.
pub struct EventLogModule;

impl PluginModule for EventLogModule {
    fn register_callbacks(
        &self,
        registrar: &mut Registrar<'_>,
        options: &serde_json::Value,
    ) -> Result<(), RegisterError> {
        let script_name = options
            .get("script_name")
            .and_then(serde_json::Value::as_str)
            .unwrap_or("relay-event-log")
            .to_string();
        let script_key = options
            .get("script_key")
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default()
            .to_string();

        let single = registrar.register_callback(
            &script_name,
            &script_key,
            "log_event",
            |_upstream, logger, event, _args| {
                logger.info(&event.log_summary());
                Ok(())
            },
            None,
            None,
            false,
        );
        match single {
            Err(RegisterError::BatchModeRequired) => registrar.register_batch_callback(
                &script_name,
                &script_key,
                "log_events",
                |_upstream, logger, events, _args| {
                    for event in events {
                        logger.info(&event.log_summary());
                    }
                    Ok(())
                },
                None,
                None,
                false,
            ),
            other => other,
        }
    }
}

/// Registry with the daemon's built-in modules.
pub fn builtin_registry() -> ModuleRegistry {
    let mut registry = ModuleRegistry::new();
    registry.register("event_log", Arc::new(EventLogModule));
    registry
}

#[cfg(test)]
#[path = "modules_tests.rs"]
mod tests;
