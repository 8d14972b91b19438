// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The smallest dispatch unit: a user function behind an event filter.
//!
//! Every failure of user code is contained here. An `Err` return is
//! captured, logged, and reported; when the callback was registered
//! with `stop_on_error` it deactivates itself and later events skip
//! it. A panic is the plugin-fatal case: the whole plugin deactivates
//! and the cursor does not advance for the event that triggered it.

use crate::logger::{PluginLogger, TimingRecord};
use relay_adapters::{ErrorReport, ReportLevel, UpstreamClient};
use relay_core::{Event, EventFilter};
use std::backtrace::Backtrace;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use crate::env::PluginEnv;

/// Error returned by user callback code.
pub type CallbackError = Box<dyn std::error::Error + Send + Sync>;

/// Result of one user callback invocation.
pub type CallbackResult = Result<(), CallbackError>;

/// Per-event user function: `(upstream, logger, event, args)`.
pub type EventCallbackFn =
    Arc<dyn Fn(&dyn UpstreamClient, &PluginLogger, &Event, &serde_json::Value) -> CallbackResult + Send + Sync>;

/// Batch user function: receives the already-filtered, non-empty batch.
pub type BatchCallbackFn = Arc<
    dyn Fn(&dyn UpstreamClient, &PluginLogger, &[Event], &serde_json::Value) -> CallbackResult + Send + Sync,
>;

pub(crate) enum CallbackKind {
    Single(EventCallbackFn),
    Batch(BatchCallbackFn),
}

/// What a dispatch attempt means for the rest of the plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Keep going with later callbacks.
    Continue,
    /// User code panicked; the owning plugin must deactivate and skip
    /// the remaining callbacks for this event.
    PluginFatal,
}

/// A registered callback of one plugin.
pub struct Callback {
    name: String,
    plugin_name: String,
    kind: CallbackKind,
    upstream: Arc<dyn UpstreamClient>,
    logger: PluginLogger,
    filter: EventFilter,
    args: serde_json::Value,
    stop_on_error: bool,
    active: bool,
    env: PluginEnv,
}

impl Callback {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        name: &str,
        kind: CallbackKind,
        upstream: Arc<dyn UpstreamClient>,
        logger: PluginLogger,
        filter: EventFilter,
        args: serde_json::Value,
        stop_on_error: bool,
        env: PluginEnv,
    ) -> Self {
        Self {
            name: name.to_string(),
            plugin_name: logger.plugin_name().to_string(),
            kind,
            upstream,
            logger,
            filter,
            args,
            stop_on_error,
            active: true,
            env,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Should events still be passed to this callback?
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn stop_on_error(&self) -> bool {
        self.stop_on_error
    }

    /// True when the filter accepts `event`.
    pub fn can_process(&self, event: &Event) -> bool {
        self.filter.matches(event)
    }

    /// Dispatch one event to the user function.
    pub fn process(&mut self, event: &Event) -> DispatchOutcome {
        let CallbackKind::Single(user_fn) = &self.kind else {
            self.logger
                .warn(&format!("Callback {} expects batches; skipping per-event dispatch.", self.name));
            return DispatchOutcome::Continue;
        };
        let user_fn = Arc::clone(user_fn);

        if self.env.use_session_uuid {
            self.upstream.set_session_uuid(event.session_uuid.as_deref());
        }

        let start = self.env.clock.now();
        let result = std::panic::catch_unwind(AssertUnwindSafe(|| {
            user_fn(self.upstream.as_ref(), &self.logger, event, &self.args)
        }));
        let end = self.env.clock.now();

        let (error, outcome) = self.settle(result, &event.id.to_string());
        self.emit_timing(event, start, end, error);
        outcome
    }

    /// Dispatch an already-filtered, non-empty batch.
    pub fn process_batch(&mut self, events: &[Event]) -> DispatchOutcome {
        let CallbackKind::Batch(user_fn) = &self.kind else {
            self.logger
                .warn(&format!("Callback {} expects single events; skipping batch dispatch.", self.name));
            return DispatchOutcome::Continue;
        };
        let user_fn = Arc::clone(user_fn);

        if self.env.use_session_uuid {
            if let Some(last) = events.last() {
                self.upstream.set_session_uuid(last.session_uuid.as_deref());
            }
        }

        let start = self.env.clock.now();
        let result = std::panic::catch_unwind(AssertUnwindSafe(|| {
            user_fn(self.upstream.as_ref(), &self.logger, events, &self.args)
        }));
        let end = self.env.clock.now();

        let ids = events
            .iter()
            .map(|e| e.id.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        let (error, outcome) = self.settle(result, &ids);
        for event in events {
            self.emit_timing(event, start, end, error);
        }
        outcome
    }

    /// Translate the raw invocation result into logs, reports, and the
    /// dispatch outcome. Returns `(had_error, outcome)`.
    fn settle(
        &mut self,
        result: std::thread::Result<CallbackResult>,
        event_ids: &str,
    ) -> (bool, DispatchOutcome) {
        match result {
            Ok(Ok(())) => (false, DispatchOutcome::Continue),
            Ok(Err(err)) => {
                let backtrace = Backtrace::force_capture();
                let message = format!(
                    "An error occurred processing event {event_ids}: {err}\n\nBacktrace:\n{backtrace}"
                );
                self.logger.critical(&message);
                let level = if self.stop_on_error {
                    ReportLevel::Error
                } else {
                    ReportLevel::Warning
                };
                self.report(event_ids, level, &message);
                if self.stop_on_error {
                    self.active = false;
                    self.logger.error(&format!(
                        "Callback {} failed with stop_on_error set; disabling it.",
                        self.name
                    ));
                }
                (true, DispatchOutcome::Continue)
            }
            Err(payload) => {
                let message = format!(
                    "Panic while processing event {event_ids}: {}",
                    panic_message(payload.as_ref())
                );
                self.logger.critical(&message);
                self.report(event_ids, ReportLevel::Error, &message);
                self.active = false;
                (true, DispatchOutcome::PluginFatal)
            }
        }
    }

    fn report(&self, event_ids: &str, level: ReportLevel, message: &str) {
        self.env.sink.report(&ErrorReport {
            plugin_name: self.plugin_name.clone(),
            event_id: event_ids.to_string(),
            stop_on_error: self.stop_on_error,
            level,
            message: message.to_string(),
            recipients: self.logger.recipients(),
        });
    }

    fn emit_timing(
        &self,
        event: &Event,
        start: chrono::DateTime<chrono::Utc>,
        end: chrono::DateTime<chrono::Utc>,
        error: bool,
    ) {
        if let Some(timing) = &self.env.timing {
            timing.record(&TimingRecord {
                event_id: event.id,
                created_at: event.created_at,
                callback: format!("{}.{}", self.plugin_name, self.name),
                start,
                end,
                error,
            });
        }
    }
}

/// Best-effort rendering of a panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
#[path = "callback_tests.rs"]
mod tests;
