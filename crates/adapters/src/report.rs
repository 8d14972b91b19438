// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error-report sink collaborator.
//!
//! Callback failures are routed here with structured tags so operators
//! can wire them to email, Sentry, or whatever else. The transports
//! themselves live outside this repository; the daemon ships a
//! tracing-backed sink.

use std::sync::Arc;

/// Severity of a report, chosen by the stop-on-error setting of the
/// failing callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportLevel {
    Warning,
    Error,
}

impl std::fmt::Display for ReportLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportLevel::Warning => write!(f, "warning"),
            ReportLevel::Error => write!(f, "error"),
        }
    }
}

/// One captured callback failure.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub plugin_name: String,
    /// Id of the event being processed; a comma list in batch mode.
    pub event_id: String,
    pub stop_on_error: bool,
    pub level: ReportLevel,
    /// Failure message plus captured backtrace.
    pub message: String,
    /// Address override installed by the plugin via `set_emails`.
    pub recipients: Option<Vec<String>>,
}

/// Receives captured callback failures.
pub trait ErrorSink: Send + Sync + 'static {
    fn report(&self, report: &ErrorReport);
}

/// Sink that emits reports as tracing events with the structured tags.
#[derive(Debug, Clone, Default)]
pub struct TracingErrorSink;

impl ErrorSink for TracingErrorSink {
    fn report(&self, report: &ErrorReport) {
        tracing::error!(
            plugin_name = %report.plugin_name,
            event_id = %report.event_id,
            stop_on_error = report.stop_on_error,
            level = %report.level,
            "{}",
            report.message,
        );
    }
}

/// A sink handle shared across callbacks.
pub type SharedErrorSink = Arc<dyn ErrorSink>;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeErrorSink;

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::{ErrorReport, ErrorSink};
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Records every report for assertions.
    #[derive(Clone, Default)]
    pub struct FakeErrorSink {
        reports: Arc<Mutex<Vec<ErrorReport>>>,
    }

    impl FakeErrorSink {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn reports(&self) -> Vec<ErrorReport> {
            self.reports.lock().clone()
        }
    }

    impl ErrorSink for FakeErrorSink {
        fn report(&self, report: &ErrorReport) {
            self.reports.lock().push(report.clone());
        }
    }
}

#[cfg(test)]
#[path = "report_tests.rs"]
mod tests;
