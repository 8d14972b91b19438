// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tracing setup for the daemon.
//!
//! The engine log goes to a daily-rolling file under `log_path` when
//! one is configured; `foreground` adds a stdout layer on top of it.
//! `RUST_LOG` overrides the configured level.

use crate::config::Config;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

fn env_filter(level: &str) -> EnvFilter {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info")),
    }
}

/// Install the subscriber. Returns the appender guard, which must stay
/// alive for the lifetime of the process when a log file is in play.
pub fn init(config: &Config, to_stdout: bool) -> std::io::Result<Option<WorkerGuard>> {
    let filter = env_filter(&config.daemon.log_level);
    let registry = tracing_subscriber::registry().with(filter);

    match &config.daemon.log_path {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::daily(dir, &config.daemon.log_file);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let file_layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false);
            if to_stdout {
                registry
                    .with(file_layer)
                    .with(tracing_subscriber::fmt::layer())
                    .init();
            } else {
                registry.with(file_layer).init();
            }
            Ok(Some(guard))
        }
        None => {
            if to_stdout {
                registry.with(tracing_subscriber::fmt::layer()).init();
            }
            Ok(None)
        }
    }
}
