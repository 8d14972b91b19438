// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Relay daemon (relayd)
//!
//! The shell around the dispatch engine: configuration, logging setup,
//! the systemd service helper, signal handling, and the supervisor
//! that keeps the engine loop alive.

pub mod config;
pub mod logging;
pub mod modules;
pub mod pidfile;
pub mod service;
pub mod supervisor;

pub use config::{Config, ConfigError};
pub use pidfile::PidFile;
pub use supervisor::Supervisor;
