// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Relay event-dispatch engine

mod callback;
mod collection;
mod engine;
mod env;
mod error;
mod logger;
mod plugin;
mod registrar;
mod stop;

pub use callback::{Callback, CallbackError, CallbackResult, DispatchOutcome};
pub use collection::{Collection, CursorSeed};
pub use engine::{Engine, EngineConfig};
pub use env::PluginEnv;
pub use error::EngineError;
pub use logger::{PluginLogger, TimingLogger};
pub use plugin::Plugin;
pub use registrar::{ModuleRegistry, PluginModule, RegisterError, Registrar};
pub use stop::StopToken;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
