// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! External collaborators of the Relay event daemon, behind traits:
//! the upstream event log, the secret store, and the error-report sink.

pub mod report;
pub mod secrets;
pub mod upstream;

pub use report::{ErrorReport, ErrorSink, ReportLevel, TracingErrorSink};
pub use secrets::{CachingSecretStore, EnvSecretStore, SecretError, SecretStore};
pub use upstream::{
    Credentials, HttpUpstream, HttpUpstreamFactory, UpstreamClient, UpstreamError,
    UpstreamFactory,
};

#[cfg(any(test, feature = "test-support"))]
pub use report::FakeErrorSink;
#[cfg(any(test, feature = "test-support"))]
pub use secrets::FakeSecretStore;
#[cfg(any(test, feature = "test-support"))]
pub use upstream::{FakeUpstream, FakeUpstreamFactory};
