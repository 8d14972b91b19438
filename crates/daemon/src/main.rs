// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! relayd - Relay event daemon
//!
//! Single binary: `start-service` installs and starts the systemd
//! unit, `start`/`stop`/`restart` drive it, and `foreground` runs the
//! engine in the current process (which is what the unit itself does).

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use relay_adapters::{
    CachingSecretStore, EnvSecretStore, HttpUpstreamFactory, TracingErrorSink, UpstreamFactory,
};
use relay_core::SystemClock;
use relay_daemon::{logging, modules, service, Config, PidFile, Supervisor};
use relay_engine::Engine;
use std::sync::Arc;
use tracing::info;

/// Prefix of the environment variables backing the secret store.
const SECRET_ENV_PREFIX: &str = "RELAY_SECRET";

#[derive(Parser)]
#[command(name = "relayd", version, about = "Relay event daemon")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Install the service unit if absent, then start the service
    StartService,
    /// Start the installed service
    Start,
    /// Stop the service
    Stop,
    /// Restart the service
    Restart,
    /// Run the engine in this process, logging to stdout
    Foreground,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::StartService => {
            let (config, _) = Config::load_default()?;
            let service_name = &config.daemon.service_name;
            if service::write_service_file(service_name)? {
                service::daemon_reload()?;
            }
            service::systemctl("start", service_name)?;
            Ok(())
        }
        Command::Start => control("start"),
        Command::Stop => control("stop"),
        Command::Restart => control("restart"),
        Command::Foreground => foreground(),
    }
}

fn control(action: &str) -> anyhow::Result<()> {
    let (config, _) = Config::load_default()?;
    service::systemctl(action, &config.daemon.service_name)?;
    Ok(())
}

fn foreground() -> anyhow::Result<()> {
    let (config, config_path) = Config::load_default()?;
    let _log_guard = logging::init(&config, true)?;
    info!("Using configuration at {}", config_path.display());

    let pid_path = config.pid_file_path();
    let Some(_pid_file) = PidFile::acquire(&pid_path)
        .with_context(|| format!("could not acquire pid file {}", pid_path.display()))?
    else {
        bail!("relayd is already running (pid file {} is locked)", pid_path.display());
    };

    let secrets = CachingSecretStore::new(EnvSecretStore::new(SECRET_ENV_PREFIX));
    let server = config.resolve_server(&secrets)?;
    let credentials = config.resolve_credentials(&secrets)?;

    let factory =
        Arc::new(HttpUpstreamFactory::new(server.as_str()).with_proxy(config.proxy_server()));
    let upstream = factory
        .connect(&credentials)
        .with_context(|| format!("could not connect to upstream at {server}"))?;
    info!("Using upstream event log at {server}.");

    let engine = Engine::new(
        config.engine_config(),
        upstream,
        factory,
        Arc::new(modules::builtin_registry()),
        Arc::new(TracingErrorSink),
        Arc::new(SystemClock),
    );

    let mut supervisor = Supervisor::new(engine, config.conn_sleep());
    supervisor.install_signal_handlers()?;
    supervisor.run();
    Ok(())
}
