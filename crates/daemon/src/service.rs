// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! systemd service helper: unit-file generation and control.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("systemctl {action} {service} exited with {status}")]
    Systemctl {
        action: String,
        service: String,
        status: std::process::ExitStatus,
    },
    #[error("could not determine the daemon executable: {0}")]
    Executable(String),
}

/// Where the unit file for `service_name` lives.
pub fn unit_file_path(service_name: &str) -> PathBuf {
    PathBuf::from(format!("/etc/systemd/system/{service_name}.service"))
}

/// Unit file contents for the given daemon executable. The service
/// runs the `foreground` command; `start`/`stop` on the CLI go through
/// systemctl and end up here.
pub fn unit_file_contents(exe: &Path) -> String {
    let working_directory = exe
        .parent()
        .map(|dir| dir.display().to_string())
        .unwrap_or_else(|| "/".to_string());
    format!(
        "[Unit]\n\
         Description=Relay Event Daemon\n\
         After=multi-user.target\n\
         Conflicts=getty@tty1.service\n\
         \n\
         [Service]\n\
         EnvironmentFile=/etc/environment\n\
         Type=simple\n\
         WorkingDirectory={working_directory}\n\
         ExecStart={} foreground\n\
         StandardInput=tty-force\n\
         \n\
         [Install]\n\
         WantedBy=multi-user.target\n",
        exe.display()
    )
}

/// Write the unit file at `path` unless it already exists. Returns
/// whether a file was created (the caller reloads systemd if so).
pub fn write_service_file_at(path: &Path, exe: &Path) -> Result<bool, ServiceError> {
    if path.exists() {
        return Ok(false);
    }
    let mut file = std::fs::File::create(path)?;
    file.write_all(unit_file_contents(exe).as_bytes())?;
    Ok(true)
}

/// Write the unit file for `service_name` in the systemd unit
/// directory.
pub fn write_service_file(service_name: &str) -> Result<bool, ServiceError> {
    let exe = std::env::current_exe().map_err(|e| ServiceError::Executable(e.to_string()))?;
    write_service_file_at(&unit_file_path(service_name), &exe)
}

/// Run `systemctl <action> <service>`.
pub fn systemctl(action: &str, service: &str) -> Result<(), ServiceError> {
    let status = Command::new("systemctl").arg(action).arg(service).status()?;
    if !status.success() {
        return Err(ServiceError::Systemctl {
            action: action.to_string(),
            service: service.to_string(),
            status,
        });
    }
    Ok(())
}

/// Run `systemctl daemon-reload` after installing a unit file.
pub fn daemon_reload() -> Result<(), ServiceError> {
    let status = Command::new("systemctl").arg("daemon-reload").status()?;
    if !status.success() {
        return Err(ServiceError::Systemctl {
            action: "daemon-reload".to_string(),
            service: String::new(),
            status,
        });
    }
    Ok(())
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
