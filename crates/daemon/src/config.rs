// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration, read from `relayd.conf`.
//!
//! The file is searched in the directory of the running executable,
//! then `/etc`, then the working directory; the first hit wins and a
//! miss is fatal at startup. Credentials left out of the file resolve
//! through the secret store, cached for the process lifetime.

use relay_adapters::{Credentials, SecretError, SecretStore};
use relay_engine::EngineConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Basename of the configuration file.
pub const CONFIG_BASENAME: &str = "relayd.conf";

/// Secret-store key for the upstream server URL when the config file
/// leaves `server` empty.
pub const SERVER_SECRET_NAME: &str = "relay-host";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found, searched {searched}")]
    NotFound { searched: String },
    #[error("could not read config at {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("could not parse config at {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: Box<toml::de::Error>,
    },
    #[error(transparent)]
    Secret(#[from] SecretError),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub upstream: UpstreamSection,
    pub daemon: DaemonSection,
    pub plugins: PluginsSection,
    #[serde(default)]
    pub emails: Option<EmailSection>,
    #[serde(default)]
    pub sentry: Option<SentrySection>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamSection {
    /// Server URL; empty means "resolve from the secret store".
    #[serde(default)]
    pub server: String,
    /// Script name of the engine's own connection.
    pub name: String,
    /// Script key; empty means "look `name` up in the secret store".
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub proxy_server: String,
    #[serde(default)]
    pub use_session_uuid: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DaemonSection {
    /// Where the cursor map is persisted.
    pub event_id_file: PathBuf,
    #[serde(default = "default_max_conn_retries")]
    pub max_conn_retries: u32,
    /// Seconds.
    #[serde(default = "default_conn_retry_sleep")]
    pub conn_retry_sleep: u64,
    /// Seconds.
    #[serde(default = "default_fetch_interval")]
    pub fetch_interval: u64,
    /// Supervisor re-entry delay, seconds.
    #[serde(default = "default_conn_sleep")]
    pub conn_sleep: u64,
    #[serde(default = "default_max_event_batch_size")]
    pub max_event_batch_size: usize,
    /// 0 = one root log file; 1 = per-plugin log files as well.
    #[serde(default)]
    pub log_mode: u8,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_file")]
    pub log_file: String,
    /// Created if absent.
    #[serde(default)]
    pub log_path: Option<PathBuf>,
    #[serde(default)]
    pub timing_log: bool,
    #[serde(default = "default_service_name")]
    pub service_name: String,
    #[serde(default)]
    pub batch_plugin: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PluginsSection {
    pub paths: Vec<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailSection {
    pub server: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub use_tls: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SentrySection {
    pub dsn: String,
}

fn default_max_conn_retries() -> u32 {
    5
}
fn default_conn_retry_sleep() -> u64 {
    60
}
fn default_fetch_interval() -> u64 {
    5
}
fn default_conn_sleep() -> u64 {
    30
}
fn default_max_event_batch_size() -> usize {
    500
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_file() -> String {
    "relayd.log".to_string()
}
fn default_service_name() -> String {
    "relayd".to_string()
}
fn default_smtp_port() -> u16 {
    25
}

/// Directories searched for `relayd.conf`, in order.
pub fn search_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            paths.push(dir.to_path_buf());
        }
    }
    paths.push(PathBuf::from("/etc"));
    if let Ok(cwd) = std::env::current_dir() {
        paths.push(cwd);
    }
    paths
}

/// First `relayd.conf` found under `dirs`.
pub fn find_config_in(dirs: &[PathBuf]) -> Result<PathBuf, ConfigError> {
    for dir in dirs {
        let candidate = dir.join(CONFIG_BASENAME);
        if candidate.exists() {
            return Ok(candidate);
        }
    }
    Err(ConfigError::NotFound {
        searched: dirs
            .iter()
            .map(|d| d.display().to_string())
            .collect::<Vec<_>>()
            .join(", "),
    })
}

impl Config {
    /// Parse the given file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source: Box::new(source),
        })
    }

    /// Locate and parse the configuration using the default search
    /// order. Returns the config and where it was found.
    pub fn load_default() -> Result<(Self, PathBuf), ConfigError> {
        let path = find_config_in(&search_paths())?;
        Ok((Self::load(&path)?, path))
    }

    /// The upstream server URL, falling back to the secret store when
    /// the config file leaves it empty.
    pub fn resolve_server(&self, secrets: &dyn SecretStore) -> Result<String, ConfigError> {
        if !self.upstream.server.is_empty() {
            return Ok(self.upstream.server.clone());
        }
        Ok(secrets.lookup(SERVER_SECRET_NAME)?)
    }

    /// The engine's own credentials. The secret-store fallback is
    /// gated on `key` being absent, and looks the script `name` up.
    pub fn resolve_credentials(
        &self,
        secrets: &dyn SecretStore,
    ) -> Result<Credentials, ConfigError> {
        let key = if self.upstream.key.is_empty() {
            secrets.lookup(&self.upstream.name)?
        } else {
            self.upstream.key.clone()
        };
        Ok(Credentials::new(&self.upstream.name, key))
    }

    pub fn proxy_server(&self) -> Option<String> {
        let proxy = self.upstream.proxy_server.trim();
        if proxy.is_empty() {
            None
        } else {
            Some(proxy.to_string())
        }
    }

    /// Resolve a log file name against `log_path`, creating the
    /// directory when needed.
    pub fn log_file_path(&self, basename: &str) -> PathBuf {
        match &self.daemon.log_path {
            Some(dir) => {
                if !dir.exists() {
                    let _ = std::fs::create_dir_all(dir);
                }
                dir.join(basename)
            }
            None => PathBuf::from(basename),
        }
    }

    /// `<log file>.timing` when the timing log is on.
    pub fn timing_log_path(&self) -> Option<PathBuf> {
        if !self.daemon.timing_log {
            return None;
        }
        Some(self.log_file_path(&format!("{}.timing", self.daemon.log_file)))
    }

    /// Per-plugin log directory, in log mode 1.
    pub fn plugin_log_dir(&self) -> Option<PathBuf> {
        if self.daemon.log_mode == 1 {
            self.daemon.log_path.clone()
        } else {
            None
        }
    }

    /// Where the single-instance pid file lives.
    pub fn pid_file_path(&self) -> PathBuf {
        self.log_file_path("relayd.pid")
    }

    /// Engine tuning derived from this config.
    pub fn engine_config(&self) -> EngineConfig {
        let mut engine = EngineConfig::new(
            self.plugins.paths.clone(),
            self.daemon.event_id_file.clone(),
        );
        engine.max_conn_retries = self.daemon.max_conn_retries;
        engine.conn_retry_sleep = Duration::from_secs(self.daemon.conn_retry_sleep);
        engine.fetch_interval = Duration::from_secs(self.daemon.fetch_interval);
        engine.max_event_batch_size = self.daemon.max_event_batch_size;
        engine.batch_mode = self.daemon.batch_plugin;
        engine.use_session_uuid = self.upstream.use_session_uuid;
        engine.timing_log = self.timing_log_path();
        engine.plugin_log_dir = self.plugin_log_dir();
        engine
    }

    pub fn conn_sleep(&self) -> Duration {
        Duration::from_secs(self.daemon.conn_sleep)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
