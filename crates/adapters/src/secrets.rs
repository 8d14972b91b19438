// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Secret-store collaborator.
//!
//! Deployments that omit credentials from the config file resolve them
//! through this interface instead. Lookups are cached for the lifetime
//! of the process so plugin reloads do not hammer the store.

use parking_lot::Mutex;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum SecretError {
    #[error("secret not found: {0}")]
    NotFound(String),
    #[error("secret store error: {0}")]
    Store(String),
}

/// Resolves named secrets.
pub trait SecretStore: Send + Sync + 'static {
    fn lookup(&self, name: &str) -> Result<String, SecretError>;
}

/// Secret store backed by environment variables.
///
/// A secret `name` resolves from `<PREFIX>_<NAME>` with the name
/// uppercased and `-`/`.` mapped to `_`.
#[derive(Debug, Clone)]
pub struct EnvSecretStore {
    prefix: String,
}

impl EnvSecretStore {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    fn var_name(&self, name: &str) -> String {
        let mapped: String = name
            .chars()
            .map(|c| match c {
                '-' | '.' => '_',
                other => other.to_ascii_uppercase(),
            })
            .collect();
        format!("{}_{}", self.prefix, mapped)
    }
}

impl SecretStore for EnvSecretStore {
    fn lookup(&self, name: &str) -> Result<String, SecretError> {
        let var = self.var_name(name);
        match std::env::var(&var) {
            Ok(value) if !value.is_empty() => Ok(value),
            Ok(_) => Err(SecretError::NotFound(name.to_string())),
            Err(std::env::VarError::NotPresent) => Err(SecretError::NotFound(name.to_string())),
            Err(err) => Err(SecretError::Store(err.to_string())),
        }
    }
}

/// Memoizing wrapper around another store. Successful lookups are
/// served from memory for the rest of the process.
pub struct CachingSecretStore<S> {
    inner: S,
    cache: Mutex<HashMap<String, String>>,
}

impl<S: SecretStore> CachingSecretStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            cache: Mutex::new(HashMap::new()),
        }
    }
}

impl<S: SecretStore> SecretStore for CachingSecretStore<S> {
    fn lookup(&self, name: &str) -> Result<String, SecretError> {
        if let Some(hit) = self.cache.lock().get(name) {
            return Ok(hit.clone());
        }
        let value = self.inner.lookup(name)?;
        self.cache.lock().insert(name.to_string(), value.clone());
        Ok(value)
    }
}

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeSecretStore;

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::{SecretError, SecretStore};
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::Arc;

    /// In-memory secret store that counts lookups.
    #[derive(Clone, Default)]
    pub struct FakeSecretStore {
        inner: Arc<Mutex<FakeState>>,
    }

    #[derive(Default)]
    struct FakeState {
        secrets: HashMap<String, String>,
        lookups: Vec<String>,
    }

    impl FakeSecretStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn insert(&self, name: &str, value: &str) {
            self.inner
                .lock()
                .secrets
                .insert(name.to_string(), value.to_string());
        }

        /// Names looked up so far, in order.
        pub fn lookups(&self) -> Vec<String> {
            self.inner.lock().lookups.clone()
        }
    }

    impl SecretStore for FakeSecretStore {
        fn lookup(&self, name: &str) -> Result<String, SecretError> {
            let mut state = self.inner.lock();
            state.lookups.push(name.to_string());
            state
                .secrets
                .get(name)
                .cloned()
                .ok_or_else(|| SecretError::NotFound(name.to_string()))
        }
    }
}

#[cfg(test)]
#[path = "secrets_tests.rs"]
mod tests;
