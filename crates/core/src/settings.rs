// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pool settings
//!
//! Settings are immutable once a coordinator is built. They can be written
//! by hand or loaded from TOML, where durations use humantime strings:
//!
//! ```toml
//! max_timeout_to_release = "5m"
//! max_timeout_to_wait = "30s"
//! interval_to_check_release = "10s"
//! store_path = "/var/lib/wl/store.json"
//! key_prefix = "wl"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors from loading or validating settings
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("invalid setting {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
    #[error("failed to read settings: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse settings: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Per-pool configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// How long a lease may be held before the reaper reclaims it
    #[serde(with = "humantime_serde")]
    pub max_timeout_to_release: Duration,
    /// How long `acquire` blocks waiting for a free resource
    #[serde(with = "humantime_serde")]
    pub max_timeout_to_wait: Duration,
    /// Reaper period
    #[serde(with = "humantime_serde")]
    pub interval_to_check_release: Duration,
    /// Location of the shared store
    pub store_path: PathBuf,
    /// Prefix for every store key
    pub key_prefix: String,
    /// Maximum store handles lent out at once for short operations; blocked
    /// acquires wait on a separate budget of the same size
    pub max_connections: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_timeout_to_release: Duration::from_secs(300),
            max_timeout_to_wait: Duration::from_secs(300),
            interval_to_check_release: Duration::from_secs(30),
            store_path: std::env::temp_dir().join("wl-store.json"),
            key_prefix: "wl".to_string(),
            max_connections: 30,
        }
    }
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_timeout_to_release(mut self, timeout: Duration) -> Self {
        self.max_timeout_to_release = timeout;
        self
    }

    pub fn with_max_timeout_to_wait(mut self, timeout: Duration) -> Self {
        self.max_timeout_to_wait = timeout;
        self
    }

    pub fn with_interval_to_check_release(mut self, interval: Duration) -> Self {
        self.interval_to_check_release = interval;
        self
    }

    pub fn with_store_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.store_path = path.into();
        self
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Parse and validate settings from a TOML document
    pub fn from_toml_str(source: &str) -> Result<Self, SettingsError> {
        let settings: Settings = toml::from_str(source)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load and validate settings from a TOML file
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// Check that every field is usable
    pub fn validate(&self) -> Result<(), SettingsError> {
        let durations = [
            ("max_timeout_to_release", self.max_timeout_to_release),
            ("max_timeout_to_wait", self.max_timeout_to_wait),
            ("interval_to_check_release", self.interval_to_check_release),
        ];
        for (field, value) in durations {
            if value.is_zero() {
                return Err(SettingsError::Invalid {
                    field,
                    reason: "must be greater than zero".to_string(),
                });
            }
        }

        if self.key_prefix.is_empty() {
            return Err(SettingsError::Invalid {
                field: "key_prefix",
                reason: "must not be empty".to_string(),
            });
        }

        if self.max_connections == 0 {
            return Err(SettingsError::Invalid {
                field: "max_connections",
                reason: "at least one connection is required".to_string(),
            });
        }

        Ok(())
    }

    /// Wait bound handed to the store's blocking pop.
    ///
    /// The store waits in whole seconds; partial seconds round up so a
    /// caller never waits less than configured.
    pub fn acquire_wait(&self) -> Duration {
        let millis = self.max_timeout_to_wait.as_millis();
        let secs = millis.div_ceil(1000).max(1);
        Duration::from_secs(u64::try_from(secs).unwrap_or(u64::MAX))
    }
}

#[cfg(test)]
#[path = "settings_tests.rs"]
mod tests;
