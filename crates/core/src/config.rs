// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Client configuration, loadable from TOML or JSON files.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default server URL.
pub const DEFAULT_URL: &str = "ws://localhost:8090";

/// Configuration for the RPC client and its reconnecting transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// WebSocket URL of the server (`ws://` or `wss://`).
    pub url: String,
    /// Stop reconnecting after this long without sends (0 = always reconnect).
    pub idle_threshold_ms: u64,
    /// Delay before the first reconnection attempt.
    pub reconnect_interval_ms: u64,
    /// Growth factor applied to the delay after each failed attempt.
    pub reconnect_decay: f64,
    /// Upper bound for the reconnection delay.
    pub max_reconnect_interval_ms: u64,
    /// Give up on a single connection attempt after this long.
    pub timeout_interval_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            url: DEFAULT_URL.to_string(),
            idle_threshold_ms: 0,
            reconnect_interval_ms: 1_000,
            reconnect_decay: 1.2,
            max_reconnect_interval_ms: 30_000,
            timeout_interval_ms: 15_000,
        }
    }
}

impl ClientConfig {
    /// Create a config for the given URL with default timings.
    pub fn new(url: impl Into<String>) -> Self {
        ClientConfig {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_idle_threshold(mut self, threshold: Duration) -> Self {
        self.idle_threshold_ms = duration_ms(threshold);
        self
    }

    pub fn with_reconnect_interval(mut self, interval: Duration) -> Self {
        self.reconnect_interval_ms = duration_ms(interval);
        self
    }

    pub fn with_reconnect_decay(mut self, decay: f64) -> Self {
        self.reconnect_decay = decay;
        self
    }

    pub fn with_max_reconnect_interval(mut self, interval: Duration) -> Self {
        self.max_reconnect_interval_ms = duration_ms(interval);
        self
    }

    pub fn with_timeout_interval(mut self, timeout: Duration) -> Self {
        self.timeout_interval_ms = duration_ms(timeout);
        self
    }

    /// `None` when idle reconnect suppression is off.
    pub fn idle_threshold(&self) -> Option<Duration> {
        (self.idle_threshold_ms > 0).then(|| Duration::from_millis(self.idle_threshold_ms))
    }

    pub fn reconnect_interval(&self) -> Duration {
        Duration::from_millis(self.reconnect_interval_ms)
    }

    pub fn max_reconnect_interval(&self) -> Duration {
        Duration::from_millis(self.max_reconnect_interval_ms)
    }

    pub fn timeout_interval(&self) -> Duration {
        Duration::from_millis(self.timeout_interval_ms)
    }

    /// Load a config file. `.json` files are read as JSON, anything else as
    /// TOML. Missing keys take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {}", path.display(), e)))?;

        let config: ClientConfig = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::from_str(&content)?,
            _ => toml::from_str(&content)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check that the values make sense together.
    pub fn validate(&self) -> Result<()> {
        if !(self.url.starts_with("ws://") || self.url.starts_with("wss://")) {
            return Err(Error::Config(format!(
                "invalid url '{}'\n  hint: use a ws:// or wss:// URL",
                self.url
            )));
        }
        if self.reconnect_interval_ms == 0 {
            return Err(Error::Config(
                "reconnect_interval_ms must be greater than 0".to_string(),
            ));
        }
        if self.reconnect_decay.is_nan() || self.reconnect_decay < 1.0 {
            return Err(Error::Config(format!(
                "reconnect_decay must be at least 1.0, got {}",
                self.reconnect_decay
            )));
        }
        if self.max_reconnect_interval_ms < self.reconnect_interval_ms {
            return Err(Error::Config(
                "max_reconnect_interval_ms must not be below reconnect_interval_ms".to_string(),
            ));
        }
        Ok(())
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
