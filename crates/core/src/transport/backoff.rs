// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Reconnection delay schedule.

use std::time::Duration;

use crate::config::ClientConfig;

/// Exponential backoff: `initial * decay^attempt`, capped at `max`.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    decay: f64,
    max: Duration,
    attempt: u32,
}

impl Backoff {
    pub fn new(initial: Duration, decay: f64, max: Duration) -> Self {
        Backoff {
            initial,
            decay,
            max,
            attempt: 0,
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(
            config.reconnect_interval(),
            config.reconnect_decay,
            config.max_reconnect_interval(),
        )
    }

    /// Number of delays handed out since the last reset.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Delay before the given attempt.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let secs = self.initial.as_secs_f64() * self.decay.powi(exponent);
        if !secs.is_finite() || secs >= self.max.as_secs_f64() {
            self.max
        } else {
            Duration::from_secs_f64(secs)
        }
    }

    /// Delay before the next attempt; advances the schedule.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.delay_for(self.attempt);
        self.attempt = self.attempt.saturating_add(1);
        delay
    }

    /// Start over after a successful connection.
    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}
