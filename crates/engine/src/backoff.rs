// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Exponential backoff sequence for a single in-flight resolver request.

use crate::config::BackoffConfig;
use std::time::Duration;

/// Tracks the backoff attempt count for one in-flight request. Each call to
/// [`next_delay`](Self::next_delay) advances the attempt counter; the
/// delay grows by `multiplier` each time, capped at `config.max`.
#[derive(Debug, Clone, Copy)]
pub struct BackoffState {
    config: BackoffConfig,
    attempt: u32,
}

impl BackoffState {
    pub fn new(config: BackoffConfig) -> Self {
        Self { config, attempt: 0 }
    }

    pub fn next_delay(&mut self) -> Duration {
        let factor = self.config.multiplier.powi(self.attempt as i32);
        self.attempt = self.attempt.saturating_add(1);
        let millis = (self.config.initial.as_millis() as f64 * factor) as u64;
        Duration::from_millis(millis).min(self.config.max)
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }
}
