// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Coordinator configuration and validation.

use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("backoff.max ({max:?}) must be >= backoff.initial ({initial:?})")]
    BackoffMaxBelowInitial { initial: Duration, max: Duration },
    #[error("backoff.multiplier ({0}) must be greater than 1.0")]
    BackoffMultiplierTooSmall(f64),
    #[error("resolver.timeout must be greater than zero")]
    ResolverTimeoutZero,
}

/// Exponential backoff applied to a single in-flight resolver request that
/// keeps receiving `BackPressure`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffConfig {
    pub initial: Duration,
    pub max: Duration,
    pub multiplier: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(2),
            max: Duration::from_secs(600),
            multiplier: 2.0,
        }
    }
}

impl BackoffConfig {
    dcache_core::setters! {
        set { initial: Duration, max: Duration, multiplier: f64 }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max < self.initial {
            return Err(ConfigError::BackoffMaxBelowInitial { initial: self.initial, max: self.max });
        }
        if self.multiplier <= 1.0 {
            return Err(ConfigError::BackoffMultiplierTooSmall(self.multiplier));
        }
        Ok(())
    }
}

/// Per-coordinator configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinatorConfig {
    pub backoff: BackoffConfig,
    pub resolver_timeout: Duration,
    /// Whether this coordinator was spawned to rehydrate an existing
    /// workflow (affects only startup logging, not behavior).
    pub is_restart: bool,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            backoff: BackoffConfig::default(),
            resolver_timeout: Duration::from_secs(30),
            is_restart: false,
        }
    }
}

impl CoordinatorConfig {
    dcache_core::setters! {
        set { backoff: BackoffConfig, resolver_timeout: Duration, is_restart: bool }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.backoff.validate()?;
        if self.resolver_timeout.is_zero() {
            return Err(ConfigError::ResolverTimeoutZero);
        }
        Ok(())
    }
}
