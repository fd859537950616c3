// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command-line configuration for `dcached`.

use crate::error::DaemonError;
use clap::Parser;
use dcache_core::WorkflowId;
use dcache_engine::{BackoffConfig, CoordinatorConfig};
use std::path::PathBuf;
use std::time::Duration;

/// A per-workflow cache and coordinator for container-image digest lookups.
#[derive(Debug, Parser)]
#[command(name = "dcached", version, about)]
pub struct Cli {
    /// Workflow id this coordinator instance serves. Generated if omitted,
    /// which only makes sense for a fresh (non-restart) workflow.
    #[arg(long, env = "DCACHE_WORKFLOW_ID")]
    pub workflow_id: Option<String>,

    /// Rehydrate persisted state for `workflow_id` before serving requests.
    #[arg(long, env = "DCACHE_RESTART")]
    pub restart: bool,

    /// Directory the file-backed persistence gateway keeps its per-workflow
    /// append logs in. Defaults to the platform state directory.
    #[arg(long, env = "DCACHE_STATE_DIR")]
    pub state_dir: Option<PathBuf>,

    /// JSON file mapping `"<repository>:<tag>"` to `"<algorithm>:<value>"`,
    /// used to answer resolver requests without a live registry call.
    #[arg(long, env = "DCACHE_PINNED_DIGESTS")]
    pub pinned_digests: Option<PathBuf>,

    /// Initial backpressure retry delay, in milliseconds.
    #[arg(long, env = "DCACHE_BACKOFF_INITIAL_MS", default_value_t = 2_000)]
    pub backoff_initial_ms: u64,

    /// Cap on the backpressure retry delay, in milliseconds.
    #[arg(long, env = "DCACHE_BACKOFF_MAX_MS", default_value_t = 600_000)]
    pub backoff_max_ms: u64,

    /// Geometric growth factor applied to the backpressure retry delay.
    #[arg(long, env = "DCACHE_BACKOFF_MULTIPLIER", default_value_t = 2.0)]
    pub backoff_multiplier: f64,

    /// Self-imposed per-request resolver timeout, in milliseconds.
    #[arg(long, env = "DCACHE_RESOLVER_TIMEOUT_MS", default_value_t = 30_000)]
    pub resolver_timeout_ms: u64,
}

impl Cli {
    pub fn workflow_id(&self) -> WorkflowId {
        match &self.workflow_id {
            Some(id) => WorkflowId::from_string(id),
            None => WorkflowId::new(),
        }
    }

    pub fn state_dir(&self) -> PathBuf {
        self.state_dir.clone().unwrap_or_else(default_state_dir)
    }

    pub fn coordinator_config(&self) -> Result<CoordinatorConfig, DaemonError> {
        let backoff = BackoffConfig::default()
            .initial(Duration::from_millis(self.backoff_initial_ms))
            .max(Duration::from_millis(self.backoff_max_ms))
            .multiplier(self.backoff_multiplier);
        let config = CoordinatorConfig::default()
            .backoff(backoff)
            .resolver_timeout(Duration::from_millis(self.resolver_timeout_ms))
            .is_restart(self.restart);
        config.validate()?;
        Ok(config)
    }
}

fn default_state_dir() -> PathBuf {
    dirs::state_dir()
        .or_else(dirs::data_local_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("dcache")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("dcached").chain(args.iter().copied()))
    }

    #[test]
    fn defaults_match_spec() {
        let cli = parse(&[]);
        assert_eq!(cli.backoff_initial_ms, 2_000);
        assert_eq!(cli.backoff_max_ms, 600_000);
        assert_eq!(cli.backoff_multiplier, 2.0);
        assert_eq!(cli.resolver_timeout_ms, 30_000);
        assert!(!cli.restart);
    }

    #[test]
    fn explicit_flags_override_defaults() {
        let cli = parse(&["--backoff-initial-ms", "100", "--restart"]);
        assert_eq!(cli.backoff_initial_ms, 100);
        assert!(cli.restart);
    }

    #[test]
    fn rejects_backoff_max_below_initial() {
        let cli = parse(&["--backoff-initial-ms", "5000", "--backoff-max-ms", "1000"]);
        assert!(matches!(cli.coordinator_config(), Err(DaemonError::Config(_))));
    }

    #[test]
    fn workflow_id_defaults_to_a_fresh_random_id() {
        let cli = parse(&[]);
        assert!(cli.workflow_id().as_str().starts_with("wkf-"));
    }

    #[test]
    fn explicit_workflow_id_round_trips() {
        let cli = parse(&["--workflow-id", "wkf-fixed-id-for-test"]);
        assert_eq!(cli.workflow_id().as_str(), "wkf-fixed-id-for-test");
    }
}
