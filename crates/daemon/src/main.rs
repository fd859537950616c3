// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `dcached`: a process supervisor that owns one digest-cache coordinator
//! per workflow and serves lookups for image references read from stdin,
//! one per line, printing each resolution (or failure) as a JSON line on
//! stdout.
//!
//! This binary exists to wire the coordinator (crate `dcache-engine`) to a
//! concrete resolver client and persistence backend; it carries no
//! protocol of its own, since the task/workflow orchestration that would
//! call this cache is out of scope for this repository.

use clap::Parser;
use dcache_core::{ImageReference, SystemClock};
use dcache_daemon::{pinned, Cli, CoordinatorRegistry, DaemonError};
use dcache_resolver::StaticResolverClient;
use dcache_storage::FileGateway;
use serde::Serialize;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum LookupResult<'a> {
    Success { reference: &'a str, digest: String },
    Failure { reference: &'a str, reason: String },
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("dcached: {err}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), DaemonError> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = cli.coordinator_config()?;
    let workflow_id = cli.workflow_id();
    let state_dir = cli.state_dir();
    std::fs::create_dir_all(&state_dir)
        .map_err(|source| DaemonError::StateDir { path: state_dir.clone(), source })?;

    let digests = match &cli.pinned_digests {
        Some(path) => pinned::load(path)?,
        None => Default::default(),
    };

    let resolver = Arc::new(StaticResolverClient::new(digests));
    let persistence = Arc::new(FileGateway::new(state_dir));
    let registry = CoordinatorRegistry::new(resolver, persistence, SystemClock, config);

    tracing::info!(%workflow_id, is_restart = cli.restart, "dcached starting");
    let handle = registry.get_or_spawn(workflow_id.clone(), cli.restart);

    let stdin = tokio::io::stdin();
    let mut lines = BufReader::new(stdin).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.map_err(DaemonError::Stdin)? else { break };
                let tag = line.trim();
                if tag.is_empty() {
                    continue;
                }
                let reference = match ImageReference::parse(tag) {
                    Ok(reference) => reference,
                    Err(err) => {
                        print_result(&LookupResult::Failure { reference: tag, reason: err.to_string() });
                        continue;
                    }
                };
                match handle.lookup(reference).await {
                    Ok(digest) => print_result(&LookupResult::Success { reference: tag, digest: digest.canonical() }),
                    Err(err) => print_result(&LookupResult::Failure { reference: tag, reason: err.to_string() }),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!(%workflow_id, "received shutdown signal");
                break;
            }
        }
    }

    Ok(())
}

fn print_result(result: &LookupResult<'_>) {
    match serde_json::to_string(result) {
        Ok(line) => println!("{line}"),
        Err(err) => tracing::error!(error = %err, "failed to serialize lookup result"),
    }
}
