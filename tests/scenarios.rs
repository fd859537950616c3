// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end tests driving the `dcached` binary: CLI parsing, pinned-digest
//! resolution, file-backed persistence, and restart rehydration.
//!
//! The coordinator's own finite-state-machine scenarios (dedup, backoff,
//! timeout, late replies, write-failure recovery) are covered at the
//! `dcache-engine` crate level against scriptable fakes; this file instead
//! exercises the ambient wiring a deployed process actually needs.

use assert_cmd::Command;
use dcache_core::{DigestRecord, FakeClock, ImageReference, WorkflowId};
use dcache_resolver::{FakeResolverClient, ResolverOutcome};
use dcache_storage::FileGateway;
use std::io::Write;
use std::sync::Arc;
use tempfile::tempdir;

/// The round-trip property from the specification: a digest stored in one
/// coordinator run is served by a fresh coordinator after restart without
/// ever touching the resolver, exercised here across the real crate
/// boundary (file-backed persistence, not the in-memory fake).
#[tokio::test(start_paused = true)]
async fn store_restart_lookup_round_trips_without_the_resolver() {
    let dir = tempdir().expect("state dir");
    let workflow_id = WorkflowId::new();
    let reference = ImageReference::new("ubuntu", "latest");

    let resolver = Arc::new(FakeResolverClient::new());
    resolver.push(reference.clone(), ResolverOutcome::Success(DigestRecord::new("sha256", "AAAA")));
    let persistence = Arc::new(FileGateway::new(dir.path()));

    let config = dcache_engine::CoordinatorConfig::default();
    let first_run = dcache_engine::spawn(
        workflow_id.clone(),
        resolver.clone(),
        persistence.clone(),
        FakeClock::new(),
        config,
    );
    let digest = first_run.lookup(reference.clone()).await.expect("first run resolves and persists");
    similar_asserts::assert_eq!(digest, DigestRecord::new("sha256", "AAAA"));

    let second_run = dcache_engine::spawn(
        workflow_id,
        resolver.clone(),
        persistence,
        FakeClock::new(),
        config.is_restart(true),
    );
    let rehydrated = second_run.lookup(reference.clone()).await.expect("second run rehydrates");
    similar_asserts::assert_eq!(rehydrated, DigestRecord::new("sha256", "AAAA"));
    assert_eq!(resolver.call_count(&reference), 1, "rehydration must not re-contact the resolver");
}

fn dcached() -> Command {
    Command::cargo_bin("dcached").expect("dcached binary builds")
}

fn write_json(path: &std::path::Path, contents: &str) {
    let mut file = std::fs::File::create(path).expect("create pinned digests file");
    file.write_all(contents.as_bytes()).expect("write pinned digests file");
}

#[test]
fn resolves_a_pinned_reference_and_persists_it() {
    let state_dir = tempdir().expect("state dir");
    let pins_path = state_dir.path().join("pins.json");
    write_json(&pins_path, r#"{"ubuntu:latest": "sha256:AAAA"}"#);

    let output = dcached()
        .arg("--workflow-id")
        .arg("wkf-scenario-pinned-1")
        .arg("--state-dir")
        .arg(state_dir.path())
        .arg("--pinned-digests")
        .arg(&pins_path)
        .write_stdin("ubuntu:latest\n")
        .output()
        .expect("dcached runs");

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8(output.stdout).expect("utf8 stdout");
    let line: serde_json::Value = serde_json::from_str(stdout.lines().next().expect("one result line"))
        .expect("result line is JSON");
    assert_eq!(line["status"], "success");
    assert_eq!(line["reference"], "ubuntu:latest");
    assert_eq!(line["digest"], "sha256:AAAA");

    let persisted = std::fs::read_to_string(state_dir.path().join("wkf-scenario-pinned-1.jsonl"))
        .expect("persistence file exists");
    assert!(persisted.contains("sha256:AAAA"));
}

#[test]
fn unpinned_reference_fails_without_a_live_resolver() {
    let state_dir = tempdir().expect("state dir");

    let output = dcached()
        .arg("--workflow-id")
        .arg("wkf-scenario-unpinned-1")
        .arg("--state-dir")
        .arg(state_dir.path())
        .write_stdin("ubuntu:untracked\n")
        .output()
        .expect("dcached runs");

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).expect("utf8 stdout");
    let line: serde_json::Value = serde_json::from_str(stdout.lines().next().expect("one result line"))
        .expect("result line is JSON");
    assert_eq!(line["status"], "failure");
}

#[test]
fn restart_rehydrates_persisted_digests_without_pinned_file() {
    let state_dir = tempdir().expect("state dir");
    let pins_path = state_dir.path().join("pins.json");
    write_json(&pins_path, r#"{"ubuntu:latest": "sha256:BBBB"}"#);
    let workflow_id = "wkf-scenario-restart-1";

    // First run: resolve via pinned digests, which persists the result.
    let first = dcached()
        .arg("--workflow-id")
        .arg(workflow_id)
        .arg("--state-dir")
        .arg(state_dir.path())
        .arg("--pinned-digests")
        .arg(&pins_path)
        .write_stdin("ubuntu:latest\n")
        .output()
        .expect("first run succeeds");
    assert!(first.status.success());

    // Second run: restart, no pinned digests supplied at all. The only way
    // this can resolve is by rehydrating the persisted state from the
    // first run.
    let second = dcached()
        .arg("--workflow-id")
        .arg(workflow_id)
        .arg("--restart")
        .arg("--state-dir")
        .arg(state_dir.path())
        .write_stdin("ubuntu:latest\n")
        .output()
        .expect("second run succeeds");
    assert!(second.status.success());

    let stdout = String::from_utf8(second.stdout).expect("utf8 stdout");
    let line: serde_json::Value = serde_json::from_str(stdout.lines().next().expect("one result line"))
        .expect("result line is JSON");
    assert_eq!(line["status"], "success");
    assert_eq!(line["digest"], "sha256:BBBB");
}

#[test]
fn restart_with_malformed_persisted_row_reports_terminal_failure() {
    let state_dir = tempdir().expect("state dir");
    let workflow_id = "wkf-scenario-corrupt-1";
    std::fs::write(
        state_dir.path().join(format!("{workflow_id}.jsonl")),
        "{\"tag\": \"ubuntu:latest\", \"digest\": \"not-canonical-digest\"}\n",
    )
    .expect("seed corrupted state file");

    let output = dcached()
        .arg("--workflow-id")
        .arg(workflow_id)
        .arg("--restart")
        .arg("--state-dir")
        .arg(state_dir.path())
        .write_stdin("ubuntu:latest\n")
        .output()
        .expect("dcached runs");

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).expect("utf8 stdout");
    let line: serde_json::Value = serde_json::from_str(stdout.lines().next().expect("one result line"))
        .expect("result line is JSON");
    assert_eq!(line["status"], "failure");
    assert!(line["reason"].as_str().expect("reason string").contains("terminal"));
}

#[test]
fn rejects_backoff_max_below_initial_at_startup() {
    let output = dcached()
        .arg("--backoff-initial-ms")
        .arg("5000")
        .arg("--backoff-max-ms")
        .arg("1000")
        .write_stdin("")
        .output()
        .expect("dcached runs");

    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).expect("utf8 stderr");
    assert!(stderr.contains("backoff.max"));
}
