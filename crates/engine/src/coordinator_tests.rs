// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::config::{BackoffConfig, CoordinatorConfig};
use dcache_core::{DigestRecord, FakeClock, ImageReference, WorkflowId};
use dcache_resolver::FakeResolverClient;
use dcache_storage::{FakeGateway, StoreScript};
use std::time::Duration;

fn fast_config() -> CoordinatorConfig {
    CoordinatorConfig::default()
        .backoff(BackoffConfig::default().initial(Duration::from_millis(10)).max(Duration::from_millis(40)))
        .resolver_timeout(Duration::from_millis(50))
}

fn image(repo: &str, tag: &str) -> ImageReference {
    ImageReference::new(repo, tag)
}

#[tokio::test(start_paused = true)]
async fn resolves_an_uncached_reference() {
    let resolver = Arc::new(FakeResolverClient::new());
    let persistence = Arc::new(FakeGateway::new());
    let reference = image("ubuntu", "latest");
    resolver.push(reference.clone(), ResolverOutcome::Success(DigestRecord::new("sha256", "AAAA")));

    let handle = spawn(WorkflowId::new(), resolver.clone(), persistence, FakeClock::new(), fast_config());

    let digest = handle.lookup(reference).await.expect("lookup succeeds");
    assert_eq!(digest, DigestRecord::new("sha256", "AAAA"));
}

#[tokio::test(start_paused = true)]
async fn concurrent_lookups_for_same_reference_issue_one_resolver_request() {
    let resolver = Arc::new(FakeResolverClient::new());
    let persistence = Arc::new(FakeGateway::new());
    let reference = image("ubuntu", "latest");
    resolver.push(reference.clone(), ResolverOutcome::Success(DigestRecord::new("sha256", "AAAA")));

    let handle = spawn(WorkflowId::new(), resolver.clone(), persistence, FakeClock::new(), fast_config());

    let (first, second) = tokio::join!(handle.lookup(reference.clone()), handle.lookup(reference.clone()));
    assert_eq!(first.expect("first resolves"), DigestRecord::new("sha256", "AAAA"));
    assert_eq!(second.expect("second resolves"), DigestRecord::new("sha256", "AAAA"));
    assert_eq!(resolver.call_count(&reference), 1);
}

#[tokio::test(start_paused = true)]
async fn cache_hit_issues_no_resolver_request() {
    let resolver = Arc::new(FakeResolverClient::new());
    let persistence = Arc::new(FakeGateway::new());
    let reference = image("ubuntu", "latest");
    resolver.push(reference.clone(), ResolverOutcome::Success(DigestRecord::new("sha256", "AAAA")));

    let handle = spawn(WorkflowId::new(), resolver.clone(), persistence, FakeClock::new(), fast_config());

    handle.lookup(reference.clone()).await.expect("first lookup resolves");
    handle.lookup(reference.clone()).await.expect("second lookup hits cache");
    assert_eq!(resolver.call_count(&reference), 1);
}

#[tokio::test(start_paused = true)]
async fn backpressure_then_success_resolves_after_retry() {
    let resolver = Arc::new(FakeResolverClient::new());
    let persistence = Arc::new(FakeGateway::new());
    let reference = image("ubuntu", "latest");
    resolver.push(reference.clone(), ResolverOutcome::BackPressure);
    resolver.push(reference.clone(), ResolverOutcome::BackPressure);
    resolver.push(reference.clone(), ResolverOutcome::Success(DigestRecord::new("sha256", "AAAA")));

    let handle = spawn(WorkflowId::new(), resolver.clone(), persistence, FakeClock::new(), fast_config());

    let digest = handle.lookup(reference.clone()).await.expect("eventually resolves");
    assert_eq!(digest, DigestRecord::new("sha256", "AAAA"));
    assert_eq!(resolver.call_count(&reference), 3);
}

#[tokio::test(start_paused = true)]
async fn resolver_failure_is_reported_to_all_waiters() {
    let resolver = Arc::new(FakeResolverClient::new());
    let persistence = Arc::new(FakeGateway::new());
    let reference = image("ubuntu", "latest");
    resolver.push(reference.clone(), ResolverOutcome::Failure("not found".to_string()));

    let handle = spawn(WorkflowId::new(), resolver, persistence, FakeClock::new(), fast_config());

    let err = handle.lookup(reference).await.expect_err("resolver failed");
    assert!(matches!(err, LookupError::ResolverFailed(reason) if reason == "not found"));
}

#[tokio::test(start_paused = true)]
async fn request_that_never_replies_times_out() {
    let resolver = Arc::new(FakeResolverClient::new());
    let persistence = Arc::new(FakeGateway::new());
    let reference = image("ubuntu", "latest");
    // No scripted outcome at all: the fake's default is BackPressure
    // forever, so the coordinator's own timeout is what ends the wait.

    let handle = spawn(WorkflowId::new(), resolver, persistence, FakeClock::new(), fast_config());

    let err = handle.lookup(reference).await.expect_err("times out");
    assert!(matches!(err, LookupError::Timeout));
}

#[tokio::test(start_paused = true)]
async fn late_reply_after_timeout_does_not_notify_waiters_but_warms_cache() {
    let resolver = Arc::new(FakeResolverClient::new());
    let persistence = Arc::new(FakeGateway::new());
    let reference = image("ubuntu", "latest");

    // The resolver answers, but only after the coordinator will have
    // already given up and replied Timeout to the waiter.
    resolver.push_delayed(
        reference.clone(),
        Duration::from_millis(100),
        ResolverOutcome::Success(DigestRecord::new("sha256", "AAAA")),
    );

    let config = CoordinatorConfig::default().resolver_timeout(Duration::from_millis(20));
    let workflow_id = WorkflowId::new();
    let handle = spawn(workflow_id, resolver.clone(), persistence.clone(), FakeClock::new(), config);

    let timed_out = handle.lookup(reference.clone()).await.expect_err("times out before resolver replies");
    assert!(matches!(timed_out, LookupError::Timeout));

    // Give the late reply time to land and persist silently.
    tokio::time::sleep(Duration::from_millis(150)).await;

    // A fresh lookup now hits the warmed cache rather than issuing a second
    // resolver request.
    let digest = handle.lookup(reference.clone()).await.expect("served from cache warmed by the late reply");
    assert_eq!(digest, DigestRecord::new("sha256", "AAAA"));
    assert_eq!(resolver.call_count(&reference), 1, "the late reply must not trigger a second resolver call");
}

#[tokio::test(start_paused = true)]
async fn write_failure_fails_waiters_and_recovers_on_client_retry() {
    let resolver = Arc::new(FakeResolverClient::new());
    let persistence = Arc::new(FakeGateway::new());
    let reference = image("ubuntu", "latest");
    resolver.push(reference.clone(), ResolverOutcome::Success(DigestRecord::new("sha256", "AAAA")));
    resolver.push(reference.clone(), ResolverOutcome::Success(DigestRecord::new("sha256", "AAAA")));

    let workflow_id = WorkflowId::new();
    persistence.script_store(workflow_id.clone(), StoreScript::Reject("disk full".to_string()));

    let handle = spawn(workflow_id, resolver.clone(), persistence.clone(), FakeClock::new(), fast_config());

    let first = handle.lookup(reference.clone()).await.expect_err("first store attempt is rejected");
    assert!(matches!(first, LookupError::WriteFailed(_)));

    let second = handle.lookup(reference.clone()).await.expect("client retry re-resolves and persists");
    assert_eq!(second, DigestRecord::new("sha256", "AAAA"));

    assert_eq!(resolver.call_count(&reference), 2, "a failed write does not poison the mapping; retry re-resolves");
    assert_eq!(persistence.store_call_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn restart_rehydrates_from_persisted_state_without_resolver_traffic() {
    let resolver = Arc::new(FakeResolverClient::new());
    let persistence = Arc::new(FakeGateway::new());
    let workflow_id = WorkflowId::new();
    let reference = image("ubuntu", "latest");
    persistence.seed(workflow_id.clone(), vec![(reference.to_string(), "sha256:AAAA".to_string())]);

    let config = fast_config().is_restart(true);
    let handle = spawn(workflow_id, resolver.clone(), persistence, FakeClock::new(), config);

    let digest = handle.lookup(reference.clone()).await.expect("served from rehydrated cache");
    assert_eq!(digest, DigestRecord::new("sha256", "AAAA"));
    assert_eq!(resolver.call_count(&reference), 0, "rehydration must not contact the resolver");
}

#[tokio::test(start_paused = true)]
async fn restart_with_unparseable_persisted_tag_goes_terminal() {
    let resolver = Arc::new(FakeResolverClient::new());
    let persistence = Arc::new(FakeGateway::new());
    let workflow_id = WorkflowId::new();
    persistence.seed(workflow_id.clone(), vec![("no-colon-tag".to_string(), "sha256:AAAA".to_string())]);

    let handle = spawn(workflow_id, resolver, persistence, FakeClock::new(), fast_config());

    let err = handle.lookup(image("ubuntu", "latest")).await.expect_err("coordinator is terminal");
    assert!(matches!(err, LookupError::Terminal(_)));
}

#[tokio::test(start_paused = true)]
async fn restart_with_malformed_persisted_digest_goes_terminal() {
    let resolver = Arc::new(FakeResolverClient::new());
    let persistence = Arc::new(FakeGateway::new());
    let workflow_id = WorkflowId::new();
    persistence.seed(workflow_id.clone(), vec![("ubuntu:latest".to_string(), "not-a-canonical-digest".to_string())]);

    let handle = spawn(workflow_id, resolver, persistence, FakeClock::new(), fast_config());

    let err = handle.lookup(image("ubuntu", "latest")).await.expect_err("coordinator is terminal");
    assert!(matches!(err, LookupError::Terminal(_)));
}
