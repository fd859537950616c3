// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scriptable resolver fake for coordinator tests.

use crate::{ResolverClient, ResolverOutcome, ResolverRequest};
use async_trait::async_trait;
use dcache_core::ImageReference;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};

/// A single observed call, recorded in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverCall {
    pub request: ResolverRequest,
}

/// A resolver whose replies are scripted per reference.
///
/// Each call to [`ResolverClient::resolve`] for a reference pops the next
/// scripted outcome for that reference's queue. If the queue is empty, the
/// configured `default_outcome` is returned (defaults to `BackPressure`,
/// which is the safest "nothing scripted yet" signal for a dedup test).
pub struct FakeResolverClient {
    scripts: Mutex<HashMap<ImageReference, VecDeque<(std::time::Duration, ResolverOutcome)>>>,
    calls: Mutex<Vec<ResolverCall>>,
    default_outcome: ResolverOutcome,
}

impl Default for FakeResolverClient {
    fn default() -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            default_outcome: ResolverOutcome::BackPressure,
        }
    }
}

impl FakeResolverClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an outcome to be returned the next time `reference` is resolved.
    pub fn push(&self, reference: ImageReference, outcome: ResolverOutcome) {
        self.push_delayed(reference, std::time::Duration::ZERO, outcome);
    }

    /// Queue an outcome that is only returned after `delay` elapses, to
    /// simulate a resolver reply that arrives after the coordinator has
    /// already stopped waiting for it.
    pub fn push_delayed(&self, reference: ImageReference, delay: std::time::Duration, outcome: ResolverOutcome) {
        self.scripts.lock().entry(reference).or_default().push_back((delay, outcome));
    }

    /// All requests observed so far, in arrival order.
    pub fn calls(&self) -> Vec<ResolverCall> {
        self.calls.lock().clone()
    }

    /// Number of requests observed for `reference`.
    pub fn call_count(&self, reference: &ImageReference) -> usize {
        self.calls.lock().iter().filter(|c| &c.request.reference == reference).count()
    }
}

#[async_trait]
impl ResolverClient for FakeResolverClient {
    async fn resolve(&self, request: ResolverRequest) -> ResolverOutcome {
        self.calls.lock().push(ResolverCall { request: request.clone() });
        let scripted = self.scripts.lock().get_mut(&request.reference).and_then(|q| q.pop_front());
        match scripted {
            Some((delay, outcome)) => {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                outcome
            }
            None => self.default_outcome.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dcache_core::DigestRecord;

    #[tokio::test]
    async fn pops_scripted_outcomes_in_order() {
        let fake = FakeResolverClient::new();
        let reference = ImageReference::new("ubuntu", "latest");
        fake.push(reference.clone(), ResolverOutcome::BackPressure);
        fake.push(reference.clone(), ResolverOutcome::Success(DigestRecord::new("md5", "AAAA")));

        let first = fake.resolve(ResolverRequest::new(reference.clone())).await;
        assert_eq!(first, ResolverOutcome::BackPressure);
        let second = fake.resolve(ResolverRequest::new(reference.clone())).await;
        assert_eq!(second, ResolverOutcome::Success(DigestRecord::new("md5", "AAAA")));

        assert_eq!(fake.call_count(&reference), 2);
    }

    #[tokio::test]
    async fn unscripted_reference_uses_default() {
        let fake = FakeResolverClient::new();
        let outcome = fake.resolve(ResolverRequest::new(ImageReference::new("ubuntu", "latest"))).await;
        assert_eq!(outcome, ResolverOutcome::BackPressure);
    }
}
