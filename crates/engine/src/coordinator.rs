// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The per-workflow digest cache coordinator.
//!
//! A single-threaded event loop owns all state for one workflow and
//! processes exactly one [`CoordinatorMessage`] at a time from its inbox.
//! Resolver lookups and persistence calls are dispatched as spawned tasks
//! that post their results back through a cloned sender into the same
//! inbox, so the coordinator itself never awaits I/O directly.

use crate::backoff::BackoffState;
use crate::config::CoordinatorConfig;
use crate::errors::LookupError;
use crate::handle::CoordinatorHandle;
use crate::messages::{CoordinatorMessage, LookupReply};
use crate::state::{FsmState, InFlightEntry};
use dcache_core::{Clock, DigestRecord, ImageReference, WorkflowId};
use dcache_resolver::{ResolverClient, ResolverOutcome, ResolverRequest};
use dcache_storage::PersistenceGateway;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Spawn a coordinator for `workflow_id` and return a handle to it.
///
/// The coordinator immediately starts loading persisted state in the
/// background; lookups submitted before that completes are buffered and
/// replayed once it does.
pub fn spawn<R, P, C>(
    workflow_id: WorkflowId,
    resolver: Arc<R>,
    persistence: Arc<P>,
    clock: C,
    config: CoordinatorConfig,
) -> CoordinatorHandle
where
    R: ResolverClient,
    P: PersistenceGateway,
    C: Clock + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let handle = CoordinatorHandle::new(workflow_id.clone(), tx.clone());
    let coordinator = Coordinator {
        workflow_id,
        resolver,
        persistence,
        clock,
        config,
        state: FsmState::LoadingCache,
        cache: HashMap::new(),
        in_flight: HashMap::new(),
        pending_lookups: Vec::new(),
        inbox: rx,
        self_tx: tx,
    };
    tokio::spawn(coordinator.run());
    handle
}

/// Deliver a single outcome to every waiter for a reference: the one
/// routing procedure shared by the resolver adapter, the persistence
/// gateway client, and the terminal transition, instead of a fan-out loop
/// repeated at each call site.
fn respond(waiters: Vec<LookupReply>, outcome: Result<DigestRecord, LookupError>) {
    for waiter in waiters {
        let _ = waiter.send(outcome.clone());
    }
}

struct Coordinator<R, P, C> {
    workflow_id: WorkflowId,
    resolver: Arc<R>,
    persistence: Arc<P>,
    clock: C,
    config: CoordinatorConfig,
    state: FsmState,
    cache: HashMap<String, DigestRecord>,
    in_flight: HashMap<ImageReference, InFlightEntry>,
    pending_lookups: Vec<(ImageReference, LookupReply)>,
    inbox: mpsc::UnboundedReceiver<CoordinatorMessage>,
    self_tx: mpsc::UnboundedSender<CoordinatorMessage>,
}

impl<R, P, C> Coordinator<R, P, C>
where
    R: ResolverClient,
    P: PersistenceGateway,
    C: Clock,
{
    async fn run(mut self) {
        self.start_load();
        while let Some(message) = self.inbox.recv().await {
            tracing::debug!(workflow_id = %self.workflow_id, message = ?message, "handling message");
            self.handle_message(message);
        }
        tracing::debug!(workflow_id = %self.workflow_id, "coordinator inbox closed, exiting");
    }

    fn handle_message(&mut self, message: CoordinatorMessage) {
        match message {
            CoordinatorMessage::Lookup { reference, reply } => self.on_lookup(reference, reply),
            CoordinatorMessage::LoadCompleted { result } => self.on_load_completed(result),
            CoordinatorMessage::ResolverReplied { request_id, reference, outcome } => {
                self.on_resolver_replied(request_id, reference, outcome)
            }
            CoordinatorMessage::StoreCompleted { reference, tag, digest, live, result } => {
                self.on_store_completed(reference, tag, digest, live, result)
            }
            CoordinatorMessage::SelfTimeout { request_id, reference } => {
                self.on_timeout(request_id, reference)
            }
            CoordinatorMessage::BackoffElapsed { reference } => self.on_backoff_elapsed(reference),
        }
    }

    // --- startup load -----------------------------------------------------

    fn start_load(&self) {
        let persistence = Arc::clone(&self.persistence);
        let workflow_id = self.workflow_id.clone();
        let self_tx = self.self_tx.clone();
        tokio::spawn(async move {
            let result = persistence.load(&workflow_id).await;
            let _ = self_tx.send(CoordinatorMessage::LoadCompleted { result });
        });
    }

    fn on_load_completed(&mut self, result: Result<Vec<(String, String)>, dcache_storage::StoreError>) {
        let records = match result {
            Ok(records) => records,
            Err(err) => {
                tracing::error!(workflow_id = %self.workflow_id, error = %err, "failed to load persisted state");
                self.transition_terminal(format!("failed to load persisted state: {err}"));
                return;
            }
        };

        for (tag, digest) in records {
            if let Err(err) = ImageReference::parse(&tag) {
                tracing::error!(workflow_id = %self.workflow_id, %tag, error = %err, "unparseable persisted tag");
                self.transition_terminal(format!("unparseable persisted tag {tag:?}: {err}"));
                return;
            }
            match DigestRecord::parse(&digest) {
                Ok(record) => {
                    self.cache.insert(tag, record);
                }
                Err(err) => {
                    tracing::error!(workflow_id = %self.workflow_id, %tag, error = %err, "malformed persisted digest");
                    self.transition_terminal(format!("malformed persisted digest for tag {tag:?}: {err}"));
                    return;
                }
            }
        }

        self.state = FsmState::Running;
        tracing::info!(
            workflow_id = %self.workflow_id,
            cached = self.cache.len(),
            is_restart = self.config.is_restart,
            epoch_ms = self.clock.epoch_ms(),
            "cache loaded, coordinator running"
        );

        let buffered = std::mem::take(&mut self.pending_lookups);
        for (reference, reply) in buffered {
            self.handle_lookup(reference, reply);
        }
    }

    fn transition_terminal(&mut self, reason: String) {
        for (_, reply) in std::mem::take(&mut self.pending_lookups) {
            respond(vec![reply], Err(LookupError::Terminal(reason.clone())));
        }
        for (_, entry) in std::mem::take(&mut self.in_flight) {
            respond(entry.waiters, Err(LookupError::Terminal(reason.clone())));
        }
        self.state = FsmState::Terminal(reason);
    }

    // --- lookups ------------------------------------------------------------

    fn on_lookup(&mut self, reference: ImageReference, reply: LookupReply) {
        match &self.state {
            FsmState::Terminal(reason) => {
                let _ = reply.send(Err(LookupError::Terminal(reason.clone())));
            }
            FsmState::LoadingCache => self.pending_lookups.push((reference, reply)),
            FsmState::Running => self.handle_lookup(reference, reply),
        }
    }

    fn handle_lookup(&mut self, reference: ImageReference, reply: LookupReply) {
        let tag = reference.to_string();
        if let Some(digest) = self.cache.get(&tag) {
            tracing::debug!(workflow_id = %self.workflow_id, reference = %reference, "cache hit");
            let _ = reply.send(Ok(digest.clone()));
            return;
        }
        if let Some(entry) = self.in_flight.get_mut(&reference) {
            tracing::debug!(workflow_id = %self.workflow_id, reference = %reference, "joining in-flight resolver request");
            entry.waiters.push(reply);
            return;
        }
        self.start_resolve(reference, vec![reply]);
    }

    fn start_resolve(&mut self, reference: ImageReference, waiters: Vec<LookupReply>) {
        let request = ResolverRequest::new(reference.clone());
        let request_id = request.id.clone();
        self.dispatch_resolve(request);
        self.schedule_timeout(request_id.clone(), reference.clone());
        self.in_flight.insert(
            reference,
            InFlightEntry::new(request_id, waiters, BackoffState::new(self.config.backoff)),
        );
    }

    fn dispatch_resolve(&self, request: ResolverRequest) {
        let resolver = Arc::clone(&self.resolver);
        let self_tx = self.self_tx.clone();
        let reference = request.reference.clone();
        let request_id = request.id.clone();
        tokio::spawn(async move {
            let outcome = resolver.resolve(request).await;
            let _ = self_tx.send(CoordinatorMessage::ResolverReplied { request_id, reference, outcome });
        });
    }

    fn schedule_timeout(&self, request_id: dcache_core::RequestId, reference: ImageReference) {
        let timeout = self.config.resolver_timeout;
        let self_tx = self.self_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            let _ = self_tx.send(CoordinatorMessage::SelfTimeout { request_id, reference });
        });
    }

    // --- resolver replies -----------------------------------------------------

    fn on_resolver_replied(
        &mut self,
        request_id: dcache_core::RequestId,
        reference: ImageReference,
        outcome: ResolverOutcome,
    ) {
        if matches!(self.state, FsmState::Terminal(_)) {
            return;
        }

        match outcome {
            ResolverOutcome::Success(digest) => {
                let is_live = self
                    .in_flight
                    .get(&reference)
                    .map(|entry| entry.request_id == request_id)
                    .unwrap_or(false);
                if is_live {
                    if let Some(entry) = self.in_flight.get_mut(&reference) {
                        entry.resolved = Some(digest.clone());
                    }
                    self.begin_store(reference, digest, true);
                } else {
                    tracing::debug!(
                        workflow_id = %self.workflow_id,
                        reference = %reference,
                        "resolver reply arrived after its waiters stopped waiting, caching silently"
                    );
                    self.begin_store(reference, digest, false);
                }
            }
            ResolverOutcome::Failure(reason) => {
                let Some(entry) = self.in_flight.get(&reference) else { return };
                if entry.request_id != request_id {
                    return;
                }
                let Some(entry) = self.in_flight.remove(&reference) else { return };
                respond(entry.waiters, Err(LookupError::ResolverFailed(reason)));
            }
            ResolverOutcome::BackPressure => {
                let Some(entry) = self.in_flight.get(&reference) else { return };
                if entry.request_id != request_id {
                    return;
                }
                self.schedule_backoff(reference);
            }
        }
    }

    fn schedule_backoff(&mut self, reference: ImageReference) {
        let Some(entry) = self.in_flight.get_mut(&reference) else { return };
        let delay = entry.backoff.next_delay();
        let self_tx = self.self_tx.clone();
        let reference_clone = reference.clone();
        tracing::debug!(workflow_id = %self.workflow_id, reference = %reference, delay_ms = %delay.as_millis(), "backpressured, retrying after delay");
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = self_tx.send(CoordinatorMessage::BackoffElapsed { reference: reference_clone });
        });
    }

    fn on_backoff_elapsed(&mut self, reference: ImageReference) {
        if matches!(self.state, FsmState::Terminal(_)) {
            return;
        }
        let already_resolved = match self.in_flight.get(&reference) {
            Some(entry) => entry.resolved.is_some(),
            None => return,
        };
        if already_resolved {
            return;
        }
        let request = ResolverRequest::new(reference.clone());
        let request_id = request.id.clone();
        if let Some(entry) = self.in_flight.get_mut(&reference) {
            entry.request_id = request_id.clone();
        }
        self.dispatch_resolve(request);
        self.schedule_timeout(request_id, reference);
    }

    fn on_timeout(&mut self, request_id: dcache_core::RequestId, reference: ImageReference) {
        if matches!(self.state, FsmState::Terminal(_)) {
            return;
        }
        let should_fail = self
            .in_flight
            .get(&reference)
            .map(|entry| entry.request_id == request_id && entry.resolved.is_none())
            .unwrap_or(false);
        if !should_fail {
            return;
        }
        let Some(entry) = self.in_flight.remove(&reference) else { return };
        respond(entry.waiters, Err(LookupError::Timeout));
    }

    // --- persistence -----------------------------------------------------

    fn begin_store(&mut self, reference: ImageReference, digest: DigestRecord, live: bool) {
        let tag = reference.to_string();
        let persistence = Arc::clone(&self.persistence);
        let workflow_id = self.workflow_id.clone();
        let self_tx = self.self_tx.clone();
        let canonical = digest.canonical();
        let store_reference = reference.clone();
        let store_digest = digest.clone();
        tokio::spawn(async move {
            let result = persistence.store(&workflow_id, &tag, &canonical).await;
            let _ = self_tx.send(CoordinatorMessage::StoreCompleted {
                reference: store_reference,
                tag,
                digest: store_digest,
                live,
                result,
            });
        });
    }

    fn on_store_completed(
        &mut self,
        reference: ImageReference,
        tag: String,
        digest: DigestRecord,
        live: bool,
        result: Result<(), dcache_storage::StoreError>,
    ) {
        if matches!(self.state, FsmState::Terminal(_)) {
            return;
        }
        match result {
            Ok(()) => {
                self.cache.insert(tag, digest.clone());
                if live {
                    if let Some(entry) = self.in_flight.remove(&reference) {
                        respond(entry.waiters, Ok(digest));
                    }
                }
            }
            Err(err) => {
                if live {
                    tracing::warn!(
                        workflow_id = %self.workflow_id,
                        reference = %reference,
                        error = %err,
                        "persist failed, failing waiters; a future lookup will retry"
                    );
                    if let Some(entry) = self.in_flight.remove(&reference) {
                        respond(entry.waiters, Err(LookupError::WriteFailed(err.to_string())));
                    }
                } else {
                    tracing::warn!(
                        workflow_id = %self.workflow_id,
                        reference = %reference,
                        error = %err,
                        "late resolver reply failed to persist, dropping"
                    );
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "coordinator_tests.rs"]
mod tests;

#[cfg(test)]
#[path = "property_tests.rs"]
mod property_tests;
