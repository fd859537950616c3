// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Coordinator FSM state and in-flight request bookkeeping.

use crate::backoff::BackoffState;
use crate::messages::LookupReply;
use dcache_core::{DigestRecord, RequestId};

/// The coordinator's top-level lifecycle state.
///
/// `LoadingCache` and `Running` both accept lookups; `Terminal` is
/// absorbing — once reached, every lookup (buffered or new) fails with
/// [`crate::LookupError::Terminal`] and no further resolver or persistence
/// traffic is issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FsmState {
    LoadingCache,
    Running,
    Terminal(String),
}

/// Bookkeeping for one image reference with a resolver request in flight.
///
/// `resolved` distinguishes "still waiting on the resolver" from "resolver
/// answered, now just trying to persist it" — a timeout that fires after
/// `resolved` is set must not fail the waiters, since the coordinator has a
/// good digest in hand and only needs to retry the write.
pub(crate) struct InFlightEntry {
    pub request_id: RequestId,
    pub waiters: Vec<LookupReply>,
    pub backoff: BackoffState,
    pub resolved: Option<DigestRecord>,
}

impl InFlightEntry {
    pub fn new(request_id: RequestId, waiters: Vec<LookupReply>, backoff: BackoffState) -> Self {
        Self { request_id, waiters, backoff, resolved: None }
    }
}
