// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The coordinator's inbox message contract.

use crate::errors::LookupError;
use dcache_core::{DigestRecord, ImageReference, RequestId};
use dcache_resolver::ResolverOutcome;
use dcache_storage::StoreError;
use tokio::sync::oneshot;

pub type LookupReply = oneshot::Sender<Result<DigestRecord, LookupError>>;

/// Every event a coordinator processes flows through this single enum,
/// whether it originated from a caller or from one of the coordinator's
/// own spawned background tasks replying to itself.
pub enum CoordinatorMessage {
    /// A caller wants the digest for `reference`.
    Lookup {
        reference: ImageReference,
        reply: LookupReply,
    },
    /// The persistence gateway finished the startup load.
    LoadCompleted {
        result: Result<Vec<(String, String)>, StoreError>,
    },
    /// The resolver replied to a request previously dispatched by this
    /// coordinator. May arrive after the coordinator stopped waiting for it.
    ResolverReplied {
        request_id: RequestId,
        reference: ImageReference,
        outcome: ResolverOutcome,
    },
    /// A persist attempt for `reference` finished. `live` is true when this
    /// store was driven by a waiter still being tracked in-flight; false
    /// when it is a best-effort cache warm for a reply that arrived after
    /// its waiters already timed out.
    StoreCompleted {
        reference: ImageReference,
        tag: String,
        digest: DigestRecord,
        live: bool,
        result: Result<(), StoreError>,
    },
    /// The self-imposed per-request timeout elapsed.
    SelfTimeout {
        request_id: RequestId,
        reference: ImageReference,
    },
    /// The backoff delay for a backpressured request elapsed; retry it.
    BackoffElapsed { reference: ImageReference },
}

impl std::fmt::Debug for CoordinatorMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lookup { reference, .. } => {
                f.debug_struct("Lookup").field("reference", reference).finish()
            }
            Self::LoadCompleted { result } => {
                f.debug_struct("LoadCompleted").field("ok", &result.is_ok()).finish()
            }
            Self::ResolverReplied { request_id, reference, outcome } => f
                .debug_struct("ResolverReplied")
                .field("request_id", request_id)
                .field("reference", reference)
                .field("outcome", outcome)
                .finish(),
            Self::StoreCompleted { reference, tag, live, result, .. } => f
                .debug_struct("StoreCompleted")
                .field("reference", reference)
                .field("tag", tag)
                .field("live", live)
                .field("ok", &result.is_ok())
                .finish(),
            Self::SelfTimeout { request_id, reference } => f
                .debug_struct("SelfTimeout")
                .field("request_id", request_id)
                .field("reference", reference)
                .finish(),
            Self::BackoffElapsed { reference } => {
                f.debug_struct("BackoffElapsed").field("reference", reference).finish()
            }
        }
    }
}
