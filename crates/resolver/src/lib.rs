// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! dcache-resolver: the digest resolver's message contract.
//!
//! The resolver is an external, rate-limited, potentially-timing-out
//! service. This crate models it only as an async trait — the actual wire
//! transport (HTTP/gRPC to a registry) is outside this repository's scope.

mod r#static;

pub use r#static::StaticResolverClient;

#[cfg(any(test, feature = "test-support"))]
pub mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeResolverClient;

use async_trait::async_trait;
use dcache_core::{ImageReference, RequestId};

/// A request forwarded to the resolver. Carries a correlation id so a
/// reply can always be matched back to the request that produced it, even
/// if it arrives late (after the coordinator stopped waiting for it).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverRequest {
    pub id: RequestId,
    pub reference: ImageReference,
}

impl ResolverRequest {
    pub fn new(reference: ImageReference) -> Self {
        Self { id: RequestId::new(), reference }
    }
}

/// The resolver's reply to a [`ResolverRequest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolverOutcome {
    Success(dcache_core::DigestRecord),
    Failure(String),
    /// The resolver is overloaded and refuses the request; retry later.
    BackPressure,
}

/// The digest resolver's message contract.
///
/// `resolve` is fire-and-forget from the coordinator's point of view: it
/// returns the outcome directly rather than emulating a separate reply
/// channel, because the coordinator always awaits it from a spawned task
/// and posts the result back through its own inbox (see the engine crate).
#[async_trait]
pub trait ResolverClient: Send + Sync + 'static {
    async fn resolve(&self, request: ResolverRequest) -> ResolverOutcome;
}
