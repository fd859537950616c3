// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A resolver backed by a fixed, pre-loaded digest map.
//!
//! Useful for air-gapped or pinned-digest deployments where the set of
//! image references a workflow may reference is known ahead of time and
//! there is no live registry to call.

use crate::{ResolverClient, ResolverOutcome, ResolverRequest};
use async_trait::async_trait;
use dcache_core::{DigestRecord, ImageReference};
use std::collections::HashMap;

/// Resolves references against a fixed in-memory map, never backpressures.
pub struct StaticResolverClient {
    digests: HashMap<ImageReference, DigestRecord>,
}

impl StaticResolverClient {
    pub fn new(digests: HashMap<ImageReference, DigestRecord>) -> Self {
        Self { digests }
    }
}

#[async_trait]
impl ResolverClient for StaticResolverClient {
    async fn resolve(&self, request: ResolverRequest) -> ResolverOutcome {
        match self.digests.get(&request.reference) {
            Some(digest) => ResolverOutcome::Success(digest.clone()),
            None => ResolverOutcome::Failure(format!("no pinned digest for {}", request.reference)),
        }
    }
}
