// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::StoreError;
use async_trait::async_trait;
use dcache_core::WorkflowId;

/// Durable per-workflow tag → digest storage.
///
/// A tag here is the cache key the coordinator resolves against (usually
/// the image reference's tag component); the digest is always persisted
/// and returned in its canonical `"<algorithm>:<value>"` form.
///
/// Implementations do not need to support concurrent writers for the same
/// workflow — the coordinator serializes all writes for a given
/// `WorkflowId` through its own single-threaded event loop.
#[async_trait]
pub trait PersistenceGateway: Send + Sync + 'static {
    /// Load every persisted `(tag, digest)` pair for `workflow_id`.
    ///
    /// A workflow with no prior state returns an empty vector, not an
    /// error. A malformed record anywhere in the persisted state fails the
    /// whole load.
    async fn load(&self, workflow_id: &WorkflowId) -> Result<Vec<(String, String)>, StoreError>;

    /// Persist a resolved digest for `tag` under `workflow_id`.
    ///
    /// Last write wins: storing a new digest for a tag that is already
    /// persisted overwrites the prior value.
    async fn store(
        &self,
        workflow_id: &WorkflowId,
        tag: &str,
        digest: &str,
    ) -> Result<(), StoreError>;
}
