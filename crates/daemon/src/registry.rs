// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Owns one running coordinator per workflow id.
//!
//! The registry itself needs no locking beyond a short critical section
//! around its map: each entry is a cheap, cloneable [`CoordinatorHandle`]
//! whose own state lives entirely inside the coordinator's task.

use dcache_core::{Clock, WorkflowId};
use dcache_engine::{CoordinatorConfig, CoordinatorHandle};
use dcache_resolver::ResolverClient;
use dcache_storage::PersistenceGateway;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

pub struct CoordinatorRegistry<R, P, C> {
    resolver: Arc<R>,
    persistence: Arc<P>,
    clock: C,
    config: CoordinatorConfig,
    handles: Mutex<HashMap<WorkflowId, CoordinatorHandle>>,
}

impl<R, P, C> CoordinatorRegistry<R, P, C>
where
    R: ResolverClient,
    P: PersistenceGateway,
    C: Clock + 'static,
{
    pub fn new(resolver: Arc<R>, persistence: Arc<P>, clock: C, config: CoordinatorConfig) -> Self {
        Self { resolver, persistence, clock, config, handles: Mutex::new(HashMap::new()) }
    }

    /// Return the handle for `workflow_id`, spawning a fresh coordinator
    /// for it on first use. `is_restart` only matters the first time a
    /// given workflow id is seen by this registry.
    pub fn get_or_spawn(&self, workflow_id: WorkflowId, is_restart: bool) -> CoordinatorHandle {
        let mut handles = self.handles.lock();
        if let Some(handle) = handles.get(&workflow_id) {
            return handle.clone();
        }
        let config = self.config.is_restart(is_restart);
        let handle = dcache_engine::spawn(
            workflow_id.clone(),
            Arc::clone(&self.resolver),
            Arc::clone(&self.persistence),
            self.clock.clone(),
            config,
        );
        handles.insert(workflow_id, handle.clone());
        handle
    }

    /// Drop this registry's handle to `workflow_id`'s coordinator. The
    /// coordinator task exits once every sender (this one and any held by
    /// callers) is dropped.
    pub fn remove(&self, workflow_id: &WorkflowId) -> Option<CoordinatorHandle> {
        self.handles.lock().remove(workflow_id)
    }

    pub fn len(&self) -> usize {
        self.handles.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
