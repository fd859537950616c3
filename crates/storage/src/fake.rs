// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! An in-memory gateway with scriptable failures, for coordinator tests.

use crate::{PersistenceGateway, StoreError};
use async_trait::async_trait;
use dcache_core::WorkflowId;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};

/// What a scripted `store` call should do.
#[derive(Debug, Clone)]
pub enum StoreScript {
    Succeed,
    Reject(String),
}

#[derive(Default)]
struct Inner {
    records: HashMap<WorkflowId, Vec<(String, String)>>,
    store_script: HashMap<WorkflowId, VecDeque<StoreScript>>,
    store_calls: Vec<(WorkflowId, String, String)>,
}

pub struct FakeGateway {
    inner: Mutex<Inner>,
}

impl Default for FakeGateway {
    fn default() -> Self {
        Self { inner: Mutex::new(Inner::default()) }
    }
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed `workflow_id` with persisted records, as if loaded from a prior run.
    pub fn seed(&self, workflow_id: WorkflowId, records: Vec<(String, String)>) {
        self.inner.lock().records.insert(workflow_id, records);
    }

    /// Queue a scripted outcome for the next `store` call against `workflow_id`.
    pub fn script_store(&self, workflow_id: WorkflowId, script: StoreScript) {
        self.inner.lock().store_script.entry(workflow_id).or_default().push_back(script);
    }

    pub fn store_call_count(&self) -> usize {
        self.inner.lock().store_calls.len()
    }

    pub fn records_for(&self, workflow_id: &WorkflowId) -> Vec<(String, String)> {
        self.inner.lock().records.get(workflow_id).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl PersistenceGateway for FakeGateway {
    async fn load(&self, workflow_id: &WorkflowId) -> Result<Vec<(String, String)>, StoreError> {
        Ok(self.inner.lock().records.get(workflow_id).cloned().unwrap_or_default())
    }

    async fn store(
        &self,
        workflow_id: &WorkflowId,
        tag: &str,
        digest: &str,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        inner.store_calls.push((workflow_id.clone(), tag.to_string(), digest.to_string()));

        let scripted = inner.store_script.get_mut(workflow_id).and_then(|q| q.pop_front());
        if let Some(StoreScript::Reject(reason)) = scripted {
            return Err(StoreError::Rejected { workflow_id: workflow_id.clone(), reason });
        }

        let entries = inner.records.entry(workflow_id.clone()).or_default();
        if let Some(existing) = entries.iter_mut().find(|(t, _)| t == tag) {
            existing.1 = digest.to_string();
        } else {
            entries.push((tag.to_string(), digest.to_string()));
        }
        Ok(())
    }
}
