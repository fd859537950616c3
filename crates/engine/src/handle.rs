// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A cheap, cloneable handle to a running coordinator.

use crate::errors::LookupError;
use crate::messages::CoordinatorMessage;
use dcache_core::{DigestRecord, ImageReference, WorkflowId};
use tokio::sync::{mpsc, oneshot};

#[derive(Clone)]
pub struct CoordinatorHandle {
    workflow_id: WorkflowId,
    sender: mpsc::UnboundedSender<CoordinatorMessage>,
}

impl CoordinatorHandle {
    pub(crate) fn new(workflow_id: WorkflowId, sender: mpsc::UnboundedSender<CoordinatorMessage>) -> Self {
        Self { workflow_id, sender }
    }

    pub fn workflow_id(&self) -> &WorkflowId {
        &self.workflow_id
    }

    /// Resolve the digest for `reference`, deduplicating against any
    /// in-flight request for the same reference.
    pub async fn lookup(&self, reference: ImageReference) -> Result<DigestRecord, LookupError> {
        let (reply, rx) = oneshot::channel();
        self.sender
            .send(CoordinatorMessage::Lookup { reference, reply })
            .map_err(|_| LookupError::Terminal("coordinator inbox closed".to_string()))?;
        rx.await.unwrap_or_else(|_| {
            Err(LookupError::Terminal("coordinator dropped without replying".to_string()))
        })
    }
}
