// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use dcache_core::WorkflowId;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to read persisted state for workflow {workflow_id}: {source}")]
    Read {
        workflow_id: WorkflowId,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write persisted state for workflow {workflow_id}: {source}")]
    Write {
        workflow_id: WorkflowId,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed record for workflow {workflow_id} at line {line}: {reason}")]
    Malformed {
        workflow_id: WorkflowId,
        line: usize,
        reason: String,
    },

    #[error("failed to encode record for workflow {workflow_id}: {source}")]
    Encode {
        workflow_id: WorkflowId,
        #[source]
        source: serde_json::Error,
    },

    /// Injected by test doubles to exercise write-failure recovery paths.
    #[error("store rejected for workflow {workflow_id}: {reason}")]
    Rejected { workflow_id: WorkflowId, reason: String },
}
