// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A file-backed gateway: one append-only JSONL file per workflow.
//!
//! Each `store` call appends a record; `load` replays the file and keeps
//! only the last record seen for each tag. There is no compaction or
//! checkpointing — the file only grows. For the digest-count-per-workflow
//! this coordinator deals with, that is an acceptable tradeoff rather than
//! an oversight.

use crate::{PersistenceGateway, StoreError};
use async_trait::async_trait;
use dcache_core::WorkflowId;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;

#[derive(Debug, Serialize, Deserialize)]
struct Record {
    tag: String,
    digest: String,
}

pub struct FileGateway {
    state_dir: PathBuf,
}

impl FileGateway {
    pub fn new(state_dir: impl Into<PathBuf>) -> Self {
        Self { state_dir: state_dir.into() }
    }

    fn path_for(&self, workflow_id: &WorkflowId) -> PathBuf {
        self.state_dir.join(format!("{workflow_id}.jsonl"))
    }
}

#[async_trait]
impl PersistenceGateway for FileGateway {
    async fn load(&self, workflow_id: &WorkflowId) -> Result<Vec<(String, String)>, StoreError> {
        let path = self.path_for(workflow_id);
        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(StoreError::Read { workflow_id: workflow_id.clone(), source }),
        };

        let mut by_tag: IndexMap<String, String> = IndexMap::new();
        for (idx, line) in contents.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let record: Record = serde_json::from_str(line).map_err(|err| StoreError::Malformed {
                workflow_id: workflow_id.clone(),
                line: idx + 1,
                reason: err.to_string(),
            })?;
            by_tag.insert(record.tag, record.digest);
        }
        Ok(by_tag.into_iter().collect())
    }

    async fn store(
        &self,
        workflow_id: &WorkflowId,
        tag: &str,
        digest: &str,
    ) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.state_dir)
            .await
            .map_err(|source| StoreError::Write { workflow_id: workflow_id.clone(), source })?;

        let path = self.path_for(workflow_id);
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|source| StoreError::Write { workflow_id: workflow_id.clone(), source })?;

        let record = Record { tag: tag.to_string(), digest: digest.to_string() };
        let mut line = serde_json::to_string(&record)
            .map_err(|source| StoreError::Encode { workflow_id: workflow_id.clone(), source })?;
        line.push('\n');

        file.write_all(line.as_bytes())
            .await
            .map_err(|source| StoreError::Write { workflow_id: workflow_id.clone(), source })?;
        file.flush().await.map_err(|source| StoreError::Write { workflow_id: workflow_id.clone(), source })?;
        Ok(())
    }
}
