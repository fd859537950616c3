// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Errors surfaced to a coordinator's callers.

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    #[error("resolver reported failure: {0}")]
    ResolverFailed(String),
    #[error("resolver request timed out")]
    Timeout,
    #[error("failed to persist resolved digest: {0}")]
    WriteFailed(String),
    #[error("coordinator is terminal: {0}")]
    Terminal(String),
}
