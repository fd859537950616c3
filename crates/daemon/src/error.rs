// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Top-level errors surfaced by the daemon binary.

use dcache_engine::ConfigError;

#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to create state directory {path}: {source}")]
    StateDir {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read pinned digests file {path}: {source}")]
    PinnedDigestsRead {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse pinned digests file {path}: {source}")]
    PinnedDigestsParse {
        path: std::path::PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to parse image reference {reference:?} in pinned digests file: {source}")]
    PinnedDigestsReference {
        reference: String,
        #[source]
        source: dcache_core::InvalidImageReference,
    },

    #[error("failed to parse digest {digest:?} in pinned digests file: {source}")]
    PinnedDigestsDigest {
        digest: String,
        #[source]
        source: dcache_core::InvalidDigest,
    },

    #[error(transparent)]
    Lookup(#[from] dcache_engine::LookupError),

    #[error("failed to read stdin: {0}")]
    Stdin(#[source] std::io::Error),
}
