// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Loads a pinned `reference -> digest` map for [`dcache_resolver::StaticResolverClient`].
//!
//! Format: a JSON object mapping canonical `"<repository>:<tag>"` strings to
//! canonical `"<algorithm>:<value>"` digest strings, e.g.
//! `{"ubuntu:latest": "sha256:abcd..."}`.

use crate::error::DaemonError;
use dcache_core::{DigestRecord, ImageReference};
use std::collections::HashMap;
use std::path::Path;

pub fn load(path: &Path) -> Result<HashMap<ImageReference, DigestRecord>, DaemonError> {
    let contents = std::fs::read_to_string(path)
        .map_err(|source| DaemonError::PinnedDigestsRead { path: path.to_path_buf(), source })?;
    let raw: HashMap<String, String> = serde_json::from_str(&contents)
        .map_err(|source| DaemonError::PinnedDigestsParse { path: path.to_path_buf(), source })?;

    let mut digests = HashMap::with_capacity(raw.len());
    for (reference, digest) in raw {
        let parsed_reference = ImageReference::parse(&reference)
            .map_err(|source| DaemonError::PinnedDigestsReference { reference: reference.clone(), source })?;
        let parsed_digest = DigestRecord::parse(&digest)
            .map_err(|source| DaemonError::PinnedDigestsDigest { digest: digest.clone(), source })?;
        digests.insert(parsed_reference, parsed_digest);
    }
    Ok(digests)
}
