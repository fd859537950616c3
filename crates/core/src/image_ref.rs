// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Image references: the mapping key for the digest cache.
//!
//! An [`ImageReference`] pairs a repository with a mutable tag (e.g.
//! `ubuntu:latest`). It canonicalizes to `"<repository>:<tag>"`, which is
//! also the form persisted as the row key by the storage gateway and the
//! form re-parsed on rehydration (see [`ImageReference::parse`]).

use std::fmt;

/// A container image reference: a repository plus a mutable tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct ImageReference {
    repository: String,
    tag: String,
}

/// An image reference string failed to parse into repository and tag.
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid image reference {0:?}: expected \"<repository>:<tag>\"")]
pub struct InvalidImageReference(pub String);

impl ImageReference {
    /// Construct directly from a known-good repository and tag.
    pub fn new(repository: impl Into<String>, tag: impl Into<String>) -> Self {
        Self { repository: repository.into(), tag: tag.into() }
    }

    pub fn repository(&self) -> &str {
        &self.repository
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Parse `"<repository>:<tag>"`, splitting on the *last* `:` so
    /// repositories containing a registry host:port (`host:5000/name:tag`)
    /// still split correctly. Both halves must be non-empty.
    pub fn parse(s: &str) -> Result<Self, InvalidImageReference> {
        let (repository, tag) = s.rsplit_once(':').ok_or_else(|| InvalidImageReference(s.to_string()))?;
        if repository.is_empty() || tag.is_empty() {
            return Err(InvalidImageReference(s.to_string()));
        }
        Ok(Self { repository: repository.to_string(), tag: tag.to_string() })
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.repository, self.tag)
    }
}

impl From<&ImageReference> for String {
    fn from(r: &ImageReference) -> Self {
        r.to_string()
    }
}

#[cfg(test)]
#[path = "image_ref_tests.rs"]
mod tests;
