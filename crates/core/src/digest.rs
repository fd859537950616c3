// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Digest records: the resolver's answer for an [`crate::ImageReference`].
//!
//! A digest is opaque to the coordinator beyond its canonical
//! `"<algorithm>:<value>"` string form, which is what gets persisted and
//! rehydrated.

use std::fmt;

/// An immutable content digest, as returned by the resolver.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DigestRecord {
    algorithm: String,
    value: String,
    /// Resolver-supplied side information (e.g. a size hint). Opaque to the
    /// coordinator; never interpreted, only carried through to callers.
    #[serde(default)]
    pub extra: std::collections::HashMap<String, String>,
}

/// A persisted digest string failed to parse into algorithm and value.
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid digest string {0:?}: expected \"<algorithm>:<value>\"")]
pub struct InvalidDigest(pub String);

impl DigestRecord {
    pub fn new(algorithm: impl Into<String>, value: impl Into<String>) -> Self {
        Self { algorithm: algorithm.into(), value: value.into(), extra: Default::default() }
    }

    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// Canonical persisted form: `"<algorithm>:<value>"`.
    pub fn canonical(&self) -> String {
        format!("{}:{}", self.algorithm, self.value)
    }

    /// Parse the canonical `"<algorithm>:<value>"` form, splitting on the
    /// *first* `:` (digest values such as hex hashes never contain `:`, but
    /// splitting on first keeps the rule simple and matches how it is
    /// written).
    pub fn parse(s: &str) -> Result<Self, InvalidDigest> {
        let (algorithm, value) = s.split_once(':').ok_or_else(|| InvalidDigest(s.to_string()))?;
        if algorithm.is_empty() || value.is_empty() {
            return Err(InvalidDigest(s.to_string()));
        }
        Ok(Self { algorithm: algorithm.to_string(), value: value.to_string(), extra: Default::default() })
    }
}

impl fmt::Display for DigestRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical())
    }
}

#[cfg(test)]
#[path = "digest_tests.rs"]
mod tests;
