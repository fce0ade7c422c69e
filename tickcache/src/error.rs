// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Error types for the caching subsystem
//!
//! Failures are grouped by where they originate: producer calls against
//! upstream providers, and writes/reads against the durable snapshot store.
//! Nothing in this crate propagates an error into a request path; these
//! types exist so the recovery policy at each call site is explicit.

use thiserror::Error;

/// Error types for producer invocations
///
/// A producer is the externally supplied function that computes a fresh
/// value for a cache key. Producer failures are absorbed by the refresh
/// machinery and logged; callers keep serving the stale value.
#[derive(Error, Debug)]
pub enum ProducerError {
    #[error("upstream call failed: {0}")]
    Upstream(String),

    #[error("upstream returned insufficient data: {got} records, need {need}")]
    Insufficient { got: u64, need: u64 },

    #[error("producer timed out after {0:?}")]
    Timeout(std::time::Duration),
}

/// Error types for durable snapshot operations
#[derive(Error, Debug)]
pub enum SnapshotError {
    /// The store could not be reached or the call timed out. Writes hitting
    /// this variant are retried once before being dropped.
    #[error("snapshot store unavailable: {0}")]
    Unavailable(String),

    /// The store rejected the operation. Never retried.
    #[error("snapshot store rejected operation: {0}")]
    Rejected(String),

    #[error("snapshot serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl SnapshotError {
    /// Whether a single bounded retry is warranted
    pub fn is_transient(&self) -> bool {
        matches!(self, SnapshotError::Unavailable(_))
    }
}
