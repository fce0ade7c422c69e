// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Durable store contract and the in-memory implementation for testing

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;

use crate::error::SnapshotError;

/// One persisted row, as returned by `select_all`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotRow {
    pub key: String,
    /// JSON-serialized cache value
    pub value: String,
    pub updated_at: DateTime<Utc>,
}

/// Minimal durable key/value contract
///
/// Upserts conflict on the primary key `key`. Writes may be reordered
/// relative to each other; the store is only ever read back in full, once,
/// at process start.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn upsert(
        &self,
        key: &str,
        value: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<(), SnapshotError>;

    async fn select_all(&self) -> Result<Vec<SnapshotRow>, SnapshotError>;
}

/// In-memory snapshot store for testing
pub struct MemorySnapshotStore {
    rows: RwLock<HashMap<String, (String, DateTime<Utc>)>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }
}

impl Default for MemorySnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn upsert(
        &self,
        key: &str,
        value: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<(), SnapshotError> {
        self.rows
            .write()
            .insert(key.to_string(), (value.to_string(), updated_at));
        Ok(())
    }

    async fn select_all(&self) -> Result<Vec<SnapshotRow>, SnapshotError> {
        Ok(self
            .rows
            .read()
            .iter()
            .map(|(key, (value, updated_at))| SnapshotRow {
                key: key.clone(),
                value: value.clone(),
                updated_at: *updated_at,
            })
            .collect())
    }
}
