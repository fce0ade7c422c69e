// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Sled-backed snapshot store

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::store::{SnapshotRow, SnapshotStore};
use crate::error::SnapshotError;

/// On-disk row format; timestamps are epoch milliseconds
#[derive(Debug, Serialize, Deserialize)]
struct StoredRow {
    value: String,
    updated_at_ms: i64,
}

/// Embedded snapshot store backed by sled
pub struct SledSnapshotStore {
    // The Db must outlive the tree handle.
    _db: sled::Db,
    tree: sled::Tree,
}

impl SledSnapshotStore {
    /// Open or create the store at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SnapshotError> {
        let db = sled::open(path).map_err(map_sled_err)?;
        let tree = db.open_tree("snapshots").map_err(map_sled_err)?;
        Ok(Self { _db: db, tree })
    }
}

#[async_trait]
impl SnapshotStore for SledSnapshotStore {
    async fn upsert(
        &self,
        key: &str,
        value: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<(), SnapshotError> {
        let row = StoredRow {
            value: value.to_string(),
            updated_at_ms: updated_at.timestamp_millis(),
        };
        let bytes = serde_json::to_vec(&row)?;
        self.tree
            .insert(key.as_bytes(), bytes)
            .map_err(map_sled_err)?;
        self.tree.flush_async().await.map_err(map_sled_err)?;
        Ok(())
    }

    async fn select_all(&self) -> Result<Vec<SnapshotRow>, SnapshotError> {
        let mut rows = Vec::new();
        for item in self.tree.iter() {
            let (key, bytes) = item.map_err(map_sled_err)?;
            let key = String::from_utf8_lossy(&key).to_string();
            let stored: StoredRow = match serde_json::from_slice(&bytes) {
                Ok(stored) => stored,
                Err(err) => {
                    // A corrupt row should not poison the whole reload.
                    log::warn!("skipping undecodable snapshot row {}: {}", key, err);
                    continue;
                }
            };
            let updated_at = match Utc.timestamp_millis_opt(stored.updated_at_ms).single() {
                Some(ts) => ts,
                None => {
                    log::warn!("skipping snapshot row {} with invalid timestamp", key);
                    continue;
                }
            };
            rows.push(SnapshotRow {
                key,
                value: stored.value,
                updated_at,
            });
        }
        Ok(rows)
    }
}

fn map_sled_err(err: sled::Error) -> SnapshotError {
    match err {
        sled::Error::Io(io) => SnapshotError::Unavailable(io.to_string()),
        other => SnapshotError::Rejected(other.to_string()),
    }
}
