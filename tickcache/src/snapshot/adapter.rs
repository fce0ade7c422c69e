// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Best-effort persistence of tracked keys, strict validation on reload

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use super::store::SnapshotStore;
use crate::cache::{Json, TieredCache};
use crate::config::CacheSettings;

/// Shape validator applied to each row at load time; all registered
/// validators must accept a row for it to be restored.
pub type Validator = dyn Fn(&str, &Json) -> bool + Send + Sync;

/// Callback invoked with a restored row's timestamp
pub type RestoreHook = dyn Fn(DateTime<Utc>) + Send + Sync;

/// Mirrors a fixed set of keys to a durable store and restores them at boot
///
/// The tracked key set is decided at startup, not runtime: durability is
/// expensive and reserved for values that are costly to recompute or needed
/// to render instantly on cold start.
pub struct SnapshotAdapter {
    store: Arc<dyn SnapshotStore>,
    tracked: HashSet<String>,
    validators: RwLock<Vec<Box<Validator>>>,
    restore_hooks: RwLock<HashMap<String, Box<RestoreHook>>>,
    max_age: Duration,
    warm_ttl: Duration,
    retry_delay: Duration,
}

impl SnapshotAdapter {
    pub fn new(
        store: Arc<dyn SnapshotStore>,
        tracked: impl IntoIterator<Item = String>,
        settings: &CacheSettings,
    ) -> Self {
        Self {
            store,
            tracked: tracked.into_iter().collect(),
            validators: RwLock::new(Vec::new()),
            restore_hooks: RwLock::new(HashMap::new()),
            max_age: settings.max_snapshot_age,
            warm_ttl: settings.warm_ttl,
            retry_delay: settings.persist_retry_delay,
        }
    }

    /// Whether the key is mirrored to durable storage
    pub fn tracks(&self, key: &str) -> bool {
        self.tracked.contains(key)
    }

    /// Register a shape validator; validators are ANDed at load time
    pub fn register_validator<F>(&self, validator: F)
    where
        F: Fn(&str, &Json) -> bool + Send + Sync + 'static,
    {
        self.validators.write().push(Box::new(validator));
    }

    /// Register a callback invoked with the restored timestamp of `key`
    ///
    /// Lets dependent subsystems learn "restored, but as-of this time".
    pub fn on_restore<F>(&self, key: &str, hook: F)
    where
        F: Fn(DateTime<Utc>) + Send + Sync + 'static,
    {
        self.restore_hooks
            .write()
            .insert(key.to_string(), Box::new(hook));
    }

    /// Serialize and upsert one value, retrying once on a transient failure
    ///
    /// Durability is best-effort: a second consecutive failure, or any
    /// permanent failure, is logged and dropped.
    pub async fn persist(&self, key: &str, value: &Json) {
        let serialized = match serde_json::to_string(value) {
            Ok(serialized) => serialized,
            Err(err) => {
                log::error!("cannot serialize {} for snapshot: {}", key, err);
                return;
            }
        };

        match self.store.upsert(key, &serialized, Utc::now()).await {
            Ok(()) => {}
            Err(err) if err.is_transient() => {
                log::warn!("snapshot write for {} failed ({}); retrying once", key, err);
                tokio::time::sleep(self.retry_delay).await;
                if let Err(err) = self.store.upsert(key, &serialized, Utc::now()).await {
                    log::error!("snapshot write for {} dropped after retry: {}", key, err);
                }
            }
            Err(err) => {
                log::error!("snapshot write for {} dropped: {}", key, err);
            }
        }
    }

    /// Restore validated rows into both cache tiers
    ///
    /// Called exactly once at process start, before any concurrent readers
    /// exist, so no locking is needed beyond the cache's own. Rows are
    /// rejected when the key is untracked, the row is older than the maximum
    /// snapshot age, the value fails to parse, or any registered validator
    /// declines it. Returns the number of rows restored.
    pub async fn load_all(&self, cache: &TieredCache) -> usize {
        let rows = match self.store.select_all().await {
            Ok(rows) => rows,
            Err(err) => {
                log::error!("snapshot reload failed: {}", err);
                return 0;
            }
        };

        let validators = self.validators.read();
        let hooks = self.restore_hooks.read();
        let mut restored = 0;

        for row in rows {
            if !self.tracks(&row.key) {
                log::debug!("snapshot row {} is not tracked; skipping", row.key);
                continue;
            }

            let age = Utc::now().signed_duration_since(row.updated_at);
            if age.num_seconds() < 0 || age.num_seconds() as u64 > self.max_age.as_secs() {
                log::warn!(
                    "snapshot row {} is {}h old (max {}h); skipping",
                    row.key,
                    age.num_hours(),
                    self.max_age.as_secs() / 3600
                );
                continue;
            }

            let value: Json = match serde_json::from_str(&row.value) {
                Ok(value) => value,
                Err(err) => {
                    log::warn!("snapshot row {} failed to parse: {}", row.key, err);
                    continue;
                }
            };

            if !validators.iter().all(|validate| validate(&row.key, &value)) {
                log::warn!("snapshot row {} rejected by validator; skipping", row.key);
                continue;
            }

            cache.restore(&row.key, value, self.warm_ttl);
            if let Some(hook) = hooks.get(&row.key) {
                hook(row.updated_at);
            }
            restored += 1;
            log::info!(
                "restored {} from snapshot (as of {})",
                row.key,
                row.updated_at
            );
        }

        restored
    }
}
