// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! The two-tier cache store

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use super::tier::{spawn_sweeper, Tier};
use super::{Freshness, Json, Lookup};
use crate::config::CacheSettings;
use crate::snapshot::SnapshotAdapter;

/// Cache statistics
#[derive(Debug, Default, Clone)]
pub struct CacheStats {
    pub primary_entries: usize,
    pub stale_entries: usize,
    pub hits: u64,
    pub stale_hits: u64,
    pub misses: u64,
    pub insertions: u64,
}

/// Two-tier key/value store with stale fallback and best-effort persistence
///
/// Every `set` lands in both tiers: the primary tier under the caller's TTL
/// and the stale tier under the long fixed TTL, so a later primary expiry
/// still leaves a usable fallback. Keys tracked by the attached snapshot
/// adapter are additionally mirrored to durable storage, fire-and-forget.
pub struct TieredCache {
    primary: Arc<Tier>,
    stale: Arc<Tier>,
    stale_ttl: Duration,
    primary_sweep_interval: Duration,
    stale_sweep_interval: Duration,
    snapshot: Option<Arc<SnapshotAdapter>>,

    hits: AtomicU64,
    stale_hits: AtomicU64,
    misses: AtomicU64,
    insertions: AtomicU64,
}

impl TieredCache {
    /// Create a cache with no durable mirroring
    pub fn new(settings: &CacheSettings) -> Self {
        Self::with_snapshot(settings, None)
    }

    /// Create a cache that mirrors the adapter's tracked keys to durable storage
    pub fn with_snapshot(
        settings: &CacheSettings,
        snapshot: Option<Arc<SnapshotAdapter>>,
    ) -> Self {
        Self {
            primary: Arc::new(Tier::new("primary", settings.primary_max_entries)),
            stale: Arc::new(Tier::new("stale", settings.stale_max_entries)),
            stale_ttl: settings.stale_ttl,
            primary_sweep_interval: settings.primary_sweep_interval,
            stale_sweep_interval: settings.stale_sweep_interval,
            snapshot,
            hits: AtomicU64::new(0),
            stale_hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            insertions: AtomicU64::new(0),
        }
    }

    /// Write a value to both tiers, mirroring tracked keys to durable storage
    ///
    /// The durable write happens on a spawned task; it can neither block nor
    /// fail this call. The tier writes are independent of each other and of
    /// persistence.
    pub fn set(&self, key: &str, value: impl Into<Arc<Json>>, ttl: Duration) {
        let value: Arc<Json> = value.into();
        self.primary.insert(key, value.clone(), ttl);
        self.stale.insert(key, value.clone(), self.stale_ttl);
        self.insertions.fetch_add(1, Ordering::Relaxed);

        if let Some(adapter) = &self.snapshot {
            if adapter.tracks(key) {
                let adapter = adapter.clone();
                let key = key.to_string();
                tokio::spawn(async move {
                    adapter.persist(&key, &value).await;
                });
            }
        }
    }

    /// Primary-tier lookup only; never falls back to the stale tier
    ///
    /// Callers wanting fallback semantics must call `get_stale` or `lookup`
    /// explicitly, keeping the "possibly-old data" decision visible.
    pub fn get(&self, key: &str) -> Option<Arc<Json>> {
        match self.primary.get(key) {
            Some(value) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(value)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Stale-tier lookup only
    pub fn get_stale(&self, key: &str) -> Option<Arc<Json>> {
        let value = self.stale.get(key);
        if value.is_some() {
            self.stale_hits.fetch_add(1, Ordering::Relaxed);
        }
        value
    }

    /// Tiered lookup with explicit freshness
    pub fn lookup(&self, key: &str) -> Lookup {
        if let Some(value) = self.get(key) {
            return Lookup {
                value: Some(value),
                freshness: Freshness::Fresh,
            };
        }
        if let Some(value) = self.get_stale(key) {
            return Lookup {
                value: Some(value),
                freshness: Freshness::Stale,
            };
        }
        Lookup::miss()
    }

    /// Remove a key from both tiers
    ///
    /// Used when the data is known invalid, e.g. an admin-triggered force
    /// refresh.
    pub fn delete(&self, key: &str) {
        self.primary.remove(key);
        self.stale.remove(key);
    }

    /// Flush the primary tier; the stale tier survives as a last resort
    pub fn clear(&self) {
        self.primary.clear();
        log::info!("primary tier flushed");
    }

    /// Write a restored snapshot row into both tiers, without re-persisting
    pub(crate) fn restore(&self, key: &str, value: Json, ttl: Duration) {
        let value = Arc::new(value);
        self.primary.insert(key, value.clone(), ttl);
        self.stale.insert(key, value, self.stale_ttl);
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            primary_entries: self.primary.len(),
            stale_entries: self.stale.len(),
            hits: self.hits.load(Ordering::Relaxed),
            stale_hits: self.stale_hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            insertions: self.insertions.load(Ordering::Relaxed),
        }
    }

    /// Spawn the periodic expiry sweep for each tier
    pub fn spawn_sweepers(&self) -> Vec<JoinHandle<()>> {
        vec![
            spawn_sweeper(self.primary.clone(), self.primary_sweep_interval),
            spawn_sweeper(self.stale.clone(), self.stale_sweep_interval),
        ]
    }
}
