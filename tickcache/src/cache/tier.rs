// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! A single cache tier: named TTL'd key/value map with periodic sweeping

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::Json;

/// One cached entry
///
/// An entry is only ever returned while `stored_at + ttl` lies in the
/// future; expired entries are dropped on read and by the sweeper.
#[derive(Debug, Clone)]
pub(crate) struct CacheEntry {
    pub value: Arc<Json>,
    pub stored_at: Instant,
    pub ttl: Duration,
}

impl CacheEntry {
    fn is_expired(&self) -> bool {
        self.stored_at.elapsed() > self.ttl
    }
}

/// A named collection of TTL'd entries with a maximum key-count bound
pub struct Tier {
    name: &'static str,
    max_entries: usize,
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl Tier {
    pub fn new(name: &'static str, max_entries: usize) -> Self {
        Self {
            name,
            max_entries,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Insert or overwrite an entry, evicting to stay within the bound
    pub fn insert(&self, key: &str, value: Arc<Json>, ttl: Duration) {
        let mut entries = self.entries.write();

        if !entries.contains_key(key) && entries.len() >= self.max_entries {
            Self::evict_one(self.name, &mut entries);
        }

        entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                stored_at: Instant::now(),
                ttl,
            },
        );
    }

    /// Get a live entry, dropping it if it has expired
    pub fn get(&self, key: &str) -> Option<Arc<Json>> {
        let mut entries = self.entries.write();
        match entries.get(key) {
            Some(entry) if entry.is_expired() => {
                entries.remove(key);
                None
            }
            Some(entry) => Some(entry.value.clone()),
            None => None,
        }
    }

    pub fn remove(&self, key: &str) -> bool {
        self.entries.write().remove(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Drop every expired entry, returning how many were evicted
    ///
    /// Runs periodically so expiry does not depend on a key ever being read.
    pub fn sweep(&self) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired());
        let evicted = before - entries.len();
        if evicted > 0 {
            log::debug!("[{}] sweep evicted {} expired entries", self.name, evicted);
        }
        evicted
    }

    /// Evict an expired entry if one exists, otherwise the oldest entry
    fn evict_one(name: &str, entries: &mut HashMap<String, CacheEntry>) {
        let victim = entries
            .iter()
            .find(|(_, e)| e.is_expired())
            .or_else(|| entries.iter().min_by_key(|(_, e)| e.stored_at))
            .map(|(k, _)| k.clone());

        if let Some(key) = victim {
            log::debug!("[{}] at capacity; evicting {}", name, key);
            entries.remove(&key);
        }
    }
}

/// Spawn the periodic sweep loop for a tier
pub(crate) fn spawn_sweeper(tier: Arc<Tier>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticks = tokio::time::interval(period);
        ticks.tick().await; // immediate first tick
        loop {
            ticks.tick().await;
            tier.sweep();
        }
    })
}
