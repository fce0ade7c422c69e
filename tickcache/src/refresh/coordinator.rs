// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Refresh lock set and background recomputation

use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::cache::{Json, TieredCache};
use crate::error::ProducerError;

/// One in-flight refresh
///
/// Destroyed when the recomputation finishes (success or failure) or when
/// the timeout task fires, whichever comes first. At most one exists per
/// key at any time.
struct RefreshLock {
    seq: u64,
    acquired_at: Instant,
    timeout_task: JoinHandle<()>,
}

struct Inner {
    cache: Arc<TieredCache>,
    locks: Mutex<HashMap<String, RefreshLock>>,
    lock_timeout: Duration,
    next_seq: AtomicU64,
}

impl Inner {
    fn clear(&self, key: &str) {
        if let Some(lock) = self.locks.lock().remove(key) {
            lock.timeout_task.abort();
        }
    }
}

/// Releases the refresh lock on every exit path of a producer task
struct ReleaseGuard {
    inner: Arc<Inner>,
    key: String,
}

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        self.inner.clear(&self.key);
    }
}

/// Deduplicates concurrent recomputation per key
///
/// State machine per key: `IDLE -> IN_FLIGHT -> IDLE`. This lock set is the
/// sole concurrency-control primitive of the subsystem. Cloning is cheap
/// and shares the underlying lock set.
#[derive(Clone)]
pub struct RefreshCoordinator {
    inner: Arc<Inner>,
}

impl RefreshCoordinator {
    pub fn new(cache: Arc<TieredCache>, lock_timeout: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                cache,
                locks: Mutex::new(HashMap::new()),
                lock_timeout,
                next_seq: AtomicU64::new(0),
            }),
        }
    }

    pub fn is_refreshing(&self, key: &str) -> bool {
        self.inner.locks.lock().contains_key(key)
    }

    /// Transition a key to `IN_FLIGHT`, arming the auto-release timeout
    ///
    /// If the key is already in flight, the existing timeout is replaced
    /// rather than stacked. When the timeout fires the lock is force-
    /// released even though the producer may still be running; its eventual
    /// `set` still lands (last write wins).
    pub fn mark_refreshing(&self, key: &str) {
        let seq = self.inner.next_seq.fetch_add(1, Ordering::Relaxed);

        let timeout_task = {
            let inner = self.inner.clone();
            let key = key.to_string();
            tokio::spawn(async move {
                tokio::time::sleep(inner.lock_timeout).await;
                let mut locks = inner.locks.lock();
                // Only release the lock this timer was armed for.
                if locks.get(&key).map(|lock| lock.seq) == Some(seq) {
                    let lock = locks.remove(&key);
                    let held = lock.map(|l| l.acquired_at.elapsed()).unwrap_or_default();
                    log::warn!(
                        "refresh lock for {} held {:?} without completing; force-releasing",
                        key,
                        held
                    );
                }
            })
        };

        let mut locks = self.inner.locks.lock();
        if let Some(previous) = locks.insert(
            key.to_string(),
            RefreshLock {
                seq,
                acquired_at: Instant::now(),
                timeout_task,
            },
        ) {
            previous.timeout_task.abort();
        }
    }

    /// Transition a key back to `IDLE`, cancelling the timeout
    pub fn clear_refreshing(&self, key: &str) {
        self.inner.clear(key);
    }

    /// Kick off a background recompute unless one is already in flight
    ///
    /// Returns whether a task was spawned. Producer errors are caught and
    /// logged, never propagated: whoever triggered the refresh already has
    /// a stale value to show. The lock is released through the guard on
    /// every exit, including panics.
    pub fn trigger_background<F>(&self, key: &str, ttl: Duration, producer: F) -> bool
    where
        F: Future<Output = Result<Json, ProducerError>> + Send + 'static,
    {
        if self.is_refreshing(key) {
            log::debug!("refresh of {} already in flight; skipping trigger", key);
            return false;
        }

        self.mark_refreshing(key);

        let inner = self.inner.clone();
        let key = key.to_string();
        tokio::spawn(async move {
            let _guard = ReleaseGuard {
                inner: inner.clone(),
                key: key.clone(),
            };
            match producer.await {
                Ok(value) => {
                    inner.cache.set(&key, value, ttl);
                    log::debug!("background refresh of {} completed", key);
                }
                Err(err) => {
                    log::warn!("background refresh of {} failed: {}", key, err);
                }
            }
        });

        true
    }

    /// Run a producer inline and write the result through the cache
    ///
    /// Used by the cold-miss read path and by watchdog remediation, where
    /// the caller needs the value (or the error) now. Marks the key in
    /// flight so concurrent background triggers are suppressed meanwhile.
    pub async fn refresh_now<F>(
        &self,
        key: &str,
        ttl: Duration,
        producer: F,
    ) -> Result<Arc<Json>, ProducerError>
    where
        F: Future<Output = Result<Json, ProducerError>> + Send,
    {
        self.mark_refreshing(key);
        let _guard = ReleaseGuard {
            inner: self.inner.clone(),
            key: key.to_string(),
        };

        match producer.await {
            Ok(value) => {
                let value = Arc::new(value);
                self.inner.cache.set(key, value.clone(), ttl);
                Ok(value)
            }
            Err(err) => {
                log::warn!("synchronous refresh of {} failed: {}", key, err);
                Err(err)
            }
        }
    }
}
