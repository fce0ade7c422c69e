// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Stale-while-revalidate read path

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{Freshness, Lookup, TieredCache};
use crate::error::ProducerError;
use crate::refresh::RefreshCoordinator;

/// The inbound read path over cache and coordinator
///
/// `fetch` encodes the whole serving policy in one place, so call sites can
/// never forget to trigger a refresh after serving stale data: a primary
/// hit returns immediately; a stale hit returns the old value and kicks off
/// a background recompute; a full miss recomputes synchronously, and if
/// even that fails the caller gets `Missing` while a background retry
/// continues.
pub struct CacheReader {
    cache: Arc<TieredCache>,
    coordinator: RefreshCoordinator,
}

impl CacheReader {
    pub fn new(cache: Arc<TieredCache>, coordinator: RefreshCoordinator) -> Self {
        Self { cache, coordinator }
    }

    pub async fn fetch<F, Fut>(&self, key: &str, ttl: Duration, producer: F) -> Lookup
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<crate::cache::Json, ProducerError>> + Send + 'static,
    {
        if let Some(value) = self.cache.get(key) {
            return Lookup {
                value: Some(value),
                freshness: Freshness::Fresh,
            };
        }

        if let Some(value) = self.cache.get_stale(key) {
            self.coordinator.trigger_background(key, ttl, producer());
            return Lookup {
                value: Some(value),
                freshness: Freshness::Stale,
            };
        }

        match self.coordinator.refresh_now(key, ttl, producer()).await {
            Ok(value) => Lookup {
                value: Some(value),
                freshness: Freshness::Fresh,
            },
            Err(err) => {
                log::warn!("cold fetch of {} failed: {}; retrying in background", key, err);
                self.coordinator.trigger_background(key, ttl, producer());
                Lookup::miss()
            }
        }
    }
}
