// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Tiered in-memory cache
//!
//! Two tiers back every key: a *primary* tier holding fresh values under
//! short per-key TTLs, and a *stale* tier holding the same values under a
//! long uniform TTL as a fallback. A primary expiry therefore still leaves
//! a usable (if old) value behind, which is what lets the request path
//! serve instantly while recomputation happens in the background.

pub mod store;
pub mod tier;

pub use store::{CacheStats, TieredCache};
pub use tier::Tier;

use std::sync::Arc;

/// Cached values are arbitrary JSON documents shared behind `Arc`
pub type Json = serde_json::Value;

/// How fresh a looked-up value is
///
/// Returned alongside every read so call sites never have to remember
/// whether they are looking at possibly-old data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Served from the primary tier, within its TTL
    Fresh,
    /// Served from the stale tier; a recompute should be (or has been) triggered
    Stale,
    /// Absent from both tiers
    Missing,
}

/// Result of a tiered lookup
#[derive(Debug, Clone)]
pub struct Lookup {
    pub value: Option<Arc<Json>>,
    pub freshness: Freshness,
}

impl Lookup {
    pub(crate) fn miss() -> Self {
        Self {
            value: None,
            freshness: Freshness::Missing,
        }
    }
}
