// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! TickCache - tiered market-data caching with background refresh
//!
//! TickCache sits between an HTTP API and slow, rate-limited market-data
//! providers. Responses are never computed synchronously on the request
//! path when it can be avoided: reads are served from a tiered in-memory
//! cache while recomputation happens in the background.
//!
//! # Features
//!
//! - **Tiered cache**: a primary tier with short per-key TTLs backed by a
//!   stale tier with a multi-day TTL, so an expired value still serves as a
//!   fallback while a fresh one is produced
//! - **Refresh deduplication**: per-key locks with a hard auto-release
//!   timeout keep at most one producer invocation in flight
//! - **Durable snapshots**: a designated key set survives restarts via an
//!   embedded store, strictly validated on reload
//! - **Market-aware scheduling**: refresh work fires once per calendar
//!   window (open, close, hour, half-hour), timezone-aware
//! - **Watchdog**: a repair loop that detects empty, zero-sized or stale
//!   critical entries, remediates behind a cooldown and alerts when repair
//!   fails
//!
//! # Usage
//!
//! ```rust,ignore
//! let settings = CacheSettings::from_env()?;
//! let store = Arc::new(SledSnapshotStore::open("./snapshots")?);
//! let adapter = Arc::new(SnapshotAdapter::new(
//!     store,
//!     ["market_breadth".to_string()],
//!     &settings,
//! ));
//! let cache = Arc::new(TieredCache::with_snapshot(&settings, Some(adapter.clone())));
//! adapter.load_all(&cache).await;
//! cache.spawn_sweepers();
//!
//! let coordinator = RefreshCoordinator::new(cache.clone(), settings.refresh_lock_timeout);
//! let reader = CacheReader::new(cache.clone(), coordinator.clone());
//! ```

pub mod alert;
pub mod cache;
pub mod config;
pub mod error;
pub mod reader;
pub mod refresh;
pub mod sched;
pub mod snapshot;
pub mod watchdog;

pub use alert::{AlertSink, CooldownAlertSink, LogAlertSink};
pub use cache::{CacheStats, Freshness, Json, Lookup, TieredCache};
pub use config::{ttl, ActiveHours, CacheSettings};
pub use error::{ProducerError, SnapshotError};
pub use reader::CacheReader;
pub use refresh::{ProducerFn, ProducerFuture, RefreshCoordinator};
pub use sched::{window_at, Scheduler, WindowId, WindowSlot};
#[cfg(feature = "sled-backend")]
pub use snapshot::SledSnapshotStore;
pub use snapshot::{MemorySnapshotStore, SnapshotAdapter, SnapshotRow, SnapshotStore};
pub use watchdog::{CriticalKey, HealthIssue, UpstreamClient, Watchdog};

/// TickCache version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// TickCache crate name
pub const CRATE_NAME: &str = env!("CARGO_PKG_NAME");
