// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Durable snapshots of designated cache keys
//!
//! Durability here is a reload-on-boot convenience, not a system of record:
//! a fixed set of keys whose values are expensive to recompute is mirrored
//! to a durable store on every write, and read back exactly once at process
//! start. Reloads are strictly validated: a stale or malformed snapshot is
//! worse than an empty cache, because an empty cache degrades gracefully to
//! recomputation while a bad snapshot silently serves wrong answers.

pub mod adapter;
#[cfg(feature = "sled-backend")]
pub mod sled;
pub mod store;

pub use adapter::SnapshotAdapter;
#[cfg(feature = "sled-backend")]
pub use self::sled::SledSnapshotStore;
pub use store::{MemorySnapshotStore, SnapshotRow, SnapshotStore};
