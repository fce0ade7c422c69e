// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Per-key refresh deduplication
//!
//! Recomputing a cache key is expensive and rate-limited upstream, so at
//! most one producer invocation per key may be in flight at a time. The
//! lock that enforces this carries a hard auto-release timeout: a stuck
//! lock would silently starve all future refreshes of that key forever,
//! which is strictly worse than occasionally letting a second recompute
//! start while an unusually slow first one is still running.

pub mod coordinator;

pub use coordinator::RefreshCoordinator;

use std::future::Future;
use std::pin::Pin;

use crate::cache::Json;
use crate::error::ProducerError;

/// The future returned by a producer call
pub type ProducerFuture = Pin<Box<dyn Future<Output = Result<Json, ProducerError>> + Send>>;

/// An externally supplied function that computes a fresh value for a key
///
/// Producers must be safe to call concurrently with a previous still-running
/// invocation of themselves: idempotent recomputations of the same logical
/// quantity, side-effect-free beyond their return value.
pub type ProducerFn = dyn Fn() -> ProducerFuture + Send + Sync;
