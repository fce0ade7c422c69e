// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Health polling and bounded self-repair
//!
//! The watchdog is the repair loop, distinct from the scheduler's normal
//! refresh cadence: it polls the critical cache entries the application
//! cannot render without, and when one looks degraded it performs a single
//! bounded remediation pass behind a cooldown. The cooldown applies
//! regardless of outcome so a still-broken upstream is never hammered by
//! remediation storms, and a human is only involved when remediation
//! itself fails.

pub mod critical;
pub mod monitor;

pub use critical::{CriticalKey, HealthIssue};
pub use monitor::{UpstreamClient, Watchdog};
