// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Calendar-driven refresh scheduling
//!
//! The scheduler's timer fires far more often than the market calendar
//! changes state, so every tick is reduced to a coarse window identifier
//! and work fires only when the identifier changes. Collapsed identifiers
//! (from clock drift or a missed tick) under-trigger rather than double-
//! trigger expensive upstream work.

pub mod scheduler;
pub mod window;

pub use scheduler::Scheduler;
pub use window::{window_at, WindowId, WindowSlot};
