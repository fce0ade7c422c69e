// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Scheduled time-window identifiers
//!
//! A window identifier names "which scheduled slot are we in right now".
//! It is computed by a single pure function of a zoned datetime so the
//! boundary rules live in exactly one place:
//!
//! - Saturdays and Sundays produce no window.
//! - Minutes outside the active-hours range produce no window.
//! - The first 30 minutes of the active range are the `Open` window and the
//!   last 30 minutes (inclusive of the final minute) are the `Close` window.
//! - Every other minute buckets into `Hour(h)` for minutes 00-29 and
//!   `Half(h)` for minutes 30-59 of local hour `h`.
//!
//! All arithmetic happens in the market's IANA timezone, so daylight-saving
//! shifts move the buckets with the market rather than with UTC.

use chrono::{DateTime, Datelike, NaiveDate, Timelike, Utc, Weekday};
use chrono_tz::Tz;
use std::fmt;

use crate::config::ActiveHours;

/// Coarse time bucket within a trading day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WindowSlot {
    /// First 30 minutes of the active range
    Open,
    /// Last 30 minutes of the active range
    Close,
    /// Minutes 00-29 of the local hour
    Hour(u32),
    /// Minutes 30-59 of the local hour
    Half(u32),
}

/// A derived identifier for one scheduled time slot
///
/// The scheduler remembers the last identifier it acted on; a given
/// identifier triggers work at most once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowId {
    pub date: NaiveDate,
    pub slot: WindowSlot,
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.slot {
            WindowSlot::Open => write!(f, "{}:open", self.date),
            WindowSlot::Close => write!(f, "{}:close", self.date),
            WindowSlot::Hour(h) => write!(f, "{}:{:02}h00", self.date, h),
            WindowSlot::Half(h) => write!(f, "{}:{:02}h30", self.date, h),
        }
    }
}

/// Compute the current window, if any, for a UTC instant
pub fn window_at(now: DateTime<Utc>, tz: Tz, hours: &ActiveHours) -> Option<WindowId> {
    let local = now.with_timezone(&tz);

    if matches!(local.weekday(), Weekday::Sat | Weekday::Sun) {
        return None;
    }

    let minute_of_day = local.hour() * 60 + local.minute();
    if !hours.contains(minute_of_day) {
        return None;
    }

    let slot = if minute_of_day < hours.start_minute + 30 {
        WindowSlot::Open
    } else if minute_of_day >= hours.end_minute - 30 {
        WindowSlot::Close
    } else if local.minute() < 30 {
        WindowSlot::Hour(local.hour())
    } else {
        WindowSlot::Half(local.hour())
    };

    Some(WindowId {
        date: local.date_naive(),
        slot,
    })
}
