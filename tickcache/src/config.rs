// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Cache configuration and policies
//!
//! Every tunable of the subsystem lives here as a named, documented setting:
//! tier TTLs and bounds, sweep cadence, the refresh lock timeout, scheduler
//! tick and active-hours window, and the watchdog's interval, uptime gate,
//! cooldown and staleness threshold. Settings can be overridden from
//! `TICKCACHE_*` environment variables.

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default TTLs for the well-known market-data key families, in seconds.
///
/// Callers pass one of these to `TieredCache::set` / `CacheReader::fetch`;
/// they are defaults, not enforced policy.
pub mod ttl {
    use std::time::Duration;

    pub const QUOTE: Duration = Duration::from_secs(60);
    pub const HISTORY: Duration = Duration::from_secs(300);
    pub const FUNDAMENTALS: Duration = Duration::from_secs(3600);
    pub const EARNINGS: Duration = Duration::from_secs(3600);
    pub const PROFILE: Duration = Duration::from_secs(86_400);
    pub const SECTORS: Duration = Duration::from_secs(43_200);
    pub const INDICES: Duration = Duration::from_secs(60);
    pub const BREADTH: Duration = Duration::from_secs(43_200);
    pub const NEWS: Duration = Duration::from_secs(900);
    pub const INDUSTRY_PERF: Duration = Duration::from_secs(43_200);
    pub const SCREENER: Duration = Duration::from_secs(86_400);
}

/// Minute-of-day range during which the market is considered active
///
/// Minutes are counted from local midnight in the market timezone. The
/// default covers 09:30 through 16:00 US equities hours, inclusive of the
/// closing minute. The first 30 minutes of the range form the "open"
/// scheduling window and the last 30 minutes the "close" window.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActiveHours {
    /// First active minute of day (default 570 = 09:30)
    pub start_minute: u32,

    /// Last active minute of day, inclusive (default 960 = 16:00)
    pub end_minute: u32,
}

impl Default for ActiveHours {
    fn default() -> Self {
        Self {
            start_minute: 570,
            end_minute: 960,
        }
    }
}

impl ActiveHours {
    /// Whether the given minute-of-day falls inside the active range
    pub fn contains(&self, minute_of_day: u32) -> bool {
        minute_of_day >= self.start_minute && minute_of_day <= self.end_minute
    }
}

/// Global configuration for the cache subsystem
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Maximum number of entries in the primary tier
    pub primary_max_entries: usize,

    /// Maximum number of entries in the stale tier
    pub stale_max_entries: usize,

    /// Fixed TTL applied to every stale-tier write (default 3 days)
    pub stale_ttl: Duration,

    /// How often the primary tier sweeps out expired entries
    pub primary_sweep_interval: Duration,

    /// How often the stale tier sweeps out expired entries
    pub stale_sweep_interval: Duration,

    /// TTL applied to rows restored from a durable snapshot at boot
    pub warm_ttl: Duration,

    /// Snapshot rows older than this are rejected at load time (default 3 days)
    pub max_snapshot_age: Duration,

    /// Delay before the single retry of a failed snapshot write
    pub persist_retry_delay: Duration,

    /// Hard auto-release timeout for a per-key refresh lock (default 120s)
    pub refresh_lock_timeout: Duration,

    /// How often the scheduler evaluates the current time window
    pub scheduler_tick: Duration,

    /// Minute-of-day range during which scheduled refreshes fire
    pub active_hours: ActiveHours,

    /// IANA timezone of the market calendar (default "America/New_York")
    pub market_timezone: String,

    /// How often the watchdog polls critical cache entries
    pub watchdog_interval: Duration,

    /// Watchdog checks are suppressed until the process has been up this long
    pub watchdog_min_uptime: Duration,

    /// Minimum time between remediation attempts, regardless of outcome
    pub heal_cooldown: Duration,

    /// Embedded timestamps older than this count as stale during active hours
    pub stale_data_threshold: Duration,

    /// Pause between clearing upstream session state and forced recomputes,
    /// to respect upstream rate limits
    pub remediation_pause: Duration,

    /// Per-category cooldown applied by `CooldownAlertSink`
    pub alert_cooldown: Duration,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            primary_max_entries: 1000,
            stale_max_entries: 5000,
            stale_ttl: Duration::from_secs(86_400 * 3),
            primary_sweep_interval: Duration::from_secs(120),
            stale_sweep_interval: Duration::from_secs(600),
            warm_ttl: Duration::from_secs(1800),
            max_snapshot_age: Duration::from_secs(86_400 * 3),
            persist_retry_delay: Duration::from_secs(2),
            refresh_lock_timeout: Duration::from_secs(120),
            scheduler_tick: Duration::from_secs(60),
            active_hours: ActiveHours::default(),
            market_timezone: "America/New_York".to_string(),
            watchdog_interval: Duration::from_secs(180),
            watchdog_min_uptime: Duration::from_secs(600),
            heal_cooldown: Duration::from_secs(600),
            stale_data_threshold: Duration::from_secs(6 * 3600),
            remediation_pause: Duration::from_secs(2),
            alert_cooldown: Duration::from_secs(1800),
        }
    }
}

impl CacheSettings {
    /// Build settings from the environment, starting from defaults
    ///
    /// Recognized variables (all durations in whole seconds):
    /// `TICKCACHE_STALE_TTL`, `TICKCACHE_WARM_TTL`,
    /// `TICKCACHE_MAX_SNAPSHOT_AGE`, `TICKCACHE_LOCK_TIMEOUT`,
    /// `TICKCACHE_SCHEDULER_TICK`, `TICKCACHE_WATCHDOG_INTERVAL`,
    /// `TICKCACHE_HEAL_COOLDOWN`, `TICKCACHE_STALE_DATA_THRESHOLD`,
    /// `TICKCACHE_MARKET_TZ`, `TICKCACHE_ACTIVE_START_MINUTE`,
    /// `TICKCACHE_ACTIVE_END_MINUTE`.
    pub fn from_env() -> Result<Self, String> {
        let mut settings = Self::default();

        if let Some(secs) = env_u64("TICKCACHE_STALE_TTL")? {
            settings.stale_ttl = Duration::from_secs(secs);
        }
        if let Some(secs) = env_u64("TICKCACHE_WARM_TTL")? {
            settings.warm_ttl = Duration::from_secs(secs);
        }
        if let Some(secs) = env_u64("TICKCACHE_MAX_SNAPSHOT_AGE")? {
            settings.max_snapshot_age = Duration::from_secs(secs);
        }
        if let Some(secs) = env_u64("TICKCACHE_LOCK_TIMEOUT")? {
            settings.refresh_lock_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = env_u64("TICKCACHE_SCHEDULER_TICK")? {
            settings.scheduler_tick = Duration::from_secs(secs);
        }
        if let Some(secs) = env_u64("TICKCACHE_WATCHDOG_INTERVAL")? {
            settings.watchdog_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = env_u64("TICKCACHE_HEAL_COOLDOWN")? {
            settings.heal_cooldown = Duration::from_secs(secs);
        }
        if let Some(secs) = env_u64("TICKCACHE_STALE_DATA_THRESHOLD")? {
            settings.stale_data_threshold = Duration::from_secs(secs);
        }
        if let Ok(tz) = std::env::var("TICKCACHE_MARKET_TZ") {
            settings.market_timezone = tz;
        }
        if let Some(minute) = env_u64("TICKCACHE_ACTIVE_START_MINUTE")? {
            settings.active_hours.start_minute = minute as u32;
        }
        if let Some(minute) = env_u64("TICKCACHE_ACTIVE_END_MINUTE")? {
            settings.active_hours.end_minute = minute as u32;
        }

        settings.validate()?;
        Ok(settings)
    }

    /// Parse the configured market timezone, falling back to UTC
    pub fn timezone(&self) -> Tz {
        match self.market_timezone.parse::<Tz>() {
            Ok(tz) => tz,
            Err(_) => {
                log::error!(
                    "invalid market timezone {:?}; falling back to UTC",
                    self.market_timezone
                );
                Tz::UTC
            }
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.primary_max_entries == 0 || self.stale_max_entries == 0 {
            return Err("cache tiers must have max_entries > 0".to_string());
        }

        if self.refresh_lock_timeout.is_zero() {
            return Err("refresh_lock_timeout must be > 0".to_string());
        }

        if self.market_timezone.parse::<Tz>().is_err() {
            return Err(format!(
                "unknown market timezone: {}",
                self.market_timezone
            ));
        }

        let hours = &self.active_hours;
        if hours.end_minute >= 1440 || hours.start_minute >= hours.end_minute {
            return Err(format!(
                "active hours range {}..={} is not a valid minute-of-day span",
                hours.start_minute, hours.end_minute
            ));
        }

        // The open and close scheduling windows each claim 30 minutes of the
        // active range and must not overlap.
        if hours.end_minute - hours.start_minute < 60 {
            return Err("active hours span must be at least 60 minutes".to_string());
        }

        Ok(())
    }
}

fn env_u64(name: &str) -> Result<Option<u64>, String> {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse::<u64>()
            .map(Some)
            .map_err(|_| format!("{} must be an integer, got {:?}", name, raw)),
        Err(_) => Ok(None),
    }
}
