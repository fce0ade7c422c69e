// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! The watchdog loop: detect degradation, remediate behind a cooldown

use async_trait::async_trait;
use chrono::{Datelike, Timelike, Utc, Weekday};
use chrono_tz::Tz;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::critical::{CriticalKey, HealthIssue};
use crate::alert::AlertSink;
use crate::cache::TieredCache;
use crate::config::{ActiveHours, CacheSettings};
use crate::error::ProducerError;
use crate::refresh::RefreshCoordinator;

/// The upstream dependency the watchdog can probe and reset
#[async_trait]
pub trait UpstreamClient: Send + Sync {
    /// Drop any cached authentication/session material so the next call
    /// re-establishes from scratch
    fn reset_session(&self);

    /// Lightweight synthetic request; returns a record count
    async fn probe(&self) -> Result<u64, ProducerError>;
}

/// Remediation bookkeeping, mutated only by the watchdog
struct WatchdogState {
    last_heal: Option<Instant>,
}

/// One detected problem, attributed to a critical key or to the upstream
#[derive(Debug)]
pub(crate) struct Finding {
    pub key: Option<String>,
    pub issue: HealthIssue,
}

/// Periodic health-check-and-repair loop
///
/// Runs on its own timer, independent of the scheduler, and only after a
/// minimum process uptime so an empty cache during boot is not mistaken for
/// degradation.
pub struct Watchdog {
    cache: Arc<TieredCache>,
    coordinator: RefreshCoordinator,
    upstream: Arc<dyn UpstreamClient>,
    alerts: Arc<dyn AlertSink>,
    critical: Vec<CriticalKey>,

    interval: Duration,
    min_uptime: Duration,
    cooldown: Duration,
    stale_threshold: Duration,
    remediation_pause: Duration,
    tz: Tz,
    hours: ActiveHours,

    state: Mutex<WatchdogState>,
    started_at: Instant,
}

/// Whether the market is trading at the given instant
pub(crate) fn market_active_at(
    now: chrono::DateTime<Utc>,
    tz: Tz,
    hours: &ActiveHours,
) -> bool {
    let local = now.with_timezone(&tz);
    if matches!(local.weekday(), Weekday::Sat | Weekday::Sun) {
        return false;
    }
    hours.contains(local.hour() * 60 + local.minute())
}

impl Watchdog {
    pub fn new(
        cache: Arc<TieredCache>,
        coordinator: RefreshCoordinator,
        upstream: Arc<dyn UpstreamClient>,
        alerts: Arc<dyn AlertSink>,
        critical: Vec<CriticalKey>,
        settings: &CacheSettings,
    ) -> Self {
        Self {
            cache,
            coordinator,
            upstream,
            alerts,
            critical,
            interval: settings.watchdog_interval,
            min_uptime: settings.watchdog_min_uptime,
            cooldown: settings.heal_cooldown,
            stale_threshold: settings.stale_data_threshold,
            remediation_pause: settings.remediation_pause,
            tz: settings.timezone(),
            hours: settings.active_hours,
            state: Mutex::new(WatchdogState { last_heal: None }),
            started_at: Instant::now(),
        }
    }

    /// Run one health pass: evaluate, then remediate if the cooldown allows
    pub async fn tick(&self) {
        let findings = self.evaluate().await;
        if findings.is_empty() {
            return;
        }

        for finding in &findings {
            match &finding.key {
                Some(key) => log::warn!("watchdog: {} unhealthy: {}", key, finding.issue),
                None => log::warn!("watchdog: {}", finding.issue),
            }
        }

        {
            let mut state = self.state.lock();
            if let Some(last_heal) = state.last_heal {
                if last_heal.elapsed() < self.cooldown {
                    log::info!(
                        "watchdog: remediation suppressed, {:?} left of cooldown",
                        self.cooldown - last_heal.elapsed()
                    );
                    return;
                }
            }
            // The cooldown runs from the attempt, regardless of outcome.
            state.last_heal = Some(Instant::now());
        }

        let healthy = self.remediate(&findings).await;
        if !healthy {
            let details = findings
                .iter()
                .map(|f| match &f.key {
                    Some(key) => format!("{}: {}", key, f.issue),
                    None => f.issue.to_string(),
                })
                .collect::<Vec<_>>()
                .join("\n");
            self.alerts
                .send_alert("Cache health degraded", &details, "watchdog")
                .await;
        }
    }

    /// Evaluate every health check; empty result means healthy
    pub(crate) async fn evaluate(&self) -> Vec<Finding> {
        let mut findings = Vec::new();
        let market_active = self.market_active();

        for ck in &self.critical {
            let Some(value) = self.cache.lookup(&ck.key).value else {
                findings.push(Finding {
                    key: Some(ck.key.clone()),
                    issue: HealthIssue::Empty,
                });
                continue;
            };

            if let Some(issue) = super::critical::check_value(
                ck,
                &value,
                Utc::now(),
                market_active,
                self.stale_threshold,
            ) {
                findings.push(Finding {
                    key: Some(ck.key.clone()),
                    issue,
                });
            }
        }

        // Proactive canary: probe the upstream even when every cached value
        // still looks fine.
        match self.upstream.probe().await {
            Ok(0) => findings.push(Finding {
                key: None,
                issue: HealthIssue::ProbeFailed("probe returned zero records".to_string()),
            }),
            Ok(_) => {}
            Err(err) => findings.push(Finding {
                key: None,
                issue: HealthIssue::ProbeFailed(err.to_string()),
            }),
        }

        findings
    }

    /// One bounded repair pass; returns whether health was restored
    async fn remediate(&self, findings: &[Finding]) -> bool {
        log::info!("watchdog: starting remediation");

        self.upstream.reset_session();
        tokio::time::sleep(self.remediation_pause).await;

        for ck in &self.critical {
            if !findings.iter().any(|f| f.key.as_deref() == Some(&ck.key)) {
                continue;
            }

            let result = self
                .coordinator
                .refresh_now(&ck.key, ck.ttl, (ck.producer)())
                .await;

            let sufficient = match &result {
                Ok(value) => ck
                    .record_count(value)
                    .map_or(true, |count| count >= ck.min_records),
                Err(_) => false,
            };

            if !sufficient {
                let Some(fallback) = &ck.fallback else {
                    continue;
                };
                log::warn!(
                    "watchdog: primary provider insufficient for {}; trying fallback",
                    ck.key
                );
                if let Err(err) = self
                    .coordinator
                    .refresh_now(&ck.key, ck.ttl, fallback())
                    .await
                {
                    log::error!("watchdog: fallback recompute of {} failed: {}", ck.key, err);
                }
            }
        }

        let after = self.evaluate().await;
        if after.is_empty() {
            log::info!("watchdog: remediation restored health");
            true
        } else {
            log::error!(
                "watchdog: remediation left {} issue(s) unresolved",
                after.len()
            );
            false
        }
    }

    fn market_active(&self) -> bool {
        market_active_at(Utc::now(), self.tz, &self.hours)
    }

    /// Run the recurring health timer
    pub fn spawn(self: &Arc<Self>) -> JoinHandle<()> {
        let watchdog = self.clone();
        tokio::spawn(async move {
            let mut ticks = tokio::time::interval(watchdog.interval);
            ticks.tick().await; // immediate first tick
            loop {
                ticks.tick().await;
                if watchdog.started_at.elapsed() < watchdog.min_uptime {
                    log::debug!("watchdog: inside boot grace period; skipping checks");
                    continue;
                }
                watchdog.tick().await;
            }
        })
    }
}
