// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Window-deduplicated dispatch of refresh task families

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use parking_lot::{Mutex, RwLock};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use super::window::{window_at, WindowId};
use crate::config::{ActiveHours, CacheSettings};

type TaskFuture = Pin<Box<dyn Future<Output = ()> + Send>>;
type TaskFn = dyn Fn() -> TaskFuture + Send + Sync;

/// One registered family of refresh work
///
/// Families run independently of each other; the `running` flag only guards
/// against re-entering the *same* family while its previous window's run is
/// still going.
struct TaskFamily {
    name: String,
    running: Arc<AtomicBool>,
    run: Arc<TaskFn>,
}

/// Clears a family's running flag on every exit path
struct RunningGuard(Arc<AtomicBool>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Fires registered refresh tasks once per scheduled window
///
/// The timer ticks far more often than windows change; the last-acted-on
/// window identifier is what turns ticks into at-most-once dispatches.
pub struct Scheduler {
    families: RwLock<Vec<TaskFamily>>,
    last_window: Mutex<Option<WindowId>>,
    tz: Tz,
    hours: ActiveHours,
    tick_interval: Duration,
}

impl Scheduler {
    pub fn new(settings: &CacheSettings) -> Self {
        Self {
            families: RwLock::new(Vec::new()),
            last_window: Mutex::new(None),
            tz: settings.timezone(),
            hours: settings.active_hours,
            tick_interval: settings.scheduler_tick,
        }
    }

    /// Register a named task family
    pub fn register<F, Fut>(&self, name: &str, task: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.families.write().push(TaskFamily {
            name: name.to_string(),
            running: Arc::new(AtomicBool::new(false)),
            run: Arc::new(move || Box::pin(task()) as TaskFuture),
        });
    }

    /// Evaluate one tick at the given instant
    ///
    /// Returns whether a new window was entered and tasks were dispatched.
    /// Outside active hours (and on weekends) this is a no-op. When clock
    /// drift collapses two windows into one identifier, only one fires.
    pub fn observe(&self, now: DateTime<Utc>) -> bool {
        let Some(window) = window_at(now, self.tz, &self.hours) else {
            return false;
        };

        {
            let mut last = self.last_window.lock();
            if *last == Some(window) {
                return false;
            }
            *last = Some(window);
        }

        log::info!("entering window {}", window);
        self.dispatch();
        true
    }

    /// Spawn every registered family, skipping any still running
    fn dispatch(&self) {
        for family in self.families.read().iter() {
            if family.running.swap(true, Ordering::SeqCst) {
                log::warn!(
                    "task family {} still running from a previous window; skipping",
                    family.name
                );
                continue;
            }

            let name = family.name.clone();
            let running = family.running.clone();
            let run = family.run.clone();
            tokio::spawn(async move {
                let _guard = RunningGuard(running);
                log::debug!("task family {} starting", name);
                run().await;
                log::debug!("task family {} finished", name);
            });
        }
    }

    /// Run the recurring evaluation timer
    pub fn spawn(self: &Arc<Self>) -> JoinHandle<()> {
        let scheduler = self.clone();
        tokio::spawn(async move {
            let mut ticks = tokio::time::interval(scheduler.tick_interval);
            ticks.tick().await; // immediate first tick
            loop {
                ticks.tick().await;
                scheduler.observe(Utc::now());
            }
        })
    }
}
