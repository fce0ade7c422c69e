// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Alert delivery seam
//!
//! The actual notification channel (email, chat, pager) lives outside this
//! crate; the watchdog only needs somewhere to hand a subject, details and
//! a category. `CooldownAlertSink` keeps a noisy failure from producing an
//! alert storm on this side of the seam, independent of whatever rate
//! limiting the channel itself applies.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Consumer of operator-facing alerts
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn send_alert(&self, subject: &str, details: &str, category: &str);
}

/// Sink that only writes to the log; the default when no channel is wired up
pub struct LogAlertSink;

#[async_trait]
impl AlertSink for LogAlertSink {
    async fn send_alert(&self, subject: &str, details: &str, category: &str) {
        log::error!("[alert:{}] {}: {}", category, subject, details);
    }
}

/// Decorator applying a per-category cooldown before forwarding
pub struct CooldownAlertSink {
    inner: Arc<dyn AlertSink>,
    cooldown: Duration,
    last_sent: Mutex<HashMap<String, Instant>>,
}

impl CooldownAlertSink {
    pub fn new(inner: Arc<dyn AlertSink>, cooldown: Duration) -> Self {
        Self {
            inner,
            cooldown,
            last_sent: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl AlertSink for CooldownAlertSink {
    async fn send_alert(&self, subject: &str, details: &str, category: &str) {
        {
            let mut last_sent = self.last_sent.lock();
            if let Some(last) = last_sent.get(category) {
                let elapsed = last.elapsed();
                if elapsed < self.cooldown {
                    log::info!(
                        "skipping {:?} alert ({:?} of cooldown remaining)",
                        category,
                        self.cooldown - elapsed
                    );
                    return;
                }
            }
            last_sent.insert(category.to_string(), Instant::now());
        }

        self.inner.send_alert(subject, details, category).await;
    }
}
