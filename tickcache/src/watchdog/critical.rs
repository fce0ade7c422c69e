// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Critical key descriptions and health conditions

use chrono::{DateTime, TimeZone, Utc};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::Json;
use crate::refresh::ProducerFn;

/// A cache key the watchdog guards
///
/// The JSON pointers describe where, inside the cached document, the record
/// count and the "last computed" epoch-milliseconds timestamp live. Keys
/// without a pointer simply skip the corresponding check.
pub struct CriticalKey {
    pub key: String,
    pub ttl: Duration,
    /// Remediation falls back to the secondary producer when a recompute
    /// yields fewer records than this.
    pub min_records: u64,
    pub count_pointer: Option<String>,
    pub computed_at_pointer: Option<String>,
    pub producer: Arc<ProducerFn>,
    pub fallback: Option<Arc<ProducerFn>>,
}

impl CriticalKey {
    pub fn new(key: &str, ttl: Duration, producer: Arc<ProducerFn>) -> Self {
        Self {
            key: key.to_string(),
            ttl,
            min_records: 1,
            count_pointer: None,
            computed_at_pointer: None,
            producer,
            fallback: None,
        }
    }

    pub fn with_fallback(mut self, fallback: Arc<ProducerFn>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn with_count_pointer(mut self, pointer: &str, min_records: u64) -> Self {
        self.count_pointer = Some(pointer.to_string());
        self.min_records = min_records;
        self
    }

    pub fn with_computed_at_pointer(mut self, pointer: &str) -> Self {
        self.computed_at_pointer = Some(pointer.to_string());
        self
    }

    /// Extract the embedded record count, if this key declares one
    pub(crate) fn record_count(&self, value: &Json) -> Option<u64> {
        let pointer = self.count_pointer.as_deref()?;
        value.pointer(pointer).and_then(Json::as_u64)
    }

    /// Extract the embedded "last computed" timestamp, if declared
    pub(crate) fn computed_at(&self, value: &Json) -> Option<DateTime<Utc>> {
        let pointer = self.computed_at_pointer.as_deref()?;
        let millis = value.pointer(pointer)?.as_i64()?;
        Utc.timestamp_millis_opt(millis).single()
    }
}

/// Check a present cached value against the key's declared health fields
///
/// `market_active` gates the staleness check: outside active hours an old
/// embedded timestamp is legitimate, the market simply has not produced
/// anything newer.
pub(crate) fn check_value(
    ck: &CriticalKey,
    value: &Json,
    now: DateTime<Utc>,
    market_active: bool,
    stale_threshold: Duration,
) -> Option<HealthIssue> {
    if ck.record_count(value) == Some(0) {
        return Some(HealthIssue::NoRecords);
    }

    if market_active {
        if let Some(computed_at) = ck.computed_at(value) {
            let age = now.signed_duration_since(computed_at);
            if age.num_seconds() > stale_threshold.as_secs() as i64 {
                return Some(HealthIssue::StaleData {
                    age_hours: age.num_hours(),
                });
            }
        }
    }

    None
}

/// One detected degradation; each is independently sufficient to trigger
/// remediation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthIssue {
    /// The key is absent from both tiers
    Empty,
    /// The cached value reports a record count of zero
    NoRecords,
    /// The embedded timestamp is older than the staleness threshold
    StaleData { age_hours: i64 },
    /// The synthetic upstream probe failed or returned nothing
    ProbeFailed(String),
}

impl fmt::Display for HealthIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthIssue::Empty => write!(f, "cache entry is empty"),
            HealthIssue::NoRecords => write!(f, "cached value reports zero records"),
            HealthIssue::StaleData { age_hours } => {
                write!(f, "cached value is {}h old", age_hours)
            }
            HealthIssue::ProbeFailed(reason) => write!(f, "upstream probe failed: {}", reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::refresh::ProducerFuture;
    use serde_json::json;

    fn noop_producer() -> Arc<ProducerFn> {
        Arc::new(|| Box::pin(async { Ok(json!({})) }) as ProducerFuture)
    }

    #[test]
    fn pointers_extract_embedded_fields() {
        let ck = CriticalKey::new("breadth", Duration::from_secs(60), noop_producer())
            .with_count_pointer("/universeSize", 100)
            .with_computed_at_pointer("/computedAt");

        let value = json!({ "universeSize": 842, "computedAt": 1754400000000_i64 });
        assert_eq!(ck.record_count(&value), Some(842));
        assert_eq!(
            ck.computed_at(&value).map(|ts| ts.timestamp_millis()),
            Some(1754400000000)
        );
    }

    #[test]
    fn missing_pointers_skip_checks() {
        let ck = CriticalKey::new("indices", Duration::from_secs(60), noop_producer());
        let value = json!({ "universeSize": 0 });
        assert_eq!(ck.record_count(&value), None);
        assert_eq!(ck.computed_at(&value), None);
    }

    #[test]
    fn zero_record_count_is_unhealthy() {
        let ck = CriticalKey::new("breadth", Duration::from_secs(60), noop_producer())
            .with_count_pointer("/universeSize", 100);
        let now = Utc::now();
        let issue = check_value(
            &ck,
            &json!({ "universeSize": 0 }),
            now,
            true,
            Duration::from_secs(6 * 3600),
        );
        assert_eq!(issue, Some(HealthIssue::NoRecords));
    }

    #[test]
    fn stale_timestamp_is_unhealthy_only_during_active_hours() {
        let ck = CriticalKey::new("breadth", Duration::from_secs(60), noop_producer())
            .with_count_pointer("/universeSize", 100)
            .with_computed_at_pointer("/computedAt");
        let threshold = Duration::from_secs(6 * 3600);
        let now = Utc::now();
        let old = now - chrono::Duration::hours(8);
        let value = json!({ "universeSize": 500, "computedAt": old.timestamp_millis() });

        assert_eq!(
            check_value(&ck, &value, now, true, threshold),
            Some(HealthIssue::StaleData { age_hours: 8 })
        );
        assert_eq!(check_value(&ck, &value, now, false, threshold), None);
    }

    #[test]
    fn fresh_timestamp_is_healthy() {
        let ck = CriticalKey::new("breadth", Duration::from_secs(60), noop_producer())
            .with_count_pointer("/universeSize", 100)
            .with_computed_at_pointer("/computedAt");
        let now = Utc::now();
        let recent = now - chrono::Duration::hours(1);
        let value = json!({ "universeSize": 500, "computedAt": recent.timestamp_millis() });
        assert_eq!(
            check_value(&ck, &value, now, true, Duration::from_secs(6 * 3600)),
            None
        );
    }
}
