//! Schedule polling and execution dedupe
//!
//! The time path runs on a free-running ~60 second tick (not aligned to
//! wall-clock minute boundaries). Each tick probes the schedule keys that
//! could match the current time and pushes every candidate through the
//! execution guard, which enforces at-most-once dispatch per device per
//! minute bucket regardless of tick jitter or overlap.

use crate::error::EngineError;
use crate::keys::{execution_key, minute_bucket, schedule_key};
use bytes::Bytes;
use chrono::{DateTime, Datelike, Local, TimeZone, Timelike};
use homestead_cache::CacheStore;
use std::sync::Arc;
use std::time::Duration;

/// Schedule-relevant components of one poll instant
#[derive(Debug, Clone, Copy)]
pub struct TickTime {
    pub minute: u32,
    pub hour: u32,
    /// 0 = Sunday .. 6 = Saturday
    pub day_of_week: u32,
    pub day_of_month: u32,
    pub epoch_ms: i64,
}

impl TickTime {
    /// Components of the current local time
    #[must_use]
    pub fn now() -> Self {
        Self::from_datetime(&Local::now())
    }

    #[must_use]
    pub fn from_datetime<Tz: TimeZone>(dt: &DateTime<Tz>) -> Self {
        Self {
            minute: dt.minute(),
            hour: dt.hour(),
            day_of_week: dt.weekday().num_days_from_sunday(),
            day_of_month: dt.day(),
            epoch_ms: dt.timestamp_millis(),
        }
    }

    /// The six candidate keys for this instant, most specific first
    ///
    /// A stored rule occupies exactly the one key its expression expanded
    /// to, so probing all six finds each due rule at most once: the fully
    /// specified key, the three day-wildcard variants, the minute-and-hour
    /// wildcard, and the fully wildcarded key.
    #[must_use]
    pub fn probe_keys(&self) -> [String; 6] {
        let (m, h, dow, dom) = (
            Some(self.minute),
            Some(self.hour),
            Some(self.day_of_week),
            Some(self.day_of_month),
        );
        [
            schedule_key(m, h, dow, dom),
            schedule_key(m, h, None, dom),
            schedule_key(m, h, dow, None),
            schedule_key(m, h, None, None),
            schedule_key(None, None, dow, dom),
            schedule_key(None, None, None, None),
        ]
    }
}

/// Per-minute execution dedupe marker
///
/// `try_acquire` is the one place the engine needs an atomic primitive:
/// concurrent ticks racing on the same device and minute bucket must see
/// exactly one winner.
pub struct ExecutionGuard {
    cache: Arc<dyn CacheStore>,
    window: Duration,
}

impl ExecutionGuard {
    pub fn new(cache: Arc<dyn CacheStore>, window: Duration) -> Self {
        Self { cache, window }
    }

    /// Claim the dispatch slot for a device in the bucket of `epoch_ms`
    ///
    /// Returns true when this caller created the marker and may dispatch.
    pub async fn try_acquire(&self, device: &str, epoch_ms: i64) -> Result<bool, EngineError> {
        let key = execution_key(device, minute_bucket(epoch_ms));
        Ok(self
            .cache
            .set_if_absent(&key, Bytes::from_static(b"1"), self.window)
            .await?)
    }
}
