//! Calendar-encoded time buckets.
//!
//! A bucket packs UTC calendar fields into a fixed-width decimal layout
//! (`YYYYMMDDHHmmss` at second precision). Integer comparison therefore
//! orders buckets chronologically, and truncating the layout downsamples a
//! bucket to a coarser precision: the minute bucket of an instant divided by
//! 10_000 is its day bucket.

use chrono::{DateTime, Datelike, TimeZone, Timelike, Utc};
use serde::Deserialize;

/// Precision at which a timestamp is bucketed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownSampling {
    Second,
    #[default]
    Minute,
    Hour,
    Day,
}

/// Bucket a millisecond timestamp at the given precision.
///
/// Total over any non-negative timestamp; negative inputs clamp to the epoch.
pub fn time_bucket(millis: i64, down_sampling: DownSampling) -> i64 {
    let dt = Utc
        .timestamp_millis_opt(millis.max(0))
        .single()
        .unwrap_or(DateTime::UNIX_EPOCH);

    let second = dt.year() as i64 * 10_000_000_000
        + dt.month() as i64 * 100_000_000
        + dt.day() as i64 * 1_000_000
        + dt.hour() as i64 * 10_000
        + dt.minute() as i64 * 100
        + dt.second() as i64;

    match down_sampling {
        DownSampling::Second => second,
        DownSampling::Minute => second / 100,
        DownSampling::Hour => second / 10_000,
        DownSampling::Day => second / 1_000_000,
    }
}

/// Downsample a second bucket to minute precision.
pub fn second_to_minute(bucket: i64) -> i64 {
    bucket / 100
}

/// Downsample a minute bucket to hour precision.
pub fn minute_to_hour(bucket: i64) -> i64 {
    bucket / 100
}

/// Downsample a minute bucket to day precision.
pub fn minute_to_day(bucket: i64) -> i64 {
    bucket / 10_000
}

/// Downsample an hour bucket to day precision.
pub fn hour_to_day(bucket: i64) -> i64 {
    bucket / 100
}

/// Wall-clock source.
///
/// Production code reads the system clock; tests pin time with
/// [`FixedClock`] so bucket values are reproducible.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

/// System UTC clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// Clock pinned to a fixed instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub i64);

impl Clock for FixedClock {
    fn now_millis(&self) -> i64 {
        self.0
    }
}
