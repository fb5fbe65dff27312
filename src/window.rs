use crate::error::{AggregationError, Result};
use std::time::Duration;

/// Aligns a timestamp to the start of the fixed-width bucket containing it.
///
/// Uses floor division, so timestamps before the epoch still land in
/// `[key, key + width)` instead of rounding toward zero.
#[inline(always)]
pub fn bucket_key(timestamp: i64, width: i64) -> Result<i64> {
    if width <= 0 {
        return Err(AggregationError::config(format!(
            "interval width must be positive, got {}",
            width
        )));
    }
    align(timestamp, width)
}

#[inline(always)]
fn align(timestamp: i64, width: i64) -> Result<i64> {
    // Only timestamps within one width of i64::MIN can have a bucket start below it.
    timestamp
        .div_euclid(width)
        .checked_mul(width)
        .ok_or_else(|| AggregationError::DataIntegrity {
            field: "timestamp".into(),
            timestamp,
            reason: format!("bucket start for width {} is below i64::MIN", width),
        })
}

/// A validated, strictly positive bucket width in timestamp units (ms).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IntervalWidth(i64);

impl IntervalWidth {
    pub fn from_millis(millis: i64) -> Result<Self> {
        if millis <= 0 {
            return Err(AggregationError::config(format!(
                "interval width must be positive, got {}ms",
                millis
            )));
        }
        Ok(Self(millis))
    }

    pub fn from_duration(duration: Duration) -> Result<Self> {
        let millis = i64::try_from(duration.as_millis()).map_err(|_| {
            AggregationError::config(format!("interval {:?} does not fit in i64 ms", duration))
        })?;
        Self::from_millis(millis)
    }

    pub fn from_minutes(minutes: u64) -> Result<Self> {
        Self::from_duration(Duration::from_secs(minutes.saturating_mul(60)))
    }

    #[inline(always)]
    pub fn millis(&self) -> i64 {
        self.0
    }

    #[inline(always)]
    pub fn key_of(&self, timestamp: i64) -> Result<i64> {
        align(timestamp, self.0)
    }
}
