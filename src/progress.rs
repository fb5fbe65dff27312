use crate::error::{AggregationError, Result};
use spdlog::info;
use std::time::Instant;

/// Logs ingestion throughput every `interval` records.
#[derive(Debug)]
pub struct Progress {
    name: String,
    interval: u64,
    count: u64,
    last_instant: Instant,
    start_instant: Instant,
}

impl Progress {
    pub fn new(name: impl Into<String>, interval: u64) -> Result<Self> {
        if interval == 0 {
            return Err(AggregationError::config("progress interval must be greater than 0"));
        }
        let now = Instant::now();
        Ok(Self {
            name: name.into(),
            interval,
            count: 0,
            last_instant: now,
            start_instant: now,
        })
    }

    /// Counts one record; returns true when a progress line was logged.
    #[inline(always)]
    pub fn tick(&mut self) -> bool {
        self.count += 1;
        if !self.count.is_multiple_of(self.interval) {
            return false;
        }

        let now = Instant::now();
        let elapsed = now.duration_since(self.last_instant);
        let total_elapsed = now.duration_since(self.start_instant);

        let rps = self.interval as f64 / elapsed.as_secs_f64();
        let total_rps = self.count as f64 / total_elapsed.as_secs_f64();

        info!(
            "[{}] Ingested {} records, Rate: {} rec/s, Avg: {} rec/s",
            self.name,
            format_count(self.count as f64),
            format_count(rps),
            format_count(total_rps)
        );
        self.last_instant = now;
        true
    }

    pub fn count(&self) -> u64 {
        self.count
    }
}

pub fn format_count(val: f64) -> String {
    if !val.is_finite() {
        return "-".into();
    }
    if val < 1000.0 {
        if val == val.floor() {
            format!("{:.0}", val)
        } else {
            format!("{:.2}", val)
        }
    } else if val < 1_000_000.0 {
        format!("{:.2}k", val / 1000.0)
    } else if val < 1_000_000_000.0 {
        format!("{:.2}m", val / 1_000_000.0)
    } else if val < 1_000_000_000_000.0 {
        format!("{:.2}b", val / 1_000_000_000.0)
    } else {
        format!("{:.2}t", val / 1_000_000_000_000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_progress_logs_on_interval() {
        let mut progress = Progress::new("test", 2).unwrap();

        assert!(!progress.tick());
        thread::sleep(Duration::from_millis(10));
        assert!(progress.tick());
        assert!(!progress.tick());
        thread::sleep(Duration::from_millis(10));
        assert!(progress.tick());
        assert_eq!(progress.count(), 4);
    }

    #[test]
    fn test_zero_interval_rejected() {
        assert!(Progress::new("test", 0).is_err());
    }

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(12.0), "12");
        assert_eq!(format_count(1.5), "1.50");
        assert_eq!(format_count(2_500.0), "2.50k");
        assert_eq!(format_count(3_000_000.0), "3.00m");
        assert_eq!(format_count(f64::INFINITY), "-");
    }
}
