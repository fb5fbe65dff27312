//! Synthetic record sources.
//!
//! Two record shapes are provided: [`Reading`], a bare timestamp/value pair,
//! and [`HistoryLog`], a heat-pump history entry whose fields are each
//! present with probability 0.9. Both are fixed-layout `Pod` types so a
//! single buffer can be zeroed and refilled per record.

use crate::error::Result;
use crate::record::{FieldValue, Observation, Schema};
use bytemuck::{Pod, Zeroable};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::time::{SystemTime, UNIX_EPOCH};

pub const MINUTE_MILLIS: i64 = 60 * 1000;
const WEEK_MILLIS: i64 = 7 * 24 * 60 * MINUTE_MILLIS;
const PRESENCE_PROBABILITY: f64 = 0.9;
const ALARM_PROBABILITY: f64 = 0.02;

/// Raw two-field reading
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct Reading {
    pub timestamp: i64,
    pub value: f64,
}

impl Reading {
    pub const FIELDS: [&'static str; 1] = ["value"];

    pub fn from(value: f64, timestamp: i64) -> Self {
        Self { timestamp, value }
    }

    pub fn schema() -> Result<Schema> {
        Schema::new(Self::FIELDS)
    }
}

impl Observation for Reading {
    #[inline(always)]
    fn timestamp(&self) -> i64 {
        self.timestamp
    }

    #[inline(always)]
    fn value(&self, slot: usize) -> Option<FieldValue> {
        (slot == 0).then_some(FieldValue::Number(self.value))
    }
}

/// History log entry; bit `i` of `present` marks slot `i` of [`HistoryLog::FIELDS`].
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct HistoryLog {
    pub timestamp: i64,
    pub temperature: f32,
    pub active_power: f32,
    pub compressor_hz: f32,
    pub humidity: f32,
    pub alarm_active: i16,
    pub power_on: u8,
    pub _pad0: u8,
    pub present: u32,
}

impl HistoryLog {
    pub const TEMPERATURE: usize = 0;
    pub const ACTIVE_POWER: usize = 1;
    pub const COMPRESSOR_HZ: usize = 2;
    pub const HUMIDITY: usize = 3;
    pub const ALARM_ACTIVE: usize = 4;
    pub const POWER_ON: usize = 5;

    pub const FIELDS: [&'static str; 6] = [
        "temperature",
        "active_power",
        "compressor_hz",
        "humidity",
        "alarm_active",
        "power_on",
    ];

    pub fn schema() -> Result<Schema> {
        Schema::new(Self::FIELDS)
    }

    pub fn new(timestamp: i64) -> Self {
        Self {
            timestamp,
            ..Self::zeroed()
        }
    }

    #[inline(always)]
    pub fn is_present(&self, slot: usize) -> bool {
        slot < Self::FIELDS.len() && self.present & (1 << slot) != 0
    }

    #[inline(always)]
    fn mark(&mut self, slot: usize) {
        self.present |= 1 << slot;
    }

    pub fn with_temperature(mut self, v: f32) -> Self {
        self.temperature = v;
        self.mark(Self::TEMPERATURE);
        self
    }

    pub fn with_active_power(mut self, v: f32) -> Self {
        self.active_power = v;
        self.mark(Self::ACTIVE_POWER);
        self
    }

    pub fn with_compressor_hz(mut self, v: f32) -> Self {
        self.compressor_hz = v;
        self.mark(Self::COMPRESSOR_HZ);
        self
    }

    pub fn with_humidity(mut self, v: f32) -> Self {
        self.humidity = v;
        self.mark(Self::HUMIDITY);
        self
    }

    pub fn with_alarm_active(mut self, v: i16) -> Self {
        self.alarm_active = v;
        self.mark(Self::ALARM_ACTIVE);
        self
    }

    pub fn with_power_on(mut self, on: bool) -> Self {
        self.power_on = on as u8;
        self.mark(Self::POWER_ON);
        self
    }
}

impl Observation for HistoryLog {
    #[inline(always)]
    fn timestamp(&self) -> i64 {
        self.timestamp
    }

    #[inline(always)]
    fn value(&self, slot: usize) -> Option<FieldValue> {
        if !self.is_present(slot) {
            return None;
        }
        Some(match slot {
            Self::TEMPERATURE => FieldValue::from(self.temperature),
            Self::ACTIVE_POWER => FieldValue::from(self.active_power),
            Self::COMPRESSOR_HZ => FieldValue::from(self.compressor_hz),
            Self::HUMIDITY => FieldValue::from(self.humidity),
            Self::ALARM_ACTIVE => FieldValue::Number(self.alarm_active as f64),
            _ => FieldValue::Flag(self.power_on != 0),
        })
    }
}

/// Where synthetic timestamps start and how far apart they are.
#[derive(Debug, Clone, Copy)]
pub struct SourceOptions {
    pub start_millis: i64,
    pub step_millis: i64,
    pub seed: Option<u64>,
}

impl Default for SourceOptions {
    /// One record per minute starting a week ago.
    fn default() -> Self {
        Self {
            start_millis: now_millis() - WEEK_MILLIS,
            step_millis: MINUTE_MILLIS,
            seed: None,
        }
    }
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

fn new_rng(seed: Option<u64>) -> SmallRng {
    match seed {
        Some(s) => SmallRng::seed_from_u64(s),
        None => SmallRng::from_os_rng(),
    }
}

/// Lazy stream of [`HistoryLog`] records.
pub struct SyntheticLogs {
    rng: SmallRng,
    options: SourceOptions,
    index: u64,
    count: u64,
}

impl SyntheticLogs {
    pub fn new(count: u64, options: SourceOptions) -> Self {
        Self {
            rng: new_rng(options.seed),
            options,
            index: 0,
            count,
        }
    }

    /// Refills `log` in place with the next record; false once exhausted.
    #[inline(always)]
    pub fn fill(&mut self, log: &mut HistoryLog) -> bool {
        if self.index >= self.count {
            return false;
        }
        *log = HistoryLog::new(
            self.options.start_millis + self.index as i64 * self.options.step_millis,
        );
        self.index += 1;

        let rng = &mut self.rng;
        if rng.random_bool(PRESENCE_PROBABILITY) {
            log.temperature = rng.random::<f32>() * 40.0;
            log.mark(HistoryLog::TEMPERATURE);
        }
        if rng.random_bool(PRESENCE_PROBABILITY) {
            log.active_power = rng.random::<f32>() * 3500.0;
            log.mark(HistoryLog::ACTIVE_POWER);
        }
        if rng.random_bool(PRESENCE_PROBABILITY) {
            log.compressor_hz = rng.random::<f32>() * 90.0;
            log.mark(HistoryLog::COMPRESSOR_HZ);
        }
        if rng.random_bool(PRESENCE_PROBABILITY) {
            log.humidity = rng.random_range(0..100) as f32;
            log.mark(HistoryLog::HUMIDITY);
        }
        if rng.random_bool(PRESENCE_PROBABILITY) {
            log.alarm_active = if rng.random_bool(ALARM_PROBABILITY) {
                rng.random_range(0..10)
            } else {
                0
            };
            log.mark(HistoryLog::ALARM_ACTIVE);
        }
        if rng.random_bool(PRESENCE_PROBABILITY) {
            log.power_on = rng.random::<bool>() as u8;
            log.mark(HistoryLog::POWER_ON);
        }
        true
    }
}

impl Iterator for SyntheticLogs {
    type Item = HistoryLog;

    fn next(&mut self) -> Option<HistoryLog> {
        let mut log = HistoryLog::zeroed();
        self.fill(&mut log).then_some(log)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = (self.count - self.index) as usize;
        (left, Some(left))
    }
}

/// Lazy stream of [`Reading`] records with values in `[0, 100)`.
pub struct SyntheticReadings {
    rng: SmallRng,
    options: SourceOptions,
    index: u64,
    count: u64,
}

impl SyntheticReadings {
    pub fn new(count: u64, options: SourceOptions) -> Self {
        Self {
            rng: new_rng(options.seed),
            options,
            index: 0,
            count,
        }
    }
}

impl Iterator for SyntheticReadings {
    type Item = Reading;

    fn next(&mut self) -> Option<Reading> {
        if self.index >= self.count {
            return None;
        }
        let timestamp = self.options.start_millis + self.index as i64 * self.options.step_millis;
        self.index += 1;
        Some(Reading::from(self.rng.random::<f64>() * 100.0, timestamp))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = (self.count - self.index) as usize;
        (left, Some(left))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(seed: u64) -> SourceOptions {
        SourceOptions {
            start_millis: 0,
            step_millis: MINUTE_MILLIS,
            seed: Some(seed),
        }
    }

    #[test]
    fn test_history_log_presence_bits() {
        let log = HistoryLog::new(7)
            .with_temperature(21.0)
            .with_alarm_active(0)
            .with_power_on(true);

        assert_eq!(log.value(HistoryLog::TEMPERATURE), Some(FieldValue::Number(21.0)));
        assert_eq!(log.value(HistoryLog::ACTIVE_POWER), None);
        assert_eq!(log.value(HistoryLog::ALARM_ACTIVE), Some(FieldValue::Number(0.0)));
        assert_eq!(log.value(HistoryLog::POWER_ON), Some(FieldValue::Flag(true)));
        assert_eq!(log.value(42), None);
    }

    #[test]
    fn test_synthetic_logs_are_deterministic_per_seed() {
        let a: Vec<HistoryLog> = SyntheticLogs::new(50, options(7)).collect();
        let b: Vec<HistoryLog> = SyntheticLogs::new(50, options(7)).collect();
        assert_eq!(a, b);
        assert_eq!(a.len(), 50);
        assert_eq!(a[3].timestamp, 3 * MINUTE_MILLIS);
    }

    #[test]
    fn test_synthetic_logs_value_ranges() {
        let mut present = 0;
        for log in SyntheticLogs::new(2_000, options(11)) {
            if log.is_present(HistoryLog::TEMPERATURE) {
                present += 1;
                assert!((0.0..40.0).contains(&log.temperature));
            }
            assert!((0..10).contains(&log.alarm_active));
        }
        // ~90% presence
        assert!(present > 1_600 && present < 1_990);
    }

    #[test]
    fn test_fill_reuses_buffer_and_clears_stale_fields() {
        let mut source = SyntheticLogs::new(3, options(1));
        let mut log = HistoryLog::zeroed();
        log.present = u32::MAX;
        let mut seen = 0;
        while source.fill(&mut log) {
            assert_eq!(log.present & !0b11_1111, 0);
            seen += 1;
        }
        assert_eq!(seen, 3);
        assert!(!source.fill(&mut log));
    }

    #[test]
    fn test_synthetic_readings() {
        let readings: Vec<Reading> = SyntheticReadings::new(10, options(3)).collect();
        assert_eq!(readings.len(), 10);
        assert!(readings.iter().all(|r| (0.0..100.0).contains(&r.value)));
        assert_eq!(readings[9].timestamp, 9 * MINUTE_MILLIS);
        assert_eq!(readings[0].value(0), Some(FieldValue::Number(readings[0].value)));
        assert_eq!(readings[0].value(1), None);
    }
}
