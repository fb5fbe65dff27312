use crate::error::{AggregationError, Result};
use crate::fields::{Condition, TrackedFields};
use crate::record::Schema;
use crate::window::IntervalWidth;
use std::time::Duration;

/// Fixed configuration of one aggregator run.
///
/// Only the interval and the tracked fields affect results; the remaining
/// options are operational.
#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    pub(crate) interval: IntervalWidth,
    pub(crate) schema: Schema,
    pub(crate) fields: TrackedFields,
    pub(crate) progress_interval: Option<u64>,
    pub(crate) latency_sample_rate: Option<u64>,
    pub(crate) initial_buckets: usize,
}

impl AggregatorConfig {
    pub fn builder(schema: Schema) -> AggregatorConfigBuilder {
        AggregatorConfigBuilder {
            schema,
            interval_millis: None,
            numeric: Vec::new(),
            conditional: Vec::new(),
            progress_interval: None,
            latency_sample_rate: None,
            initial_buckets: 0,
        }
    }

    pub fn interval(&self) -> IntervalWidth {
        self.interval
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn fields(&self) -> &TrackedFields {
        &self.fields
    }
}

pub struct AggregatorConfigBuilder {
    schema: Schema,
    interval_millis: Option<i64>,
    numeric: Vec<String>,
    conditional: Vec<(String, Condition)>,
    progress_interval: Option<u64>,
    latency_sample_rate: Option<u64>,
    initial_buckets: usize,
}

impl AggregatorConfigBuilder {
    pub fn interval_millis(mut self, millis: i64) -> Self {
        self.interval_millis = Some(millis);
        self
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        // Out-of-range durations are reported by `build`.
        self.interval_millis = Some(i64::try_from(interval.as_millis()).unwrap_or(i64::MIN));
        self
    }

    pub fn numeric(mut self, name: impl Into<String>) -> Self {
        self.numeric.push(name.into());
        self
    }

    pub fn conditional(mut self, name: impl Into<String>, condition: Condition) -> Self {
        self.conditional.push((name.into(), condition));
        self
    }

    /// Logs throughput every `records` ingested records.
    pub fn progress(mut self, records: u64) -> Self {
        self.progress_interval = Some(records);
        self
    }

    /// Times one in every `sample_rate` ingests.
    pub fn latency_stats(mut self, sample_rate: u64) -> Self {
        self.latency_sample_rate = Some(sample_rate);
        self
    }

    /// Pre-sizes the bucket store.
    pub fn initial_buckets(mut self, buckets: usize) -> Self {
        self.initial_buckets = buckets;
        self
    }

    pub fn build(self) -> Result<AggregatorConfig> {
        let millis = self
            .interval_millis
            .ok_or_else(|| AggregationError::config("interval width is required"))?;
        let interval = IntervalWidth::from_millis(millis)?;
        let fields = TrackedFields::resolve(
            &self.schema,
            &self.numeric,
            self.conditional.iter().map(|(n, c)| (n, *c)),
        )?;
        if self.progress_interval == Some(0) {
            return Err(AggregationError::config("progress interval must be greater than 0"));
        }
        if self.latency_sample_rate == Some(0) {
            return Err(AggregationError::config("latency sample rate must be positive"));
        }

        Ok(AggregatorConfig {
            interval,
            schema: self.schema,
            fields,
            progress_interval: self.progress_interval,
            latency_sample_rate: self.latency_sample_rate,
            initial_buckets: self.initial_buckets,
        })
    }
}
