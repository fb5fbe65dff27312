use crate::config::AggregatorConfig;
use crate::error::{AggregationError, Result};
use crate::fields::TrackedFields;
use crate::measure::LatencyMeasurer;
use crate::progress::Progress;
use crate::record::Observation;
use crate::result::BucketResult;
use crate::store::BucketStore;
use spdlog::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregatorState {
    Idle,
    Running,
    Finalized,
}

/// Single-pass, single-writer bucket aggregator.
///
/// Records are folded into their bucket as they arrive; nothing but the
/// per-bucket aggregates is retained, so memory is bounded by the number of
/// buckets regardless of how many records pass through.
pub struct BucketAggregator {
    config: AggregatorConfig,
    store: BucketStore,
    state: AggregatorState,
    ingested: u64,
    results: Option<Vec<BucketResult>>,
    progress: Option<Progress>,
    latency: Option<LatencyMeasurer>,
}

impl BucketAggregator {
    pub fn new(config: AggregatorConfig) -> Result<Self> {
        let progress = config
            .progress_interval
            .map(|interval| Progress::new("bucket-aggregator", interval))
            .transpose()?;
        let latency = config
            .latency_sample_rate
            .map(LatencyMeasurer::new)
            .transpose()?;

        debug!(
            "Aggregator configured: interval={}ms, numeric={}, conditional={}",
            config.interval.millis(),
            config.fields.numeric().len(),
            config.fields.conditional().len()
        );

        Ok(Self {
            store: BucketStore::with_capacity(config.initial_buckets),
            config,
            state: AggregatorState::Idle,
            ingested: 0,
            results: None,
            progress,
            latency,
        })
    }

    /// Folds one record into its bucket.
    ///
    /// A record that fails the type check is rejected whole: no counter moves
    /// and no bucket is created for it.
    #[inline(always)]
    pub fn ingest<R: Observation + ?Sized>(&mut self, record: &R) -> Result<()> {
        if self.state == AggregatorState::Finalized {
            return Err(AggregationError::usage("cannot ingest after finish"));
        }

        let _latency_guard = self.latency.as_mut().map(|m| m.measure_with_guard());

        let key = self.config.interval.key_of(record.timestamp())?;
        let fields = &self.config.fields;
        fields.check(record)?;
        self.store.get_or_insert(key, fields).apply(fields, record);

        self.state = AggregatorState::Running;
        self.ingested += 1;
        if let Some(progress) = self.progress.as_mut() {
            progress.tick();
        }
        Ok(())
    }

    /// Drains a record source one record at a time.
    ///
    /// Accepts materialized collections and lazy iterators alike. Stops at
    /// the first failing record and returns its error.
    pub fn ingest_all<I>(&mut self, records: I) -> Result<u64>
    where
        I: IntoIterator,
        I::Item: Observation,
    {
        let mut count = 0;
        for record in records {
            self.ingest(&record)?;
            count += 1;
        }
        Ok(count)
    }

    /// Ends ingestion and projects every bucket.
    ///
    /// Can be called once; the results stay available through [`results`].
    ///
    /// [`results`]: BucketAggregator::results
    pub fn finish(&mut self) -> Result<&[BucketResult]> {
        if self.state == AggregatorState::Finalized {
            return Err(AggregationError::usage("aggregator already finished"));
        }
        self.state = AggregatorState::Finalized;

        let results = self.store.finalize(&self.config.fields);
        info!(
            "Aggregation finished: {} records into {} buckets",
            self.ingested,
            results.len()
        );
        if let Some(latency) = &self.latency {
            info!("[Latency/Ingest]{}", latency.format_stats());
        }

        Ok(self.results.insert(results).as_slice())
    }

    pub fn results(&self) -> Option<&[BucketResult]> {
        self.results.as_deref()
    }

    /// Finished results by value, for callers done with the aggregator.
    pub fn into_results(self) -> Result<Vec<BucketResult>> {
        self.results
            .ok_or_else(|| AggregationError::usage("aggregator has not finished"))
    }

    pub fn state(&self) -> AggregatorState {
        self.state
    }

    pub fn bucket_count(&self) -> usize {
        self.store.len()
    }

    pub fn records_ingested(&self) -> u64 {
        self.ingested
    }

    pub fn store(&self) -> &BucketStore {
        &self.store
    }

    pub fn fields(&self) -> &TrackedFields {
        &self.config.fields
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    pub fn latency(&self) -> Option<&LatencyMeasurer> {
        self.latency.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::Condition;
    use crate::record::{Record, Schema};

    fn aggregator() -> BucketAggregator {
        let schema = Schema::new(["temperature", "alarm_active"]).unwrap();
        let config = AggregatorConfig::builder(schema)
            .interval_millis(600_000)
            .numeric("temperature")
            .conditional("alarm_active", Condition::default())
            .build()
            .unwrap();
        BucketAggregator::new(config).unwrap()
    }

    #[test]
    fn test_state_transitions() {
        let mut agg = aggregator();
        assert_eq!(agg.state(), AggregatorState::Idle);

        agg.ingest(&Record::new(0).with(0, 1.0)).unwrap();
        assert_eq!(agg.state(), AggregatorState::Running);
        assert!(agg.results().is_none());

        agg.finish().unwrap();
        assert_eq!(agg.state(), AggregatorState::Finalized);
        assert_eq!(agg.results().map(|r| r.len()), Some(1));
    }

    #[test]
    fn test_finish_without_records_is_empty() {
        let mut agg = aggregator();
        assert!(agg.finish().unwrap().is_empty());
        assert_eq!(agg.bucket_count(), 0);
    }

    #[test]
    fn test_usage_errors_after_finish() {
        let mut agg = aggregator();
        agg.ingest(&Record::new(0)).unwrap();
        agg.finish().unwrap();

        assert!(matches!(
            agg.ingest(&Record::new(1)),
            Err(AggregationError::Usage(_))
        ));
        assert!(matches!(agg.finish(), Err(AggregationError::Usage(_))));
        assert_eq!(agg.records_ingested(), 1);
        assert_eq!(agg.results().map(|r| r[0].total_count), Some(1));
    }

    #[test]
    fn test_rejected_record_leaves_no_trace() {
        let mut agg = aggregator();
        agg.ingest(&Record::new(0).with(0, 5.0)).unwrap();

        let bad = Record::new(900_000).with(0, 1.0).with(1, true);
        assert!(matches!(
            agg.ingest(&bad),
            Err(AggregationError::DataIntegrity { .. })
        ));
        assert_eq!(agg.bucket_count(), 1);
        assert_eq!(agg.records_ingested(), 1);
        assert_eq!(agg.store().get(0).map(|a| a.total_count), Some(1));
    }

    #[test]
    fn test_into_results_requires_finish() {
        let agg = aggregator();
        assert!(agg.into_results().is_err());

        let mut agg = aggregator();
        agg.ingest(&Record::new(10).with(0, 2.0)).unwrap();
        agg.finish().unwrap();
        let results = agg.into_results().unwrap();
        assert_eq!(results[0].average("temperature"), Some(2.0));
    }
}
