use assert_no_alloc::*;
use bucket_stream::source::HistoryLog;
use bucket_stream::{AggregatorConfig, BucketAggregator, Condition};

#[cfg(debug_assertions)]
#[global_allocator]
static ALLOC: AllocDisabler = AllocDisabler;

fn aggregator() -> BucketAggregator {
    let config = AggregatorConfig::builder(HistoryLog::schema().unwrap())
        .interval_millis(600_000)
        .numeric("temperature")
        .numeric("active_power")
        .conditional("alarm_active", Condition::default())
        .conditional("power_on", Condition::IsTrue)
        .build()
        .unwrap();
    BucketAggregator::new(config).unwrap()
}

#[test]
fn test_ingest_into_existing_bucket_no_alloc() {
    let mut agg = aggregator();
    agg.ingest(&HistoryLog::new(0)).unwrap();

    let log = HistoryLog::new(1_000)
        .with_temperature(21.5)
        .with_active_power(900.0)
        .with_alarm_active(2)
        .with_power_on(true);

    assert_no_alloc(|| {
        for _ in 0..1_000 {
            let _ = agg.ingest(&log);
        }
    });
    assert_eq!(agg.records_ingested(), 1_001);
}

#[test]
fn test_ingest_absent_record_no_alloc() {
    let mut agg = aggregator();
    agg.ingest(&HistoryLog::new(0)).unwrap();
    let empty = HistoryLog::new(10);

    assert_no_alloc(|| {
        let _ = agg.ingest(&empty);
    });
    assert_eq!(agg.store().get(0).map(|a| a.total_count), Some(2));
}
