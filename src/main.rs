use bucket_stream::source::{HistoryLog, Reading, SourceOptions, SyntheticLogs, SyntheticReadings};
use bucket_stream::{
    AggregatorConfig, BucketAggregator, BucketResult, Condition, ShardOptions, ShardedAggregator,
    format_count,
};
use clap::{Parser, ValueEnum};
use spdlog::{Level, LevelFilter, info};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SchemaKind {
    /// timestamp + value, averaged per bucket
    Simple,
    /// history log: temperature, active power, compressor Hz averages and alarm ratio
    Full,
}

#[derive(Parser, Debug)]
#[command(about = "Generates synthetic records and folds them into fixed-width time buckets")]
struct Args {
    /// Number of records in the measured run
    #[arg(long, default_value_t = 50_000_000)]
    records: u64,

    /// Bucket width in minutes
    #[arg(long, default_value_t = 10)]
    interval_minutes: u64,

    #[arg(long, value_enum, default_value_t = SchemaKind::Full)]
    schema: SchemaKind,

    /// Records processed in an unmeasured warm-up run
    #[arg(long, default_value_t = 0)]
    warmup: u64,

    /// Worker shards; 1 runs the single-threaded aggregator
    #[arg(long, default_value_t = 1)]
    shards: usize,

    #[arg(long)]
    seed: Option<u64>,

    /// Pin shard workers to CPU cores
    #[arg(long)]
    pin_cores: bool,

    /// Sample ingest latency (single-threaded mode only)
    #[arg(long)]
    latency_stats: bool,

    /// Log throughput every N records
    #[arg(long)]
    progress: Option<u64>,

    #[arg(short, long)]
    verbose: bool,
}

struct RunSummary {
    elapsed: Duration,
    records: u64,
    results: Vec<BucketResult>,
}

fn build_config(args: &Args, measured: bool) -> bucket_stream::Result<AggregatorConfig> {
    let builder = match args.schema {
        SchemaKind::Simple => AggregatorConfig::builder(Reading::schema()?).numeric("value"),
        SchemaKind::Full => AggregatorConfig::builder(HistoryLog::schema()?)
            .numeric("temperature")
            .numeric("active_power")
            .numeric("compressor_hz")
            .conditional("alarm_active", Condition::GreaterThan(0.0)),
    };
    let mut builder = builder.interval(Duration::from_secs(args.interval_minutes.saturating_mul(60)));
    if measured {
        if let Some(every) = args.progress {
            builder = builder.progress(every);
        }
        if args.latency_stats {
            builder = builder.latency_stats(1000);
        }
    }
    builder.build()
}

fn run(args: &Args, records: u64, measured: bool) -> bucket_stream::Result<RunSummary> {
    let config = build_config(args, measured)?;
    let options = SourceOptions {
        seed: args.seed,
        ..Default::default()
    };
    let start = Instant::now();

    let results = match (args.schema, args.shards) {
        (SchemaKind::Simple, 1) => {
            let mut aggregator = BucketAggregator::new(config)?;
            aggregator.ingest_all(SyntheticReadings::new(records, options))?;
            aggregator.finish()?;
            aggregator.into_results()?
        }
        (SchemaKind::Full, 1) => {
            // One reused buffer, refilled in place per record.
            let mut aggregator = BucketAggregator::new(config)?;
            let mut source = SyntheticLogs::new(records, options);
            let mut log = HistoryLog::default();
            while source.fill(&mut log) {
                aggregator.ingest(&log)?;
            }
            aggregator.finish()?;
            aggregator.into_results()?
        }
        (SchemaKind::Simple, shards) => {
            let mut aggregator = ShardedAggregator::new(config, shard_options(args, shards))?;
            aggregator.ingest_all(SyntheticReadings::new(records, options))?;
            aggregator.finish()?;
            aggregator.into_results()?
        }
        (SchemaKind::Full, shards) => {
            let mut aggregator = ShardedAggregator::new(config, shard_options(args, shards))?;
            aggregator.ingest_all(SyntheticLogs::new(records, options))?;
            aggregator.finish()?;
            aggregator.into_results()?
        }
    };

    Ok(RunSummary {
        elapsed: start.elapsed(),
        records,
        results,
    })
}

fn shard_options(args: &Args, shards: usize) -> ShardOptions {
    ShardOptions {
        shards,
        pin_cores: args.pin_cores,
        ..Default::default()
    }
}

fn print_bucket(result: &BucketResult) {
    let averages: Vec<String> = result
        .averages
        .iter()
        .map(|a| format!("{}={:.3}", a.name, a.average))
        .collect();
    let ratios: Vec<String> = result
        .ratios
        .iter()
        .map(|r| format!("{}_ratio={:.4}", r.name, r.ratio))
        .collect();
    info!(
        "  bucket {} (n={}): {} {}",
        result.bucket_key,
        result.total_count,
        averages.join(" "),
        ratios.join(" ")
    );
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let level = if args.verbose { Level::Debug } else { Level::Info };
    spdlog::default_logger().set_level_filter(LevelFilter::MoreSevereEqual(level));

    info!(
        "[System] Aggregating {} {:?} records into {}-minute buckets ({} shard(s))",
        format_count(args.records as f64),
        args.schema,
        args.interval_minutes,
        args.shards
    );

    if args.warmup > 0 {
        info!("Warming up with {} records...", format_count(args.warmup as f64));
        run(&args, args.warmup, false)?;
        info!("Warm-up complete. Starting measured run.");
    }

    let summary = run(&args, args.records, true)?;
    let secs = summary.elapsed.as_secs_f64();
    info!("Time: {:.3} s", secs);
    info!(
        "Throughput: {} rec/s",
        format_count(summary.records as f64 / secs)
    );
    info!("Buckets calculated: {}", summary.results.len());

    if args.verbose {
        for result in summary.results.iter().take(5) {
            print_bucket(result);
        }
    }
    Ok(())
}
