use crate::aggregator::AggregatorState;
use crate::config::AggregatorConfig;
use crate::error::{AggregationError, Result};
use crate::fields::TrackedFields;
use crate::progress::Progress;
use crate::record::Observation;
use crate::result::BucketResult;
use crate::store::BucketStore;
use spdlog::{debug, info};
use std::mem;
use std::sync::Arc;
use std::sync::mpsc::{Receiver, SyncSender, sync_channel};
use std::thread;

#[derive(Debug, Clone, Copy)]
pub struct ShardOptions {
    pub shards: usize,
    /// Records handed to a shard per channel message.
    pub batch_size: usize,
    /// Batches that may queue per shard before the producer blocks.
    pub channel_depth: usize,
    pub pin_cores: bool,
}

impl Default for ShardOptions {
    fn default() -> Self {
        Self {
            shards: 4,
            batch_size: 1024,
            channel_depth: 16,
            pin_cores: false,
        }
    }
}

type Batch<R> = Vec<(i64, R)>;

/// Multi-threaded aggregator with one writer per shard.
///
/// The producer validates each record, computes its bucket key and routes it
/// to the shard owning that key. Every bucket therefore has exactly one
/// writer, and shard stores are disjoint when merged at [`finish`].
///
/// [`finish`]: ShardedAggregator::finish
pub struct ShardedAggregator<R: Observation + Send + 'static> {
    config: AggregatorConfig,
    fields: Arc<TrackedFields>,
    options: ShardOptions,
    senders: Vec<SyncSender<Batch<R>>>,
    pending: Vec<Batch<R>>,
    workers: Vec<thread::JoinHandle<BucketStore>>,
    state: AggregatorState,
    ingested: u64,
    bucket_count: usize,
    results: Option<Vec<BucketResult>>,
    progress: Option<Progress>,
}

impl<R: Observation + Send + 'static> ShardedAggregator<R> {
    pub fn new(config: AggregatorConfig, options: ShardOptions) -> Result<Self> {
        if options.shards == 0 {
            return Err(AggregationError::config("shard count must be positive"));
        }
        if options.batch_size == 0 {
            return Err(AggregationError::config("batch size must be positive"));
        }
        let progress = config
            .progress_interval
            .map(|interval| Progress::new("sharded-aggregator", interval))
            .transpose()?;

        let fields = Arc::new(config.fields.clone());
        let core_ids = if options.pin_cores {
            core_affinity::get_core_ids().unwrap_or_default()
        } else {
            Vec::new()
        };

        let mut senders = Vec::with_capacity(options.shards);
        let mut workers = Vec::with_capacity(options.shards);
        for shard_id in 0..options.shards {
            let (tx, rx) = sync_channel::<Batch<R>>(options.channel_depth);
            let fields = fields.clone();
            let core_id = (!core_ids.is_empty()).then(|| core_ids[shard_id % core_ids.len()]);
            let capacity = config.initial_buckets / options.shards;

            let handle = thread::Builder::new()
                .name(format!("bucket-shard-{}", shard_id))
                .spawn(move || {
                    if let Some(core_id) = core_id {
                        core_affinity::set_for_current(core_id);
                    }
                    run_shard(shard_id, rx, &fields, capacity)
                })
                .map_err(|e| AggregationError::Worker(format!("spawn shard {}: {}", shard_id, e)))?;

            senders.push(tx);
            workers.push(handle);
        }

        Ok(Self {
            pending: (0..options.shards)
                .map(|_| Vec::with_capacity(options.batch_size))
                .collect(),
            config,
            fields,
            options,
            senders,
            workers,
            state: AggregatorState::Idle,
            ingested: 0,
            bucket_count: 0,
            results: None,
            progress,
        })
    }

    /// Validates `record` and queues it for the shard owning its bucket.
    pub fn ingest(&mut self, record: R) -> Result<()> {
        if self.state == AggregatorState::Finalized {
            return Err(AggregationError::usage("cannot ingest after finish"));
        }

        let key = self.config.interval.key_of(record.timestamp())?;
        self.fields.check(&record)?;

        let shard = (fxhash::hash64(&key) % self.options.shards as u64) as usize;
        self.pending[shard].push((key, record));
        if self.pending[shard].len() >= self.options.batch_size {
            self.flush(shard)?;
        }

        self.state = AggregatorState::Running;
        self.ingested += 1;
        if let Some(progress) = self.progress.as_mut() {
            progress.tick();
        }
        Ok(())
    }

    pub fn ingest_all<I>(&mut self, records: I) -> Result<u64>
    where
        I: IntoIterator<Item = R>,
    {
        let mut count = 0;
        for record in records {
            self.ingest(record)?;
            count += 1;
        }
        Ok(count)
    }

    fn flush(&mut self, shard: usize) -> Result<()> {
        let batch = mem::replace(
            &mut self.pending[shard],
            Vec::with_capacity(self.options.batch_size),
        );
        self.senders[shard]
            .send(batch)
            .map_err(|_| AggregationError::Worker(format!("shard {} disconnected", shard)))
    }

    /// Drains every shard, joins the workers and merges their stores.
    pub fn finish(&mut self) -> Result<&[BucketResult]> {
        if self.state == AggregatorState::Finalized {
            return Err(AggregationError::usage("aggregator already finished"));
        }
        self.state = AggregatorState::Finalized;

        for shard in 0..self.senders.len() {
            if !self.pending[shard].is_empty() {
                self.flush(shard)?;
            }
        }
        // Closing the channels ends each worker's receive loop.
        self.senders.clear();

        let mut merged = BucketStore::with_capacity(self.config.initial_buckets);
        for (shard_id, handle) in self.workers.drain(..).enumerate() {
            let store = handle
                .join()
                .map_err(|_| AggregationError::Worker(format!("shard {} panicked", shard_id)))?;
            merged.merge(store);
        }

        let results = merged.finalize(&self.fields);
        self.bucket_count = merged.len();
        info!(
            "Sharded aggregation finished: {} records into {} buckets over {} shards",
            self.ingested,
            results.len(),
            self.options.shards
        );
        Ok(self.results.insert(results).as_slice())
    }

    pub fn results(&self) -> Option<&[BucketResult]> {
        self.results.as_deref()
    }

    pub fn into_results(self) -> Result<Vec<BucketResult>> {
        self.results
            .ok_or_else(|| AggregationError::usage("aggregator has not finished"))
    }

    pub fn state(&self) -> AggregatorState {
        self.state
    }

    /// Distinct buckets, known once the aggregator has finished.
    pub fn bucket_count(&self) -> usize {
        self.bucket_count
    }

    pub fn records_ingested(&self) -> u64 {
        self.ingested
    }
}

fn run_shard<R: Observation>(
    shard_id: usize,
    rx: Receiver<Batch<R>>,
    fields: &TrackedFields,
    capacity: usize,
) -> BucketStore {
    let mut store = BucketStore::with_capacity(capacity);
    let mut applied = 0u64;
    while let Ok(batch) = rx.recv() {
        for (key, record) in &batch {
            store.get_or_insert(*key, fields).apply(fields, record);
        }
        applied += batch.len() as u64;
    }
    debug!(
        "[Shard:{}] applied {} records into {} buckets",
        shard_id,
        applied,
        store.len()
    );
    store
}
