use crate::aggregate::RunningAggregate;
use crate::fields::TrackedFields;
use crate::result::BucketResult;
use fxhash::FxHashMap;

/// Bucket key -> running aggregate, owned by a single writer.
///
/// Its size grows with the covered time span, never with the record count.
#[derive(Debug, Clone, Default)]
pub struct BucketStore {
    buckets: FxHashMap<i64, RunningAggregate>,
}

impl BucketStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buckets: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
        }
    }

    /// Returns the aggregate for `key`, creating a zeroed one on first use.
    #[inline(always)]
    pub fn get_or_insert(&mut self, key: i64, fields: &TrackedFields) -> &mut RunningAggregate {
        self.buckets
            .entry(key)
            .or_insert_with(|| RunningAggregate::new(fields))
    }

    pub fn get(&self, key: i64) -> Option<&RunningAggregate> {
        self.buckets.get(&key)
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (i64, &RunningAggregate)> {
        self.buckets.iter().map(|(k, v)| (*k, v))
    }

    /// Folds another store into this one, combining aggregates of shared keys.
    pub fn merge(&mut self, other: BucketStore) {
        for (key, aggregate) in other.buckets {
            match self.buckets.get_mut(&key) {
                Some(existing) => existing.merge(&aggregate),
                None => {
                    self.buckets.insert(key, aggregate);
                }
            }
        }
    }

    /// Projects every bucket into a result, ordered by bucket key.
    ///
    /// Pure with respect to the store: repeated calls give identical output.
    pub fn finalize(&self, fields: &TrackedFields) -> Vec<BucketResult> {
        let mut results: Vec<BucketResult> = self
            .buckets
            .iter()
            .map(|(key, aggregate)| BucketResult::project(*key, aggregate, fields))
            .collect();
        results.sort_unstable_by_key(|r| r.bucket_key);
        results
    }
}
