mod aggregate;
mod aggregator;
mod config;
mod error;
mod fields;
pub mod measure;
mod progress;
mod record;
mod result;
mod sharded;
pub mod source;
mod store;
mod window;

pub use crate::aggregate::{ConditionalAccumulator, NumericAccumulator, RunningAggregate};
pub use crate::aggregator::{AggregatorState, BucketAggregator};
pub use crate::config::{AggregatorConfig, AggregatorConfigBuilder};
pub use crate::error::{AggregationError, Result};
pub use crate::fields::{Condition, ConditionalField, NumericField, TrackedFields};
pub use crate::progress::{Progress, format_count};
pub use crate::record::{FieldValue, Observation, Record, Schema};
pub use crate::result::{BucketResult, FieldAverage, FieldRatio};
pub use crate::sharded::{ShardOptions, ShardedAggregator};
pub use crate::store::BucketStore;
pub use crate::window::{IntervalWidth, bucket_key};
