use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AggregationError {
    /// Rejected at construction: bad interval width or tracked field set.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Operation not allowed in the aggregator's current state.
    #[error("usage error: {0}")]
    Usage(String),

    /// A tracked slot carried a value the field cannot accumulate.
    #[error("data integrity error on field '{field}' at timestamp {timestamp}: {reason}")]
    DataIntegrity {
        field: String,
        timestamp: i64,
        reason: String,
    },

    #[error("worker failure: {0}")]
    Worker(String),
}

impl AggregationError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    pub(crate) fn usage(msg: impl Into<String>) -> Self {
        Self::Usage(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, AggregationError>;
