//! Error types for hashmatch.

use thiserror::Error;

/// Errors that can occur while configuring or running a match batch.
///
/// Configuration errors are raised before any vectorization happens. Strings
/// that normalize to empty are not errors; they are skipped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchError {
    /// Invalid parameter value (`k == 0`, `dim == 0`, bad n-gram sizes).
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Metric name that does not map to a supported distance.
    #[error("unknown metric {0:?}; expected one of euclidean, l2, manhattan, cityblock, l1, cosine")]
    UnknownMetric(String),

    /// A vector was scored against an index of a different dimension.
    #[error("dimension mismatch: query has {query_dim} dimensions, index has {index_dim}")]
    DimensionMismatch { query_dim: u32, index_dim: u32 },

    /// The batch was cancelled; no partial results are returned.
    #[error("match batch cancelled")]
    Cancelled,
}

/// Result type for hashmatch operations.
pub type Result<T> = std::result::Result<T, MatchError>;
