//! Match configuration.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::distance::Metric;
use crate::error::{MatchError, Result};

/// Default width of the hashed feature space.
pub const DEFAULT_DIM: usize = 1 << 16;
/// Default number of matches per query.
pub const DEFAULT_K: usize = 3;

/// Parameters for a match batch.
///
/// Deserializes from partial documents: missing fields take their defaults.
///
/// ```rust
/// use hashmatch::{MatchParams, Metric};
///
/// let params = MatchParams::default()
///     .with_ngram_sizes(1..=4)
///     .with_k(1)
///     .with_metric(Metric::Euclidean);
/// assert!(params.validate().is_ok());
/// assert!(params.clone().with_k(0).validate().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchParams {
    /// Word n-gram sizes contributing features.
    pub ngram_sizes: BTreeSet<usize>,
    /// Number of hash buckets.
    pub dim: usize,
    /// Matches returned per query.
    pub k: usize,
    /// Distance used for ranking.
    pub metric: Metric,
}

impl Default for MatchParams {
    fn default() -> Self {
        Self {
            ngram_sizes: [1, 2].into(),
            dim: DEFAULT_DIM,
            k: DEFAULT_K,
            metric: Metric::Cosine,
        }
    }
}

impl MatchParams {
    #[must_use]
    pub fn with_ngram_sizes<I: IntoIterator<Item = usize>>(mut self, sizes: I) -> Self {
        self.ngram_sizes = sizes.into_iter().collect();
        self
    }

    #[must_use]
    pub fn with_dim(mut self, dim: usize) -> Self {
        self.dim = dim;
        self
    }

    #[must_use]
    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    #[must_use]
    pub fn with_metric(mut self, metric: Metric) -> Self {
        self.metric = metric;
        self
    }

    /// Check every parameter before any work is done.
    pub fn validate(&self) -> Result<()> {
        if self.k == 0 {
            return Err(MatchError::InvalidParameter("k must be > 0".into()));
        }
        if self.dim == 0 {
            return Err(MatchError::InvalidParameter("dim must be > 0".into()));
        }
        if u32::try_from(self.dim).is_err() {
            return Err(MatchError::InvalidParameter(format!(
                "dim must be at most {}, got {}",
                u32::MAX,
                self.dim
            )));
        }
        validate_ngram_sizes(&self.ngram_sizes)
    }

    /// `dim` as the width used by [`crate::sparse::SparseVector`].
    pub(crate) fn dim_u32(&self) -> Result<u32> {
        u32::try_from(self.dim)
            .map_err(|_| MatchError::InvalidParameter(format!("dim {} too large", self.dim)))
    }
}

/// N-gram sizes must be non-empty and positive.
pub(crate) fn validate_ngram_sizes(sizes: &BTreeSet<usize>) -> Result<()> {
    if sizes.is_empty() {
        return Err(MatchError::InvalidParameter(
            "ngram_sizes must not be empty".into(),
        ));
    }
    if sizes.contains(&0) {
        return Err(MatchError::InvalidParameter(
            "ngram sizes must be positive".into(),
        ));
    }
    Ok(())
}
