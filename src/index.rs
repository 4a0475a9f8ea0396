//! Corpus index: one hashed vector per corpus position.
//!
//! The index is built in one batch from already-normalized strings and is
//! read-only afterwards. Entries whose normalized form is empty keep their
//! slot (as a zero vector) so positions line up with the raw corpus, but they
//! are flagged ineligible and never returned as matches.

use std::collections::BTreeSet;
use std::time::Instant;

use tracing::debug;

use crate::error::Result;
use crate::hash::{FeatureHash, FeatureHasher};
use crate::parallel::try_map_indexed;
use crate::progress::{CancelFlag, NoProgress, Phase, PhaseTracker, ProgressSink};
use crate::sparse::SparseVector;

/// Hashed vectors for every corpus position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusIndex {
    dim: u32,
    vectors: Vec<SparseVector>,
    eligible: Vec<bool>,
    eligible_count: usize,
}

impl CorpusIndex {
    /// Vectorize every normalized corpus entry.
    pub fn build<H, S>(normalized: &[S], hasher: &FeatureHasher<H>) -> Self
    where
        H: FeatureHash,
        S: AsRef<str> + Sync,
    {
        let vectors = normalized
            .iter()
            .map(|s| hasher.vectorize(s.as_ref()))
            .collect();
        Self::from_parts(hasher.dim(), normalized, vectors)
    }

    /// Parallel build with progress reporting and cancellation.
    pub(crate) fn build_with<H, S>(
        normalized: &[S],
        hasher: &FeatureHasher<H>,
        sink: &dyn ProgressSink,
        cancel: &CancelFlag,
    ) -> Result<Self>
    where
        H: FeatureHash,
        S: AsRef<str> + Sync,
    {
        let started = Instant::now();
        let tracker = PhaseTracker::new(sink, Phase::Vectorizing, normalized.len());

        let vectors = try_map_indexed(normalized, |_, s| {
            cancel.check()?;
            let v = hasher.vectorize(s.as_ref());
            tracker.complete_one();
            Ok(v)
        })?;

        let index = Self::from_parts(hasher.dim(), normalized, vectors);
        debug!(
            entries = index.len(),
            eligible = index.eligible_count(),
            dim = index.dim,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Built corpus index"
        );
        Ok(index)
    }

    fn from_parts<S: AsRef<str>>(dim: u32, normalized: &[S], vectors: Vec<SparseVector>) -> Self {
        let eligible: Vec<bool> = normalized.iter().map(|s| !s.as_ref().is_empty()).collect();
        let eligible_count = eligible.iter().filter(|&&e| e).count();
        Self {
            dim,
            vectors,
            eligible,
            eligible_count,
        }
    }

    /// Number of corpus positions, eligible or not.
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn dim(&self) -> u32 {
        self.dim
    }

    pub fn vector(&self, position: usize) -> Option<&SparseVector> {
        self.vectors.get(position)
    }

    /// Whether `position` can be returned as a match.
    pub fn is_eligible(&self, position: usize) -> bool {
        self.eligible.get(position).copied().unwrap_or(false)
    }

    pub fn eligible_count(&self) -> usize {
        self.eligible_count
    }

    /// Eligible positions and their vectors, in corpus order.
    pub fn eligible(&self) -> impl Iterator<Item = (usize, &SparseVector)> + '_ {
        self.vectors
            .iter()
            .enumerate()
            .filter(move |(i, _)| self.eligible[*i])
    }
}

/// Build an index with the default hash function and no progress reporting.
pub fn build_index<S: AsRef<str> + Sync>(
    normalized_corpus: &[S],
    ngram_sizes: &BTreeSet<usize>,
    dim: u32,
) -> Result<CorpusIndex> {
    let hasher = FeatureHasher::new(dim, ngram_sizes.clone())?;
    CorpusIndex::build_with(normalized_corpus, &hasher, &NoProgress, &CancelFlag::new())
}
