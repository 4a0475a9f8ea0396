//! Hashed n-gram feature vectors.

use std::collections::BTreeSet;

use super::{bucket, FeatureHash, Xxh3Hash};
use crate::error::{MatchError, Result};
use crate::ngram::for_each_ngram;
use crate::params::validate_ngram_sizes;
use crate::sparse::SparseVector;

/// Turns normalized strings into sparse signed-count vectors.
#[derive(Debug, Clone)]
pub struct FeatureHasher<H = Xxh3Hash> {
    hash: H,
    dim: u32,
    ngram_sizes: BTreeSet<usize>,
}

impl FeatureHasher<Xxh3Hash> {
    /// Hasher with the default seeded XXH3.
    ///
    /// # Errors
    ///
    /// [`MatchError::InvalidParameter`] if `dim` is zero, or if
    /// `ngram_sizes` is empty or contains zero.
    pub fn new(dim: u32, ngram_sizes: BTreeSet<usize>) -> Result<Self> {
        Self::with_hash(Xxh3Hash::default(), dim, ngram_sizes)
    }
}

impl<H: FeatureHash> FeatureHasher<H> {
    /// Hasher with a custom hash function.
    pub fn with_hash(hash: H, dim: u32, ngram_sizes: BTreeSet<usize>) -> Result<Self> {
        if dim == 0 {
            return Err(MatchError::InvalidParameter("dim must be > 0".into()));
        }
        validate_ngram_sizes(&ngram_sizes)?;
        Ok(Self {
            hash,
            dim,
            ngram_sizes,
        })
    }

    #[inline]
    pub fn dim(&self) -> u32 {
        self.dim
    }

    pub fn ngram_sizes(&self) -> &BTreeSet<usize> {
        &self.ngram_sizes
    }

    pub fn hash_fn(&self) -> &H {
        &self.hash
    }

    /// Bucket and signed contribution of a single n-gram.
    #[inline]
    pub fn feature(&self, ngram: &str) -> (u32, i32) {
        bucket(self.hash.hash(ngram), self.dim)
    }

    /// Hash every n-gram of `normalized` and sum the signed contributions.
    ///
    /// An empty string, or one with fewer tokens than every configured size,
    /// yields the zero vector.
    pub fn vectorize(&self, normalized: &str) -> SparseVector {
        let mut pairs = Vec::new();
        for_each_ngram(normalized, &self.ngram_sizes, |gram| {
            pairs.push(self.feature(gram));
        });
        pairs.sort_unstable_by_key(|&(i, _)| i);
        SparseVector::from_sorted_pairs(self.dim, pairs)
    }
}

/// One-shot hashing with the default hash function.
///
/// ```rust
/// use hashmatch::hash::hash_features;
///
/// let v = hash_features("the cat sat", &[1, 2].into(), 1 << 16).unwrap();
/// assert!(v.indices().iter().all(|&i| i < 1 << 16));
/// assert!(v.nnz() <= 5);
/// ```
pub fn hash_features(
    normalized: &str,
    ngram_sizes: &BTreeSet<usize>,
    dim: u32,
) -> Result<SparseVector> {
    Ok(FeatureHasher::new(dim, ngram_sizes.clone())?.vectorize(normalized))
}
