//! Feature hashing ("the hashing trick") for word n-grams.
//!
//! Instead of building a vocabulary, every n-gram is hashed straight to one of
//! `dim` buckets. Memory is fixed regardless of how many distinct n-grams a
//! corpus contains; the price is that unrelated n-grams occasionally share a
//! bucket.
//!
//! ## Signed contributions
//!
//! A plain count per bucket makes every collision inflate the value. Here the
//! sign of the 64-bit hash decides whether an n-gram adds `+1` or `-1`:
//!
//! ```text
//! h      = hash(ngram) as i64
//! bucket = h mod dim           (Euclidean remainder, in [0, dim))
//! value  = +1 if h >= 0 else -1
//! ```
//!
//! Two colliding n-grams are then as likely to cancel as to reinforce, so
//! inner products between hashed vectors are unbiased estimates of the inner
//! products between the exact n-gram count vectors (Weinberger et al., 2009).
//!
//! This relies on the sign bit of the hash being independent of its residue
//! modulo `dim`. XXH3 mixes all 64 output bits, which is what the default
//! [`Xxh3Hash`] relies on; any other [`FeatureHash`] can be plugged in.
//!
//! ## References
//!
//! - Weinberger, Dasgupta, Langford, Smola, Attenberg (2009). "Feature hashing
//!   for large scale multitask learning."
//! - Shi et al. (2009). "Hash kernels for structured data."

mod features;

pub use features::{hash_features, FeatureHasher};

use xxhash_rust::xxh3::xxh3_64_with_seed;

/// Seed used by [`Xxh3Hash::default`]. Fixed so runs are reproducible.
pub const DEFAULT_SEED: u64 = 2;

/// A deterministic signed hash over n-gram text.
///
/// Implementations must return the same value for the same input for the
/// lifetime of a batch; the whole index and every query are hashed with one
/// instance.
pub trait FeatureHash: Send + Sync {
    fn hash(&self, feature: &str) -> i64;
}

/// Seeded XXH3-64, reinterpreted as a signed integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Xxh3Hash {
    seed: u64,
}

impl Xxh3Hash {
    pub fn with_seed(seed: u64) -> Self {
        Self { seed }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl Default for Xxh3Hash {
    fn default() -> Self {
        Self::with_seed(DEFAULT_SEED)
    }
}

impl FeatureHash for Xxh3Hash {
    #[inline]
    fn hash(&self, feature: &str) -> i64 {
        xxh3_64_with_seed(feature.as_bytes(), self.seed) as i64
    }
}

/// Split a signed hash into its bucket and `±1` contribution.
///
/// `dim` must be non-zero.
#[inline]
pub fn bucket(hash: i64, dim: u32) -> (u32, i32) {
    let index = hash.rem_euclid(i64::from(dim)) as u32;
    let sign = if hash < 0 { -1 } else { 1 };
    (index, sign)
}
