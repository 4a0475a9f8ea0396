//! Distance metrics between hashed feature vectors.
//!
//! Every metric here is a *dissimilarity*: lower scores mean more similar
//! strings, and identical vectors score `0.0` under every metric. Cosine
//! similarity is therefore reported as the cosine distance $1 - \cos(a,b)$.
//!
//! ## Important nuance
//!
//! A vector with no stored buckets has no direction. Its cosine similarity to
//! anything is taken to be `0`, so its cosine distance is `1.0`, including to
//! another zero vector. Euclidean and Manhattan distances treat it as the
//! origin.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{MatchError, Result};
use crate::sparse::SparseVector;

/// Distance metric used to rank corpus entries.
///
/// Serializes as its lowercase name and deserializes through [`FromStr`], so
/// config files accept the same names and aliases as `str::parse`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Metric {
    /// Euclidean distance $\sqrt{\sum (a_i - b_i)^2}$.
    Euclidean,
    /// Alias of [`Metric::Euclidean`] (not squared).
    L2,
    /// Manhattan distance $\sum |a_i - b_i|$, also known as L1 or cityblock.
    Manhattan,
    /// Cosine distance $1 - \cos(a,b)$, in `[0, 2]`.
    #[default]
    Cosine,
}

impl Metric {
    /// Every supported metric, in a stable order.
    pub const ALL: [Metric; 4] = [Metric::Euclidean, Metric::L2, Metric::Manhattan, Metric::Cosine];

    /// Distance between two vectors.
    ///
    /// If dimensions mismatch, this returns `f32::INFINITY` (so it is never
    /// selected as a nearest neighbor). Use [`Metric::try_distance`] to get an
    /// error instead.
    #[inline]
    #[must_use]
    pub fn distance(self, a: &SparseVector, b: &SparseVector) -> f32 {
        if a.dim() != b.dim() {
            return f32::INFINITY;
        }
        match self {
            Metric::Euclidean | Metric::L2 => euclidean_distance(a, b),
            Metric::Manhattan => manhattan_distance(a, b),
            Metric::Cosine => cosine_distance(a, b),
        }
    }

    /// Distance between two vectors, rejecting mismatched dimensions.
    pub fn try_distance(self, a: &SparseVector, b: &SparseVector) -> Result<f32> {
        if a.dim() != b.dim() {
            return Err(MatchError::DimensionMismatch {
                query_dim: a.dim(),
                index_dim: b.dim(),
            });
        }
        Ok(self.distance(a, b))
    }

    pub fn name(self) -> &'static str {
        match self {
            Metric::Euclidean => "euclidean",
            Metric::L2 => "l2",
            Metric::Manhattan => "manhattan",
            Metric::Cosine => "cosine",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Metric {
    type Err = MatchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "euclidean" => Ok(Metric::Euclidean),
            "l2" => Ok(Metric::L2),
            "manhattan" | "cityblock" | "l1" => Ok(Metric::Manhattan),
            "cosine" => Ok(Metric::Cosine),
            _ => Err(MatchError::UnknownMetric(s.to_string())),
        }
    }
}

impl TryFrom<String> for Metric {
    type Error = MatchError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<Metric> for String {
    fn from(metric: Metric) -> Self {
        metric.name().to_owned()
    }
}

/// Euclidean distance.
#[inline]
#[must_use]
pub fn euclidean_distance(a: &SparseVector, b: &SparseVector) -> f32 {
    (a.squared_l2_distance(b) as f64).sqrt() as f32
}

/// Manhattan (L1) distance.
#[inline]
#[must_use]
pub fn manhattan_distance(a: &SparseVector, b: &SparseVector) -> f32 {
    a.l1_distance(b) as f32
}

/// Cosine distance $1 - \cos(a,b)$.
///
/// Norms are taken under one square root so that a vector compared with
/// itself gets exactly `0.0`.
#[inline]
#[must_use]
pub fn cosine_distance(a: &SparseVector, b: &SparseVector) -> f32 {
    let na = a.squared_norm();
    let nb = b.squared_norm();
    if na == 0 || nb == 0 {
        return 1.0;
    }
    let cos = a.dot(b) as f64 / (na as f64 * nb as f64).sqrt();
    (1.0 - cos.clamp(-1.0, 1.0)) as f32
}
