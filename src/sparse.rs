//! Sparse signed-count vectors.
//!
//! A [`SparseVector`] stores only non-zero buckets as parallel arrays of
//! strictly increasing indices and their values. All pairwise arithmetic is a
//! single merge over the two index arrays, so cost is linear in the number of
//! stored entries rather than in the dimension.
//!
//! Counts are integers, so dot products and squared distances are computed
//! exactly in `i64`; only the final metric conversion goes through floating
//! point.

use std::cmp::Ordering;

use crate::error::{MatchError, Result};

/// Sparse vector over `[0, dim)` with signed integer counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SparseVector {
    dim: u32,
    indices: Vec<u32>,
    values: Vec<i32>,
}

impl SparseVector {
    /// The all-zero vector of dimension `dim`.
    pub fn zeros(dim: u32) -> Self {
        Self {
            dim,
            indices: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Sum `(index, value)` contributions into a vector.
    ///
    /// Contributions may repeat an index in any order; they are summed and
    /// buckets whose sum is zero are dropped.
    ///
    /// # Errors
    ///
    /// [`MatchError::InvalidParameter`] if `dim` is zero or an index is not
    /// below `dim`.
    pub fn from_contributions<I>(dim: u32, contributions: I) -> Result<Self>
    where
        I: IntoIterator<Item = (u32, i32)>,
    {
        if dim == 0 {
            return Err(MatchError::InvalidParameter("dim must be > 0".into()));
        }
        let mut pairs: Vec<(u32, i32)> = contributions.into_iter().collect();
        if let Some(&(index, _)) = pairs.iter().find(|(i, _)| *i >= dim) {
            return Err(MatchError::InvalidParameter(format!(
                "index {index} out of range for dimension {dim}"
            )));
        }
        pairs.sort_unstable_by_key(|&(i, _)| i);
        Ok(Self::from_sorted_pairs(dim, pairs))
    }

    /// Build from pairs already sorted by index and known to be in range.
    pub(crate) fn from_sorted_pairs(dim: u32, pairs: Vec<(u32, i32)>) -> Self {
        let mut indices = Vec::with_capacity(pairs.len());
        let mut values: Vec<i32> = Vec::with_capacity(pairs.len());

        for (index, value) in pairs {
            match indices.last() {
                Some(&last) if last == index => {
                    if let Some(v) = values.last_mut() {
                        *v += value;
                    }
                }
                _ => {
                    indices.push(index);
                    values.push(value);
                }
            }
        }

        // Collisions may cancel out.
        let mut kept = 0;
        for i in 0..indices.len() {
            if values[i] != 0 {
                indices[kept] = indices[i];
                values[kept] = values[i];
                kept += 1;
            }
        }
        indices.truncate(kept);
        values.truncate(kept);

        Self {
            dim,
            indices,
            values,
        }
    }

    #[inline]
    pub fn dim(&self) -> u32 {
        self.dim
    }

    /// Number of stored (non-zero) buckets.
    #[inline]
    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.indices.is_empty()
    }

    /// Stored indices, strictly increasing.
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Stored values, aligned with [`SparseVector::indices`]. Never zero.
    pub fn values(&self) -> &[i32] {
        &self.values
    }

    /// Value at `index` (zero when not stored).
    pub fn get(&self, index: u32) -> i32 {
        self.indices
            .binary_search(&index)
            .map(|pos| self.values[pos])
            .unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, i32)> + '_ {
        self.indices.iter().copied().zip(self.values.iter().copied())
    }

    /// Squared L2 norm.
    pub fn squared_norm(&self) -> i64 {
        self.values.iter().map(|&v| i64::from(v) * i64::from(v)).sum()
    }

    /// Inner product with another sparse vector.
    pub fn dot(&self, other: &SparseVector) -> i64 {
        let (a_idx, a_val) = (&self.indices, &self.values);
        let (b_idx, b_val) = (&other.indices, &other.values);
        let mut i = 0;
        let mut j = 0;
        let mut result = 0i64;

        while i < a_idx.len() && j < b_idx.len() {
            match a_idx[i].cmp(&b_idx[j]) {
                Ordering::Less => i += 1,
                Ordering::Greater => j += 1,
                Ordering::Equal => {
                    result += i64::from(a_val[i]) * i64::from(b_val[j]);
                    i += 1;
                    j += 1;
                }
            }
        }

        result
    }

    /// Squared Euclidean distance.
    pub fn squared_l2_distance(&self, other: &SparseVector) -> i64 {
        self.fold_difference(other, |acc, d| acc + d * d)
    }

    /// Manhattan (L1) distance.
    pub fn l1_distance(&self, other: &SparseVector) -> i64 {
        self.fold_difference(other, |acc, d| acc + d.abs())
    }

    /// Fold `f` over the element-wise difference `self - other` on the union
    /// of stored indices.
    fn fold_difference<F>(&self, other: &SparseVector, mut f: F) -> i64
    where
        F: FnMut(i64, i64) -> i64,
    {
        let (a_idx, a_val) = (&self.indices, &self.values);
        let (b_idx, b_val) = (&other.indices, &other.values);
        let mut i = 0;
        let mut j = 0;
        let mut acc = 0i64;

        while i < a_idx.len() && j < b_idx.len() {
            match a_idx[i].cmp(&b_idx[j]) {
                Ordering::Less => {
                    acc = f(acc, i64::from(a_val[i]));
                    i += 1;
                }
                Ordering::Greater => {
                    acc = f(acc, -i64::from(b_val[j]));
                    j += 1;
                }
                Ordering::Equal => {
                    acc = f(acc, i64::from(a_val[i]) - i64::from(b_val[j]));
                    i += 1;
                    j += 1;
                }
            }
        }
        for &v in &a_val[i..] {
            acc = f(acc, i64::from(v));
        }
        for &v in &b_val[j..] {
            acc = f(acc, -i64::from(v));
        }

        acc
    }
}
