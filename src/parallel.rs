//! Order-preserving fallible map, parallel when the `parallel` feature is on.

use crate::error::Result;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Map `f` over `items` with their positions, collecting in input order.
///
/// Stops at the first error. Which error wins is unspecified when several
/// units fail concurrently; callers only raise one kind per batch.
#[cfg(feature = "parallel")]
pub(crate) fn try_map_indexed<T, R, F>(items: &[T], f: F) -> Result<Vec<R>>
where
    T: Sync,
    R: Send,
    F: Fn(usize, &T) -> Result<R> + Sync + Send,
{
    items
        .par_iter()
        .enumerate()
        .map(|(i, item)| f(i, item))
        .collect()
}

#[cfg(not(feature = "parallel"))]
pub(crate) fn try_map_indexed<T, R, F>(items: &[T], f: F) -> Result<Vec<R>>
where
    T: Sync,
    R: Send,
    F: Fn(usize, &T) -> Result<R> + Sync + Send,
{
    items.iter().enumerate().map(|(i, item)| f(i, item)).collect()
}
