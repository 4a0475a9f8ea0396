//! Brute-force nearest-neighbor matching of queries against a corpus index.
//!
//! Every query vector is scored against every eligible corpus vector, and the
//! `k` lowest scores are kept. Selection uses a bounded max-heap keyed on
//! `(score, position)`, so among equal scores the earlier corpus position
//! always wins. That tie-break matters in practice: distinct sentences often
//! hash to identical vectors.
//!
//! ## Empty strings
//!
//! - A query that normalizes to empty is not matched and has no entry in
//!   [`MatchResults`].
//! - A corpus entry that normalizes to empty is never returned.
//! - If no corpus entry is eligible, every non-empty query gets an empty match
//!   list and [`MatchResults::corpus_is_empty`] is set.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap};
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::distance::Metric;
use crate::error::{MatchError, Result};
use crate::hash::{FeatureHash, FeatureHasher, Xxh3Hash};
use crate::index::CorpusIndex;
use crate::normalize::{Normalizer, StopWords, TranslationTable};
use crate::parallel::try_map_indexed;
use crate::params::MatchParams;
use crate::progress::{CancelFlag, NoProgress, Phase, PhaseTracker, ProgressSink};
use crate::sparse::SparseVector;

/// One matched corpus entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    /// Position of the entry in the corpus.
    pub corpus_position: usize,
    /// The original, un-normalized corpus string.
    pub text: String,
    /// Distance to the query; lower is more similar.
    pub score: f32,
}

/// Matches for one query, ascending by score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryMatches {
    pub query_position: usize,
    /// The original, un-normalized query string.
    pub query: String,
    pub matches: Vec<Match>,
}

impl QueryMatches {
    /// The closest match, if any.
    pub fn best(&self) -> Option<&Match> {
        self.matches.first()
    }
}

/// One row of the flattened result table: a (query, rank) pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MatchRow<'a> {
    pub query_position: usize,
    pub query: &'a str,
    /// 1-based rank of the match for this query.
    pub rank: usize,
    pub corpus_position: usize,
    pub matched: &'a str,
    pub score: f32,
}

/// Results of a batch, keyed by query position.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchResults {
    by_query: BTreeMap<usize, QueryMatches>,
    corpus_empty: bool,
    skipped_queries: usize,
}

impl MatchResults {
    /// Matches for the query at `position`.
    ///
    /// `None` means no match was attempted because the query normalized to
    /// empty; `Some(&[])` only happens when the corpus had no eligible entry.
    pub fn get(&self, position: usize) -> Option<&[Match]> {
        self.by_query.get(&position).map(|q| q.matches.as_slice())
    }

    pub fn query(&self, position: usize) -> Option<&QueryMatches> {
        self.by_query.get(&position)
    }

    pub fn contains_query(&self, position: usize) -> bool {
        self.by_query.contains_key(&position)
    }

    /// Number of queries that were matched.
    pub fn len(&self) -> usize {
        self.by_query.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_query.is_empty()
    }

    /// Matched queries in query order.
    pub fn iter(&self) -> impl Iterator<Item = &QueryMatches> + '_ {
        self.by_query.values()
    }

    /// No corpus entry survived normalization.
    pub fn corpus_is_empty(&self) -> bool {
        self.corpus_empty
    }

    /// Queries skipped because they normalized to empty.
    pub fn skipped_queries(&self) -> usize {
        self.skipped_queries
    }

    /// One row per (query, rank) pair, in query order then rank order.
    pub fn rows(&self) -> impl Iterator<Item = MatchRow<'_>> + '_ {
        self.by_query.values().flat_map(|q| {
            q.matches.iter().enumerate().map(move |(rank, m)| MatchRow {
                query_position: q.query_position,
                query: &q.query,
                rank: rank + 1,
                corpus_position: m.corpus_position,
                matched: &m.text,
                score: m.score,
            })
        })
    }

    pub fn into_map(self) -> BTreeMap<usize, QueryMatches> {
        self.by_query
    }
}

impl IntoIterator for MatchResults {
    type Item = QueryMatches;
    type IntoIter = std::collections::btree_map::IntoValues<usize, QueryMatches>;

    fn into_iter(self) -> Self::IntoIter {
        self.by_query.into_values()
    }
}

/// Candidate corpus entry during top-k selection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Candidate {
    pub(crate) position: usize,
    pub(crate) score: f32,
}

impl Eq for Candidate {}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        // Max-heap: the worst kept candidate (largest score, then latest
        // position) sits on top. total_cmp is NaN-safe.
        self.score
            .total_cmp(&other.score)
            .then_with(|| self.position.cmp(&other.position))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// The `k` best candidates, ascending by `(score, position)`.
pub(crate) fn select_top_k<I>(candidates: I, k: usize) -> Vec<Candidate>
where
    I: IntoIterator<Item = Candidate>,
{
    if k == 0 {
        return Vec::new();
    }
    let candidates = candidates.into_iter();
    let mut heap = BinaryHeap::with_capacity(k.min(candidates.size_hint().0) + 1);
    for candidate in candidates {
        if heap.len() < k {
            heap.push(candidate);
        } else if let Some(worst) = heap.peek() {
            if candidate < *worst {
                heap.pop();
                heap.push(candidate);
            }
        }
    }
    heap.into_sorted_vec()
}

/// Score `query` against every eligible vector of `index` and keep the best `k`.
///
/// Returns `(corpus position, score)` pairs ascending by score, ties by
/// position.
///
/// # Errors
///
/// [`MatchError::InvalidParameter`] if `k` is zero;
/// [`MatchError::DimensionMismatch`] if `query` and `index` disagree on `dim`.
pub fn top_k(
    query: &SparseVector,
    index: &CorpusIndex,
    k: usize,
    metric: Metric,
) -> Result<Vec<(usize, f32)>> {
    if k == 0 {
        return Err(MatchError::InvalidParameter("k must be > 0".into()));
    }
    if query.dim() != index.dim() {
        return Err(MatchError::DimensionMismatch {
            query_dim: query.dim(),
            index_dim: index.dim(),
        });
    }
    let candidates = index.eligible().map(|(position, v)| Candidate {
        position,
        score: metric.distance(query, v),
    });
    Ok(select_top_k(candidates, k)
        .into_iter()
        .map(|c| (c.position, c.score))
        .collect())
}

/// Matching engine: normalizer, hasher and parameters for one kind of batch.
///
/// A `Matcher` holds no corpus; every call to [`Matcher::find_matches`]
/// rebuilds the index from scratch.
///
/// ```rust
/// use hashmatch::{Matcher, MatchParams, Metric, Normalizer};
///
/// let matcher = Matcher::new(
///     MatchParams::default().with_k(2).with_metric(Metric::Euclidean),
///     Normalizer::new(),
/// )
/// .unwrap();
///
/// let corpus = ["The cat sat.", "A dog ran.", "The cat sat down."];
/// let results = matcher.find_matches(&["the cat sat"], &corpus).unwrap();
///
/// let best = results.get(0).unwrap();
/// assert_eq!(best[0].text, "The cat sat.");
/// assert_eq!(best[0].score, 0.0);
/// assert_eq!(best[1].text, "The cat sat down.");
/// ```
pub struct Matcher<H = Xxh3Hash> {
    params: MatchParams,
    normalizer: Normalizer,
    hasher: FeatureHasher<H>,
    progress: Arc<dyn ProgressSink>,
    cancel: CancelFlag,
}

impl Matcher<Xxh3Hash> {
    /// Validate `params` and build a matcher with the default hash function.
    pub fn new(params: MatchParams, normalizer: Normalizer) -> Result<Self> {
        Self::with_hash(params, normalizer, Xxh3Hash::default())
    }
}

impl<H: FeatureHash> Matcher<H> {
    /// Validate `params` and build a matcher with a custom hash function.
    pub fn with_hash(params: MatchParams, normalizer: Normalizer, hash: H) -> Result<Self> {
        params.validate()?;
        let hasher = FeatureHasher::with_hash(hash, params.dim_u32()?, params.ngram_sizes.clone())?;
        Ok(Self {
            params,
            normalizer,
            hasher,
            progress: Arc::new(NoProgress),
            cancel: CancelFlag::new(),
        })
    }

    /// Report progress of every batch to `sink`.
    #[must_use]
    pub fn with_progress(mut self, sink: impl ProgressSink + 'static) -> Self {
        self.progress = Arc::new(sink);
        self
    }

    /// Abort batches when `flag` is raised.
    #[must_use]
    pub fn with_cancel_flag(mut self, flag: CancelFlag) -> Self {
        self.cancel = flag;
        self
    }

    pub fn params(&self) -> &MatchParams {
        &self.params
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    pub fn hasher(&self) -> &FeatureHasher<H> {
        &self.hasher
    }

    /// Normalize both sides, build the corpus index, and match every query.
    pub fn find_matches<Q, C>(&self, queries: &[Q], corpus: &[C]) -> Result<MatchResults>
    where
        Q: AsRef<str> + Sync,
        C: AsRef<str> + Sync,
    {
        self.cancel.check()?;
        let normalized_queries = self.normalizer.normalize_all(queries);
        let normalized_corpus = self.normalizer.normalize_all(corpus);
        let index = self.build_index(&normalized_corpus)?;
        self.match_normalized(queries, &normalized_queries, corpus, &index)
    }

    /// Vectorize an already-normalized corpus.
    pub fn build_index<S: AsRef<str> + Sync>(&self, normalized_corpus: &[S]) -> Result<CorpusIndex> {
        CorpusIndex::build_with(
            normalized_corpus,
            &self.hasher,
            self.progress.as_ref(),
            &self.cancel,
        )
    }

    /// Match pre-normalized queries against a prebuilt index.
    ///
    /// `queries` and `normalized_queries` must be position-aligned, as must
    /// `corpus` and `index`.
    pub fn match_normalized<Q, N, C>(
        &self,
        queries: &[Q],
        normalized_queries: &[N],
        corpus: &[C],
        index: &CorpusIndex,
    ) -> Result<MatchResults>
    where
        Q: AsRef<str> + Sync,
        N: AsRef<str> + Sync,
        C: AsRef<str> + Sync,
    {
        if queries.len() != normalized_queries.len() {
            return Err(MatchError::InvalidParameter(format!(
                "{} queries but {} normalized queries",
                queries.len(),
                normalized_queries.len()
            )));
        }
        if corpus.len() != index.len() {
            return Err(MatchError::InvalidParameter(format!(
                "{} corpus entries but {} indexed vectors",
                corpus.len(),
                index.len()
            )));
        }
        if index.dim() != self.hasher.dim() {
            return Err(MatchError::DimensionMismatch {
                query_dim: self.hasher.dim(),
                index_dim: index.dim(),
            });
        }

        let started = Instant::now();
        let corpus_empty = index.eligible_count() == 0;
        if corpus_empty {
            warn!(
                corpus = corpus.len(),
                "No corpus entry is non-empty after normalization; no matches possible"
            );
        }

        let tracker = PhaseTracker::new(self.progress.as_ref(), Phase::Matching, queries.len());
        let per_query = try_map_indexed(normalized_queries, |_, normalized| {
            self.cancel.check()?;
            let normalized = normalized.as_ref();
            let found = if normalized.is_empty() {
                None
            } else {
                let vector = self.hasher.vectorize(normalized);
                Some(top_k(&vector, index, self.params.k, self.params.metric)?)
            };
            tracker.complete_one();
            Ok(found)
        })?;

        let mut results = MatchResults {
            corpus_empty,
            ..MatchResults::default()
        };
        for (position, found) in per_query.into_iter().enumerate() {
            let Some(found) = found else {
                results.skipped_queries += 1;
                continue;
            };
            let matches = found
                .into_iter()
                .map(|(corpus_position, score)| Match {
                    corpus_position,
                    text: corpus[corpus_position].as_ref().to_owned(),
                    score,
                })
                .collect();
            results.by_query.insert(
                position,
                QueryMatches {
                    query_position: position,
                    query: queries[position].as_ref().to_owned(),
                    matches,
                },
            );
        }

        if results.skipped_queries > 0 {
            debug!(
                skipped = results.skipped_queries,
                "Skipped queries that normalized to empty"
            );
        }
        info!(
            queries = queries.len(),
            matched = results.len(),
            skipped = results.skipped_queries,
            corpus = corpus.len(),
            eligible = index.eligible_count(),
            k = self.params.k,
            metric = %self.params.metric,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Matched query batch"
        );
        Ok(results)
    }
}

impl<H> std::fmt::Debug for Matcher<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Matcher")
            .field("params", &self.params)
            .field("normalizer", &self.normalizer)
            .finish_non_exhaustive()
    }
}

/// Match `queries` against `corpus` in one call.
///
/// Stop words and translation table are optional; absent ones skip their
/// normalization step.
pub fn find_matches<Q, C>(
    queries: &[Q],
    corpus: &[C],
    stop_words: Option<&StopWords>,
    translations: Option<&TranslationTable>,
    params: &MatchParams,
) -> Result<MatchResults>
where
    Q: AsRef<str> + Sync,
    C: AsRef<str> + Sync,
{
    let mut normalizer = Normalizer::new();
    if let Some(sw) = stop_words {
        normalizer = normalizer.with_stop_words(sw.clone());
    }
    if let Some(t) = translations {
        normalizer = normalizer.with_translations(t.clone());
    }
    Matcher::new(params.clone(), normalizer)?.find_matches(queries, corpus)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(position: usize, score: f32) -> Candidate {
        Candidate { position, score }
    }

    #[test]
    fn top_k_keeps_smallest_scores_in_order() {
        let picked = select_top_k(
            vec![c(0, 3.0), c(1, 1.0), c(2, 4.0), c(3, 0.5), c(4, 2.0)],
            3,
        );
        let positions: Vec<usize> = picked.iter().map(|c| c.position).collect();
        assert_eq!(positions, vec![3, 1, 4]);
    }

    #[test]
    fn ties_prefer_earlier_positions() {
        let picked = select_top_k(
            vec![c(5, 1.0), c(2, 1.0), c(7, 0.0), c(1, 1.0), c(9, 1.0)],
            3,
        );
        let positions: Vec<usize> = picked.iter().map(|c| c.position).collect();
        assert_eq!(positions, vec![7, 1, 2]);
    }

    #[test]
    fn top_k_rejects_zero_k() {
        let index = crate::index::build_index(&["the cat sat", "a dog"], &[1, 2].into(), 1 << 16).unwrap();
        let query = crate::hash::hash_features("the cat", &[1, 2].into(), 1 << 16).unwrap();
        assert!(matches!(
            top_k(&query, &index, 0, Metric::Cosine),
            Err(MatchError::InvalidParameter(_))
        ));
        assert_eq!(top_k(&query, &index, 1, Metric::Cosine).unwrap()[0].0, 0);
    }

    #[test]
    fn top_k_with_fewer_candidates_than_k() {
        assert_eq!(select_top_k(vec![c(0, 1.0)], 5).len(), 1);
        assert!(select_top_k(Vec::<Candidate>::new(), 5).is_empty());
        assert!(select_top_k(vec![c(0, 1.0)], 0).is_empty());
    }

    fn matcher(k: usize, metric: Metric) -> Matcher {
        Matcher::new(
            MatchParams::default().with_k(k).with_metric(metric),
            Normalizer::new(),
        )
        .unwrap()
    }

    #[test]
    fn empty_queries_are_absent_and_empty_corpus_entries_never_match() {
        let m = matcher(10, Metric::Cosine);
        let results = m
            .find_matches(&["the cat", "!!!", "a dog"], &["--", "the cat", "...", "a dog"])
            .unwrap();

        assert_eq!(results.len(), 2);
        assert!(!results.contains_query(1));
        assert_eq!(results.skipped_queries(), 1);
        for q in results.iter() {
            assert_eq!(q.matches.len(), 2);
            assert!(q.matches.iter().all(|m| m.corpus_position == 1 || m.corpus_position == 3));
        }
    }

    #[test]
    fn all_empty_corpus_gives_empty_lists() {
        let m = matcher(3, Metric::Euclidean);
        let results = m.find_matches(&["hello there", "??"], &["!!", ""]).unwrap();
        assert!(results.corpus_is_empty());
        assert_eq!(results.get(0).map(<[Match]>::len), Some(0));
        assert_eq!(results.get(1), None);
    }

    #[test]
    fn rows_flatten_query_then_rank() {
        let m = matcher(2, Metric::Manhattan);
        let corpus = ["x y", "x z", "q r"];
        let results = m.find_matches(&["x y", "q r"], &corpus).unwrap();
        let rows: Vec<(usize, usize, usize)> = results
            .rows()
            .map(|r| (r.query_position, r.rank, r.corpus_position))
            .collect();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0], (0, 1, 0));
        assert_eq!(rows[1].0, 0);
        assert_eq!(rows[2], (1, 1, 2));
        assert_eq!(results.rows().next().unwrap().matched, "x y");
    }

    #[test]
    fn best_and_into_map_expose_per_query_results() {
        let m = matcher(2, Metric::Euclidean);
        let results = m
            .find_matches(&["x y", "??", "q r"], &["q r", "x y"])
            .unwrap();
        assert_eq!(results.query(0).and_then(QueryMatches::best).map(|b| b.corpus_position), Some(1));

        let empty = matcher(2, Metric::Euclidean).find_matches(&["x"], &["!!"]).unwrap();
        assert!(empty.query(0).unwrap().best().is_none());

        let map = results.into_map();
        assert_eq!(map.keys().copied().collect::<Vec<_>>(), vec![0, 2]);
        assert_eq!(map[&2].best().unwrap().text, "q r");
    }

    #[test]
    fn duplicate_queries_are_kept_by_position() {
        let m = matcher(1, Metric::Cosine);
        let results = m.find_matches(&["same", "same"], &["same"]).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results.get(0), results.get(1));
    }

    #[test]
    fn misaligned_inputs_are_rejected() {
        let m = matcher(1, Metric::Cosine);
        let index = m.build_index(&["a"]).unwrap();
        let err = m.match_normalized(&["a", "b"], &["a"], &["a"], &index).unwrap_err();
        assert!(matches!(err, MatchError::InvalidParameter(_)));
        let err = m.match_normalized(&["a"], &["a"], &["a", "b"], &index).unwrap_err();
        assert!(matches!(err, MatchError::InvalidParameter(_)));
    }

    #[test]
    fn index_with_other_dim_is_rejected() {
        let m = matcher(1, Metric::Cosine);
        let other = Matcher::new(MatchParams::default().with_dim(128), Normalizer::new()).unwrap();
        let index = other.build_index(&["a"]).unwrap();
        let err = m.match_normalized(&["a"], &["a"], &["a"], &index).unwrap_err();
        assert!(matches!(err, MatchError::DimensionMismatch { .. }));
    }

    #[test]
    fn cancelled_matcher_returns_error() {
        let flag = CancelFlag::new();
        let m = matcher(1, Metric::Cosine).with_cancel_flag(flag.clone());
        flag.cancel();
        assert_eq!(m.find_matches(&["a"], &["a"]), Err(MatchError::Cancelled));
    }

    #[test]
    fn invalid_params_fail_before_matching() {
        let err = Matcher::new(MatchParams::default().with_k(0), Normalizer::new()).unwrap_err();
        assert!(matches!(err, MatchError::InvalidParameter(_)));
    }

    #[test]
    fn free_function_applies_stop_words_and_translations() {
        let sw = StopWords::new(["the"]);
        let table: TranslationTable = [("feline", "cat")].into_iter().collect();
        let params = MatchParams::default().with_k(1);
        let results = find_matches(
            &["The feline"],
            &["a dog", "the cat"],
            Some(&sw),
            Some(&table),
            &params,
        )
        .unwrap();
        let best = &results.get(0).unwrap()[0];
        assert_eq!(best.text, "the cat");
        assert_eq!(best.score, 0.0);
    }
}
