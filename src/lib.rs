//! hashmatch: near-duplicate string matching with hashed word n-grams.
//!
//! For each string in a query set, finds the most similar strings in a
//! reference corpus. Strings are normalized, split into word n-grams, and
//! hashed into fixed-width sparse vectors; queries are then ranked against
//! every corpus vector by a distance metric.
//!
//! - `normalize`: lowercasing, punctuation stripping, stop words, translation
//! - `ngram`: contiguous word n-grams
//! - `hash`: the hashing trick (signed bucket counts)
//! - `sparse`: sparse signed-count vectors
//! - `distance`: Euclidean, Manhattan, cosine distance
//! - `index`: per-batch corpus index
//! - `matcher`: top-k selection and results
//! - `chapters`: cross-chapter matching over a whole book
//!
//! ```rust
//! use hashmatch::{find_matches, MatchParams, Metric, StopWords};
//!
//! let corpus = ["the cat sat", "a dog ran", "the cat sat down"];
//! let params = MatchParams::default().with_k(2).with_metric(Metric::Cosine);
//! let stop_words = StopWords::new(["the", "a"]);
//!
//! let results = find_matches(&["The cat sat!"], &corpus, Some(&stop_words), None, &params).unwrap();
//! let matches = results.get(0).unwrap();
//! assert_eq!(matches[0].text, "the cat sat");
//! assert_eq!(matches[1].text, "the cat sat down");
//! ```
//!
//! # Critical Nuances
//!
//! ## Lower is always better
//!
//! Every metric is a distance. Cosine similarity is reported as
//! $1 - \cos(a,b)$ so that sorting ascending works the same for all metrics.
//!
//! ## Positions, not values
//!
//! Queries and corpus entries may repeat. Results are keyed by query position
//! and each match carries its corpus position, so duplicates stay
//! addressable.
//!
//! ## Empty after normalization
//!
//! A string like `"!!!"` normalizes to nothing. As a query it is skipped (no
//! entry in the results); as a corpus entry it is never returned. Skipping is
//! not an error.
//!
//! ## Collisions
//!
//! With `dim` buckets, unrelated n-grams occasionally share a bucket. Signed
//! contributions make such collisions cancel as often as they reinforce, but
//! small `dim` still blurs distances. Distinct strings can even hash to the
//! same vector; ties are broken by corpus position.

pub mod chapters;
pub mod distance;
pub mod error;
pub mod hash;
pub mod index;
pub mod matcher;
pub mod ngram;
pub mod normalize;
pub mod params;
pub mod progress;
pub mod sparse;

mod parallel;

// Re-exports
pub use distance::Metric;
pub use error::{MatchError, Result};
pub use hash::{hash_features, FeatureHash, FeatureHasher, Xxh3Hash};
pub use index::{build_index, CorpusIndex};
pub use matcher::{find_matches, top_k, Match, MatchResults, MatchRow, Matcher, QueryMatches};
pub use ngram::ngrams;
pub use normalize::{normalize, Normalizer, StopWords, TranslationTable};
pub use params::MatchParams;
pub use progress::{CancelFlag, Progress, ProgressSink};
pub use sparse::SparseVector;
