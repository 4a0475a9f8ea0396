//! Property-based tests for the matching pipeline.
//!
//! These tests verify invariants that should hold regardless of input:
//! - Normalization is idempotent and yields plain single-spaced words
//! - Hashed vectors stay inside their dimension and are deterministic
//! - Distances are non-negative, symmetric, and zero on identical inputs
//! - Top-k results are bounded, sorted, and tie-broken by position

use std::collections::BTreeSet;

use hashmatch::{
    build_index, hash_features, ngrams, normalize, top_k, Metric, SparseVector, StopWords,
    TranslationTable,
};
use proptest::prelude::*;

fn sizes() -> BTreeSet<usize> {
    [1, 2].into()
}

prop_compose! {
    /// Short sentences over a small vocabulary so that overlaps are common.
    fn arb_sentence()(words in prop::collection::vec(
        prop::sample::select(vec!["the", "cat", "sat", "dog", "ran", "on", "a", "mat", "Mr.", "Bennet!"]),
        0..8,
    )) -> String {
        words.join(" ")
    }
}

prop_compose! {
    fn arb_vector(dim: u32)(pairs in prop::collection::vec((0..dim, -5i32..5), 0..40)) -> SparseVector {
        SparseVector::from_contributions(dim, pairs).unwrap()
    }
}

mod normalize_props {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn idempotent(text in ".{0,60}") {
            let once = normalize(&text, None, None);
            let twice = normalize(&once, None, None);
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn idempotent_with_stop_words_and_translations(
            text in arb_sentence(),
            stops in prop::collection::vec(prop::sample::select(vec!["the", "a", "on", "dog", "mr"]), 0..4),
            to in prop::sample::select(vec!["feline", "big feline", "house  kitten"]),
        ) {
            // Targets are neither keys nor stop words, as with synonym groups.
            let stop_words = StopWords::new(stops);
            let table: TranslationTable = [("cat", to), ("mat", "rug")].into_iter().collect();
            let once = normalize(&text, Some(&stop_words), Some(&table));
            let twice = normalize(&once, Some(&stop_words), Some(&table));
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn output_is_single_spaced_ascii(text in ".{0,60}") {
            let out = normalize(&text, None, None);
            prop_assert!(!out.starts_with(' ') && !out.ends_with(' '));
            prop_assert!(!out.contains("  "));
            prop_assert!(out.chars().all(|c| c == ' ' || c.is_ascii_lowercase() || c.is_ascii_digit()));
        }
    }
}

mod ngram_props {
    use super::*;

    proptest! {
        #[test]
        fn count_matches_word_count(text in arb_sentence(), n in 1usize..5) {
            let normalized = normalize(&text, None, None);
            let words = normalized.split_whitespace().count();
            let grams = ngrams(&normalized, &[n].into());
            prop_assert_eq!(grams.len(), (words + 1).saturating_sub(n));
            for g in &grams {
                prop_assert_eq!(g.split(' ').count(), n);
            }
        }
    }
}

mod hashing_props {
    use super::*;

    proptest! {
        #[test]
        fn indices_sorted_and_in_range(text in arb_sentence(), dim in 1u32..5000) {
            let normalized = normalize(&text, None, None);
            let v = hash_features(&normalized, &sizes(), dim).unwrap();
            prop_assert_eq!(v.dim(), dim);
            prop_assert!(v.indices().windows(2).all(|w| w[0] < w[1]));
            prop_assert!(v.indices().iter().all(|&i| i < dim));
            prop_assert!(v.values().iter().all(|&x| x != 0));
        }

        #[test]
        fn deterministic(text in arb_sentence()) {
            let normalized = normalize(&text, None, None);
            let a = hash_features(&normalized, &sizes(), 1 << 16).unwrap();
            let b = hash_features(&normalized, &sizes(), 1 << 16).unwrap();
            prop_assert_eq!(a, b);
        }

        #[test]
        fn empty_text_is_zero_vector(dim in 1u32..100) {
            prop_assert!(hash_features("", &sizes(), dim).unwrap().is_zero());
        }
    }
}

mod distance_props {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn non_negative_and_symmetric(a in arb_vector(64), b in arb_vector(64)) {
            for metric in Metric::ALL {
                let d_ab = metric.distance(&a, &b);
                let d_ba = metric.distance(&b, &a);
                prop_assert!(d_ab >= 0.0, "{} gave {}", metric, d_ab);
                prop_assert_eq!(d_ab, d_ba);
            }
        }

        #[test]
        fn identical_vectors_score_zero(a in arb_vector(64)) {
            prop_assume!(!a.is_zero());
            for metric in Metric::ALL {
                prop_assert_eq!(metric.distance(&a, &a), 0.0);
            }
        }

        #[test]
        fn cosine_bounded(a in arb_vector(64), b in arb_vector(64)) {
            let d = Metric::Cosine.distance(&a, &b);
            prop_assert!((0.0..=2.0).contains(&d), "cosine distance {}", d);
        }

        #[test]
        fn euclidean_triangle_inequality(
            a in arb_vector(32),
            b in arb_vector(32),
            c in arb_vector(32),
        ) {
            let ab = Metric::Euclidean.distance(&a, &b);
            let bc = Metric::Euclidean.distance(&b, &c);
            let ac = Metric::Euclidean.distance(&a, &c);
            prop_assert!(ac <= ab + bc + 1e-3);
        }
    }
}

mod top_k_props {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn bounded_sorted_and_eligible_only(
            corpus in prop::collection::vec(arb_sentence(), 0..30),
            query in arb_sentence(),
            k in 1usize..10,
        ) {
            let normalized: Vec<String> = corpus.iter().map(|s| normalize(s, None, None)).collect();
            let eligible = normalized.iter().filter(|s| !s.is_empty()).count();
            let index = build_index(&normalized, &sizes(), 1 << 12).unwrap();
            let q = hash_features(&normalize(&query, None, None), &sizes(), 1 << 12).unwrap();

            for metric in Metric::ALL {
                let found = top_k(&q, &index, k, metric).unwrap();
                prop_assert_eq!(found.len(), k.min(eligible));
                prop_assert!(found.iter().all(|&(p, _)| !normalized[p].is_empty()));
                // Ascending by score, ties by position.
                let ordered = found
                    .windows(2)
                    .all(|w| w[0].1 < w[1].1 || (w[0].1 == w[1].1 && w[0].0 < w[1].0));
                prop_assert!(ordered, "{} not ordered: {:?}", metric, found);
            }
        }

        #[test]
        fn matches_exhaustive_sort(
            corpus in prop::collection::vec(arb_sentence(), 1..25),
            query in arb_sentence(),
            k in 1usize..6,
        ) {
            let normalized: Vec<String> = corpus.iter().map(|s| normalize(s, None, None)).collect();
            let index = build_index(&normalized, &sizes(), 1 << 12).unwrap();
            let q = hash_features(&normalize(&query, None, None), &sizes(), 1 << 12).unwrap();

            let mut expected: Vec<(usize, f32)> = index
                .eligible()
                .map(|(p, v)| (p, Metric::Manhattan.distance(&q, v)))
                .collect();
            expected.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
            expected.truncate(k);

            prop_assert_eq!(top_k(&q, &index, k, Metric::Manhattan).unwrap(), expected);
        }
    }
}
