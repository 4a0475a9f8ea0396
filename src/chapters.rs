//! Cross-chapter near-duplicate search.
//!
//! Each chapter's sentences are matched against the sentences of every other
//! chapter. The corpus for chapter `i` is the concatenation, in chapter order,
//! of all chapters except `i`, so a sentence is never matched against its own
//! chapter. For each chapter the queries whose closest match scores lowest
//! are kept as highlights.
//!
//! Normalization happens once for the whole book; each chapter still gets a
//! freshly built index.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::hash::FeatureHash;
use crate::matcher::Matcher;

/// A named, ordered group of sentences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    pub name: String,
    pub sentences: Vec<String>,
}

impl Chapter {
    pub fn new<I, S>(name: impl Into<String>, sentences: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            sentences: sentences.into_iter().map(Into::into).collect(),
        }
    }
}

/// A match located in its source chapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChapterMatch {
    /// Index of the chapter the matched sentence belongs to.
    pub chapter: usize,
    /// Position of the matched sentence within that chapter.
    pub sentence: usize,
    pub text: String,
    pub score: f32,
}

/// A query sentence and its matches in other chapters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Highlight {
    /// Position of the query sentence within its chapter.
    pub sentence: usize,
    pub text: String,
    /// Ascending by score; never empty.
    pub matches: Vec<ChapterMatch>,
}

impl Highlight {
    pub fn best_score(&self) -> f32 {
        self.matches.first().map_or(f32::INFINITY, |m| m.score)
    }
}

/// The best highlights found for one chapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChapterHighlights {
    pub chapter: usize,
    pub name: String,
    /// Ascending by best match score, ties by sentence position.
    pub highlights: Vec<Highlight>,
}

/// Match every chapter against all the others and keep, per chapter, the
/// `per_chapter` sentences with the closest outside match.
///
/// Sentences that normalize to empty, and sentences with no eligible match,
/// are never highlighted. A chapter with nothing to highlight still gets an
/// entry with an empty list.
pub fn cross_match<H: FeatureHash>(
    chapters: &[Chapter],
    matcher: &Matcher<H>,
    per_chapter: usize,
) -> Result<Vec<ChapterHighlights>> {
    let normalizer = matcher.normalizer();
    let normalized: Vec<Vec<String>> = chapters
        .iter()
        .map(|c| normalizer.normalize_all(&c.sentences))
        .collect();

    let mut out = Vec::with_capacity(chapters.len());
    for (current, chapter) in chapters.iter().enumerate() {
        let mut raw_corpus: Vec<&str> = Vec::new();
        let mut normalized_corpus: Vec<&str> = Vec::new();
        let mut origin: Vec<(usize, usize)> = Vec::new();
        for (other, other_chapter) in chapters.iter().enumerate() {
            if other == current {
                continue;
            }
            for (sentence, (raw, norm)) in other_chapter
                .sentences
                .iter()
                .zip(&normalized[other])
                .enumerate()
            {
                raw_corpus.push(raw);
                normalized_corpus.push(norm);
                origin.push((other, sentence));
            }
        }

        let index = matcher.build_index(&normalized_corpus)?;
        let results =
            matcher.match_normalized(&chapter.sentences, &normalized[current], &raw_corpus, &index)?;

        let mut highlights: Vec<Highlight> = results
            .into_iter()
            .filter(|q| !q.matches.is_empty())
            .map(|q| Highlight {
                sentence: q.query_position,
                text: q.query,
                matches: q
                    .matches
                    .into_iter()
                    .map(|m| {
                        let (chapter, sentence) = origin[m.corpus_position];
                        ChapterMatch {
                            chapter,
                            sentence,
                            text: m.text,
                            score: m.score,
                        }
                    })
                    .collect(),
            })
            .collect();
        // Stable: equal scores keep sentence order.
        highlights.sort_by(|a, b| a.best_score().total_cmp(&b.best_score()));
        highlights.truncate(per_chapter);

        debug!(
            chapter = %chapter.name,
            sentences = chapter.sentences.len(),
            corpus = raw_corpus.len(),
            highlights = highlights.len(),
            "Cross-matched chapter"
        );
        out.push(ChapterHighlights {
            chapter: current,
            name: chapter.name.clone(),
            highlights,
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MatchParams, Metric, Normalizer};

    fn matcher(k: usize) -> Matcher {
        Matcher::new(
            MatchParams::default()
                .with_k(k)
                .with_ngram_sizes(1..=4)
                .with_metric(Metric::Euclidean),
            Normalizer::new(),
        )
        .unwrap()
    }

    fn book() -> Vec<Chapter> {
        vec![
            Chapter::new(
                "chapter_1",
                [
                    "It is a truth universally acknowledged.",
                    "Mr. Bennet was among the earliest.",
                    "!!!",
                ],
            ),
            Chapter::new(
                "chapter_2",
                ["The weather was fine.", "It is a truth universally acknowledged!"],
            ),
            Chapter::new(
                "chapter_3",
                ["Mr Bennet was among the earliest", "Nothing else happened."],
            ),
        ]
    }

    #[test]
    fn never_matches_within_the_same_chapter() {
        let out = cross_match(&book(), &matcher(5), 10).unwrap();
        assert_eq!(out.len(), 3);
        for ch in &out {
            for h in &ch.highlights {
                assert!(h.matches.iter().all(|m| m.chapter != ch.chapter));
            }
        }
    }

    #[test]
    fn exact_paraphrases_are_top_highlights_with_origin() {
        let out = cross_match(&book(), &matcher(1), 2).unwrap();

        let first = &out[0];
        assert_eq!(first.name, "chapter_1");
        assert_eq!(first.highlights.len(), 2);
        // Both chapter 1 sentences have exact copies elsewhere; ties keep order.
        assert_eq!(first.highlights[0].sentence, 0);
        assert_eq!(first.highlights[0].matches[0].chapter, 1);
        assert_eq!(first.highlights[0].matches[0].sentence, 1);
        assert_eq!(first.highlights[0].best_score(), 0.0);
        assert_eq!(first.highlights[1].sentence, 1);
        assert_eq!(first.highlights[1].matches[0].chapter, 2);
        assert_eq!(first.highlights[1].matches[0].sentence, 0);

        let second = &out[1];
        assert_eq!(second.highlights[0].text, "It is a truth universally acknowledged!");
        assert_eq!(second.highlights[0].matches[0].text, "It is a truth universally acknowledged.");
    }

    #[test]
    fn per_chapter_limit_and_empty_sentences() {
        let out = cross_match(&book(), &matcher(1), 1).unwrap();
        assert!(out.iter().all(|c| c.highlights.len() <= 1));
        // The "!!!" sentence of chapter 1 is never highlighted.
        let all = cross_match(&book(), &matcher(1), 10).unwrap();
        assert!(all[0].highlights.iter().all(|h| h.sentence != 2));
    }

    #[test]
    fn single_chapter_has_no_highlights() {
        let out = cross_match(&book()[..1], &matcher(1), 2).unwrap();
        assert_eq!(out.len(), 1);
        assert!(out[0].highlights.is_empty());
    }
}
