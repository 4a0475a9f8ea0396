//! Text normalization applied to every query and corpus string.
//!
//! Normalization runs in a fixed order:
//!
//! 1. Lowercase, collapse whitespace runs to one space, trim.
//! 2. Drop every character that is not `a-z`, `0-9` or a space.
//! 3. Drop stop words (exact, whole-word).
//! 4. Replace words found in the translation table (exact, whole-word).
//!
//! The output is always single-space separated, so normalizing an already
//! normalized string returns it unchanged (as long as no translation target
//! is itself a key or a stop word).
//!
//! ```rust
//! use hashmatch::normalize::{Normalizer, StopWords, TranslationTable};
//!
//! let normalizer = Normalizer::new()
//!     .with_stop_words(StopWords::new(["the", "a"]))
//!     .with_translations(TranslationTable::from_synonym_groups([["feline", "cat", "kitty"]]));
//!
//! assert_eq!(normalizer.normalize("  The CAT,   sat!"), "feline sat");
//! ```

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

/// A set of words removed before n-gram extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StopWords(HashSet<String>);

impl StopWords {
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(words.into_iter().map(Into::into).collect())
    }

    #[inline]
    pub fn contains(&self, word: &str) -> bool {
        self.0.contains(word)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for StopWords {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter)
    }
}

/// Exact whole-word substitutions applied after stop-word removal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TranslationTable(HashMap<String, String>);

impl TranslationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from synonym groups.
    ///
    /// The first word of each group is the canonical form; every other word
    /// in the group maps to it. A variant listed in several groups maps to the
    /// canonical form of the last one. Empty groups are ignored.
    pub fn from_synonym_groups<G, I, S>(groups: G) -> Self
    where
        G: IntoIterator<Item = I>,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut table = HashMap::new();
        for group in groups {
            let mut words = group.into_iter().map(Into::into);
            let Some(canonical) = words.next() else {
                continue;
            };
            for variant in words {
                table.insert(variant, canonical.clone());
            }
        }
        Self(table)
    }

    /// Map `from` to `to`, returning the previous target if any.
    pub fn insert(&mut self, from: impl Into<String>, to: impl Into<String>) -> Option<String> {
        self.0.insert(from.into(), to.into())
    }

    #[inline]
    pub fn get(&self, word: &str) -> Option<&str> {
        self.0.get(word).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for TranslationTable {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Normalize one string.
///
/// Absent stop words or translation table skip the corresponding step. The
/// result may be empty.
///
/// Normalizing the output again returns it unchanged as long as no
/// translation target contains a table key or a stop word.
pub fn normalize(
    text: &str,
    stop_words: Option<&StopWords>,
    translations: Option<&TranslationTable>,
) -> String {
    let lowered = text.to_lowercase();

    // Characters are filtered per word, so `well-known` becomes `wellknown`.
    let mut cleaned = String::with_capacity(lowered.len());
    for (i, word) in lowered.split_whitespace().enumerate() {
        if i > 0 {
            cleaned.push(' ');
        }
        cleaned.extend(
            word.chars()
                .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit()),
        );
    }

    let mut out = String::with_capacity(cleaned.len());
    for word in cleaned.split_whitespace() {
        if stop_words.is_some_and(|sw| sw.contains(word)) {
            continue;
        }
        let word = translations.and_then(|t| t.get(word)).unwrap_or(word);
        // A translation target may contain several words or stray spacing.
        for part in word.split_whitespace() {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(part);
        }
    }
    out
}

/// Owned normalization settings shared by queries and corpus.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Normalizer {
    #[serde(default)]
    stop_words: Option<StopWords>,
    #[serde(default)]
    translations: Option<TranslationTable>,
}

impl Normalizer {
    /// A normalizer without stop words or translations.
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_stop_words(mut self, stop_words: StopWords) -> Self {
        self.stop_words = Some(stop_words);
        self
    }

    #[must_use]
    pub fn with_translations(mut self, translations: TranslationTable) -> Self {
        self.translations = Some(translations);
        self
    }

    pub fn stop_words(&self) -> Option<&StopWords> {
        self.stop_words.as_ref()
    }

    pub fn translations(&self) -> Option<&TranslationTable> {
        self.translations.as_ref()
    }

    #[inline]
    pub fn normalize(&self, text: &str) -> String {
        normalize(text, self.stop_words.as_ref(), self.translations.as_ref())
    }

    /// Normalize a batch, preserving positions.
    pub fn normalize_all<S: AsRef<str>>(&self, texts: &[S]) -> Vec<String> {
        texts.iter().map(|t| self.normalize(t.as_ref())).collect()
    }
}
