//! Word n-gram extraction.
//!
//! Tokens are whitespace-separated words of a normalized string. For every
//! requested size `n` (ascending), every contiguous window of exactly `n`
//! tokens is emitted, joined by single spaces. The sequences for each size
//! are concatenated without deduplication.

use std::collections::BTreeSet;

use smallvec::SmallVec;

/// Token buffer; most sentences fit inline.
type Tokens<'a> = SmallVec<[&'a str; 32]>;

/// All word n-grams of `text` for the given sizes.
///
/// Sizes of zero produce nothing. Sizes larger than the token count produce
/// nothing for that size.
///
/// ```rust
/// use std::collections::BTreeSet;
/// use hashmatch::ngram::ngrams;
///
/// let sizes: BTreeSet<usize> = [1, 2].into();
/// assert_eq!(
///     ngrams("the cat sat", &sizes),
///     vec!["the", "cat", "sat", "the cat", "cat sat"],
/// );
/// ```
pub fn ngrams(text: &str, sizes: &BTreeSet<usize>) -> Vec<String> {
    let mut out = Vec::new();
    for_each_ngram(text, sizes, |gram| out.push(gram.to_owned()));
    out
}

/// Number of n-grams [`ngrams`] would return, without building them.
pub fn ngram_count(text: &str, sizes: &BTreeSet<usize>) -> usize {
    let tokens = text.split_whitespace().count();
    sizes
        .iter()
        .filter(|&&n| n > 0 && n <= tokens)
        .map(|&n| tokens - n + 1)
        .sum()
}

/// Visit every n-gram of `text` in [`ngrams`] order, reusing one buffer.
pub(crate) fn for_each_ngram<F>(text: &str, sizes: &BTreeSet<usize>, mut visit: F)
where
    F: FnMut(&str),
{
    let tokens: Tokens<'_> = text.split_whitespace().collect();
    let mut gram = String::new();

    for &n in sizes {
        if n == 0 || n > tokens.len() {
            continue;
        }
        for window in tokens.windows(n) {
            gram.clear();
            for (i, token) in window.iter().enumerate() {
                if i > 0 {
                    gram.push(' ');
                }
                gram.push_str(token);
            }
            visit(&gram);
        }
    }
}
