//! Fuzzy spelling correction against the exemplar vocabulary.

use crate::vocabulary::Vocabulary;
use strsim::normalized_damerau_levenshtein;
use unicode_normalization::UnicodeNormalization;

/// Replacement happens only when the best match scores above this (0-100 scale)
pub const DEFAULT_CORRECTION_CUTOFF: u8 = 80;

/// Lowercase and strip everything that is not alphanumeric
fn preprocess(s: &str) -> String {
    s.nfkc()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Edit-distance similarity on a 0-100 scale. Empty input scores 0.
pub fn fuzzy_score(a: &str, b: &str) -> u8 {
    let a = preprocess(a);
    let b = preprocess(b);
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    (normalized_damerau_levenshtein(&a, &b) * 100.0).round() as u8
}

/// Best vocabulary word for `token` with its score. Ties keep the first
/// candidate in vocabulary order.
pub fn best_match<'v>(token: &str, vocabulary: &'v Vocabulary) -> Option<(&'v str, u8)> {
    let mut best: Option<(&str, u8)> = None;
    for word in vocabulary.iter() {
        let score = fuzzy_score(token, word);
        if best.is_none_or(|(_, s)| score > s) {
            best = Some((word, score));
            if score == 100 {
                break;
            }
        }
    }
    best
}

/// Spelling corrector bound to a shared vocabulary
#[derive(Debug, Clone, Copy)]
pub struct SpellingCorrector<'v> {
    vocabulary: &'v Vocabulary,
    cutoff: u8,
}

impl<'v> SpellingCorrector<'v> {
    pub fn new(vocabulary: &'v Vocabulary) -> Self {
        Self {
            vocabulary,
            cutoff: DEFAULT_CORRECTION_CUTOFF,
        }
    }

    pub fn with_cutoff(mut self, cutoff: u8) -> Self {
        self.cutoff = cutoff.min(100);
        self
    }

    /// Replace each whitespace token by its closest vocabulary word when that
    /// word scores above the cutoff; join with single spaces.
    pub fn correct(&self, text: &str) -> String {
        text.split_whitespace()
            .map(|token| match best_match(token, self.vocabulary) {
                Some((word, score)) if score > self.cutoff => word,
                _ => token,
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// `correct(text, vocabulary)` with the default cutoff
pub fn correct(text: &str, vocabulary: &Vocabulary) -> String {
    SpellingCorrector::new(vocabulary).correct(text)
}
