//! Word vocabulary derived from every exemplar phrase, used for spelling correction.

use crate::taxonomy::Taxonomy;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;
use unicode_normalization::UnicodeNormalization;

/// Word-boundary tokens: runs of word characters
static WORD_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\w+\b").unwrap());

/// Case-folded word tokens of `text`, in order of appearance
pub fn tokenize(text: &str) -> Vec<String> {
    let normalized: String = text.nfkc().collect::<String>().to_lowercase();
    WORD_REGEX
        .find_iter(&normalized)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Distinct lowercase words of all exemplar phrases. Built once, read-only.
///
/// Iteration is lexicographic, which also fixes the tie-break order used by
/// the spelling corrector.
#[derive(Debug, Clone, Default)]
pub struct Vocabulary {
    words: BTreeSet<String>,
}

impl Vocabulary {
    pub fn build<'a>(taxonomies: impl IntoIterator<Item = &'a Taxonomy>) -> Self {
        let mut words = BTreeSet::new();
        for taxonomy in taxonomies {
            for (_, phrase) in taxonomy.exemplars() {
                words.extend(tokenize(phrase));
            }
        }
        tracing::debug!("Vocabulary built with {} words", words.len());
        Self { words }
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(word)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.words.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

/// `build_vocabulary(taxonomies)` in free-function form
pub fn build_vocabulary<'a>(taxonomies: impl IntoIterator<Item = &'a Taxonomy>) -> Vocabulary {
    Vocabulary::build(taxonomies)
}
