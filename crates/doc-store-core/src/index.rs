//! Search index maintenance: derive a document's search representation.
//!
//! [`derive`] is a pure function of `(title, content, language)`. Store
//! backends call it inside the same write that changes any of those three
//! fields and replace the previous representation wholesale.
//!
//! The representation has two parts:
//!
//! - **Weighted terms**: stemmed non-stopword tokens mapped to postings.
//!   Title tokens carry [`WeightClass::Title`], content tokens
//!   [`WeightClass::Content`]. Title positions run `0..t`, content
//!   positions start at `t + 1`. Stopwords occupy a position but get no
//!   posting.
//! - **Trigram signatures**: pg_trgm-style trigram sets over the folded
//!   title and content, for approximate matching that ignores stemming.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::lang::{fold, tokenize_folded, Language, LanguageRegistry};

/// Ranking class of a token occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightClass {
    Content,
    Title,
}

impl WeightClass {
    /// Integer weights keep any difference in exact score larger than the
    /// whole fuzzy range.
    pub fn weight(self) -> u32 {
        match self {
            WeightClass::Title => 4,
            WeightClass::Content => 1,
        }
    }
}

/// One occurrence of a term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub weight: WeightClass,
    pub position: u32,
}

/// Derived search representation of one document chunk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchRepr {
    pub language: Option<Language>,
    pub terms: BTreeMap<String, Vec<Posting>>,
    pub title_trigrams: BTreeSet<String>,
    pub content_trigrams: BTreeSet<String>,
}

/// Outcome of matching query terms against a representation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermMatch {
    /// Sum over matched query terms of their best weight class.
    pub score: u32,
    /// Earliest position of any matched posting.
    pub first_position: Option<u32>,
    pub matched: Vec<String>,
}

impl SearchRepr {
    /// Score `query_terms` (already stemmed, deduplicated) against the
    /// weighted term map.
    pub fn match_terms(&self, query_terms: &[String]) -> TermMatch {
        let mut score = 0;
        let mut first_position: Option<u32> = None;
        let mut matched = Vec::new();

        for term in query_terms {
            let Some(postings) = self.terms.get(term) else {
                continue;
            };
            if let Some(best) = postings.iter().map(|p| p.weight).max() {
                score += best.weight();
                matched.push(term.clone());
            }
            if let Some(pos) = postings.iter().map(|p| p.position).min() {
                first_position = Some(first_position.map_or(pos, |cur| cur.min(pos)));
            }
        }

        TermMatch {
            score,
            first_position,
            matched,
        }
    }

    /// Best trigram overlap of `query` against the title and content
    /// signatures, in `[0, 1]`.
    pub fn fuzzy_score(&self, query: &BTreeSet<String>) -> f64 {
        overlap(query, &self.title_trigrams).max(overlap(query, &self.content_trigrams))
    }

    pub fn term_count(&self) -> usize {
        self.terms.len()
    }
}

/// Build the representation for `(title, content, language_tag)`.
///
/// Fails with a validation error on `language` if the tag is not
/// registered.
pub fn derive(title: &str, content: &str, language_tag: &str) -> Result<SearchRepr> {
    let registry = LanguageRegistry::global();
    let language = registry.resolve(language_tag)?;
    Ok(derive_with(registry, language, title, content))
}

pub fn derive_with(
    registry: &LanguageRegistry,
    language: Language,
    title: &str,
    content: &str,
) -> SearchRepr {
    let folded_title = fold(title);
    let folded_content = fold(content);

    let mut terms: BTreeMap<String, Vec<Posting>> = BTreeMap::new();
    let mut position: u32 = 0;

    for (folded, weight) in [
        (&folded_title, WeightClass::Title),
        (&folded_content, WeightClass::Content),
    ] {
        for token in tokenize_folded(folded) {
            // Stopwords keep their position slot so phrase distances hold.
            if let Some(term) = registry.index_term(language, &token) {
                terms
                    .entry(term)
                    .or_default()
                    .push(Posting { weight, position });
            }
            position += 1;
        }
        // Gap so title and content positions never touch.
        position += 1;
    }

    SearchRepr {
        language: Some(language),
        terms,
        title_trigrams: trigrams_folded(&folded_title),
        content_trigrams: trigrams_folded(&folded_content),
    }
}

/// Trigram set of `text` after folding.
pub fn trigrams(text: &str) -> BTreeSet<String> {
    trigrams_folded(&fold(text))
}

/// pg_trgm convention: each alphanumeric word is padded with two leading
/// spaces and one trailing space before windows of 3 chars are taken.
fn trigrams_folded(folded: &str) -> BTreeSet<String> {
    let mut set = BTreeSet::new();
    for word in folded
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        let padded: Vec<char> = "  "
            .chars()
            .chain(word.chars())
            .chain(std::iter::once(' '))
            .collect();
        for window in padded.windows(3) {
            set.insert(window.iter().collect());
        }
    }
    set
}

/// Fraction of `query` trigrams present in `target`.
pub fn overlap(query: &BTreeSet<String>, target: &BTreeSet<String>) -> f64 {
    if query.is_empty() {
        return 0.0;
    }
    let shared = query.intersection(target).count();
    shared as f64 / query.len() as f64
}
