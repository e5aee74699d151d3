//! Language registry: supported locales and their text analysis rules.
//!
//! The registry is the single authority on which language tags a document
//! may carry. It is built once per process and never mutated afterwards.
//!
//! # Analysis pipeline
//!
//! 1. **Fold**: lowercase, NFD-decompose, drop combining marks that sit on
//!    Latin, Greek or Cyrillic letters, NFC-recompose. `"Crème"` and
//!    `"creme"` fold identically. Marks on other scripts (Tamil, Devanagari,
//!    Arabic) are part of the letter and are kept.
//! 2. **Tokenize**: split the folded text on anything that is neither
//!    alphanumeric nor a combining mark.
//! 3. **Stop**: drop the locale's stopwords (matched after folding).
//! 4. **Stem**: apply the locale's Snowball stemmer. Locales without a
//!    Snowball algorithm (Indonesian, Irish, Lithuanian, Nepali) use the
//!    identity stemmer.
//!
//! # Accepted tags
//!
//! Case-insensitive ISO 639-1 codes (`de`), codes with a region subtag
//! (`pt-BR`, `en_GB`), or English names (`french`).

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use rust_stemmers::{Algorithm, Stemmer};
use serde::{Deserialize, Serialize};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::error::{Result, StoreError};
use crate::stopwords;

/// Every locale the store accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Arabic,
    Danish,
    Dutch,
    English,
    Finnish,
    French,
    German,
    Greek,
    Hungarian,
    Indonesian,
    Irish,
    Italian,
    Lithuanian,
    Nepali,
    Norwegian,
    Portuguese,
    Romanian,
    Russian,
    Spanish,
    Swedish,
    Tamil,
    Turkish,
}

impl Language {
    pub const ALL: [Language; 22] = [
        Language::Arabic,
        Language::Danish,
        Language::Dutch,
        Language::English,
        Language::Finnish,
        Language::French,
        Language::German,
        Language::Greek,
        Language::Hungarian,
        Language::Indonesian,
        Language::Irish,
        Language::Italian,
        Language::Lithuanian,
        Language::Nepali,
        Language::Norwegian,
        Language::Portuguese,
        Language::Romanian,
        Language::Russian,
        Language::Spanish,
        Language::Swedish,
        Language::Tamil,
        Language::Turkish,
    ];

    /// ISO 639-1 code.
    pub fn code(self) -> &'static str {
        match self {
            Language::Arabic => "ar",
            Language::Danish => "da",
            Language::Dutch => "nl",
            Language::English => "en",
            Language::Finnish => "fi",
            Language::French => "fr",
            Language::German => "de",
            Language::Greek => "el",
            Language::Hungarian => "hu",
            Language::Indonesian => "id",
            Language::Irish => "ga",
            Language::Italian => "it",
            Language::Lithuanian => "lt",
            Language::Nepali => "ne",
            Language::Norwegian => "no",
            Language::Portuguese => "pt",
            Language::Romanian => "ro",
            Language::Russian => "ru",
            Language::Spanish => "es",
            Language::Swedish => "sv",
            Language::Tamil => "ta",
            Language::Turkish => "tr",
        }
    }

    /// Lowercase English name, as used by full-text search configurations.
    pub fn name(self) -> &'static str {
        match self {
            Language::Arabic => "arabic",
            Language::Danish => "danish",
            Language::Dutch => "dutch",
            Language::English => "english",
            Language::Finnish => "finnish",
            Language::French => "french",
            Language::German => "german",
            Language::Greek => "greek",
            Language::Hungarian => "hungarian",
            Language::Indonesian => "indonesian",
            Language::Irish => "irish",
            Language::Italian => "italian",
            Language::Lithuanian => "lithuanian",
            Language::Nepali => "nepali",
            Language::Norwegian => "norwegian",
            Language::Portuguese => "portuguese",
            Language::Romanian => "romanian",
            Language::Russian => "russian",
            Language::Spanish => "spanish",
            Language::Swedish => "swedish",
            Language::Tamil => "tamil",
            Language::Turkish => "turkish",
        }
    }

    fn algorithm(self) -> Option<Algorithm> {
        match self {
            Language::Arabic => Some(Algorithm::Arabic),
            Language::Danish => Some(Algorithm::Danish),
            Language::Dutch => Some(Algorithm::Dutch),
            Language::English => Some(Algorithm::English),
            Language::Finnish => Some(Algorithm::Finnish),
            Language::French => Some(Algorithm::French),
            Language::German => Some(Algorithm::German),
            Language::Greek => Some(Algorithm::Greek),
            Language::Hungarian => Some(Algorithm::Hungarian),
            Language::Italian => Some(Algorithm::Italian),
            Language::Norwegian => Some(Algorithm::Norwegian),
            Language::Portuguese => Some(Algorithm::Portuguese),
            Language::Romanian => Some(Algorithm::Romanian),
            Language::Russian => Some(Algorithm::Russian),
            Language::Spanish => Some(Algorithm::Spanish),
            Language::Swedish => Some(Algorithm::Swedish),
            Language::Tamil => Some(Algorithm::Tamil),
            Language::Turkish => Some(Algorithm::Turkish),
            Language::Indonesian | Language::Irish | Language::Lithuanian | Language::Nepali => {
                None
            }
        }
    }

    fn matches_tag(self, lowered: &str, primary: &str) -> bool {
        if primary == self.code() || lowered == self.name() {
            return true;
        }
        // Bokmål and Nynorsk share the Norwegian stemmer.
        self == Language::Norwegian && matches!(primary, "nb" | "nn")
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Language {
    type Err = StoreError;

    fn from_str(tag: &str) -> Result<Self> {
        let lowered = tag.trim().to_ascii_lowercase();
        let primary = lowered.split(['-', '_']).next().unwrap_or_default();
        if primary.is_empty() {
            return Err(StoreError::validation("language", "language tag is empty"));
        }
        Language::ALL
            .iter()
            .copied()
            .find(|lang| lang.matches_tag(&lowered, primary))
            .ok_or_else(|| {
                StoreError::validation("language", format!("unsupported language tag '{}'", tag))
            })
    }
}

/// Per-locale analysis rules.
struct LanguageProfile {
    language: Language,
    stemmer: Option<Stemmer>,
    /// Folded stopwords.
    stopwords: HashSet<String>,
}

/// Immutable table of supported locales.
pub struct LanguageRegistry {
    profiles: Vec<LanguageProfile>,
    default_language: Language,
}

static REGISTRY: OnceLock<LanguageRegistry> = OnceLock::new();

impl LanguageRegistry {
    /// The process-wide registry, populated on first use.
    pub fn global() -> &'static LanguageRegistry {
        REGISTRY.get_or_init(LanguageRegistry::build)
    }

    fn build() -> Self {
        let profiles = Language::ALL
            .iter()
            .map(|&language| LanguageProfile {
                language,
                stemmer: language.algorithm().map(Stemmer::create),
                stopwords: stopwords::for_language(language)
                    .iter()
                    .map(|word| fold(word))
                    .collect(),
            })
            .collect();
        Self {
            profiles,
            default_language: Language::English,
        }
    }

    pub fn is_supported(&self, tag: &str) -> bool {
        self.resolve(tag).is_ok()
    }

    /// Map a tag to a registered locale, or fail with a validation error
    /// on the `language` field.
    pub fn resolve(&self, tag: &str) -> Result<Language> {
        tag.parse()
    }

    /// Locale used for queries that carry no language hint.
    pub fn default_language(&self) -> Language {
        self.default_language
    }

    pub fn languages(&self) -> impl Iterator<Item = Language> + '_ {
        self.profiles.iter().map(|p| p.language)
    }

    /// Fold and split `text` into normalized (unstemmed) tokens.
    pub fn tokenize(&self, tag: &str, text: &str) -> Result<Vec<String>> {
        self.resolve(tag)?;
        Ok(tokenize_folded(&fold(text)))
    }

    /// Stem a single token with the rules of `tag`.
    pub fn stem(&self, tag: &str, token: &str) -> Result<String> {
        let language = self.resolve(tag)?;
        Ok(self.stem_with(language, token))
    }

    pub fn stem_with(&self, language: Language, token: &str) -> String {
        match self.profile(language).and_then(|p| p.stemmer.as_ref()) {
            Some(stemmer) => stemmer.stem(token).into_owned(),
            None => token.to_string(),
        }
    }

    /// Whether a folded token is a stopword of `language`.
    pub fn is_stopword(&self, language: Language, token: &str) -> bool {
        self.profile(language)
            .is_some_and(|p| p.stopwords.contains(token))
    }

    /// Index form of one folded token: `None` for stopwords and tokens that
    /// stem to nothing.
    pub fn index_term(&self, language: Language, token: &str) -> Option<String> {
        if self.is_stopword(language, token) {
            return None;
        }
        let stemmed = self.stem_with(language, token);
        (!stemmed.is_empty()).then_some(stemmed)
    }

    /// Full pipeline: fold, tokenize, drop stopwords, stem. Token order
    /// follows the text.
    pub fn analyze(&self, language: Language, text: &str) -> Vec<String> {
        tokenize_folded(&fold(text))
            .into_iter()
            .filter_map(|token| self.index_term(language, &token))
            .collect()
    }

    fn profile(&self, language: Language) -> Option<&LanguageProfile> {
        self.profiles.iter().find(|p| p.language == language)
    }
}

/// Lowercase and strip accents from Latin, Greek and Cyrillic letters.
pub fn fold(text: &str) -> String {
    let mut stripped = String::with_capacity(text.len());
    let mut base_foldable = false;
    for c in text.to_lowercase().nfd() {
        if is_combining_mark(c) {
            if base_foldable {
                continue;
            }
        } else {
            // Latin, Greek and Cyrillic blocks all sit below Armenian.
            base_foldable = (c as u32) < 0x0530;
        }
        stripped.push(c);
    }
    stripped.nfc().collect()
}

fn is_token_char(c: char) -> bool {
    c.is_alphanumeric() || is_combining_mark(c)
}

/// Split already-folded text into word tokens.
pub fn tokenize_folded(folded: &str) -> Vec<String> {
    folded
        .split(|c: char| !is_token_char(c))
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}
