//! TOML configuration for the `dstore` binary.
//!
//! Only `[db]` is required. `[chunking]`, `[search]` and `[logging]` fall
//! back to their defaults when omitted.
//!
//! ```toml
//! [db]
//! path = "./data/dstore.sqlite"
//!
//! [search]
//! default_language = "en"
//! fuzzy_threshold = 0.3
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use doc_store_core::lang::LanguageRegistry;
use doc_store_core::search::{DEFAULT_FUZZY_THRESHOLD, DEFAULT_LIMIT, MAX_LIMIT};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
        }
    }
}

fn default_max_tokens() -> usize {
    700
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    #[serde(default = "default_language")]
    pub default_language: String,
    #[serde(default = "default_fuzzy_threshold")]
    pub fuzzy_threshold: f64,
    #[serde(default = "default_limit")]
    pub default_limit: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_language: default_language(),
            fuzzy_threshold: default_fuzzy_threshold(),
            default_limit: default_limit(),
        }
    }
}

fn default_language() -> String {
    "en".to_string()
}
fn default_fuzzy_threshold() -> f64 {
    DEFAULT_FUZZY_THRESHOLD
}
fn default_limit() -> usize {
    DEFAULT_LIMIT
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

fn default_level() -> String {
    "warn".to_string()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.chunking.max_tokens == 0 {
        anyhow::bail!("chunking.max_tokens must be > 0");
    }

    if !LanguageRegistry::global().is_supported(&config.search.default_language) {
        anyhow::bail!(
            "search.default_language '{}' is not a supported language",
            config.search.default_language
        );
    }

    if !(config.search.fuzzy_threshold > 0.0 && config.search.fuzzy_threshold <= 1.0) {
        anyhow::bail!("search.fuzzy_threshold must be in (0.0, 1.0]");
    }

    if !(1..=MAX_LIMIT).contains(&config.search.default_limit) {
        anyhow::bail!("search.default_limit must be in 1..={}", MAX_LIMIT);
    }

    Ok(())
}
