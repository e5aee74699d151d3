//! `dstore search`: ranked retrieval with config-provided defaults.
//!
//! Ranking itself lives in [`doc_store_core::search`]; this module fills in
//! the language, limit and fuzzy threshold from `[search]` and prints hits.

use anyhow::Result;
use uuid::Uuid;

use doc_store_core::models::{Metadata, OwnerRef};
use doc_store_core::search::{search, SearchHit, SearchParams, SearchRequest};
use doc_store_core::store::Store;

use crate::config::Config;
use crate::db;

const EXCERPT_CHARS: usize = 240;

/// Command-line search options before config defaults are applied.
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    pub language: Option<String>,
    pub owners: Vec<OwnerRef>,
    pub metadata: Option<Metadata>,
    pub limit: Option<usize>,
    pub explain: bool,
}

pub async fn search_documents<S: Store + ?Sized>(
    store: &S,
    config: &Config,
    developer_id: Uuid,
    query: &str,
    opts: &SearchOptions,
) -> Result<Vec<SearchHit>> {
    let language = opts
        .language
        .as_deref()
        .unwrap_or(&config.search.default_language);
    let req = SearchRequest {
        developer_id,
        query,
        language: Some(language),
        owners: &opts.owners,
        metadata_filter: opts.metadata.as_ref(),
        params: SearchParams {
            limit: opts.limit.unwrap_or(config.search.default_limit),
            fuzzy_threshold: config.search.fuzzy_threshold,
        },
        explain: opts.explain,
    };
    Ok(search(store, &req).await?)
}

pub async fn run_search(
    config: &Config,
    developer_id: Uuid,
    query: &str,
    opts: &SearchOptions,
) -> Result<()> {
    let store = db::open_store(config).await?;
    let hits = search_documents(&store, config, developer_id, query, opts).await?;
    store.pool().close().await;

    if hits.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, hit) in hits.iter().enumerate() {
        let title = if hit.title.is_empty() {
            "(untitled)"
        } else {
            hit.title.as_str()
        };
        println!("{}. [{:.2}] {}", i + 1, hit.score, title);
        if let Some(best) = hit.snippets.first() {
            let excerpt: String = best.content.chars().take(EXCERPT_CHARS).collect();
            println!("    chunk: {}", best.index);
            println!("    excerpt: \"{}\"", excerpt.replace('\n', " ").trim());
        }
        if hit.snippets.len() > 1 {
            let more: Vec<String> = hit.snippets[1..]
                .iter()
                .map(|s| s.index.to_string())
                .collect();
            println!("    also in chunks: {}", more.join(", "));
        }
        if !hit.owners.is_empty() {
            let owners: Vec<String> = hit.owners.iter().map(|o| o.to_string()).collect();
            println!("    owners: {}", owners.join(", "));
        }
        if let Some(ref explain) = hit.explain {
            println!(
                "    exact: {}  fuzzy: {:.2}  terms: {}",
                explain.exact_score,
                explain.fuzzy_score,
                explain.matched_terms.join(", ")
            );
        }
        println!("    id: {}", hit.doc_id);
        println!();
    }
    Ok(())
}
