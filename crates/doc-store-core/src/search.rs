//! Query engine: ranked keyword + fuzzy retrieval over a [`Store`].
//!
//! The engine is stateless. It reads the last-committed indexed chunks for
//! the caller's scope and scores them in memory.
//!
//! # Scoring
//!
//! 1. Analyze the query with the hinted language (or the registry default):
//!    fold, tokenize, stem, deduplicate.
//! 2. **Exact score**: for each query term found in a chunk's weighted term
//!    map, add the best weight class among its postings. Title matches
//!    outweigh content matches.
//! 3. **Fuzzy score**: share of the query's trigrams found in the chunk's
//!    title or content signature (the better of the two).
//!    Queries with fewer than [`MIN_FUZZY_TRIGRAMS`] trigrams (one- and
//!    two-letter words) score 0 here and can only match exactly.
//! 4. A chunk is a candidate when exact > 0 or fuzzy >= `fuzzy_threshold`.
//! 5. Group chunks by document. The best chunk (MAX aggregation on the sort
//!    key) ranks the document; every candidate chunk becomes a snippet.
//! 6. Sort by exact desc, fuzzy desc, earliest match position asc,
//!    updated_at desc, doc_id asc. Truncate to `limit`.
//! 7. With an owner filter, attach the filter owners each hit is linked to.
//!
//! The reported score is `exact + fuzzy / 2`. Exact scores are integers, so
//! the fuzzy half-point can never lift a document past one with a higher
//! exact score.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::index;
use crate::lang::LanguageRegistry;
use crate::models::{Document, Metadata, OwnerRef};
use crate::store::{IndexedChunk, Scope, Store};

pub const DEFAULT_LIMIT: usize = 10;
pub const MAX_LIMIT: usize = 100;
/// pg_trgm's default similarity threshold.
pub const DEFAULT_FUZZY_THRESHOLD: f64 = 0.3;
/// A single word of three characters pads out to four trigrams.
pub const MIN_FUZZY_TRIGRAMS: usize = 4;

/// Retrieval tuning parameters, decoupled from application config.
#[derive(Debug, Clone)]
pub struct SearchParams {
    /// Maximum documents to return, `1..=100`.
    pub limit: usize,
    /// Minimum trigram overlap for a fuzzy-only match.
    pub fuzzy_threshold: f64,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
        }
    }
}

/// Bundles all inputs for a single search invocation.
#[derive(Debug, Clone)]
pub struct SearchRequest<'a> {
    pub developer_id: Uuid,
    pub query: &'a str,
    /// Language used to analyze the query. Falls back to the registry
    /// default.
    pub language: Option<&'a str>,
    /// Restrict to documents linked to any of these owners.
    pub owners: &'a [OwnerRef],
    /// Every key must equal the document's metadata value.
    pub metadata_filter: Option<&'a Metadata>,
    pub params: SearchParams,
    /// If true, populate [`ScoreExplanation`] on each hit.
    pub explain: bool,
}

impl<'a> SearchRequest<'a> {
    pub fn new(developer_id: Uuid, query: &'a str) -> Self {
        Self {
            developer_id,
            query,
            language: None,
            owners: &[],
            metadata_filter: None,
            params: SearchParams::default(),
            explain: false,
        }
    }
}

/// One ranked document.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub doc_id: Uuid,
    pub score: f64,
    pub title: String,
    /// Matching chunks, best first. Never empty.
    pub snippets: Vec<Snippet>,
    /// Owners from the request filter that this document is linked to.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub owners: Vec<OwnerRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explain: Option<ScoreExplanation>,
}

/// One matching chunk of a hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snippet {
    pub index: i64,
    pub content: String,
}

/// Scoring breakdown for a hit.
#[derive(Debug, Clone, Serialize)]
pub struct ScoreExplanation {
    pub exact_score: u32,
    pub fuzzy_score: f64,
    pub matched_terms: Vec<String>,
    pub language: String,
}

#[derive(Debug, Clone)]
struct ScoredChunk {
    exact: u32,
    fuzzy: f64,
    first_position: Option<u32>,
    matched: Vec<String>,
    doc: Document,
}

impl ScoredChunk {
    /// Descending relevance: `Ordering::Less` means `self` ranks first.
    fn rank_cmp(&self, other: &Self) -> Ordering {
        other
            .exact
            .cmp(&self.exact)
            .then(
                other
                    .fuzzy
                    .partial_cmp(&self.fuzzy)
                    .unwrap_or(Ordering::Equal),
            )
            .then(position_key(self.first_position).cmp(&position_key(other.first_position)))
            .then(other.doc.updated_at.cmp(&self.doc.updated_at))
            .then(self.doc.doc_id.cmp(&other.doc.doc_id))
            .then(self.doc.index.cmp(&other.doc.index))
    }

    fn score(&self) -> f64 {
        f64::from(self.exact) + self.fuzzy / 2.0
    }
}

fn position_key(pos: Option<u32>) -> u32 {
    pos.unwrap_or(u32::MAX)
}

/// Analyzed form of a query string.
#[derive(Debug, Clone)]
pub struct AnalyzedQuery {
    pub language: crate::lang::Language,
    pub terms: Vec<String>,
    pub trigrams: BTreeSet<String>,
}

/// Tokenize, stem and deduplicate `query`, and compute its trigrams.
pub fn analyze_query(query: &str, language: Option<&str>) -> Result<AnalyzedQuery> {
    let registry = LanguageRegistry::global();
    let language = match language {
        Some(tag) => registry.resolve(tag)?,
        None => registry.default_language(),
    };
    let mut seen = BTreeSet::new();
    let terms = registry
        .analyze(language, query)
        .into_iter()
        .filter(|t| seen.insert(t.clone()))
        .collect();
    Ok(AnalyzedQuery {
        language,
        terms,
        trigrams: index::trigrams(query),
    })
}

/// Run a ranked search against a [`Store`] backend.
///
/// An empty query or no matches yields an empty result, not an error.
pub async fn search<S: Store + ?Sized>(
    store: &S,
    req: &SearchRequest<'_>,
) -> Result<Vec<SearchHit>> {
    validate_params(&req.params)?;
    let analyzed = analyze_query(req.query, req.language)?;
    if analyzed.terms.is_empty() && analyzed.trigrams.len() < MIN_FUZZY_TRIGRAMS {
        return Ok(Vec::new());
    }

    let scope = Scope {
        developer_id: req.developer_id,
        owners: req.owners.to_vec(),
    };
    let candidates = store.candidates(&scope).await?;
    let candidate_count = candidates.len();

    let mut by_doc: HashMap<Uuid, Vec<ScoredChunk>> = HashMap::new();
    for chunk in candidates {
        if let Some(filter) = req.metadata_filter {
            if !metadata_matches(&chunk.doc.metadata, filter) {
                continue;
            }
        }
        let Some(scored) = score_chunk(chunk, &analyzed, req.params.fuzzy_threshold) else {
            continue;
        };
        by_doc.entry(scored.doc.doc_id).or_default().push(scored);
    }

    // (best chunk, remaining chunks in rank order) per document
    let mut ranked: Vec<(ScoredChunk, Vec<ScoredChunk>)> = by_doc
        .into_values()
        .filter_map(|mut chunks| {
            chunks.sort_by(ScoredChunk::rank_cmp);
            let mut chunks = chunks.into_iter();
            let best = chunks.next()?;
            Some((best, chunks.collect()))
        })
        .collect();
    ranked.sort_by(|a, b| a.0.rank_cmp(&b.0));
    ranked.truncate(req.params.limit);

    debug!(
        developer_id = %req.developer_id,
        candidates = candidate_count,
        hits = ranked.len(),
        "search complete"
    );

    let language = analyzed.language.to_string();
    let mut hits = Vec::with_capacity(ranked.len());
    for (best, rest) in ranked {
        let owners = if req.owners.is_empty() {
            Vec::new()
        } else {
            store
                .owners_of(req.developer_id, best.doc.doc_id)
                .await?
                .into_iter()
                .filter(|owner| req.owners.contains(owner))
                .collect()
        };
        hits.push(to_hit(best, rest, owners, req.explain, &language));
    }
    Ok(hits)
}

fn validate_params(params: &SearchParams) -> Result<()> {
    if params.limit == 0 || params.limit > MAX_LIMIT {
        return Err(StoreError::validation(
            "limit",
            format!("must be in 1..={}, got {}", MAX_LIMIT, params.limit),
        ));
    }
    if !(params.fuzzy_threshold > 0.0 && params.fuzzy_threshold <= 1.0) {
        return Err(StoreError::validation(
            "fuzzy_threshold",
            format!("must be in (0, 1], got {}", params.fuzzy_threshold),
        ));
    }
    Ok(())
}

fn score_chunk(chunk: IndexedChunk, query: &AnalyzedQuery, threshold: f64) -> Option<ScoredChunk> {
    let IndexedChunk { doc, repr } = chunk;
    let term_match = repr.match_terms(&query.terms);
    let fuzzy = if query.trigrams.len() >= MIN_FUZZY_TRIGRAMS {
        repr.fuzzy_score(&query.trigrams)
    } else {
        0.0
    };
    if term_match.score == 0 && fuzzy < threshold {
        return None;
    }
    Some(ScoredChunk {
        exact: term_match.score,
        fuzzy,
        first_position: term_match.first_position,
        matched: term_match.matched,
        doc,
    })
}

fn metadata_matches(metadata: &Metadata, filter: &Metadata) -> bool {
    filter
        .iter()
        .all(|(key, expected)| metadata.get(key) == Some(expected))
}

fn to_hit(
    best: ScoredChunk,
    rest: Vec<ScoredChunk>,
    owners: Vec<OwnerRef>,
    explain: bool,
    language: &str,
) -> SearchHit {
    let score = best.score();
    let doc_id = best.doc.doc_id;
    let title = best.doc.title.clone();
    let explanation = explain.then(|| ScoreExplanation {
        exact_score: best.exact,
        fuzzy_score: best.fuzzy,
        matched_terms: best.matched.clone(),
        language: language.to_string(),
    });
    let snippets = std::iter::once(best)
        .chain(rest)
        .map(|sc| Snippet {
            index: sc.doc.index,
            content: sc.doc.content,
        })
        .collect();
    SearchHit {
        doc_id,
        score,
        title,
        snippets,
        owners,
        explain: explanation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DocumentPatch, Modality, NewDocument};
    use crate::store::memory::InMemoryStore;

    fn new_doc(developer_id: Uuid, title: &str, content: &str) -> NewDocument {
        NewDocument {
            developer_id,
            doc_id: None,
            index: 0,
            title: title.to_string(),
            content: content.to_string(),
            modality: Modality::Text,
            embedding_model: "voyage-3".to_string(),
            embedding_dimensions: 1024,
            language: "en".to_string(),
            metadata: Metadata::new(),
        }
    }

    async fn ids(store: &InMemoryStore, req: &SearchRequest<'_>) -> Vec<Uuid> {
        search(store, req)
            .await
            .unwrap()
            .into_iter()
            .map(|h| h.doc_id)
            .collect()
    }

    #[tokio::test]
    async fn test_title_match_ranks_above_content_match() {
        let store = InMemoryStore::new();
        let dev = Uuid::new_v4();
        let b = store
            .create(new_doc(dev, "Garden notes", "We grow basil and thyme."))
            .await
            .unwrap();
        let a = store
            .create(new_doc(dev, "Basil pesto", "Blend with pine nuts."))
            .await
            .unwrap();

        let req = SearchRequest::new(dev, "basil");
        assert_eq!(ids(&store, &req).await, vec![a.doc_id, b.doc_id]);
    }

    #[tokio::test]
    async fn test_stemmed_query_matches_inflected_document() {
        let store = InMemoryStore::new();
        let dev = Uuid::new_v4();
        let doc = store
            .create(new_doc(dev, "Deployment", "Running containers in production"))
            .await
            .unwrap();

        let req = SearchRequest::new(dev, "runs");
        assert_eq!(ids(&store, &req).await, vec![doc.doc_id]);
    }

    #[tokio::test]
    async fn test_accent_insensitive_query() {
        let store = InMemoryStore::new();
        let dev = Uuid::new_v4();
        let mut fr = new_doc(dev, "Crème brûlée", "Un dessert classique");
        fr.language = "fr".to_string();
        let doc = store.create(fr).await.unwrap();

        let mut req = SearchRequest::new(dev, "creme brulee");
        req.language = Some("fr");
        assert_eq!(ids(&store, &req).await, vec![doc.doc_id]);
    }

    #[tokio::test]
    async fn test_fuzzy_fallback_on_typo() {
        let store = InMemoryStore::new();
        let dev = Uuid::new_v4();
        let doc = store
            .create(new_doc(dev, "julep", "A bourbon cocktail."))
            .await
            .unwrap();

        let mut req = SearchRequest::new(dev, "julpe");
        req.explain = true;
        let hits = search(&store, &req).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].doc_id, doc.doc_id);
        let explain = hits[0].explain.as_ref().unwrap();
        assert_eq!(explain.exact_score, 0);
        assert!(explain.fuzzy_score >= DEFAULT_FUZZY_THRESHOLD);
    }

    #[tokio::test]
    async fn test_exact_match_dominates_fuzzy_match() {
        let store = InMemoryStore::new();
        let dev = Uuid::new_v4();
        let fuzzy_only = store.create(new_doc(dev, "julip", "")).await.unwrap();
        let exact = store
            .create(new_doc(dev, "Drinks", "one julep please"))
            .await
            .unwrap();

        let mut req = SearchRequest::new(dev, "julep");
        req.explain = true;
        let hits = search(&store, &req).await.unwrap();
        assert_eq!(
            hits.iter().map(|h| h.doc_id).collect::<Vec<_>>(),
            vec![exact.doc_id, fuzzy_only.doc_id]
        );
        assert_eq!(hits[0].explain.as_ref().unwrap().exact_score, 1);
        assert_eq!(hits[1].explain.as_ref().unwrap().exact_score, 0);
        assert!(hits[0].score > hits[1].score);
    }

    #[tokio::test]
    async fn test_tenant_isolation() {
        let store = InMemoryStore::new();
        let dev_x = Uuid::new_v4();
        let dev_y = Uuid::new_v4();
        store
            .create(new_doc(dev_y, "Secret recipe", "Only for Y"))
            .await
            .unwrap();

        let req = SearchRequest::new(dev_x, "secret recipe");
        assert!(search(&store, &req).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_replaces_searchable_terms() {
        let store = InMemoryStore::new();
        let dev = Uuid::new_v4();
        let doc = store
            .create(new_doc(dev, "Notes", "The zebra sleeps"))
            .await
            .unwrap();
        store
            .update(
                dev,
                doc.doc_id,
                0,
                DocumentPatch {
                    content: Some("The giraffe eats".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let new_term = SearchRequest::new(dev, "giraffe");
        assert_eq!(ids(&store, &new_term).await, vec![doc.doc_id]);
        let old_term = SearchRequest::new(dev, "zebra");
        assert!(ids(&store, &old_term).await.is_empty());
    }

    #[tokio::test]
    async fn test_chunks_deduplicated_per_document() {
        let store = InMemoryStore::new();
        let dev = Uuid::new_v4();
        let id = Uuid::new_v4();
        let chunks = (0..3)
            .map(|i| {
                let mut d = new_doc(dev, "Handbook", &format!("section {} about onboarding", i));
                d.doc_id = Some(id);
                d.index = i;
                d
            })
            .collect();
        store.create_many(chunks).await.unwrap();

        let hits = search(&store, &SearchRequest::new(dev, "onboarding"))
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].doc_id, id);
        assert_eq!(hits[0].snippets.len(), 3);
        assert!(hits[0].snippets.iter().all(|s| s.content.contains("onboarding")));
    }

    #[tokio::test]
    async fn test_snippets_list_matching_chunks_best_first() {
        let store = InMemoryStore::new();
        let dev = Uuid::new_v4();
        let id = Uuid::new_v4();
        let contents = ["misc notes", "the onboarding checklist", "onboarding steps"];
        let chunks = contents
            .iter()
            .enumerate()
            .map(|(i, content)| {
                let mut d = new_doc(dev, "Handbook", content);
                d.doc_id = Some(id);
                d.index = i as i64;
                d
            })
            .collect();
        store.create_many(chunks).await.unwrap();

        let hits = search(&store, &SearchRequest::new(dev, "onboarding"))
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(
            hits[0].snippets,
            vec![
                Snippet {
                    index: 2,
                    content: "onboarding steps".to_string(),
                },
                Snippet {
                    index: 1,
                    content: "the onboarding checklist".to_string(),
                },
            ]
        );
        assert!(hits[0].owners.is_empty());
    }

    #[tokio::test]
    async fn test_stopword_match_does_not_outrank_real_term() {
        let store = InMemoryStore::new();
        let dev = Uuid::new_v4();
        let drinks = store
            .create(new_doc(dev, "Drinks", "a mint julep"))
            .await
            .unwrap();
        store
            .create(new_doc(dev, "The Rye Whiskey", "aged in oak"))
            .await
            .unwrap();

        let mut req = SearchRequest::new(dev, "the julep");
        req.explain = true;
        let hits = search(&store, &req).await.unwrap();
        assert_eq!(hits[0].doc_id, drinks.doc_id);
        assert_eq!(
            hits[0].explain.as_ref().unwrap().matched_terms,
            vec!["julep".to_string()]
        );
        for hit in &hits[1..] {
            assert_eq!(hit.explain.as_ref().unwrap().exact_score, 0);
        }
    }

    #[tokio::test]
    async fn test_short_query_matches_only_exactly() {
        let store = InMemoryStore::new();
        let dev = Uuid::new_v4();
        store
            .create(new_doc(dev, "Kubernetes", "xylophone lessons on tuesdays"))
            .await
            .unwrap();
        let plan = store
            .create(new_doc(dev, "Roadmap", "ship plan x next quarter"))
            .await
            .unwrap();

        let mut req = SearchRequest::new(dev, "x");
        req.explain = true;
        let hits = search(&store, &req).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].doc_id, plan.doc_id);
        assert_eq!(hits[0].explain.as_ref().unwrap().fuzzy_score, 0.0);

        assert!(search(&store, &SearchRequest::new(dev, "xy"))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_owner_filter() {
        let store = InMemoryStore::new();
        let dev = Uuid::new_v4();
        let agent = OwnerRef::agent(Uuid::new_v4());
        store.register_owner(dev, agent).await.unwrap();
        let mine = store
            .create(new_doc(dev, "Agent manual", "tools"))
            .await
            .unwrap();
        store
            .create(new_doc(dev, "Other manual", "tools"))
            .await
            .unwrap();
        store.link(dev, mine.doc_id, agent).await.unwrap();

        let other_agent = OwnerRef::agent(Uuid::new_v4());
        store.register_owner(dev, other_agent).await.unwrap();

        let owners = [agent, other_agent];
        let mut req = SearchRequest::new(dev, "manual");
        req.owners = &owners;
        let hits = search(&store, &req).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].doc_id, mine.doc_id);
        assert_eq!(hits[0].owners, vec![agent]);
    }

    #[tokio::test]
    async fn test_metadata_filter() {
        let store = InMemoryStore::new();
        let dev = Uuid::new_v4();
        let mut tagged = new_doc(dev, "Runbook", "restart the service");
        tagged
            .metadata
            .insert("team".into(), serde_json::json!("infra"));
        let tagged = store.create(tagged).await.unwrap();
        store
            .create(new_doc(dev, "Runbook", "restart the service"))
            .await
            .unwrap();

        let mut filter = Metadata::new();
        filter.insert("team".into(), serde_json::json!("infra"));
        let mut req = SearchRequest::new(dev, "runbook");
        req.metadata_filter = Some(&filter);
        assert_eq!(ids(&store, &req).await, vec![tagged.doc_id]);
    }

    #[tokio::test]
    async fn test_empty_query_returns_nothing() {
        let store = InMemoryStore::new();
        let dev = Uuid::new_v4();
        store.create(new_doc(dev, "t", "c")).await.unwrap();
        for q in ["", "   ", "?!"] {
            assert!(search(&store, &SearchRequest::new(dev, q))
                .await
                .unwrap()
                .is_empty());
        }
    }

    #[tokio::test]
    async fn test_limit_bounds_validated() {
        let store = InMemoryStore::new();
        let mut req = SearchRequest::new(Uuid::new_v4(), "x");
        req.params.limit = 0;
        let err = search(&store, &req).await.unwrap_err();
        assert_eq!(err.field(), Some("limit"));
        req.params.limit = MAX_LIMIT + 1;
        assert!(search(&store, &req).await.is_err());
    }

    #[tokio::test]
    async fn test_unknown_language_hint_rejected() {
        let store = InMemoryStore::new();
        let mut req = SearchRequest::new(Uuid::new_v4(), "x");
        req.language = Some("sindarin");
        let err = search(&store, &req).await.unwrap_err();
        assert_eq!(err.field(), Some("language"));
    }

    #[test]
    fn test_analyze_query_dedups_stems() {
        let q = analyze_query("run running runs", None).unwrap();
        assert_eq!(q.terms, vec!["run".to_string()]);
    }
}
