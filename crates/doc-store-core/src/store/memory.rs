//! In-memory [`Store`] implementation for tests and embedded use.
//!
//! All state lives behind one `parking_lot::RwLock`, so each mutation
//! (row change plus its derived representation) is applied atomically.
//! Chunks are stored as `Arc`s: readers copy the pointers out under the
//! read lock and do all scoring after releasing it.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{DeleteOutcome, Document, DocumentPatch, NewDocument, OwnerRef};

use super::{
    duplicate_chunk, foreign_document, foreign_owner, missing_chunk, missing_document,
    missing_owner, prepare_batch, prepare_new, prepare_update, IndexedChunk, Scope, Store,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Link {
    developer_id: Uuid,
    owner: OwnerRef,
    doc_id: Uuid,
}

#[derive(Default)]
struct State {
    /// Keyed by `(doc_id, index)`, the global uniqueness constraint.
    chunks: BTreeMap<(Uuid, i64), Arc<IndexedChunk>>,
    /// Owner to the developer it is registered under.
    owners: HashMap<OwnerRef, Uuid>,
    links: BTreeSet<Link>,
}

impl State {
    fn doc_chunks(&self, doc_id: Uuid) -> impl Iterator<Item = &Arc<IndexedChunk>> {
        self.chunks
            .range((doc_id, i64::MIN)..=(doc_id, i64::MAX))
            .map(|(_, chunk)| chunk)
    }

    fn doc_developer(&self, doc_id: Uuid) -> Option<Uuid> {
        self.doc_chunks(doc_id).next().map(|c| c.doc.developer_id)
    }

    fn check_insert(&self, chunk: &IndexedChunk) -> Result<()> {
        let doc = &chunk.doc;
        if let Some(owner) = self.doc_developer(doc.doc_id) {
            if owner != doc.developer_id {
                return Err(foreign_document(doc.doc_id));
            }
        }
        if self.chunks.contains_key(&(doc.doc_id, doc.index)) {
            return Err(duplicate_chunk(doc.doc_id, doc.index));
        }
        Ok(())
    }

    fn insert(&mut self, chunk: IndexedChunk) {
        self.chunks
            .insert((chunk.doc.doc_id, chunk.doc.index), Arc::new(chunk));
    }

    fn owner_registered(&self, developer_id: Uuid, owner: OwnerRef) -> bool {
        self.owners.get(&owner) == Some(&developer_id)
    }

    fn drop_doc_links(&mut self, developer_id: Uuid, doc_id: Uuid) -> u64 {
        let before = self.links.len();
        self.links
            .retain(|l| !(l.developer_id == developer_id && l.doc_id == doc_id));
        (before - self.links.len()) as u64
    }
}

/// In-memory store.
#[derive(Default)]
pub struct InMemoryStore {
    state: RwLock<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn create(&self, doc: NewDocument) -> Result<Document> {
        let chunk = prepare_new(doc)?;
        let created = chunk.doc.clone();

        let mut state = self.state.write();
        state.check_insert(&chunk)?;
        state.insert(chunk);
        drop(state);

        debug!(doc_id = %created.doc_id, index = created.index, "created chunk");
        Ok(created)
    }

    async fn create_many(&self, docs: Vec<NewDocument>) -> Result<Vec<Document>> {
        let chunks = prepare_batch(docs)?;

        let mut state = self.state.write();
        for chunk in &chunks {
            state.check_insert(chunk)?;
        }
        let created: Vec<Document> = chunks.iter().map(|c| c.doc.clone()).collect();
        for chunk in chunks {
            state.insert(chunk);
        }
        drop(state);

        debug!(count = created.len(), "created chunk batch");
        Ok(created)
    }

    async fn get(&self, developer_id: Uuid, doc_id: Uuid) -> Result<Vec<Document>> {
        let state = self.state.read();
        Ok(state
            .doc_chunks(doc_id)
            .filter(|c| c.doc.developer_id == developer_id)
            .map(|c| c.doc.clone())
            .collect())
    }

    async fn get_chunk(
        &self,
        developer_id: Uuid,
        doc_id: Uuid,
        index: i64,
    ) -> Result<Option<Document>> {
        let state = self.state.read();
        Ok(state
            .chunks
            .get(&(doc_id, index))
            .filter(|c| c.doc.developer_id == developer_id)
            .map(|c| c.doc.clone()))
    }

    async fn update(
        &self,
        developer_id: Uuid,
        doc_id: Uuid,
        index: i64,
        patch: DocumentPatch,
    ) -> Result<Document> {
        let mut state = self.state.write();
        let current = state
            .chunks
            .get(&(doc_id, index))
            .filter(|c| c.doc.developer_id == developer_id)
            .ok_or_else(|| missing_chunk(developer_id, doc_id, index))?;

        let next = prepare_update(current, patch)?;
        let updated = next.doc.clone();
        state.insert(next);
        drop(state);

        debug!(%doc_id, index, "updated chunk");
        Ok(updated)
    }

    async fn delete(&self, developer_id: Uuid, doc_id: Uuid) -> Result<DeleteOutcome> {
        let mut state = self.state.write();
        let keys: Vec<(Uuid, i64)> = state
            .doc_chunks(doc_id)
            .filter(|c| c.doc.developer_id == developer_id)
            .map(|c| (c.doc.doc_id, c.doc.index))
            .collect();
        if keys.is_empty() {
            return Ok(DeleteOutcome::NotFound);
        }
        for key in &keys {
            state.chunks.remove(key);
        }
        let links = state.drop_doc_links(developer_id, doc_id);

        debug!(%doc_id, chunks = keys.len(), links, "deleted document");
        Ok(DeleteOutcome::Deleted {
            chunks: keys.len() as u64,
            links,
        })
    }

    async fn delete_chunk(
        &self,
        developer_id: Uuid,
        doc_id: Uuid,
        index: i64,
    ) -> Result<DeleteOutcome> {
        let mut state = self.state.write();
        let owned = state
            .chunks
            .get(&(doc_id, index))
            .is_some_and(|c| c.doc.developer_id == developer_id);
        if !owned {
            return Ok(DeleteOutcome::NotFound);
        }
        state.chunks.remove(&(doc_id, index));
        let links = if state.doc_developer(doc_id).is_none() {
            state.drop_doc_links(developer_id, doc_id)
        } else {
            0
        };

        debug!(%doc_id, index, links, "deleted chunk");
        Ok(DeleteOutcome::Deleted { chunks: 1, links })
    }

    async fn register_owner(&self, developer_id: Uuid, owner: OwnerRef) -> Result<()> {
        let mut state = self.state.write();
        match state.owners.get(&owner).copied() {
            Some(existing) if existing == developer_id => Ok(()),
            Some(_) => Err(foreign_owner(owner)),
            None => {
                state.owners.insert(owner, developer_id);
                debug!(%owner, "registered owner");
                Ok(())
            }
        }
    }

    async fn remove_owner(&self, developer_id: Uuid, owner: OwnerRef) -> Result<bool> {
        let mut state = self.state.write();
        if !state.owner_registered(developer_id, owner) {
            return Ok(false);
        }
        state.owners.remove(&owner);
        state
            .links
            .retain(|l| !(l.developer_id == developer_id && l.owner == owner));
        Ok(true)
    }

    async fn link(&self, developer_id: Uuid, doc_id: Uuid, owner: OwnerRef) -> Result<()> {
        let mut state = self.state.write();
        if state.doc_developer(doc_id) != Some(developer_id) {
            return Err(missing_document(developer_id, doc_id));
        }
        if !state.owner_registered(developer_id, owner) {
            return Err(missing_owner(developer_id, owner));
        }
        state.links.insert(Link {
            developer_id,
            owner,
            doc_id,
        });
        debug!(%doc_id, %owner, "linked document");
        Ok(())
    }

    async fn unlink(&self, developer_id: Uuid, doc_id: Uuid, owner: OwnerRef) -> Result<bool> {
        let mut state = self.state.write();
        if state.doc_developer(doc_id) != Some(developer_id) {
            return Err(missing_document(developer_id, doc_id));
        }
        if !state.owner_registered(developer_id, owner) {
            return Err(missing_owner(developer_id, owner));
        }
        Ok(state.links.remove(&Link {
            developer_id,
            owner,
            doc_id,
        }))
    }

    async fn owners_of(&self, developer_id: Uuid, doc_id: Uuid) -> Result<Vec<OwnerRef>> {
        let state = self.state.read();
        Ok(state
            .links
            .iter()
            .filter(|l| l.developer_id == developer_id && l.doc_id == doc_id)
            .map(|l| l.owner)
            .collect())
    }

    async fn candidates(&self, scope: &Scope) -> Result<Vec<IndexedChunk>> {
        let snapshot: Vec<Arc<IndexedChunk>> = {
            let state = self.state.read();
            let linked: Option<HashSet<Uuid>> = if scope.owners.is_empty() {
                None
            } else {
                Some(
                    state
                        .links
                        .iter()
                        .filter(|l| {
                            l.developer_id == scope.developer_id && scope.owners.contains(&l.owner)
                        })
                        .map(|l| l.doc_id)
                        .collect(),
                )
            };
            state
                .chunks
                .values()
                .filter(|c| c.doc.developer_id == scope.developer_id)
                .filter(|c| linked.as_ref().map_or(true, |ids| ids.contains(&c.doc.doc_id)))
                .cloned()
                .collect()
        };
        Ok(snapshot.iter().map(|c| c.as_ref().clone()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::index::derive;
    use crate::models::{Metadata, Modality};

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

    #[tokio::test]
    async fn test_create_then_get_round_trips() {
        let store = InMemoryStore::new();
        let dev = Uuid::new_v4();
        let mut doc = new_doc(dev, "Mint julep", "Bourbon, sugar, mint.");
        doc.metadata
            .insert("source".into(), serde_json::json!({"kind": "recipe"}));
        let created = store.create(doc.clone()).await.unwrap();

        let fetched = store.get(dev, created.doc_id).await.unwrap();
        assert_eq!(fetched, vec![created.clone()]);
        assert_eq!(fetched[0].title, doc.title);
        assert_eq!(fetched[0].content, doc.content);
        assert_eq!(fetched[0].metadata, doc.metadata);
    }

    #[tokio::test]
    async fn test_unsupported_language_persists_nothing() {
        let store = InMemoryStore::new();
        let dev = Uuid::new_v4();
        let mut doc = new_doc(dev, "t", "c");
        let id = Uuid::new_v4();
        doc.doc_id = Some(id);
        doc.language = "elvish".to_string();

        let err = store.create(doc).await.unwrap_err();
        assert!(matches!(err, StoreError::Validation { ref field, .. } if field == "language"));
        assert!(store.get(dev, id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_chunk_conflicts() {
        let store = InMemoryStore::new();
        let dev = Uuid::new_v4();
        let created = store.create(new_doc(dev, "a", "b")).await.unwrap();
        let mut again = new_doc(dev, "c", "d");
        again.doc_id = Some(created.doc_id);

        let err = store.create(again).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(store.get(dev, created.doc_id).await.unwrap()[0].title, "a");
    }

    #[tokio::test]
    async fn test_doc_id_cannot_cross_developers() {
        let store = InMemoryStore::new();
        let created = store
            .create(new_doc(Uuid::new_v4(), "a", "b"))
            .await
            .unwrap();
        let mut other = new_doc(Uuid::new_v4(), "a", "b");
        other.doc_id = Some(created.doc_id);
        other.index = 1;
        assert!(matches!(
            store.create(other).await.unwrap_err(),
            StoreError::Conflict(_)
        ));
    }

    #[tokio::test]
    async fn test_concurrent_create_race_has_one_winner() {
        let store = Arc::new(InMemoryStore::new());
        let dev = Uuid::new_v4();
        let id = Uuid::new_v4();

        let mut handles = Vec::new();
        for i in 0..8 {
            let store = Arc::clone(&store);
            let mut doc = new_doc(dev, &format!("writer {}", i), "body");
            doc.doc_id = Some(id);
            handles.push(tokio::spawn(async move { store.create(doc).await }));
        }

        let mut ok = 0;
        let mut conflicts = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => ok += 1,
                Err(StoreError::Conflict(_)) => conflicts += 1,
                Err(e) => panic!("unexpected error: {}", e),
            }
        }
        assert_eq!(ok, 1);
        assert_eq!(conflicts, 7);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_updates_apply_whole_writes() {
        let store = Arc::new(InMemoryStore::new());
        let dev = Uuid::new_v4();
        let doc_id = store
            .create(new_doc(dev, "Draft", "original body"))
            .await
            .unwrap()
            .doc_id;

        let mut handles = Vec::new();
        for i in 0..16 {
            let store = Arc::clone(&store);
            let patch = DocumentPatch {
                title: Some(format!("Revision {}", i)),
                content: Some(format!("body written by writer {}", i)),
                ..Default::default()
            };
            handles.push(tokio::spawn(async move {
                store.update(dev, doc_id, 0, patch).await
            }));
        }
        let mut written = Vec::new();
        for handle in handles {
            written.push(handle.await.unwrap().unwrap());
        }

        let current = store.get_chunk(dev, doc_id, 0).await.unwrap().unwrap();
        assert!(written.contains(&current));
        let mut stamps: Vec<_> = written.iter().map(|d| d.updated_at).collect();
        stamps.sort();
        stamps.dedup();
        assert_eq!(stamps.len(), 16, "each update advances updated_at");
        assert_eq!(current.updated_at, *stamps.last().unwrap());

        let indexed = store.candidates(&Scope::developer(dev)).await.unwrap();
        assert_eq!(
            indexed[0].repr,
            derive(&current.title, &current.content, &current.language).unwrap()
        );
    }

    #[tokio::test]
    async fn test_create_many_is_all_or_nothing() {
        let store = InMemoryStore::new();
        let dev = Uuid::new_v4();
        let existing = store.create(new_doc(dev, "x", "y")).await.unwrap();

        let id = Uuid::new_v4();
        let mut first = new_doc(dev, "p0", "c0");
        first.doc_id = Some(id);
        let mut clash = new_doc(dev, "p1", "c1");
        clash.doc_id = Some(existing.doc_id);

        assert!(store.create_many(vec![first, clash]).await.is_err());
        assert!(store.get(dev, id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_missing_chunk_is_not_found() {
        let store = InMemoryStore::new();
        let err = store
            .update(
                Uuid::new_v4(),
                Uuid::new_v4(),
                0,
                DocumentPatch::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_update_other_developer_is_not_found() {
        let store = InMemoryStore::new();
        let created = store
            .create(new_doc(Uuid::new_v4(), "a", "b"))
            .await
            .unwrap();
        let err = store
            .update(Uuid::new_v4(), created.doc_id, 0, DocumentPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_update_recomputes_representation() {
        let store = InMemoryStore::new();
        let dev = Uuid::new_v4();
        let created = store.create(new_doc(dev, "old", "stale")).await.unwrap();
        store
            .update(
                dev,
                created.doc_id,
                0,
                DocumentPatch {
                    content: Some("fresh".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let chunks = store.candidates(&Scope::developer(dev)).await.unwrap();
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].repr.terms.contains_key("fresh"));
        assert!(!chunks[0].repr.terms.contains_key("stale"));
    }

    #[tokio::test]
    async fn test_invalid_update_leaves_row_untouched() {
        let store = InMemoryStore::new();
        let dev = Uuid::new_v4();
        let created = store.create(new_doc(dev, "t", "c")).await.unwrap();
        let err = store
            .update(
                dev,
                created.doc_id,
                0,
                DocumentPatch {
                    content: Some("new".to_string()),
                    language: Some("zz".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.field(), Some("language"));
        assert_eq!(store.get(dev, created.doc_id).await.unwrap()[0].content, "c");
    }

    #[tokio::test]
    async fn test_delete_is_idempotent_and_cascades() {
        let store = InMemoryStore::new();
        let dev = Uuid::new_v4();
        let user = OwnerRef::user(Uuid::new_v4());
        store.register_owner(dev, user).await.unwrap();
        let created = store.create(new_doc(dev, "t", "c")).await.unwrap();
        store.link(dev, created.doc_id, user).await.unwrap();

        let outcome = store.delete(dev, created.doc_id).await.unwrap();
        assert_eq!(outcome, DeleteOutcome::Deleted { chunks: 1, links: 1 });
        assert!(store.owners_of(dev, created.doc_id).await.unwrap().is_empty());

        let missing = Uuid::new_v4();
        assert_eq!(
            store.delete(dev, missing).await.unwrap(),
            DeleteOutcome::NotFound
        );
        assert_eq!(
            store.delete(dev, missing).await.unwrap(),
            DeleteOutcome::NotFound
        );
    }

    #[tokio::test]
    async fn test_delete_chunk_keeps_links_until_last() {
        let store = InMemoryStore::new();
        let dev = Uuid::new_v4();
        let agent = OwnerRef::agent(Uuid::new_v4());
        store.register_owner(dev, agent).await.unwrap();

        let id = Uuid::new_v4();
        let batch = (0..2)
            .map(|i| {
                let mut d = new_doc(dev, "t", &format!("part {}", i));
                d.doc_id = Some(id);
                d.index = i;
                d
            })
            .collect();
        store.create_many(batch).await.unwrap();
        store.link(dev, id, agent).await.unwrap();

        let first = store.delete_chunk(dev, id, 0).await.unwrap();
        assert_eq!(first, DeleteOutcome::Deleted { chunks: 1, links: 0 });
        assert_eq!(store.owners_of(dev, id).await.unwrap(), vec![agent]);

        let last = store.delete_chunk(dev, id, 1).await.unwrap();
        assert_eq!(last, DeleteOutcome::Deleted { chunks: 1, links: 1 });
        assert_eq!(
            store.delete_chunk(dev, id, 1).await.unwrap(),
            DeleteOutcome::NotFound
        );
    }

    #[tokio::test]
    async fn test_link_requires_both_endpoints_in_same_developer() {
        let store = InMemoryStore::new();
        let dev = Uuid::new_v4();
        let other_dev = Uuid::new_v4();
        let user = OwnerRef::user(Uuid::new_v4());
        let foreign_user = OwnerRef::user(Uuid::new_v4());
        store.register_owner(dev, user).await.unwrap();
        store.register_owner(other_dev, foreign_user).await.unwrap();
        let created = store.create(new_doc(dev, "t", "c")).await.unwrap();

        let err = store.link(dev, Uuid::new_v4(), user).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
        let err = store
            .link(dev, created.doc_id, foreign_user)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
        let err = store.link(other_dev, created.doc_id, foreign_user).await;
        assert!(matches!(err, Err(StoreError::NotFound(_))));

        store.link(dev, created.doc_id, user).await.unwrap();
        assert!(store.unlink(dev, created.doc_id, user).await.unwrap());
        assert!(!store.unlink(dev, created.doc_id, user).await.unwrap());
    }

    #[tokio::test]
    async fn test_owner_ids_are_unique_across_developers() {
        let store = InMemoryStore::new();
        let user = OwnerRef::user(Uuid::new_v4());
        store.register_owner(Uuid::new_v4(), user).await.unwrap();
        let err = store
            .register_owner(Uuid::new_v4(), user)
            .await
            .unwrap_err();
        assert_eq!(err.field(), Some("owner_id"));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_candidates_respect_owner_scope() {
        let store = InMemoryStore::new();
        let dev = Uuid::new_v4();
        let user = OwnerRef::user(Uuid::new_v4());
        store.register_owner(dev, user).await.unwrap();
        let linked = store.create(new_doc(dev, "linked", "x")).await.unwrap();
        store.create(new_doc(dev, "unlinked", "y")).await.unwrap();
        store.link(dev, linked.doc_id, user).await.unwrap();

        let all = store.candidates(&Scope::developer(dev)).await.unwrap();
        assert_eq!(all.len(), 2);

        let scoped = store
            .candidates(&Scope {
                developer_id: dev,
                owners: vec![user],
            })
            .await
            .unwrap();
        assert_eq!(scoped.len(), 1);
        assert_eq!(scoped[0].doc.doc_id, linked.doc_id);

        let removed = store.remove_owner(dev, user).await.unwrap();
        assert!(removed);
        assert!(store.owners_of(dev, linked.doc_id).await.unwrap().is_empty());
    }
}
