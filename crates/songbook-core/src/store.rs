//! Document store: the in-memory collection plus its encrypted persistence.
//!
//! All mutations are synchronous and finish before the first suspension
//! point, so a failed write never loses in-memory state. Writes go through a
//! single async gate: at most one encrypt+write is in flight, and a queued
//! persist snapshots the collection only once it holds the gate, so an older
//! snapshot can never overwrite a newer one.

use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info};

use crate::codec;
use crate::error::{AuthError, JournalError, StorageError, StoreError};
use crate::kdf::SessionKey;
use crate::model::{
    Block, BlockId, BlockKind, Document, DocumentCollection, DocumentId, DocumentStats,
    DocumentSummary,
};
use crate::status::{AppStatus, StatusMachine};
use crate::storage::BlobStore;

#[derive(Default)]
struct StoreState {
    collection: DocumentCollection,
    current: Option<DocumentId>,
    key: Option<SessionKey>,
}

struct StoreInner {
    state: Mutex<StoreState>,
    write_gate: tokio::sync::Mutex<()>,
    storage: Arc<dyn BlobStore>,
    status: StatusMachine,
    first_block: BlockKind,
}

/// Cheaply cloneable handle; clones share one store.
#[derive(Clone)]
pub struct DocumentStore {
    inner: Arc<StoreInner>,
}

impl DocumentStore {
    pub fn new(storage: Arc<dyn BlobStore>, status: StatusMachine, first_block: BlockKind) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                state: Mutex::new(StoreState::default()),
                write_gate: tokio::sync::Mutex::new(()),
                storage,
                status,
                first_block,
            }),
        }
    }

    pub fn status(&self) -> &StatusMachine {
        &self.inner.status
    }

    pub fn is_unlocked(&self) -> bool {
        self.inner.state.lock().key.is_some()
    }

    /// Install the session key and the decrypted collection. The first
    /// document in display order becomes current.
    pub(crate) fn adopt(&self, key: SessionKey, collection: DocumentCollection) {
        let mut state = self.inner.state.lock();
        state.current = collection.ordered().first().map(|d| d.id);
        state.collection = collection;
        state.key = Some(key);
    }

    /// Drop the key (zeroized on drop) and every in-memory document.
    pub(crate) fn clear(&self) {
        let mut state = self.inner.state.lock();
        *state = StoreState::default();
    }

    // ── Queries ─────────────────────────────────────────────────────────────

    pub fn documents(&self) -> Vec<DocumentSummary> {
        let state = self.inner.state.lock();
        state
            .collection
            .ordered()
            .into_iter()
            .map(Document::summary)
            .collect()
    }

    pub fn document(&self, id: DocumentId) -> Option<Document> {
        self.inner.state.lock().collection.get(id).cloned()
    }

    pub fn find_by_title(&self, title: &str) -> Option<Document> {
        self.inner.state.lock().collection.find_by_title(title).cloned()
    }

    pub fn current_document_id(&self) -> Option<DocumentId> {
        self.inner.state.lock().current
    }

    pub fn current_document(&self) -> Option<Document> {
        let state = self.inner.state.lock();
        state.current.and_then(|id| state.collection.get(id).cloned())
    }

    /// Word and block counts of the open document.
    pub fn stats(&self) -> DocumentStats {
        self.current_document()
            .map(|doc| DocumentStats::of(&doc))
            .unwrap_or_default()
    }

    // ── Mutations ───────────────────────────────────────────────────────────

    /// Create a document with one empty block, make it current and persist.
    /// If the write fails the document still exists in memory and is current.
    pub async fn create_document(&self, title: &str) -> Result<DocumentId, StoreError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(StoreError::EmptyTitle);
        }
        let id = {
            let mut state = self.inner.state.lock();
            if state.key.is_none() {
                return Err(StoreError::Locked);
            }
            let doc = Document::new(title, self.inner.first_block);
            let id = doc.id;
            state.collection.insert(doc);
            state.current = Some(id);
            id
        };
        debug!(%id, "document created");
        self.persist().await?;
        Ok(id)
    }

    pub fn open_document(&self, id: DocumentId) -> Result<(), StoreError> {
        let mut state = self.inner.state.lock();
        if state.key.is_none() {
            return Err(StoreError::Locked);
        }
        if !state.collection.contains(id) {
            return Err(StoreError::UnknownDocument(id.to_string()));
        }
        state.current = Some(id);
        Ok(())
    }

    pub async fn delete_document(&self, id: DocumentId) -> Result<(), StoreError> {
        {
            let mut state = self.inner.state.lock();
            if state.key.is_none() {
                return Err(StoreError::Locked);
            }
            if state.collection.remove(id).is_none() {
                return Err(StoreError::UnknownDocument(id.to_string()));
            }
            if state.current == Some(id) {
                state.current = None;
            }
        }
        self.persist().await
    }

    /// Append an empty block to the open document and persist.
    pub async fn add_block(&self, kind: BlockKind) -> Result<BlockId, StoreError> {
        let id = self.with_current(|doc| {
            let block = Block::empty(kind);
            let id = block.id;
            doc.blocks.push(block);
            id
        })?;
        self.persist().await?;
        Ok(id)
    }

    /// Remove a block from the open document and persist. Returns whether a
    /// block was removed; an unknown id leaves the document untouched.
    pub async fn remove_block(&self, id: BlockId) -> Result<bool, StoreError> {
        let removed = self.with_current(|doc| {
            let before = doc.blocks.len();
            doc.blocks.retain(|b| b.id != id);
            doc.blocks.len() != before
        })?;
        self.persist().await?;
        Ok(removed)
    }

    /// Replace a block's content. Does not persist; callers on the typing
    /// path go through the autosave scheduler instead.
    pub fn update_block_content(&self, id: BlockId, text: &str) -> Result<bool, StoreError> {
        self.with_current(|doc| match doc.block_mut(id) {
            Some(block) => {
                block.content = text.to_string();
                true
            }
            None => false,
        })
    }

    /// Append text to a block, space-separated from existing content. Blank
    /// text is ignored. Does not persist.
    pub fn append_block_text(&self, id: BlockId, text: &str) -> Result<bool, StoreError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(false);
        }
        self.with_current(|doc| match doc.block_mut(id) {
            Some(block) => {
                if !block.content.is_empty() {
                    block.content.push(' ');
                }
                block.content.push_str(text);
                true
            }
            None => false,
        })
    }

    fn with_current<R>(&self, f: impl FnOnce(&mut Document) -> R) -> Result<R, StoreError> {
        let mut state = self.inner.state.lock();
        if state.key.is_none() {
            return Err(StoreError::Locked);
        }
        let current = state.current.ok_or(StoreError::NoOpenDocument)?;
        let doc = state
            .collection
            .get_mut(current)
            .ok_or(StoreError::NoOpenDocument)?;
        Ok(f(doc))
    }

    // ── Persistence ─────────────────────────────────────────────────────────

    /// Encrypt the latest collection and write it to the blob slot.
    pub async fn persist(&self) -> Result<(), StoreError> {
        let _gate = self.inner.write_gate.lock().await;
        let (collection, key) = {
            let state = self.inner.state.lock();
            let key = state.key.clone().ok_or(StoreError::Locked)?;
            (state.collection.clone(), key)
        };

        let status = &self.inner.status;
        status.transition(AppStatus::Saving);
        match self.write_snapshot(&collection, &key).await {
            Ok(()) => {
                info!(documents = collection.len(), "journal saved");
                status.mark_idle();
                Ok(())
            }
            Err(e) => {
                status.fail(e.to_string());
                Err(e)
            }
        }
    }

    async fn write_snapshot(
        &self,
        collection: &DocumentCollection,
        key: &SessionKey,
    ) -> Result<(), StoreError> {
        let blob = codec::encrypt(collection, key)?;
        self.inner.storage.write(&blob).await?;
        Ok(())
    }

    /// Re-read the blob with the session key. A missing blob yields an empty
    /// collection; a blob that does not decrypt leaves memory untouched and
    /// reports `IncorrectPassword`.
    pub async fn load(&self) -> Result<(), JournalError> {
        let key = self
            .inner
            .state
            .lock()
            .key
            .clone()
            .ok_or(StoreError::Locked)?;
        let collection = self.fetch(&key).await?;
        let mut state = self.inner.state.lock();
        let keep_current = state
            .current
            .filter(|id| collection.contains(*id));
        state.current = keep_current.or_else(|| collection.ordered().first().map(|d| d.id));
        state.collection = collection;
        Ok(())
    }

    /// Read and decrypt the slot under `key` without touching the store.
    pub(crate) async fn fetch(&self, key: &SessionKey) -> Result<DocumentCollection, JournalError> {
        let status = &self.inner.status;
        status.transition(AppStatus::Fetching);
        let blob = match self.inner.storage.read().await {
            Ok(blob) => blob,
            Err(StorageError::Corrupt(reason)) => {
                debug!("stored blob unreadable: {reason}");
                status.mark_idle();
                return Err(AuthError::IncorrectPassword.into());
            }
            Err(e) => {
                status.fail(e.to_string());
                return Err(StoreError::Storage(e).into());
            }
        };
        let result: Result<DocumentCollection, JournalError> = match blob {
            None => Ok(DocumentCollection::new()),
            Some(blob) => {
                codec::decrypt(&blob, key).map_err(|_| AuthError::IncorrectPassword.into())
            }
        };
        status.mark_idle();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kdf::{derive_key, KdfParams};
    use crate::storage::MemoryBlobStore;
    use std::collections::HashSet;

    fn key(password: &str) -> SessionKey {
        derive_key(password, &KdfParams { iterations: 10, ..KdfParams::default() })
    }

    fn unlocked(slot: &MemoryBlobStore) -> DocumentStore {
        let store = DocumentStore::new(Arc::new(slot.clone()), StatusMachine::new(), BlockKind::Verse);
        store.adopt(key("p1"), DocumentCollection::new());
        store
    }

    #[tokio::test]
    async fn create_document_persists_and_selects() {
        let slot = MemoryBlobStore::new();
        let store = unlocked(&slot);
        let id = store.create_document("Song A").await.unwrap();
        assert_eq!(store.current_document_id(), Some(id));
        let doc = store.current_document().unwrap();
        assert_eq!(doc.blocks.len(), 1);
        assert_eq!(doc.blocks[0].kind, BlockKind::Verse);
        assert_eq!(slot.write_count(), 1);
        assert_eq!(store.status().current(), AppStatus::Idle);
    }

    #[tokio::test]
    async fn blank_title_rejected() {
        let store = unlocked(&MemoryBlobStore::new());
        assert!(matches!(
            store.create_document("   ").await,
            Err(StoreError::EmptyTitle)
        ));
        assert!(store.documents().is_empty());
    }

    #[tokio::test]
    async fn locked_store_refuses_mutation() {
        let slot = MemoryBlobStore::new();
        let store = DocumentStore::new(Arc::new(slot.clone()), StatusMachine::new(), BlockKind::Verse);
        assert!(matches!(store.create_document("x").await, Err(StoreError::Locked)));
        assert!(matches!(store.persist().await, Err(StoreError::Locked)));
        assert_eq!(slot.write_count(), 0);
    }

    #[tokio::test]
    async fn add_block_requires_open_document() {
        let slot = MemoryBlobStore::new();
        let store = unlocked(&slot);
        assert!(matches!(
            store.add_block(BlockKind::Chorus).await,
            Err(StoreError::NoOpenDocument)
        ));
        assert_eq!(slot.write_count(), 0);
    }

    #[tokio::test]
    async fn remove_block_only_removes_matching_id() {
        let store = unlocked(&MemoryBlobStore::new());
        store.create_document("Song").await.unwrap();
        let chorus = store.add_block(BlockKind::Chorus).await.unwrap();
        let bridge = store.add_block(BlockKind::Bridge).await.unwrap();

        assert!(!store.remove_block(BlockId::new()).await.unwrap());
        assert_eq!(store.current_document().unwrap().blocks.len(), 3);

        assert!(store.remove_block(chorus).await.unwrap());
        let doc = store.current_document().unwrap();
        assert_eq!(doc.blocks.len(), 2);
        assert!(doc.block(bridge).is_some());
        assert!(doc.block(chorus).is_none());
    }

    #[tokio::test]
    async fn update_content_does_not_persist() {
        let slot = MemoryBlobStore::new();
        let store = unlocked(&slot);
        store.create_document("Song").await.unwrap();
        let block = store.current_document().unwrap().blocks[0].id;
        assert!(store.update_block_content(block, "hello world").unwrap());
        assert!(!store.update_block_content(BlockId::new(), "x").unwrap());
        assert_eq!(slot.write_count(), 1);
        assert_eq!(store.stats().words, 2);
    }

    #[tokio::test]
    async fn append_text_separates_with_space() {
        let store = unlocked(&MemoryBlobStore::new());
        store.create_document("Song").await.unwrap();
        let block = store.current_document().unwrap().blocks[0].id;
        assert!(store.append_block_text(block, "  first ").unwrap());
        assert!(store.append_block_text(block, "second").unwrap());
        assert!(!store.append_block_text(block, "   ").unwrap());
        let doc = store.current_document().unwrap();
        assert_eq!(doc.block(block).unwrap().content, "first second");
    }

    #[tokio::test]
    async fn created_documents_have_distinct_ids() {
        let store = unlocked(&MemoryBlobStore::new());
        let mut ids = HashSet::new();
        for i in 0..100 {
            ids.insert(store.create_document(&format!("Song {i}")).await.unwrap());
        }
        assert_eq!(ids.len(), 100);
        assert_eq!(store.documents().len(), 100);
    }

    #[tokio::test]
    async fn failed_write_keeps_memory_and_reports_error() {
        let slot = MemoryBlobStore::new();
        let store = unlocked(&slot);
        slot.set_fail_writes(true);
        let err = store.create_document("Song A").await.unwrap_err();
        assert!(matches!(err, StoreError::Storage(_)));
        assert_eq!(store.status().current(), AppStatus::Error);
        assert!(store.status().last_error().is_some());
        assert_eq!(store.current_document().unwrap().title, "Song A");

        slot.set_fail_writes(false);
        store.persist().await.unwrap();
        assert_eq!(store.status().current(), AppStatus::Idle);
        let saved = codec::decrypt(&slot.snapshot().unwrap(), &key("p1")).unwrap();
        assert_eq!(saved.len(), 1);
    }

    #[tokio::test]
    async fn load_without_blob_is_empty_not_failure() {
        let store = unlocked(&MemoryBlobStore::new());
        store.load().await.unwrap();
        assert!(store.documents().is_empty());
    }

    #[tokio::test]
    async fn load_with_wrong_key_leaves_collection() {
        let slot = MemoryBlobStore::new();
        let writer = unlocked(&slot);
        writer.create_document("Song A").await.unwrap();

        let reader = DocumentStore::new(Arc::new(slot.clone()), StatusMachine::new(), BlockKind::Verse);
        let mut local = DocumentCollection::new();
        local.insert(Document::new("Local", BlockKind::Verse));
        reader.adopt(key("other"), local);
        let err = reader.load().await.unwrap_err();
        assert!(matches!(err, JournalError::Auth(AuthError::IncorrectPassword)));
        assert_eq!(reader.documents()[0].title, "Local");
    }

    #[tokio::test]
    async fn delete_document_clears_current() {
        let store = unlocked(&MemoryBlobStore::new());
        let id = store.create_document("Song").await.unwrap();
        store.delete_document(id).await.unwrap();
        assert!(store.current_document_id().is_none());
        assert!(matches!(
            store.delete_document(id).await,
            Err(StoreError::UnknownDocument(_))
        ));
    }
}
