use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::autosave::AutosaveScheduler;
use crate::dictation::{AudioClip, Dictation, Transcriber};
use crate::error::{AuthError, CapabilityError, JournalError, StoreError};
use crate::kdf::KdfParams;
use crate::model::{BlockId, BlockKind, Document, DocumentId, DocumentStats, DocumentSummary};
use crate::session::{AuthState, Session};
use crate::settings::JournalSettings;
use crate::status::StatusMachine;
use crate::storage::{BlobStore, FileBlobStore};
use crate::store::DocumentStore;

/// The application state: one controller owning the session, the store, the
/// status machine and the autosave timer. Presentation layers call into it
/// and read snapshots back out.
///
/// Pending autosaves are dropped with the journal; call [`Journal::flush`]
/// before letting it go.
pub struct Journal {
    session: Session,
    store: DocumentStore,
    status: StatusMachine,
    autosave: AutosaveScheduler,
    dictation: Option<Dictation>,
}

impl Journal {
    pub fn new(storage: Arc<dyn BlobStore>, settings: &JournalSettings) -> Self {
        Self::with_kdf(storage, settings, KdfParams::default())
    }

    pub fn with_kdf(
        storage: Arc<dyn BlobStore>,
        settings: &JournalSettings,
        params: KdfParams,
    ) -> Self {
        let status = StatusMachine::new();
        let store = DocumentStore::new(storage, status.clone(), settings.default_block_kind);
        let autosave = AutosaveScheduler::new(store.clone(), settings.autosave_delay());
        Self {
            session: Session::new(store.clone(), params),
            store,
            status,
            autosave,
            dictation: None,
        }
    }

    /// Journal backed by the blob file and settings in `dir`.
    pub fn open_dir<P: AsRef<Path>>(dir: P) -> Result<Self, JournalError> {
        let settings = JournalSettings::load_from_dir(dir.as_ref())?;
        let storage = Arc::new(FileBlobStore::in_dir(dir.as_ref()));
        Ok(Self::new(storage, &settings))
    }

    pub fn with_transcriber(mut self, transcriber: Box<dyn Transcriber>) -> Self {
        self.dictation = Some(Dictation::new(transcriber, self.status.clone()));
        self
    }

    pub fn status(&self) -> &StatusMachine {
        &self.status
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    pub fn autosave(&self) -> &AutosaveScheduler {
        &self.autosave
    }

    pub fn auth_state(&self) -> &AuthState {
        self.session.state()
    }

    pub fn is_unlocked(&self) -> bool {
        self.session.is_unlocked()
    }

    // ── Session ─────────────────────────────────────────────────────────────

    pub async fn unlock(&mut self, password: &str) -> Result<(), AuthError> {
        self.session.attempt_unlock(password).await
    }

    /// Save the latest state, then forget the key and the documents. The
    /// final save queues behind any autosave already in flight or waiting on
    /// the write gate. If it fails the journal stays unlocked so nothing is
    /// lost.
    pub async fn lock(&mut self) -> Result<(), StoreError> {
        if !self.session.is_unlocked() {
            return Ok(());
        }
        self.autosave.cancel();
        self.store.persist().await?;
        self.session.lock();
        Ok(())
    }

    // ── Queries ─────────────────────────────────────────────────────────────

    pub fn documents(&self) -> Vec<DocumentSummary> {
        self.store.documents()
    }

    pub fn current_document(&self) -> Option<Document> {
        self.store.current_document()
    }

    pub fn stats(&self) -> DocumentStats {
        self.store.stats()
    }

    // ── Editing ─────────────────────────────────────────────────────────────

    pub async fn create_document(&self, title: &str) -> Result<DocumentId, JournalError> {
        Ok(self.store.create_document(title).await?)
    }

    pub fn open_document(&self, id: DocumentId) -> Result<(), JournalError> {
        Ok(self.store.open_document(id)?)
    }

    pub async fn delete_document(&self, id: DocumentId) -> Result<(), JournalError> {
        Ok(self.store.delete_document(id).await?)
    }

    pub async fn add_block(&self, kind: BlockKind) -> Result<BlockId, JournalError> {
        Ok(self.store.add_block(kind).await?)
    }

    pub async fn remove_block(&self, id: BlockId) -> Result<bool, JournalError> {
        Ok(self.store.remove_block(id).await?)
    }

    /// Typing path: replace the block content and let autosave pick it up.
    pub fn edit_block(&self, id: BlockId, text: &str) -> Result<bool, JournalError> {
        let updated = self.store.update_block_content(id, text)?;
        if updated {
            self.autosave.on_edit();
        }
        Ok(updated)
    }

    /// Append text to block `id`, space-separated, and let autosave pick it
    /// up. Blank text is ignored.
    pub fn append_block_text(&self, id: BlockId, text: &str) -> Result<bool, JournalError> {
        let appended = self.store.append_block_text(id, text)?;
        if appended {
            self.autosave.on_edit();
        }
        Ok(appended)
    }

    /// Transcribe `clip` and append the text to block `id` of the open
    /// document. Returns the transcribed text. On failure the block is left
    /// unchanged and the status shows the error.
    pub async fn dictate(&self, id: BlockId, clip: &AudioClip) -> Result<String, JournalError> {
        let dictation = match &self.dictation {
            Some(dictation) => dictation,
            None => {
                let err = CapabilityError::Unavailable("no transcriber configured".into());
                self.status.fail(err.to_string());
                return Err(err.into());
            }
        };
        let text = dictation.transcribe(clip).await?;
        if self.append_block_text(id, &text)? {
            info!(words = text.split_whitespace().count(), "dictation appended");
        }
        Ok(text)
    }

    /// Persist now instead of waiting for the autosave timer.
    pub async fn flush(&self) -> Result<(), JournalError> {
        Ok(self.autosave.flush().await?)
    }
}
