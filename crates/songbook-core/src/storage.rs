use async_trait::async_trait;
use parking_lot::Mutex;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::codec::EncryptedBlob;
use crate::error::{CodecError, StorageError};

/// File name of the single persisted slot.
pub const BLOB_FILE_NAME: &str = "secure_documents_v2.json";

/// One key-value slot holding the encrypted collection. An empty slot means
/// "no documents yet", not an error.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn read(&self) -> Result<Option<EncryptedBlob>, StorageError>;
    async fn write(&self, blob: &EncryptedBlob) -> Result<(), StorageError>;
}

#[derive(Debug, Clone)]
pub struct FileBlobStore {
    path: PathBuf,
}

impl FileBlobStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn in_dir<P: AsRef<Path>>(dir: P) -> Self {
        Self::new(dir.as_ref().join(BLOB_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl BlobStore for FileBlobStore {
    async fn read(&self) -> Result<Option<EncryptedBlob>, StorageError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let blob = serde_json::from_slice(&bytes)
            .map_err(|e| StorageError::Corrupt(format!("parse {}: {e}", self.path.display())))?;
        Ok(Some(blob))
    }

    async fn write(&self, blob: &EncryptedBlob) -> Result<(), StorageError> {
        let data = encode_blob(blob)?;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_atomic(&path, &data))
            .await
            .map_err(|e| StorageError::Task(e.to_string()))?
    }
}

fn encode_blob(blob: &EncryptedBlob) -> Result<Vec<u8>, StorageError> {
    Ok(serde_json::to_vec(blob).map_err(CodecError::from)?)
}

// temp file in the same directory + rename, so a crash never leaves a torn blob
fn write_atomic(path: &Path, data: &[u8]) -> Result<(), StorageError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir)?;
    let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| StorageError::Io(e.error))?;
    Ok(())
}

/// In-memory slot. Clones share the same slot, so dropping a journal and
/// building a new one over a clone behaves like an application restart.
#[derive(Debug, Clone, Default)]
pub struct MemoryBlobStore {
    slot: Arc<Mutex<Option<EncryptedBlob>>>,
    writes: Arc<AtomicUsize>,
    fail_writes: Arc<Mutex<bool>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of completed writes.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> Option<EncryptedBlob> {
        self.slot.lock().clone()
    }

    pub fn replace(&self, blob: Option<EncryptedBlob>) {
        *self.slot.lock() = blob;
    }

    /// Make subsequent writes fail with an I/O error.
    pub fn set_fail_writes(&self, fail: bool) {
        *self.fail_writes.lock() = fail;
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn read(&self) -> Result<Option<EncryptedBlob>, StorageError> {
        Ok(self.slot.lock().clone())
    }

    async fn write(&self, blob: &EncryptedBlob) -> Result<(), StorageError> {
        if *self.fail_writes.lock() {
            return Err(StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "simulated write failure",
            )));
        }
        *self.slot.lock() = Some(blob.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
