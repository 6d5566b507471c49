use thiserror::Error;

/// Unlock failures. Wrong password and a corrupt blob are reported as the
/// same `IncorrectPassword` variant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Please enter a password")]
    MissingPassword,

    #[error("Incorrect password")]
    IncorrectPassword,

    #[error("Authentication failed")]
    Failed,
}

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Serialisation error: {0}")]
    Serialisation(#[from] serde_json::Error),

    #[error("AEAD encryption failed")]
    AeadEncrypt,
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Stored blob is corrupt: {0}")]
    Corrupt(String),

    #[error("Blob encoding failed: {0}")]
    Encode(#[from] CodecError),

    #[error("Storage task failed: {0}")]
    Task(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CapabilityError {
    #[error("Failed to load transcription model: {0}")]
    Unavailable(String),

    #[error("Transcription failed: {0}")]
    Transcription(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Journal is locked; unlock with password first")]
    Locked,

    #[error("Create or select a song first")]
    NoOpenDocument,

    #[error("Document not found: {0}")]
    UnknownDocument(String),

    #[error("Document title must not be empty")]
    EmptyTitle,

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

#[derive(Debug, Error)]
pub enum JournalError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Capability(#[from] CapabilityError),

    #[error("Settings error: {0}")]
    Settings(String),
}
