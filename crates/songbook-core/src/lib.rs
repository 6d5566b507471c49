//! songbook-core — local-first encrypted songwriting journal
//!
//! # Design principles
//! - Documents never touch disk in plaintext; the only artifact is one
//!   AES-256-GCM blob with a fresh nonce per save.
//! - The key is derived from the password and never stored. No password
//!   recovery exists: losing the password loses the journal.
//! - One controller (`Journal`) owns all application state.
//!
//! # Module layout
//! - `kdf`        — PBKDF2-HMAC-SHA256 session key derivation
//! - `codec`      — encrypt/decrypt the document collection
//! - `model`      — documents, blocks, collection
//! - `storage`    — blob slot trait with file and in-memory backends
//! - `store`      — in-memory document store and serialized persistence
//! - `session`    — unlock / lock state machine
//! - `status`     — application status observed by the UI
//! - `autosave`   — debounce timer and autosave scheduler
//! - `dictation`  — speech-to-text capability seam
//! - `settings`   — editor preferences
//! - `paths`      — platform data directory
//! - `app`        — the `Journal` controller
//! - `error`      — error types

pub mod app;
pub mod autosave;
pub mod codec;
pub mod dictation;
pub mod error;
pub mod kdf;
pub mod model;
pub mod paths;
pub mod session;
pub mod settings;
pub mod status;
pub mod storage;
pub mod store;

pub use app::Journal;
pub use error::{AuthError, CapabilityError, JournalError, StorageError, StoreError};
pub use model::{Block, BlockId, BlockKind, Document, DocumentCollection, DocumentId};
pub use status::{AppStatus, StatusMachine};
