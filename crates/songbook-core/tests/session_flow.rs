use songbook_core::codec::EncryptedBlob;
use songbook_core::kdf::KdfParams;
use songbook_core::session::AuthState;
use songbook_core::settings::JournalSettings;
use songbook_core::storage::{FileBlobStore, MemoryBlobStore, BLOB_FILE_NAME};
use songbook_core::{AppStatus, AuthError, Journal, JournalError, StoreError};
use std::sync::Arc;
use tempfile::tempdir;

fn fast_kdf() -> KdfParams {
    KdfParams {
        iterations: 10,
        ..KdfParams::default()
    }
}

fn journal_over(slot: &MemoryBlobStore) -> Journal {
    Journal::with_kdf(Arc::new(slot.clone()), &JournalSettings::default(), fast_kdf())
}

async fn write_song(journal: &Journal, title: &str, text: &str) {
    journal.create_document(title).await.unwrap();
    let block = journal.current_document().unwrap().blocks[0].id;
    assert!(journal.edit_block(block, text).unwrap());
    journal.flush().await.unwrap();
}

#[tokio::test]
async fn documents_survive_restart_with_right_password_only() {
    let slot = MemoryBlobStore::new();
    {
        let mut journal = journal_over(&slot);
        journal.unlock("p1").await.unwrap();
        write_song(&journal, "Song A", "hello").await;
    }

    let mut journal = journal_over(&slot);
    assert_eq!(
        journal.unlock("wrong").await,
        Err(AuthError::IncorrectPassword)
    );
    assert_eq!(
        journal.auth_state(),
        &AuthState::Locked {
            last_error: Some(AuthError::IncorrectPassword)
        }
    );
    assert!(journal.documents().is_empty());
    assert!(slot.snapshot().is_some());

    journal.unlock("p1").await.unwrap();
    assert!(journal.is_unlocked());
    let doc = journal.current_document().unwrap();
    assert_eq!(doc.title, "Song A");
    assert_eq!(doc.blocks[0].content, "hello");
    assert_eq!(journal.status().current(), AppStatus::Idle);
}

#[tokio::test]
async fn empty_password_is_rejected_without_touching_storage() {
    let slot = MemoryBlobStore::new();
    let mut journal = journal_over(&slot);
    assert_eq!(journal.unlock("").await, Err(AuthError::MissingPassword));
    assert!(!journal.is_unlocked());
    assert_eq!(journal.status().current(), AppStatus::Idle);
    assert_eq!(slot.write_count(), 0);
}

#[tokio::test]
async fn first_run_accepts_any_password_and_starts_empty() {
    let slot = MemoryBlobStore::new();
    let mut journal = journal_over(&slot);
    journal.unlock("anything").await.unwrap();
    assert!(journal.documents().is_empty());
    assert!(journal.current_document().is_none());
    assert_eq!(slot.write_count(), 0);
}

#[tokio::test]
async fn first_password_becomes_the_journal_password() {
    let slot = MemoryBlobStore::new();
    {
        let mut journal = journal_over(&slot);
        journal.unlock("first").await.unwrap();
        write_song(&journal, "Intro", "la la").await;
    }
    let mut journal = journal_over(&slot);
    assert_eq!(
        journal.unlock("second").await,
        Err(AuthError::IncorrectPassword)
    );
    journal.unlock("first").await.unwrap();
    assert_eq!(journal.documents().len(), 1);
}

#[tokio::test]
async fn lock_clears_decrypted_documents() {
    let slot = MemoryBlobStore::new();
    let mut journal = journal_over(&slot);
    journal.unlock("p1").await.unwrap();
    write_song(&journal, "Song A", "hello").await;

    journal.lock().await.unwrap();
    assert!(!journal.is_unlocked());
    assert!(journal.documents().is_empty());
    assert!(journal.current_document().is_none());
    assert!(matches!(
        journal.create_document("Song B").await,
        Err(JournalError::Store(StoreError::Locked))
    ));

    journal.unlock("p1").await.unwrap();
    assert_eq!(journal.documents().len(), 1);
}

#[tokio::test]
async fn lock_saves_pending_edit() {
    let slot = MemoryBlobStore::new();
    let mut journal = journal_over(&slot);
    journal.unlock("p1").await.unwrap();
    write_song(&journal, "Song A", "hello").await;
    let block = journal.current_document().unwrap().blocks[0].id;
    journal.edit_block(block, "hello again").unwrap();
    assert!(journal.autosave().is_pending());

    journal.lock().await.unwrap();
    journal.unlock("p1").await.unwrap();
    assert_eq!(
        journal.current_document().unwrap().blocks[0].content,
        "hello again"
    );
}

#[tokio::test]
async fn unreadable_blob_reads_as_wrong_password() {
    let slot = MemoryBlobStore::new();
    slot.replace(Some(EncryptedBlob {
        iv: [0; 12],
        data: vec![1, 2, 3],
    }));
    let mut journal = journal_over(&slot);
    assert_eq!(
        journal.unlock("p1").await,
        Err(AuthError::IncorrectPassword)
    );
    assert_eq!(journal.status().current(), AppStatus::Idle);
}

#[tokio::test]
async fn file_store_round_trip_keeps_plaintext_off_disk() {
    let dir = tempdir().unwrap();
    let settings = JournalSettings::default();
    {
        let storage = Arc::new(FileBlobStore::in_dir(dir.path()));
        let mut journal = Journal::with_kdf(storage, &settings, fast_kdf());
        journal.unlock("p1").await.unwrap();
        write_song(&journal, "Midnight Drive", "headlights on the highway").await;
    }

    let raw = std::fs::read_to_string(dir.path().join(BLOB_FILE_NAME)).unwrap();
    assert!(!raw.contains("Midnight Drive"));
    assert!(!raw.contains("headlights"));
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(value["iv"].as_array().unwrap().len(), 12);

    let storage = Arc::new(FileBlobStore::in_dir(dir.path()));
    let mut journal = Journal::with_kdf(storage, &settings, fast_kdf());
    journal.unlock("p1").await.unwrap();
    let doc = journal.current_document().unwrap();
    assert_eq!(doc.title, "Midnight Drive");
    assert_eq!(doc.blocks[0].content, "headlights on the highway");
}

#[tokio::test]
async fn garbage_blob_file_reads_as_wrong_password() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join(BLOB_FILE_NAME), b"not json").unwrap();
    let storage = Arc::new(FileBlobStore::in_dir(dir.path()));
    let mut journal = Journal::with_kdf(storage, &JournalSettings::default(), fast_kdf());
    assert_eq!(
        journal.unlock("p1").await,
        Err(AuthError::IncorrectPassword)
    );
}

#[tokio::test]
async fn failed_save_reports_error_then_recovers() {
    let slot = MemoryBlobStore::new();
    let mut journal = journal_over(&slot);
    journal.unlock("p1").await.unwrap();
    slot.set_fail_writes(true);

    assert!(journal.create_document("Song A").await.is_err());
    assert_eq!(journal.status().current(), AppStatus::Error);
    assert!(journal.status().last_error().is_some());
    assert_eq!(journal.documents().len(), 1);

    slot.set_fail_writes(false);
    journal.flush().await.unwrap();
    assert_eq!(journal.status().current(), AppStatus::Idle);

    let mut reopened = journal_over(&slot);
    reopened.unlock("p1").await.unwrap();
    assert_eq!(reopened.documents().len(), 1);
}

#[tokio::test]
async fn deleting_open_document_selects_nothing_until_opened() {
    let slot = MemoryBlobStore::new();
    let mut journal = journal_over(&slot);
    journal.unlock("p1").await.unwrap();
    let first = journal.create_document("One").await.unwrap();
    let second = journal.create_document("Two").await.unwrap();
    assert_eq!(journal.current_document().unwrap().id, second);

    journal.delete_document(second).await.unwrap();
    assert_eq!(journal.documents().len(), 1);
    journal.open_document(first).unwrap();
    assert_eq!(journal.current_document().unwrap().title, "One");
}
