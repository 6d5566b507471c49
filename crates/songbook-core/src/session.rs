//! Session / auth controller.
//!
//! There is no account and no stored password hash. The first password ever
//! used encrypts the first save, and from then on the only check is whether a
//! freshly derived key decrypts the stored blob. A forgotten password cannot
//! be recovered: the documents are gone with it.

use tracing::{info, warn};
use zeroize::Zeroizing;

use crate::error::{AuthError, JournalError};
use crate::kdf::{derive_key, KdfParams};
use crate::status::AppStatus;
use crate::store::DocumentStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    Locked { last_error: Option<AuthError> },
    Unlocked,
}

pub struct Session {
    store: DocumentStore,
    params: KdfParams,
    state: AuthState,
}

impl Session {
    pub fn new(store: DocumentStore, params: KdfParams) -> Self {
        Self {
            store,
            params,
            state: AuthState::Locked { last_error: None },
        }
    }

    pub fn state(&self) -> &AuthState {
        &self.state
    }

    pub fn is_unlocked(&self) -> bool {
        matches!(self.state, AuthState::Unlocked)
    }

    /// Derive the key from `password` and prove it against the stored blob.
    /// With no blob at all (first run) any non-empty password is accepted and
    /// becomes the journal password. Already unlocked sessions are left as is.
    pub async fn attempt_unlock(&mut self, password: &str) -> Result<(), AuthError> {
        if self.is_unlocked() {
            return Ok(());
        }
        if password.is_empty() {
            return self.reject(AuthError::MissingPassword);
        }

        let status = self.store.status().clone();
        status.transition(AppStatus::Fetching);
        let password = Zeroizing::new(password.to_owned());
        let params = self.params;
        let key = match tokio::task::spawn_blocking(move || derive_key(&password, &params)).await
        {
            Ok(key) => key,
            Err(e) => {
                warn!("key derivation task failed: {e}");
                status.fail(e.to_string());
                return self.reject(AuthError::Failed);
            }
        };

        match self.store.fetch(&key).await {
            Ok(collection) => {
                let documents = collection.len();
                self.store.adopt(key, collection);
                self.state = AuthState::Unlocked;
                info!(documents, "journal unlocked");
                Ok(())
            }
            Err(JournalError::Auth(e)) => self.reject(e),
            Err(e) => {
                warn!("unlock failed: {e}");
                self.reject(AuthError::Failed)
            }
        }
    }

    /// Forget the key and all decrypted documents.
    pub fn lock(&mut self) {
        self.store.clear();
        self.state = AuthState::Locked { last_error: None };
        info!("journal locked");
    }

    fn reject(&mut self, error: AuthError) -> Result<(), AuthError> {
        info!("unlock rejected: {error}");
        self.state = AuthState::Locked {
            last_error: Some(error.clone()),
        };
        Err(error)
    }
}
