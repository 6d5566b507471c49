//! Encrypted blob codec
//!
//! AES-256-GCM with a random 96-bit nonce per save.
//! Stored form: `{ "iv": [12 bytes], "data": [ciphertext + 16-byte tag] }`.
//!
//! `decrypt` never reports *why* it failed. A wrong key, a flipped bit and
//! plaintext that is not a valid collection all collapse into
//! [`DecryptFailure`], which is also how a wrong password is detected.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::debug;
use zeroize::Zeroizing;

use crate::error::CodecError;
use crate::kdf::SessionKey;
use crate::model::DocumentCollection;

pub const NONCE_LEN: usize = 12;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedBlob {
    pub iv: [u8; NONCE_LEN],
    pub data: Vec<u8>,
}

/// Negative verification result of [`decrypt`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecryptFailure;

impl std::fmt::Display for DecryptFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("blob could not be decrypted")
    }
}

pub fn encrypt(
    collection: &DocumentCollection,
    key: &SessionKey,
) -> Result<EncryptedBlob, CodecError> {
    let plaintext = Zeroizing::new(serde_json::to_vec(collection)?);
    seal(key, &plaintext)
}

pub fn decrypt(blob: &EncryptedBlob, key: &SessionKey) -> Result<DocumentCollection, DecryptFailure> {
    let plaintext = open(key, blob).map_err(|_| {
        debug!("blob authentication failed");
        DecryptFailure
    })?;
    let collection: DocumentCollection = serde_json::from_slice(&plaintext).map_err(|e| {
        debug!("decrypted blob is not a document collection: {e}");
        DecryptFailure
    })?;
    collection.validate().map_err(|e| {
        debug!("decrypted blob failed validation: {e}");
        DecryptFailure
    })?;
    Ok(collection)
}

fn generate_nonce() -> [u8; NONCE_LEN] {
    let mut nonce = [0u8; NONCE_LEN];
    rand::rngs::OsRng.fill_bytes(&mut nonce);
    nonce
}

pub(crate) fn seal(key: &SessionKey, plaintext: &[u8]) -> Result<EncryptedBlob, CodecError> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()));
    let iv = generate_nonce();
    let data = cipher
        .encrypt(Nonce::from_slice(&iv), plaintext)
        .map_err(|_| CodecError::AeadEncrypt)?;
    Ok(EncryptedBlob { iv, data })
}

fn open(key: &SessionKey, blob: &EncryptedBlob) -> Result<Zeroizing<Vec<u8>>, aes_gcm::Error> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()));
    let plaintext = cipher.decrypt(Nonce::from_slice(&blob.iv), blob.data.as_slice())?;
    Ok(Zeroizing::new(plaintext))
}
