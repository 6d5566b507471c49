//! Password key derivation
//!
//! `derive_key` — PBKDF2-HMAC-SHA256 over a fixed, process-wide salt and
//! iteration count. There is no stored verifier: the only way to check a
//! password is to derive the key again and try it against the stored blob.

use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

pub const KDF_SALT: &[u8] = b"creative-journal-salt-2025";
pub const KDF_ITERATIONS: u32 = 100_000;
pub const KEY_LEN: usize = 32;

/// 32-byte AES key derived from the user password. Zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop, PartialEq, Eq)]
pub struct SessionKey([u8; KEY_LEN]);

impl SessionKey {
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl std::fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionKey(..)")
    }
}

/// Derivation parameters. Fixed once for a session controller; changing
/// either field yields different keys and makes existing blobs unreadable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    pub salt: &'static [u8],
    pub iterations: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            salt: KDF_SALT,
            iterations: KDF_ITERATIONS,
        }
    }
}

/// Derive the session key. Deterministic for a given password and params.
/// An empty password is accepted here; rejecting it is the caller's job.
pub fn derive_key(password: &str, params: &KdfParams) -> SessionKey {
    let mut key = [0u8; KEY_LEN];
    pbkdf2_hmac_sha256(password.as_bytes(), params.salt, params.iterations, &mut key);
    let out = SessionKey(key);
    key.zeroize();
    out
}

/// PBKDF2 (RFC 8018) with HMAC-SHA256 as the PRF.
fn pbkdf2_hmac_sha256(password: &[u8], salt: &[u8], iterations: u32, out: &mut [u8]) {
    pbkdf2::pbkdf2_hmac::<Sha256>(password, salt, iterations.max(1), out);
}
