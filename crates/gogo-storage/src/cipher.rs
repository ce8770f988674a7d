use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use gogo_core::GogoError;

/// AES-GCM nonce length in bytes.
pub const NONCE_LEN: usize = 12;
/// AES-256 key length in bytes.
pub const KEY_LEN: usize = 32;

/// AES-256-GCM over single strings.
///
/// Blobs are `hex(nonce || ciphertext || tag)` with a fresh random nonce per call and no
/// associated data.
pub struct AuthenticatedCipher {
    inner: Aes256Gcm,
}

impl AuthenticatedCipher {
    /// Build a cipher from a raw key. Anything but exactly 32 bytes is rejected.
    pub fn new(key: &[u8]) -> Result<Self, GogoError> {
        if key.len() != KEY_LEN {
            return Err(GogoError::configuration(format!(
                "expected a {KEY_LEN}-byte key, got {} bytes",
                key.len()
            )));
        }
        let inner = Aes256Gcm::new_from_slice(key)
            .map_err(|e| GogoError::configuration(format!("cipher init failed: {e}")))?;
        Ok(Self { inner })
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<String, GogoError> {
        self.encrypt_bytes(plaintext.as_bytes())
    }

    pub fn decrypt(&self, blob: &str) -> Result<String, GogoError> {
        String::from_utf8(self.decrypt_bytes(blob)?)
            .map_err(|_| GogoError::authentication("decrypted value is not valid UTF-8"))
    }

    /// Same blob format as [`encrypt`](Self::encrypt) for payloads that need not be UTF-8.
    pub fn encrypt_bytes(&self, plaintext: &[u8]) -> Result<String, GogoError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let sealed = self
            .inner
            .encrypt(&nonce, plaintext)
            .map_err(|e| GogoError::configuration(format!("encrypt failed: {e}")))?;

        let mut blob = Vec::with_capacity(NONCE_LEN + sealed.len());
        blob.extend_from_slice(nonce.as_slice());
        blob.extend_from_slice(&sealed);
        Ok(hex::encode(blob))
    }

    pub fn decrypt_bytes(&self, blob: &str) -> Result<Vec<u8>, GogoError> {
        let bytes = hex::decode(blob.trim())
            .map_err(|e| GogoError::authentication(format!("malformed ciphertext: {e}")))?;
        if bytes.len() < NONCE_LEN {
            return Err(GogoError::authentication(format!(
                "ciphertext shorter than the {NONCE_LEN}-byte nonce"
            )));
        }

        let (nonce, sealed) = bytes.split_at(NONCE_LEN);
        self.inner
            .decrypt(Nonce::from_slice(nonce), sealed)
            .map_err(|_| GogoError::authentication("wrong key or tampered ciphertext"))
    }
}
