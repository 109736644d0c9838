//! Payload encryption using ChaCha20-Poly1305
//!
//! Every shared object has one `Secret`, generated in the client and carried
//! only in the URL fragment of its share link. The server stores what this
//! module produces and never sees the key.

use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Key, Nonce,
};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Size of ChaCha20-Poly1305 nonce in bytes
pub const NONCE_SIZE: usize = 12;
/// Size of ChaCha20-Poly1305 key in bytes (256 bits)
pub const SECRET_SIZE: usize = 32;
/// Size of the Poly1305 authentication tag
pub const TAG_SIZE: usize = 16;
/// Bytes of the key fingerprint stored in each envelope
pub const KEY_CHECK_SIZE: usize = 4;
/// Current envelope format
pub const FORMAT_VERSION: u8 = 1;

const HEADER_SIZE: usize = 1 + KEY_CHECK_SIZE + NONCE_SIZE;
const KEY_CHECK_CONTEXT: &str = "ephemera 2024 envelope key check";

#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("malformed ciphertext: {0}")]
    Malformed(&'static str),
    #[error("ciphertext was sealed with a different key")]
    WrongKey,
    #[error("ciphertext failed authentication")]
    Corrupted,
    #[error("invalid key: {0}")]
    InvalidKey(String),
    #[error("plaintext is not valid: {0}")]
    Payload(#[from] serde_json::Error),
    #[error("system entropy source unavailable")]
    Entropy,
    #[error("encryption failed")]
    Encrypt,
}

impl SecretError {
    /// True for the errors a user sees as "invalid or corrupted link"
    pub fn is_decryption_failure(&self) -> bool {
        matches!(
            self,
            SecretError::Malformed(_) | SecretError::WrongKey | SecretError::Corrupted
        )
    }
}

/// A 256-bit symmetric key for one shared object
///
/// Envelope format:
/// `version (1) || key_check (4) || nonce (12) || ciphertext || tag (16)`.
///
/// `key_check` is a truncated keyed BLAKE3 digest of the key. It lets
/// [`Secret::decrypt`] tell "wrong key" apart from "damaged ciphertext"
/// without weakening the key.
#[derive(PartialEq, Eq, Clone)]
pub struct Secret([u8; SECRET_SIZE]);

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(..)")
    }
}

impl From<[u8; SECRET_SIZE]> for Secret {
    fn from(bytes: [u8; SECRET_SIZE]) -> Self {
        Secret(bytes)
    }
}

impl Secret {
    /// Generate a new random secret using a cryptographically secure RNG
    pub fn generate() -> Result<Self, SecretError> {
        let mut buff = [0; SECRET_SIZE];
        getrandom::getrandom(&mut buff).map_err(|_| SecretError::Entropy)?;
        Ok(Self(buff))
    }

    pub fn from_slice(data: &[u8]) -> Result<Self, SecretError> {
        let bytes: [u8; SECRET_SIZE] = data.try_into().map_err(|_| {
            SecretError::InvalidKey(format!(
                "expected {} bytes, got {}",
                SECRET_SIZE,
                data.len()
            ))
        })?;
        Ok(bytes.into())
    }

    pub fn bytes(&self) -> &[u8] {
        self.0.as_ref()
    }

    /// Encode for a URL fragment (base64url, no padding)
    pub fn to_fragment(&self) -> String {
        URL_SAFE_NO_PAD.encode(self.0)
    }

    pub fn from_fragment(fragment: &str) -> Result<Self, SecretError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(fragment.trim_start_matches('#'))
            .map_err(|e| SecretError::InvalidKey(e.to_string()))?;
        Self::from_slice(&bytes)
    }

    fn key_check(&self) -> [u8; KEY_CHECK_SIZE] {
        let digest = blake3::derive_key(KEY_CHECK_CONTEXT, &self.0);
        let mut check = [0u8; KEY_CHECK_SIZE];
        check.copy_from_slice(&digest[..KEY_CHECK_SIZE]);
        check
    }

    fn cipher(&self) -> ChaCha20Poly1305 {
        ChaCha20Poly1305::new(Key::from_slice(self.bytes()))
    }

    /// Seal `data` under a fresh random nonce
    pub fn encrypt(&self, data: &[u8]) -> Result<Vec<u8>, SecretError> {
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        getrandom::getrandom(&mut nonce_bytes).map_err(|_| SecretError::Entropy)?;
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher()
            .encrypt(nonce, data)
            .map_err(|_| SecretError::Encrypt)?;

        let mut out = Vec::with_capacity(HEADER_SIZE + ciphertext.len());
        out.push(FORMAT_VERSION);
        out.extend_from_slice(&self.key_check());
        out.extend_from_slice(nonce.as_ref());
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    /// Open an envelope produced by [`Secret::encrypt`]
    ///
    /// # Errors
    ///
    /// - `Malformed` if the envelope is truncated or of an unknown format
    /// - `WrongKey` if it was sealed under another key
    /// - `Corrupted` if the key matches but authentication fails
    pub fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>, SecretError> {
        if data.len() < HEADER_SIZE + TAG_SIZE {
            return Err(SecretError::Malformed("envelope too short"));
        }
        if data[0] != FORMAT_VERSION {
            return Err(SecretError::Malformed("unknown envelope version"));
        }
        if data[1..1 + KEY_CHECK_SIZE] != self.key_check() {
            return Err(SecretError::WrongKey);
        }

        let nonce = Nonce::from_slice(&data[1 + KEY_CHECK_SIZE..HEADER_SIZE]);
        self.cipher()
            .decrypt(nonce, &data[HEADER_SIZE..])
            .map_err(|_| SecretError::Corrupted)
    }

    pub fn encrypt_json<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, SecretError> {
        let plaintext = serde_json::to_vec(value)?;
        self.encrypt(&plaintext)
    }

    pub fn decrypt_json<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, SecretError> {
        let plaintext = self.decrypt(data)?;
        Ok(serde_json::from_slice(&plaintext)?)
    }
}
