//! Value Encryption Module
//!
//! AES-256-GCM encryption for sensitive cache values, plus the pattern
//! match that decides which (key, value) pairs count as sensitive.
//!
//! Each encrypted value gets a fresh random 12-byte nonce; the GCM tag
//! is kept alongside the ciphertext and is required for decryption.

use aes_gcm::{
    aead::{generic_array::GenericArray, Aead, KeyInit},
    Aes256Gcm,
};
use rand::RngCore;
use serde_json::Value;

use crate::error::{CacheError, Result};

// == Constants ==
/// GCM nonce length in bytes.
const NONCE_LEN: usize = 12;

/// GCM authentication tag length in bytes.
const TAG_LEN: usize = 16;

/// Substrings that mark a key or value as sensitive regardless of
/// caller configuration.
pub const BUILTIN_SENSITIVE_PATTERNS: &[&str] = &[
    "password",
    "token",
    "secret",
    "key",
    "auth",
    "credential",
    "private",
    "confidential",
    "secure",
    "sensitive",
];

// == Cipher Record ==
/// Opaque encrypted payload: ciphertext, nonce, and authentication tag.
#[derive(Debug, Clone)]
pub struct CipherRecord {
    /// Ciphertext bytes
    pub data: Vec<u8>,
    /// Nonce used for this record
    pub iv: Vec<u8>,
    /// GCM authentication tag
    pub tag: Vec<u8>,
}

impl CipherRecord {
    /// Total stored length in bytes, used for size accounting.
    pub fn len(&self) -> u64 {
        (self.data.len() + self.iv.len() + self.tag.len()) as u64
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

// == Value Encryptor ==
/// AES-256-GCM encryptor with a sensitivity pattern set.
///
/// The cipher key is immutable for the lifetime of the instance.
pub struct ValueEncryptor {
    cipher: Aes256Gcm,
    patterns: Vec<String>,
}

impl std::fmt::Debug for ValueEncryptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Key material never appears in debug output
        f.debug_struct("ValueEncryptor")
            .field("patterns", &self.patterns)
            .finish()
    }
}

impl ValueEncryptor {
    // == Constructor ==
    /// Creates an encryptor from a 32-byte key and extra sensitivity
    /// patterns supplied by configuration.
    pub fn new(key: &[u8; 32], extra_patterns: &[String]) -> Result<Self> {
        let cipher = Aes256Gcm::new_from_slice(key)
            .map_err(|e| CacheError::EncryptionError(format!("Invalid cipher key: {e}")))?;

        let mut patterns: Vec<String> = BUILTIN_SENSITIVE_PATTERNS
            .iter()
            .map(|p| p.to_string())
            .collect();
        patterns.extend(extra_patterns.iter().map(|p| p.to_lowercase()));

        Ok(Self { cipher, patterns })
    }

    /// Creates an encryptor from a 64-character hex key string.
    pub fn from_hex_key(hex_key: &str, extra_patterns: &[String]) -> Result<Self> {
        let bytes = hex::decode(hex_key)
            .map_err(|e| CacheError::EncryptionError(format!("Invalid hex key: {e}")))?;
        let key: [u8; 32] = bytes.try_into().map_err(|_| {
            CacheError::EncryptionError("Cipher key must be 64 hex characters".to_string())
        })?;
        Self::new(&key, extra_patterns)
    }

    /// Generates a random 32-byte key.
    pub fn generate_key() -> [u8; 32] {
        let mut key = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut key);
        key
    }

    // == Sensitivity ==
    /// Decides whether a (key, value) pair should be encrypted.
    ///
    /// Matches the lowercase key and the lowercase JSON encoding of the
    /// value against the pattern set.
    pub fn is_sensitive(&self, key: &str, value: &Value) -> bool {
        let key_lower = key.to_lowercase();
        if self.patterns.iter().any(|p| key_lower.contains(p)) {
            return true;
        }
        match serde_json::to_string(value) {
            Ok(text) => {
                let text_lower = text.to_lowercase();
                self.patterns.iter().any(|p| text_lower.contains(p))
            }
            Err(_) => false,
        }
    }

    // == Encrypt ==
    /// Encrypts a value into a cipher record with a fresh random nonce.
    pub fn encrypt(&self, value: &Value) -> Result<CipherRecord> {
        let plaintext = serde_json::to_vec(value)
            .map_err(|e| CacheError::EncryptionError(format!("Value encoding failed: {e}")))?;

        let mut iv = vec![0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut iv);

        let sealed = self
            .cipher
            .encrypt(GenericArray::from_slice(&iv), plaintext.as_ref())
            .map_err(|_| CacheError::EncryptionError("Value encryption failed".to_string()))?;

        // The aead output is ciphertext || tag; keep them separate
        let split = sealed.len() - TAG_LEN;
        let tag = sealed[split..].to_vec();
        let data = sealed[..split].to_vec();

        Ok(CipherRecord { data, iv, tag })
    }

    // == Decrypt ==
    /// Decrypts a cipher record back into a value.
    ///
    /// Fails if the tag does not authenticate or the plaintext is not
    /// valid JSON.
    pub fn decrypt(&self, record: &CipherRecord) -> Result<Value> {
        if record.iv.len() != NONCE_LEN || record.tag.len() != TAG_LEN {
            return Err(CacheError::EncryptionError(
                "Malformed cipher record".to_string(),
            ));
        }

        let mut sealed = Vec::with_capacity(record.data.len() + TAG_LEN);
        sealed.extend_from_slice(&record.data);
        sealed.extend_from_slice(&record.tag);

        let plaintext = self
            .cipher
            .decrypt(GenericArray::from_slice(&record.iv), sealed.as_ref())
            .map_err(|_| CacheError::EncryptionError("Value decryption failed".to_string()))?;

        serde_json::from_slice(&plaintext)
            .map_err(|e| CacheError::EncryptionError(format!("Value decoding failed: {e}")))
    }
}
