use crate::backend::{ContentStore, StorageError};
use crate::canonical_json::{to_canonical_json, CanonicalJsonError};
use hmt_crypto::{EciesCipher, PrivateKey, PublicKey};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum PayloadError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Decryption failed: {0}")]
    Decryption(String),

    #[error("Encryption failed: {0}")]
    Encryption(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Digest mismatch: expected {expected}, got {actual}")]
    DigestMismatch { expected: String, actual: String },
}

impl From<CanonicalJsonError> for PayloadError {
    fn from(e: CanonicalJsonError) -> Self {
        PayloadError::Serialization(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PayloadError>;

/// Where an uploaded payload lives and what it hashes to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadRef {
    /// SHA-1 hex of the canonical plaintext.
    pub hash: String,
    /// Store locator of the ciphertext.
    pub url: String,
}

/// Encrypt-and-upload / download-and-decrypt over a [`ContentStore`].
#[derive(Clone)]
pub struct PayloadStore {
    store: Arc<dyn ContentStore>,
    cipher: EciesCipher,
}

impl PayloadStore {
    pub fn new(store: Arc<dyn ContentStore>, cipher: EciesCipher) -> Self {
        Self { store, cipher }
    }

    pub fn store(&self) -> &Arc<dyn ContentStore> {
        &self.store
    }

    pub fn cipher(&self) -> &EciesCipher {
        &self.cipher
    }

    pub async fn upload<T: Serialize>(
        &self,
        payload: &T,
        recipient: &PublicKey,
    ) -> Result<PayloadRef> {
        let text = to_canonical_json(payload)?;
        let hash = hex::encode(Sha1::digest(text.as_bytes()));

        let sealed = self
            .cipher
            .encrypt(text.as_bytes(), recipient)
            .map_err(|e| PayloadError::Encryption(e.to_string()))?;
        let size = sealed.len();
        let url = self.store.put(sealed).await?;

        debug!(hash = %hash, url = %url, size, "Payload uploaded");
        Ok(PayloadRef { hash, url })
    }

    pub async fn download<T: DeserializeOwned>(&self, url: &str, key: &PrivateKey) -> Result<T> {
        let plaintext = self.fetch_plaintext(url, key).await?;
        parse(&plaintext)
    }

    /// Download and check the plaintext against a published digest.
    pub async fn download_verified<T: DeserializeOwned>(
        &self,
        url: &str,
        expected_hash: &str,
        key: &PrivateKey,
    ) -> Result<T> {
        let plaintext = self.fetch_plaintext(url, key).await?;
        let actual = hex::encode(Sha1::digest(&plaintext));
        if !actual.eq_ignore_ascii_case(expected_hash) {
            return Err(PayloadError::DigestMismatch {
                expected: expected_hash.to_string(),
                actual,
            });
        }
        parse(&plaintext)
    }

    async fn fetch_plaintext(&self, url: &str, key: &PrivateKey) -> Result<Vec<u8>> {
        let sealed = self.store.get(url).await?;
        let plaintext = self
            .cipher
            .decrypt(&sealed, key)
            .map_err(|e| PayloadError::Decryption(e.to_string()))?;
        debug!(url = %url, size = plaintext.len(), "Payload downloaded");
        Ok(plaintext)
    }
}

fn parse<T: DeserializeOwned>(plaintext: &[u8]) -> Result<T> {
    serde_json::from_slice(plaintext).map_err(|e| PayloadError::Serialization(e.to_string()))
}
