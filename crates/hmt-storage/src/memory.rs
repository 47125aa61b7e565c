use crate::backend::{ContentStore, Result, StorageError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory content store for testing and development.
///
/// Locators are the BLAKE3 hex digest of the stored bytes.
pub struct MemoryStore {
    blobs: Arc<RwLock<HashMap<String, Vec<u8>>>>,
    available: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            blobs: Arc::new(RwLock::new(HashMap::new())),
            available: AtomicBool::new(true),
        }
    }

    /// Simulate the network going away (or coming back).
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub async fn len(&self) -> usize {
        self.blobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.blobs.read().await.is_empty()
    }

    /// Overwrite a stored blob in place. Test hook for corruption scenarios.
    pub async fn replace(&self, locator: &str, data: Vec<u8>) -> Result<()> {
        let mut blobs = self.blobs.write().await;
        match blobs.get_mut(locator) {
            Some(slot) => {
                *slot = data;
                Ok(())
            }
            None => Err(StorageError::NotFound(locator.to_string())),
        }
    }

    fn check_available(&self) -> Result<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StorageError::Unavailable("memory store offline".to_string()))
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn put(&self, data: Vec<u8>) -> Result<String> {
        self.check_available()?;
        let locator = blake3::hash(&data).to_hex().to_string();
        self.blobs.write().await.insert(locator.clone(), data);
        Ok(locator)
    }

    async fn get(&self, locator: &str) -> Result<Vec<u8>> {
        self.check_available()?;
        self.blobs
            .read()
            .await
            .get(locator)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(locator.to_string()))
    }
}
