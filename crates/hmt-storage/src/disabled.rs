use crate::backend::{ContentStore, Result, StorageError};
use async_trait::async_trait;

/// Store used when the storage network is switched off.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledStore;

#[async_trait]
impl ContentStore for DisabledStore {
    async fn put(&self, _data: Vec<u8>) -> Result<String> {
        Err(StorageError::Disabled)
    }

    async fn get(&self, _locator: &str) -> Result<Vec<u8>> {
        Err(StorageError::Disabled)
    }
}
