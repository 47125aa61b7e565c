use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Content not found: {0}")]
    NotFound(String),

    #[error("Storage network disabled")]
    Disabled,
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// A content-addressed blob store.
///
/// Locators are opaque to callers; each backend decides their format.
/// Failures are reported once and never retried here.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Store a blob and return its locator.
    async fn put(&self, data: Vec<u8>) -> Result<String>;

    /// Fetch a blob by locator.
    async fn get(&self, locator: &str) -> Result<Vec<u8>>;
}
