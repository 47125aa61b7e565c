use crate::backend::{ContentStore, Result, StorageError};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error};

/// Connection settings for an IPFS HTTP API node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IpfsConfig {
    pub hostname: String,
    pub port: u16,
    pub timeout_secs: u64,
}

impl Default for IpfsConfig {
    fn default() -> Self {
        Self {
            hostname: "localhost".to_string(),
            port: 5001,
            timeout_secs: 30,
        }
    }
}

impl IpfsConfig {
    pub fn api_base(&self) -> String {
        format!("http://{}:{}/api/v0", self.hostname, self.port)
    }
}

#[derive(Debug, Deserialize)]
struct AddResponse {
    #[serde(rename = "Hash")]
    hash: String,
}

/// [`ContentStore`] backed by the IPFS HTTP API (`add` / `cat`).
pub struct IpfsStore {
    client: reqwest::Client,
    base: String,
}

impl IpfsStore {
    pub fn new(config: &IpfsConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| StorageError::Unavailable(format!("http client: {}", e)))?;

        Ok(Self {
            client,
            base: config.api_base(),
        })
    }
}

#[async_trait]
impl ContentStore for IpfsStore {
    async fn put(&self, data: Vec<u8>) -> Result<String> {
        let size = data.len();
        let form = Form::new().part("file", Part::bytes(data).file_name("payload"));

        let response = self
            .client
            .post(format!("{}/add", self.base))
            .multipart(form)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                error!(error = %e, "Adding bytes with IPFS failed");
                StorageError::Unavailable(e.to_string())
            })?;

        let added: AddResponse = response
            .json()
            .await
            .map_err(|e| StorageError::Unavailable(format!("bad add response: {}", e)))?;

        debug!(cid = %added.hash, size, "Stored blob on IPFS");
        Ok(added.hash)
    }

    async fn get(&self, locator: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .post(format!("{}/cat", self.base))
            .query(&[("arg", locator)])
            .send()
            .await
            .map_err(|e| {
                error!(cid = %locator, error = %e, "Reading the key with IPFS failed");
                StorageError::Unavailable(e.to_string())
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(cid = %locator, %status, "IPFS cat rejected");
            return Err(StorageError::NotFound(format!("{}: {} {}", locator, status, body)));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_base() {
        let config = IpfsConfig {
            hostname: "ipfs.local".to_string(),
            port: 5002,
            timeout_secs: 5,
        };
        assert_eq!(config.api_base(), "http://ipfs.local:5002/api/v0");
        assert!(IpfsStore::new(&config).is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_node_is_unavailable() {
        let config = IpfsConfig {
            hostname: "127.0.0.1".to_string(),
            port: 1,
            timeout_secs: 2,
        };
        let store = IpfsStore::new(&config).unwrap();
        assert!(matches!(
            store.put(vec![1, 2, 3]).await,
            Err(StorageError::Unavailable(_))
        ));
    }
}
