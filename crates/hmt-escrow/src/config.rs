use anyhow::Result;
use hmt_chain::{ChainError, ContractGateway, EvmConfig, EvmGateway};
use hmt_crypto::{EciesCipher, DEFAULT_SHARED_MAC};
use hmt_storage::{ContentStore, DisabledStore, IpfsConfig, IpfsStore, StorageError};
use hmt_types::DEFAULT_GAS_LIMIT;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EscrowConfig {
    /// Gas ceiling used when a call does not name its own.
    pub gas_limit: u64,
    /// How long a mutating call waits for its transaction to be mined.
    pub tx_timeout_secs: u64,
    /// ECIES shared authentication context, as text.
    pub shared_mac: String,
    pub chain: EvmConfig,
    pub storage: StorageSettings,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub disabled: bool,
    pub ipfs: IpfsConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// `pretty`, `compact` or `json`.
    pub format: String,
    pub file_output: Option<PathBuf>,
}

impl Default for EscrowConfig {
    fn default() -> Self {
        Self {
            gas_limit: DEFAULT_GAS_LIMIT,
            tx_timeout_secs: 120,
            shared_mac: String::from_utf8_lossy(DEFAULT_SHARED_MAC).into_owned(),
            chain: EvmConfig::default(),
            storage: StorageSettings::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            file_output: None,
        }
    }
}

impl EscrowConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Defaults with the process environment applied on top.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| env::var(key).ok());
    }

    /// Apply overrides from any key/value source. Unparseable numbers are
    /// ignored and the current value kept.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(gas) = lookup("GAS_LIMIT") {
            if let Ok(gas) = gas.trim().parse() {
                self.gas_limit = gas;
            }
        }
        if let Some(secs) = lookup("TX_TIMEOUT_SECS") {
            if let Ok(secs) = secs.trim().parse() {
                self.tx_timeout_secs = secs;
            }
        }
        if let Some(url) = lookup("HMT_ETH_SERVER") {
            if !url.is_empty() {
                self.chain.rpc_url = url;
            }
        }
        if let Some(token) = lookup("HMTOKEN_ADDR") {
            if let Ok(token) = token.parse() {
                self.chain.hmt_token = Some(token);
            }
        }
        if let Some(chain_id) = lookup("CHAIN_ID") {
            if let Ok(chain_id) = chain_id.trim().parse() {
                self.chain.chain_id = Some(chain_id);
            }
        }
        if let Some(disable) = lookup("IPFS_DISABLE") {
            self.storage.disabled = !disable.is_empty();
        }
        if let Some(host) = lookup("IPFS_HOSTNAME") {
            if !host.is_empty() {
                self.storage.ipfs.hostname = host;
            }
        }
        if let Some(port) = lookup("IPFS_TCP_PORT") {
            if let Ok(port) = port.trim().parse() {
                self.storage.ipfs.port = port;
            }
        }
        if let Some(mac) = lookup("SHARED_MAC") {
            self.shared_mac = mac;
        }
        if let Some(level) = lookup("LOG_LEVEL") {
            if !level.is_empty() {
                self.logging.level = level;
            }
        }
    }

    pub fn tx_timeout(&self) -> Duration {
        Duration::from_secs(self.tx_timeout_secs)
    }

    pub fn cipher(&self) -> EciesCipher {
        EciesCipher::new(self.shared_mac.as_bytes().to_vec())
    }

    /// Gateway to the node at `chain.rpc_url`.
    pub fn build_gateway(&self) -> std::result::Result<Arc<dyn ContractGateway>, ChainError> {
        let gateway = EvmGateway::new(self.chain.clone())?;
        Ok(Arc::new(gateway))
    }

    /// The live IPFS store, or the disabled store when storage is off.
    pub fn build_content_store(&self) -> std::result::Result<Arc<dyn ContentStore>, StorageError> {
        if self.storage.disabled {
            info!("Storage network disabled");
            return Ok(Arc::new(DisabledStore));
        }

        let store = IpfsStore::new(&self.storage.ipfs)?;
        info!(
            host = %self.storage.ipfs.hostname,
            port = self.storage.ipfs.port,
            "📦 IPFS store configured"
        );
        Ok(Arc::new(store))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = EscrowConfig::default();
        assert_eq!(config.gas_limit, 4_712_388);
        assert_eq!(config.tx_timeout(), Duration::from_secs(120));
        assert_eq!(config.storage.ipfs.hostname, "localhost");
        assert_eq!(config.storage.ipfs.port, 5001);
        assert!(!config.storage.disabled);
        assert_eq!(config.cipher().shared_mac(), DEFAULT_SHARED_MAC);
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("GAS_LIMIT", "5000000"),
            ("TX_TIMEOUT_SECS", "not a number"),
            ("IPFS_DISABLE", "1"),
            ("IPFS_HOSTNAME", "ipfs"),
            ("IPFS_TCP_PORT", "5002"),
            ("SHARED_MAC", "abc"),
            ("HMT_ETH_SERVER", "http://ganache:8545"),
            ("HMTOKEN_ADDR", "0x9b0ff099c4e8df24ec4b3bcb2adfd1f8f0d2c9d6"),
            ("CHAIN_ID", "1337"),
            ("LOG_LEVEL", "debug"),
        ]
        .into_iter()
        .collect();

        let mut config = EscrowConfig::default();
        config.apply_overrides(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.gas_limit, 5_000_000);
        assert_eq!(config.tx_timeout_secs, 120);
        assert!(config.storage.disabled);
        assert_eq!(config.storage.ipfs.hostname, "ipfs");
        assert_eq!(config.storage.ipfs.port, 5002);
        assert_eq!(config.cipher().shared_mac(), b"abc");
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.chain.rpc_url, "http://ganache:8545");
        assert_eq!(
            config.chain.hmt_token,
            Some("0x9b0ff099c4e8df24ec4b3bcb2adfd1f8f0d2c9d6".parse().unwrap())
        );
        assert_eq!(config.chain.chain_id, Some(1337));
        assert!(config.build_gateway().is_ok());
    }

    #[test]
    fn test_gateway_requires_token() {
        let config = EscrowConfig::default();
        assert!(matches!(
            config.build_gateway(),
            Err(ChainError::Configuration(_))
        ));
    }

    #[test]
    fn test_empty_disable_flag_keeps_storage_on() {
        let mut config = EscrowConfig::default();
        config.apply_overrides(|k| (k == "IPFS_DISABLE").then(String::new));
        assert!(!config.storage.disabled);
    }

    #[tokio::test]
    async fn test_disabled_store_selected() {
        let mut config = EscrowConfig::default();
        config.storage.disabled = true;
        let store = config.build_content_store().unwrap();
        assert_eq!(store.put(vec![1]).await, Err(StorageError::Disabled));
    }
}
