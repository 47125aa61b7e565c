use crate::config::EscrowConfig;
use crate::error::JobError;
use hmt_chain::ContractGateway;
use hmt_storage::{ContentStore, PayloadStore, StorageError};
use std::sync::Arc;

/// Long-lived handles shared by every [`crate::Job`]: the chain gateway,
/// the payload store and the configuration. Cheap to clone.
#[derive(Clone)]
pub struct EscrowContext {
    gateway: Arc<dyn ContractGateway>,
    payloads: PayloadStore,
    config: Arc<EscrowConfig>,
}

impl EscrowContext {
    pub fn new(
        gateway: Arc<dyn ContractGateway>,
        store: Arc<dyn ContentStore>,
        config: EscrowConfig,
    ) -> Self {
        let payloads = PayloadStore::new(store, config.cipher());
        Self {
            gateway,
            payloads,
            config: Arc::new(config),
        }
    }

    /// Build the content store from `config` (IPFS or disabled).
    pub fn from_config(
        gateway: Arc<dyn ContractGateway>,
        config: EscrowConfig,
    ) -> Result<Self, StorageError> {
        let store = config.build_content_store()?;
        Ok(Self::new(gateway, store, config))
    }

    /// Gateway and content store both built from `config`.
    pub fn connect(config: EscrowConfig) -> Result<Self, JobError> {
        let gateway = config.build_gateway()?;
        let store = config.build_content_store()?;
        Ok(Self::new(gateway, store, config))
    }

    pub fn gateway(&self) -> &Arc<dyn ContractGateway> {
        &self.gateway
    }

    pub fn payloads(&self) -> &PayloadStore {
        &self.payloads
    }

    pub fn config(&self) -> &EscrowConfig {
        &self.config
    }
}
