use crate::abi::{self, decode_returns, Escrow, EscrowFactory, HMToken};
use crate::error::{ChainError, Result};
use crate::gateway::ContractGateway;
use crate::rpc::{decode_hex, parse_quantity, JsonRpcClient, RpcReceipt};
use crate::tx::LegacyTransaction;
use crate::types::{BulkPayoutCall, CallOptions, EscrowSetup, TxOptions, TxReceipt};
use alloy_primitives::U256;
use alloy_sol_types::{SolCall, SolValue};
use async_trait::async_trait;
use hmt_types::{Address, HmtAmount};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info, warn};

/// Connection settings for a live EVM node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvmConfig {
    pub rpc_url: String,
    /// Deployed HMToken contract.
    pub hmt_token: Option<Address>,
    /// Read from the node when unset.
    pub chain_id: Option<u64>,
    /// Read from the node (`eth_gasPrice`) when unset.
    pub gas_price_wei: Option<u64>,
    /// Hex creation code of EscrowFactory, needed only to deploy new factories.
    pub factory_bytecode: Option<String>,
    pub poll_interval_ms: u64,
    pub request_timeout_secs: u64,
}

impl Default for EvmConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://localhost:8545".to_string(),
            hmt_token: None,
            chain_id: None,
            gas_price_wei: None,
            factory_bytecode: None,
            poll_interval_ms: 1_000,
            request_timeout_secs: 30,
        }
    }
}

/// [`ContractGateway`] against a JSON-RPC node. Transactions are signed
/// locally with the caller's key and sent raw.
pub struct EvmGateway {
    rpc: JsonRpcClient,
    token: Address,
    config: EvmConfig,
    chain_id: OnceCell<u64>,
    // Nonce fetch and send must not interleave between jobs.
    send_lock: Mutex<()>,
}

impl EvmGateway {
    pub fn new(config: EvmConfig) -> Result<Self> {
        let token = config
            .hmt_token
            .ok_or_else(|| ChainError::Configuration("HMToken address is not set".to_string()))?;
        let rpc = JsonRpcClient::new(
            &config.rpc_url,
            Duration::from_secs(config.request_timeout_secs),
        )?;

        info!(rpc = %config.rpc_url, token = %token, "⛓️ EVM gateway configured");
        Ok(Self {
            rpc,
            token,
            config,
            chain_id: OnceCell::new(),
            send_lock: Mutex::new(()),
        })
    }

    pub fn config(&self) -> &EvmConfig {
        &self.config
    }

    async fn chain_id(&self) -> Result<u64> {
        if let Some(id) = self.config.chain_id {
            return Ok(id);
        }
        self.chain_id
            .get_or_try_init(|| self.rpc.chain_id())
            .await
            .copied()
    }

    async fn gas_price(&self) -> Result<u128> {
        match self.config.gas_price_wei {
            Some(price) => Ok(u128::from(price)),
            None => self.rpc.gas_price().await,
        }
    }

    async fn require_code(&self, address: Address) -> Result<()> {
        if self.rpc.get_code(address).await?.is_empty() {
            return Err(ChainError::NoContract(address));
        }
        Ok(())
    }

    async fn view<C: SolCall>(&self, to: Address, call: &C, opts: CallOptions) -> Result<C::Return> {
        let out = self.rpc.call(opts.from, to, opts.gas, &call.abi_encode()).await?;
        if out.is_empty() {
            self.require_code(to).await?;
        }
        decode_returns::<C>(&out)
    }

    async fn transact<C: SolCall>(&self, to: Address, call: &C, tx: TxOptions<'_>) -> Result<TxReceipt> {
        self.require_code(to).await?;
        self.send(Some(to), call.abi_encode(), C::SIGNATURE, tx).await
    }

    /// Estimate, sign, send, then poll until mined. Fails before sending
    /// when the estimate exceeds the caller's gas limit.
    async fn send(&self, to: Option<Address>, data: Vec<u8>, what: &str, tx: TxOptions<'_>) -> Result<TxReceipt> {
        let from = tx.from();
        let required = self.rpc.estimate_gas(from, to, &data).await?;
        if required > tx.gas {
            return Err(ChainError::OutOfGas {
                limit: tx.gas,
                required,
            });
        }

        let chain_id = self.chain_id().await?;
        let gas_price = self.gas_price().await?;

        let tx_hash = {
            let _guard = self.send_lock.lock().await;
            let nonce = self.rpc.transaction_count(from).await?;
            let raw = LegacyTransaction {
                nonce,
                gas_price,
                gas_limit: tx.gas,
                to,
                value: 0,
                data,
                chain_id,
            }
            .sign(tx.signer.gas_payer_priv())?;
            self.rpc.send_raw_transaction(&raw).await?
        };
        debug!(call = what, tx_hash = %tx_hash, gas_limit = tx.gas, estimate = required, "Transaction sent");

        let receipt = self.wait_for_receipt(&tx_hash).await?;
        if !receipt.succeeded() {
            warn!(call = what, tx_hash = %tx_hash, "Transaction reverted");
            return Err(ChainError::Reverted(format!("{} reverted in {}", what, tx_hash)));
        }
        to_receipt(receipt)
    }

    async fn wait_for_receipt(&self, tx_hash: &str) -> Result<RpcReceipt> {
        let interval = Duration::from_millis(self.config.poll_interval_ms.max(1));
        loop {
            if let Some(receipt) = self.rpc.transaction_receipt(tx_hash).await? {
                if receipt.block_number.is_some() {
                    return Ok(receipt);
                }
            }
            tokio::time::sleep(interval).await;
        }
    }
}

fn to_receipt(receipt: RpcReceipt) -> Result<TxReceipt> {
    let block_number = match receipt.block_number.as_deref() {
        Some(n) => parse_quantity(n)?,
        None => 0,
    };
    let gas_used = parse_quantity(&receipt.gas_used)?;
    let contract_address = receipt
        .contract_address
        .as_deref()
        .map(|a| {
            a.parse::<Address>()
                .map_err(|e| ChainError::Rpc(format!("bad contract address: {}", e)))
        })
        .transpose()?;

    Ok(TxReceipt {
        tx_hash: receipt.transaction_hash,
        block_number: u64::try_from(block_number)
            .map_err(|_| ChainError::Rpc("block number exceeds u64".to_string()))?,
        gas_used: u64::try_from(gas_used)
            .map_err(|_| ChainError::Rpc("gas used exceeds u64".to_string()))?,
        contract_address,
    })
}

/// Creation code followed by the ABI-encoded `constructor(address token)`.
fn factory_deployment(bytecode: &str, token: Address) -> Result<Vec<u8>> {
    let mut data = decode_hex(bytecode.trim())
        .map_err(|e| ChainError::Configuration(format!("factory bytecode: {}", e)))?;
    if data.is_empty() {
        return Err(ChainError::Configuration("factory bytecode is empty".to_string()));
    }
    data.extend(abi::to_sol_address(token).abi_encode());
    Ok(data)
}

#[async_trait]
impl ContractGateway for EvmGateway {
    async fn deploy_factory(&self, tx: TxOptions<'_>) -> Result<Address> {
        let bytecode = self.config.factory_bytecode.as_deref().ok_or_else(|| {
            ChainError::Configuration("no factory bytecode configured; pass an existing factory".to_string())
        })?;
        let data = factory_deployment(bytecode, self.token)?;

        let receipt = self.send(None, data, "EscrowFactory deployment", tx).await?;
        let factory = receipt.contract_address.ok_or_else(|| {
            ChainError::Rpc(format!("deployment {} has no contract address", receipt.tx_hash))
        })?;
        info!(factory = %factory, block = receipt.block_number, "🏭 Factory deployed");
        Ok(factory)
    }

    async fn create_escrow(&self, factory: Address, tx: TxOptions<'_>) -> Result<TxReceipt> {
        self.transact(factory, &EscrowFactory::createEscrowCall {}, tx).await
    }

    async fn last_escrow(&self, factory: Address, call: CallOptions) -> Result<Address> {
        let ret = self.view(factory, &EscrowFactory::getLastEscrowCall {}, call).await?;
        Ok(abi::from_sol_address(ret._0))
    }

    async fn has_escrow(&self, factory: Address, escrow: Address, call: CallOptions) -> Result<bool> {
        let args = EscrowFactory::hasEscrowCall {
            escrow: abi::to_sol_address(escrow),
        };
        Ok(self.view(factory, &args, call).await?._0)
    }

    async fn transfer_hmt(&self, to: Address, amount: HmtAmount, tx: TxOptions<'_>) -> Result<TxReceipt> {
        let args = HMToken::transferCall {
            to: abi::to_sol_address(to),
            value: abi::amount_to_u256(amount),
        };
        self.transact(self.token, &args, tx).await
    }

    async fn escrow_status_raw(&self, escrow: Address, call: CallOptions) -> Result<u8> {
        Ok(self.view(escrow, &Escrow::getStatusCall {}, call).await?._0)
    }

    async fn manifest_url(&self, escrow: Address, call: CallOptions) -> Result<String> {
        Ok(self.view(escrow, &Escrow::getManifestUrlCall {}, call).await?._0)
    }

    async fn manifest_hash(&self, escrow: Address, call: CallOptions) -> Result<String> {
        Ok(self.view(escrow, &Escrow::getManifestHashCall {}, call).await?._0)
    }

    async fn intermediate_results_url(&self, escrow: Address, call: CallOptions) -> Result<String> {
        Ok(self
            .view(escrow, &Escrow::getIntermediateResultsUrlCall {}, call)
            .await?
            ._0)
    }

    async fn intermediate_results_hash(&self, escrow: Address, call: CallOptions) -> Result<String> {
        Ok(self
            .view(escrow, &Escrow::getIntermediateResultsHashCall {}, call)
            .await?
            ._0)
    }

    async fn final_results_url(&self, escrow: Address, call: CallOptions) -> Result<String> {
        Ok(self.view(escrow, &Escrow::getFinalResultsUrlCall {}, call).await?._0)
    }

    async fn balance(&self, escrow: Address, call: CallOptions) -> Result<HmtAmount> {
        let ret = self.view(escrow, &Escrow::getBalanceCall {}, call).await?;
        abi::u256_to_amount(ret._0)
    }

    async fn launcher(&self, escrow: Address, call: CallOptions) -> Result<Address> {
        let ret = self.view(escrow, &Escrow::getLauncherCall {}, call).await?;
        Ok(abi::from_sol_address(ret._0))
    }

    async fn bulk_paid(&self, escrow: Address, call: CallOptions) -> Result<bool> {
        Ok(self.view(escrow, &Escrow::getBulkPaidCall {}, call).await?._0)
    }

    async fn code_at(&self, address: Address) -> Result<Vec<u8>> {
        self.rpc.get_code(address).await
    }

    async fn setup(&self, escrow: Address, args: &EscrowSetup, tx: TxOptions<'_>) -> Result<TxReceipt> {
        let call = Escrow::setupCall {
            reputationOracle: abi::to_sol_address(args.reputation_oracle),
            recordingOracle: abi::to_sol_address(args.recording_oracle),
            reputationOracleStake: U256::from(args.reputation_oracle_stake),
            recordingOracleStake: U256::from(args.recording_oracle_stake),
            url: args.manifest_url.clone(),
            hash: args.manifest_hash.clone(),
        };
        self.transact(escrow, &call, tx).await
    }

    async fn store_results(&self, escrow: Address, url: &str, hash: &str, tx: TxOptions<'_>) -> Result<TxReceipt> {
        let call = Escrow::storeResultsCall {
            url: url.to_string(),
            hash: hash.to_string(),
        };
        self.transact(escrow, &call, tx).await
    }

    async fn bulk_payout(&self, escrow: Address, args: &BulkPayoutCall, tx: TxOptions<'_>) -> Result<TxReceipt> {
        let call = Escrow::bulkPayOutCall {
            recipients: args.recipients.iter().copied().map(abi::to_sol_address).collect(),
            amounts: args.amounts.iter().copied().map(abi::amount_to_u256).collect(),
            url: args.url.clone(),
            hash: args.hash.clone(),
            txId: U256::from(args.tx_id),
        };
        self.transact(escrow, &call, tx).await
    }

    async fn complete(&self, escrow: Address, tx: TxOptions<'_>) -> Result<TxReceipt> {
        self.transact(escrow, &Escrow::completeCall {}, tx).await
    }

    async fn cancel(&self, escrow: Address, tx: TxOptions<'_>) -> Result<TxReceipt> {
        self.transact(escrow, &Escrow::cancelCall {}, tx).await
    }

    async fn abort(&self, escrow: Address, tx: TxOptions<'_>) -> Result<TxReceipt> {
        self.transact(escrow, &Escrow::abortCall {}, tx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hmt_crypto::Credentials;

    const TOKEN: &str = "0x9b0ff099c4e8df24ec4b3bcb2adfd1f8f0d2c9d6";

    fn config() -> EvmConfig {
        EvmConfig {
            rpc_url: "http://127.0.0.1:1".to_string(),
            hmt_token: Some(TOKEN.parse().unwrap()),
            request_timeout_secs: 2,
            ..EvmConfig::default()
        }
    }

    #[test]
    fn test_requires_token_address() {
        let err = EvmGateway::new(EvmConfig::default()).err().unwrap();
        assert!(matches!(err, ChainError::Configuration(_)));
        assert!(EvmGateway::new(config()).is_ok());
    }

    #[test]
    fn test_factory_deployment_appends_token() {
        let data = factory_deployment("0x6080", TOKEN.parse().unwrap()).unwrap();
        assert_eq!(data.len(), 2 + 32);
        assert_eq!(&data[..2], &[0x60, 0x80]);
        assert_eq!(hex::encode(&data[14..]), TOKEN.trim_start_matches("0x"));

        assert!(matches!(
            factory_deployment("0x", TOKEN.parse().unwrap()),
            Err(ChainError::Configuration(_))
        ));
        assert!(matches!(
            factory_deployment("not hex", TOKEN.parse().unwrap()),
            Err(ChainError::Configuration(_))
        ));
    }

    #[test]
    fn test_receipt_conversion() {
        let receipt = RpcReceipt {
            transaction_hash: "0xabc".to_string(),
            block_number: Some("0x1b4".to_string()),
            gas_used: "0x5208".to_string(),
            status: Some("0x1".to_string()),
            contract_address: Some("0x9b0ff099c4e8df24ec4b3bcb2adfd1f8f0d2c9d6".to_string()),
        };
        let converted = to_receipt(receipt).unwrap();
        assert_eq!(converted.block_number, 436);
        assert_eq!(converted.gas_used, 21_000);
        assert_eq!(converted.contract_address, Some(TOKEN.parse().unwrap()));
    }

    #[tokio::test]
    async fn test_deploy_without_bytecode_is_configuration_error() {
        let gateway = EvmGateway::new(config()).unwrap();
        let credentials = Credentials::new(
            "0x1413862C2B7054CDbfdc181B83962CB0FC11fD92",
            "28e516f1e2f99e96a48a23cea1f94ee5f073403a1c68e818263f0eb898f1c8e5",
        )
        .unwrap();

        let err = gateway
            .deploy_factory(TxOptions::new(&credentials, 1_000_000))
            .await
            .unwrap_err();
        assert!(matches!(err, ChainError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_unreachable_node() {
        let gateway = EvmGateway::new(config()).unwrap();
        let escrow: Address = TOKEN.parse().unwrap();
        let call = CallOptions::new(Address::ZERO, 100_000);
        assert!(matches!(
            gateway.escrow_status_raw(escrow, call).await,
            Err(ChainError::Rpc(_))
        ));
    }
}
