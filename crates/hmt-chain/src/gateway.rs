use crate::error::Result;
use crate::types::{BulkPayoutCall, CallOptions, EscrowSetup, TxOptions, TxReceipt};
use async_trait::async_trait;
use hmt_types::{Address, HmtAmount};

/// Typed calls against the factory, escrow and HMT token contracts.
///
/// Transaction methods resolve only once the transaction is mined (or
/// fails). View methods read current chain state with no caching.
/// Status is returned raw; mapping to [`hmt_types::JobStatus`] is the
/// caller's concern.
#[async_trait]
pub trait ContractGateway: Send + Sync {
    // Factory

    /// Deploy a new escrow factory; returns its address.
    async fn deploy_factory(&self, tx: TxOptions<'_>) -> Result<Address>;

    async fn create_escrow(&self, factory: Address, tx: TxOptions<'_>) -> Result<TxReceipt>;

    async fn last_escrow(&self, factory: Address, call: CallOptions) -> Result<Address>;

    async fn has_escrow(&self, factory: Address, escrow: Address, call: CallOptions) -> Result<bool>;

    // Token

    async fn transfer_hmt(&self, to: Address, amount: HmtAmount, tx: TxOptions<'_>) -> Result<TxReceipt>;

    // Escrow views

    async fn escrow_status_raw(&self, escrow: Address, call: CallOptions) -> Result<u8>;

    async fn manifest_url(&self, escrow: Address, call: CallOptions) -> Result<String>;

    async fn manifest_hash(&self, escrow: Address, call: CallOptions) -> Result<String>;

    async fn intermediate_results_url(&self, escrow: Address, call: CallOptions) -> Result<String>;

    async fn intermediate_results_hash(&self, escrow: Address, call: CallOptions) -> Result<String>;

    async fn final_results_url(&self, escrow: Address, call: CallOptions) -> Result<String>;

    async fn balance(&self, escrow: Address, call: CallOptions) -> Result<HmtAmount>;

    async fn launcher(&self, escrow: Address, call: CallOptions) -> Result<Address>;

    /// Whether the most recent `bulkPayOut` moved funds.
    async fn bulk_paid(&self, escrow: Address, call: CallOptions) -> Result<bool>;

    /// Deployed bytecode; empty once a contract self-destructs.
    async fn code_at(&self, address: Address) -> Result<Vec<u8>>;

    // Escrow transactions

    async fn setup(&self, escrow: Address, args: &EscrowSetup, tx: TxOptions<'_>) -> Result<TxReceipt>;

    async fn store_results(&self, escrow: Address, url: &str, hash: &str, tx: TxOptions<'_>) -> Result<TxReceipt>;

    async fn bulk_payout(&self, escrow: Address, args: &BulkPayoutCall, tx: TxOptions<'_>) -> Result<TxReceipt>;

    async fn complete(&self, escrow: Address, tx: TxOptions<'_>) -> Result<TxReceipt>;

    async fn cancel(&self, escrow: Address, tx: TxOptions<'_>) -> Result<TxReceipt>;

    async fn abort(&self, escrow: Address, tx: TxOptions<'_>) -> Result<TxReceipt>;
}
