use hmt_crypto::Credentials;
use hmt_types::{Address, HmtAmount};
use serde::{Deserialize, Serialize};

/// Maximum number of recipients the escrow accepts in one payout.
pub const BULK_MAX_COUNT: usize = 100;

/// Options for a read-only call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallOptions {
    pub from: Address,
    pub gas: u64,
}

impl CallOptions {
    pub fn new(from: Address, gas: u64) -> Self {
        Self { from, gas }
    }
}

/// Options for a signed, state-changing transaction.
#[derive(Debug, Clone, Copy)]
pub struct TxOptions<'a> {
    pub signer: &'a Credentials,
    pub gas: u64,
}

impl<'a> TxOptions<'a> {
    pub fn new(signer: &'a Credentials, gas: u64) -> Self {
        Self { signer, gas }
    }

    pub fn from(&self) -> Address {
        self.signer.gas_payer()
    }

    pub fn call(&self) -> CallOptions {
        CallOptions::new(self.from(), self.gas)
    }
}

/// Receipt of a mined transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    pub tx_hash: String,
    pub block_number: u64,
    pub gas_used: u64,
    /// Set for contract deployments.
    pub contract_address: Option<Address>,
}

/// Arguments of `Escrow.setup`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscrowSetup {
    pub reputation_oracle: Address,
    pub recording_oracle: Address,
    pub reputation_oracle_stake: u8,
    pub recording_oracle_stake: u8,
    pub manifest_url: String,
    pub manifest_hash: String,
}

/// Arguments of `Escrow.bulkPayOut`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkPayoutCall {
    pub recipients: Vec<Address>,
    pub amounts: Vec<HmtAmount>,
    pub url: String,
    pub hash: String,
    pub tx_id: u64,
}
