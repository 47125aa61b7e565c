use hmt_types::Address;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    #[error("Transaction reverted: {0}")]
    Reverted(String),

    #[error("Timed out after {0:?} waiting for confirmation")]
    Timeout(Duration),

    #[error("Out of gas: limit {limit}, required {required}")]
    OutOfGas { limit: u64, required: u64 },

    #[error("No contract code at {0}")]
    NoContract(Address),

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Gateway misconfigured: {0}")]
    Configuration(String),
}

pub type Result<T> = std::result::Result<T, ChainError>;
