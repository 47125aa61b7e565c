//! Typed gateway to the escrow, factory and token contracts.
//!
//! [`ContractGateway`] is the seam between the job state machine and a
//! chain client. [`EvmGateway`] talks to a live node over JSON-RPC and
//! signs transactions locally; [`SimulatedChain`] implements the same
//! trait in memory with the deployed contracts' observable behaviour.

pub mod abi;
pub mod error;
pub mod evm;
pub mod gateway;
pub mod rpc;
pub mod simulated;
pub mod tx;
pub mod types;

pub use error::{ChainError, Result};
pub use evm::{EvmConfig, EvmGateway};
pub use gateway::ContractGateway;
pub use rpc::JsonRpcClient;
pub use simulated::{GasSchedule, SimulatedChain};
pub use tx::LegacyTransaction;
pub use types::{BulkPayoutCall, CallOptions, EscrowSetup, TxOptions, TxReceipt, BULK_MAX_COUNT};
