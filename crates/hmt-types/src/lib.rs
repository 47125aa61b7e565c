//! Domain types shared by every crate in the workspace: account
//! addresses, HMT token amounts and the escrow status enumeration.

pub mod address;
pub mod amount;
pub mod error;
pub mod status;

pub use address::Address;
pub use amount::{HmtAmount, HMT_BASE_UNIT, HMT_DECIMALS};
pub use error::{Result, TypesError};
pub use status::JobStatus;

/// Default gas ceiling applied to every transaction and view call.
pub const DEFAULT_GAS_LIMIT: u64 = 4_712_388;
