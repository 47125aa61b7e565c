use crate::error::{Result, TypesError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Escrow lifecycle status as exposed by this library.
///
/// Discriminants are fixed: `Launched = 1` through `Cancelled = 6`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum JobStatus {
    Launched = 1,
    Pending = 2,
    Partial = 3,
    Paid = 4,
    Complete = 5,
    Cancelled = 6,
}

/// Contract status index -> `JobStatus`.
///
/// The deployed escrow contract stores its status as a zero-based enum,
/// so raw value `n` is `JobStatus` discriminant `n + 1`. The table is tied
/// to that contract version; a reordered contract enum needs a new table.
const RAW_STATUS_TABLE: [JobStatus; 6] = [
    JobStatus::Launched,
    JobStatus::Pending,
    JobStatus::Partial,
    JobStatus::Paid,
    JobStatus::Complete,
    JobStatus::Cancelled,
];

impl JobStatus {
    pub const ALL: [JobStatus; 6] = RAW_STATUS_TABLE;

    /// Map the contract's raw status value.
    pub fn from_raw(raw: u8) -> Result<Self> {
        RAW_STATUS_TABLE
            .get(raw as usize)
            .copied()
            .ok_or(TypesError::UnknownStatus(raw))
    }

    /// The contract's raw value for this status.
    pub fn to_raw(self) -> u8 {
        self as u8 - 1
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Complete and Cancelled end the payable lifecycle.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Cancelled)
    }

    /// States from which the escrow can still be cancelled or aborted.
    pub fn is_refundable(self) -> bool {
        matches!(self, Self::Launched | Self::Pending)
    }

    /// States in which a bulk payout may be submitted.
    pub fn accepts_payouts(self) -> bool {
        matches!(self, Self::Pending | Self::Partial)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Launched => "Launched",
            Self::Pending => "Pending",
            Self::Partial => "Partial",
            Self::Paid => "Paid",
            Self::Complete => "Complete",
            Self::Cancelled => "Cancelled",
        };
        f.write_str(name)
    }
}
