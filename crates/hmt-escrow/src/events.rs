use chrono::{DateTime, Utc};
use hmt_types::{Address, JobStatus};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobEventKind {
    Launched,
    SetUp,
    IntermediateResultsStored,
    PayoutSubmitted { transferred: bool },
    Completed,
    Cancelled,
    Aborted,
}

/// Emitted after each successful job operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobEvent {
    pub escrow: Address,
    pub kind: JobEventKind,
    /// Status read back after the operation; `None` once the escrow is
    /// destroyed.
    pub status: Option<JobStatus>,
    pub timestamp: DateTime<Utc>,
}
