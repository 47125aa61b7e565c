use hmt_chain::ChainError;
use hmt_crypto::CryptoError;
use hmt_storage::{PayloadError, StorageError};
use hmt_types::TypesError;
use thiserror::Error;

/// Everything a [`crate::Job`] operation can fail with.
///
/// `Configuration`, `State` and `InvalidPayout` are caller mistakes;
/// `Chain` and `Storage` are external failures; `Decryption` means the
/// payload could not be opened or did not match its published digest.
#[derive(Error, Debug)]
pub enum JobError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid state: {0}")]
    State(String),

    #[error("Chain error: {0}")]
    Chain(ChainError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Decryption failed: {0}")]
    Decryption(String),

    #[error("Invalid payout: {0}")]
    InvalidPayout(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl JobError {
    /// True for errors caused by how the job was driven rather than by
    /// the chain or the storage network.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            JobError::Configuration(_) | JobError::State(_) | JobError::InvalidPayout(_)
        )
    }
}

impl From<ChainError> for JobError {
    fn from(e: ChainError) -> Self {
        match e {
            ChainError::Configuration(msg) => JobError::Configuration(msg),
            other => JobError::Chain(other),
        }
    }
}

impl From<CryptoError> for JobError {
    fn from(e: CryptoError) -> Self {
        match e {
            CryptoError::DecryptionFailed(msg) => JobError::Decryption(msg),
            other => JobError::Configuration(other.to_string()),
        }
    }
}

impl From<PayloadError> for JobError {
    fn from(e: PayloadError) -> Self {
        match e {
            PayloadError::Storage(e) => JobError::Storage(e),
            PayloadError::Decryption(msg) => JobError::Decryption(msg),
            e @ PayloadError::DigestMismatch { .. } => JobError::Decryption(e.to_string()),
            PayloadError::Encryption(msg) => JobError::Configuration(msg),
            PayloadError::Serialization(msg) => JobError::Serialization(msg),
        }
    }
}

impl From<TypesError> for JobError {
    fn from(e: TypesError) -> Self {
        JobError::Configuration(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, JobError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_errors_classified() {
        let err = JobError::from(ChainError::Configuration("no token".to_string()));
        assert!(matches!(err, JobError::Configuration(_)));
        assert!(err.is_caller_error());

        let err = JobError::from(ChainError::Reverted("Stake out of bounds".to_string()));
        assert!(matches!(err, JobError::Chain(ChainError::Reverted(_))));
        assert!(!err.is_caller_error());
    }
}
