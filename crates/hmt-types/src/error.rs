use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TypesError {
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Unknown escrow status value: {0}")]
    UnknownStatus(u8),
}

pub type Result<T> = std::result::Result<T, TypesError>;
