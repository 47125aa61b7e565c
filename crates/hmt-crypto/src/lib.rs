//! Key handling, credential validation and the ECIES payload cipher.

pub mod credentials;
pub mod ecies;
pub mod error;
pub mod keys;

pub use credentials::{validate_credentials, Credentials};
pub use ecies::{EciesCipher, DEFAULT_SHARED_MAC};
pub use error::{CryptoError, Result};
pub use keys::{derive_address, PrivateKey, PublicKey, RecoverableSignature};
