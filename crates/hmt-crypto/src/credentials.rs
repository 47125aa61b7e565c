use crate::error::{CryptoError, Result};
use crate::keys::PrivateKey;
use hmt_types::Address;
use std::fmt;

/// True if `key` controls `address`.
///
/// Comparison is on raw bytes, so letter case in the textual address
/// does not matter.
pub fn validate_credentials(address: &Address, key: &PrivateKey) -> bool {
    key.address() == *address
}

/// A gas payer address paired with the key that controls it.
///
/// Can only be built through a successful validation, so holding a
/// `Credentials` is proof the pair matches.
#[derive(Clone)]
pub struct Credentials {
    gas_payer: Address,
    gas_payer_priv: PrivateKey,
}

impl Credentials {
    /// Parse and validate a textual address/key pair.
    pub fn new(gas_payer: &str, gas_payer_priv: &str) -> Result<Self> {
        let address: Address = gas_payer
            .parse()
            .map_err(|e: hmt_types::TypesError| CryptoError::InvalidAddress(e.to_string()))?;
        let key = PrivateKey::from_hex(gas_payer_priv)?;
        Self::from_parts(address, key)
    }

    pub fn from_parts(gas_payer: Address, gas_payer_priv: PrivateKey) -> Result<Self> {
        if !validate_credentials(&gas_payer, &gas_payer_priv) {
            return Err(CryptoError::CredentialMismatch(gas_payer.to_string()));
        }
        Ok(Self {
            gas_payer,
            gas_payer_priv,
        })
    }

    pub fn gas_payer(&self) -> Address {
        self.gas_payer
    }

    pub fn gas_payer_priv(&self) -> &PrivateKey {
        &self.gas_payer_priv
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("gas_payer", &self.gas_payer)
            .field("gas_payer_priv", &"<redacted>")
            .finish()
    }
}
