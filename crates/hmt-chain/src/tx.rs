use crate::error::{ChainError, Result};
use alloy_primitives::keccak256;
use hmt_crypto::PrivateKey;
use hmt_types::Address;
use rlp::RlpStream;

/// Pre-EIP-2718 transaction, replay-protected per EIP-155.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyTransaction {
    pub nonce: u64,
    pub gas_price: u128,
    pub gas_limit: u64,
    /// `None` deploys `data` as a contract.
    pub to: Option<Address>,
    pub value: u128,
    pub data: Vec<u8>,
    pub chain_id: u64,
}

impl LegacyTransaction {
    /// keccak256 of `rlp([nonce, gasPrice, gas, to, value, data, chainId, 0, 0])`.
    pub fn signing_hash(&self) -> [u8; 32] {
        let mut stream = RlpStream::new_list(9);
        self.append_fields(&mut stream);
        stream.append(&self.chain_id);
        stream.append_empty_data();
        stream.append_empty_data();
        keccak256(stream.out()).0
    }

    /// Sign and return the raw bytes for `eth_sendRawTransaction`.
    pub fn sign(&self, key: &PrivateKey) -> Result<Vec<u8>> {
        let signature = key
            .sign_prehash(&self.signing_hash())
            .map_err(|e| ChainError::Rpc(e.to_string()))?;
        let v = self
            .chain_id
            .checked_mul(2)
            .and_then(|v| v.checked_add(35 + signature.recovery_id as u64))
            .ok_or_else(|| ChainError::Configuration(format!("chain id {} too large", self.chain_id)))?;

        let mut stream = RlpStream::new_list(9);
        self.append_fields(&mut stream);
        stream.append(&v);
        stream.append(&trim_leading_zeros(&signature.r));
        stream.append(&trim_leading_zeros(&signature.s));
        Ok(stream.out().to_vec())
    }

    fn append_fields(&self, stream: &mut RlpStream) {
        stream.append(&self.nonce);
        stream.append(&trim_leading_zeros(&self.gas_price.to_be_bytes()));
        stream.append(&self.gas_limit);
        match self.to {
            Some(to) => stream.append(&to.as_bytes().to_vec()),
            None => stream.append_empty_data(),
        };
        stream.append(&trim_leading_zeros(&self.value.to_be_bytes()));
        stream.append(&self.data);
    }
}

// RLP integers carry no leading zero bytes.
fn trim_leading_zeros(bytes: &[u8]) -> Vec<u8> {
    let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    bytes[start..].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eip155_example() -> LegacyTransaction {
        LegacyTransaction {
            nonce: 9,
            gas_price: 20_000_000_000,
            gas_limit: 21_000,
            to: Some("0x3535353535353535353535353535353535353535".parse().unwrap()),
            value: 1_000_000_000_000_000_000,
            data: Vec::new(),
            chain_id: 1,
        }
    }

    #[test]
    fn test_signing_hash() {
        assert_eq!(
            hex::encode(eip155_example().signing_hash()),
            "daf5a779ae972f972197303d7b574746c7ef83eadac0f2791ad23db92e4c8e53"
        );
    }

    #[test]
    fn test_signed_raw_transaction() {
        let key = PrivateKey::from_hex(&"46".repeat(32)).unwrap();
        let raw = eip155_example().sign(&key).unwrap();
        assert_eq!(
            hex::encode(raw),
            concat!(
                "f86c098504a817c800825208943535353535353535353535353535353535353535",
                "880de0b6b3a76400008025a028ef61340bd939bc2195fe537567866003e1a15d3c",
                "71ff63e1590620aa636276a067cbe9d8997f761aecb703304b3800ccf555c9f3dc",
                "64214b297fb1966a3b6d83",
            )
        );
    }

    #[test]
    fn test_deployment_has_empty_recipient() {
        let tx = LegacyTransaction {
            to: None,
            data: vec![0x60, 0x80],
            ..eip155_example()
        };
        let call = LegacyTransaction {
            data: vec![0x60, 0x80],
            ..eip155_example()
        };
        assert_ne!(tx.signing_hash(), call.signing_hash());
        assert!(tx.sign(&PrivateKey::from_hex(&"46".repeat(32)).unwrap()).is_ok());
    }

    #[test]
    fn test_trim_leading_zeros() {
        assert_eq!(trim_leading_zeros(&[0, 0, 1, 0]), vec![1, 0]);
        assert!(trim_leading_zeros(&[0, 0]).is_empty());
    }
}
