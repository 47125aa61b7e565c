use crate::error::{CryptoError, Result};
use hmt_types::Address;
use k256::ecdsa::SigningKey;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use sha3::{Digest, Keccak256};
use std::fmt;
use std::str::FromStr;

fn strip_hex_prefix(s: &str) -> &str {
    let s = s.trim();
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}

/// secp256k1 private key.
///
/// `Debug` never prints key material.
#[derive(Clone)]
pub struct PrivateKey(k256::SecretKey);

impl PrivateKey {
    /// Parse 32 bytes of hex, with or without `0x`.
    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(strip_hex_prefix(s))
            .map_err(|e| CryptoError::InvalidPrivateKey(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != 32 {
            return Err(CryptoError::InvalidPrivateKey(format!(
                "expected 32 bytes, got {}",
                bytes.len()
            )));
        }
        k256::SecretKey::from_slice(bytes)
            .map(Self)
            .map_err(|_| CryptoError::InvalidPrivateKey("scalar out of range".to_string()))
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        out.copy_from_slice(&self.0.to_bytes());
        out
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.0.public_key())
    }

    /// Address controlled by this key.
    pub fn address(&self) -> Address {
        derive_address(&self.public_key())
    }

    /// Deterministic (RFC 6979) low-s signature over a 32-byte digest.
    pub fn sign_prehash(&self, digest: &[u8; 32]) -> Result<RecoverableSignature> {
        let signing_key = SigningKey::from(&self.0);
        let (signature, recovery_id) = signing_key
            .sign_prehash_recoverable(digest)
            .map_err(|e| CryptoError::SigningFailed(e.to_string()))?;

        let bytes = signature.to_bytes();
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..]);
        Ok(RecoverableSignature {
            r,
            s,
            recovery_id: recovery_id.to_byte(),
        })
    }

    pub(crate) fn secret(&self) -> &k256::SecretKey {
        &self.0
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey(<redacted>)")
    }
}

impl FromStr for PrivateKey {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

/// ECDSA signature with the parity bit needed to recover the signer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoverableSignature {
    pub r: [u8; 32],
    pub s: [u8; 32],
    /// 0 or 1.
    pub recovery_id: u8,
}

/// secp256k1 public key.
///
/// Hex form is the 64-byte uncompressed point without the `0x04` tag,
/// which is how oracle keys are exchanged out of band.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PublicKey(k256::PublicKey);

impl PublicKey {
    /// Accepts 64 bytes (bare point) or 33/65 bytes SEC1.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let parsed = if bytes.len() == 64 {
            let mut tagged = [0u8; 65];
            tagged[0] = 0x04;
            tagged[1..].copy_from_slice(bytes);
            k256::PublicKey::from_sec1_bytes(&tagged)
        } else {
            k256::PublicKey::from_sec1_bytes(bytes)
        };

        parsed
            .map(Self)
            .map_err(|_| CryptoError::InvalidPublicKey(format!("{} bytes, not a curve point", bytes.len())))
    }

    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(strip_hex_prefix(s))
            .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    /// 64-byte uncompressed point, no tag.
    pub fn to_bytes(&self) -> [u8; 64] {
        let point = self.0.to_encoded_point(false);
        let mut out = [0u8; 64];
        out.copy_from_slice(&point.as_bytes()[1..]);
        out
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    pub(crate) fn inner(&self) -> &k256::PublicKey {
        &self.0
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({}...)", &self.to_hex()[..16])
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for PublicKey {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

/// keccak256 of the bare public point, last 20 bytes.
pub fn derive_address(public_key: &PublicKey) -> Address {
    let mut word = [0u8; 32];
    word.copy_from_slice(&Keccak256::digest(public_key.to_bytes()));
    Address::from_word(&word)
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "28e516f1e2f99e96a48a23cea1f94ee5f073403a1c68e818263f0eb898f1c8e5";
    const PUB: &str = "2dbc2c2c86052702e7c219339514b2e8bd4687ba1236c478ad41b43330b08488c12c8c1797aa181f3a4596a1bd8a0c18344ea44d6655f61fa73e56e743f79e0d";

    #[test]
    fn test_public_key_from_private() {
        let key = PrivateKey::from_hex(KEY).unwrap();
        assert_eq!(key.public_key().to_hex(), PUB);
    }

    #[test]
    fn test_public_key_formats() {
        let bare = PublicKey::from_hex(PUB).unwrap();
        let tagged = PublicKey::from_hex(&format!("04{}", PUB)).unwrap();
        assert_eq!(bare, tagged);
        assert!(PublicKey::from_hex("04").is_err());
    }

    #[test]
    fn test_known_address() {
        let key = PrivateKey::from_hex(
            "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318",
        )
        .unwrap();
        assert_eq!(
            key.address().to_string(),
            "0x2c7536E3605D9C16a7a3D7b1898e529396a65c23"
        );
    }

    #[test]
    fn test_private_key_rejects_bad_input() {
        assert!(PrivateKey::from_hex("abcd").is_err());
        assert!(PrivateKey::from_hex(&"00".repeat(32)).is_err());
        assert!(PrivateKey::from_hex(&"zz".repeat(32)).is_err());
    }

    #[test]
    fn test_sign_prehash_eip155_vector() {
        let key = PrivateKey::from_hex(&"46".repeat(32)).unwrap();
        let digest: [u8; 32] =
            hex::decode("daf5a779ae972f972197303d7b574746c7ef83eadac0f2791ad23db92e4c8e53")
                .unwrap()
                .try_into()
                .unwrap();

        let sig = key.sign_prehash(&digest).unwrap();
        assert_eq!(
            hex::encode(sig.r),
            "28ef61340bd939bc2195fe537567866003e1a15d3c71ff63e1590620aa636276"
        );
        assert_eq!(
            hex::encode(sig.s),
            "67cbe9d8997f761aecb703304b3800ccf555c9f3dc64214b297fb1966a3b6d83"
        );
        assert_eq!(sig.recovery_id, 0);
        assert_eq!(key.sign_prehash(&digest).unwrap(), sig);
    }

    #[test]
    fn test_debug_is_redacted() {
        let key = PrivateKey::from_hex(KEY).unwrap();
        assert!(!format!("{:?}", key).contains("28e5"));
    }
}
