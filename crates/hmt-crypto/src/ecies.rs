//! ECIES over secp256k1, wire compatible with the `p2p.ecies` scheme
//! used by the HUMAN Protocol oracles.
//!
//! Layout: `0x04 || ephemeral_pub(64) || iv(16) || ciphertext || tag(32)`
//!
//! The tag is HMAC-SHA256 over `iv || ciphertext || shared_mac`, keyed
//! with `sha256(key_material[16..32])`. Encryption is AES-128-CTR keyed
//! with `key_material[..16]`, where `key_material` comes from the
//! single-round concat KDF over the ECDH x coordinate.

use crate::error::{CryptoError, Result};
use crate::keys::{PrivateKey, PublicKey};
use aes::cipher::{KeyIvInit, StreamCipher};
use hmac::{Hmac, Mac};
use k256::ecdh::{diffie_hellman, EphemeralSecret};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

type Aes128Ctr = ctr::Ctr128BE<aes::Aes128>;
type HmacSha256 = Hmac<Sha256>;

pub const DEFAULT_SHARED_MAC: &[u8] =
    b"9da0d3721774843193737244a0f3355191f66ff7321e83eae83f7f746eb34350";

const PUBKEY_LEN: usize = 65;
const IV_LEN: usize = 16;
const TAG_LEN: usize = 32;
const KEY_LEN: usize = 16;

#[derive(Debug, Clone)]
pub struct EciesCipher {
    shared_mac: Vec<u8>,
}

impl Default for EciesCipher {
    fn default() -> Self {
        Self::new(DEFAULT_SHARED_MAC.to_vec())
    }
}

impl EciesCipher {
    pub fn new(shared_mac: Vec<u8>) -> Self {
        Self { shared_mac }
    }

    pub fn shared_mac(&self) -> &[u8] {
        &self.shared_mac
    }

    pub fn encrypt(&self, plaintext: &[u8], recipient: &PublicKey) -> Result<Vec<u8>> {
        let ephemeral = EphemeralSecret::random(&mut OsRng);
        let ephemeral_pub = ephemeral.public_key().to_encoded_point(false);
        let shared = ephemeral.diffie_hellman(recipient.inner());
        let (enc_key, mac_key) = derive_keys(shared.raw_secret_bytes());

        let mut iv = [0u8; IV_LEN];
        OsRng.fill_bytes(&mut iv);

        let mut ciphertext = plaintext.to_vec();
        let mut cipher = Aes128Ctr::new_from_slices(&enc_key, &iv)
            .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;
        cipher.apply_keystream(&mut ciphertext);

        let tag = self.tag(&mac_key, &iv, &ciphertext)?;

        let mut out = Vec::with_capacity(PUBKEY_LEN + IV_LEN + ciphertext.len() + TAG_LEN);
        out.extend_from_slice(ephemeral_pub.as_bytes());
        out.extend_from_slice(&iv);
        out.extend_from_slice(&ciphertext);
        out.extend_from_slice(&tag);
        Ok(out)
    }

    pub fn decrypt(&self, data: &[u8], key: &PrivateKey) -> Result<Vec<u8>> {
        if data.len() < PUBKEY_LEN + IV_LEN + TAG_LEN {
            return Err(CryptoError::DecryptionFailed(format!(
                "message too short: {} bytes",
                data.len()
            )));
        }
        if data[0] != 0x04 {
            return Err(CryptoError::DecryptionFailed(format!(
                "wrong ecies header: {:#04x}",
                data[0]
            )));
        }

        let (ephemeral_bytes, rest) = data.split_at(PUBKEY_LEN);
        let (iv, rest) = rest.split_at(IV_LEN);
        let (ciphertext, tag) = rest.split_at(rest.len() - TAG_LEN);

        let ephemeral = PublicKey::from_bytes(ephemeral_bytes)
            .map_err(|e| CryptoError::DecryptionFailed(e.to_string()))?;
        let shared = diffie_hellman(
            key.secret().to_nonzero_scalar(),
            ephemeral.inner().as_affine(),
        );
        let (enc_key, mac_key) = derive_keys(shared.raw_secret_bytes());

        let mut mac = HmacSha256::new_from_slice(&mac_key)
            .map_err(|e| CryptoError::DecryptionFailed(e.to_string()))?;
        mac.update(iv);
        mac.update(ciphertext);
        mac.update(&self.shared_mac);
        mac.verify_slice(tag)
            .map_err(|_| CryptoError::DecryptionFailed("Failed to verify tag".to_string()))?;

        let mut plaintext = ciphertext.to_vec();
        let mut cipher = Aes128Ctr::new_from_slices(&enc_key, iv)
            .map_err(|e| CryptoError::DecryptionFailed(e.to_string()))?;
        cipher.apply_keystream(&mut plaintext);
        Ok(plaintext)
    }

    fn tag(&self, mac_key: &[u8; 32], iv: &[u8], ciphertext: &[u8]) -> Result<[u8; TAG_LEN]> {
        let mut mac = HmacSha256::new_from_slice(mac_key)
            .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;
        mac.update(iv);
        mac.update(ciphertext);
        mac.update(&self.shared_mac);
        let mut tag = [0u8; TAG_LEN];
        tag.copy_from_slice(&mac.finalize().into_bytes());
        Ok(tag)
    }
}

/// NIST SP 800-56 concat KDF, one round of sha256.
fn derive_keys(shared_x: &[u8]) -> ([u8; KEY_LEN], [u8; 32]) {
    let mut hasher = Sha256::new();
    hasher.update(1u32.to_be_bytes());
    hasher.update(shared_x);
    let material = hasher.finalize();

    let mut enc_key = [0u8; KEY_LEN];
    enc_key.copy_from_slice(&material[..KEY_LEN]);

    let mut mac_key = [0u8; 32];
    mac_key.copy_from_slice(&Sha256::digest(&material[KEY_LEN..32]));

    (enc_key, mac_key)
}
