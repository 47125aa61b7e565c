use hmt_crypto::{CryptoError, EciesCipher, PrivateKey};
use proptest::prelude::*;

const ORACLE_PRIV: &str = "28e516f1e2f99e96a48a23cea1f94ee5f073403a1c68e818263f0eb898f1c8e5";
const OTHER_PRIV: &str = "486a0621e595dd7fcbe5608cbbeec8f5a8b5cabe7637f11eccfc7acd408c3a0e";

fn oracle() -> PrivateKey {
    PrivateKey::from_hex(ORACLE_PRIV).unwrap()
}

#[test]
fn test_roundtrip() {
    let cipher = EciesCipher::default();
    let msg = br#"{"a": "b", "c": 1}"#;
    let sealed = cipher.encrypt(msg, &oracle().public_key()).unwrap();
    assert_ne!(&sealed[81..81 + msg.len()], &msg[..]);
    assert_eq!(cipher.decrypt(&sealed, &oracle()).unwrap(), msg.to_vec());
}

#[test]
fn test_encryption_is_randomized() {
    let cipher = EciesCipher::default();
    let a = cipher.encrypt(b"same", &oracle().public_key()).unwrap();
    let b = cipher.encrypt(b"same", &oracle().public_key()).unwrap();
    assert_ne!(a, b);
}

#[test]
fn test_wrong_key_fails_tag() {
    let cipher = EciesCipher::default();
    let sealed = cipher.encrypt(b"secret", &oracle().public_key()).unwrap();
    let other = PrivateKey::from_hex(OTHER_PRIV).unwrap();
    assert_eq!(
        cipher.decrypt(&sealed, &other),
        Err(CryptoError::DecryptionFailed("Failed to verify tag".to_string()))
    );
}

#[test]
fn test_tampered_ciphertext_rejected() {
    let cipher = EciesCipher::default();
    let mut sealed = cipher.encrypt(b"secret", &oracle().public_key()).unwrap();
    sealed[82] ^= 0x01;
    assert!(matches!(
        cipher.decrypt(&sealed, &oracle()),
        Err(CryptoError::DecryptionFailed(_))
    ));
}

#[test]
fn test_shared_mac_must_match() {
    let sender = EciesCipher::new(b"one".to_vec());
    let receiver = EciesCipher::new(b"two".to_vec());
    let sealed = sender.encrypt(b"secret", &oracle().public_key()).unwrap();
    assert!(receiver.decrypt(&sealed, &oracle()).is_err());
    assert!(sender.decrypt(&sealed, &oracle()).is_ok());
}

#[test]
fn test_short_or_malformed_input() {
    let cipher = EciesCipher::default();
    assert!(cipher.decrypt(&[0x04; 10], &oracle()).is_err());
    let mut sealed = cipher.encrypt(b"x", &oracle().public_key()).unwrap();
    sealed[0] = 0x02;
    assert!(cipher.decrypt(&sealed, &oracle()).is_err());
}

#[test]
fn test_empty_plaintext() {
    let cipher = EciesCipher::default();
    let sealed = cipher.encrypt(b"", &oracle().public_key()).unwrap();
    assert_eq!(sealed.len(), 65 + 16 + 32);
    assert!(cipher.decrypt(&sealed, &oracle()).unwrap().is_empty());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_roundtrip(msg in proptest::collection::vec(any::<u8>(), 0..512)) {
        let cipher = EciesCipher::default();
        let sealed = cipher.encrypt(&msg, &oracle().public_key()).unwrap();
        prop_assert_eq!(cipher.decrypt(&sealed, &oracle()).unwrap(), msg);
    }
}
