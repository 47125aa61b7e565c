use hmt_crypto::{validate_credentials, CryptoError, Credentials, PrivateKey};
use hmt_types::Address;
use proptest::prelude::*;

const GAS_PAYER: &str = "0x1413862C2B7054CDbfdc181B83962CB0FC11fD92";
const GAS_PAYER_PRIV: &str = "28e516f1e2f99e96a48a23cea1f94ee5f073403a1c68e818263f0eb898f1c8e5";
const OTHER_PRIV: &str = "486a0621e595dd7fcbe5608cbbeec8f5a8b5cabe7637f11eccfc7acd408c3a0e";

#[test]
fn test_matching_pair_validates() {
    let address: Address = GAS_PAYER.parse().unwrap();
    let key = PrivateKey::from_hex(GAS_PAYER_PRIV).unwrap();
    assert!(validate_credentials(&address, &key));
}

#[test]
fn test_other_key_rejected() {
    let address: Address = GAS_PAYER.parse().unwrap();
    let key = PrivateKey::from_hex(OTHER_PRIV).unwrap();
    assert!(!validate_credentials(&address, &key));
    assert_eq!(
        key.address().to_string(),
        "0x61F9F0B31eacB420553da8BCC59DC617279731Ac"
    );
}

#[test]
fn test_address_case_does_not_matter() {
    let key = PrivateKey::from_hex(GAS_PAYER_PRIV).unwrap();
    let lower: Address = GAS_PAYER.to_lowercase().parse().unwrap();
    assert!(validate_credentials(&lower, &key));
}

#[test]
fn test_credentials_new() {
    let creds = Credentials::new(GAS_PAYER, GAS_PAYER_PRIV).unwrap();
    assert_eq!(creds.gas_payer().to_string(), GAS_PAYER);
    assert!(!format!("{:?}", creds).contains(GAS_PAYER_PRIV));
}

#[test]
fn test_credentials_mismatch() {
    let err = Credentials::new(GAS_PAYER, OTHER_PRIV).unwrap_err();
    assert_eq!(
        err.to_string(),
        format!(
            "Given private key doesn't match the ethereum address {}",
            GAS_PAYER
        )
    );
}

#[test]
fn test_credentials_bad_input() {
    assert!(matches!(
        Credentials::new("0x1234", GAS_PAYER_PRIV),
        Err(CryptoError::InvalidAddress(_))
    ));
    assert!(matches!(
        Credentials::new(GAS_PAYER, "not hex"),
        Err(CryptoError::InvalidPrivateKey(_))
    ));
}

proptest! {
    #[test]
    fn prop_flipped_key_never_validates(byte in 0usize..32, bit in 0u8..8) {
        let address: Address = GAS_PAYER.parse().unwrap();
        let mut raw = PrivateKey::from_hex(GAS_PAYER_PRIV).unwrap().to_bytes();
        raw[byte] ^= 1 << bit;
        if let Ok(key) = PrivateKey::from_bytes(&raw) {
            prop_assert!(!validate_credentials(&address, &key));
        }
    }
}
