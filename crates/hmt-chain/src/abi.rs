//! Solidity interfaces of the deployed contracts and conversions between
//! their ABI types and ours.

use crate::error::{ChainError, Result};
use alloy_primitives::U256;
use alloy_sol_types::{sol, SolCall};
use hmt_types::{Address, HmtAmount};

sol! {
    interface EscrowFactory {
        function createEscrow() external returns (address);
        function getLastEscrow() external view returns (address);
        function hasEscrow(address escrow) external view returns (bool);
    }

    interface Escrow {
        function getStatus() external view returns (uint8);
        function getBalance() external view returns (uint256);
        function getLauncher() external view returns (address);
        function getBulkPaid() external view returns (bool);
        function getManifestUrl() external view returns (string);
        function getManifestHash() external view returns (string);
        function getIntermediateResultsUrl() external view returns (string);
        function getIntermediateResultsHash() external view returns (string);
        function getFinalResultsUrl() external view returns (string);

        function setup(
            address reputationOracle,
            address recordingOracle,
            uint256 reputationOracleStake,
            uint256 recordingOracleStake,
            string url,
            string hash
        ) external;
        function storeResults(string url, string hash) external;
        function bulkPayOut(
            address[] recipients,
            uint256[] amounts,
            string url,
            string hash,
            uint256 txId
        ) external returns (bool);
        function complete() external;
        function cancel() external returns (bool);
        function abort() external;
    }

    interface HMToken {
        function transfer(address to, uint256 value) external returns (bool);
    }
}

pub fn to_sol_address(address: Address) -> alloy_primitives::Address {
    alloy_primitives::Address::from(*address.as_bytes())
}

pub fn from_sol_address(address: alloy_primitives::Address) -> Address {
    Address::from_bytes(address.into_array())
}

pub fn amount_to_u256(amount: HmtAmount) -> U256 {
    U256::from(amount.to_base_units())
}

/// Escrow balances never exceed the token supply, so anything wider than
/// `u128` is a malformed response.
pub fn u256_to_amount(value: U256) -> Result<HmtAmount> {
    u128::try_from(value)
        .map(HmtAmount::from_base_units)
        .map_err(|_| ChainError::Rpc(format!("token amount {} out of range", value)))
}

/// Decode the return data of `C`.
pub fn decode_returns<C: SolCall>(data: &[u8]) -> Result<C::Return> {
    C::abi_decode_returns(data, true)
        .map_err(|e| ChainError::Rpc(format!("cannot decode {} result: {}", C::SIGNATURE, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_sol_types::SolValue;

    fn hex_selector<C: SolCall>() -> String {
        hex::encode(C::SELECTOR)
    }

    #[test]
    fn test_selectors() {
        assert_eq!(hex_selector::<EscrowFactory::createEscrowCall>(), "560a8d62");
        assert_eq!(hex_selector::<EscrowFactory::getLastEscrowCall>(), "f4d25760");
        assert_eq!(hex_selector::<EscrowFactory::hasEscrowCall>(), "58d276f7");

        assert_eq!(hex_selector::<Escrow::getStatusCall>(), "4e69d560");
        assert_eq!(hex_selector::<Escrow::getBalanceCall>(), "12065fe0");
        assert_eq!(hex_selector::<Escrow::getLauncherCall>(), "61c777e0");
        assert_eq!(hex_selector::<Escrow::getBulkPaidCall>(), "9a98c5bf");
        assert_eq!(hex_selector::<Escrow::getManifestUrlCall>(), "e75fe9d4");
        assert_eq!(hex_selector::<Escrow::getManifestHashCall>(), "bfa15c75");
        assert_eq!(hex_selector::<Escrow::getIntermediateResultsUrlCall>(), "fbf55af5");
        assert_eq!(hex_selector::<Escrow::getIntermediateResultsHashCall>(), "ea148d77");
        assert_eq!(hex_selector::<Escrow::getFinalResultsUrlCall>(), "ec21a291");
        assert_eq!(hex_selector::<Escrow::setupCall>(), "f926657e");
        assert_eq!(hex_selector::<Escrow::storeResultsCall>(), "697e4b87");
        assert_eq!(hex_selector::<Escrow::bulkPayOutCall>(), "b63d1a00");
        assert_eq!(hex_selector::<Escrow::completeCall>(), "522e1177");
        assert_eq!(hex_selector::<Escrow::cancelCall>(), "ea8a1af0");
        assert_eq!(hex_selector::<Escrow::abortCall>(), "35a063b4");

        assert_eq!(hex_selector::<HMToken::transferCall>(), "a9059cbb");
    }

    #[test]
    fn test_transfer_calldata() {
        let to: Address = "0x61F9F0B31eacB420553da8BCC59DC617279731Ac".parse().unwrap();
        let call = HMToken::transferCall {
            to: to_sol_address(to),
            value: amount_to_u256(HmtAmount::from_hmt(100)),
        };
        assert_eq!(
            hex::encode(call.abi_encode()),
            concat!(
                "a9059cbb",
                "00000000000000000000000061f9f0b31eacb420553da8bcc59dc617279731ac",
                "0000000000000000000000000000000000000000000000056bc75e2d63100000",
            )
        );
    }

    #[test]
    fn test_bulk_payout_calldata_decodes() {
        let worker: Address = "0x6b7E3C31F34cF38d1DFC1D9A8A59482028395809".parse().unwrap();
        let call = Escrow::bulkPayOutCall {
            recipients: vec![to_sol_address(worker)],
            amounts: vec![amount_to_u256(HmtAmount::from_hmt(10))],
            url: "QmResults".to_string(),
            hash: "0b2c".to_string(),
            txId: U256::from(1u64),
        };
        let data = call.abi_encode();
        assert_eq!(&data[..4], &Escrow::bulkPayOutCall::SELECTOR);

        let decoded = Escrow::bulkPayOutCall::abi_decode(&data, true).unwrap();
        assert_eq!(from_sol_address(decoded.recipients[0]), worker);
        assert_eq!(u256_to_amount(decoded.amounts[0]).unwrap(), HmtAmount::from_hmt(10));
        assert_eq!(decoded.url, "QmResults");
        assert_eq!(decoded.txId, U256::from(1u64));
    }

    #[test]
    fn test_decode_string_return() {
        let data = hex::decode(concat!(
            "0000000000000000000000000000000000000000000000000000000000000020",
            "000000000000000000000000000000000000000000000000000000000000002e",
            "516d54354e7655746f4d356e574666725164567246747647664b466d47374148",
            "4538503334697361707968437858000000000000000000000000000000000000",
        ))
        .unwrap();
        let ret = decode_returns::<Escrow::getManifestUrlCall>(&data).unwrap();
        assert_eq!(ret._0, "QmT5NvUtoM5nWFfrQdVrFtvGfKFmG7AHE8P34isapyhCxX");
    }

    #[test]
    fn test_decode_scalar_returns() {
        let status = decode_returns::<Escrow::getStatusCall>(&U256::from(2u64).abi_encode()).unwrap();
        assert_eq!(status._0, 2);

        let escrow: Address = "0xD979105297fB0eee83F7433fC09279cb5B94fFC6".parse().unwrap();
        let last = decode_returns::<EscrowFactory::getLastEscrowCall>(
            &to_sol_address(escrow).abi_encode(),
        )
        .unwrap();
        assert_eq!(from_sol_address(last._0), escrow);

        let paid = decode_returns::<Escrow::getBulkPaidCall>(&true.abi_encode()).unwrap();
        assert!(paid._0);
    }

    #[test]
    fn test_empty_return_is_rpc_error() {
        assert!(matches!(
            decode_returns::<Escrow::getBalanceCall>(&[]),
            Err(ChainError::Rpc(_))
        ));
    }

    #[test]
    fn test_amount_out_of_range() {
        assert!(u256_to_amount(U256::MAX).is_err());
        assert_eq!(
            u256_to_amount(U256::from(u128::MAX)).unwrap(),
            HmtAmount::from_base_units(u128::MAX)
        );
    }
}
