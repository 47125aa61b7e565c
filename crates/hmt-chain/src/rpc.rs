use crate::error::{ChainError, Result};
use hmt_types::Address;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, error};

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<Value>,
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

impl RpcErrorObject {
    fn into_chain_error(self) -> ChainError {
        if self.message.contains("revert") {
            let reason = match self.data {
                Some(Value::String(data)) => format!("{} ({})", self.message, data),
                _ => self.message,
            };
            ChainError::Reverted(reason)
        } else {
            ChainError::Rpc(format!("{}: {}", self.code, self.message))
        }
    }
}

/// The receipt fields the gateway reads.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcReceipt {
    pub transaction_hash: String,
    pub block_number: Option<String>,
    pub gas_used: String,
    pub status: Option<String>,
    pub contract_address: Option<String>,
}

impl RpcReceipt {
    /// Byzantium receipts report `0x1` on success.
    pub fn succeeded(&self) -> bool {
        self.status.as_deref().map_or(true, |s| parse_quantity(s) == Ok(1))
    }
}

/// Ethereum JSON-RPC over HTTP.
pub struct JsonRpcClient {
    client: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

impl JsonRpcClient {
    pub fn new(url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ChainError::Configuration(format!("http client: {}", e)))?;

        Ok(Self {
            client,
            url: url.to_string(),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn request<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let payload = json!({"jsonrpc": "2.0", "method": method, "params": params, "id": id});

        let response: RpcResponse = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                error!(method, error = %e, "JSON-RPC request failed");
                ChainError::Rpc(e.to_string())
            })?
            .json()
            .await
            .map_err(|e| ChainError::Rpc(format!("bad {} response: {}", method, e)))?;

        if let Some(err) = response.error {
            debug!(method, code = err.code, message = %err.message, "JSON-RPC error");
            return Err(err.into_chain_error());
        }

        let result = response.result.unwrap_or(Value::Null);
        serde_json::from_value(result)
            .map_err(|e| ChainError::Rpc(format!("unexpected {} result: {}", method, e)))
    }

    pub async fn chain_id(&self) -> Result<u64> {
        let id: String = self.request("eth_chainId", json!([])).await?;
        parse_quantity(&id).and_then(to_u64)
    }

    pub async fn gas_price(&self) -> Result<u128> {
        let price: String = self.request("eth_gasPrice", json!([])).await?;
        parse_quantity(&price)
    }

    /// Next nonce for `address`, counting pending transactions.
    pub async fn transaction_count(&self, address: Address) -> Result<u64> {
        let count: String = self
            .request("eth_getTransactionCount", json!([address.to_lower_hex(), "pending"]))
            .await?;
        parse_quantity(&count).and_then(to_u64)
    }

    pub async fn call(&self, from: Address, to: Address, gas: u64, data: &[u8]) -> Result<Vec<u8>> {
        let call = json!({
            "from": from.to_lower_hex(),
            "to": to.to_lower_hex(),
            "gas": format!("0x{:x}", gas),
            "data": format!("0x{}", hex::encode(data)),
        });
        let out: String = self.request("eth_call", json!([call, "latest"])).await?;
        decode_hex(&out)
    }

    /// Gas `data` would consume if sent now. Reverts surface as
    /// [`ChainError::Reverted`].
    pub async fn estimate_gas(&self, from: Address, to: Option<Address>, data: &[u8]) -> Result<u64> {
        let mut call = json!({
            "from": from.to_lower_hex(),
            "data": format!("0x{}", hex::encode(data)),
        });
        if let Some(to) = to {
            call["to"] = Value::String(to.to_lower_hex());
        }
        let estimate: String = self.request("eth_estimateGas", json!([call])).await?;
        parse_quantity(&estimate).and_then(to_u64)
    }

    pub async fn get_code(&self, address: Address) -> Result<Vec<u8>> {
        let code: String = self
            .request("eth_getCode", json!([address.to_lower_hex(), "latest"]))
            .await?;
        decode_hex(&code)
    }

    pub async fn send_raw_transaction(&self, raw: &[u8]) -> Result<String> {
        self.request(
            "eth_sendRawTransaction",
            json!([format!("0x{}", hex::encode(raw))]),
        )
        .await
    }

    /// `None` while the transaction is still pending.
    pub async fn transaction_receipt(&self, tx_hash: &str) -> Result<Option<RpcReceipt>> {
        self.request("eth_getTransactionReceipt", json!([tx_hash])).await
    }
}

/// Parse a `0x`-prefixed hex quantity.
pub fn parse_quantity(s: &str) -> Result<u128> {
    let digits = s
        .strip_prefix("0x")
        .ok_or_else(|| ChainError::Rpc(format!("quantity {:?} lacks 0x prefix", s)))?;
    if digits.is_empty() {
        return Ok(0);
    }
    u128::from_str_radix(digits, 16).map_err(|e| ChainError::Rpc(format!("quantity {:?}: {}", s, e)))
}

fn to_u64(value: u128) -> Result<u64> {
    u64::try_from(value).map_err(|_| ChainError::Rpc(format!("quantity {} exceeds u64", value)))
}

pub fn decode_hex(s: &str) -> Result<Vec<u8>> {
    let body = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(body).map_err(|e| ChainError::Rpc(format!("bad hex data: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity("0x0"), Ok(0));
        assert_eq!(parse_quantity("0x"), Ok(0));
        assert_eq!(parse_quantity("0x4a817c800"), Ok(20_000_000_000));
        assert!(parse_quantity("12").is_err());
        assert!(parse_quantity("0xzz").is_err());
        assert!(to_u64(u128::from(u64::MAX) + 1).is_err());
    }

    #[test]
    fn test_decode_hex() {
        assert_eq!(decode_hex("0x").unwrap(), Vec::<u8>::new());
        assert_eq!(decode_hex("0x6080").unwrap(), vec![0x60, 0x80]);
        assert!(decode_hex("0x608").is_err());
    }

    #[test]
    fn test_error_mapping() {
        let reverted: RpcErrorObject = serde_json::from_value(json!({
            "code": 3,
            "message": "execution reverted: Escrow not in Paid state",
            "data": "0x08c379a0"
        }))
        .unwrap();
        assert!(matches!(
            reverted.into_chain_error(),
            ChainError::Reverted(msg) if msg.contains("Escrow not in Paid state")
        ));

        let other: RpcErrorObject =
            serde_json::from_value(json!({"code": -32000, "message": "nonce too low"})).unwrap();
        assert_eq!(
            other.into_chain_error(),
            ChainError::Rpc("-32000: nonce too low".to_string())
        );
    }

    #[test]
    fn test_receipt_status() {
        let receipt: RpcReceipt = serde_json::from_value(json!({
            "transactionHash": "0xab",
            "blockNumber": "0x10",
            "gasUsed": "0x5208",
            "status": "0x0",
            "contractAddress": null
        }))
        .unwrap();
        assert!(!receipt.succeeded());

        let pre_byzantium = RpcReceipt {
            status: None,
            ..receipt
        };
        assert!(pre_byzantium.succeeded());
    }

    #[tokio::test]
    async fn test_unreachable_node_is_rpc_error() {
        let client = JsonRpcClient::new("http://127.0.0.1:1", Duration::from_secs(2)).unwrap();
        assert!(matches!(client.chain_id().await, Err(ChainError::Rpc(_))));
    }
}
