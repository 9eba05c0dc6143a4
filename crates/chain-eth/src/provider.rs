//! EIP-1193 provider port and a typed client on top of it.
//!
//! Browser wallets expose a single `request({method, params})` entry point.
//! [`EvmProvider`] mirrors that shape so injected wallets, HTTP JSON-RPC
//! endpoints and test doubles are interchangeable. [`EvmClient`] adds the
//! typed calls the deployer and token tools need.

use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::U256;
use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::abi::decode_hex_data;
use crate::chains::{parse_chain_id, EvmChain};
use crate::error::{EthError, RpcError};

/// EIP-1193 "unrecognized chain" error code returned by `wallet_switchEthereumChain`.
pub const UNRECOGNIZED_CHAIN: i64 = 4902;

/// Events an injected provider emits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEvent {
    AccountsChanged(Vec<String>),
    ChainChanged(u64),
    Disconnect,
}

/// An EIP-1193 style provider.
#[async_trait]
pub trait EvmProvider: Send + Sync {
    /// Short identifier of the wallet behind this provider (`metamask`, `http`, ...).
    fn kind(&self) -> &str;

    async fn request(&self, method: &str, params: Value) -> Result<Value, RpcError>;

    /// Subscribes to provider events. Dropping the receiver unsubscribes.
    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent>;
}

/// Fields of an `eth_sendTransaction` request.
#[derive(Debug, Clone, Default)]
pub struct TransactionRequest {
    pub from: String,
    /// `None` for contract creation.
    pub to: Option<String>,
    pub data: Vec<u8>,
    pub value: Option<U256>,
}

impl TransactionRequest {
    fn to_json(&self) -> Value {
        let mut tx = json!({ "from": self.from });
        if let Some(to) = &self.to {
            tx["to"] = json!(to);
        }
        if !self.data.is_empty() {
            tx["data"] = json!(format!("0x{}", hex::encode(&self.data)));
        }
        if let Some(value) = self.value {
            tx["value"] = json!(format!("{value:#x}"));
        }
        tx
    }
}

/// The parts of a transaction receipt this crate cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionReceipt {
    pub transaction_hash: String,
    pub success: bool,
    pub block_number: Option<u64>,
    pub gas_used: Option<u64>,
    pub contract_address: Option<String>,
}

impl TransactionReceipt {
    pub fn from_json(value: &Value) -> Result<Self, EthError> {
        let transaction_hash = value["transactionHash"]
            .as_str()
            .unwrap_or_default()
            .to_string();
        let success = match value["status"].as_str() {
            Some(status) => parse_quantity(status)? == 1,
            // Pre-Byzantium receipts carry no status field.
            None => true,
        };

        Ok(Self {
            transaction_hash,
            success,
            block_number: value["blockNumber"].as_str().map(parse_quantity).transpose()?,
            gas_used: value["gasUsed"].as_str().map(parse_quantity).transpose()?,
            contract_address: value["contractAddress"].as_str().map(str::to_string),
        })
    }
}

/// Parses a hex quantity such as `0x1a`.
pub fn parse_quantity(raw: &str) -> Result<u64, EthError> {
    let hex = raw
        .strip_prefix("0x")
        .ok_or_else(|| EthError::EncodingError(format!("quantity {raw:?} lacks 0x prefix")))?;
    if hex.is_empty() {
        return Ok(0);
    }
    u64::from_str_radix(hex, 16)
        .map_err(|e| EthError::EncodingError(format!("invalid quantity {raw:?}: {e}")))
}

/// How long to wait for a submitted transaction to be mined.
#[derive(Debug, Clone, Copy)]
pub struct ConfirmationPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for ConfirmationPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            max_attempts: 180,
        }
    }
}

/// Typed wrapper around an [`EvmProvider`].
#[derive(Clone)]
pub struct EvmClient {
    provider: Arc<dyn EvmProvider>,
    confirmation: ConfirmationPolicy,
}

impl EvmClient {
    pub fn new(provider: Arc<dyn EvmProvider>) -> Self {
        Self {
            provider,
            confirmation: ConfirmationPolicy::default(),
        }
    }

    pub fn with_confirmation_policy(mut self, policy: ConfirmationPolicy) -> Self {
        self.confirmation = policy;
        self
    }

    pub fn provider(&self) -> &Arc<dyn EvmProvider> {
        &self.provider
    }

    /// Prompts the wallet for account access (`eth_requestAccounts`).
    pub async fn request_accounts(&self) -> Result<Vec<String>, EthError> {
        let value = self.provider.request("eth_requestAccounts", json!([])).await?;
        Ok(string_list(&value))
    }

    /// Accounts already authorized, without prompting.
    pub async fn accounts(&self) -> Result<Vec<String>, EthError> {
        let value = self.provider.request("eth_accounts", json!([])).await?;
        Ok(string_list(&value))
    }

    /// The connected signer, or [`EthError::NotConnected`].
    pub async fn signer(&self) -> Result<String, EthError> {
        self.accounts()
            .await?
            .into_iter()
            .next()
            .ok_or(EthError::NotConnected)
    }

    pub async fn chain_id(&self) -> Result<u64, EthError> {
        let value = self.provider.request("eth_chainId", json!([])).await?;
        match &value {
            Value::String(s) => parse_chain_id(s),
            Value::Number(n) => n
                .as_u64()
                .ok_or_else(|| EthError::EncodingError(format!("invalid chain id {n}"))),
            other => Err(EthError::EncodingError(format!(
                "unexpected eth_chainId result {other}"
            ))),
        }
    }

    /// Fails with [`EthError::WrongNetwork`] unless the wallet is on `expected`.
    pub async fn ensure_chain(&self, expected: u64) -> Result<(), EthError> {
        let actual = self.chain_id().await?;
        if actual != expected {
            return Err(EthError::WrongNetwork { expected, actual });
        }
        Ok(())
    }

    /// Read-only contract call (`eth_call` at `latest`).
    pub async fn call(&self, to: &str, data: &[u8]) -> Result<Vec<u8>, EthError> {
        let params = json!([{ "to": to, "data": format!("0x{}", hex::encode(data)) }, "latest"]);
        let value = self.provider.request("eth_call", params).await?;
        let raw = value
            .as_str()
            .ok_or_else(|| EthError::EncodingError(format!("unexpected eth_call result {value}")))?;
        decode_hex_data(raw)
    }

    /// Submits a transaction through the wallet and returns its hash.
    pub async fn send_transaction(&self, tx: &TransactionRequest) -> Result<String, EthError> {
        let value = self
            .provider
            .request("eth_sendTransaction", json!([tx.to_json()]))
            .await?;
        let hash = value.as_str().ok_or_else(|| {
            EthError::EncodingError(format!("unexpected eth_sendTransaction result {value}"))
        })?;
        info!(hash, from = %tx.from, "transaction submitted");
        Ok(hash.to_string())
    }

    pub async fn transaction_receipt(
        &self,
        hash: &str,
    ) -> Result<Option<TransactionReceipt>, EthError> {
        let value = self
            .provider
            .request("eth_getTransactionReceipt", json!([hash]))
            .await?;
        if value.is_null() {
            return Ok(None);
        }
        TransactionReceipt::from_json(&value).map(Some)
    }

    /// Polls until the transaction is mined (one confirmation).
    ///
    /// A mined-but-reverted transaction yields [`EthError::Reverted`].
    pub async fn wait_for_receipt(&self, hash: &str) -> Result<TransactionReceipt, EthError> {
        for attempt in 0..self.confirmation.max_attempts {
            if let Some(receipt) = self.transaction_receipt(hash).await? {
                if !receipt.success {
                    return Err(EthError::Reverted {
                        hash: hash.to_string(),
                    });
                }
                return Ok(receipt);
            }
            debug!(hash, attempt, "receipt not available yet");
            tokio::time::sleep(self.confirmation.interval).await;
        }
        Err(EthError::ConfirmationTimeout(hash.to_string()))
    }

    /// Asks the wallet to switch to `chain`, registering it first if the
    /// wallet does not know it.
    pub async fn switch_chain(&self, chain: &EvmChain) -> Result<(), EthError> {
        let params = json!([{ "chainId": chain.hex_chain_id() }]);
        match self
            .provider
            .request("wallet_switchEthereumChain", params)
            .await
        {
            Ok(_) => Ok(()),
            Err(e) if e.code == Some(UNRECOGNIZED_CHAIN) => {
                info!(chain_id = chain.chain_id, "chain unknown to wallet, adding it");
                self.provider
                    .request("wallet_addEthereumChain", chain.add_chain_params())
                    .await?;
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

fn string_list(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

/// Read-only provider backed by a JSON-RPC HTTP endpoint.
///
/// Used for receipt polling, where no wallet is involved.
pub struct HttpRpcProvider {
    url: String,
    client: reqwest::Client,
    events: broadcast::Sender<ProviderEvent>,
}

impl HttpRpcProvider {
    pub fn new(url: impl Into<String>) -> Self {
        let (events, _) = broadcast::channel(1);
        Self {
            url: url.into(),
            client: reqwest::Client::new(),
            events,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// HTTP statuses are not JSON-RPC codes. Statuses worth retrying read as
/// network errors.
fn http_status_message(status: reqwest::StatusCode, url: &str) -> String {
    let transient = status.is_server_error()
        || status == reqwest::StatusCode::REQUEST_TIMEOUT
        || status == reqwest::StatusCode::TOO_MANY_REQUESTS;
    if transient {
        format!("network error: HTTP {status} from {url}")
    } else {
        format!("HTTP {status} from {url}")
    }
}

#[async_trait]
impl EvmProvider for HttpRpcProvider {
    fn kind(&self) -> &str {
        "http"
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        let body = json!({ "jsonrpc": "2.0", "id": 1, "method": method, "params": params });
        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| RpcError::message(format!("network error: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RpcError::message(http_status_message(status, &self.url)));
        }

        let mut payload: Value = response
            .json()
            .await
            .map_err(|e| RpcError::message(format!("invalid JSON-RPC response: {e}")))?;

        if let Some(error) = payload.get("error") {
            return Err(RpcError {
                code: error["code"].as_i64(),
                message: error["message"].as_str().unwrap_or("unknown error").to_string(),
            });
        }
        Ok(payload["result"].take())
    }

    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory provider used by this crate's tests.

    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;

    pub struct MockProvider {
        pub responses: Mutex<HashMap<String, Result<Value, RpcError>>>,
        pub calls: Mutex<Vec<(String, Value)>>,
        events: broadcast::Sender<ProviderEvent>,
    }

    impl MockProvider {
        pub fn new() -> Self {
            let (events, _) = broadcast::channel(8);
            Self {
                responses: Mutex::new(HashMap::new()),
                calls: Mutex::new(Vec::new()),
                events,
            }
        }

        /// A wallet on `chain_id` with one account, 18-decimal tokens and
        /// instantly mined transactions.
        pub fn connected(chain_id: u64, account: &str) -> Self {
            let mock = Self::new();
            mock.respond("eth_chainId", Ok(json!(format!("{chain_id:#x}"))));
            mock.respond("eth_accounts", Ok(json!([account])));
            mock.respond("eth_requestAccounts", Ok(json!([account])));
            mock.respond("eth_call", Ok(json!(format!("0x{:064x}", 18))));
            mock.respond("eth_sendTransaction", Ok(json!(format!("0x{}", "ab".repeat(32)))));
            mock.respond(
                "eth_getTransactionReceipt",
                Ok(json!({
                    "transactionHash": format!("0x{}", "ab".repeat(32)),
                    "status": "0x1",
                    "blockNumber": "0x10",
                    "gasUsed": "0x5208",
                    "contractAddress": "0x000000000000000000000000000000000000c0de",
                })),
            );
            mock
        }

        pub fn respond(&self, method: &str, response: Result<Value, RpcError>) {
            self.responses
                .lock()
                .unwrap()
                .insert(method.to_string(), response);
        }

        pub fn calls_to(&self, method: &str) -> Vec<Value> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|(m, _)| m == method)
                .map(|(_, p)| p.clone())
                .collect()
        }
    }

    #[async_trait]
    impl EvmProvider for MockProvider {
        fn kind(&self) -> &str {
            "mock"
        }

        async fn request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
            self.calls
                .lock()
                .unwrap()
                .push((method.to_string(), params));
            self.responses
                .lock()
                .unwrap()
                .get(method)
                .cloned()
                .unwrap_or_else(|| Err(RpcError::new(4200, format!("{method} not supported"))))
        }

        fn subscribe(&self) -> broadcast::Receiver<ProviderEvent> {
            self.events.subscribe()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::MockProvider;
    use super::*;
    use crate::chains::BSC;

    const ACCOUNT: &str = "0x000000000000000000000000000000000000dEaD";

    #[test]
    fn http_status_is_not_an_rpc_code() {
        use reqwest::StatusCode;

        for status in [
            StatusCode::BAD_GATEWAY,
            StatusCode::SERVICE_UNAVAILABLE,
            StatusCode::GATEWAY_TIMEOUT,
            StatusCode::REQUEST_TIMEOUT,
            StatusCode::TOO_MANY_REQUESTS,
        ] {
            let message = http_status_message(status, "https://rpc.example");
            assert!(message.starts_with("network error: HTTP"), "{message}");
        }
        assert_eq!(
            http_status_message(StatusCode::UNAUTHORIZED, "https://rpc.example"),
            "HTTP 401 Unauthorized from https://rpc.example"
        );
    }

    #[test]
    fn parse_quantity_values() {
        assert_eq!(parse_quantity("0x0").unwrap(), 0);
        assert_eq!(parse_quantity("0x5208").unwrap(), 21000);
        assert_eq!(parse_quantity("0x").unwrap(), 0);
        assert!(parse_quantity("5208").is_err());
    }

    #[test]
    fn receipt_from_json() {
        let receipt = TransactionReceipt::from_json(&json!({
            "transactionHash": "0x01",
            "status": "0x0",
            "blockNumber": "0x2a",
            "gasUsed": "0x10",
            "contractAddress": null,
        }))
        .unwrap();
        assert!(!receipt.success);
        assert_eq!(receipt.block_number, Some(42));
        assert_eq!(receipt.gas_used, Some(16));
        assert_eq!(receipt.contract_address, None);
    }

    #[test]
    fn transaction_request_json_omits_empty_fields() {
        let tx = TransactionRequest {
            from: ACCOUNT.into(),
            to: None,
            data: vec![0x60, 0x80],
            value: None,
        };
        let json = tx.to_json();
        assert_eq!(json["data"], "0x6080");
        assert!(json.get("to").is_none());
        assert!(json.get("value").is_none());
    }

    #[tokio::test]
    async fn chain_id_parses_hex() {
        let client = EvmClient::new(Arc::new(MockProvider::connected(56, ACCOUNT)));
        assert_eq!(client.chain_id().await.unwrap(), 56);
    }

    #[tokio::test]
    async fn ensure_chain_detects_mismatch() {
        let client = EvmClient::new(Arc::new(MockProvider::connected(1, ACCOUNT)));
        let err = client.ensure_chain(56).await.unwrap_err();
        assert!(matches!(
            err,
            EthError::WrongNetwork {
                expected: 56,
                actual: 1
            }
        ));
    }

    #[tokio::test]
    async fn signer_requires_account() {
        let mock = MockProvider::connected(1, ACCOUNT);
        mock.respond("eth_accounts", Ok(json!([])));
        let client = EvmClient::new(Arc::new(mock));
        assert!(matches!(
            client.signer().await,
            Err(EthError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn wait_for_receipt_reports_revert() {
        let mock = MockProvider::connected(1, ACCOUNT);
        mock.respond(
            "eth_getTransactionReceipt",
            Ok(json!({ "transactionHash": "0x01", "status": "0x0", "blockNumber": "0x1" })),
        );
        let client = EvmClient::new(Arc::new(mock));
        assert!(matches!(
            client.wait_for_receipt("0x01").await,
            Err(EthError::Reverted { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn wait_for_receipt_times_out() {
        let mock = MockProvider::connected(1, ACCOUNT);
        mock.respond("eth_getTransactionReceipt", Ok(Value::Null));
        let client = EvmClient::new(Arc::new(mock)).with_confirmation_policy(ConfirmationPolicy {
            interval: Duration::from_millis(10),
            max_attempts: 3,
        });
        assert!(matches!(
            client.wait_for_receipt("0x01").await,
            Err(EthError::ConfirmationTimeout(_))
        ));
    }

    #[tokio::test]
    async fn switch_chain_adds_unknown_chain() {
        let mock = Arc::new(MockProvider::connected(1, ACCOUNT));
        mock.respond(
            "wallet_switchEthereumChain",
            Err(RpcError::new(UNRECOGNIZED_CHAIN, "Unrecognized chain ID")),
        );
        mock.respond("wallet_addEthereumChain", Ok(Value::Null));

        let client = EvmClient::new(mock.clone());
        client.switch_chain(&BSC).await.unwrap();

        let added = mock.calls_to("wallet_addEthereumChain");
        assert_eq!(added.len(), 1);
        assert_eq!(added[0][0]["chainId"], "0x38");
    }

    #[tokio::test]
    async fn switch_chain_propagates_rejection() {
        let mock = MockProvider::connected(1, ACCOUNT);
        mock.respond(
            "wallet_switchEthereumChain",
            Err(RpcError::new(4001, "User rejected the request.")),
        );
        let client = EvmClient::new(Arc::new(mock));
        let err = client.switch_chain(&BSC).await.unwrap_err();
        assert!(matches!(err, EthError::Rpc(RpcError { code: Some(4001), .. })));
    }
}
