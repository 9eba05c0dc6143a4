//! Solana JSON-RPC port and its HTTP implementation.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use crate::address::Pubkey;
use crate::error::SolError;
use crate::transaction::parse_blockhash;

/// On-chain state of an SPL mint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintInfo {
    pub mint_authority: Option<Pubkey>,
    pub freeze_authority: Option<Pubkey>,
    pub decimals: u8,
    pub supply: u64,
    pub is_initialized: bool,
}

impl MintInfo {
    /// Parses the `parsed.info` object of a `jsonParsed` mint account.
    pub fn from_parsed(info: &Value) -> Result<Self, SolError> {
        let authority = |field: &str| -> Result<Option<Pubkey>, SolError> {
            match info[field].as_str() {
                Some(raw) => raw.parse().map(Some),
                None => Ok(None),
            }
        };
        let decimals = info["decimals"]
            .as_u64()
            .and_then(|d| u8::try_from(d).ok())
            .ok_or_else(|| SolError::rpc("mint account has no decimals"))?;
        let supply = info["supply"]
            .as_str()
            .unwrap_or("0")
            .parse()
            .map_err(|e| SolError::rpc(format!("invalid mint supply: {e}")))?;

        Ok(Self {
            mint_authority: authority("mintAuthority")?,
            freeze_authority: authority("freezeAuthority")?,
            decimals,
            supply,
            is_initialized: info["isInitialized"].as_bool().unwrap_or(true),
        })
    }
}

/// Status of a submitted signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureStatus {
    pub slot: u64,
    pub confirmations: Option<u64>,
    /// Program error, if the transaction failed.
    pub err: Option<String>,
    /// `processed`, `confirmed` or `finalized`.
    pub confirmation_status: Option<String>,
}

impl SignatureStatus {
    pub fn from_json(value: &Value) -> Self {
        Self {
            slot: value["slot"].as_u64().unwrap_or_default(),
            confirmations: value["confirmations"].as_u64(),
            err: match &value["err"] {
                Value::Null => None,
                other => Some(other.to_string()),
            },
            confirmation_status: value["confirmationStatus"].as_str().map(str::to_string),
        }
    }

    /// Landed at `confirmed` or `finalized` commitment.
    pub fn is_confirmed(&self) -> bool {
        matches!(
            self.confirmation_status.as_deref(),
            Some("confirmed") | Some("finalized")
        ) || (self.confirmation_status.is_none() && self.confirmations.is_none())
    }
}

/// The RPC calls the adapter needs.
#[async_trait]
pub trait SolanaRpc: Send + Sync {
    async fn latest_blockhash(&self) -> Result<[u8; 32], SolError>;

    async fn mint_info(&self, mint: &Pubkey) -> Result<MintInfo, SolError>;

    /// `None` while the cluster has not seen the signature.
    async fn signature_status(&self, signature: &str) -> Result<Option<SignatureStatus>, SolError>;
}

/// `SolanaRpc` over HTTP JSON-RPC.
pub struct HttpSolanaRpc {
    url: String,
    client: reqwest::Client,
}

impl HttpSolanaRpc {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::new(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, SolError> {
        debug!(method, url = %self.url, "solana rpc");
        let body = json!({ "jsonrpc": "2.0", "id": 1, "method": method, "params": params });
        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| SolError::rpc(format!("network error: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SolError::rpc(http_status_message(status, &self.url)));
        }

        let mut payload: Value = response
            .json()
            .await
            .map_err(|e| SolError::rpc(format!("invalid JSON-RPC response: {e}")))?;
        if let Some(error) = payload.get("error") {
            return Err(SolError::Rpc {
                code: error["code"].as_i64(),
                message: error["message"].as_str().unwrap_or("unknown error").to_string(),
            });
        }
        Ok(payload["result"].take())
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
impl SolanaRpc for HttpSolanaRpc {
    async fn latest_blockhash(&self) -> Result<[u8; 32], SolError> {
        let result = self
            .call("getLatestBlockhash", json!([{ "commitment": "confirmed" }]))
            .await?;
        let raw = result["value"]["blockhash"]
            .as_str()
            .ok_or_else(|| SolError::rpc("getLatestBlockhash returned no blockhash"))?;
        parse_blockhash(raw)
    }

    async fn mint_info(&self, mint: &Pubkey) -> Result<MintInfo, SolError> {
        let result = self
            .call(
                "getAccountInfo",
                json!([mint.to_string(), { "encoding": "jsonParsed" }]),
            )
            .await?;
        let value = &result["value"];
        if value.is_null() {
            return Err(SolError::InvalidAddress(format!("mint {mint} does not exist")));
        }
        let parsed = &value["data"]["parsed"];
        if parsed["type"].as_str() != Some("mint") {
            return Err(SolError::InvalidAddress(format!("{mint} is not a token mint")));
        }
        MintInfo::from_parsed(&parsed["info"])
    }

    async fn signature_status(&self, signature: &str) -> Result<Option<SignatureStatus>, SolError> {
        let result = self
            .call(
                "getSignatureStatuses",
                json!([[signature], { "searchTransactionHistory": true }]),
            )
            .await?;
        let status = &result["value"][0];
        if status.is_null() {
            return Ok(None);
        }
        Ok(Some(SignatureStatus::from_json(status)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_errors_read_as_network_errors() {
        let message = http_status_message(
            reqwest::StatusCode::SERVICE_UNAVAILABLE,
            "https://api.devnet.solana.com",
        );
        assert_eq!(
            message,
            "network error: HTTP 503 Service Unavailable from https://api.devnet.solana.com"
        );
        let message = http_status_message(reqwest::StatusCode::NOT_FOUND, "https://rpc.example");
        assert!(!message.contains("network"));
    }

    #[test]
    fn mint_info_from_parsed_account() {
        let info = json!({
            "decimals": 9,
            "freezeAuthority": null,
            "isInitialized": true,
            "mintAuthority": "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA",
            "supply": "1000000000000"
        });
        let mint = MintInfo::from_parsed(&info).unwrap();
        assert_eq!(mint.decimals, 9);
        assert_eq!(mint.supply, 1_000_000_000_000);
        assert!(mint.freeze_authority.is_none());
        assert_eq!(
            mint.mint_authority.unwrap().to_string(),
            "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA"
        );
    }

    #[test]
    fn mint_info_requires_decimals() {
        assert!(MintInfo::from_parsed(&json!({ "supply": "1" })).is_err());
    }

    #[test]
    fn signature_status_parsing() {
        let ok = SignatureStatus::from_json(&json!({
            "slot": 72,
            "confirmations": 10,
            "err": null,
            "confirmationStatus": "confirmed"
        }));
        assert!(ok.is_confirmed());
        assert!(ok.err.is_none());

        let processed = SignatureStatus::from_json(&json!({
            "slot": 72,
            "confirmations": 0,
            "err": null,
            "confirmationStatus": "processed"
        }));
        assert!(!processed.is_confirmed());

        let failed = SignatureStatus::from_json(&json!({
            "slot": 5,
            "confirmations": null,
            "err": { "InstructionError": [0, { "Custom": 4 }] },
            "confirmationStatus": "finalized"
        }));
        assert!(failed.is_confirmed());
        assert!(failed.err.unwrap().contains("Custom"));
    }
}
