//! Client for the launchpad backend REST API.
//!
//! Responses are treated as opaque JSON except where this crate needs a
//! typed value (compiled contracts).

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use chain_eth::deployer::{CompiledContract, ContractSource};
use chain_eth::error::EthError;
use chain_eth::token::{ContractType, TokenFeatures};

use crate::chains::ChainId;
use crate::config::LaunchpadConfig;
use crate::error::CoreError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// A deployed token as registered with the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRegistration {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    pub total_supply: String,
    pub chain: ChainId,
    pub contract_address: String,
    pub transaction_hash: String,
    pub owner_address: String,
    pub contract_type: Option<ContractType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub features: Option<TokenFeatures>,
}

#[derive(Clone)]
pub struct BackendClient {
    base_url: String,
    client: reqwest::Client,
    auth_token: Option<String>,
}

impl BackendClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, CoreError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| CoreError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
            auth_token: None,
        })
    }

    pub fn from_config(config: &LaunchpadConfig) -> Result<Self, CoreError> {
        Self::new(&config.api_url)
    }

    /// Bearer token sent with every request (from `/api/auth/verify`).
    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Value, CoreError> {
        let request = match &self.auth_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };
        let response = request.send().await.map_err(|e| CoreError::Api {
            status: None,
            message: e.to_string(),
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| CoreError::Api {
            status: Some(status.as_u16()),
            message: e.to_string(),
        })?;
        let payload: Value = if body.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&body).unwrap_or(Value::String(body))
        };

        if !status.is_success() {
            let message = payload["error"]
                .as_str()
                .or_else(|| payload["message"].as_str())
                .or_else(|| payload.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| status.to_string());
            return Err(CoreError::Api {
                status: Some(status.as_u16()),
                message,
            });
        }
        Ok(payload)
    }

    async fn get(&self, path: &str) -> Result<Value, CoreError> {
        debug!(path, "GET");
        self.send(self.client.get(self.url(path))).await
    }

    async fn post(&self, path: &str, body: &impl Serialize) -> Result<Value, CoreError> {
        debug!(path, "POST");
        self.send(self.client.post(self.url(path)).json(body)).await
    }

    /// `POST /api/tokens/deploy`
    pub async fn register_deployment(
        &self,
        registration: &TokenRegistration,
    ) -> Result<Value, CoreError> {
        let response = self.post("/api/tokens/deploy", registration).await?;
        info!(
            symbol = %registration.symbol,
            chain = %registration.chain,
            address = %registration.contract_address,
            "token registered with backend"
        );
        Ok(response)
    }

    /// `POST /api/tokens/:id/status`
    pub async fn update_token_status(
        &self,
        token_id: &str,
        status: &str,
        details: Option<Value>,
    ) -> Result<Value, CoreError> {
        let mut body = json!({ "status": status });
        if let Some(details) = details {
            body["details"] = details;
        }
        self.post(&format!("/api/tokens/{token_id}/status"), &body).await
    }

    /// `GET /api/tokens`, optionally filtered by owner.
    pub async fn list_tokens(&self, owner: Option<&str>) -> Result<Value, CoreError> {
        debug!(path = "/api/tokens", ?owner, "GET");
        let mut request = self.client.get(self.url("/api/tokens"));
        if let Some(owner) = owner {
            request = request.query(&[("owner", owner)]);
        }
        self.send(request).await
    }

    /// `GET /api/contracts/compile/:type`
    pub async fn compile_contract(
        &self,
        contract_type: ContractType,
    ) -> Result<CompiledContract, CoreError> {
        let value = self
            .get(&format!("/api/contracts/compile/{contract_type}"))
            .await?;
        // Some deployments wrap the artifact in `data`.
        let artifact = if value.get("bytecode").is_some() {
            value
        } else {
            value["data"].clone()
        };
        let compiled: CompiledContract = serde_json::from_value(artifact).map_err(|e| {
            CoreError::Api {
                status: None,
                message: format!("unexpected compile response: {e}"),
            }
        })?;
        Ok(compiled)
    }

    /// `POST /api/gas/estimate`
    pub async fn estimate_gas(&self, request: &Value) -> Result<Value, CoreError> {
        self.post("/api/gas/estimate", request).await
    }

    /// `POST /api/auth/verify` with a wallet signature.
    pub async fn verify_signature(
        &self,
        address: &str,
        message: &str,
        signature: &str,
    ) -> Result<Value, CoreError> {
        let body = json!({ "address": address, "message": message, "signature": signature });
        self.post("/api/auth/verify", &body).await
    }
}

#[async_trait]
impl ContractSource for BackendClient {
    async fn compiled(&self, contract_type: ContractType) -> Result<CompiledContract, EthError> {
        self.compile_contract(contract_type)
            .await
            .map_err(|e| EthError::ContractSource(e.to_string()))
    }
}
