//! Pinata-backed IPFS storage for token logos and metadata documents.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde_json::{json, Value};
use tracing::{debug, info};

use chain_sol::error::SolError;
use chain_sol::metadata::MetadataStorage;

use crate::config::LaunchpadConfig;
use crate::error::CoreError;

pub const PINATA_API_URL: &str = "https://api.pinata.cloud";

pub struct PinataStorage {
    api_url: String,
    gateway: String,
    api_key: String,
    secret_api_key: String,
    client: reqwest::Client,
}

impl PinataStorage {
    pub fn new(
        api_key: impl Into<String>,
        secret_api_key: impl Into<String>,
        gateway: impl Into<String>,
    ) -> Self {
        Self {
            api_url: PINATA_API_URL.to_string(),
            gateway: gateway.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            secret_api_key: secret_api_key.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Fails with [`CoreError::Config`] when credentials are missing.
    pub fn from_config(config: &LaunchpadConfig) -> Result<Self, CoreError> {
        let (key, secret) = config.pinata_credentials().ok_or_else(|| {
            CoreError::Config("Pinata API key and secret are required for uploads".into())
        })?;
        Ok(Self::new(key, secret, &config.pinata_gateway))
    }

    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn gateway_url(&self, cid: &str) -> String {
        format!("{}/{cid}", self.gateway)
    }

    async fn pin(&self, request: reqwest::RequestBuilder) -> Result<String, CoreError> {
        let response = request
            .header("pinata_api_key", &self.api_key)
            .header("pinata_secret_api_key", &self.secret_api_key)
            .send()
            .await
            .map_err(|e| CoreError::Api {
                status: None,
                message: format!("Pinata: {e}"),
            })?;

        let status = response.status();
        let payload: Value = response.json().await.unwrap_or(Value::Null);
        if !status.is_success() {
            let message = payload["error"]["details"]
                .as_str()
                .or_else(|| payload["error"].as_str())
                .unwrap_or("upload rejected")
                .to_string();
            return Err(CoreError::Api {
                status: Some(status.as_u16()),
                message: format!("Pinata: {message}"),
            });
        }

        payload["IpfsHash"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| CoreError::Api {
                status: Some(status.as_u16()),
                message: "Pinata response has no IpfsHash".into(),
            })
    }

    /// `pinJSONToIPFS`; returns the CID.
    pub async fn pin_json(&self, name: &str, document: &Value) -> Result<String, CoreError> {
        let body = json!({
            "pinataContent": document,
            "pinataMetadata": { "name": name },
        });
        debug!(name, "pinning JSON");
        let request = self
            .client
            .post(format!("{}/pinning/pinJSONToIPFS", self.api_url))
            .json(&body);
        self.pin(request).await
    }

    /// `pinFileToIPFS`; returns the CID.
    pub async fn pin_file(
        &self,
        file_name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, CoreError> {
        let size = bytes.len();
        let part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(content_type)
            .map_err(|e| CoreError::Config(format!("invalid content type {content_type:?}: {e}")))?;
        let form = Form::new()
            .part("file", part)
            .text("pinataMetadata", json!({ "name": file_name }).to_string());
        debug!(file_name, size, "pinning file");
        let request = self
            .client
            .post(format!("{}/pinning/pinFileToIPFS", self.api_url))
            .multipart(form);
        self.pin(request).await
    }
}

#[async_trait]
impl MetadataStorage for PinataStorage {
    async fn upload_file(
        &self,
        file_name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, SolError> {
        let cid = self
            .pin_file(file_name, content_type, bytes)
            .await
            .map_err(|e| SolError::MetadataUpload(e.to_string()))?;
        info!(file_name, cid = %cid, "file pinned");
        Ok(self.gateway_url(&cid))
    }

    async fn upload_json(&self, name: &str, document: &Value) -> Result<String, SolError> {
        let cid = self
            .pin_json(name, document)
            .await
            .map_err(|e| SolError::MetadataUpload(e.to_string()))?;
        info!(name, cid = %cid, "metadata pinned");
        Ok(self.gateway_url(&cid))
    }
}
