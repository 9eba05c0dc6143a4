use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::chains::ChainId;
use crate::error::CoreError;

pub const ENV_API_URL: &str = "LAUNCHPAD_API_URL";
pub const ENV_POLL_INTERVAL_MS: &str = "LAUNCHPAD_POLL_INTERVAL_MS";
pub const ENV_PINATA_API_KEY: &str = "PINATA_API_KEY";
pub const ENV_PINATA_SECRET_API_KEY: &str = "PINATA_SECRET_API_KEY";

/// Launchpad client configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LaunchpadConfig {
    /// Backend REST API base URL.
    pub api_url: String,
    /// Receipt polling interval for pending transactions.
    pub poll_interval_ms: u64,
    /// Transaction history entries kept (most recent first).
    pub max_history: usize,
    pub storage_prefix: String,
    pub pinata_api_key: Option<String>,
    pub pinata_secret_api_key: Option<String>,
    pub pinata_gateway: String,
    /// Per-chain JSON-RPC endpoints replacing the public defaults.
    pub rpc_overrides: HashMap<ChainId, String>,
}

impl Default for LaunchpadConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:3001".into(),
            poll_interval_ms: 2_500,
            max_history: 100,
            storage_prefix: "launchpad_".into(),
            pinata_api_key: None,
            pinata_secret_api_key: None,
            pinata_gateway: "https://gateway.pinata.cloud/ipfs".into(),
            rpc_overrides: HashMap::new(),
        }
    }
}

fn check_url(field: &str, url: &str) -> Result<(), CoreError> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(CoreError::Config(format!("{field} must be an http(s) URL, got {url:?}")))
    }
}

impl LaunchpadConfig {
    pub fn from_json_str(json: &str) -> Result<Self, CoreError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| CoreError::Config(format!("invalid config JSON: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            CoreError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        let config = Self::from_json_str(&content)?;
        info!(path = %path.display(), "loaded launchpad config");
        Ok(config)
    }

    /// Applies `LAUNCHPAD_*` and `PINATA_*` environment variables.
    pub fn with_env_overrides(self) -> Result<Self, CoreError> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides from `lookup`, then validates.
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, CoreError> {
        if let Some(url) = lookup(ENV_API_URL) {
            self.api_url = url;
        }
        if let Some(raw) = lookup(ENV_POLL_INTERVAL_MS) {
            self.poll_interval_ms = raw.trim().parse().map_err(|_| {
                CoreError::Config(format!("{ENV_POLL_INTERVAL_MS} must be an integer, got {raw:?}"))
            })?;
        }
        if let Some(key) = lookup(ENV_PINATA_API_KEY) {
            self.pinata_api_key = Some(key);
        }
        if let Some(secret) = lookup(ENV_PINATA_SECRET_API_KEY) {
            self.pinata_secret_api_key = Some(secret);
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.poll_interval_ms == 0 {
            return Err(CoreError::Config("pollIntervalMs must be > 0".into()));
        }
        if self.max_history == 0 {
            return Err(CoreError::Config("maxHistory must be > 0".into()));
        }
        check_url("apiUrl", &self.api_url)?;
        check_url("pinataGateway", &self.pinata_gateway)?;
        for (chain, url) in &self.rpc_overrides {
            check_url(&format!("rpcOverrides.{chain}"), url)?;
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn rpc_url(&self, chain: ChainId) -> &str {
        self.rpc_overrides
            .get(&chain)
            .map(String::as_str)
            .unwrap_or_else(|| chain.default_rpc_url())
    }

    /// Both Pinata credentials, when configured.
    pub fn pinata_credentials(&self) -> Option<(&str, &str)> {
        match (&self.pinata_api_key, &self.pinata_secret_api_key) {
            (Some(key), Some(secret)) if !key.is_empty() && !secret.is_empty() => {
                Some((key.as_str(), secret.as_str()))
            }
            _ => None,
        }
    }
}
