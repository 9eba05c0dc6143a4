use thiserror::Error;

use chain_eth::error::EthError;
use chain_sol::error::SolError;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("EVM: {0}")]
    Eth(#[from] EthError),

    #[error("Solana: {0}")]
    Sol(#[from] SolError),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Unsupported chain: {0}")]
    UnsupportedChain(String),

    #[error("No wallet provider available for {0}")]
    ProviderMissing(String),

    #[error("Wallet is not connected")]
    NotConnected,

    #[error("Backend request failed{}: {message}", .status.map(|s| format!(" ({s})")).unwrap_or_default())]
    Api { status: Option<u16>, message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::Storage(format!("JSON: {e}"))
    }
}

impl From<std::io::Error> for CoreError {
    fn from(e: std::io::Error) -> Self {
        CoreError::Storage(e.to_string())
    }
}
