use thiserror::Error;

/// A JSON-RPC / EIP-1193 error as reported by a provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("provider error{}: {message}", .code.map(|c| format!(" {c}")).unwrap_or_default())]
pub struct RpcError {
    pub code: Option<i64>,
    pub message: String,
}

impl RpcError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            message: message.into(),
        }
    }

    pub fn message(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }
}

/// EVM chain operation errors.
#[derive(Debug, Error)]
pub enum EthError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("invalid token parameters: {0}")]
    InvalidParams(String),

    #[error("encoding error: {0}")]
    EncodingError(String),

    #[error("unsupported chain: {0}")]
    UnsupportedChain(u64),

    #[error("no EVM wallet provider detected")]
    ProviderMissing,

    #[error("wallet is not connected")]
    NotConnected,

    #[error("wrong network: expected chain {expected}, wallet is on chain {actual}")]
    WrongNetwork { expected: u64, actual: u64 },

    #[error(transparent)]
    Rpc(#[from] RpcError),

    #[error("transaction {hash} reverted")]
    Reverted { hash: String },

    #[error("timed out waiting for transaction {0}")]
    ConfirmationTimeout(String),

    #[error("contract source error: {0}")]
    ContractSource(String),
}
