//! Maps wallet, RPC and adapter failures onto a small user-facing taxonomy.
//!
//! Raw errors are resolved in three steps: an exact code lookup, then a
//! phrase search over the lowercased message, then passthrough of short raw
//! messages. Typed adapter errors skip straight to their category.

use std::fmt;

use serde::Serialize;

use chain_eth::error::{EthError, RpcError};
use chain_sol::error::SolError;

use crate::error::CoreError;

/// Longest raw message shown to the user verbatim.
pub const MAX_PASSTHROUGH_LEN: usize = 120;

pub const FALLBACK_MESSAGE: &str = "Something went wrong. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    UserRejected,
    WrongNetwork,
    ProviderMissing,
    InsufficientFunds,
    InvalidAddress,
    AuthorityMismatch,
    NetworkOrTimeout,
    ContractExecutionFailed,
    FormatError,
    Unknown,
}

impl ErrorCategory {
    /// Only transient network conditions are worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorCategory::NetworkOrTimeout)
    }

    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorCategory::UserRejected => "Transaction was rejected in your wallet.",
            ErrorCategory::WrongNetwork => "Your wallet is connected to the wrong network.",
            ErrorCategory::ProviderMissing => {
                "No wallet found. Install or unlock a wallet and connect it."
            }
            ErrorCategory::InsufficientFunds => "Insufficient funds to pay for this transaction.",
            ErrorCategory::InvalidAddress => "The address is not valid for this network.",
            ErrorCategory::AuthorityMismatch => {
                "The connected wallet does not hold the required authority."
            }
            ErrorCategory::NetworkOrTimeout => "Network error. Please try again.",
            ErrorCategory::ContractExecutionFailed => "The transaction was reverted on-chain.",
            ErrorCategory::FormatError => "The input is not in the expected format.",
            ErrorCategory::Unknown => FALLBACK_MESSAGE,
        }
    }
}

/// An error ready for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedError {
    pub category: ErrorCategory,
    pub message: String,
    /// The raw code, when one was reported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub retryable: bool,
}

impl NormalizedError {
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
            code: None,
            retryable: category.is_retryable(),
        }
    }

    fn with_code(mut self, code: Option<ErrorCode<'_>>) -> Self {
        self.code = code.map(|c| c.to_string());
        self
    }
}

impl fmt::Display for NormalizedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// A provider error code: EIP-1193 / JSON-RPC numbers or ethers-style names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode<'a> {
    Numeric(i64),
    Text(&'a str),
}

impl fmt::Display for ErrorCode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCode::Numeric(n) => write!(f, "{n}"),
            ErrorCode::Text(s) => f.write_str(s),
        }
    }
}

fn numeric_code(code: i64) -> Option<(ErrorCategory, &'static str)> {
    use ErrorCategory::*;
    let entry = match code {
        4001 => (UserRejected, "Transaction was rejected in your wallet."),
        4100 => (
            UserRejected,
            "This site is not authorized by your wallet. Connect and try again.",
        ),
        4200 => (ProviderMissing, "Your wallet does not support this request."),
        4900 => (NetworkOrTimeout, "Your wallet is disconnected from the network."),
        4901 => (NetworkOrTimeout, "Your wallet is not connected to the requested chain."),
        4902 => (WrongNetwork, "This network has not been added to your wallet."),
        -32002 => (
            Unknown,
            "A wallet request is already pending. Open your wallet to continue.",
        ),
        -32003 => (ContractExecutionFailed, "The transaction was rejected by the node."),
        -32005 => (NetworkOrTimeout, "The RPC endpoint is rate limited. Please try again."),
        -32602 => (FormatError, "The request had invalid parameters."),
        _ => return None,
    };
    Some(entry)
}

fn text_code(code: &str) -> Option<(ErrorCategory, &'static str)> {
    use ErrorCategory::*;
    let entry = match code {
        "ACTION_REJECTED" => (UserRejected, "Transaction was rejected in your wallet."),
        "INSUFFICIENT_FUNDS" => (
            InsufficientFunds,
            "Insufficient funds to pay for this transaction.",
        ),
        "NETWORK_ERROR" => (NetworkOrTimeout, "Network error. Please try again."),
        "TIMEOUT" => (NetworkOrTimeout, "The request timed out. Please try again."),
        "SERVER_ERROR" => (NetworkOrTimeout, "The RPC server returned an error."),
        "NONCE_EXPIRED" => (
            NetworkOrTimeout,
            "Transaction nonce is out of date. Please try again.",
        ),
        "CALL_EXCEPTION" => (ContractExecutionFailed, "The contract call reverted."),
        "UNPREDICTABLE_GAS_LIMIT" => (
            ContractExecutionFailed,
            "Gas estimation failed. The transaction would likely revert.",
        ),
        "INVALID_ARGUMENT" => (FormatError, "The request had invalid parameters."),
        _ => return None,
    };
    Some(entry)
}

/// Ordered: earlier phrases win. The bare "network" row stays last.
const PHRASES: &[(&[&str], ErrorCategory, &str)] = &[
    (
        &["user rejected", "user denied", "rejected the request", "user cancel"],
        ErrorCategory::UserRejected,
        "Transaction was rejected in your wallet.",
    ),
    (
        &["insufficient funds", "insufficient lamports", "insufficient balance"],
        ErrorCategory::InsufficientFunds,
        "Insufficient funds to pay for this transaction.",
    ),
    (
        &["nonce too low", "nonce has already been used"],
        ErrorCategory::NetworkOrTimeout,
        "Transaction nonce is out of date. Please try again.",
    ),
    (
        &["blockhash not found", "block height exceeded"],
        ErrorCategory::NetworkOrTimeout,
        "The transaction expired before it landed. Please try again.",
    ),
    (
        &["custom program error"],
        ErrorCategory::ContractExecutionFailed,
        "The Solana program rejected the transaction.",
    ),
    (
        &["authority"],
        ErrorCategory::AuthorityMismatch,
        "The connected wallet does not hold the required authority.",
    ),
    (
        &["execution reverted"],
        ErrorCategory::ContractExecutionFailed,
        "The transaction was reverted on-chain.",
    ),
    (
        &["timeout", "timed out"],
        ErrorCategory::NetworkOrTimeout,
        "The request timed out. Please try again.",
    ),
    (
        &["rate limit", "too many requests"],
        ErrorCategory::NetworkOrTimeout,
        "The RPC endpoint is rate limited. Please try again.",
    ),
    (
        &["invalid address", "invalid public key"],
        ErrorCategory::InvalidAddress,
        "The address is not valid for this network.",
    ),
    (
        &["wrong network", "chain mismatch", "unrecognized chain"],
        ErrorCategory::WrongNetwork,
        "Your wallet is connected to the wrong network.",
    ),
    (
        &["network", "failed to fetch", "connection"],
        ErrorCategory::NetworkOrTimeout,
        "Network error. Please try again.",
    ),
];

fn lookup_code(code: ErrorCode<'_>) -> Option<(ErrorCategory, &'static str)> {
    match code {
        ErrorCode::Numeric(n) => numeric_code(n),
        ErrorCode::Text(s) => match s.trim().parse::<i64>() {
            Ok(n) => numeric_code(n),
            Err(_) => text_code(s.trim()),
        },
    }
}

fn lookup_phrase(message: &str) -> Option<(ErrorCategory, &'static str)> {
    let lower = message.to_lowercase();
    PHRASES
        .iter()
        .find(|(needles, _, _)| needles.iter().any(|n| lower.contains(n)))
        .map(|(_, category, text)| (*category, *text))
}

/// Normalizes a raw provider error.
pub fn normalize(code: Option<ErrorCode<'_>>, message: Option<&str>) -> NormalizedError {
    if let Some((category, text)) = code.and_then(lookup_code) {
        return NormalizedError::new(category, text).with_code(code);
    }

    let message = message.map(str::trim).filter(|m| !m.is_empty());
    if let Some((category, text)) = message.and_then(lookup_phrase) {
        return NormalizedError::new(category, text).with_code(code);
    }

    let shown = match message {
        Some(m) if m.chars().count() <= MAX_PASSTHROUGH_LEN => m,
        _ => FALLBACK_MESSAGE,
    };
    NormalizedError::new(ErrorCategory::Unknown, shown).with_code(code)
}

/// Normalizes a free-form message with no code.
pub fn normalize_message(message: &str) -> NormalizedError {
    normalize(None, Some(message))
}

fn normalize_rpc(code: Option<i64>, message: &str) -> NormalizedError {
    normalize(code.map(ErrorCode::Numeric), Some(message))
}

/// Types that know their own category.
pub trait Classify {
    fn classify(&self) -> NormalizedError;
}

impl Classify for RpcError {
    fn classify(&self) -> NormalizedError {
        normalize_rpc(self.code, &self.message)
    }
}

impl Classify for EthError {
    fn classify(&self) -> NormalizedError {
        use ErrorCategory::*;
        match self {
            EthError::Rpc(e) => e.classify(),
            EthError::InvalidAddress(_) => NormalizedError::new(InvalidAddress, self.to_string()),
            EthError::InvalidAmount(_) | EthError::InvalidParams(_) => {
                NormalizedError::new(FormatError, self.to_string())
            }
            EthError::EncodingError(_) => NormalizedError::new(Unknown, FALLBACK_MESSAGE),
            EthError::UnsupportedChain(_) | EthError::WrongNetwork { .. } => {
                NormalizedError::new(WrongNetwork, self.to_string())
            }
            EthError::ProviderMissing => {
                NormalizedError::new(ProviderMissing, ProviderMissing.default_message())
            }
            EthError::NotConnected => {
                NormalizedError::new(ProviderMissing, "Connect your wallet first.")
            }
            EthError::Reverted { .. } => NormalizedError::new(
                ContractExecutionFailed,
                ContractExecutionFailed.default_message(),
            ),
            EthError::ConfirmationTimeout(_) => NormalizedError::new(
                NetworkOrTimeout,
                "Timed out waiting for confirmation. Check the explorer before retrying.",
            ),
            EthError::ContractSource(_) => NormalizedError::new(
                NetworkOrTimeout,
                "Could not fetch the compiled contract. Please try again.",
            ),
        }
    }
}

impl Classify for SolError {
    fn classify(&self) -> NormalizedError {
        use ErrorCategory::*;
        match self {
            SolError::Wallet { code, message } | SolError::Rpc { code, message } => {
                normalize_rpc(*code, message)
            }
            SolError::TransactionFailed { reason, .. } => {
                let normalized = normalize_message(reason);
                if normalized.category == Unknown {
                    NormalizedError::new(
                        ContractExecutionFailed,
                        "The Solana program rejected the transaction.",
                    )
                } else {
                    normalized
                }
            }
            SolError::InvalidAddress(_) => NormalizedError::new(InvalidAddress, self.to_string()),
            SolError::InvalidAmount(_) | SolError::FormatError { .. } => {
                NormalizedError::new(FormatError, self.to_string())
            }
            SolError::AuthorityMismatch { .. } | SolError::AuthorityRevoked(_) => {
                NormalizedError::new(AuthorityMismatch, self.to_string())
            }
            SolError::WalletMissing => {
                NormalizedError::new(ProviderMissing, ProviderMissing.default_message())
            }
            SolError::NotConnected => {
                NormalizedError::new(ProviderMissing, "Connect your wallet first.")
            }
            SolError::ConfirmationTimeout(_) => NormalizedError::new(
                NetworkOrTimeout,
                "Timed out waiting for confirmation. Check the explorer before retrying.",
            ),
            SolError::MetadataUpload(_) => NormalizedError::new(
                NetworkOrTimeout,
                "Metadata upload failed. Please try again.",
            ),
            // Completed chunks must not be re-sent.
            SolError::PartialMultisend { source, .. } => NormalizedError {
                retryable: false,
                ..source.classify()
            },
            SolError::TransactionBuildError(_) | SolError::SerializationError(_) => {
                NormalizedError::new(Unknown, self.to_string())
            }
        }
    }
}

impl Classify for CoreError {
    fn classify(&self) -> NormalizedError {
        use ErrorCategory::*;
        match self {
            CoreError::Eth(e) => e.classify(),
            CoreError::Sol(e) => e.classify(),
            CoreError::UnsupportedChain(_) => NormalizedError::new(WrongNetwork, self.to_string()),
            CoreError::ProviderMissing(_) => NormalizedError::new(ProviderMissing, self.to_string()),
            CoreError::NotConnected => {
                NormalizedError::new(ProviderMissing, "Connect your wallet first.")
            }
            CoreError::Api { status, message } => match status {
                None | Some(408) | Some(429) | Some(500..=599) => {
                    NormalizedError::new(NetworkOrTimeout, "The server is unreachable. Please try again.")
                }
                Some(_) => normalize_message(message),
            },
            CoreError::Config(_) | CoreError::Storage(_) | CoreError::Internal(_) => {
                NormalizedError::new(Unknown, FALLBACK_MESSAGE)
            }
        }
    }
}
