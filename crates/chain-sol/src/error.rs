use thiserror::Error;

/// Solana chain operation errors.
#[derive(Debug, Error)]
pub enum SolError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("transaction build error: {0}")]
    TransactionBuildError(String),

    #[error("serialization error: {0}")]
    SerializationError(String),

    /// A multisend line could not be parsed. `line` is 1-based.
    #[error("line {line}: {reason}")]
    FormatError { line: usize, reason: String },

    #[error("{authority} authority is {expected}, connected wallet is {actual}")]
    AuthorityMismatch {
        authority: String,
        expected: String,
        actual: String,
    },

    #[error("{0} authority has already been revoked")]
    AuthorityRevoked(String),

    #[error("no Solana wallet detected")]
    WalletMissing,

    #[error("wallet is not connected")]
    NotConnected,

    /// Error reported by the wallet adapter (4001 is a user rejection).
    #[error("wallet error{}: {message}", .code.map(|c| format!(" {c}")).unwrap_or_default())]
    Wallet { code: Option<i64>, message: String },

    #[error("rpc error{}: {message}", .code.map(|c| format!(" {c}")).unwrap_or_default())]
    Rpc { code: Option<i64>, message: String },

    #[error("transaction {signature} failed: {reason}")]
    TransactionFailed { signature: String, reason: String },

    #[error("timed out waiting for signature {0}")]
    ConfirmationTimeout(String),

    #[error("metadata upload failed: {0}")]
    MetadataUpload(String),

    /// A multisend chunk failed after earlier chunks landed. Recipients in
    /// chunks before `failed_chunk` have been paid.
    #[error("multisend stopped at chunk {failed_chunk} after {} confirmed: {source}", .completed_signatures.len())]
    PartialMultisend {
        completed_signatures: Vec<String>,
        failed_chunk: usize,
        /// Number of batch entries covered by `completed_signatures`.
        completed_recipients: usize,
        source: Box<SolError>,
    },
}

impl SolError {
    pub fn rpc(message: impl Into<String>) -> Self {
        SolError::Rpc {
            code: None,
            message: message.into(),
        }
    }

    pub fn format(line: usize, reason: impl Into<String>) -> Self {
        SolError::FormatError {
            line,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_format_error() {
        let err = SolError::format(3, "invalid amount \"abc\"");
        assert_eq!(err.to_string(), "line 3: invalid amount \"abc\"");
    }

    #[test]
    fn display_authority_mismatch() {
        let err = SolError::AuthorityMismatch {
            authority: "freeze".into(),
            expected: "A".into(),
            actual: "B".into(),
        };
        assert_eq!(
            err.to_string(),
            "freeze authority is A, connected wallet is B"
        );
    }

    #[test]
    fn display_wallet_error_with_code() {
        let err = SolError::Wallet {
            code: Some(4001),
            message: "User rejected the request.".into(),
        };
        assert_eq!(err.to_string(), "wallet error 4001: User rejected the request.");

        let err = SolError::Wallet {
            code: None,
            message: "locked".into(),
        };
        assert_eq!(err.to_string(), "wallet error: locked");
    }

    #[test]
    fn display_rpc_error() {
        assert_eq!(
            SolError::rpc("Blockhash not found").to_string(),
            "rpc error: Blockhash not found"
        );
    }
}
