//! Submission path shared by every Solana token operation: compile with the
//! connected wallet as fee payer, have the wallet sign and send, then poll
//! the cluster until the signature is confirmed.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::address::Pubkey;
use crate::error::SolError;
use crate::rpc::{MintInfo, SolanaRpc};
use crate::transaction::{Instruction, Message};
use crate::wallet::SolanaWallet;

#[derive(Debug, Clone, Copy)]
pub struct ConfirmationPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for ConfirmationPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(500),
            max_attempts: 120,
        }
    }
}

#[derive(Clone)]
pub struct SolanaClient {
    rpc: Arc<dyn SolanaRpc>,
    wallet: Arc<dyn SolanaWallet>,
    confirmation: ConfirmationPolicy,
}

impl SolanaClient {
    pub fn new(rpc: Arc<dyn SolanaRpc>, wallet: Arc<dyn SolanaWallet>) -> Self {
        Self {
            rpc,
            wallet,
            confirmation: ConfirmationPolicy::default(),
        }
    }

    pub fn with_confirmation_policy(mut self, policy: ConfirmationPolicy) -> Self {
        self.confirmation = policy;
        self
    }

    pub fn rpc(&self) -> &Arc<dyn SolanaRpc> {
        &self.rpc
    }

    pub fn wallet(&self) -> &Arc<dyn SolanaWallet> {
        &self.wallet
    }

    /// The connected wallet's public key, or [`SolError::NotConnected`].
    pub fn signer(&self) -> Result<Pubkey, SolError> {
        if !self.wallet.is_connected() {
            return Err(SolError::NotConnected);
        }
        self.wallet.public_key().ok_or(SolError::NotConnected)
    }

    pub async fn mint_info(&self, mint: &Pubkey) -> Result<MintInfo, SolError> {
        self.rpc.mint_info(mint).await
    }

    /// Builds one transaction from `instructions`, submits it through the
    /// wallet and waits for confirmation. Returns the signature.
    pub async fn submit(&self, instructions: &[Instruction]) -> Result<String, SolError> {
        let payer = self.signer()?;
        let blockhash = self.rpc.latest_blockhash().await?;
        let wire = Message::compile(instructions, &payer, blockhash)?.to_unsigned_transaction()?;

        let signature = self.wallet.sign_and_send_transaction(&wire).await?;
        info!(%signature, instructions = instructions.len(), "transaction submitted");

        self.wait_for_confirmation(&signature).await?;
        Ok(signature)
    }

    /// Polls `getSignatureStatuses` until `signature` reaches `confirmed`.
    pub async fn wait_for_confirmation(&self, signature: &str) -> Result<(), SolError> {
        for attempt in 0..self.confirmation.max_attempts {
            if let Some(status) = self.rpc.signature_status(signature).await? {
                if let Some(reason) = status.err {
                    return Err(SolError::TransactionFailed {
                        signature: signature.to_string(),
                        reason,
                    });
                }
                if status.is_confirmed() {
                    return Ok(());
                }
            }
            debug!(signature, attempt, "signature not confirmed yet");
            tokio::time::sleep(self.confirmation.interval).await;
        }
        Err(SolError::ConfirmationTimeout(signature.to_string()))
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::spl_token;

    fn key(n: u8) -> Pubkey {
        Pubkey::new([n; 32])
    }

    #[tokio::test]
    async fn submit_sends_one_transaction() {
        let wallet = Arc::new(MockWallet::connected(key(1)));
        let client = SolanaClient::new(Arc::new(MockRpc::new()), wallet.clone());

        let ix = spl_token::thaw_account(&key(2), &key(3), &key(1));
        let signature = client.submit(&[ix]).await.unwrap();

        assert_eq!(signature, "sig1");
        assert_eq!(wallet.sent_count(), 1);
        assert_eq!(wallet.instruction_count(0), 1);
    }

    #[tokio::test]
    async fn submit_requires_connected_wallet() {
        let wallet = Arc::new(MockWallet::connected(key(1)));
        *wallet.connected.lock().unwrap() = false;
        let client = SolanaClient::new(Arc::new(MockRpc::new()), wallet.clone());

        let ix = spl_token::thaw_account(&key(2), &key(3), &key(1));
        assert!(matches!(client.submit(&[ix]).await, Err(SolError::NotConnected)));
        assert_eq!(wallet.sent_count(), 0);
    }

    #[tokio::test]
    async fn failed_signature_surfaces_program_error() {
        let rpc = MockRpc::new();
        *rpc.failing.lock().unwrap() = Some("custom program error: 0x4".into());
        let client = SolanaClient::new(Arc::new(rpc), Arc::new(MockWallet::connected(key(1))));

        let err = client.wait_for_confirmation("sig1").await.unwrap_err();
        assert!(matches!(err, SolError::TransactionFailed { .. }));
    }
}
