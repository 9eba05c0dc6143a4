//! Browser-wallet port (Phantom, Solflare, Backpack, ...).

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::address::Pubkey;
use crate::error::SolError;

/// Events a wallet adapter emits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletEvent {
    Connect(Pubkey),
    Disconnect,
    /// `None` when the wallet switched to an account not yet approved.
    AccountChanged(Option<Pubkey>),
}

/// A Solana wallet adapter. The wallet holds the keys and signs.
#[async_trait]
pub trait SolanaWallet: Send + Sync {
    /// Adapter identifier (`phantom`, `solflare`, ...).
    fn kind(&self) -> &str;

    fn public_key(&self) -> Option<Pubkey>;

    fn is_connected(&self) -> bool;

    /// With `only_if_trusted`, connects silently or fails instead of
    /// prompting the user.
    async fn connect(&self, only_if_trusted: bool) -> Result<Pubkey, SolError>;

    async fn disconnect(&self) -> Result<(), SolError>;

    /// Signs the unsigned wire transaction and submits it, returning the
    /// Base58 signature.
    async fn sign_and_send_transaction(&self, transaction: &[u8]) -> Result<String, SolError>;

    async fn sign_message(&self, message: &[u8]) -> Result<Vec<u8>, SolError>;

    fn subscribe(&self) -> broadcast::Receiver<WalletEvent>;
}
