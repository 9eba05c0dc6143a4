//! Wallet connection state for both chain families.
//!
//! Each family has its own session object ([`EvmWallet`], [`SolanaSession`])
//! moving through `Disconnected -> Connecting -> Connected -> Disconnected`.
//! [`WalletManager`] owns both and applies the cross-family switching rule.

use std::future::Future;

use serde::Serialize;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

pub mod evm;
pub mod manager;
pub mod registry;
pub mod solana;

pub use evm::{ChainMismatch, EvmConnection, EvmWallet};
pub use manager::{ChainSwitch, WalletManager};
pub use registry::{ProviderRegistry, StaticProbe, WalletProbe, DEFAULT_RANKING};
pub use solana::{SolanaConnection, SolanaSession};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// A provider event listener. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    handle: JoinHandle<()>,
}

impl Subscription {
    /// Spawns `listener` on the current runtime; `None` outside one.
    pub(crate) fn spawn<F>(listener: F) -> Option<Self>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let runtime = Handle::try_current().ok()?;
        Some(Self {
            handle: runtime.spawn(listener),
        })
    }

    pub fn is_active(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

const FLAG_SET: &str = "true";

fn flag_is_set(value: Option<String>) -> bool {
    value.as_deref() == Some(FLAG_SET)
}
