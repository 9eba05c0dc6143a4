//! Injected EVM wallet session.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use chain_eth::error::EthError;
use chain_eth::provider::{EvmClient, EvmProvider, ProviderEvent};

use crate::chains::{ChainFamily, ChainId};
use crate::error::CoreError;
use crate::storage::{KeyValueStore, StorageKeys, KEY_EVM_CONNECTED};

use super::{flag_is_set, ConnectionState, Subscription, FLAG_SET};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvmConnection {
    pub address: String,
    pub chain_id: u64,
    pub provider_kind: String,
}

/// The wallet is on a different chain than the one selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainMismatch {
    pub expected: u64,
    pub actual: u64,
}

#[derive(Default)]
struct Session {
    state: ConnectionState,
    connection: Option<EvmConnection>,
}

fn lock(session: &Mutex<Session>) -> MutexGuard<'_, Session> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct EvmWallet {
    provider: Option<Arc<dyn EvmProvider>>,
    storage: Arc<dyn KeyValueStore>,
    flag_key: String,
    session: Arc<Mutex<Session>>,
    subscription: Mutex<Option<Subscription>>,
}

impl EvmWallet {
    /// `provider` is `None` when no EVM wallet is injected.
    pub fn new(
        provider: Option<Arc<dyn EvmProvider>>,
        storage: Arc<dyn KeyValueStore>,
        keys: &StorageKeys,
    ) -> Self {
        Self {
            provider,
            storage,
            flag_key: keys.key(KEY_EVM_CONNECTED),
            session: Arc::new(Mutex::new(Session::default())),
            subscription: Mutex::new(None),
        }
    }

    pub fn provider(&self) -> Option<&Arc<dyn EvmProvider>> {
        self.provider.as_ref()
    }

    pub fn state(&self) -> ConnectionState {
        lock(&self.session).state
    }

    pub fn connection(&self) -> Option<EvmConnection> {
        lock(&self.session).connection.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Whether the last session ended connected.
    pub fn was_connected(&self) -> bool {
        match self.storage.get(&self.flag_key) {
            Ok(value) => flag_is_set(value),
            Err(e) => {
                warn!(error = %e, "failed to read EVM connection flag");
                false
            }
        }
    }

    fn client(&self) -> Result<EvmClient, CoreError> {
        self.provider
            .clone()
            .map(EvmClient::new)
            .ok_or(CoreError::Eth(EthError::ProviderMissing))
    }

    /// Requests account access with a single `eth_requestAccounts` call.
    pub async fn connect(&self) -> Result<EvmConnection, CoreError> {
        let client = self.client()?;
        lock(&self.session).state = ConnectionState::Connecting;

        match self.establish(&client, true).await {
            Ok(connection) => Ok(connection),
            Err(e) => {
                *lock(&self.session) = Session::default();
                Err(e)
            }
        }
    }

    /// Silently reconnects when the previous session ended connected and the
    /// wallet still authorizes an account.
    pub async fn restore(&self) -> Result<Option<EvmConnection>, CoreError> {
        if !self.was_connected() {
            return Ok(None);
        }
        let client = self.client()?;
        match self.establish(&client, false).await {
            Ok(connection) => Ok(Some(connection)),
            Err(CoreError::Eth(EthError::NotConnected)) => {
                debug!("EVM wallet no longer authorizes an account");
                self.forget()?;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn establish(
        &self,
        client: &EvmClient,
        prompt: bool,
    ) -> Result<EvmConnection, CoreError> {
        let accounts = if prompt {
            client.request_accounts().await?
        } else {
            client.accounts().await?
        };
        let address = accounts
            .into_iter()
            .next()
            .ok_or(CoreError::Eth(EthError::NotConnected))?;
        let chain_id = client.chain_id().await?;

        let connection = EvmConnection {
            address,
            chain_id,
            provider_kind: client.provider().kind().to_string(),
        };
        {
            let mut session = lock(&self.session);
            session.state = ConnectionState::Connected;
            session.connection = Some(connection.clone());
        }
        self.storage.set(&self.flag_key, FLAG_SET)?;
        self.listen(client.provider());

        info!(address = %connection.address, chain_id, kind = %connection.provider_kind, "EVM wallet connected");
        Ok(connection)
    }

    fn listen(&self, provider: &Arc<dyn EvmProvider>) {
        let mut events = provider.subscribe();
        let session = Arc::downgrade(&self.session);
        let subscription = Subscription::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        if !apply_event(&session, event) {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "EVM provider events dropped");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });
        *self
            .subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = subscription;
    }

    pub fn is_listening(&self) -> bool {
        self.subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(Subscription::is_active)
    }

    /// Compares the wallet's chain with `target`. Never switches the wallet.
    pub fn chain_mismatch(&self, target: ChainId) -> Option<ChainMismatch> {
        let expected = target.evm_chain_id()?;
        let actual = lock(&self.session).connection.as_ref()?.chain_id;
        (actual != expected).then_some(ChainMismatch { expected, actual })
    }

    /// Asks the wallet to move to `target`, adding the chain if needed.
    pub async fn switch_network(&self, target: ChainId) -> Result<(), CoreError> {
        let chain = target
            .evm_chain()
            .ok_or_else(|| CoreError::UnsupportedChain(target.to_string()))?;
        self.client()?.switch_chain(chain).await?;
        Ok(())
    }

    /// Ends the session. Injected EVM wallets have no disconnect call, so
    /// this is local: listener torn down, state and persisted flag cleared.
    pub async fn disconnect(&self) -> Result<(), CoreError> {
        self.subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        *lock(&self.session) = Session::default();
        self.forget()?;
        info!(family = ?ChainFamily::Evm, "wallet disconnected");
        Ok(())
    }

    fn forget(&self) -> Result<(), CoreError> {
        self.storage.remove(&self.flag_key)
    }
}

/// Returns `false` once the session is gone.
fn apply_event(session: &Weak<Mutex<Session>>, event: ProviderEvent) -> bool {
    let Some(session) = session.upgrade() else {
        return false;
    };
    let mut session = lock(&session);
    match event {
        ProviderEvent::AccountsChanged(accounts) => match accounts.into_iter().next() {
            Some(address) => {
                if let Some(connection) = session.connection.as_mut() {
                    info!(address = %address, "EVM account changed");
                    connection.address = address;
                }
            }
            None => {
                info!("EVM wallet locked or revoked access");
                *session = Session::default();
            }
        },
        ProviderEvent::ChainChanged(chain_id) => {
            if let Some(connection) = session.connection.as_mut() {
                info!(chain_id, "EVM wallet chain changed");
                connection.chain_id = chain_id;
            }
        }
        ProviderEvent::Disconnect => {
            info!("EVM provider disconnected");
            *session = Session::default();
        }
    }
    true
}
