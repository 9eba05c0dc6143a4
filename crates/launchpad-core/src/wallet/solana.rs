//! Solana wallet-adapter session.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use chain_sol::address::Pubkey;
use chain_sol::wallet::{SolanaWallet, WalletEvent};

use crate::error::CoreError;
use crate::storage::{KeyValueStore, StorageKeys, KEY_SOLANA_CONNECTED, KEY_SOLANA_WALLET_KIND};

use super::registry::ProviderRegistry;
use super::{flag_is_set, ConnectionState, Subscription, FLAG_SET};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SolanaConnection {
    pub public_key: Pubkey,
    pub provider_kind: String,
}

#[derive(Default)]
struct Session {
    state: ConnectionState,
    connection: Option<SolanaConnection>,
    wallet: Option<Arc<dyn SolanaWallet>>,
}

fn lock(session: &Mutex<Session>) -> MutexGuard<'_, Session> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct SolanaSession {
    registry: ProviderRegistry,
    storage: Arc<dyn KeyValueStore>,
    connected_key: String,
    kind_key: String,
    session: Arc<Mutex<Session>>,
    subscription: Mutex<Option<Subscription>>,
}

impl SolanaSession {
    pub fn new(
        registry: ProviderRegistry,
        storage: Arc<dyn KeyValueStore>,
        keys: &StorageKeys,
    ) -> Self {
        Self {
            registry,
            storage,
            connected_key: keys.key(KEY_SOLANA_CONNECTED),
            kind_key: keys.key(KEY_SOLANA_WALLET_KIND),
            session: Arc::new(Mutex::new(Session::default())),
            subscription: Mutex::new(None),
        }
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub fn state(&self) -> ConnectionState {
        lock(&self.session).state
    }

    pub fn connection(&self) -> Option<SolanaConnection> {
        lock(&self.session).connection.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// The connected adapter, for building a `SolanaClient`.
    pub fn wallet(&self) -> Option<Arc<dyn SolanaWallet>> {
        let session = lock(&self.session);
        match session.state {
            ConnectionState::Connected => session.wallet.clone(),
            _ => None,
        }
    }

    fn pick(&self, kind: Option<&str>) -> Result<Arc<dyn SolanaWallet>, CoreError> {
        let wallet = match kind {
            Some(kind) => self.registry.find(kind),
            None => self.registry.detect(),
        };
        wallet.ok_or_else(|| CoreError::ProviderMissing(kind.unwrap_or("Solana").to_string()))
    }

    /// Connects the wallet of `kind`, or the highest-ranked available one.
    pub async fn connect(&self, kind: Option<&str>) -> Result<SolanaConnection, CoreError> {
        let wallet = self.pick(kind)?;
        lock(&self.session).state = ConnectionState::Connecting;

        match wallet.connect(false).await {
            Ok(public_key) => self.adopt(wallet, public_key),
            Err(e) => {
                *lock(&self.session) = Session::default();
                Err(e.into())
            }
        }
    }

    /// Re-establishes the previous session without prompting.
    ///
    /// Only runs when the persisted flag is set. A wallet that still
    /// reports itself connected is adopted directly; otherwise a trusted
    /// (non-prompting) connect is attempted.
    pub async fn restore(&self) -> Result<Option<SolanaConnection>, CoreError> {
        let flagged = flag_is_set(self.storage.get(&self.connected_key)?);
        if !flagged {
            return Ok(None);
        }
        let kind = self.storage.get(&self.kind_key)?;
        let Ok(wallet) = self.pick(kind.as_deref()) else {
            debug!(kind = ?kind, "remembered Solana wallet is not available");
            return Ok(None);
        };

        if wallet.is_connected() {
            if let Some(public_key) = wallet.public_key() {
                return self.adopt(wallet, public_key).map(Some);
            }
        }
        match wallet.connect(true).await {
            Ok(public_key) => self.adopt(wallet, public_key).map(Some),
            Err(e) => {
                debug!(error = %e, "silent Solana reconnect declined");
                Ok(None)
            }
        }
    }

    fn adopt(
        &self,
        wallet: Arc<dyn SolanaWallet>,
        public_key: Pubkey,
    ) -> Result<SolanaConnection, CoreError> {
        let connection = SolanaConnection {
            public_key,
            provider_kind: wallet.kind().to_string(),
        };
        {
            let mut session = lock(&self.session);
            session.state = ConnectionState::Connected;
            session.connection = Some(connection.clone());
            session.wallet = Some(Arc::clone(&wallet));
        }
        self.storage.set(&self.connected_key, FLAG_SET)?;
        self.storage.set(&self.kind_key, &connection.provider_kind)?;
        self.listen(&wallet);

        info!(public_key = %public_key, kind = %connection.provider_kind, "Solana wallet connected");
        Ok(connection)
    }

    fn listen(&self, wallet: &Arc<dyn SolanaWallet>) {
        let mut events = wallet.subscribe();
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
                        warn!(skipped, "Solana wallet events dropped");
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

    /// Disconnects the adapter. Local state and persisted flags are cleared
    /// even when the adapter call fails; the failure is still returned.
    pub async fn disconnect(&self) -> Result<(), CoreError> {
        self.subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let wallet = std::mem::take(&mut *lock(&self.session)).wallet;

        let storage_result = self
            .storage
            .remove(&self.connected_key)
            .and_then(|()| self.storage.remove(&self.kind_key));

        if let Some(wallet) = wallet {
            wallet.disconnect().await?;
        }
        storage_result?;
        info!("Solana wallet disconnected");
        Ok(())
    }
}

fn apply_event(session: &Weak<Mutex<Session>>, event: WalletEvent) -> bool {
    let Some(session) = session.upgrade() else {
        return false;
    };
    let mut session = lock(&session);
    match event {
        WalletEvent::Connect(public_key) => {
            if let Some(connection) = session.connection.as_mut() {
                connection.public_key = public_key;
            }
        }
        WalletEvent::AccountChanged(Some(public_key)) => {
            if let Some(connection) = session.connection.as_mut() {
                info!(public_key = %public_key, "Solana account changed");
                connection.public_key = public_key;
            }
        }
        WalletEvent::AccountChanged(None) | WalletEvent::Disconnect => {
            info!("Solana wallet dropped the session");
            *session = Session::default();
        }
    }
    true
}
