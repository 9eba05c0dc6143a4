use std::sync::{Arc, Mutex, PoisonError};

use tracing::{info, warn};

use crate::chains::{migrate_chain_id, ChainFamily, ChainId};
use crate::errors::{Classify, NormalizedError};
use crate::storage::{KeyValueStore, StorageKeys, KEY_SELECTED_CHAIN};

use super::evm::EvmWallet;
use super::solana::SolanaSession;

/// Outcome of [`WalletManager::switch_chain`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainSwitch {
    pub from: ChainId,
    pub to: ChainId,
    /// The family whose wallet was disconnected, if any.
    pub disconnected: Option<ChainFamily>,
    /// Set when that disconnect failed. The switch happened anyway.
    pub disconnect_error: Option<NormalizedError>,
}

/// Owns both wallet sessions and the selected chain.
pub struct WalletManager {
    evm: Arc<EvmWallet>,
    solana: Arc<SolanaSession>,
    storage: Arc<dyn KeyValueStore>,
    selected_key: String,
    selected: Mutex<ChainId>,
    selection_fell_back: bool,
}

impl WalletManager {
    /// Loads the persisted chain selection, rewriting legacy identifiers.
    pub fn new(
        evm: Arc<EvmWallet>,
        solana: Arc<SolanaSession>,
        storage: Arc<dyn KeyValueStore>,
        keys: &StorageKeys,
    ) -> Self {
        let selected_key = keys.key(KEY_SELECTED_CHAIN);
        let (selected, selection_fell_back) = match storage.get(&selected_key) {
            Ok(Some(raw)) => {
                let migration = migrate_chain_id(&raw);
                if migration.migrated {
                    info!(stored = %raw, chain = %migration.chain, "migrating stored chain selection");
                    if let Err(e) = storage.set(&selected_key, migration.chain.as_str()) {
                        warn!(error = %e, "failed to rewrite chain selection");
                    }
                }
                (migration.chain, migration.fell_back)
            }
            Ok(None) => (ChainId::default(), false),
            Err(e) => {
                warn!(error = %e, "failed to read chain selection");
                (ChainId::default(), false)
            }
        };

        Self {
            evm,
            solana,
            storage,
            selected_key,
            selected: Mutex::new(selected),
            selection_fell_back,
        }
    }

    /// True when the persisted selection was unrecognized and replaced by
    /// the default chain at load.
    pub fn selection_fell_back(&self) -> bool {
        self.selection_fell_back
    }

    pub fn evm(&self) -> &Arc<EvmWallet> {
        &self.evm
    }

    pub fn solana(&self) -> &Arc<SolanaSession> {
        &self.solana
    }

    pub fn selected_chain(&self) -> ChainId {
        *self.selected.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Selects `to`. Leaving a chain family disconnects that family's
    /// wallet if connected; a failed disconnect is reported in the outcome
    /// but does not stop the switch. Moving within a family disconnects
    /// nothing.
    pub async fn switch_chain(&self, to: ChainId) -> ChainSwitch {
        let from = self.selected_chain();
        let left = from.family();

        let mut outcome = ChainSwitch {
            from,
            to,
            disconnected: None,
            disconnect_error: None,
        };

        if left != to.family() {
            let result = match left {
                ChainFamily::Evm if self.evm.is_connected() => Some(self.evm.disconnect().await),
                ChainFamily::Solana if self.solana.is_connected() => {
                    Some(self.solana.disconnect().await)
                }
                _ => None,
            };
            if let Some(result) = result {
                outcome.disconnected = Some(left);
                if let Err(e) = result {
                    warn!(family = ?left, error = %e, "wallet disconnect failed during chain switch");
                    outcome.disconnect_error = Some(e.classify());
                }
            }
        }

        *self.selected.lock().unwrap_or_else(PoisonError::into_inner) = to;
        if let Err(e) = self.storage.set(&self.selected_key, to.as_str()) {
            warn!(error = %e, "failed to persist chain selection");
        }
        info!(from = %from, to = %to, disconnected = ?outcome.disconnected, "chain switched");
        outcome
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use chain_eth::provider::EvmProvider;

    use super::*;
    use crate::storage::MemoryStore;
    use crate::wallet::registry::{ProviderRegistry, StaticProbe};
    use crate::wallet::testing::{sol_key, MockEvm, MockSolWallet};

    struct Fixture {
        manager: WalletManager,
        phantom: Arc<MockSolWallet>,
        storage: Arc<MemoryStore>,
    }

    fn fixture(storage: Arc<MemoryStore>) -> Fixture {
        let keys = StorageKeys::new("lp_");
        let evm = Arc::new(EvmWallet::new(
            Some(Arc::new(MockEvm::on_chain(1)) as Arc<dyn EvmProvider>),
            storage.clone(),
            &keys,
        ));
        let phantom = Arc::new(MockSolWallet::new("phantom", sol_key(1)));
        let registry = ProviderRegistry::new().with_probe(StaticProbe::available(phantom.clone()));
        let solana = Arc::new(SolanaSession::new(registry, storage.clone(), &keys));
        Fixture {
            manager: WalletManager::new(evm, solana, storage.clone(), &keys),
            phantom,
            storage,
        }
    }

    #[tokio::test]
    async fn leaving_evm_disconnects_evm_wallet() {
        let f = fixture(Arc::new(MemoryStore::new()));
        f.manager.evm().connect().await.unwrap();
        f.manager.solana().connect(None).await.unwrap();

        let switch = f.manager.switch_chain(ChainId::Solana).await;
        assert_eq!(switch.disconnected, Some(ChainFamily::Evm));
        assert!(!f.manager.evm().is_connected());
        assert!(f.manager.solana().is_connected());
        assert_eq!(f.manager.selected_chain(), ChainId::Solana);
    }

    #[tokio::test]
    async fn leaving_solana_disconnects_solana_wallet() {
        let f = fixture(Arc::new(MemoryStore::new()));
        f.manager.switch_chain(ChainId::SolanaDevnet).await;
        f.manager.evm().connect().await.unwrap();
        f.manager.solana().connect(None).await.unwrap();

        let switch = f.manager.switch_chain(ChainId::Bsc).await;
        assert_eq!(switch.disconnected, Some(ChainFamily::Solana));
        assert!(!f.manager.solana().is_connected());
        assert!(f.manager.evm().is_connected());
    }

    #[tokio::test]
    async fn same_family_switch_disconnects_nothing() {
        let f = fixture(Arc::new(MemoryStore::new()));
        f.manager.evm().connect().await.unwrap();

        let switch = f.manager.switch_chain(ChainId::Bsc).await;
        assert_eq!(switch.disconnected, None);
        assert!(f.manager.evm().is_connected());
    }

    #[tokio::test]
    async fn disconnect_failure_does_not_block_switch() {
        let f = fixture(Arc::new(MemoryStore::new()));
        f.manager.switch_chain(ChainId::Solana).await;
        f.manager.solana().connect(None).await.unwrap();
        f.phantom.fail_disconnect.store(true, Ordering::SeqCst);

        let switch = f.manager.switch_chain(ChainId::Ethereum).await;
        assert_eq!(switch.disconnected, Some(ChainFamily::Solana));
        assert!(switch.disconnect_error.is_some());
        assert_eq!(f.manager.selected_chain(), ChainId::Ethereum);
    }

    #[tokio::test]
    async fn selection_is_persisted_and_migrated() {
        let storage = Arc::new(MemoryStore::new());
        storage.set("lp_selected_chain", "bnb").unwrap();

        let f = fixture(storage);
        assert_eq!(f.manager.selected_chain(), ChainId::Bsc);
        assert_eq!(
            f.storage.get("lp_selected_chain").unwrap().as_deref(),
            Some("bsc")
        );

        assert!(!f.manager.selection_fell_back());

        f.manager.switch_chain(ChainId::SolanaDevnet).await;
        assert_eq!(
            f.storage.get("lp_selected_chain").unwrap().as_deref(),
            Some("solana-devnet")
        );
    }

    #[test]
    fn unknown_selection_falls_back_visibly() {
        let storage = Arc::new(MemoryStore::new());
        storage.set("lp_selected_chain", "polygon").unwrap();

        let f = fixture(storage);
        assert!(f.manager.selection_fell_back());
        assert_eq!(f.manager.selected_chain(), ChainId::default());
        assert_eq!(
            f.storage.get("lp_selected_chain").unwrap().as_deref(),
            Some(ChainId::default().as_str())
        );
    }
}
