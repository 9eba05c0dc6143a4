//! Session transaction history with receipt polling.
//!
//! The store keeps at most one poller task per transaction hash. Pollers
//! hold a [`Weak`] reference to the store, so dropping the store ends them,
//! and they only touch shared state through the store's merge path. The
//! state mutex is never held across an `.await`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::chains::ChainId;
use crate::config::LaunchpadConfig;
use crate::error::CoreError;
use crate::storage::{KeyValueStore, StorageKeys, KEY_TRANSACTIONS};

use super::receipts::{ReceiptOutcome, ReceiptSource};
use super::record::{NewTransaction, TransactionPatch, TransactionRecord};

/// Change notifications for UI consumers.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    Added(TransactionRecord),
    Updated(TransactionRecord),
    Cleared,
}

struct Poller {
    id: u64,
    chain: ChainId,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct State {
    /// Most recent first.
    records: Vec<TransactionRecord>,
    /// Keyed by transaction hash.
    pollers: HashMap<String, Poller>,
}

pub struct TransactionStore {
    me: Weak<TransactionStore>,
    state: Mutex<State>,
    storage: Arc<dyn KeyValueStore>,
    storage_key: String,
    receipts: Arc<dyn ReceiptSource>,
    events: broadcast::Sender<StoreEvent>,
    poll_interval: Duration,
    max_history: usize,
    runtime: Option<Handle>,
    next_poller_id: AtomicU64,
}

impl TransactionStore {
    /// Loads persisted history and resumes polling for pending records.
    ///
    /// Pollers need a Tokio runtime; outside one, records are tracked but
    /// never polled.
    pub fn new(
        storage: Arc<dyn KeyValueStore>,
        receipts: Arc<dyn ReceiptSource>,
        config: &LaunchpadConfig,
    ) -> Arc<Self> {
        let storage_key = StorageKeys::new(&config.storage_prefix).key(KEY_TRANSACTIONS);
        let runtime = Handle::try_current().ok();
        if runtime.is_none() {
            warn!("no Tokio runtime, transaction polling disabled");
        }
        let (events, _) = broadcast::channel(64);

        let store = Arc::new_cyclic(|me| Self {
            me: me.clone(),
            state: Mutex::new(State::default()),
            storage,
            storage_key,
            receipts,
            events,
            poll_interval: config.poll_interval(),
            max_history: config.max_history,
            runtime,
            next_poller_id: AtomicU64::new(1),
        });
        store.load();
        store
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn load(&self) {
        let records = match self.storage.get(&self.storage_key) {
            Ok(Some(json)) => match serde_json::from_str::<Vec<TransactionRecord>>(&json) {
                Ok(records) => records,
                Err(e) => {
                    warn!(error = %e, "discarding unreadable transaction history");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(error = %e, "failed to read transaction history");
                Vec::new()
            }
        };

        let mut state = self.lock();
        state.records = records;
        state.records.truncate(self.max_history);
        let resume: Vec<(String, ChainId)> = state
            .records
            .iter()
            .filter(|r| r.needs_polling())
            .map(|r| (r.hash.clone(), r.chain_id))
            .collect();
        for (hash, chain) in resume {
            self.start_poller(&mut state, &hash, chain);
        }
        info!(
            records = state.records.len(),
            pollers = state.pollers.len(),
            "transaction history loaded"
        );
    }

    fn persist(&self, state: &State) {
        let result = serde_json::to_string(&state.records)
            .map_err(CoreError::from)
            .and_then(|json| self.storage.set(&self.storage_key, &json));
        if let Err(e) = result {
            warn!(error = %e, "failed to persist transaction history");
        }
    }

    fn emit(&self, event: StoreEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    /// Records a new transaction and starts polling it when pending with a
    /// hash. Returns the stored record.
    pub fn add(&self, tx: NewTransaction) -> TransactionRecord {
        let id = uuid::Uuid::new_v4().to_string();
        let record = tx.into_record(id, chrono::Utc::now().timestamp_millis());

        let mut state = self.lock();
        state.records.insert(0, record.clone());
        if state.records.len() > self.max_history {
            let evicted = state.records.split_off(self.max_history);
            for old in evicted.iter().filter(|r| r.needs_polling()) {
                debug!(hash = %old.hash, "evicted pending transaction");
                self.release_poller(&mut state, &old.hash);
            }
        }
        if record.needs_polling() {
            self.start_poller(&mut state, &record.hash, record.chain_id);
        }
        self.persist(&state);
        drop(state);

        info!(id = %record.id, kind = ?record.kind, chain = %record.chain_id, "transaction added");
        self.emit(StoreEvent::Added(record.clone()));
        record
    }

    /// Merges `patch` into the record with `id`. Returns the updated record,
    /// or `None` if no record has that id.
    pub fn update(&self, id: &str, patch: TransactionPatch) -> Option<TransactionRecord> {
        let mut state = self.lock();
        let record = state.records.iter_mut().find(|r| r.id == id)?;
        let previous_hash = record.hash.clone();
        let effect = record.apply(patch);
        let updated = record.clone();

        if effect.status_rejected {
            warn!(id, status = ?updated.status, "ignoring status change on settled transaction");
        }
        if effect.hash_assigned && !previous_hash.is_empty() {
            self.release_poller(&mut state, &previous_hash);
        }
        if effect.became_terminal && !updated.hash.is_empty() {
            self.release_poller(&mut state, &updated.hash);
        }
        if effect.hash_assigned && updated.needs_polling() {
            self.start_poller(&mut state, &updated.hash, updated.chain_id);
        }
        self.persist(&state);
        drop(state);

        self.emit(StoreEvent::Updated(updated.clone()));
        Some(updated)
    }

    /// Starts polling `hash` unless a poller is already running for it.
    /// Returns whether a new poller was started.
    pub fn watch(&self, hash: &str, chain: ChainId) -> bool {
        if hash.is_empty() {
            return false;
        }
        let mut state = self.lock();
        self.start_poller(&mut state, hash, chain)
    }

    /// Stops every poller and forgets all history.
    pub fn clear(&self) {
        let mut state = self.lock();
        for (_, poller) in state.pollers.drain() {
            poller.handle.abort();
        }
        state.records.clear();
        if let Err(e) = self.storage.remove(&self.storage_key) {
            warn!(error = %e, "failed to clear persisted transaction history");
        }
        drop(state);

        info!("transaction history cleared");
        self.emit(StoreEvent::Cleared);
    }

    pub fn get(&self, id: &str) -> Option<TransactionRecord> {
        self.lock().records.iter().find(|r| r.id == id).cloned()
    }

    /// All records, most recent first.
    pub fn list(&self) -> Vec<TransactionRecord> {
        self.lock().records.clone()
    }

    pub fn pending(&self) -> Vec<TransactionRecord> {
        self.lock()
            .records
            .iter()
            .filter(|r| r.is_pending())
            .cloned()
            .collect()
    }

    pub fn find_by_hash(&self, hash: &str) -> Option<TransactionRecord> {
        self.lock().records.iter().find(|r| r.hash == hash).cloned()
    }

    pub fn is_watching(&self, hash: &str) -> bool {
        self.lock().pollers.contains_key(hash)
    }

    pub fn active_pollers(&self) -> usize {
        self.lock().pollers.len()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    fn start_poller(&self, state: &mut State, hash: &str, chain: ChainId) -> bool {
        if state.pollers.contains_key(hash) {
            return false;
        }
        let Some(runtime) = &self.runtime else {
            return false;
        };

        let id = self.next_poller_id.fetch_add(1, Ordering::Relaxed);
        let handle = runtime.spawn(poll_receipt(
            self.me.clone(),
            Arc::clone(&self.receipts),
            id,
            hash.to_string(),
            chain,
            self.poll_interval,
        ));
        debug!(hash, chain = %chain, poller = id, "poller started");
        state.pollers.insert(hash.to_string(), Poller { id, chain, handle });
        true
    }

    /// Stops the poller for `hash` unless another pending record still
    /// needs it.
    fn release_poller(&self, state: &mut State, hash: &str) {
        let still_needed = state
            .records
            .iter()
            .any(|r| r.hash == hash && r.needs_polling());
        if still_needed {
            return;
        }
        if let Some(poller) = state.pollers.remove(hash) {
            debug!(hash, chain = %poller.chain, poller = poller.id, "poller stopped");
            poller.handle.abort();
        }
    }

    fn owns_poller(&self, hash: &str, poller_id: u64) -> bool {
        self.lock()
            .pollers
            .get(hash)
            .is_some_and(|p| p.id == poller_id)
    }

    /// Applies an authoritative receipt from poller `poller_id`.
    fn resolve(&self, hash: &str, poller_id: u64, outcome: ReceiptOutcome) {
        let mut state = self.lock();
        // The poller is finishing on its own; drop its entry without aborting.
        if state.pollers.get(hash).is_some_and(|p| p.id == poller_id) {
            state.pollers.remove(hash);
        } else {
            return;
        }

        let mut updated = Vec::new();
        for record in state
            .records
            .iter_mut()
            .filter(|r| r.hash == hash && r.is_pending())
        {
            let patch = if outcome.success {
                TransactionPatch::confirmed(outcome.block_number, outcome.gas_used)
            } else {
                TransactionPatch {
                    block_number: outcome.block_number,
                    gas_used: outcome.gas_used,
                    ..TransactionPatch::failed(
                        outcome
                            .error
                            .clone()
                            .unwrap_or_else(|| "Transaction failed".to_string()),
                    )
                }
            };
            record.apply(patch);
            updated.push(record.clone());
        }
        if !updated.is_empty() {
            self.persist(&state);
        }
        drop(state);

        info!(hash, success = outcome.success, "transaction settled");
        for record in updated {
            self.emit(StoreEvent::Updated(record));
        }
    }
}

impl Drop for TransactionStore {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        for (_, poller) in state.pollers.drain() {
            poller.handle.abort();
        }
    }
}

async fn poll_receipt(
    store: Weak<TransactionStore>,
    receipts: Arc<dyn ReceiptSource>,
    poller_id: u64,
    hash: String,
    chain: ChainId,
    interval: Duration,
) {
    let mut attempt: u64 = 0;
    loop {
        tokio::time::sleep(interval).await;
        attempt += 1;
        let result = receipts.receipt(chain, &hash).await;

        let Some(store) = store.upgrade() else {
            return;
        };
        if !store.owns_poller(&hash, poller_id) {
            return;
        }
        match result {
            Ok(Some(outcome)) => {
                store.resolve(&hash, poller_id, outcome);
                return;
            }
            Ok(None) => debug!(hash = %hash, attempt, "receipt pending"),
            // Lookup failures never settle a transaction.
            Err(e) => warn!(hash = %hash, attempt, error = %e, "receipt lookup failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use crate::transactions::receipts::testing::ScriptedReceipts;
    use crate::transactions::record::{TxKind, TxStatus};

    const INTERVAL: Duration = Duration::from_millis(2_500);

    fn config() -> LaunchpadConfig {
        LaunchpadConfig::default()
    }

    fn setup() -> (Arc<TransactionStore>, Arc<ScriptedReceipts>, Arc<MemoryStore>) {
        let receipts = Arc::new(ScriptedReceipts::new());
        let storage = Arc::new(MemoryStore::new());
        let store = TransactionStore::new(storage.clone(), receipts.clone(), &config());
        (store, receipts, storage)
    }

    fn pending(hash: &str) -> NewTransaction {
        NewTransaction::pending(TxKind::Transfer, ChainId::Sepolia, hash, "Transfer")
    }

    async fn ticks(n: u32) {
        tokio::time::sleep(INTERVAL * n + Duration::from_millis(1)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn one_poller_per_hash() {
        let (store, _, _) = setup();
        store.add(pending("0xaa"));
        store.add(pending("0xaa"));
        assert!(!store.watch("0xaa", ChainId::Sepolia));
        assert_eq!(store.active_pollers(), 1);

        assert!(store.watch("0xbb", ChainId::Sepolia));
        assert_eq!(store.active_pollers(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn receipt_settles_and_stops_poller() {
        let (store, receipts, _) = setup();
        let tx = store.add(pending("0xaa"));
        receipts.resolve("0xaa", true);

        ticks(1).await;
        let settled = store.get(&tx.id).unwrap();
        assert_eq!(settled.status, TxStatus::Confirmed);
        assert_eq!(settled.block_number, Some(42));
        assert!(!store.is_watching("0xaa"));

        ticks(3).await;
        assert_eq!(receipts.query_count("0xaa"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_receipt_marks_failed() {
        let (store, receipts, _) = setup();
        let tx = store.add(pending("0xaa"));
        receipts.resolve("0xaa", false);

        ticks(1).await;
        let settled = store.get(&tx.id).unwrap();
        assert_eq!(settled.status, TxStatus::Failed);
        assert_eq!(settled.error.as_deref(), Some("Transaction reverted"));
    }

    #[tokio::test(start_paused = true)]
    async fn lookup_errors_keep_polling() {
        let (store, receipts, _) = setup();
        let tx = store.add(pending("0xaa"));
        receipts.fail_lookup("0xaa", "connection refused");

        ticks(3).await;
        assert_eq!(store.get(&tx.id).unwrap().status, TxStatus::Pending);
        assert!(store.is_watching("0xaa"));
        assert_eq!(receipts.query_count("0xaa"), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn terminal_update_stops_poller() {
        let (store, receipts, _) = setup();
        let tx = store.add(pending("0xaa"));
        store.update(&tx.id, TransactionPatch::failed("user gave up"));
        assert!(!store.is_watching("0xaa"));

        ticks(2).await;
        assert_eq!(receipts.query_count("0xaa"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn assigning_hash_starts_polling() {
        let (store, receipts, _) = setup();
        let tx = store.add(pending(""));
        assert_eq!(store.active_pollers(), 0);

        let updated = store.update(&tx.id, TransactionPatch::hash("0xcc")).unwrap();
        assert!(store.is_watching("0xcc"));
        assert_eq!(
            updated.explorer_url.as_deref(),
            Some("https://sepolia.etherscan.io/tx/0xcc")
        );

        receipts.resolve("0xcc", true);
        ticks(1).await;
        assert_eq!(store.get(&tx.id).unwrap().status, TxStatus::Confirmed);
    }

    #[tokio::test(start_paused = true)]
    async fn clear_stops_everything() {
        let (store, receipts, storage) = setup();
        store.add(pending("0xaa"));
        store.add(pending("0xbb"));
        assert!(storage.get("launchpad_transactions").unwrap().is_some());

        store.clear();
        assert!(store.list().is_empty());
        assert_eq!(store.active_pollers(), 0);
        assert_eq!(storage.get("launchpad_transactions").unwrap(), None);

        ticks(3).await;
        assert_eq!(receipts.query_count("0xaa"), 0);
        assert_eq!(receipts.query_count("0xbb"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn history_is_capped_and_evicted_pollers_stop() {
        let receipts = Arc::new(ScriptedReceipts::new());
        let mut config = config();
        config.max_history = 2;
        let store = TransactionStore::new(Arc::new(MemoryStore::new()), receipts, &config);

        store.add(pending("0x01"));
        store.add(pending("0x02"));
        store.add(pending("0x03"));

        let hashes: Vec<String> = store.list().into_iter().map(|r| r.hash).collect();
        assert_eq!(hashes, ["0x03", "0x02"]);
        assert!(!store.is_watching("0x01"));
        assert_eq!(store.active_pollers(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn reload_resumes_pending_polls() {
        let (store, _, storage) = setup();
        store.add(pending("0xaa"));
        let done = store.add(pending("0xbb"));
        store.update(&done.id, TransactionPatch::confirmed(Some(1), None));
        drop(store);

        let receipts = Arc::new(ScriptedReceipts::new());
        let reloaded = TransactionStore::new(storage, receipts.clone(), &config());
        assert_eq!(reloaded.list().len(), 2);
        assert!(reloaded.is_watching("0xaa"));
        assert!(!reloaded.is_watching("0xbb"));

        receipts.resolve("0xaa", true);
        ticks(1).await;
        assert!(reloaded.pending().is_empty());
    }

    #[tokio::test]
    async fn corrupt_history_starts_empty() {
        let storage = Arc::new(MemoryStore::new());
        storage.set("launchpad_transactions", "{not json").unwrap();
        let store =
            TransactionStore::new(storage, Arc::new(ScriptedReceipts::new()), &config());
        assert!(store.list().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_store_ends_pollers() {
        let (store, receipts, _) = setup();
        store.add(pending("0xaa"));
        drop(store);

        ticks(3).await;
        assert_eq!(receipts.query_count("0xaa"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn events_are_broadcast() {
        let (store, receipts, _) = setup();
        let mut events = store.subscribe();

        let tx = store.add(pending("0xaa"));
        receipts.resolve("0xaa", true);
        ticks(1).await;
        store.clear();

        assert!(matches!(events.recv().await.unwrap(), StoreEvent::Added(r) if r.id == tx.id));
        match events.recv().await.unwrap() {
            StoreEvent::Updated(r) => assert_eq!(r.status, TxStatus::Confirmed),
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(events.recv().await.unwrap(), StoreEvent::Cleared);
    }

    #[test]
    fn without_runtime_records_are_kept_unpolled() {
        let store = TransactionStore::new(
            Arc::new(MemoryStore::new()),
            Arc::new(ScriptedReceipts::new()),
            &config(),
        );
        store.add(pending("0xaa"));
        assert_eq!(store.pending().len(), 1);
        assert_eq!(store.active_pollers(), 0);
        assert!(store.find_by_hash("0xaa").is_some());
    }
}
