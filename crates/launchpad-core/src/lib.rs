//! Multi-chain orchestration for the token launchpad.
//!
//! This crate provides:
//! - A transaction store with per-hash receipt polling and persistence
//! - Error normalization into a user-facing taxonomy, plus a retry helper
//! - Wallet connection sessions for EVM and Solana, a ranked Solana wallet
//!   registry and cross-family chain switching
//! - Chain identifiers with legacy-identifier migration
//! - The backend REST client and Pinata metadata storage
//! - Configuration, key-value persistence and logging setup

pub mod api;
pub mod chains;
pub mod config;
pub mod error;
pub mod errors;
pub mod ipfs;
pub mod logging;
pub mod retry;
pub mod storage;
pub mod transactions;
pub mod wallet;

#[cfg(test)]
mod testing;

pub use api::{BackendClient, TokenRegistration};
pub use chains::{migrate_chain_id, ChainFamily, ChainId, ChainMigration};
pub use config::LaunchpadConfig;
pub use error::CoreError;
pub use errors::{normalize, Classify, ErrorCategory, ErrorCode, NormalizedError};
pub use ipfs::PinataStorage;
pub use retry::{retry, RetryPolicy};
pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageKeys};
pub use transactions::{
    ChainReceipts, NewTransaction, ReceiptOutcome, ReceiptSource, StoreEvent, TransactionPatch,
    TransactionRecord, TransactionStore, TxKind, TxStatus,
};
pub use wallet::{ChainSwitch, ConnectionState, EvmWallet, ProviderRegistry, SolanaSession, WalletManager};
