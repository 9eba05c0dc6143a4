//! Transaction history, receipt lookup and polling.

pub mod receipts;
pub mod record;
pub mod store;

pub use receipts::{ChainReceipts, ReceiptOutcome, ReceiptSource};
pub use record::{NewTransaction, TransactionPatch, TransactionRecord, TxKind, TxStatus};
pub use store::{StoreEvent, TransactionStore};
