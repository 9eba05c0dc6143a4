//! Solana chain support for the token launchpad.
//!
//! Transactions are compiled by hand into Solana's legacy wire format and
//! handed unsigned to the connected wallet, which signs and submits them.
//! No `solana-sdk` or `spl-token` dependency: the handful of SPL Token,
//! Associated Token Account and Token Metadata instructions used here are
//! encoded directly.

pub mod address;
pub mod authority;
pub mod client;
pub mod error;
pub mod metadata;
pub mod multisend;
pub mod rpc;
pub mod spl_token;
pub mod tools;
pub mod transaction;
pub mod units;
pub mod wallet;

pub use address::{is_valid_address, Pubkey};
pub use authority::{AuthorityAction, AuthorityManager};
pub use client::{ConfirmationPolicy, SolanaClient};
pub use error::SolError;
pub use metadata::{MetadataOutcome, MetadataStorage, MetadataUpdate, MetadataUpdater};
pub use multisend::{parse_batch, BatchEntry, MultisendOutcome, Multisender};
pub use rpc::{HttpSolanaRpc, MintInfo, SignatureStatus, SolanaRpc};
pub use spl_token::AuthorityType;
pub use tools::TokenTools;
pub use transaction::{Instruction, Message};
pub use units::{format_amount, parse_amount};
pub use wallet::{SolanaWallet, WalletEvent};
