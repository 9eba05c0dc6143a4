//! Chain identifiers shared by the transaction store and wallet manager.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use chain_eth::chains::{self as evm, EvmChain};

use crate::error::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChainFamily {
    Evm,
    Solana,
}

/// Networks the launchpad supports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChainId {
    #[default]
    Ethereum,
    Sepolia,
    Bsc,
    BscTestnet,
    Solana,
    SolanaDevnet,
}

pub const ALL_CHAINS: [ChainId; 6] = [
    ChainId::Ethereum,
    ChainId::Sepolia,
    ChainId::Bsc,
    ChainId::BscTestnet,
    ChainId::Solana,
    ChainId::SolanaDevnet,
];

impl ChainId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChainId::Ethereum => "ethereum",
            ChainId::Sepolia => "sepolia",
            ChainId::Bsc => "bsc",
            ChainId::BscTestnet => "bsc-testnet",
            ChainId::Solana => "solana",
            ChainId::SolanaDevnet => "solana-devnet",
        }
    }

    pub fn family(&self) -> ChainFamily {
        match self {
            ChainId::Solana | ChainId::SolanaDevnet => ChainFamily::Solana,
            _ => ChainFamily::Evm,
        }
    }

    /// EVM chain definition, `None` for Solana clusters.
    pub fn evm_chain(&self) -> Option<&'static EvmChain> {
        match self {
            ChainId::Ethereum => Some(&evm::ETHEREUM),
            ChainId::Sepolia => Some(&evm::SEPOLIA),
            ChainId::Bsc => Some(&evm::BSC),
            ChainId::BscTestnet => Some(&evm::BSC_TESTNET),
            ChainId::Solana | ChainId::SolanaDevnet => None,
        }
    }

    pub fn evm_chain_id(&self) -> Option<u64> {
        self.evm_chain().map(|c| c.chain_id)
    }

    /// Maps a numeric EVM chain id back to a launchpad chain.
    pub fn from_evm_chain_id(chain_id: u64) -> Option<ChainId> {
        ALL_CHAINS
            .into_iter()
            .find(|c| c.evm_chain_id() == Some(chain_id))
    }

    pub fn is_testnet(&self) -> bool {
        matches!(
            self,
            ChainId::Sepolia | ChainId::BscTestnet | ChainId::SolanaDevnet
        )
    }

    /// Public JSON-RPC endpoint used when no override is configured.
    pub fn default_rpc_url(&self) -> &'static str {
        match self {
            ChainId::Solana => "https://api.mainnet-beta.solana.com",
            ChainId::SolanaDevnet => "https://api.devnet.solana.com",
            other => other.evm_chain().map(|c| c.rpc_url).unwrap_or_default(),
        }
    }

    pub fn explorer_tx_url(&self, hash: &str) -> String {
        match self {
            ChainId::Solana => format!("https://solscan.io/tx/{hash}"),
            ChainId::SolanaDevnet => format!("https://solscan.io/tx/{hash}?cluster=devnet"),
            other => other
                .evm_chain()
                .map(|c| c.tx_url(hash))
                .unwrap_or_default(),
        }
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChainId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ALL_CHAINS
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| CoreError::UnsupportedChain(s.to_string()))
    }
}

/// Result of resolving a persisted chain selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainMigration {
    pub chain: ChainId,
    /// The stored value was a legacy identifier and should be rewritten.
    pub migrated: bool,
    /// The stored value was unrecognized; `chain` is the default.
    pub fell_back: bool,
}

fn legacy_alias(raw: &str) -> Option<ChainId> {
    let chain = match raw {
        "eth" | "mainnet" | "1" | "ethereum-mainnet" => ChainId::Ethereum,
        "goerli" | "5" | "11155111" => ChainId::Sepolia,
        "bnb" | "binance" | "56" | "bsc-mainnet" => ChainId::Bsc,
        "97" | "bnb-testnet" | "bsc_testnet" => ChainId::BscTestnet,
        "sol" | "solana-mainnet" | "mainnet-beta" => ChainId::Solana,
        "devnet" | "sol-devnet" => ChainId::SolanaDevnet,
        _ => return None,
    };
    Some(chain)
}

/// Resolves a stored chain identifier, accepting current names and legacy
/// aliases. Anything else resolves to the default chain with `fell_back` set.
pub fn migrate_chain_id(raw: &str) -> ChainMigration {
    let normalized = raw.trim().to_ascii_lowercase();
    if let Ok(chain) = normalized.parse::<ChainId>() {
        return ChainMigration {
            chain,
            migrated: normalized != raw,
            fell_back: false,
        };
    }
    if let Some(chain) = legacy_alias(&normalized) {
        return ChainMigration {
            chain,
            migrated: true,
            fell_back: false,
        };
    }

    let chain = ChainId::default();
    warn!(stored = raw, fallback = %chain, "unknown chain identifier, using default");
    ChainMigration {
        chain,
        migrated: true,
        fell_back: true,
    }
}
