//! Receipt lookup for the poller.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use chain_eth::provider::{EvmClient, EvmProvider, HttpRpcProvider};
use chain_sol::rpc::{HttpSolanaRpc, SolanaRpc};

use crate::chains::{ChainFamily, ChainId, ALL_CHAINS};
use crate::config::LaunchpadConfig;
use crate::error::CoreError;

/// An authoritative answer about a transaction's fate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptOutcome {
    pub success: bool,
    pub block_number: Option<u64>,
    pub gas_used: Option<u64>,
    pub error: Option<String>,
}

/// Where the poller asks for receipts.
#[async_trait]
pub trait ReceiptSource: Send + Sync {
    /// `Ok(None)` while the transaction is not yet final.
    async fn receipt(&self, chain: ChainId, hash: &str)
        -> Result<Option<ReceiptOutcome>, CoreError>;
}

/// Routes receipt lookups to the right chain client.
#[derive(Default)]
pub struct ChainReceipts {
    evm: HashMap<ChainId, EvmClient>,
    solana: HashMap<ChainId, Arc<dyn SolanaRpc>>,
}

impl ChainReceipts {
    pub fn new() -> Self {
        Self::default()
    }

    /// HTTP clients for every supported chain, honoring RPC overrides.
    pub fn from_config(config: &LaunchpadConfig) -> Self {
        let mut receipts = Self::new();
        for chain in ALL_CHAINS {
            let url = config.rpc_url(chain);
            receipts = match chain.family() {
                ChainFamily::Evm => receipts.with_evm(chain, Arc::new(HttpRpcProvider::new(url))),
                ChainFamily::Solana => receipts.with_solana(chain, Arc::new(HttpSolanaRpc::new(url))),
            };
        }
        receipts
    }

    pub fn with_evm(mut self, chain: ChainId, provider: Arc<dyn EvmProvider>) -> Self {
        self.evm.insert(chain, EvmClient::new(provider));
        self
    }

    pub fn with_solana(mut self, chain: ChainId, rpc: Arc<dyn SolanaRpc>) -> Self {
        self.solana.insert(chain, rpc);
        self
    }
}

#[async_trait]
impl ReceiptSource for ChainReceipts {
    async fn receipt(
        &self,
        chain: ChainId,
        hash: &str,
    ) -> Result<Option<ReceiptOutcome>, CoreError> {
        match chain.family() {
            ChainFamily::Evm => {
                let client = self
                    .evm
                    .get(&chain)
                    .ok_or_else(|| CoreError::UnsupportedChain(chain.to_string()))?;
                let receipt = client.transaction_receipt(hash).await?;
                Ok(receipt.map(|r| ReceiptOutcome {
                    success: r.success,
                    block_number: r.block_number,
                    gas_used: r.gas_used,
                    error: (!r.success).then(|| "Transaction reverted".to_string()),
                }))
            }
            ChainFamily::Solana => {
                let rpc = self
                    .solana
                    .get(&chain)
                    .ok_or_else(|| CoreError::UnsupportedChain(chain.to_string()))?;
                let Some(status) = rpc.signature_status(hash).await? else {
                    return Ok(None);
                };
                if let Some(err) = status.err {
                    return Ok(Some(ReceiptOutcome {
                        success: false,
                        block_number: Some(status.slot),
                        gas_used: None,
                        error: Some(err),
                    }));
                }
                if !status.is_confirmed() {
                    return Ok(None);
                }
                Ok(Some(ReceiptOutcome {
                    success: true,
                    block_number: Some(status.slot),
                    gas_used: None,
                    error: None,
                }))
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chain_eth::error::RpcError;
    use chain_eth::provider::ProviderEvent;
    use chain_sol::address::Pubkey;
    use chain_sol::error::SolError;
    use chain_sol::rpc::{MintInfo, SignatureStatus};
    use serde_json::{json, Value};
    use tokio::sync::broadcast;

    use super::*;

    struct ReceiptProvider {
        receipt: Value,
        events: broadcast::Sender<ProviderEvent>,
    }

    impl ReceiptProvider {
        fn new(receipt: Value) -> Self {
            Self {
                receipt,
                events: broadcast::channel(1).0,
            }
        }
    }

    #[async_trait]
    impl EvmProvider for ReceiptProvider {
        fn kind(&self) -> &str {
            "test"
        }

        async fn request(&self, method: &str, _params: Value) -> Result<Value, RpcError> {
            match method {
                "eth_getTransactionReceipt" => Ok(self.receipt.clone()),
                other => Err(RpcError::new(4200, format!("{other} not supported"))),
            }
        }

        fn subscribe(&self) -> broadcast::Receiver<ProviderEvent> {
            self.events.subscribe()
        }
    }

    struct StatusRpc {
        status: Mutex<Option<SignatureStatus>>,
    }

    #[async_trait]
    impl SolanaRpc for StatusRpc {
        async fn latest_blockhash(&self) -> Result<[u8; 32], SolError> {
            Ok([0; 32])
        }

        async fn mint_info(&self, _mint: &Pubkey) -> Result<MintInfo, SolError> {
            Err(SolError::rpc("not used"))
        }

        async fn signature_status(
            &self,
            _signature: &str,
        ) -> Result<Option<SignatureStatus>, SolError> {
            Ok(self.status.lock().unwrap().clone())
        }
    }

    fn status(confirmation: &str, err: Option<&str>) -> SignatureStatus {
        SignatureStatus {
            slot: 99,
            confirmations: None,
            err: err.map(str::to_string),
            confirmation_status: Some(confirmation.to_string()),
        }
    }

    #[tokio::test]
    async fn evm_receipts_map_status() {
        let receipts = ChainReceipts::new().with_evm(
            ChainId::Sepolia,
            Arc::new(ReceiptProvider::new(json!({
                "transactionHash": "0x01",
                "status": "0x0",
                "blockNumber": "0x2a",
                "gasUsed": "0x5208",
            }))),
        );
        let outcome = receipts.receipt(ChainId::Sepolia, "0x01").await.unwrap().unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.block_number, Some(42));
        assert_eq!(outcome.gas_used, Some(21_000));
        assert!(outcome.error.is_some());
    }

    #[tokio::test]
    async fn evm_pending_receipt_is_none() {
        let receipts = ChainReceipts::new()
            .with_evm(ChainId::Bsc, Arc::new(ReceiptProvider::new(Value::Null)));
        assert_eq!(receipts.receipt(ChainId::Bsc, "0x01").await.unwrap(), None);
    }

    #[tokio::test]
    async fn solana_statuses() {
        let rpc = Arc::new(StatusRpc {
            status: Mutex::new(None),
        });
        let receipts = ChainReceipts::new().with_solana(ChainId::SolanaDevnet, rpc.clone());

        assert_eq!(receipts.receipt(ChainId::SolanaDevnet, "sig").await.unwrap(), None);

        *rpc.status.lock().unwrap() = Some(status("processed", None));
        assert_eq!(receipts.receipt(ChainId::SolanaDevnet, "sig").await.unwrap(), None);

        *rpc.status.lock().unwrap() = Some(status("confirmed", None));
        let outcome = receipts.receipt(ChainId::SolanaDevnet, "sig").await.unwrap().unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.block_number, Some(99));

        *rpc.status.lock().unwrap() = Some(status("processed", Some("{\"Custom\":1}")));
        let outcome = receipts.receipt(ChainId::SolanaDevnet, "sig").await.unwrap().unwrap();
        assert!(!outcome.success);
    }

    #[tokio::test]
    async fn unrouted_chain_is_unsupported() {
        let receipts = ChainReceipts::new();
        assert!(matches!(
            receipts.receipt(ChainId::Ethereum, "0x01").await,
            Err(CoreError::UnsupportedChain(_))
        ));
    }

    #[test]
    fn from_config_routes_every_chain() {
        let receipts = ChainReceipts::from_config(&LaunchpadConfig::default());
        assert_eq!(receipts.evm.len(), 4);
        assert_eq!(receipts.solana.len(), 2);
    }
}
