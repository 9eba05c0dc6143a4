//! Token contract deployment through an injected wallet.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::abi::{decode_hex_data, encode_params};
use crate::chains::require_chain;
use crate::error::EthError;
use crate::provider::{EvmClient, EvmProvider, TransactionRequest};
use crate::token::{plan_deployment, ContractType, TokenDeployParams};

/// Compiled contract artifacts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompiledContract {
    pub abi: serde_json::Value,
    /// 0x-prefixed creation bytecode.
    pub bytecode: String,
}

/// Where compiled bytecode comes from (the backend compile endpoint).
#[async_trait]
pub trait ContractSource: Send + Sync {
    async fn compiled(&self, contract_type: ContractType) -> Result<CompiledContract, EthError>;
}

/// Result of a successful deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployResult {
    pub contract_address: String,
    pub transaction_hash: String,
    pub block_number: Option<u64>,
    pub contract_type: ContractType,
}

/// Deploys token contracts via the connected EVM wallet.
pub struct EvmDeployer {
    provider: Option<Arc<dyn EvmProvider>>,
    source: Arc<dyn ContractSource>,
}

impl EvmDeployer {
    /// `provider` is `None` when no wallet is injected; deployment then
    /// fails with [`EthError::ProviderMissing`].
    pub fn new(provider: Option<Arc<dyn EvmProvider>>, source: Arc<dyn ContractSource>) -> Self {
        Self { provider, source }
    }

    /// Deploys the token described by `params`.
    ///
    /// Checks, in order: a provider is injected, the target chain is
    /// supported, the parameters are valid, a signer is connected, and the
    /// wallet is on the target chain. Only then is bytecode fetched and the
    /// creation transaction submitted.
    pub async fn deploy_token(&self, params: &TokenDeployParams) -> Result<DeployResult, EthError> {
        let provider = self.provider.clone().ok_or(EthError::ProviderMissing)?;
        let client = EvmClient::new(provider);

        let chain = require_chain(params.chain_id)?;
        let plan = plan_deployment(params)?;

        let from = client.signer().await?;
        client.ensure_chain(chain.chain_id).await?;

        let compiled = self.source.compiled(plan.contract_type).await?;
        let mut data = decode_hex_data(&compiled.bytecode)?;
        if data.is_empty() {
            return Err(EthError::ContractSource(format!(
                "empty bytecode for {} contract",
                plan.contract_type
            )));
        }
        data.extend_from_slice(&encode_params(&plan.constructor_args));

        info!(
            chain = chain.name,
            contract_type = %plan.contract_type,
            symbol = %params.symbol,
            "deploying token"
        );

        let hash = client
            .send_transaction(&TransactionRequest {
                from,
                to: None,
                data,
                value: None,
            })
            .await?;
        let receipt = client.wait_for_receipt(&hash).await?;

        let contract_address = receipt.contract_address.ok_or_else(|| {
            EthError::ContractSource(format!("receipt for {hash} has no contract address"))
        })?;
        info!(%contract_address, %hash, "token deployed");

        Ok(DeployResult {
            contract_address,
            transaction_hash: hash,
            block_number: receipt.block_number,
            contract_type: plan.contract_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::provider::testing::MockProvider;
    use crate::token::TokenFeatures;

    const ACCOUNT: &str = "0x000000000000000000000000000000000000dEaD";

    #[derive(Default)]
    struct FixedSource {
        requested: Mutex<Vec<ContractType>>,
    }

    #[async_trait]
    impl ContractSource for FixedSource {
        async fn compiled(&self, contract_type: ContractType) -> Result<CompiledContract, EthError> {
            self.requested.lock().unwrap().push(contract_type);
            Ok(CompiledContract {
                abi: serde_json::json!([]),
                bytecode: "0x6080604052".into(),
            })
        }
    }

    fn params(chain_id: u64, features: TokenFeatures) -> TokenDeployParams {
        TokenDeployParams {
            name: "Test".into(),
            symbol: "TST".into(),
            decimals: 18,
            total_supply: "1000".into(),
            chain_id,
            features,
        }
    }

    #[tokio::test]
    async fn deploy_without_provider_fails() {
        let deployer = EvmDeployer::new(None, Arc::new(FixedSource::default()));
        let err = deployer
            .deploy_token(&params(1, TokenFeatures::default()))
            .await
            .unwrap_err();
        assert!(matches!(err, EthError::ProviderMissing));
    }

    #[tokio::test]
    async fn deploy_on_wrong_network_fails_before_submission() {
        let mock = Arc::new(MockProvider::connected(1, ACCOUNT));
        let source = Arc::new(FixedSource::default());
        let deployer = EvmDeployer::new(Some(mock.clone() as Arc<dyn EvmProvider>), source.clone());

        let err = deployer
            .deploy_token(&params(56, TokenFeatures::default()))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            EthError::WrongNetwork {
                expected: 56,
                actual: 1
            }
        ));
        assert!(mock.calls_to("eth_sendTransaction").is_empty());
        assert!(source.requested.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn deploy_standard_token() {
        let mock = Arc::new(MockProvider::connected(56, ACCOUNT));
        let source = Arc::new(FixedSource::default());
        let deployer = EvmDeployer::new(Some(mock.clone() as Arc<dyn EvmProvider>), source.clone());

        let result = deployer
            .deploy_token(&params(56, TokenFeatures::default()))
            .await
            .unwrap();

        assert_eq!(result.contract_type, ContractType::Standard);
        assert_eq!(
            result.contract_address,
            "0x000000000000000000000000000000000000c0de"
        );
        assert_eq!(result.block_number, Some(16));
        assert_eq!(*source.requested.lock().unwrap(), vec![ContractType::Standard]);

        let sent = mock.calls_to("eth_sendTransaction");
        assert_eq!(sent.len(), 1);
        let tx = &sent[0][0];
        assert!(tx.get("to").is_none());
        assert!(tx["data"].as_str().unwrap().starts_with("0x6080604052"));
    }

    #[tokio::test]
    async fn deploy_advanced_token_requests_advanced_bytecode() {
        let mock = Arc::new(MockProvider::connected(1, ACCOUNT));
        let source = Arc::new(FixedSource::default());
        let deployer = EvmDeployer::new(Some(mock as Arc<dyn EvmProvider>), source.clone());

        let features = TokenFeatures {
            is_burnable: true,
            ..Default::default()
        };
        let result = deployer.deploy_token(&params(1, features)).await.unwrap();

        assert_eq!(result.contract_type, ContractType::Advanced);
        assert_eq!(*source.requested.lock().unwrap(), vec![ContractType::Advanced]);
    }

    #[tokio::test]
    async fn deploy_to_unsupported_chain_fails() {
        let mock = Arc::new(MockProvider::connected(137, ACCOUNT));
        let deployer = EvmDeployer::new(Some(mock as Arc<dyn EvmProvider>), Arc::new(FixedSource::default()));
        let err = deployer
            .deploy_token(&params(137, TokenFeatures::default()))
            .await
            .unwrap_err();
        assert!(matches!(err, EthError::UnsupportedChain(137)));
    }
}
