//! Token management calls against deployed contracts.
//!
//! Every action resolves the signer, scales amounts by the token's on-chain
//! `decimals()`, submits one transaction and waits for one confirmation.

use std::sync::Arc;

use tracing::info;

use crate::address::parse_address;
use crate::erc20::{self, Role};
use crate::error::EthError;
use crate::provider::{EvmClient, EvmProvider, TransactionRequest};
use crate::units::parse_units;

/// A state-changing call on a token contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenAction {
    Transfer { to: String, amount: String },
    Mint { to: String, amount: String },
    Burn { amount: String },
    Pause,
    Unpause,
    Blacklist { account: String },
    Unblacklist { account: String },
    RevokeRole { role: Role, account: String },
    TransferOwnership { new_owner: String },
    RenounceOwnership,
}

impl TokenAction {
    /// Revoking a role or renouncing ownership cannot be undone.
    /// Callers must obtain explicit acknowledgement before executing these.
    pub fn is_irreversible(&self) -> bool {
        matches!(
            self,
            TokenAction::RevokeRole { .. } | TokenAction::RenounceOwnership
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            TokenAction::Transfer { .. } => "transfer",
            TokenAction::Mint { .. } => "mint",
            TokenAction::Burn { .. } => "burn",
            TokenAction::Pause => "pause",
            TokenAction::Unpause => "unpause",
            TokenAction::Blacklist { .. } => "blacklist",
            TokenAction::Unblacklist { .. } => "unblacklist",
            TokenAction::RevokeRole { .. } => "revoke_role",
            TokenAction::TransferOwnership { .. } => "transfer_ownership",
            TokenAction::RenounceOwnership => "renounce_ownership",
        }
    }

    fn amount(&self) -> Option<&str> {
        match self {
            TokenAction::Transfer { amount, .. }
            | TokenAction::Mint { amount, .. }
            | TokenAction::Burn { amount } => Some(amount),
            _ => None,
        }
    }
}

/// Executes [`TokenAction`]s through the connected wallet.
pub struct TokenTools {
    client: EvmClient,
}

impl TokenTools {
    pub fn new(provider: Option<Arc<dyn EvmProvider>>) -> Result<Self, EthError> {
        let provider = provider.ok_or(EthError::ProviderMissing)?;
        Ok(Self {
            client: EvmClient::new(provider),
        })
    }

    pub fn with_client(client: EvmClient) -> Self {
        Self { client }
    }

    /// Reads `decimals()` from the token contract.
    pub async fn decimals(&self, token: &str) -> Result<u8, EthError> {
        parse_address(token)?;
        let data = self.client.call(token, &erc20::encode_decimals()).await?;
        erc20::decode_decimals(&data)
    }

    /// Submits `action` against `token` and returns the transaction hash
    /// once it has one confirmation.
    pub async fn execute(&self, token: &str, action: &TokenAction) -> Result<String, EthError> {
        parse_address(token)?;
        let from = self.client.signer().await?;

        let amount = match action.amount() {
            Some(raw) => {
                let decimals = self.decimals(token).await?;
                let scaled = parse_units(raw, decimals)?;
                if scaled.is_zero() {
                    return Err(EthError::InvalidAmount("amount must be > 0".into()));
                }
                scaled
            }
            None => Default::default(),
        };

        let data = match action {
            TokenAction::Transfer { to, .. } => erc20::encode_transfer(to, amount)?,
            TokenAction::Mint { to, .. } => erc20::encode_mint(to, amount)?,
            TokenAction::Burn { .. } => erc20::encode_burn(amount),
            TokenAction::Pause => erc20::encode_pause(),
            TokenAction::Unpause => erc20::encode_unpause(),
            TokenAction::Blacklist { account } => erc20::encode_blacklist(account)?,
            TokenAction::Unblacklist { account } => erc20::encode_unblacklist(account)?,
            TokenAction::RevokeRole { role, account } => erc20::encode_revoke_role(*role, account)?,
            TokenAction::TransferOwnership { new_owner } => {
                erc20::encode_transfer_ownership(new_owner)?
            }
            TokenAction::RenounceOwnership => erc20::encode_renounce_ownership(),
        };

        let hash = self
            .client
            .send_transaction(&TransactionRequest {
                from,
                to: Some(token.to_string()),
                data,
                value: None,
            })
            .await?;
        self.client.wait_for_receipt(&hash).await?;

        info!(action = action.name(), token, %hash, "token action confirmed");
        Ok(hash)
    }

    pub async fn mint(&self, token: &str, to: &str, amount: &str) -> Result<String, EthError> {
        self.execute(
            token,
            &TokenAction::Mint {
                to: to.into(),
                amount: amount.into(),
            },
        )
        .await
    }

    pub async fn burn(&self, token: &str, amount: &str) -> Result<String, EthError> {
        self.execute(
            token,
            &TokenAction::Burn {
                amount: amount.into(),
            },
        )
        .await
    }

    pub async fn pause(&self, token: &str) -> Result<String, EthError> {
        self.execute(token, &TokenAction::Pause).await
    }

    pub async fn unpause(&self, token: &str) -> Result<String, EthError> {
        self.execute(token, &TokenAction::Unpause).await
    }

    pub async fn blacklist(&self, token: &str, account: &str) -> Result<String, EthError> {
        self.execute(
            token,
            &TokenAction::Blacklist {
                account: account.into(),
            },
        )
        .await
    }

    /// Irreversible.
    pub async fn revoke_role(
        &self,
        token: &str,
        role: Role,
        account: &str,
    ) -> Result<String, EthError> {
        self.execute(
            token,
            &TokenAction::RevokeRole {
                role,
                account: account.into(),
            },
        )
        .await
    }

    pub async fn transfer_ownership(
        &self,
        token: &str,
        new_owner: &str,
    ) -> Result<String, EthError> {
        self.execute(
            token,
            &TokenAction::TransferOwnership {
                new_owner: new_owner.into(),
            },
        )
        .await
    }

    /// Irreversible.
    pub async fn renounce_ownership(&self, token: &str) -> Result<String, EthError> {
        self.execute(token, &TokenAction::RenounceOwnership).await
    }
}
