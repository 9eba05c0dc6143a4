//! Mint and freeze authority transfer and revocation.
//!
//! The on-chain mint is read before anything is signed. If the connected
//! wallet is not the current authority the operation fails with
//! [`SolError::AuthorityMismatch`] and no transaction is built.

use tracing::info;

use crate::address::Pubkey;
use crate::client::SolanaClient;
use crate::error::SolError;
use crate::rpc::MintInfo;
use crate::spl_token::{self, AuthorityType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorityAction {
    Transfer {
        authority: AuthorityType,
        new_authority: Pubkey,
    },
    /// Sets the authority to none. Cannot be undone.
    Revoke { authority: AuthorityType },
}

impl AuthorityAction {
    pub fn is_irreversible(&self) -> bool {
        matches!(self, AuthorityAction::Revoke { .. })
    }

    pub fn authority(&self) -> AuthorityType {
        match self {
            AuthorityAction::Transfer { authority, .. } | AuthorityAction::Revoke { authority } => {
                *authority
            }
        }
    }
}

/// Current holder of `authority` on `mint`.
pub fn current_authority(mint: &MintInfo, authority: AuthorityType) -> Option<Pubkey> {
    match authority {
        AuthorityType::MintTokens => mint.mint_authority,
        AuthorityType::FreezeAccount => mint.freeze_authority,
    }
}

/// Fails unless `signer` currently holds `authority`.
pub fn ensure_authority(
    mint: &MintInfo,
    authority: AuthorityType,
    signer: &Pubkey,
) -> Result<(), SolError> {
    match current_authority(mint, authority) {
        None => Err(SolError::AuthorityRevoked(authority.label().to_string())),
        Some(holder) if holder != *signer => Err(SolError::AuthorityMismatch {
            authority: authority.label().to_string(),
            expected: holder.to_string(),
            actual: signer.to_string(),
        }),
        Some(_) => Ok(()),
    }
}

pub struct AuthorityManager {
    client: SolanaClient,
}

impl AuthorityManager {
    pub fn new(client: SolanaClient) -> Self {
        Self { client }
    }

    pub async fn execute(&self, mint: &Pubkey, action: AuthorityAction) -> Result<String, SolError> {
        let signer = self.client.signer()?;
        let info = self.client.mint_info(mint).await?;
        let authority = action.authority();
        ensure_authority(&info, authority, &signer)?;

        let new_authority = match &action {
            AuthorityAction::Transfer { new_authority, .. } => Some(new_authority),
            AuthorityAction::Revoke { .. } => None,
        };
        let ix = spl_token::set_authority(mint, &signer, authority, new_authority);
        let signature = self.client.submit(&[ix]).await?;

        info!(
            %mint,
            authority = authority.label(),
            revoked = action.is_irreversible(),
            %signature,
            "authority updated"
        );
        Ok(signature)
    }

    pub async fn revoke(&self, mint: &Pubkey, authority: AuthorityType) -> Result<String, SolError> {
        self.execute(mint, AuthorityAction::Revoke { authority }).await
    }

    pub async fn transfer(
        &self,
        mint: &Pubkey,
        authority: AuthorityType,
        new_authority: Pubkey,
    ) -> Result<String, SolError> {
        self.execute(
            mint,
            AuthorityAction::Transfer {
                authority,
                new_authority,
            },
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::client::testing::{mint_info, MockRpc, MockWallet};

    fn key(n: u8) -> Pubkey {
        Pubkey::new([n; 32])
    }

    const MINT: Pubkey = Pubkey::new([50; 32]);

    fn manager(wallet: &Arc<MockWallet>, info: MintInfo) -> AuthorityManager {
        let rpc = MockRpc::new().with_mint(MINT, info);
        AuthorityManager::new(SolanaClient::new(Arc::new(rpc), wallet.clone()))
    }

    #[test]
    fn only_revocation_is_irreversible() {
        assert!(AuthorityAction::Revoke {
            authority: AuthorityType::MintTokens
        }
        .is_irreversible());
        assert!(!AuthorityAction::Transfer {
            authority: AuthorityType::MintTokens,
            new_authority: key(2)
        }
        .is_irreversible());
    }

    #[tokio::test]
    async fn revoke_freeze_by_non_authority_submits_nothing() {
        let wallet = Arc::new(MockWallet::connected(key(1)));
        let manager = manager(&wallet, mint_info(Some(key(1)), Some(key(2)), 9));

        let err = manager
            .revoke(&MINT, AuthorityType::FreezeAccount)
            .await
            .unwrap_err();

        match err {
            SolError::AuthorityMismatch {
                authority,
                expected,
                actual,
            } => {
                assert_eq!(authority, "freeze");
                assert_eq!(expected, key(2).to_string());
                assert_eq!(actual, key(1).to_string());
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(wallet.sent_count(), 0);
    }

    #[tokio::test]
    async fn revoke_already_revoked_authority() {
        let wallet = Arc::new(MockWallet::connected(key(1)));
        let manager = manager(&wallet, mint_info(None, None, 6));

        let err = manager
            .revoke(&MINT, AuthorityType::MintTokens)
            .await
            .unwrap_err();
        assert!(matches!(err, SolError::AuthorityRevoked(ref a) if a == "mint"));
        assert_eq!(wallet.sent_count(), 0);
    }

    #[tokio::test]
    async fn authority_holder_can_revoke() {
        let wallet = Arc::new(MockWallet::connected(key(1)));
        let manager = manager(&wallet, mint_info(Some(key(1)), Some(key(1)), 9));

        let signature = manager
            .revoke(&MINT, AuthorityType::FreezeAccount)
            .await
            .unwrap();
        assert_eq!(signature, "sig1");
        assert_eq!(wallet.sent_count(), 1);
    }

    #[tokio::test]
    async fn authority_holder_can_transfer() {
        let wallet = Arc::new(MockWallet::connected(key(1)));
        let manager = manager(&wallet, mint_info(Some(key(1)), None, 9));

        manager
            .transfer(&MINT, AuthorityType::MintTokens, key(3))
            .await
            .unwrap();
        assert_eq!(wallet.sent_count(), 1);
    }

    #[tokio::test]
    async fn disconnected_wallet_rejected() {
        let wallet = Arc::new(MockWallet::connected(key(1)));
        *wallet.connected.lock().unwrap() = false;
        let manager = manager(&wallet, mint_info(Some(key(1)), None, 9));

        assert!(matches!(
            manager.revoke(&MINT, AuthorityType::MintTokens).await,
            Err(SolError::NotConnected)
        ));
    }
}
