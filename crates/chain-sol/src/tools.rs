//! Supply and account management for SPL tokens: mint, burn, freeze, thaw.

use tracing::info;

use crate::address::Pubkey;
use crate::authority::ensure_authority;
use crate::client::SolanaClient;
use crate::error::SolError;
use crate::spl_token::{self, AuthorityType};
use crate::units::parse_amount;

pub struct TokenTools {
    client: SolanaClient,
}

impl TokenTools {
    pub fn new(client: SolanaClient) -> Self {
        Self { client }
    }

    /// Mints `amount` (human-readable) to `recipient`'s associated token
    /// account, creating it if needed. The wallet must be the mint authority.
    pub async fn mint(
        &self,
        mint: &Pubkey,
        recipient: &Pubkey,
        amount: &str,
    ) -> Result<String, SolError> {
        let signer = self.client.signer()?;
        let info = self.client.mint_info(mint).await?;
        ensure_authority(&info, AuthorityType::MintTokens, &signer)?;
        let base_units = parse_amount(amount, info.decimals)?;

        let destination = spl_token::associated_token_address(recipient, mint)?;
        let instructions = [
            spl_token::create_associated_token_account_idempotent(&signer, recipient, mint)?,
            spl_token::mint_to(mint, &destination, &signer, base_units)?,
        ];
        let signature = self.client.submit(&instructions).await?;
        info!(%mint, %recipient, amount, %signature, "tokens minted");
        Ok(signature)
    }

    /// Burns `amount` from the connected wallet's own token account.
    pub async fn burn(&self, mint: &Pubkey, amount: &str) -> Result<String, SolError> {
        let signer = self.client.signer()?;
        let info = self.client.mint_info(mint).await?;
        let base_units = parse_amount(amount, info.decimals)?;

        let account = spl_token::associated_token_address(&signer, mint)?;
        let ix = spl_token::burn(&account, mint, &signer, base_units)?;
        let signature = self.client.submit(&[ix]).await?;
        info!(%mint, amount, %signature, "tokens burned");
        Ok(signature)
    }

    /// Freezes `owner`'s token account. The wallet must be the freeze authority.
    pub async fn freeze(&self, mint: &Pubkey, owner: &Pubkey) -> Result<String, SolError> {
        self.freeze_or_thaw(mint, owner, true).await
    }

    pub async fn thaw(&self, mint: &Pubkey, owner: &Pubkey) -> Result<String, SolError> {
        self.freeze_or_thaw(mint, owner, false).await
    }

    async fn freeze_or_thaw(
        &self,
        mint: &Pubkey,
        owner: &Pubkey,
        freeze: bool,
    ) -> Result<String, SolError> {
        let signer = self.client.signer()?;
        let info = self.client.mint_info(mint).await?;
        ensure_authority(&info, AuthorityType::FreezeAccount, &signer)?;

        let account = spl_token::associated_token_address(owner, mint)?;
        let ix = if freeze {
            spl_token::freeze_account(&account, mint, &signer)
        } else {
            spl_token::thaw_account(&account, mint, &signer)
        };
        let signature = self.client.submit(&[ix]).await?;
        info!(%mint, %owner, freeze, %signature, "token account updated");
        Ok(signature)
    }
}
