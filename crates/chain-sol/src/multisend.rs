//! Batched SPL transfers to many recipients.
//!
//! Input is one recipient per line: `address,amount`, `address amount` or
//! tab-separated. Blank lines and `#` comments are skipped. A single bad line
//! rejects the whole batch before the wallet is asked to sign anything.

use serde::Serialize;
use tracing::{info, warn};

use crate::address::Pubkey;
use crate::client::SolanaClient;
use crate::error::SolError;
use crate::spl_token;
use crate::units::parse_amount;

/// Recipients per transaction. Each costs an idempotent account creation
/// plus a `TransferChecked`, which keeps a full chunk under the packet limit.
pub const CHUNK_SIZE: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchEntry {
    /// 1-based source line, for error reporting.
    pub line: usize,
    pub recipient: Pubkey,
    /// Human-readable amount as written in the batch.
    pub amount: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MultisendOutcome {
    /// One signature per submitted chunk, in order.
    pub signatures: Vec<String>,
    pub recipients: usize,
    /// Sum of all transfers in base units.
    pub total_base_units: u64,
}

fn is_positive_decimal(raw: &str) -> bool {
    let (whole, fraction) = raw.split_once('.').unwrap_or((raw, ""));
    let digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    !(whole.is_empty() && fraction.is_empty())
        && digits(whole)
        && digits(fraction)
        && raw.bytes().any(|b| (b'1'..=b'9').contains(&b))
}

/// Parses a batch. Errors carry the 1-based line number.
pub fn parse_batch(input: &str) -> Result<Vec<BatchEntry>, SolError> {
    let mut entries = Vec::new();
    for (idx, raw_line) in input.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let (address, amount) = match line.split_once(',') {
            Some((a, b)) => (a.trim(), b.trim()),
            None => {
                let mut parts = line.split_whitespace();
                match (parts.next(), parts.next()) {
                    (Some(a), Some(b)) => (a, b),
                    _ => return Err(SolError::format(line_no, "expected `address,amount`")),
                }
            }
        };

        if address.is_empty() {
            return Err(SolError::format(line_no, "missing address"));
        }
        let recipient: Pubkey = address
            .parse()
            .map_err(|_| SolError::format(line_no, format!("invalid address {address:?}")))?;
        if !is_positive_decimal(amount) {
            return Err(SolError::format(line_no, format!("invalid amount {amount:?}")));
        }

        entries.push(BatchEntry {
            line: line_no,
            recipient,
            amount: amount.to_string(),
        });
    }

    if entries.is_empty() {
        return Err(SolError::format(0, "batch has no recipients"));
    }
    Ok(entries)
}

pub struct Multisender {
    client: SolanaClient,
}

impl Multisender {
    pub fn new(client: SolanaClient) -> Self {
        Self { client }
    }

    /// Parses `input` and sends the batch.
    pub async fn send_text(&self, mint: &Pubkey, input: &str) -> Result<MultisendOutcome, SolError> {
        let entries = parse_batch(input)?;
        self.send(mint, &entries).await
    }

    /// Sends `entries` from the connected wallet's token account, chunked
    /// into as many transactions as needed. Stops at the first failure; past
    /// the first chunk that failure is [`SolError::PartialMultisend`], so the
    /// caller knows which recipients were already paid.
    pub async fn send(
        &self,
        mint: &Pubkey,
        entries: &[BatchEntry],
    ) -> Result<MultisendOutcome, SolError> {
        let signer = self.client.signer()?;
        let info = self.client.mint_info(mint).await?;

        // Scale everything up front so a precision error cannot strand a
        // half-sent batch.
        let amounts = entries
            .iter()
            .map(|e| {
                parse_amount(&e.amount, info.decimals)
                    .map_err(|err| SolError::format(e.line, err.to_string()))
            })
            .collect::<Result<Vec<u64>, _>>()?;
        let total = amounts
            .iter()
            .try_fold(0u64, |acc, a| acc.checked_add(*a))
            .ok_or_else(|| SolError::InvalidAmount("batch total overflows u64".into()))?;

        let source = spl_token::associated_token_address(&signer, mint)?;
        let mut signatures = Vec::new();

        for (chunk, (batch, batch_amounts)) in entries
            .chunks(CHUNK_SIZE)
            .zip(amounts.chunks(CHUNK_SIZE))
            .enumerate()
        {
            let mut instructions = Vec::with_capacity(batch.len() * 2);
            for (entry, amount) in batch.iter().zip(batch_amounts) {
                let destination = spl_token::associated_token_address(&entry.recipient, mint)?;
                instructions.push(spl_token::create_associated_token_account_idempotent(
                    &signer,
                    &entry.recipient,
                    mint,
                )?);
                instructions.push(spl_token::transfer_checked(
                    &source,
                    mint,
                    &destination,
                    &signer,
                    *amount,
                    info.decimals,
                )?);
            }

            match self.client.submit(&instructions).await {
                Ok(signature) => signatures.push(signature),
                Err(e) if signatures.is_empty() => return Err(e),
                Err(e) => {
                    warn!(
                        %mint,
                        chunk,
                        completed = signatures.len(),
                        error = %e,
                        "multisend stopped"
                    );
                    return Err(SolError::PartialMultisend {
                        completed_recipients: chunk * CHUNK_SIZE,
                        completed_signatures: signatures,
                        failed_chunk: chunk,
                        source: Box::new(e),
                    });
                }
            }
        }

        info!(%mint, recipients = entries.len(), chunks = signatures.len(), "multisend complete");
        Ok(MultisendOutcome {
            signatures,
            recipients: entries.len(),
            total_base_units: total,
        })
    }
}
