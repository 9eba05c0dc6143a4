//! SPL Token and Associated Token Account instructions.
//!
//! Built by hand against the programs' documented instruction layouts; no
//! `spl-token` dependency.

use sha2::{Digest, Sha256};

use crate::address::Pubkey;
use crate::error::SolError;
use crate::transaction::{AccountMeta, Instruction, SYSTEM_PROGRAM_ID};

/// `TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA`
pub const TOKEN_PROGRAM_ID: Pubkey = Pubkey::new([
    0x06, 0xdd, 0xf6, 0xe1, 0xd7, 0x65, 0xa1, 0x93, 0xd9, 0xcb, 0xe1, 0x46, 0xce, 0xeb, 0x79,
    0xac, 0x1c, 0xb4, 0x85, 0xed, 0x5f, 0x5b, 0x37, 0x91, 0x3a, 0x8c, 0xf5, 0x85, 0x7e, 0xff,
    0x00, 0xa9,
]);

/// `ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL`
pub const ASSOCIATED_TOKEN_PROGRAM_ID: Pubkey = Pubkey::new([
    0x8c, 0x97, 0x25, 0x8f, 0x4e, 0x24, 0x89, 0xf1, 0xbb, 0x3d, 0x10, 0x29, 0x14, 0x8e, 0x0d,
    0x83, 0x0b, 0x5a, 0x13, 0x99, 0xda, 0xff, 0x10, 0x84, 0x04, 0x8e, 0x7b, 0xd8, 0xdb, 0xe9,
    0xf8, 0x59,
]);

const PDA_MARKER: &[u8] = b"ProgramDerivedAddress";

// Token program instruction tags.
const IX_SET_AUTHORITY: u8 = 6;
const IX_MINT_TO: u8 = 7;
const IX_BURN: u8 = 8;
const IX_FREEZE_ACCOUNT: u8 = 10;
const IX_THAW_ACCOUNT: u8 = 11;
const IX_TRANSFER_CHECKED: u8 = 12;

// Associated token program: CreateIdempotent.
const IX_ATA_CREATE_IDEMPOTENT: u8 = 1;

/// Which mint authority a `SetAuthority` instruction changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthorityType {
    MintTokens = 0,
    FreezeAccount = 1,
}

impl AuthorityType {
    pub fn label(&self) -> &'static str {
        match self {
            AuthorityType::MintTokens => "mint",
            AuthorityType::FreezeAccount => "freeze",
        }
    }
}

fn amount_data(tag: u8, amount: u64) -> Result<Vec<u8>, SolError> {
    if amount == 0 {
        return Err(SolError::InvalidAmount("amount must be > 0".into()));
    }
    let mut data = Vec::with_capacity(10);
    data.push(tag);
    data.extend_from_slice(&amount.to_le_bytes());
    Ok(data)
}

/// `MintTo`: mint `amount` base units into `destination`.
pub fn mint_to(
    mint: &Pubkey,
    destination: &Pubkey,
    mint_authority: &Pubkey,
    amount: u64,
) -> Result<Instruction, SolError> {
    Ok(Instruction {
        program_id: TOKEN_PROGRAM_ID,
        accounts: vec![
            AccountMeta::writable(*mint, false),
            AccountMeta::writable(*destination, false),
            AccountMeta::readonly(*mint_authority, true),
        ],
        data: amount_data(IX_MINT_TO, amount)?,
    })
}

/// `Burn`: destroy `amount` base units held in `account`.
pub fn burn(
    account: &Pubkey,
    mint: &Pubkey,
    owner: &Pubkey,
    amount: u64,
) -> Result<Instruction, SolError> {
    Ok(Instruction {
        program_id: TOKEN_PROGRAM_ID,
        accounts: vec![
            AccountMeta::writable(*account, false),
            AccountMeta::writable(*mint, false),
            AccountMeta::readonly(*owner, true),
        ],
        data: amount_data(IX_BURN, amount)?,
    })
}

/// `TransferChecked`: the token program verifies `decimals` against the mint.
pub fn transfer_checked(
    source: &Pubkey,
    mint: &Pubkey,
    destination: &Pubkey,
    owner: &Pubkey,
    amount: u64,
    decimals: u8,
) -> Result<Instruction, SolError> {
    let mut data = amount_data(IX_TRANSFER_CHECKED, amount)?;
    data.push(decimals);
    Ok(Instruction {
        program_id: TOKEN_PROGRAM_ID,
        accounts: vec![
            AccountMeta::writable(*source, false),
            AccountMeta::readonly(*mint, false),
            AccountMeta::writable(*destination, false),
            AccountMeta::readonly(*owner, true),
        ],
        data,
    })
}

fn freeze_or_thaw(tag: u8, account: &Pubkey, mint: &Pubkey, authority: &Pubkey) -> Instruction {
    Instruction {
        program_id: TOKEN_PROGRAM_ID,
        accounts: vec![
            AccountMeta::writable(*account, false),
            AccountMeta::readonly(*mint, false),
            AccountMeta::readonly(*authority, true),
        ],
        data: vec![tag],
    }
}

pub fn freeze_account(account: &Pubkey, mint: &Pubkey, freeze_authority: &Pubkey) -> Instruction {
    freeze_or_thaw(IX_FREEZE_ACCOUNT, account, mint, freeze_authority)
}

pub fn thaw_account(account: &Pubkey, mint: &Pubkey, freeze_authority: &Pubkey) -> Instruction {
    freeze_or_thaw(IX_THAW_ACCOUNT, account, mint, freeze_authority)
}

/// `SetAuthority` on a mint. `new_authority = None` revokes it permanently.
pub fn set_authority(
    mint: &Pubkey,
    current_authority: &Pubkey,
    authority_type: AuthorityType,
    new_authority: Option<&Pubkey>,
) -> Instruction {
    let mut data = vec![IX_SET_AUTHORITY, authority_type as u8];
    match new_authority {
        Some(key) => {
            data.push(1);
            data.extend_from_slice(key.as_bytes());
        }
        None => data.push(0),
    }
    Instruction {
        program_id: TOKEN_PROGRAM_ID,
        accounts: vec![
            AccountMeta::writable(*mint, false),
            AccountMeta::readonly(*current_authority, true),
        ],
        data,
    }
}

/// Creates `owner`'s associated token account for `mint` unless it exists.
pub fn create_associated_token_account_idempotent(
    payer: &Pubkey,
    owner: &Pubkey,
    mint: &Pubkey,
) -> Result<Instruction, SolError> {
    let ata = associated_token_address(owner, mint)?;
    Ok(Instruction {
        program_id: ASSOCIATED_TOKEN_PROGRAM_ID,
        accounts: vec![
            AccountMeta::writable(*payer, true),
            AccountMeta::writable(ata, false),
            AccountMeta::readonly(*owner, false),
            AccountMeta::readonly(*mint, false),
            AccountMeta::readonly(SYSTEM_PROGRAM_ID, false),
            AccountMeta::readonly(TOKEN_PROGRAM_ID, false),
        ],
        data: vec![IX_ATA_CREATE_IDEMPOTENT],
    })
}

/// Associated token account of `owner` for `mint`.
pub fn associated_token_address(owner: &Pubkey, mint: &Pubkey) -> Result<Pubkey, SolError> {
    find_program_address(
        &[owner.as_ref(), TOKEN_PROGRAM_ID.as_ref(), mint.as_ref()],
        &ASSOCIATED_TOKEN_PROGRAM_ID,
    )
    .map(|(address, _bump)| address)
}

/// Searches bump seeds from 255 down for an address off the Ed25519 curve:
/// `sha256(seeds || bump || program_id || "ProgramDerivedAddress")`.
pub fn find_program_address(
    seeds: &[&[u8]],
    program_id: &Pubkey,
) -> Result<(Pubkey, u8), SolError> {
    for bump in (0u8..=255).rev() {
        let mut hasher = Sha256::new();
        for seed in seeds {
            hasher.update(seed);
        }
        hasher.update([bump]);
        hasher.update(program_id.as_bytes());
        hasher.update(PDA_MARKER);
        let hash: [u8; 32] = hasher.finalize().into();

        if !is_on_curve(&hash) {
            return Ok((Pubkey::new(hash), bump));
        }
    }
    Err(SolError::InvalidAddress(
        "could not find valid PDA bump seed".into(),
    ))
}

pub(crate) fn is_on_curve(bytes: &[u8; 32]) -> bool {
    curve25519_dalek::edwards::CompressedEdwardsY(*bytes)
        .decompress()
        .is_some()
}
