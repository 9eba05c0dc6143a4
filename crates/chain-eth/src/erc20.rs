use alloy_primitives::U256;

use crate::abi::{encode_function_call, keccak, selector, AbiParam};
use crate::address::parse_address;
use crate::error::EthError;

pub const TRANSFER: &str = "transfer(address,uint256)";
pub const APPROVE: &str = "approve(address,uint256)";
pub const BALANCE_OF: &str = "balanceOf(address)";
pub const DECIMALS: &str = "decimals()";
pub const MINT: &str = "mint(address,uint256)";
pub const BURN: &str = "burn(uint256)";
pub const PAUSE: &str = "pause()";
pub const UNPAUSE: &str = "unpause()";
pub const BLACKLIST: &str = "blacklist(address)";
pub const UNBLACKLIST: &str = "unblacklist(address)";
pub const REVOKE_ROLE: &str = "revokeRole(bytes32,address)";
pub const TRANSFER_OWNERSHIP: &str = "transferOwnership(address)";
pub const RENOUNCE_OWNERSHIP: &str = "renounceOwnership()";

/// AccessControl roles the advanced contract grants to the deployer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Minter,
    Pauser,
}

impl Role {
    /// `keccak256("MINTER_ROLE")` etc., matching OpenZeppelin's role ids.
    pub fn id(&self) -> [u8; 32] {
        match self {
            Role::Minter => keccak(b"MINTER_ROLE"),
            Role::Pauser => keccak(b"PAUSER_ROLE"),
        }
    }
}

fn address_and_amount(signature: &str, to: &str, amount: U256) -> Result<Vec<u8>, EthError> {
    let addr = parse_address(to)?;
    Ok(encode_function_call(
        selector(signature),
        &[AbiParam::Address(addr), AbiParam::Uint(amount)],
    ))
}

fn single_address(signature: &str, account: &str) -> Result<Vec<u8>, EthError> {
    let addr = parse_address(account)?;
    Ok(encode_function_call(
        selector(signature),
        &[AbiParam::Address(addr)],
    ))
}

/// `transfer(address,uint256)`
pub fn encode_transfer(to: &str, amount: U256) -> Result<Vec<u8>, EthError> {
    address_and_amount(TRANSFER, to, amount)
}

/// `approve(address,uint256)`
pub fn encode_approve(spender: &str, amount: U256) -> Result<Vec<u8>, EthError> {
    address_and_amount(APPROVE, spender, amount)
}

/// `balanceOf(address)`
pub fn encode_balance_of(owner: &str) -> Result<Vec<u8>, EthError> {
    single_address(BALANCE_OF, owner)
}

/// `decimals()`
pub fn encode_decimals() -> Vec<u8> {
    encode_function_call(selector(DECIMALS), &[])
}

/// `mint(address,uint256)`
pub fn encode_mint(to: &str, amount: U256) -> Result<Vec<u8>, EthError> {
    address_and_amount(MINT, to, amount)
}

/// `burn(uint256)`
pub fn encode_burn(amount: U256) -> Vec<u8> {
    encode_function_call(selector(BURN), &[AbiParam::Uint(amount)])
}

pub fn encode_pause() -> Vec<u8> {
    encode_function_call(selector(PAUSE), &[])
}

pub fn encode_unpause() -> Vec<u8> {
    encode_function_call(selector(UNPAUSE), &[])
}

pub fn encode_blacklist(account: &str) -> Result<Vec<u8>, EthError> {
    single_address(BLACKLIST, account)
}

pub fn encode_unblacklist(account: &str) -> Result<Vec<u8>, EthError> {
    single_address(UNBLACKLIST, account)
}

/// `revokeRole(bytes32,address)`
pub fn encode_revoke_role(role: Role, account: &str) -> Result<Vec<u8>, EthError> {
    let addr = parse_address(account)?;
    Ok(encode_function_call(
        selector(REVOKE_ROLE),
        &[AbiParam::FixedBytes(role.id()), AbiParam::Address(addr)],
    ))
}

pub fn encode_transfer_ownership(new_owner: &str) -> Result<Vec<u8>, EthError> {
    single_address(TRANSFER_OWNERSHIP, new_owner)
}

pub fn encode_renounce_ownership() -> Vec<u8> {
    encode_function_call(selector(RENOUNCE_OWNERSHIP), &[])
}

/// Decodes a `decimals()` return value, rejecting anything above `uint8`.
pub fn decode_decimals(data: &[u8]) -> Result<u8, EthError> {
    let value = crate::abi::decode_uint256(data)?;
    u8::try_from(value)
        .map_err(|_| EthError::EncodingError(format!("decimals value {value} exceeds uint8")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEAD: &str = "0x000000000000000000000000000000000000dEaD";

    #[test]
    fn selectors_match_known_values() {
        assert_eq!(hex::encode(selector(MINT)), "40c10f19");
        assert_eq!(hex::encode(selector(BURN)), "42966c68");
        assert_eq!(hex::encode(selector(PAUSE)), "8456cb59");
        assert_eq!(hex::encode(selector(UNPAUSE)), "3f4ba83a");
        assert_eq!(hex::encode(selector(TRANSFER_OWNERSHIP)), "f2fde38b");
        assert_eq!(hex::encode(selector(RENOUNCE_OWNERSHIP)), "715018a6");
    }

    #[test]
    fn encode_transfer_layout() {
        let data = encode_transfer(DEAD, U256::from(100u64)).unwrap();

        assert_eq!(hex::encode(&data[..4]), "a9059cbb");
        assert_eq!(data.len(), 68);
        assert_eq!(&data[4..16], &[0u8; 12]);
        assert_eq!(data[34], 0xde);
        assert_eq!(data[35], 0xad);
        assert_eq!(data[67], 100);
    }

    #[test]
    fn encode_transfer_one_ether_vector() {
        let one = U256::from(1_000_000_000_000_000_000u64);
        let data = encode_transfer("0xdead000000000000000000000000000000000000", one).unwrap();
        assert!(hex::encode(&data[4..36]).starts_with("000000000000000000000000dead"));
        assert!(hex::encode(&data[36..68]).ends_with("0de0b6b3a7640000"));
    }

    #[test]
    fn encode_mint_layout() {
        let data = encode_mint(DEAD, U256::from(5u64)).unwrap();
        assert_eq!(hex::encode(&data[..4]), "40c10f19");
        assert_eq!(data.len(), 68);
    }

    #[test]
    fn encode_burn_layout() {
        let data = encode_burn(U256::from(7u64));
        assert_eq!(data.len(), 36);
        assert_eq!(data[35], 7);
    }

    #[test]
    fn no_arg_calls_are_selector_only() {
        assert_eq!(encode_pause().len(), 4);
        assert_eq!(encode_unpause().len(), 4);
        assert_eq!(encode_renounce_ownership().len(), 4);
        assert_eq!(hex::encode(encode_decimals()), "313ce567");
    }

    #[test]
    fn encode_revoke_role_layout() {
        let data = encode_revoke_role(Role::Minter, DEAD).unwrap();
        assert_eq!(data.len(), 68);
        assert_eq!(&data[4..36], &Role::Minter.id());
        assert_ne!(Role::Minter.id(), Role::Pauser.id());
    }

    #[test]
    fn invalid_address_rejected() {
        assert!(encode_transfer("not-an-address", U256::ZERO).is_err());
        assert!(encode_blacklist("0xdead").is_err());
        assert!(encode_transfer_ownership("").is_err());
    }

    #[test]
    fn decode_decimals_values() {
        let mut word = [0u8; 32];
        word[31] = 18;
        assert_eq!(decode_decimals(&word).unwrap(), 18);

        word[30] = 1;
        assert!(decode_decimals(&word).is_err());
        assert!(decode_decimals(&[0u8; 4]).is_err());
    }
}
