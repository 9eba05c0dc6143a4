//! Minimal ABI encoding for EVM function calls and constructor arguments.
//!
//! Covers the static types token contracts need (address, uint256, uint8,
//! bool, bytes32) plus dynamic `string`, using the standard head/tail layout.

use alloy_primitives::U256;
use sha3::{Digest, Keccak256};

use crate::error::EthError;

/// A single ABI-encoded parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbiParam {
    /// A 20-byte address, left-padded to 32 bytes.
    Address([u8; 20]),
    /// A 256-bit unsigned integer (also used for `uint8` and friends).
    Uint(U256),
    Bool(bool),
    /// A fixed 32-byte word such as an AccessControl role id.
    FixedBytes([u8; 32]),
    /// A dynamic UTF-8 string.
    String(String),
}

impl AbiParam {
    fn is_dynamic(&self) -> bool {
        matches!(self, AbiParam::String(_))
    }
}

/// Computes the 4-byte selector for a canonical function signature such as
/// `transfer(address,uint256)`.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = Keccak256::digest(signature.as_bytes());
    let mut out = [0u8; 4];
    out.copy_from_slice(&hash[..4]);
    out
}

/// Keccak-256 of arbitrary bytes, as a 32-byte word.
pub fn keccak(data: &[u8]) -> [u8; 32] {
    Keccak256::digest(data).into()
}

/// Encodes a function call: `selector || encode_params(params)`.
pub fn encode_function_call(selector: [u8; 4], params: &[AbiParam]) -> Vec<u8> {
    let encoded = encode_params(params);
    let mut data = Vec::with_capacity(4 + encoded.len());
    data.extend_from_slice(&selector);
    data.extend_from_slice(&encoded);
    data
}

/// Encodes a parameter tuple using the head/tail layout.
///
/// Static parameters are written inline in the head. Dynamic parameters
/// write an offset into the head and their length-prefixed, right-padded
/// payload into the tail.
pub fn encode_params(params: &[AbiParam]) -> Vec<u8> {
    let head_len = params.len() * 32;
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();

    for param in params {
        if param.is_dynamic() {
            head.extend_from_slice(&uint_word(U256::from(head_len + tail.len())));
            tail.extend_from_slice(&encode_dynamic(param));
        } else {
            head.extend_from_slice(&encode_static(param));
        }
    }

    head.extend_from_slice(&tail);
    head
}

fn uint_word(value: U256) -> [u8; 32] {
    value.to_be_bytes::<32>()
}

fn encode_static(param: &AbiParam) -> [u8; 32] {
    match param {
        AbiParam::Address(addr) => {
            let mut word = [0u8; 32];
            word[12..].copy_from_slice(addr);
            word
        }
        AbiParam::Uint(value) => uint_word(*value),
        AbiParam::Bool(flag) => uint_word(U256::from(*flag as u8)),
        AbiParam::FixedBytes(bytes) => *bytes,
        AbiParam::String(_) => unreachable!("dynamic parameter encoded as static"),
    }
}

fn encode_dynamic(param: &AbiParam) -> Vec<u8> {
    let bytes = match param {
        AbiParam::String(s) => s.as_bytes(),
        _ => unreachable!("static parameter encoded as dynamic"),
    };

    let padded_len = bytes.len().div_ceil(32) * 32;
    let mut out = Vec::with_capacity(32 + padded_len);
    out.extend_from_slice(&uint_word(U256::from(bytes.len())));
    out.extend_from_slice(bytes);
    out.resize(32 + padded_len, 0);
    out
}

/// Decodes a single uint256 return value from ABI-encoded data.
pub fn decode_uint256(data: &[u8]) -> Result<U256, EthError> {
    if data.len() < 32 {
        return Err(EthError::EncodingError(format!(
            "expected at least 32 bytes for uint256, got {}",
            data.len()
        )));
    }

    Ok(U256::from_be_slice(&data[..32]))
}

/// Decodes a 0x-prefixed hex string returned by `eth_call`.
pub fn decode_hex_data(data: &str) -> Result<Vec<u8>, EthError> {
    let stripped = data.strip_prefix("0x").unwrap_or(data);
    hex::decode(stripped).map_err(|e| EthError::EncodingError(format!("invalid hex data: {e}")))
}
