use sha3::{Digest, Keccak256};

use crate::error::EthError;

/// The zero address, used for disabled address-typed constructor arguments.
pub const ZERO_ADDRESS: [u8; 20] = [0u8; 20];

fn hex_part(address: &str) -> Result<&str, EthError> {
    let hex_part = address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
        .ok_or_else(|| EthError::InvalidAddress("address must start with 0x".into()))?;

    if hex_part.len() != 40 {
        return Err(EthError::InvalidAddress(format!(
            "expected 40 hex characters, got {}",
            hex_part.len()
        )));
    }

    if !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(EthError::InvalidAddress(
            "address contains non-hex characters".into(),
        ));
    }

    Ok(hex_part)
}

/// Parses and validates a 0x-prefixed address into its 20 raw bytes.
///
/// All-lowercase and all-uppercase addresses are accepted as-is. Mixed-case
/// input must carry a valid EIP-55 checksum.
pub fn parse_address(address: &str) -> Result<[u8; 20], EthError> {
    let hex_part = hex_part(address)?;

    let is_all_lower = hex_part.chars().all(|c| !c.is_ascii_uppercase());
    let is_all_upper = hex_part.chars().all(|c| !c.is_ascii_lowercase());
    if !is_all_lower && !is_all_upper && checksum_address(address)? != address {
        return Err(EthError::InvalidAddress("EIP-55 checksum mismatch".into()));
    }

    let bytes = hex::decode(hex_part)
        .map_err(|e| EthError::InvalidAddress(format!("invalid hex: {e}")))?;
    let mut addr = [0u8; 20];
    addr.copy_from_slice(&bytes);
    Ok(addr)
}

/// Returns `true` if `address` is a well-formed EVM address.
pub fn is_valid_address(address: &str) -> bool {
    parse_address(address).is_ok()
}

/// Applies EIP-55 mixed-case checksum encoding to an address.
pub fn checksum_address(address: &str) -> Result<String, EthError> {
    let lower = hex_part(address)?.to_lowercase();

    let hash = Keccak256::digest(lower.as_bytes());

    let mut checksummed = String::with_capacity(42);
    checksummed.push_str("0x");
    for (i, c) in lower.chars().enumerate() {
        // High nibble for even positions, low nibble for odd.
        let nibble = if i % 2 == 0 {
            hash[i / 2] >> 4
        } else {
            hash[i / 2] & 0x0f
        };
        if c.is_ascii_alphabetic() && nibble >= 8 {
            checksummed.push(c.to_ascii_uppercase());
        } else {
            checksummed.push(c);
        }
    }

    Ok(checksummed)
}

/// Formats raw address bytes as a checksummed 0x string.
pub fn format_address(bytes: &[u8; 20]) -> String {
    let lower = format!("0x{}", hex::encode(bytes));
    checksum_address(&lower).unwrap_or(lower)
}

/// Case-insensitive address comparison.
pub fn same_address(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    // EIP-55 reference vectors.
    const CHECKSUMMED: &[&str] = &[
        "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed",
        "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359",
        "0xdbF03B407c01E7cD3CBea99509d93f8DDDC8C6FB",
        "0xD1220A0cf47c7B9Be7A2E6BA89F429762e7b9aDb",
    ];

    #[test]
    fn checksum_matches_reference_vectors() {
        for expected in CHECKSUMMED {
            let lower = expected.to_lowercase();
            assert_eq!(checksum_address(&lower).unwrap(), *expected);
        }
    }

    #[test]
    fn parse_accepts_checksummed() {
        for addr in CHECKSUMMED {
            assert!(parse_address(addr).is_ok(), "{addr} should parse");
        }
    }

    #[test]
    fn parse_accepts_lower_and_upper() {
        assert!(parse_address("0x000000000000000000000000000000000000dead").is_ok());
        assert!(parse_address("0x000000000000000000000000000000000000DEAD").is_ok());
    }

    #[test]
    fn parse_rejects_bad_checksum() {
        // Flip the case of one letter in a valid checksummed address.
        let bad = "0x5AAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";
        assert!(matches!(
            parse_address(bad),
            Err(EthError::InvalidAddress(_))
        ));
    }

    #[test]
    fn parse_rejects_malformed() {
        assert!(parse_address("0xdead").is_err());
        assert!(parse_address("dead000000000000000000000000000000000000").is_err());
        assert!(parse_address("0xgggggggggggggggggggggggggggggggggggggggg").is_err());
    }

    #[test]
    fn parse_returns_raw_bytes() {
        let bytes = parse_address("0x000000000000000000000000000000000000dEaD").unwrap();
        assert_eq!(bytes[18], 0xde);
        assert_eq!(bytes[19], 0xad);
    }

    #[test]
    fn format_address_checksums() {
        let bytes = parse_address(CHECKSUMMED[0]).unwrap();
        assert_eq!(format_address(&bytes), CHECKSUMMED[0]);
    }

    #[test]
    fn same_address_ignores_case() {
        assert!(same_address(
            "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed",
            "0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed"
        ));
    }
}
