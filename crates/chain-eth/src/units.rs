//! Decimal <-> base-unit scaling for ERC-20 amounts.

use alloy_primitives::U256;

use crate::error::EthError;

/// ERC-20 tokens created here never exceed 18 decimals.
pub const MAX_DECIMALS: u8 = 18;

fn check_decimals(decimals: u8) -> Result<(), EthError> {
    if decimals > MAX_DECIMALS {
        return Err(EthError::InvalidParams(format!(
            "decimals must be between 0 and {MAX_DECIMALS}, got {decimals}"
        )));
    }
    Ok(())
}

/// Scales a human-readable decimal amount (`"1.5"`) to base units
/// (`1.5 * 10^decimals`).
///
/// Rejects negative values, exponents, more fractional digits than
/// `decimals`, and anything that overflows 256 bits.
pub fn parse_units(amount: &str, decimals: u8) -> Result<U256, EthError> {
    check_decimals(decimals)?;

    let amount = amount.trim();
    if amount.is_empty() {
        return Err(EthError::InvalidAmount("amount is empty".into()));
    }

    let (whole, fraction) = match amount.split_once('.') {
        Some((w, f)) => (w, f),
        None => (amount, ""),
    };

    if whole.is_empty() && fraction.is_empty() {
        return Err(EthError::InvalidAmount(format!("not a number: {amount}")));
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !fraction.chars().all(|c| c.is_ascii_digit())
    {
        return Err(EthError::InvalidAmount(format!("not a number: {amount}")));
    }
    if fraction.len() > decimals as usize {
        return Err(EthError::InvalidAmount(format!(
            "{amount} has more than {decimals} fractional digits"
        )));
    }

    let mut digits = String::with_capacity(whole.len() + decimals as usize);
    digits.push_str(if whole.is_empty() { "0" } else { whole });
    digits.push_str(fraction);
    for _ in fraction.len()..decimals as usize {
        digits.push('0');
    }

    U256::from_str_radix(&digits, 10)
        .map_err(|e| EthError::InvalidAmount(format!("{amount} is out of range: {e}")))
}

/// Formats base units as a canonical decimal string: no trailing fractional
/// zeros and no dangling decimal point.
pub fn format_units(value: U256, decimals: u8) -> Result<String, EthError> {
    check_decimals(decimals)?;

    let digits = value.to_string();
    let decimals = decimals as usize;
    if decimals == 0 {
        return Ok(digits);
    }

    let padded = if digits.len() <= decimals {
        format!("{}{}", "0".repeat(decimals - digits.len() + 1), digits)
    } else {
        digits
    };

    let (whole, fraction) = padded.split_at(padded.len() - decimals);
    let fraction = fraction.trim_end_matches('0');
    if fraction.is_empty() {
        Ok(whole.to_string())
    } else {
        Ok(format!("{whole}.{fraction}"))
    }
}

/// `10^decimals` as a U256.
pub fn unit(decimals: u8) -> Result<U256, EthError> {
    check_decimals(decimals)?;
    Ok(U256::from(10u64).pow(U256::from(decimals)))
}
