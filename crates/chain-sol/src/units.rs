//! SPL amount scaling. Mints created here carry at most 9 decimals, so
//! base-unit amounts always fit in a `u64`.

use crate::error::SolError;

pub const MAX_DECIMALS: u8 = 9;

fn check_decimals(decimals: u8) -> Result<(), SolError> {
    if decimals > MAX_DECIMALS {
        return Err(SolError::InvalidAmount(format!(
            "decimals must be between 0 and {MAX_DECIMALS}, got {decimals}"
        )));
    }
    Ok(())
}

/// `"1.5"` with 6 decimals -> `1_500_000`.
pub fn parse_amount(amount: &str, decimals: u8) -> Result<u64, SolError> {
    check_decimals(decimals)?;
    let amount = amount.trim();
    let invalid = || SolError::InvalidAmount(format!("not a number: {amount:?}"));

    let (whole, fraction) = amount.split_once('.').unwrap_or((amount, ""));
    if whole.is_empty() && fraction.is_empty() {
        return Err(invalid());
    }
    if !whole.bytes().all(|b| b.is_ascii_digit()) || !fraction.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(invalid());
    }
    if fraction.len() > decimals as usize {
        return Err(SolError::InvalidAmount(format!(
            "{amount} has more than {decimals} fractional digits"
        )));
    }

    let overflow = || SolError::InvalidAmount(format!("{amount} is out of range"));
    let scale = 10u64.pow(decimals as u32);
    let whole: u64 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| overflow())?
    };
    let fraction_units: u64 = if fraction.is_empty() {
        0
    } else {
        let padded = format!("{fraction:0<width$}", width = decimals as usize);
        padded.parse().map_err(|_| invalid())?
    };

    whole
        .checked_mul(scale)
        .and_then(|w| w.checked_add(fraction_units))
        .ok_or_else(overflow)
}

/// Canonical decimal string for `amount` base units.
pub fn format_amount(amount: u64, decimals: u8) -> Result<String, SolError> {
    check_decimals(decimals)?;
    if decimals == 0 {
        return Ok(amount.to_string());
    }
    let scale = 10u64.pow(decimals as u32);
    let whole = amount / scale;
    let fraction = format!("{:0width$}", amount % scale, width = decimals as usize);
    let fraction = fraction.trim_end_matches('0');
    if fraction.is_empty() {
        Ok(whole.to_string())
    } else {
        Ok(format!("{whole}.{fraction}"))
    }
}
