// src/units.rs
use rust_decimal::Decimal;

use crate::error::{ExplorerError, Result};

/// Decimals of the native coin (1 ETH = 10^18 wei).
pub const NATIVE_DECIMALS: u32 = 18;

// Largest digit count that always fits the 96-bit Decimal mantissa.
const MAX_DIGITS: usize = 28;

/// Convert a raw on-chain integer (wei, token base units) into a human amount:
/// `raw / 10^decimals`.
///
/// Values wider than a `Decimal` mantissa keep their 28 most significant digits.
pub fn to_decimal(raw: &str, decimals: u32) -> Result<Decimal> {
    let raw = raw.trim();
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ExplorerError::malformed(format!("not an unsigned integer: {raw:?}")));
    }

    let digits = raw.trim_start_matches('0');
    if digits.is_empty() {
        return Ok(Decimal::ZERO);
    }

    let keep = digits.len().min(MAX_DIGITS);
    let dropped = (digits.len() - keep) as u32;
    let mut mantissa: i128 = digits[..keep]
        .parse()
        .map_err(|_| ExplorerError::malformed(format!("not an unsigned integer: {raw:?}")))?;

    // value = mantissa * 10^(dropped - decimals)
    if dropped >= decimals {
        let whole = Decimal::try_from_i128_with_scale(mantissa, 0)
            .map_err(|e| ExplorerError::malformed(format!("{raw}: {e}")))?;
        return pow10(dropped - decimals)
            .and_then(|p| whole.checked_mul(p))
            .ok_or_else(|| ExplorerError::malformed(format!("amount overflows: {raw}")));
    }

    let mut scale = decimals - dropped;
    if scale > MAX_DIGITS as u32 {
        let excess = scale - MAX_DIGITS as u32;
        mantissa = mantissa.checked_div(10i128.pow(excess.min(38))).unwrap_or(0);
        scale = MAX_DIGITS as u32;
    }

    Decimal::try_from_i128_with_scale(mantissa, scale)
        .map(|d| d.normalize())
        .map_err(|e| ExplorerError::malformed(format!("{raw}: {e}")))
}

/// Native-currency fee paid for a transaction: `gasPrice * gasUsed / 10^18`.
///
/// Token transfers pay gas in the native coin too, so this never uses token decimals.
pub fn fee(gas_price: &str, gas_used: &str) -> Result<Decimal> {
    let price: u128 = gas_price
        .trim()
        .parse()
        .map_err(|_| ExplorerError::malformed(format!("gasPrice {gas_price:?}")))?;
    let used: u128 = gas_used
        .trim()
        .parse()
        .map_err(|_| ExplorerError::malformed(format!("gasUsed {gas_used:?}")))?;
    let wei = price
        .checked_mul(used)
        .ok_or_else(|| ExplorerError::malformed("fee overflows u128"))?;
    to_decimal(&wei.to_string(), NATIVE_DECIMALS)
}

fn pow10(exp: u32) -> Option<Decimal> {
    let mut acc = Decimal::ONE;
    for _ in 0..exp {
        acc = acc.checked_mul(Decimal::TEN)?;
    }
    Some(acc)
}
