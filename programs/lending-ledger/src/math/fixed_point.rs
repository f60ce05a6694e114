use solana_program::program_error::ProgramError;
use crate::error::LendingError;

/// Fixed point scale used for prices and the per-second rate (18 decimals)
pub const SCALE: u128 = 1_000_000_000_000_000_000;

/// Seconds in a 365 day year, used to derive the per-second rate
pub const SECONDS_PER_YEAR: u128 = 365 * 24 * 60 * 60;

/// Percent denominator for ratios, thresholds and the liquidation bonus
pub const PERCENT: u128 = 100;

const LOW_MASK: u128 = u64::MAX as u128;

pub struct Wad;

impl Wad {
    pub const ONE: u128 = SCALE;

    /// Whole units to an 18 decimal amount
    pub fn from_units(units: u128) -> Result<u128, ProgramError> {
        checked_mul(units, SCALE)
    }
}

pub fn checked_add(a: u128, b: u128) -> Result<u128, ProgramError> {
    a.checked_add(b).ok_or_else(|| LendingError::ArithmeticOverflow.into())
}

pub fn checked_sub(a: u128, b: u128) -> Result<u128, ProgramError> {
    a.checked_sub(b).ok_or_else(|| LendingError::ArithmeticOverflow.into())
}

pub fn checked_mul(a: u128, b: u128) -> Result<u128, ProgramError> {
    a.checked_mul(b).ok_or_else(|| LendingError::ArithmeticOverflow.into())
}

/// Computes `a * b / divisor` rounding down, with a 256-bit intermediate product.
///
/// Amounts carry 18 decimals and so do prices, so `amount * price` alone
/// routinely exceeds `u128::MAX` before the division brings it back down.
pub fn mul_div(a: u128, b: u128, divisor: u128) -> Result<u128, ProgramError> {
    if divisor == 0 {
        return Err(LendingError::ArithmeticOverflow.into());
    }

    let (hi, lo) = wide_mul(a, b);
    if hi == 0 {
        return Ok(lo / divisor);
    }

    // Quotient has to fit in 128 bits
    if hi >= divisor {
        return Err(LendingError::ArithmeticOverflow.into());
    }

    // Shift-subtract long division of (hi, lo) by divisor
    let mut remainder = hi;
    let mut quotient: u128 = 0;
    for bit in (0..128).rev() {
        let carry = remainder >> 127;
        remainder = (remainder << 1) | ((lo >> bit) & 1);
        quotient <<= 1;
        if carry == 1 || remainder >= divisor {
            remainder = remainder.wrapping_sub(divisor);
            quotient |= 1;
        }
    }

    Ok(quotient)
}

/// Full 256-bit product of two u128 values as (high, low) halves
fn wide_mul(a: u128, b: u128) -> (u128, u128) {
    let (a_hi, a_lo) = (a >> 64, a & LOW_MASK);
    let (b_hi, b_lo) = (b >> 64, b & LOW_MASK);

    let ll = a_lo * b_lo;
    let lh = a_lo * b_hi;
    let hl = a_hi * b_lo;
    let hh = a_hi * b_hi;

    // At most 3 * (2^64 - 1), no overflow
    let mid = (ll >> 64) + (lh & LOW_MASK) + (hl & LOW_MASK);

    let lo = (ll & LOW_MASK) | (mid << 64);
    let hi = hh + (lh >> 64) + (hl >> 64) + (mid >> 64);

    (hi, lo)
}
