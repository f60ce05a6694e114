use solana_program::{clock::UnixTimestamp, msg, program_error::ProgramError};

use crate::{
    math::{checked_add, checked_mul, mul_div, SCALE},
    state::{PoolConfig, Position},
};

/// Lazy simple-interest accrual. Interest compounds only at the granularity
/// of state-mutating touches: each roll-forward applies the per-second rate
/// to a debt that already includes earlier interest.
pub struct InterestAccrual;

impl InterestAccrual {
    /// Roll `position.debt` forward to `now`. Returns the interest added.
    ///
    /// An untouched position (timestamp 0) only gets its timestamp set. A clock
    /// reading at or before the stored timestamp adds nothing and never moves
    /// the timestamp backwards.
    pub fn accrue(
        config: &PoolConfig,
        position: &mut Position,
        now: UnixTimestamp,
    ) -> Result<u128, ProgramError> {
        if position.last_accrual_time == 0 {
            // 0 is reserved for untouched positions, so a first touch at the
            // epoch is stored as 1
            position.last_accrual_time = now.max(1);
            return Ok(0);
        }

        if now <= position.last_accrual_time {
            return Ok(0);
        }

        let elapsed = (now - position.last_accrual_time) as u128;
        let interest = Self::interest_for(position.debt, config.rate_per_second, elapsed)?;

        position.debt = checked_add(position.debt, interest)?;
        position.last_accrual_time = now;

        if interest > 0 {
            msg!("Accrued {} interest over {}s, debt now {}", interest, elapsed, position.debt);
        }

        Ok(interest)
    }

    /// Debt as it would read after accruing to `now`, without touching the position
    pub fn accrued_debt(
        config: &PoolConfig,
        position: &Position,
        now: UnixTimestamp,
    ) -> Result<u128, ProgramError> {
        let mut preview = *position;
        Self::accrue(config, &mut preview, now)?;
        Ok(preview.debt)
    }

    /// debt * rate_per_second * elapsed / SCALE
    pub fn interest_for(
        debt: u128,
        rate_per_second: u128,
        elapsed_seconds: u128,
    ) -> Result<u128, ProgramError> {
        if debt == 0 || rate_per_second == 0 || elapsed_seconds == 0 {
            return Ok(0);
        }

        let rate_over_period = checked_mul(rate_per_second, elapsed_seconds)?;
        mul_div(debt, rate_over_period, SCALE)
    }
}
