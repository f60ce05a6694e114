use solana_program::{
    clock::UnixTimestamp,
    msg,
    program_error::ProgramError,
    pubkey::Pubkey,
};

use crate::{
    error::LendingError,
    events::{BorrowCompleted, DepositCompleted, Event, RepayCompleted, WithdrawCompleted},
    interface::{read_price, AssetLedger, PriceFeed},
    math::{checked_add, checked_mul, mul_div, PERCENT, SCALE},
    state::{PoolConfig, Position},
};

use super::InterestAccrual;

/// Deposit, withdraw, borrow and repay against a single position.
///
/// Every operation accrues interest on a working copy, validates against the
/// post-accrual figures, runs the transfer, and only then writes the copy
/// back. A failure at any step leaves `position` untouched.
pub struct CollateralManager;

impl CollateralManager {
    pub fn deposit<C: AssetLedger + ?Sized>(
        config: &PoolConfig,
        position: &mut Position,
        user: &Pubkey,
        amount: u128,
        now: UnixTimestamp,
        collateral_asset: &mut C,
    ) -> Result<DepositCompleted, ProgramError> {
        if amount == 0 {
            return Err(LendingError::InvalidInput.into());
        }

        let mut next = *position;
        InterestAccrual::accrue(config, &mut next, now)?;

        next.collateral = checked_add(next.collateral, amount)?;

        collateral_asset.move_in(user, amount)?;
        *position = next;

        msg!("Deposited {} collateral for {}", amount, user);
        let event = DepositCompleted { user: *user, amount };
        event.emit();
        Ok(event)
    }

    pub fn withdraw<C: AssetLedger + ?Sized, P: PriceFeed + ?Sized>(
        config: &PoolConfig,
        position: &mut Position,
        user: &Pubkey,
        amount: u128,
        now: UnixTimestamp,
        collateral_asset: &mut C,
        price_feed: &P,
    ) -> Result<WithdrawCompleted, ProgramError> {
        if amount == 0 {
            return Err(LendingError::InvalidInput.into());
        }

        let mut next = *position;
        InterestAccrual::accrue(config, &mut next, now)?;

        if amount > next.collateral {
            msg!("Withdraw {} exceeds collateral {}", amount, next.collateral);
            return Err(LendingError::InsufficientBalance.into());
        }

        let remaining = next.collateral - amount;
        let price = read_price(price_feed)?;
        let capacity = Self::max_borrowable(config, remaining, price)?;

        if next.debt > capacity {
            msg!(
                "Withdraw rejected: debt {} above remaining capacity {}",
                next.debt,
                capacity
            );
            return Err(LendingError::CreditLimitExceeded.into());
        }

        next.collateral = remaining;

        collateral_asset.move_out(user, amount)?;
        *position = next;

        msg!("Withdrew {} collateral for {}", amount, user);
        let event = WithdrawCompleted { user: *user, amount };
        event.emit();
        Ok(event)
    }

    pub fn borrow<B: AssetLedger + ?Sized, P: PriceFeed + ?Sized>(
        config: &PoolConfig,
        position: &mut Position,
        user: &Pubkey,
        amount: u128,
        now: UnixTimestamp,
        borrow_asset: &mut B,
        price_feed: &P,
    ) -> Result<BorrowCompleted, ProgramError> {
        if amount == 0 {
            return Err(LendingError::InvalidInput.into());
        }

        let mut next = *position;
        InterestAccrual::accrue(config, &mut next, now)?;

        let price = read_price(price_feed)?;
        let capacity = Self::max_borrowable(config, next.collateral, price)?;
        let new_debt = checked_add(next.debt, amount)?;

        if new_debt > capacity {
            msg!("Borrow rejected: debt would be {}, capacity {}", new_debt, capacity);
            return Err(LendingError::CreditLimitExceeded.into());
        }

        next.debt = new_debt;

        borrow_asset.move_out(user, amount)?;
        *position = next;

        msg!("Borrowed {} for {}, debt now {}", amount, user, new_debt);
        let event = BorrowCompleted { user: *user, amount };
        event.emit();
        Ok(event)
    }

    /// Overpayment is clamped to the outstanding debt; only the clamped
    /// amount is pulled from the user.
    pub fn repay<B: AssetLedger + ?Sized>(
        config: &PoolConfig,
        position: &mut Position,
        user: &Pubkey,
        amount: u128,
        now: UnixTimestamp,
        borrow_asset: &mut B,
    ) -> Result<RepayCompleted, ProgramError> {
        if amount == 0 {
            return Err(LendingError::InvalidInput.into());
        }

        let mut next = *position;
        InterestAccrual::accrue(config, &mut next, now)?;

        let actual = amount.min(next.debt);
        next.debt -= actual;

        if actual > 0 {
            borrow_asset.move_in(user, actual)?;
        }
        *position = next;

        msg!("Repaid {} of {} offered for {}, debt now {}", actual, amount, user, next.debt);
        let event = RepayCompleted { user: *user, amount: actual };
        event.emit();
        Ok(event)
    }

    /// collateral * price / SCALE
    pub fn collateral_value(collateral: u128, price: u128) -> Result<u128, ProgramError> {
        mul_div(collateral, price, SCALE)
    }

    /// collateral_value * 100 / collateralization_ratio
    pub fn max_borrowable(
        config: &PoolConfig,
        collateral: u128,
        price: u128,
    ) -> Result<u128, ProgramError> {
        let value = Self::collateral_value(collateral, price)?;
        mul_div(value, PERCENT, config.collateralization_ratio as u128)
    }

    /// debt * collateralization_ratio <= collateral_value * 100
    pub fn within_loan_to_value(
        config: &PoolConfig,
        position: &Position,
        price: u128,
    ) -> Result<bool, ProgramError> {
        let required = checked_mul(position.debt, config.collateralization_ratio as u128)?;
        let backing = checked_mul(Self::collateral_value(position.collateral, price)?, PERCENT)?;
        Ok(required <= backing)
    }

    /// How much more the position could borrow at `price`
    pub fn available_to_borrow(
        config: &PoolConfig,
        position: &Position,
        price: u128,
    ) -> Result<u128, ProgramError> {
        let capacity = Self::max_borrowable(config, position.collateral, price)?;
        Ok(capacity.saturating_sub(position.debt))
    }
}
