use solana_program::{
    clock::UnixTimestamp,
    msg,
    program_error::ProgramError,
    pubkey::Pubkey,
};

use crate::{
    error::LendingError,
    events::{Event, LiquidationCompleted},
    interface::{read_price, AssetLedger, PriceFeed},
    math::{checked_add, mul_div, PERCENT, SCALE},
    state::{PoolConfig, Position},
};

use super::{CollateralManager, InterestAccrual};

/// Amounts a liquidation would move
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiquidationPlan {
    pub health_factor: u128,
    pub actual_repay: u128,
    pub collateral_to_seize: u128,
}

/// Permissionless, partial-capable liquidation of unhealthy positions
pub struct LiquidationEngine;

impl LiquidationEngine {
    /// collateral_value * 100 / debt, `None` without debt
    pub fn health_factor(position: &Position, price: u128) -> Result<Option<u128>, ProgramError> {
        if position.debt == 0 {
            return Ok(None);
        }

        let value = CollateralManager::collateral_value(position.collateral, price)?;
        Ok(Some(mul_div(value, PERCENT, position.debt)?))
    }

    /// Validate a liquidation against an already-accrued position
    pub fn plan(
        config: &PoolConfig,
        position: &Position,
        repay_amount: u128,
        price: u128,
    ) -> Result<LiquidationPlan, ProgramError> {
        let health_factor = match Self::health_factor(position, price)? {
            Some(health_factor) => health_factor,
            None => return Err(LendingError::NoDebt.into()),
        };

        if health_factor >= config.liquidation_threshold as u128 {
            msg!(
                "Health factor {} not below threshold {}",
                health_factor,
                config.liquidation_threshold
            );
            return Err(LendingError::PositionHealthy.into());
        }

        let actual_repay = repay_amount.min(position.debt);

        // seize_value = repay * (100 + bonus) / 100, then priced in collateral
        let bonus_multiplier = checked_add(PERCENT, config.liquidation_bonus as u128)?;
        let seize_value = mul_div(actual_repay, bonus_multiplier, PERCENT)?;
        let collateral_to_seize = mul_div(seize_value, SCALE, price)?;

        if collateral_to_seize > position.collateral {
            msg!(
                "Seizure of {} exceeds collateral {}",
                collateral_to_seize,
                position.collateral
            );
            return Err(LendingError::SeizureShortfall.into());
        }

        Ok(LiquidationPlan {
            health_factor,
            actual_repay,
            collateral_to_seize,
        })
    }

    /// Repay up to `repay_amount` of `target`'s debt on behalf of `caller`,
    /// who receives the bonus-weighted collateral.
    #[allow(clippy::too_many_arguments)]
    pub fn liquidate<C, B, P>(
        config: &PoolConfig,
        position: &mut Position,
        target: &Pubkey,
        caller: &Pubkey,
        repay_amount: u128,
        now: UnixTimestamp,
        collateral_asset: &mut C,
        borrow_asset: &mut B,
        price_feed: &P,
    ) -> Result<LiquidationCompleted, ProgramError>
    where
        C: AssetLedger + ?Sized,
        B: AssetLedger + ?Sized,
        P: PriceFeed + ?Sized,
    {
        if repay_amount == 0 {
            return Err(LendingError::InvalidInput.into());
        }

        let mut next = *position;
        InterestAccrual::accrue(config, &mut next, now)?;

        if next.debt == 0 {
            return Err(LendingError::NoDebt.into());
        }

        let price = read_price(price_feed)?;
        let plan = Self::plan(config, &next, repay_amount, price)?;

        next.debt -= plan.actual_repay;
        next.collateral -= plan.collateral_to_seize;

        borrow_asset.move_in(caller, plan.actual_repay)?;
        if let Err(err) = collateral_asset.move_out(caller, plan.collateral_to_seize) {
            // Hand the repayment back before surfacing the failure
            if let Err(refund_err) = borrow_asset.move_out(caller, plan.actual_repay) {
                msg!("Refund of {} to {} failed: {:?}", plan.actual_repay, caller, refund_err);
            }
            return Err(err);
        }
        *position = next;

        msg!(
            "Liquidated {} at health {}: repaid {}, seized {}",
            target,
            plan.health_factor,
            plan.actual_repay,
            plan.collateral_to_seize
        );

        let event = LiquidationCompleted {
            target: *target,
            liquidator: *caller,
            amount_repaid: plan.actual_repay,
            collateral_seized: plan.collateral_to_seize,
        };
        event.emit();
        Ok(event)
    }
}
