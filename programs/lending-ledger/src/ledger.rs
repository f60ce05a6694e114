//! In-memory lending ledger
//!
//! Owns the position store and both custody assets. Every mutating call takes
//! `&mut self`, so one operation runs to completion before the next is seen.

use solana_program::{clock::Clock, program_error::ProgramError, pubkey::Pubkey};

use crate::{
    engine::{CollateralManager, InterestAccrual, LiquidationEngine},
    events::{BorrowCompleted, DepositCompleted, LiquidationCompleted, RepayCompleted, WithdrawCompleted},
    interface::{read_price, AssetLedger, PriceFeed},
    state::{LedgerParams, PoolConfig, Position, PositionStore},
};

pub struct LendingLedger<C: AssetLedger, B: AssetLedger, P: PriceFeed> {
    config: PoolConfig,
    positions: PositionStore,
    collateral_asset: C,
    borrow_asset: B,
    price_feed: P,
}

impl<C: AssetLedger, B: AssetLedger, P: PriceFeed> LendingLedger<C, B, P> {
    pub fn new(
        params: LedgerParams,
        collateral_asset: C,
        borrow_asset: B,
        price_feed: P,
    ) -> Result<Self, ProgramError> {
        Ok(Self {
            config: PoolConfig::new(params)?,
            positions: PositionStore::new(),
            collateral_asset,
            borrow_asset,
            price_feed,
        })
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Stored position, without interest since the last touch
    pub fn position(&self, user: &Pubkey) -> Position {
        self.positions.get(user)
    }

    pub fn positions(&self) -> &PositionStore {
        &self.positions
    }

    pub fn collateral_asset(&self) -> &C {
        &self.collateral_asset
    }

    pub fn collateral_asset_mut(&mut self) -> &mut C {
        &mut self.collateral_asset
    }

    pub fn borrow_asset(&self) -> &B {
        &self.borrow_asset
    }

    pub fn borrow_asset_mut(&mut self) -> &mut B {
        &mut self.borrow_asset
    }

    pub fn price_feed(&self) -> &P {
        &self.price_feed
    }

    pub fn price_feed_mut(&mut self) -> &mut P {
        &mut self.price_feed
    }

    pub fn deposit(
        &mut self,
        user: &Pubkey,
        amount: u128,
        clock: &Clock,
    ) -> Result<DepositCompleted, ProgramError> {
        let mut position = self.positions.get(user);
        let event = CollateralManager::deposit(
            &self.config,
            &mut position,
            user,
            amount,
            clock.unix_timestamp,
            &mut self.collateral_asset,
        )?;
        self.positions.commit(*user, position);
        Ok(event)
    }

    pub fn withdraw(
        &mut self,
        user: &Pubkey,
        amount: u128,
        clock: &Clock,
    ) -> Result<WithdrawCompleted, ProgramError> {
        let mut position = self.positions.get(user);
        let event = CollateralManager::withdraw(
            &self.config,
            &mut position,
            user,
            amount,
            clock.unix_timestamp,
            &mut self.collateral_asset,
            &self.price_feed,
        )?;
        self.positions.commit(*user, position);
        Ok(event)
    }

    pub fn borrow(
        &mut self,
        user: &Pubkey,
        amount: u128,
        clock: &Clock,
    ) -> Result<BorrowCompleted, ProgramError> {
        let mut position = self.positions.get(user);
        let event = CollateralManager::borrow(
            &self.config,
            &mut position,
            user,
            amount,
            clock.unix_timestamp,
            &mut self.borrow_asset,
            &self.price_feed,
        )?;
        self.positions.commit(*user, position);
        Ok(event)
    }

    pub fn repay(
        &mut self,
        user: &Pubkey,
        amount: u128,
        clock: &Clock,
    ) -> Result<RepayCompleted, ProgramError> {
        let mut position = self.positions.get(user);
        let event = CollateralManager::repay(
            &self.config,
            &mut position,
            user,
            amount,
            clock.unix_timestamp,
            &mut self.borrow_asset,
        )?;
        self.positions.commit(*user, position);
        Ok(event)
    }

    /// Any caller may liquidate any position whose health factor is below threshold
    pub fn liquidate(
        &mut self,
        target: &Pubkey,
        repay_amount: u128,
        caller: &Pubkey,
        clock: &Clock,
    ) -> Result<LiquidationCompleted, ProgramError> {
        let mut position = self.positions.get(target);
        let event = LiquidationEngine::liquidate(
            &self.config,
            &mut position,
            target,
            caller,
            repay_amount,
            clock.unix_timestamp,
            &mut self.collateral_asset,
            &mut self.borrow_asset,
            &self.price_feed,
        )?;
        self.positions.commit(*target, position);
        Ok(event)
    }

    /// What `user` owes right now, interest included
    pub fn current_debt(&self, user: &Pubkey, clock: &Clock) -> Result<u128, ProgramError> {
        InterestAccrual::accrued_debt(&self.config, &self.positions.get(user), clock.unix_timestamp)
    }

    /// Health factor against the accrued debt, `None` without debt
    pub fn health_factor(&self, user: &Pubkey, clock: &Clock) -> Result<Option<u128>, ProgramError> {
        let mut position = self.positions.get(user);
        InterestAccrual::accrue(&self.config, &mut position, clock.unix_timestamp)?;
        let price = read_price(&self.price_feed)?;
        LiquidationEngine::health_factor(&position, price)
    }

    /// Borrow capacity of the user's current collateral
    pub fn max_borrowable(&self, user: &Pubkey) -> Result<u128, ProgramError> {
        let price = read_price(&self.price_feed)?;
        CollateralManager::max_borrowable(&self.config, self.positions.get(user).collateral, price)
    }

    /// Loan-to-value invariant for the stored position at the current price
    pub fn is_within_loan_to_value(&self, user: &Pubkey) -> Result<bool, ProgramError> {
        let price = read_price(&self.price_feed)?;
        CollateralManager::within_loan_to_value(&self.config, &self.positions.get(user), price)
    }
}
