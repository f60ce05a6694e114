use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    msg,
    program_error::ProgramError,
    pubkey::Pubkey,
};

use crate::{
    error::LendingError,
    math::{mul_div, PERCENT, SCALE, SECONDS_PER_YEAR},
};

/// Upper bound on the annual rate, in percent
pub const MAX_APR_PERCENT: u64 = 1_000;

/// Liquidation premium in percentage points on the repaid value (5 = +5%).
///
/// Some callers express the bonus as a multiplier on one hundred (105 = +5%).
/// Both encodings normalize to the same premium here and nowhere else.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiquidationBonus(u64);

impl LiquidationBonus {
    pub fn from_premium(premium_percent: u64) -> Result<Self, ProgramError> {
        if premium_percent >= PERCENT as u64 {
            return Err(LendingError::InvalidConfig.into());
        }
        Ok(Self(premium_percent))
    }

    pub fn from_multiplier(multiplier_percent: u64) -> Result<Self, ProgramError> {
        let premium = multiplier_percent
            .checked_sub(PERCENT as u64)
            .ok_or(LendingError::InvalidConfig)?;
        Self::from_premium(premium)
    }

    pub fn premium_percent(&self) -> u64 {
        self.0
    }
}

/// Construction-time parameters for a ledger
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct LedgerParams {
    pub collateral_asset: Pubkey,
    pub borrow_asset: Pubkey,
    pub price_feed: Pubkey,
    /// Annual rate in whole percent
    pub apr_percent: u64,
    /// Required over-collateralization in percent (150 = 150%)
    pub collateralization_ratio: u64,
    /// Health factor floor in percent below which liquidation is allowed
    pub liquidation_threshold: u64,
    pub liquidation_bonus: LiquidationBonus,
}

impl LedgerParams {
    /// 5% APR, 150% collateralization, liquidatable below 120%, 5% bonus
    pub fn default_for(collateral_asset: Pubkey, borrow_asset: Pubkey, price_feed: Pubkey) -> Self {
        Self {
            collateral_asset,
            borrow_asset,
            price_feed,
            apr_percent: 5,
            collateralization_ratio: 150,
            liquidation_threshold: 120,
            liquidation_bonus: LiquidationBonus(5),
        }
    }
}

/// Immutable pool configuration derived from `LedgerParams`
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// Collateral asset identity (mint)
    pub collateral_asset: Pubkey,

    /// Borrow asset identity (mint)
    pub borrow_asset: Pubkey,

    /// Price feed identity
    pub price_feed: Pubkey,

    /// Annual rate the per-second rate was derived from
    pub apr_percent: u64,

    /// Per-second simple rate, 18 decimals
    pub rate_per_second: u128,

    /// Percent
    pub collateralization_ratio: u64,

    /// Percent
    pub liquidation_threshold: u64,

    /// Percentage points
    pub liquidation_bonus: u64,
}

impl PoolConfig {
    pub const LEN: usize = 32 + // collateral_asset
        32 + // borrow_asset
        32 + // price_feed
        8 + // apr_percent
        16 + // rate_per_second
        8 + // collateralization_ratio
        8 + // liquidation_threshold
        8; // liquidation_bonus

    pub fn new(params: LedgerParams) -> Result<Self, ProgramError> {
        Self::validate_params(&params)?;

        // rate = apr * SCALE / (seconds_per_year * 100)
        let rate_per_second = mul_div(
            params.apr_percent as u128,
            SCALE,
            SECONDS_PER_YEAR * PERCENT,
        )?;

        Ok(Self {
            collateral_asset: params.collateral_asset,
            borrow_asset: params.borrow_asset,
            price_feed: params.price_feed,
            apr_percent: params.apr_percent,
            rate_per_second,
            collateralization_ratio: params.collateralization_ratio,
            liquidation_threshold: params.liquidation_threshold,
            liquidation_bonus: params.liquidation_bonus.premium_percent(),
        })
    }

    fn validate_params(params: &LedgerParams) -> Result<(), ProgramError> {
        if params.apr_percent > MAX_APR_PERCENT {
            msg!("APR {}% above maximum {}%", params.apr_percent, MAX_APR_PERCENT);
            return Err(LendingError::InvalidConfig.into());
        }

        if params.collateralization_ratio < PERCENT as u64 {
            msg!("Collateralization ratio {}% below 100%", params.collateralization_ratio);
            return Err(LendingError::InvalidConfig.into());
        }

        // A threshold above the ratio would make fresh borrows liquidatable
        if params.liquidation_threshold == 0
            || params.liquidation_threshold > params.collateralization_ratio
        {
            msg!(
                "Liquidation threshold {}% outside (0, {}%]",
                params.liquidation_threshold,
                params.collateralization_ratio
            );
            return Err(LendingError::InvalidConfig.into());
        }

        if params.liquidation_bonus.premium_percent() >= PERCENT as u64 {
            return Err(LendingError::InvalidConfig.into());
        }

        Ok(())
    }
}

/// Ledger account holding the configuration and custody wiring
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone)]
pub struct LedgerState {
    /// Account discriminator
    pub discriminator: [u8; 8],

    /// Is initialized flag
    pub is_initialized: bool,

    /// Authority that created the ledger
    pub authority: Pubkey,

    /// Pool configuration
    pub config: PoolConfig,

    /// Token account holding deposited collateral
    pub collateral_custody: Pubkey,

    /// Token account holding lendable borrow asset
    pub borrow_custody: Pubkey,

    /// Bump of the custody authority PDA `[b"custody", ledger]`
    pub custody_bump: u8,

    /// Creation timestamp
    pub created_at: i64,
}

impl LedgerState {
    pub const DISCRIMINATOR: [u8; 8] = [76, 69, 78, 68, 95, 76, 68, 71]; // "LEND_LDG"

    pub const CUSTODY_SEED: &'static [u8] = b"custody";

    pub const LEN: usize = 8 + // discriminator
        1 + // is_initialized
        32 + // authority
        PoolConfig::LEN +
        32 + // collateral_custody
        32 + // borrow_custody
        1 + // custody_bump
        8 + // created_at
        64; // padding for growth

    pub fn new(
        authority: Pubkey,
        config: PoolConfig,
        collateral_custody: Pubkey,
        borrow_custody: Pubkey,
        custody_bump: u8,
        created_at: i64,
    ) -> Self {
        Self {
            discriminator: Self::DISCRIMINATOR,
            is_initialized: true,
            authority,
            config,
            collateral_custody,
            borrow_custody,
            custody_bump,
            created_at,
        }
    }

    pub fn find_custody_authority(program_id: &Pubkey, ledger: &Pubkey) -> (Pubkey, u8) {
        Pubkey::find_program_address(&[Self::CUSTODY_SEED, ledger.as_ref()], program_id)
    }

    pub fn validate(&self) -> Result<(), ProgramError> {
        if self.discriminator != Self::DISCRIMINATOR {
            return Err(ProgramError::InvalidAccountData);
        }

        if !self.is_initialized {
            return Err(ProgramError::UninitializedAccount);
        }

        Ok(())
    }
}
