use borsh::BorshDeserialize;
use solana_program::{
    account_info::AccountInfo,
    msg,
    program_error::ProgramError,
    pubkey::Pubkey,
};

use crate::{error::LendingError, state::PriceFeedAccount};

/// Source of the collateral price in borrow-asset terms (18 decimals)
pub trait PriceFeed {
    fn current_price(&self) -> Result<u128, ProgramError>;
}

/// Read the price and reject values no valuation can use
pub fn read_price<P: PriceFeed + ?Sized>(feed: &P) -> Result<u128, ProgramError> {
    let price = feed.current_price()?;
    if price == 0 {
        msg!("Price feed returned zero");
        return Err(LendingError::InvalidPrice.into());
    }
    Ok(price)
}

/// Settable price, for off-chain ledgers and tests
#[derive(Debug, Clone)]
pub struct FixedPriceFeed {
    price: u128,
    halted: bool,
}

impl FixedPriceFeed {
    pub fn new(price: u128) -> Self {
        Self { price, halted: false }
    }

    pub fn set_price(&mut self, price: u128) {
        self.price = price;
    }

    /// While halted every read fails
    pub fn set_halted(&mut self, halted: bool) {
        self.halted = halted;
    }
}

impl PriceFeed for FixedPriceFeed {
    fn current_price(&self) -> Result<u128, ProgramError> {
        if self.halted {
            return Err(LendingError::CollaboratorFailure.into());
        }
        Ok(self.price)
    }
}

/// Price read from a `PriceFeedAccount` owned by this program
pub struct AccountPriceFeed<'a, 'info> {
    program_id: &'a Pubkey,
    account: &'a AccountInfo<'info>,
}

impl<'a, 'info> AccountPriceFeed<'a, 'info> {
    pub fn new(program_id: &'a Pubkey, account: &'a AccountInfo<'info>) -> Self {
        Self { program_id, account }
    }
}

impl PriceFeed for AccountPriceFeed<'_, '_> {
    fn current_price(&self) -> Result<u128, ProgramError> {
        if self.account.owner != self.program_id {
            return Err(ProgramError::IncorrectProgramId);
        }

        let feed = PriceFeedAccount::deserialize(&mut &self.account.data.borrow()[..])
            .map_err(|_| LendingError::CollaboratorFailure)?;
        feed.validate()?;

        Ok(feed.price)
    }
}
