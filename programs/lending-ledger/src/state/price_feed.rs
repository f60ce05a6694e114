use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    program_error::ProgramError,
    pubkey::Pubkey,
};

/// Price pushed by an external oracle keeper.
/// Borrow-asset value per collateral unit, 18 decimals.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone)]
pub struct PriceFeedAccount {
    /// Account discriminator
    pub discriminator: [u8; 8],

    /// Is initialized
    pub is_initialized: bool,

    /// Keeper allowed to push prices
    pub authority: Pubkey,

    /// Latest price (18 decimals)
    pub price: u128,

    /// Timestamp of the latest push
    pub last_update: i64,
}

impl PriceFeedAccount {
    pub const DISCRIMINATOR: [u8; 8] = [80, 82, 73, 67, 69, 70, 68, 95]; // "PRICEFD_"

    pub const LEN: usize = 8 + // discriminator
        1 + // is_initialized
        32 + // authority
        16 + // price
        8 + // last_update
        32; // padding

    pub fn new(authority: Pubkey, price: u128, last_update: i64) -> Self {
        Self {
            discriminator: Self::DISCRIMINATOR,
            is_initialized: true,
            authority,
            price,
            last_update,
        }
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
