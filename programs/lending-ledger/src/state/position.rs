use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    clock::UnixTimestamp,
    program_error::ProgramError,
    pubkey::Pubkey,
};

/// A borrower's collateral and debt
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Position {
    /// Collateral asset held on behalf of the owner (raw units)
    pub collateral: u128,

    /// Principal plus all interest accrued through `last_accrual_time` (raw units)
    pub debt: u128,

    /// Last instant debt was rolled forward, 0 = never touched
    pub last_accrual_time: UnixTimestamp,
}

impl Position {
    pub const LEN: usize = 16 + // collateral
        16 + // debt
        8; // last_accrual_time

    pub fn has_debt(&self) -> bool {
        self.debt > 0
    }

    pub fn is_empty(&self) -> bool {
        self.collateral == 0 && self.debt == 0
    }
}

/// On-chain home of a single `Position`, a PDA at `[b"position", ledger, owner]`
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone)]
pub struct PositionAccount {
    /// Account discriminator
    pub discriminator: [u8; 8],

    /// Is initialized
    pub is_initialized: bool,

    /// Ledger this position belongs to
    pub ledger: Pubkey,

    /// Position owner
    pub owner: Pubkey,

    /// PDA bump
    pub bump: u8,

    /// Balances
    pub position: Position,
}

impl PositionAccount {
    pub const DISCRIMINATOR: [u8; 8] = [80, 79, 83, 73, 84, 73, 79, 78]; // "POSITION"

    pub const SEED: &'static [u8] = b"position";

    pub const LEN: usize = 8 + // discriminator
        1 + // is_initialized
        32 + // ledger
        32 + // owner
        1 + // bump
        Position::LEN +
        32; // padding

    pub fn new(ledger: Pubkey, owner: Pubkey, bump: u8) -> Self {
        Self {
            discriminator: Self::DISCRIMINATOR,
            is_initialized: true,
            ledger,
            owner,
            bump,
            position: Position::default(),
        }
    }

    pub fn find_address(program_id: &Pubkey, ledger: &Pubkey, owner: &Pubkey) -> (Pubkey, u8) {
        Pubkey::find_program_address(
            &[Self::SEED, ledger.as_ref(), owner.as_ref()],
            program_id,
        )
    }

    pub fn validate(&self, ledger: &Pubkey, owner: &Pubkey) -> Result<(), ProgramError> {
        if self.discriminator != Self::DISCRIMINATOR {
            return Err(ProgramError::InvalidAccountData);
        }

        if !self.is_initialized {
            return Err(ProgramError::UninitializedAccount);
        }

        if self.ledger != *ledger || self.owner != *owner {
            return Err(crate::error::LendingError::InvalidAccount.into());
        }

        Ok(())
    }
}
