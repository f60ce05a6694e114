use num_derive::FromPrimitive;
use solana_program::{
    decode_error::DecodeError,
    program_error::{PrintProgramError, ProgramError},
};
use thiserror::Error;

#[derive(Error, Debug, Copy, Clone, FromPrimitive, PartialEq, Eq)]
pub enum LendingError {
    #[error("Amount must be greater than zero")]
    InvalidInput = 0,

    #[error("Insufficient collateral balance")]
    InsufficientBalance = 1,

    #[error("Operation would exceed the loan-to-value capacity")]
    CreditLimitExceeded = 2,

    #[error("Position is healthy and cannot be liquidated")]
    PositionHealthy = 3,

    #[error("Position has no debt")]
    NoDebt = 4,

    #[error("Not enough collateral to cover the liquidation bonus")]
    SeizureShortfall = 5,

    #[error("External asset ledger or price feed failed")]
    CollaboratorFailure = 6,

    #[error("Price feed returned an unusable price")]
    InvalidPrice = 7,

    #[error("Arithmetic overflow")]
    ArithmeticOverflow = 8,

    #[error("Invalid ledger configuration")]
    InvalidConfig = 9,

    #[error("Invalid instruction")]
    InvalidInstruction = 10,

    #[error("Account not initialized")]
    AccountNotInitialized = 11,

    #[error("Account already initialized")]
    AccountAlreadyInitialized = 12,

    #[error("Invalid authority")]
    InvalidAuthority = 13,

    #[error("Account does not belong to this ledger")]
    InvalidAccount = 14,
}

impl PrintProgramError for LendingError {
    fn print<E>(&self) {
        use solana_program::msg;
        msg!("LendingError: {}", self);
    }
}

impl From<LendingError> for ProgramError {
    fn from(e: LendingError) -> Self {
        ProgramError::Custom(e as u32)
    }
}

impl<T> DecodeError<T> for LendingError {
    fn type_of() -> &'static str {
        "LendingError"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_traits::FromPrimitive;

    #[test]
    fn test_error_codes_round_trip() {
        let err: ProgramError = LendingError::SeizureShortfall.into();
        assert_eq!(err, ProgramError::Custom(5));

        let decoded = LendingError::from_u32(5).unwrap();
        assert_eq!(decoded, LendingError::SeizureShortfall);
        assert!(LendingError::from_u32(99).is_none());
    }
}
