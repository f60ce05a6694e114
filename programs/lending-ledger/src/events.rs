//! Event logging for native Solana
//!
//! One event per state-mutating ledger operation

use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{msg, pubkey::Pubkey};

/// Event type discriminator
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    DepositCompleted = 1,
    WithdrawCompleted = 2,
    BorrowCompleted = 3,
    RepayCompleted = 4,
    LiquidationCompleted = 5,
}

/// Base event trait
pub trait Event: BorshSerialize {
    fn event_type() -> EventType;

    fn emit(&self) {
        msg!("LENDING_LEDGER_EVENT");
        msg!("TYPE:{:?}", Self::event_type());

        // Serialize and log event data
        if let Ok(data) = self.try_to_vec() {
            msg!("DATA:{}", bs58::encode(&data).into_string());
        }
    }
}

macro_rules! define_event {
    ($name:ident, $event_type:expr, { $($field:ident: $type:ty),* $(,)? }) => {
        #[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
        pub struct $name {
            $(pub $field: $type,)*
        }

        impl Event for $name {
            fn event_type() -> EventType {
                $event_type
            }
        }
    };
}

define_event!(DepositCompleted, EventType::DepositCompleted, {
    user: Pubkey,
    amount: u128,
});

define_event!(WithdrawCompleted, EventType::WithdrawCompleted, {
    user: Pubkey,
    amount: u128,
});

define_event!(BorrowCompleted, EventType::BorrowCompleted, {
    user: Pubkey,
    amount: u128,
});

define_event!(RepayCompleted, EventType::RepayCompleted, {
    user: Pubkey,
    amount: u128,
});

define_event!(LiquidationCompleted, EventType::LiquidationCompleted, {
    target: Pubkey,
    liquidator: Pubkey,
    amount_repaid: u128,
    collateral_seized: u128,
});

/// Decode the payload of a `DATA:` log line
pub fn decode_event_data<T: BorshDeserialize>(encoded: &str) -> Option<T> {
    let bytes = bs58::decode(encoded).into_vec().ok()?;
    T::try_from_slice(&bytes).ok()
}
