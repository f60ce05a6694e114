use std::collections::{BTreeMap, BTreeSet};

use solana_program::{msg, program_error::ProgramError, pubkey::Pubkey};
use spl_token::error::TokenError;

/// Fungible asset held in custody by the ledger
pub trait AssetLedger {
    /// Pull `amount` from `from` into custody
    fn move_in(&mut self, from: &Pubkey, amount: u128) -> Result<(), ProgramError>;

    /// Push `amount` out of custody to `to`
    fn move_out(&mut self, to: &Pubkey, amount: u128) -> Result<(), ProgramError>;

    fn balance_of(&self, holder: &Pubkey) -> Result<u128, ProgramError>;
}

/// Balance-map asset ledger with a single custody account.
/// Failures mirror the SPL Token program's error codes.
#[derive(Debug, Clone)]
pub struct InMemoryAssetLedger {
    asset: Pubkey,
    custody: Pubkey,
    balances: BTreeMap<Pubkey, u128>,
    frozen: BTreeSet<Pubkey>,
}

impl InMemoryAssetLedger {
    pub fn new(asset: Pubkey, custody: Pubkey) -> Self {
        Self {
            asset,
            custody,
            balances: BTreeMap::new(),
            frozen: BTreeSet::new(),
        }
    }

    pub fn asset(&self) -> &Pubkey {
        &self.asset
    }

    pub fn custody(&self) -> &Pubkey {
        &self.custody
    }

    /// Credit `holder` out of thin air
    pub fn mint(&mut self, holder: &Pubkey, amount: u128) -> Result<(), ProgramError> {
        let balance = self.balances.entry(*holder).or_insert(0);
        *balance = balance.checked_add(amount).ok_or(TokenError::Overflow)?;
        Ok(())
    }

    /// Reject every transfer touching `holder`
    pub fn freeze(&mut self, holder: &Pubkey) {
        self.frozen.insert(*holder);
    }

    pub fn thaw(&mut self, holder: &Pubkey) {
        self.frozen.remove(holder);
    }

    fn transfer(&mut self, from: &Pubkey, to: &Pubkey, amount: u128) -> Result<(), ProgramError> {
        if self.frozen.contains(from) || self.frozen.contains(to) {
            msg!("Transfer of {} {} blocked: account frozen", amount, self.asset);
            return Err(TokenError::AccountFrozen.into());
        }

        let from_balance = self.balances.get(from).copied().unwrap_or(0);
        if from_balance < amount {
            msg!("Transfer of {} {} failed: balance {}", amount, self.asset, from_balance);
            return Err(TokenError::InsufficientFunds.into());
        }

        let to_balance = self.balances.get(to).copied().unwrap_or(0);
        let to_balance = to_balance.checked_add(amount).ok_or(TokenError::Overflow)?;

        self.balances.insert(*from, from_balance - amount);
        self.balances.insert(*to, to_balance);
        Ok(())
    }
}

impl AssetLedger for InMemoryAssetLedger {
    fn move_in(&mut self, from: &Pubkey, amount: u128) -> Result<(), ProgramError> {
        let custody = self.custody;
        self.transfer(from, &custody, amount)
    }

    fn move_out(&mut self, to: &Pubkey, amount: u128) -> Result<(), ProgramError> {
        let custody = self.custody;
        self.transfer(&custody, to, amount)
    }

    fn balance_of(&self, holder: &Pubkey) -> Result<u128, ProgramError> {
        Ok(self.balances.get(holder).copied().unwrap_or(0))
    }
}
