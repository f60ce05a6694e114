use solana_program::{
    account_info::AccountInfo,
    msg,
    program::{invoke, invoke_signed},
    program_error::ProgramError,
    program_pack::Pack,
    pubkey::Pubkey,
};

use crate::error::LendingError;
use super::AssetLedger;

/// SPL Token custody for one asset, scoped to a single counterparty per instruction.
///
/// `move_in` pulls from the counterparty's token account with the counterparty
/// as signing authority. `move_out` pays the counterparty's token account from
/// custody, signed by the custody authority PDA.
pub struct SplTokenLedger<'a, 'info> {
    token_program: &'a AccountInfo<'info>,
    custody: &'a AccountInfo<'info>,
    custody_authority: &'a AccountInfo<'info>,
    custody_seeds: &'a [&'a [u8]],
    holder_token_account: &'a AccountInfo<'info>,
    holder: &'a AccountInfo<'info>,
}

impl<'a, 'info> SplTokenLedger<'a, 'info> {
    pub fn new(
        token_program: &'a AccountInfo<'info>,
        custody: &'a AccountInfo<'info>,
        custody_authority: &'a AccountInfo<'info>,
        custody_seeds: &'a [&'a [u8]],
        holder_token_account: &'a AccountInfo<'info>,
        holder: &'a AccountInfo<'info>,
    ) -> Result<Self, ProgramError> {
        if *token_program.key != spl_token::id() {
            return Err(ProgramError::IncorrectProgramId);
        }

        Ok(Self {
            token_program,
            custody,
            custody_authority,
            custody_seeds,
            holder_token_account,
            holder,
        })
    }

    fn ensure_holder(&self, key: &Pubkey) -> Result<(), ProgramError> {
        if key != self.holder.key {
            msg!("Transfer counterparty {} does not match signer {}", key, self.holder.key);
            return Err(LendingError::CollaboratorFailure.into());
        }
        Ok(())
    }

    fn token_balance(account: &AccountInfo) -> Result<u128, ProgramError> {
        let token_account = spl_token::state::Account::unpack(&account.data.borrow())?;
        Ok(token_account.amount as u128)
    }
}

/// Token amounts are u64 on-chain
fn to_token_amount(amount: u128) -> Result<u64, ProgramError> {
    u64::try_from(amount).map_err(|_| LendingError::ArithmeticOverflow.into())
}

impl AssetLedger for SplTokenLedger<'_, '_> {
    fn move_in(&mut self, from: &Pubkey, amount: u128) -> Result<(), ProgramError> {
        self.ensure_holder(from)?;
        let amount = to_token_amount(amount)?;
        if amount == 0 {
            return Ok(());
        }

        let transfer_instruction = spl_token::instruction::transfer(
            self.token_program.key,
            self.holder_token_account.key,
            self.custody.key,
            self.holder.key,
            &[],
            amount,
        )?;

        invoke(
            &transfer_instruction,
            &[
                self.holder_token_account.clone(),
                self.custody.clone(),
                self.holder.clone(),
                self.token_program.clone(),
            ],
        )
    }

    fn move_out(&mut self, to: &Pubkey, amount: u128) -> Result<(), ProgramError> {
        self.ensure_holder(to)?;
        let amount = to_token_amount(amount)?;
        if amount == 0 {
            return Ok(());
        }

        let transfer_instruction = spl_token::instruction::transfer(
            self.token_program.key,
            self.custody.key,
            self.holder_token_account.key,
            self.custody_authority.key, // PDA is authority
            &[],
            amount,
        )?;

        invoke_signed(
            &transfer_instruction,
            &[
                self.custody.clone(),
                self.holder_token_account.clone(),
                self.custody_authority.clone(),
                self.token_program.clone(),
            ],
            &[self.custody_seeds],
        )
    }

    fn balance_of(&self, holder: &Pubkey) -> Result<u128, ProgramError> {
        if holder == self.custody_authority.key {
            Self::token_balance(self.custody)
        } else if holder == self.holder.key {
            Self::token_balance(self.holder_token_account)
        } else {
            Err(LendingError::CollaboratorFailure.into())
        }
    }
}
