use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    instruction::{AccountMeta, Instruction},
    program_error::ProgramError,
    pubkey::Pubkey,
    system_program, sysvar,
};

use crate::{
    error::LendingError,
    state::{LedgerParams, LedgerState, PositionAccount},
};

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub enum LendingInstruction {
    /// Create a ledger over two custody token accounts
    /// Accounts:
    /// 0. `[signer, writable]` Authority (payer)
    /// 1. `[signer, writable]` Ledger state account
    /// 2. `[]` Collateral custody token account (owned by the custody PDA)
    /// 3. `[]` Borrow custody token account (owned by the custody PDA)
    /// 4. `[]` System program
    /// 5. `[]` Rent sysvar
    InitializeLedger {
        params: LedgerParams,
    },

    /// Create a price account pushed by `authority`
    /// Accounts:
    /// 0. `[signer, writable]` Authority (payer)
    /// 1. `[signer, writable]` Price feed account
    /// 2. `[]` System program
    /// 3. `[]` Rent sysvar
    InitializePriceFeed {
        price: u128,
    },

    /// Push a new price
    /// Accounts:
    /// 0. `[signer]` Authority
    /// 1. `[writable]` Price feed account
    UpdatePrice {
        price: u128,
    },

    /// Deposit collateral. Ledger operation accounts, position owned by the signer.
    Deposit {
        amount: u128,
    },

    /// Withdraw collateral. Ledger operation accounts, position owned by the signer.
    Withdraw {
        amount: u128,
    },

    /// Borrow against collateral. Ledger operation accounts, position owned by the signer.
    Borrow {
        amount: u128,
    },

    /// Repay debt, overpayment is clamped. Ledger operation accounts, position owned by the signer.
    Repay {
        amount: u128,
    },

    /// Liquidate an unhealthy position. Ledger operation accounts, position owned by `target`.
    Liquidate {
        target: Pubkey,
        repay_amount: u128,
    },

    /// Write the accrued debt of `owner` as return data (u128 little endian)
    /// Accounts:
    /// 0. `[]` Ledger state account
    /// 1. `[]` Position account of `owner`
    QueryDebt {
        owner: Pubkey,
    },
}

// Ledger operation accounts (Deposit, Withdraw, Borrow, Repay, Liquidate):
// 0. `[signer, writable]` Actor (position owner, or liquidator)
// 1. `[]` Ledger state account
// 2. `[writable]` Position account PDA `[b"position", ledger, owner]`
// 3. `[]` Price feed account
// 4. `[writable]` Actor collateral token account
// 5. `[writable]` Actor borrow token account
// 6. `[writable]` Collateral custody token account
// 7. `[writable]` Borrow custody token account
// 8. `[]` Custody authority PDA `[b"custody", ledger]`
// 9. `[]` SPL Token program
// 10. `[]` System program

impl LendingInstruction {
    pub fn unpack(input: &[u8]) -> Result<Self, ProgramError> {
        let (&variant, rest) = input.split_first()
            .ok_or(ProgramError::InvalidInstructionData)?;

        Ok(match variant {
            0 => {
                let payload = InitializeLedgerPayload::try_from_slice(rest)?;
                Self::InitializeLedger { params: payload.params }
            },
            1 => {
                let payload = PricePayload::try_from_slice(rest)?;
                Self::InitializePriceFeed { price: payload.price }
            },
            2 => {
                let payload = PricePayload::try_from_slice(rest)?;
                Self::UpdatePrice { price: payload.price }
            },
            3 => Self::Deposit { amount: AmountPayload::try_from_slice(rest)?.amount },
            4 => Self::Withdraw { amount: AmountPayload::try_from_slice(rest)?.amount },
            5 => Self::Borrow { amount: AmountPayload::try_from_slice(rest)?.amount },
            6 => Self::Repay { amount: AmountPayload::try_from_slice(rest)?.amount },
            7 => {
                let payload = LiquidatePayload::try_from_slice(rest)?;
                Self::Liquidate {
                    target: payload.target,
                    repay_amount: payload.repay_amount,
                }
            },
            8 => {
                let payload = OwnerPayload::try_from_slice(rest)?;
                Self::QueryDebt { owner: payload.owner }
            },
            _ => return Err(LendingError::InvalidInstruction.into()),
        })
    }
}

// Payload structs for instruction data after the variant byte
#[derive(BorshSerialize, BorshDeserialize)]
struct InitializeLedgerPayload {
    params: LedgerParams,
}

#[derive(BorshSerialize, BorshDeserialize)]
struct PricePayload {
    price: u128,
}

#[derive(BorshSerialize, BorshDeserialize)]
struct AmountPayload {
    amount: u128,
}

#[derive(BorshSerialize, BorshDeserialize)]
struct LiquidatePayload {
    target: Pubkey,
    repay_amount: u128,
}

#[derive(BorshSerialize, BorshDeserialize)]
struct OwnerPayload {
    owner: Pubkey,
}

/// Keys shared by every ledger operation
#[derive(Debug, Clone, Copy)]
pub struct LedgerOperationKeys {
    pub actor: Pubkey,
    pub ledger: Pubkey,
    pub price_feed: Pubkey,
    pub actor_collateral_account: Pubkey,
    pub actor_borrow_account: Pubkey,
    pub collateral_custody: Pubkey,
    pub borrow_custody: Pubkey,
}

fn ledger_operation_accounts(
    program_id: &Pubkey,
    keys: &LedgerOperationKeys,
    position_owner: &Pubkey,
) -> Vec<AccountMeta> {
    let (position, _) = PositionAccount::find_address(program_id, &keys.ledger, position_owner);
    let (custody_authority, _) = LedgerState::find_custody_authority(program_id, &keys.ledger);

    vec![
        AccountMeta::new(keys.actor, true),
        AccountMeta::new_readonly(keys.ledger, false),
        AccountMeta::new(position, false),
        AccountMeta::new_readonly(keys.price_feed, false),
        AccountMeta::new(keys.actor_collateral_account, false),
        AccountMeta::new(keys.actor_borrow_account, false),
        AccountMeta::new(keys.collateral_custody, false),
        AccountMeta::new(keys.borrow_custody, false),
        AccountMeta::new_readonly(custody_authority, false),
        AccountMeta::new_readonly(spl_token::id(), false),
        AccountMeta::new_readonly(system_program::id(), false),
    ]
}

fn build_instruction(
    program_id: Pubkey,
    instruction: &LendingInstruction,
    accounts: Vec<AccountMeta>,
) -> Result<Instruction, ProgramError> {
    Ok(Instruction::new_with_bytes(program_id, &instruction.try_to_vec()?, accounts))
}

// Helper functions to create instructions
pub fn initialize_ledger(
    program_id: &Pubkey,
    authority: &Pubkey,
    ledger: &Pubkey,
    collateral_custody: &Pubkey,
    borrow_custody: &Pubkey,
    params: LedgerParams,
) -> Result<Instruction, ProgramError> {
    let accounts = vec![
        AccountMeta::new(*authority, true),
        AccountMeta::new(*ledger, true),
        AccountMeta::new_readonly(*collateral_custody, false),
        AccountMeta::new_readonly(*borrow_custody, false),
        AccountMeta::new_readonly(system_program::id(), false),
        AccountMeta::new_readonly(sysvar::rent::id(), false),
    ];

    build_instruction(
        *program_id,
        &LendingInstruction::InitializeLedger { params },
        accounts,
    )
}

pub fn initialize_price_feed(
    program_id: &Pubkey,
    authority: &Pubkey,
    price_feed: &Pubkey,
    price: u128,
) -> Result<Instruction, ProgramError> {
    let accounts = vec![
        AccountMeta::new(*authority, true),
        AccountMeta::new(*price_feed, true),
        AccountMeta::new_readonly(system_program::id(), false),
        AccountMeta::new_readonly(sysvar::rent::id(), false),
    ];

    build_instruction(
        *program_id,
        &LendingInstruction::InitializePriceFeed { price },
        accounts,
    )
}

pub fn update_price(
    program_id: &Pubkey,
    authority: &Pubkey,
    price_feed: &Pubkey,
    price: u128,
) -> Result<Instruction, ProgramError> {
    let accounts = vec![
        AccountMeta::new_readonly(*authority, true),
        AccountMeta::new(*price_feed, false),
    ];

    build_instruction(*program_id, &LendingInstruction::UpdatePrice { price }, accounts)
}

pub fn deposit(
    program_id: &Pubkey,
    keys: &LedgerOperationKeys,
    amount: u128,
) -> Result<Instruction, ProgramError> {
    build_instruction(
        *program_id,
        &LendingInstruction::Deposit { amount },
        ledger_operation_accounts(program_id, keys, &keys.actor),
    )
}

pub fn withdraw(
    program_id: &Pubkey,
    keys: &LedgerOperationKeys,
    amount: u128,
) -> Result<Instruction, ProgramError> {
    build_instruction(
        *program_id,
        &LendingInstruction::Withdraw { amount },
        ledger_operation_accounts(program_id, keys, &keys.actor),
    )
}

pub fn borrow(
    program_id: &Pubkey,
    keys: &LedgerOperationKeys,
    amount: u128,
) -> Result<Instruction, ProgramError> {
    build_instruction(
        *program_id,
        &LendingInstruction::Borrow { amount },
        ledger_operation_accounts(program_id, keys, &keys.actor),
    )
}

pub fn repay(
    program_id: &Pubkey,
    keys: &LedgerOperationKeys,
    amount: u128,
) -> Result<Instruction, ProgramError> {
    build_instruction(
        *program_id,
        &LendingInstruction::Repay { amount },
        ledger_operation_accounts(program_id, keys, &keys.actor),
    )
}

pub fn liquidate(
    program_id: &Pubkey,
    keys: &LedgerOperationKeys,
    target: &Pubkey,
    repay_amount: u128,
) -> Result<Instruction, ProgramError> {
    build_instruction(
        *program_id,
        &LendingInstruction::Liquidate {
            target: *target,
            repay_amount,
        },
        ledger_operation_accounts(program_id, keys, target),
    )
}

pub fn query_debt(
    program_id: &Pubkey,
    ledger: &Pubkey,
    owner: &Pubkey,
) -> Result<Instruction, ProgramError> {
    let (position, _) = PositionAccount::find_address(program_id, ledger, owner);
    let accounts = vec![
        AccountMeta::new_readonly(*ledger, false),
        AccountMeta::new_readonly(position, false),
    ];

    build_instruction(*program_id, &LendingInstruction::QueryDebt { owner: *owner }, accounts)
}
