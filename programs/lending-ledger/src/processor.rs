use solana_program::{
    account_info::{next_account_info, AccountInfo},
    entrypoint::ProgramResult,
    msg,
    program::{invoke, invoke_signed, set_return_data},
    program_error::ProgramError,
    program_pack::Pack,
    pubkey::Pubkey,
    system_instruction, system_program,
    sysvar::{clock::Clock, rent::Rent, Sysvar},
};
use borsh::{BorshDeserialize, BorshSerialize};

use crate::{
    engine::{CollateralManager, InterestAccrual, LiquidationEngine},
    error::LendingError,
    instructions::LendingInstruction,
    interface::{AccountPriceFeed, SplTokenLedger},
    state::{LedgerParams, LedgerState, PoolConfig, PositionAccount, PriceFeedAccount},
};

pub fn process_instruction(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    instruction_data: &[u8],
) -> ProgramResult {
    let instruction = LendingInstruction::unpack(instruction_data)?;

    match instruction {
        LendingInstruction::InitializeLedger { params } => {
            msg!("Instruction: InitializeLedger");
            process_initialize_ledger(program_id, accounts, params)
        }

        LendingInstruction::InitializePriceFeed { price } => {
            msg!("Instruction: InitializePriceFeed");
            process_initialize_price_feed(program_id, accounts, price)
        }

        LendingInstruction::UpdatePrice { price } => {
            msg!("Instruction: UpdatePrice");
            process_update_price(program_id, accounts, price)
        }

        LendingInstruction::Deposit { amount } => {
            msg!("Instruction: Deposit");
            process_ledger_operation(program_id, accounts, LedgerOperation::Deposit(amount))
        }

        LendingInstruction::Withdraw { amount } => {
            msg!("Instruction: Withdraw");
            process_ledger_operation(program_id, accounts, LedgerOperation::Withdraw(amount))
        }

        LendingInstruction::Borrow { amount } => {
            msg!("Instruction: Borrow");
            process_ledger_operation(program_id, accounts, LedgerOperation::Borrow(amount))
        }

        LendingInstruction::Repay { amount } => {
            msg!("Instruction: Repay");
            process_ledger_operation(program_id, accounts, LedgerOperation::Repay(amount))
        }

        LendingInstruction::Liquidate { target, repay_amount } => {
            msg!("Instruction: Liquidate");
            process_ledger_operation(
                program_id,
                accounts,
                LedgerOperation::Liquidate { target, repay_amount },
            )
        }

        LendingInstruction::QueryDebt { owner } => {
            msg!("Instruction: QueryDebt");
            process_query_debt(program_id, accounts, &owner)
        }
    }
}

/// Initialize a ledger over two custody token accounts
fn process_initialize_ledger(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    params: LedgerParams,
) -> ProgramResult {
    let account_info_iter = &mut accounts.iter();

    let authority_info = next_account_info(account_info_iter)?;
    let ledger_info = next_account_info(account_info_iter)?;
    let collateral_custody_info = next_account_info(account_info_iter)?;
    let borrow_custody_info = next_account_info(account_info_iter)?;
    let system_program_info = next_account_info(account_info_iter)?;
    let rent_sysvar = next_account_info(account_info_iter)?;

    if !authority_info.is_signer || !ledger_info.is_signer {
        return Err(ProgramError::MissingRequiredSignature);
    }

    if !ledger_info.data_is_empty() {
        return Err(LendingError::AccountAlreadyInitialized.into());
    }

    // Reject bad parameters before paying rent
    let config = PoolConfig::new(params)?;

    let (custody_authority, custody_bump) =
        LedgerState::find_custody_authority(program_id, ledger_info.key);
    verify_custody(collateral_custody_info, &custody_authority, &config.collateral_asset)?;
    verify_custody(borrow_custody_info, &custody_authority, &config.borrow_asset)?;

    let rent = &Rent::from_account_info(rent_sysvar)?;
    let required_lamports = rent.minimum_balance(LedgerState::LEN);

    invoke(
        &system_instruction::create_account(
            authority_info.key,
            ledger_info.key,
            required_lamports,
            LedgerState::LEN as u64,
            program_id,
        ),
        &[
            authority_info.clone(),
            ledger_info.clone(),
            system_program_info.clone(),
        ],
    )?;

    let state = LedgerState::new(
        *authority_info.key,
        config,
        *collateral_custody_info.key,
        *borrow_custody_info.key,
        custody_bump,
        Clock::get()?.unix_timestamp,
    );
    state.serialize(&mut &mut ledger_info.data.borrow_mut()[..])?;

    msg!(
        "Ledger {} initialized: apr {}%, ratio {}%, threshold {}%, bonus {}%",
        ledger_info.key,
        state.config.apr_percent,
        state.config.collateralization_ratio,
        state.config.liquidation_threshold,
        state.config.liquidation_bonus
    );

    Ok(())
}

/// Custody must be a token account of `mint` owned by the custody PDA
fn verify_custody(
    custody_info: &AccountInfo,
    custody_authority: &Pubkey,
    mint: &Pubkey,
) -> ProgramResult {
    if *custody_info.owner != spl_token::id() {
        return Err(ProgramError::IncorrectProgramId);
    }

    let token_account = spl_token::state::Account::unpack(&custody_info.data.borrow())?;
    if token_account.owner != *custody_authority || token_account.mint != *mint {
        msg!("Custody {} not held by {} for mint {}", custody_info.key, custody_authority, mint);
        return Err(LendingError::InvalidAccount.into());
    }

    Ok(())
}

/// Create a price account
fn process_initialize_price_feed(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    price: u128,
) -> ProgramResult {
    let account_info_iter = &mut accounts.iter();

    let authority_info = next_account_info(account_info_iter)?;
    let price_feed_info = next_account_info(account_info_iter)?;
    let system_program_info = next_account_info(account_info_iter)?;
    let rent_sysvar = next_account_info(account_info_iter)?;

    if !authority_info.is_signer || !price_feed_info.is_signer {
        return Err(ProgramError::MissingRequiredSignature);
    }

    if !price_feed_info.data_is_empty() {
        return Err(LendingError::AccountAlreadyInitialized.into());
    }

    if price == 0 {
        return Err(LendingError::InvalidPrice.into());
    }

    let rent = &Rent::from_account_info(rent_sysvar)?;
    let required_lamports = rent.minimum_balance(PriceFeedAccount::LEN);

    invoke(
        &system_instruction::create_account(
            authority_info.key,
            price_feed_info.key,
            required_lamports,
            PriceFeedAccount::LEN as u64,
            program_id,
        ),
        &[
            authority_info.clone(),
            price_feed_info.clone(),
            system_program_info.clone(),
        ],
    )?;

    let feed = PriceFeedAccount::new(*authority_info.key, price, Clock::get()?.unix_timestamp);
    feed.serialize(&mut &mut price_feed_info.data.borrow_mut()[..])?;

    msg!("Price feed {} initialized at {}", price_feed_info.key, price);

    Ok(())
}

/// Push a new price
fn process_update_price(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    price: u128,
) -> ProgramResult {
    let account_info_iter = &mut accounts.iter();

    let authority_info = next_account_info(account_info_iter)?;
    let price_feed_info = next_account_info(account_info_iter)?;

    if !authority_info.is_signer {
        return Err(ProgramError::MissingRequiredSignature);
    }

    if price_feed_info.owner != program_id {
        return Err(ProgramError::IncorrectProgramId);
    }

    let mut feed = PriceFeedAccount::deserialize(&mut &price_feed_info.data.borrow()[..])?;
    feed.validate()?;

    if feed.authority != *authority_info.key {
        return Err(LendingError::InvalidAuthority.into());
    }

    if price == 0 {
        return Err(LendingError::InvalidPrice.into());
    }

    feed.price = price;
    feed.last_update = Clock::get()?.unix_timestamp;
    feed.serialize(&mut &mut price_feed_info.data.borrow_mut()[..])?;

    msg!("Price updated to {}", price);

    Ok(())
}

/// Position-level operations sharing one account layout
#[derive(Debug, Clone, Copy)]
enum LedgerOperation {
    Deposit(u128),
    Withdraw(u128),
    Borrow(u128),
    Repay(u128),
    Liquidate { target: Pubkey, repay_amount: u128 },
}

fn process_ledger_operation(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    operation: LedgerOperation,
) -> ProgramResult {
    let account_info_iter = &mut accounts.iter();

    let actor_info = next_account_info(account_info_iter)?;
    let ledger_info = next_account_info(account_info_iter)?;
    let position_info = next_account_info(account_info_iter)?;
    let price_feed_info = next_account_info(account_info_iter)?;
    let actor_collateral_info = next_account_info(account_info_iter)?;
    let actor_borrow_info = next_account_info(account_info_iter)?;
    let collateral_custody_info = next_account_info(account_info_iter)?;
    let borrow_custody_info = next_account_info(account_info_iter)?;
    let custody_authority_info = next_account_info(account_info_iter)?;
    let token_program_info = next_account_info(account_info_iter)?;
    let system_program_info = next_account_info(account_info_iter)?;

    if !actor_info.is_signer {
        return Err(ProgramError::MissingRequiredSignature);
    }

    let state = load_ledger(program_id, ledger_info)?;

    if *price_feed_info.key != state.config.price_feed
        || *collateral_custody_info.key != state.collateral_custody
        || *borrow_custody_info.key != state.borrow_custody
    {
        msg!("Account does not belong to ledger {}", ledger_info.key);
        return Err(LendingError::InvalidAccount.into());
    }

    let custody_bump = [state.custody_bump];
    let custody_seeds: &[&[u8]] = &[
        LedgerState::CUSTODY_SEED,
        ledger_info.key.as_ref(),
        &custody_bump,
    ];
    let custody_authority = Pubkey::create_program_address(custody_seeds, program_id)?;
    if custody_authority != *custody_authority_info.key {
        return Err(ProgramError::InvalidSeeds);
    }

    let position_owner = match operation {
        LedgerOperation::Liquidate { target, .. } => target,
        _ => *actor_info.key,
    };

    let (position_address, position_bump) =
        PositionAccount::find_address(program_id, ledger_info.key, &position_owner);
    if position_address != *position_info.key {
        return Err(ProgramError::InvalidSeeds);
    }

    if position_info.data_is_empty() {
        if let LedgerOperation::Liquidate { .. } = operation {
            msg!("No position for {}", position_owner);
            return Err(LendingError::NoDebt.into());
        }
        create_position_account(
            program_id,
            actor_info,
            ledger_info.key,
            position_info,
            system_program_info,
            position_bump,
        )?;
    } else if position_info.owner != program_id {
        return Err(ProgramError::IncorrectProgramId);
    }

    let mut account = PositionAccount::deserialize(&mut &position_info.data.borrow()[..])?;
    account.validate(ledger_info.key, &position_owner)?;

    let now = Clock::get()?.unix_timestamp;
    let price_feed = AccountPriceFeed::new(program_id, price_feed_info);
    let mut collateral_asset = SplTokenLedger::new(
        token_program_info,
        collateral_custody_info,
        custody_authority_info,
        custody_seeds,
        actor_collateral_info,
        actor_info,
    )?;
    let mut borrow_asset = SplTokenLedger::new(
        token_program_info,
        borrow_custody_info,
        custody_authority_info,
        custody_seeds,
        actor_borrow_info,
        actor_info,
    )?;

    let config = &state.config;
    let position = &mut account.position;
    match operation {
        LedgerOperation::Deposit(amount) => {
            CollateralManager::deposit(
                config,
                position,
                actor_info.key,
                amount,
                now,
                &mut collateral_asset,
            )?;
        }
        LedgerOperation::Withdraw(amount) => {
            CollateralManager::withdraw(
                config,
                position,
                actor_info.key,
                amount,
                now,
                &mut collateral_asset,
                &price_feed,
            )?;
        }
        LedgerOperation::Borrow(amount) => {
            CollateralManager::borrow(
                config,
                position,
                actor_info.key,
                amount,
                now,
                &mut borrow_asset,
                &price_feed,
            )?;
        }
        LedgerOperation::Repay(amount) => {
            CollateralManager::repay(
                config,
                position,
                actor_info.key,
                amount,
                now,
                &mut borrow_asset,
            )?;
        }
        LedgerOperation::Liquidate { target, repay_amount } => {
            LiquidationEngine::liquidate(
                config,
                position,
                &target,
                actor_info.key,
                repay_amount,
                now,
                &mut collateral_asset,
                &mut borrow_asset,
                &price_feed,
            )?;
        }
    }

    account.serialize(&mut &mut position_info.data.borrow_mut()[..])?;

    Ok(())
}

fn load_ledger(program_id: &Pubkey, ledger_info: &AccountInfo) -> Result<LedgerState, ProgramError> {
    if ledger_info.data_is_empty() {
        return Err(LendingError::AccountNotInitialized.into());
    }

    if ledger_info.owner != program_id {
        return Err(ProgramError::IncorrectProgramId);
    }

    let state = LedgerState::deserialize(&mut &ledger_info.data.borrow()[..])?;
    state.validate()?;
    Ok(state)
}

/// Create the position PDA on first touch, paid by the actor
fn create_position_account<'info>(
    program_id: &Pubkey,
    payer_info: &AccountInfo<'info>,
    ledger: &Pubkey,
    position_info: &AccountInfo<'info>,
    system_program_info: &AccountInfo<'info>,
    bump: u8,
) -> ProgramResult {
    if *system_program_info.key != system_program::id() {
        return Err(ProgramError::IncorrectProgramId);
    }

    let rent = Rent::get()?;
    let required_lamports = rent.minimum_balance(PositionAccount::LEN);

    invoke_signed(
        &system_instruction::create_account(
            payer_info.key,
            position_info.key,
            required_lamports,
            PositionAccount::LEN as u64,
            program_id,
        ),
        &[
            payer_info.clone(),
            position_info.clone(),
            system_program_info.clone(),
        ],
        &[&[
            PositionAccount::SEED,
            ledger.as_ref(),
            payer_info.key.as_ref(),
            &[bump],
        ]],
    )?;

    let account = PositionAccount::new(*ledger, *payer_info.key, bump);
    account.serialize(&mut &mut position_info.data.borrow_mut()[..])?;

    msg!("Position account created for {}", payer_info.key);

    Ok(())
}

/// Return the accrued debt of `owner`, zero when no position exists
fn process_query_debt(program_id: &Pubkey, accounts: &[AccountInfo], owner: &Pubkey) -> ProgramResult {
    let account_info_iter = &mut accounts.iter();

    let ledger_info = next_account_info(account_info_iter)?;
    let position_info = next_account_info(account_info_iter)?;

    let state = load_ledger(program_id, ledger_info)?;

    let (position_address, _) = PositionAccount::find_address(program_id, ledger_info.key, owner);
    if position_address != *position_info.key {
        return Err(ProgramError::InvalidSeeds);
    }

    let debt = if position_info.data_is_empty() {
        0
    } else {
        if position_info.owner != program_id {
            return Err(ProgramError::IncorrectProgramId);
        }
        let account = PositionAccount::deserialize(&mut &position_info.data.borrow()[..])?;
        account.validate(ledger_info.key, owner)?;
        InterestAccrual::accrued_debt(&state.config, &account.position, Clock::get()?.unix_timestamp)?
    };

    msg!("Debt of {}: {}", owner, debt);
    set_return_data(&debt.to_le_bytes());

    Ok(())
}
