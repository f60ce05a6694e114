use lending_ledger::{
    engine::{InterestAccrual, LiquidationEngine},
    error::LendingError,
    interface::{AssetLedger, FixedPriceFeed, InMemoryAssetLedger, PriceFeed},
    ledger::LendingLedger,
    math::{mul_div, Wad, PERCENT, SCALE},
    state::{LedgerParams, LiquidationBonus, PoolConfig, Position},
};
use proptest::prelude::*;
use solana_program::{
    clock::{Clock, UnixTimestamp},
    program_error::ProgramError,
    pubkey::Pubkey,
};
use spl_token::error::TokenError;

const T0: UnixTimestamp = 1_700_000_000;
const DAY: UnixTimestamp = 86_400;

type Ledger = LendingLedger<InMemoryAssetLedger, InMemoryAssetLedger, FixedPriceFeed>;

fn clock_at(unix_timestamp: UnixTimestamp) -> Clock {
    Clock {
        unix_timestamp,
        ..Clock::default()
    }
}

fn units(n: u128) -> u128 {
    Wad::from_units(n).unwrap()
}

/// Ledger at price 2000 with 100k of borrow asset in custody
fn setup() -> Ledger {
    let collateral_mint = Pubkey::new_unique();
    let borrow_mint = Pubkey::new_unique();
    let feed_key = Pubkey::new_unique();

    let collateral = InMemoryAssetLedger::new(collateral_mint, Pubkey::new_unique());
    let mut borrow = InMemoryAssetLedger::new(borrow_mint, Pubkey::new_unique());
    let custody = *borrow.custody();
    borrow.mint(&custody, units(100_000)).unwrap();

    LendingLedger::new(
        LedgerParams::default_for(collateral_mint, borrow_mint, feed_key),
        collateral,
        borrow,
        FixedPriceFeed::new(units(2000)),
    )
    .unwrap()
}

fn funded_user(ledger: &mut Ledger, collateral: u128) -> Pubkey {
    let user = Pubkey::new_unique();
    ledger.collateral_asset_mut().mint(&user, collateral).unwrap();
    user
}

/// Deposit 1 unit and borrow 1000 at T0
fn borrowed_position(ledger: &mut Ledger) -> Pubkey {
    let user = funded_user(ledger, units(10));
    let clock = clock_at(T0);
    ledger.deposit(&user, Wad::ONE, &clock).unwrap();
    ledger.borrow(&user, units(1000), &clock).unwrap();
    user
}

#[test]
fn test_borrow_within_capacity() {
    let mut ledger = setup();
    let user = funded_user(&mut ledger, units(10));
    let clock = clock_at(T0);

    ledger.deposit(&user, Wad::ONE, &clock).unwrap();
    assert_eq!(ledger.max_borrowable(&user).unwrap(), 1_333_333_333_333_333_333_333);

    let event = ledger.borrow(&user, units(1000), &clock).unwrap();
    assert_eq!(event.amount, units(1000));
    assert_eq!(ledger.position(&user).debt, units(1000));
    assert_eq!(ledger.borrow_asset().balance_of(&user).unwrap(), units(1000));
    assert!(ledger.is_within_loan_to_value(&user).unwrap());
}

#[test]
fn test_borrow_above_capacity_fails() {
    let mut ledger = setup();
    let user = funded_user(&mut ledger, units(10));
    let clock = clock_at(T0);

    ledger.deposit(&user, Wad::ONE, &clock).unwrap();
    let before = ledger.position(&user);

    let err = ledger.borrow(&user, units(1500), &clock).unwrap_err();
    assert_eq!(err, LendingError::CreditLimitExceeded.into());
    assert_eq!(ledger.position(&user), before);
    assert_eq!(ledger.borrow_asset().balance_of(&user).unwrap(), 0);
}

#[test]
fn test_interest_grows_over_a_year() {
    let mut ledger = setup();
    let user = borrowed_position(&mut ledger);

    let a_year_later = clock_at(T0 + 365 * DAY);
    let debt = ledger.current_debt(&user, &a_year_later).unwrap();
    assert!(debt > units(1000));
    // 5% simple interest, truncated per-second rate
    assert!(debt <= units(1050));
    assert!(debt > units(1049));

    // Querying does not touch the stored position
    assert_eq!(ledger.position(&user).debt, units(1000));
    assert_eq!(ledger.position(&user).last_accrual_time, T0);
}

#[test]
fn test_interest_accrues_from_the_epoch() {
    let mut ledger = setup();
    let user = funded_user(&mut ledger, units(10));
    let epoch = Clock::default();

    ledger.deposit(&user, Wad::ONE, &epoch).unwrap();
    ledger.borrow(&user, units(1000), &epoch).unwrap();
    assert_ne!(ledger.position(&user).last_accrual_time, 0);

    let a_year_later = clock_at(365 * DAY);
    let owed = ledger.current_debt(&user, &a_year_later).unwrap();
    assert!(owed > units(1049));

    // Settling the year keeps the interest on the books
    ledger.repay(&user, units(1), &a_year_later).unwrap();
    assert_eq!(ledger.position(&user).debt, owed - units(1));
    assert_eq!(ledger.position(&user).last_accrual_time, 365 * DAY);
}

#[test]
fn test_withdraw_all_collateral_with_debt_fails() {
    let mut ledger = setup();
    let user = borrowed_position(&mut ledger);
    let before = ledger.position(&user);

    let err = ledger.withdraw(&user, Wad::ONE, &clock_at(T0 + DAY)).unwrap_err();
    assert_eq!(err, LendingError::CreditLimitExceeded.into());
    assert_eq!(ledger.position(&user), before);
    assert_eq!(ledger.collateral_asset().balance_of(&user).unwrap(), units(9));
}

#[test]
fn test_withdraw_more_than_deposited_fails() {
    let mut ledger = setup();
    let user = funded_user(&mut ledger, units(10));
    ledger.deposit(&user, Wad::ONE, &clock_at(T0)).unwrap();

    let err = ledger.withdraw(&user, units(2), &clock_at(T0)).unwrap_err();
    assert_eq!(err, LendingError::InsufficientBalance.into());

    // Without debt everything can leave
    ledger.withdraw(&user, Wad::ONE, &clock_at(T0)).unwrap();
    assert!(ledger.position(&user).is_empty());
    assert_eq!(ledger.collateral_asset().balance_of(&user).unwrap(), units(10));
}

#[test]
fn test_repay_reduces_debt() {
    let mut ledger = setup();
    let user = borrowed_position(&mut ledger);

    let event = ledger.repay(&user, units(500), &clock_at(T0)).unwrap();
    assert_eq!(event.amount, units(500));
    assert_eq!(ledger.position(&user).debt, units(500));

    // Later repayments settle against the accrued figure
    let later = clock_at(T0 + 30 * DAY);
    let owed = ledger.current_debt(&user, &later).unwrap();
    assert!(owed > units(500));
    ledger.repay(&user, units(100), &later).unwrap();
    assert_eq!(ledger.position(&user).debt, owed - units(100));
    assert_eq!(ledger.position(&user).last_accrual_time, T0 + 30 * DAY);
}

#[test]
fn test_failed_operation_leaves_no_position() {
    let mut ledger = setup();
    let user = funded_user(&mut ledger, units(1));
    let bystander = funded_user(&mut ledger, units(1));

    // Nothing to borrow against
    let err = ledger.borrow(&user, units(1), &clock_at(T0)).unwrap_err();
    assert_eq!(err, LendingError::CreditLimitExceeded.into());
    assert!(!ledger.positions().contains(&user));

    ledger.deposit(&bystander, Wad::ONE, &clock_at(T0)).unwrap();
    assert_eq!(ledger.positions().len(), 1);
    assert!(ledger.positions().contains(&bystander));
}

#[test]
fn test_repay_without_debt_is_noop() {
    let mut ledger = setup();
    let user = funded_user(&mut ledger, units(1));

    let event = ledger.repay(&user, units(5), &clock_at(T0)).unwrap();
    assert_eq!(event.amount, 0);
    assert_eq!(ledger.position(&user).debt, 0);
}

#[test]
fn test_zero_amounts_rejected() {
    let mut ledger = setup();
    let user = borrowed_position(&mut ledger);
    let clock = clock_at(T0);

    for err in [
        ledger.deposit(&user, 0, &clock).unwrap_err(),
        ledger.withdraw(&user, 0, &clock).unwrap_err(),
        ledger.borrow(&user, 0, &clock).unwrap_err(),
        ledger.repay(&user, 0, &clock).unwrap_err(),
        ledger.liquidate(&user, 0, &Pubkey::new_unique(), &clock).unwrap_err(),
    ] {
        assert_eq!(err, LendingError::InvalidInput.into());
    }
}

#[test]
fn test_liquidation_after_price_drop() {
    let mut ledger = setup();
    let user = borrowed_position(&mut ledger);
    let liquidator = Pubkey::new_unique();
    ledger.borrow_asset_mut().mint(&liquidator, units(1000)).unwrap();

    ledger.price_feed_mut().set_price(units(1100));
    let clock = clock_at(T0);
    assert_eq!(ledger.health_factor(&user, &clock).unwrap(), Some(110));

    let event = ledger.liquidate(&user, units(500), &liquidator, &clock).unwrap();
    let seized = 477_272_727_272_727_272;

    assert_eq!(event.target, user);
    assert_eq!(event.liquidator, liquidator);
    assert_eq!(event.amount_repaid, units(500));
    assert_eq!(event.collateral_seized, seized);

    let position = ledger.position(&user);
    assert_eq!(position.debt, units(500));
    assert_eq!(position.collateral, Wad::ONE - seized);
    assert_eq!(ledger.collateral_asset().balance_of(&liquidator).unwrap(), seized);
    assert_eq!(ledger.borrow_asset().balance_of(&liquidator).unwrap(), units(500));
}

#[test]
fn test_liquidation_rejects_healthy_position() {
    let mut ledger = setup();
    let user = borrowed_position(&mut ledger);
    let liquidator = Pubkey::new_unique();
    ledger.borrow_asset_mut().mint(&liquidator, units(1000)).unwrap();
    let before = ledger.position(&user);

    let err = ledger.liquidate(&user, units(500), &liquidator, &clock_at(T0)).unwrap_err();
    assert_eq!(err, LendingError::PositionHealthy.into());
    assert_eq!(ledger.position(&user), before);
    assert_eq!(ledger.borrow_asset().balance_of(&liquidator).unwrap(), units(1000));
}

#[test]
fn test_liquidation_without_debt() {
    let mut ledger = setup();
    let user = funded_user(&mut ledger, units(1));
    ledger.deposit(&user, Wad::ONE, &clock_at(T0)).unwrap();

    let err = ledger
        .liquidate(&user, units(1), &Pubkey::new_unique(), &clock_at(T0))
        .unwrap_err();
    assert_eq!(err, LendingError::NoDebt.into());
    assert_eq!(ledger.health_factor(&user, &clock_at(T0)).unwrap(), None);
}

#[test]
fn test_seizure_shortfall_changes_nothing() {
    let mut ledger = setup();
    let user = borrowed_position(&mut ledger);
    let liquidator = Pubkey::new_unique();
    ledger.borrow_asset_mut().mint(&liquidator, units(1000)).unwrap();
    let before = ledger.position(&user);

    // 1050 of value at 600 per unit needs 1.75 units, only 1 is held
    ledger.price_feed_mut().set_price(units(600));
    let err = ledger.liquidate(&user, units(1000), &liquidator, &clock_at(T0)).unwrap_err();

    assert_eq!(err, LendingError::SeizureShortfall.into());
    assert_eq!(ledger.position(&user), before);
    assert_eq!(ledger.borrow_asset().balance_of(&liquidator).unwrap(), units(1000));
    assert_eq!(ledger.collateral_asset().balance_of(&liquidator).unwrap(), 0);
}

#[test]
fn test_failed_seizure_refunds_repayment() {
    let mut ledger = setup();
    let user = borrowed_position(&mut ledger);
    let liquidator = Pubkey::new_unique();
    ledger.borrow_asset_mut().mint(&liquidator, units(1000)).unwrap();
    let custody = *ledger.borrow_asset().custody();
    let custody_before = ledger.borrow_asset().balance_of(&custody).unwrap();
    let before = ledger.position(&user);

    ledger.price_feed_mut().set_price(units(1100));
    ledger.collateral_asset_mut().freeze(&liquidator);

    let err = ledger.liquidate(&user, units(500), &liquidator, &clock_at(T0)).unwrap_err();
    assert_eq!(err, TokenError::AccountFrozen.into());

    assert_eq!(ledger.position(&user), before);
    assert_eq!(ledger.borrow_asset().balance_of(&liquidator).unwrap(), units(1000));
    assert_eq!(ledger.borrow_asset().balance_of(&custody).unwrap(), custody_before);

    // Once thawed the same liquidation goes through
    ledger.collateral_asset_mut().thaw(&liquidator);
    ledger.liquidate(&user, units(500), &liquidator, &clock_at(T0)).unwrap();
    assert_eq!(ledger.position(&user).debt, units(500));
}

#[test]
fn test_self_liquidation_allowed() {
    let mut ledger = setup();
    let user = borrowed_position(&mut ledger);

    ledger.price_feed_mut().set_price(units(1100));
    let event = ledger.liquidate(&user, units(200), &user, &clock_at(T0)).unwrap();
    assert_eq!(event.liquidator, user);
    assert_eq!(ledger.position(&user).debt, units(800));
}

#[test]
fn test_interest_pushes_position_under_threshold() {
    let mut ledger = setup();
    let user = funded_user(&mut ledger, units(10));
    let clock = clock_at(T0);
    ledger.deposit(&user, Wad::ONE, &clock).unwrap();
    ledger.borrow(&user, units(1300), &clock).unwrap();

    // 2000 / 1300 is ~153%; at 1560 per unit it is exactly 120%
    ledger.price_feed_mut().set_price(units(1560));
    assert_eq!(ledger.health_factor(&user, &clock).unwrap(), Some(120));
    assert_eq!(
        ledger.liquidate(&user, units(100), &Pubkey::new_unique(), &clock).unwrap_err(),
        LendingError::PositionHealthy.into()
    );

    let later = clock_at(T0 + 30 * DAY);
    assert_eq!(ledger.health_factor(&user, &later).unwrap(), Some(119));
}

#[test]
fn test_halted_feed_blocks_valuation() {
    let mut ledger = setup();
    let user = borrowed_position(&mut ledger);
    ledger.price_feed_mut().set_halted(true);

    assert_eq!(
        ledger.borrow(&user, units(1), &clock_at(T0)).unwrap_err(),
        LendingError::CollaboratorFailure.into()
    );
    // Deposits and repayments do not read the price
    ledger.deposit(&user, Wad::ONE, &clock_at(T0)).unwrap();
    ledger.repay(&user, units(1), &clock_at(T0)).unwrap();
}

#[test]
fn test_backwards_clock_adds_no_interest() {
    let mut ledger = setup();
    let user = borrowed_position(&mut ledger);

    let earlier = clock_at(T0 - DAY);
    assert_eq!(ledger.current_debt(&user, &earlier).unwrap(), units(1000));
    ledger.repay(&user, units(1), &earlier).unwrap();
    assert_eq!(ledger.position(&user).debt, units(999));
    assert_eq!(ledger.position(&user).last_accrual_time, T0);
}

#[test]
fn test_multiplier_bonus_matches_premium() {
    let mut params = LedgerParams::default_for(Pubkey::new_unique(), Pubkey::new_unique(), Pubkey::new_unique());
    params.liquidation_bonus = LiquidationBonus::from_multiplier(105).unwrap();
    let config = PoolConfig::new(params).unwrap();
    assert_eq!(config.liquidation_bonus, 5);
}

type Balances = [u128; 4];

/// Liquidator and custody balances of both assets
fn balances(ledger: &Ledger, liquidator: &Pubkey) -> Balances {
    let collateral_custody = *ledger.collateral_asset().custody();
    let borrow_custody = *ledger.borrow_asset().custody();
    [
        ledger.collateral_asset().balance_of(liquidator).unwrap(),
        ledger.collateral_asset().balance_of(&collateral_custody).unwrap(),
        ledger.borrow_asset().balance_of(liquidator).unwrap(),
        ledger.borrow_asset().balance_of(&borrow_custody).unwrap(),
    ]
}

fn accrual_config() -> PoolConfig {
    PoolConfig::new(LedgerParams::default_for(
        Pubkey::new_unique(),
        Pubkey::new_unique(),
        Pubkey::new_unique(),
    ))
    .unwrap()
}

proptest! {
    #[test]
    fn prop_ltv_holds_after_borrow_and_withdraw(
        ops in prop::collection::vec((0u8..4, 1u64..5_000), 1..24)
    ) {
        let mut ledger = setup();
        let user = funded_user(&mut ledger, units(1_000));
        let milli = 1_000_000_000_000_000u128;

        for (step, (op, size)) in ops.into_iter().enumerate() {
            let clock = clock_at(T0 + step as i64 * 3_600);
            let amount = size as u128 * milli;

            let checked = match op {
                0 => ledger.deposit(&user, amount, &clock).map(|_| false),
                1 => ledger.borrow(&user, amount * 100, &clock).map(|_| true),
                2 => ledger.withdraw(&user, amount, &clock).map(|_| true),
                _ => ledger.repay(&user, amount * 50, &clock).map(|_| false),
            };

            if let Ok(true) = checked {
                prop_assert!(ledger.is_within_loan_to_value(&user).unwrap());
            }
        }
    }

    #[test]
    fn prop_repay_clamps_to_debt(borrow in 1u128..1_300, repay in 1u128..3_000) {
        let mut ledger = setup();
        let user = funded_user(&mut ledger, units(1));
        ledger.borrow_asset_mut().mint(&user, units(5_000)).unwrap();
        let clock = clock_at(T0);

        ledger.deposit(&user, Wad::ONE, &clock).unwrap();
        ledger.borrow(&user, units(borrow), &clock).unwrap();
        let event = ledger.repay(&user, units(repay), &clock).unwrap();

        let expected = repay.min(borrow);
        prop_assert_eq!(event.amount, units(expected));
        prop_assert_eq!(ledger.position(&user).debt, units(borrow - expected));
    }

    #[test]
    fn prop_liquidation_outcome_matches_health(
        borrow in 100u128..1_300,
        price in 300u128..2_500,
        repay in 1u128..2_000,
    ) {
        let mut ledger = setup();
        let user = funded_user(&mut ledger, units(10));
        let clock = clock_at(T0);
        ledger.deposit(&user, Wad::ONE, &clock).unwrap();
        ledger.borrow(&user, units(borrow), &clock).unwrap();

        let liquidator = Pubkey::new_unique();
        ledger.borrow_asset_mut().mint(&liquidator, units(5_000)).unwrap();
        ledger.price_feed_mut().set_price(units(price));

        let before = ledger.position(&user);
        let balances_before = balances(&ledger, &liquidator);
        let current_price = ledger.price_feed().current_price().unwrap();
        let health = LiquidationEngine::health_factor(&before, current_price).unwrap().unwrap();
        let config = ledger.config().clone();

        let result = ledger.liquidate(&user, units(repay), &liquidator, &clock);

        if health >= config.liquidation_threshold as u128 {
            prop_assert_eq!(result.unwrap_err(), ProgramError::from(LendingError::PositionHealthy));
            prop_assert_eq!(ledger.position(&user), before);
            prop_assert_eq!(balances(&ledger, &liquidator), balances_before);
            return Ok(());
        }

        let actual = units(repay).min(before.debt);
        let bonus = PERCENT + config.liquidation_bonus as u128;
        let seize = mul_div(mul_div(actual, bonus, PERCENT).unwrap(), SCALE, current_price).unwrap();

        if seize > before.collateral {
            prop_assert_eq!(result.unwrap_err(), ProgramError::from(LendingError::SeizureShortfall));
            prop_assert_eq!(ledger.position(&user), before);
            prop_assert_eq!(balances(&ledger, &liquidator), balances_before);
            return Ok(());
        }

        let event = result.unwrap();
        prop_assert_eq!(event.amount_repaid, actual);
        prop_assert_eq!(event.collateral_seized, seize);

        let after = ledger.position(&user);
        prop_assert_eq!(after.debt, before.debt - actual);
        prop_assert_eq!(after.collateral, before.collateral - seize);

        let [seized, collateral_custody, liquidator_borrow, borrow_custody] = balances(&ledger, &liquidator);
        prop_assert_eq!(seized, balances_before[0] + seize);
        prop_assert_eq!(collateral_custody, balances_before[1] - seize);
        prop_assert_eq!(liquidator_borrow, balances_before[2] - actual);
        prop_assert_eq!(borrow_custody, balances_before[3] + actual);
    }

    #[test]
    fn prop_accrual_is_idempotent(
        debt in 0u128..1_000_000_000_000_000_000_000_000,
        elapsed in 0i64..(10 * 365 * DAY),
    ) {
        let config = accrual_config();
        let mut position = Position { collateral: 0, debt, last_accrual_time: T0 };
        let now = T0 + elapsed;

        let preview = InterestAccrual::accrued_debt(&config, &position, now).unwrap();
        InterestAccrual::accrue(&config, &mut position, now).unwrap();
        prop_assert_eq!(position.debt, preview);

        let settled = position;
        InterestAccrual::accrue(&config, &mut position, now).unwrap();
        prop_assert_eq!(position, settled);
        prop_assert!(position.debt >= debt);
    }
}
