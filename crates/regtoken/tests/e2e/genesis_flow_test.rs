//! Config file -> genesis -> pre-flight -> transfer.

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    clippy::indexing_slicing
)]

use std::sync::Arc;

use proptest::prelude::*;
use regtoken::cli::commands::exit_codes::{EXIT_RESTRICTED, EXIT_SUCCESS};
use regtoken::cli::commands::CheckCommand;
use regtoken::cli::{CheckArgs, OutputFormat};
use regtoken::genesis::{Genesis, System};
use regtoken_core::config::Config;
use regtoken_core::error::AssetError;
use regtoken_core::{Address, EventLog, RestrictionCode, U256};
use regtoken_policy::{DefaultPolicyStore, ManualClock, PolicyStore};

use crate::common::{
    self, alice, bob, carol, operator, token, whole, HOLDING_PERIOD, NOW,
};

fn check_at(at: u64, from: Address, to: Address, amount: U256) -> (RestrictionCode, i32) {
    let dir = common::temp_data_dir();
    let loader = common::write_config(&dir, &common::sample_config_toml());
    let args = CheckArgs {
        token: token(),
        from,
        to,
        amount,
        at: Some(at),
        execute: false,
        format: OutputFormat::Text,
    };
    let outcome = CheckCommand::new(args, loader).execute().unwrap();
    (outcome.code, outcome.exit_code())
}

fn sample_config() -> Config {
    toml::from_str(&common::sample_config_toml()).unwrap()
}

fn deploy(clock: &ManualClock, log: &EventLog) -> System {
    let config = sample_config();
    Genesis::new(&config)
        .with_clock(Arc::new(clock.clone()))
        .with_sink(Arc::new(log.clone()))
        .build()
        .unwrap()
}

// ============================================================================
// Pre-flight through the check command
// ============================================================================

#[test]
fn test_check_verdicts_from_config_file() {
    assert_eq!(
        check_at(NOW, operator(), bob(), whole(1)),
        (RestrictionCode::Success, EXIT_SUCCESS)
    );
    assert_eq!(
        check_at(NOW, operator(), alice(), whole(1)),
        (RestrictionCode::ReceiveNotAllowed, EXIT_RESTRICTED)
    );
    assert_eq!(
        check_at(NOW, bob(), operator(), whole(1)).0,
        RestrictionCode::SendNotAllowed
    );
    assert_eq!(
        check_at(NOW, carol(), carol(), whole(1)).0,
        RestrictionCode::SendNotAllowed
    );
    assert_eq!(
        check_at(NOW, operator(), bob(), whole(1) / U256::from(2u64)).0,
        RestrictionCode::NotDivisible
    );
}

#[test]
fn test_check_holding_period_boundary() {
    let start = NOW - 100;
    assert_eq!(
        check_at(start + HOLDING_PERIOD - 1, alice(), bob(), whole(1)).0,
        RestrictionCode::HoldingPeriodActive
    );
    assert_eq!(
        check_at(start + HOLDING_PERIOD, alice(), bob(), whole(1)).0,
        RestrictionCode::Success
    );
}

#[test]
fn test_check_honours_policy_section() {
    let dir = common::temp_data_dir();
    let contents = format!(
        "[policy]\nminimal_transfer = \"0x{:x}\"\n{}",
        whole(2),
        common::sample_config_toml()
    );
    let loader = common::write_config(&dir, &contents);
    let args = CheckArgs {
        token: token(),
        from: operator(),
        to: bob(),
        amount: whole(1),
        at: Some(NOW),
        execute: false,
        format: OutputFormat::Json,
    };
    let outcome = CheckCommand::new(args, loader).execute().unwrap();
    assert_eq!(outcome.code, RestrictionCode::BelowMinimumDenomination);
}

// ============================================================================
// Genesis system
// ============================================================================

#[test]
fn test_genesis_balances_and_transfer() {
    let clock = ManualClock::new(NOW);
    let log = EventLog::new();
    let system = deploy(&clock, &log);
    let asset = system.asset(token()).unwrap();

    assert_eq!(asset.total_supply().unwrap(), whole(105));
    asset.transfer(operator(), bob(), whole(10)).unwrap();
    assert_eq!(asset.balance_of(operator()).unwrap(), whole(90));
    assert_eq!(asset.balance_of(bob()).unwrap(), whole(10));

    let err = asset.transfer(alice(), bob(), whole(1)).unwrap_err();
    assert_eq!(err, AssetError::restricted(RestrictionCode::HoldingPeriodActive));
    assert_eq!(asset.balance_of(alice()).unwrap(), whole(5));
    assert_eq!(log.names().last(), Some(&"restriction-detected"));

    clock.advance(HOLDING_PERIOD);
    asset.transfer(alice(), bob(), whole(1)).unwrap();
    assert_eq!(asset.balance_of(bob()).unwrap(), whole(11));
}

#[test]
fn test_registry_swap_changes_verdicts_only() {
    let clock = ManualClock::new(NOW);
    let log = EventLog::new();
    let system = deploy(&clock, &log);
    let asset = system.asset(token()).unwrap();
    let address_before = asset.address();
    let supply_before = asset.total_supply().unwrap();

    assert_eq!(
        system.check(token(), operator(), bob(), whole(1)).unwrap(),
        RestrictionCode::Success
    );

    let replacement = Arc::new(
        DefaultPolicyStore::new(Address::with_last_byte(0x22), operator())
            .with_clock(Arc::new(clock.clone())),
    );
    system
        .registry()
        .replace_store(operator(), replacement.clone())
        .unwrap();

    assert_eq!(
        system.check(token(), operator(), bob(), whole(1)).unwrap(),
        RestrictionCode::SendNotAllowed
    );
    assert_eq!(asset.address(), address_before);
    assert_eq!(asset.total_supply().unwrap(), supply_before);
    assert_eq!(log.names().last(), Some(&"store-replaced"));

    replacement
        .set_permission(operator(), token(), operator(), regtoken_core::Permission::TRANSFER)
        .unwrap();
    replacement
        .set_permission(operator(), token(), bob(), regtoken_core::Permission::RECEIVE)
        .unwrap();
    assert_eq!(
        system.check(token(), operator(), bob(), whole(1)).unwrap(),
        RestrictionCode::Success
    );
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_restricted_execute_leaves_balances(amount in common::amount(), receiver in common::address()) {
        let clock = ManualClock::new(NOW);
        let system = deploy(&clock, &EventLog::new());
        let asset = system.asset(token()).unwrap();
        let code = system.check(token(), alice(), receiver, amount).unwrap();
        prop_assert_ne!(code, RestrictionCode::Success);

        let before = (asset.balance_of(alice()).unwrap(), asset.balance_of(receiver).unwrap());
        let err = asset.transfer(alice(), receiver, amount).unwrap_err();
        prop_assert_eq!(err, AssetError::restricted(code));
        prop_assert_eq!(
            (asset.balance_of(alice()).unwrap(), asset.balance_of(receiver).unwrap()),
            before
        );
    }

    #[test]
    fn prop_preflight_matches_execution(amount in common::amount()) {
        let clock = ManualClock::new(NOW);
        let system = deploy(&clock, &EventLog::new());
        let asset = system.asset(token()).unwrap();
        let code = system.check(token(), operator(), bob(), amount).unwrap();

        match asset.transfer(operator(), bob(), amount) {
            Ok(()) => prop_assert_eq!(code, RestrictionCode::Success),
            Err(AssetError::Restricted { code: aborted }) => prop_assert_eq!(aborted, code),
            Err(AssetError::Ledger(_)) => {
                prop_assert_eq!(code, RestrictionCode::Success);
                prop_assert!(amount > whole(100));
            }
            Err(e) => prop_assert!(false, "unexpected error: {e}"),
        }
    }
}
