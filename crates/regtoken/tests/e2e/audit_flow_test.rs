//! Journaled `check --execute` runs and chain verification.

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    clippy::indexing_slicing
)]

use std::fs;

use regtoken::audit::{parse_key, verify_chain, AuditEntry};
use regtoken::cli::commands::{AuditVerifyCommand, CheckCommand};
use regtoken::cli::{CheckArgs, OutputFormat};
use regtoken_core::config_loader::ConfigLoader;
use regtoken_core::{Address, RestrictionCode, U256};
use tempfile::TempDir;

use crate::common::{self, alice, bob, operator, token, whole, NOW};

const KEY_HEX: &str = "0707070707070707070707070707070707070707070707070707070707070707";

fn setup() -> (TempDir, ConfigLoader) {
    let dir = common::temp_data_dir();
    let contents = common::with_audit(&common::sample_config_toml(), &dir, KEY_HEX);
    let loader = common::write_config(&dir, &contents);
    (dir, loader)
}

fn execute(loader: &ConfigLoader, from: Address, to: Address, amount: U256) -> RestrictionCode {
    let args = CheckArgs {
        token: token(),
        from,
        to,
        amount,
        at: Some(NOW),
        execute: true,
        format: OutputFormat::Text,
    };
    CheckCommand::new(args, loader.clone()).execute().unwrap().code
}

fn entries(dir: &TempDir) -> Vec<AuditEntry> {
    fs::read_to_string(dir.path().join("audit.jsonl"))
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[test]
fn test_execute_journals_genesis_and_transfer() {
    let (dir, loader) = setup();
    assert_eq!(execute(&loader, operator(), bob(), whole(1)), RestrictionCode::Success);

    let names: Vec<String> = entries(&dir).into_iter().map(|e| e.event).collect();
    assert_eq!(names.first().map(String::as_str), Some("permission-changed"));
    assert_eq!(names.last().map(String::as_str), Some("transfer"));
    assert!(names.iter().any(|n| n == "holding-period-changed"));
    assert_eq!(names.iter().filter(|n| *n == "mint").count(), 2);
}

#[test]
fn test_restricted_execute_journals_diagnostic() {
    let (dir, loader) = setup();
    assert_eq!(
        execute(&loader, alice(), bob(), whole(1)),
        RestrictionCode::HoldingPeriodActive
    );

    let last = entries(&dir).pop().unwrap();
    assert_eq!(last.event, "restriction-detected");
    assert_eq!(last.fields["code"], 5);
}

#[test]
fn test_runs_extend_one_chain() {
    let (dir, loader) = setup();
    execute(&loader, operator(), bob(), whole(1));
    let first_run = entries(&dir).len();
    execute(&loader, alice(), bob(), whole(1));

    let all = entries(&dir);
    assert!(all.len() > first_run);
    assert_eq!(all[first_run].prev_hmac, all[first_run - 1].hmac);

    let key = parse_key(KEY_HEX).unwrap();
    let result = verify_chain(&dir.path().join("audit.jsonl"), &key).unwrap();
    assert!(result.valid);
    assert_eq!(result.entries_checked, all.len() as u64);
}

#[test]
fn test_preflight_without_execute_writes_nothing() {
    let (dir, loader) = setup();
    let args = CheckArgs {
        token: token(),
        from: operator(),
        to: bob(),
        amount: whole(1),
        at: Some(NOW),
        execute: false,
        format: OutputFormat::Text,
    };
    CheckCommand::new(args, loader).execute().unwrap();
    assert!(!dir.path().join("audit.jsonl").exists());
}

#[test]
fn test_verify_command_detects_tampering() {
    let (dir, loader) = setup();
    execute(&loader, operator(), bob(), whole(1));

    let (_, result) = AuditVerifyCommand::new(None, loader.clone()).verify().unwrap();
    assert!(result.valid);

    let path = dir.path().join("audit.jsonl");
    let tampered = fs::read_to_string(&path)
        .unwrap()
        .replacen("\"mint\"", "\"burn\"", 1);
    fs::write(&path, tampered).unwrap();

    let (_, result) = AuditVerifyCommand::new(None, loader).verify().unwrap();
    assert!(!result.valid);
    assert!(result.first_invalid_seq.is_some());
}
