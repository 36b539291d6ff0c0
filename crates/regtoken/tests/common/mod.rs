//! # Test Utilities for regtoken
//!
//! - [`temp_data_dir`] - Isolated temporary directory
//! - [`write_config`] - Write a `config.toml` and return its loader
//! - [`sample_config_toml`] - A one-token deployment used across tests
//!
//! Proptest strategies: [`amount`], [`permission_bits`], [`address`].

#![allow(dead_code)]
#![allow(clippy::expect_used)]

use proptest::prelude::*;
use regtoken_core::config_loader::ConfigLoader;
use regtoken_core::{Address, U256};
use tempfile::TempDir;

/// `2023-11-14T22:13:20Z`.
pub const NOW: u64 = 1_700_000_000;

/// 365 days + 1 second.
pub const HOLDING_PERIOD: u64 = 31_536_001;

pub const TOKEN: &str = "0x00000000000000000000000000000000000000aa";
pub const OPERATOR: &str = "0x0000000000000000000000000000000000000001";
pub const ALICE: &str = "0x00000000000000000000000000000000000000a1";
pub const BOB: &str = "0x00000000000000000000000000000000000000b2";
pub const CAROL: &str = "0x00000000000000000000000000000000000000c3";

pub fn token() -> Address {
    TOKEN.parse().expect("valid address")
}

pub fn operator() -> Address {
    OPERATOR.parse().expect("valid address")
}

pub fn alice() -> Address {
    ALICE.parse().expect("valid address")
}

pub fn bob() -> Address {
    BOB.parse().expect("valid address")
}

pub fn carol() -> Address {
    CAROL.parse().expect("valid address")
}

/// `units` whole tokens of an 18-decimal asset.
pub fn whole(units: u64) -> U256 {
    U256::from(units) * U256::from(10u64).pow(U256::from(18u64))
}

/// Create an isolated temporary directory, removed on drop.
pub fn temp_data_dir() -> TempDir {
    TempDir::new().expect("Failed to create temp directory")
}

/// Write `contents` as `config.toml` under `dir`.
pub fn write_config(dir: &TempDir, contents: &str) -> ConfigLoader {
    let loader = ConfigLoader::with_base_dir(dir.path().to_path_buf());
    std::fs::write(loader.config_path(), contents).expect("Failed to write config");
    loader
}

/// Operator holds everything and may send or receive; Alice may send and
/// is locked up since `NOW - 100`; Bob may only receive; Carol has nothing.
pub fn sample_config_toml() -> String {
    format!(
        r#"
[deployment]
operator = "{OPERATOR}"
store = "0x0000000000000000000000000000000000000002"
registry = "0x0000000000000000000000000000000000000003"

[[tokens]]
address = "{TOKEN}"
name = "Security Token Test"
symbol = "STT"

[[tokens.participants]]
address = "{OPERATOR}"
permission = 3
balance = "100000000000000000000"

[[tokens.participants]]
address = "{ALICE}"
permission = 1
holding_period_start = {start}
balance = "5000000000000000000"

[[tokens.participants]]
address = "{BOB}"
permission = 2
"#,
        start = NOW - 100
    )
}

/// Append an `[audit]` section journaling to `dir/audit.jsonl`.
pub fn with_audit(config: &str, dir: &TempDir, key_hex: &str) -> String {
    format!(
        "{config}\n[audit]\nenabled = true\npath = \"{}\"\nkey_hex = \"{key_hex}\"\n",
        dir.path().join("audit.jsonl").display()
    )
}

// ============================================================================
// Proptest strategies
// ============================================================================

/// Any amount up to `2^128`.
pub fn amount() -> impl Strategy<Value = U256> {
    any::<u128>().prop_map(U256::from)
}

/// Any raw permission bitmask, including bits the evaluator ignores.
pub fn permission_bits() -> impl Strategy<Value = u8> {
    any::<u8>()
}

/// Any non-null address.
pub fn address() -> impl Strategy<Value = Address> {
    any::<[u8; 20]>()
        .prop_filter("non-null", |bytes| bytes.iter().any(|b| *b != 0))
        .prop_map(Address::from)
}
