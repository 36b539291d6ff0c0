//! Configuration types for the regtoken compliance engine.
//!
//! Configuration is stored in TOML format at `~/.regtoken/config.toml`. Besides
//! the tunable policy constants it describes a genesis deployment: the operator
//! that owns the store, registry and assets, and every token with its initial
//! compliance state and balances.
//!
//! # Examples
//!
//! ```
//! use regtoken_core::config::Config;
//!
//! let config = Config::default();
//! assert_eq!(config.policy.holding_period_secs, 31_536_001);
//! assert!(config.tokens.is_empty());
//!
//! let parsed: Config = toml::from_str(&Config::default_toml()).unwrap();
//! assert_eq!(parsed, config);
//! ```
//!
//! # Default TOML Output
//!
//! ```toml
//! [policy]
//! holding_period_secs = 31536001
//! minimal_transfer = "1000000000000"
//!
//! [logging]
//! level = "warn"
//! format = "pretty"
//!
//! [audit]
//! enabled = false
//! path = "~/.regtoken/audit/audit.jsonl"
//!
//! [deployment]
//! operator = "0x0000000000000000000000000000000000000001"
//! store = "0x0000000000000000000000000000000000000002"
//! registry = "0x0000000000000000000000000000000000000003"
//! ```

use crate::error::ConfigError;
use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Largest decimals value for which `10^decimals` fits in 256 bits.
pub const MAX_DECIMALS: u8 = 77;

/// Accepted `logging.level` values.
pub const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Accepted `logging.format` values.
pub const LOG_FORMATS: [&str; 3] = ["pretty", "json", "compact"];

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Policy constants.
    #[serde(default)]
    pub policy: PolicyConfig,

    /// Log output.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Tamper-evident event journal.
    #[serde(default)]
    pub audit: AuditConfig,

    /// Identities of the deployed components.
    #[serde(default)]
    pub deployment: DeploymentConfig,

    /// Tokens issued at genesis.
    #[serde(default)]
    pub tokens: Vec<TokenConfig>,
}

// ============================================================================
// PolicyConfig
// ============================================================================

/// 365 days plus the one second grace of the reference policy.
const fn default_holding_period_secs() -> u64 {
    365 * 24 * 60 * 60 + 1
}

/// One micro-unit of an 18-decimal token.
fn default_minimal_transfer() -> U256 {
    U256::from(1_000_000_000_000u64)
}

/// Tunable constants of the default policy store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Length of a sender lock-up, measured from its anchor timestamp.
    #[serde(default = "default_holding_period_secs")]
    pub holding_period_secs: u64,

    /// Smallest non-zero amount, in base units, that may be transferred.
    #[serde(default = "default_minimal_transfer")]
    pub minimal_transfer: U256,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            holding_period_secs: default_holding_period_secs(),
            minimal_transfer: default_minimal_transfer(),
        }
    }
}

impl PolicyConfig {
    /// Set the holding period.
    #[must_use]
    pub const fn with_holding_period_secs(mut self, secs: u64) -> Self {
        self.holding_period_secs = secs;
        self
    }

    /// Set the minimal transfer amount.
    #[must_use]
    pub const fn with_minimal_transfer(mut self, amount: U256) -> Self {
        self.minimal_transfer = amount;
        self
    }
}

// ============================================================================
// LoggingConfig
// ============================================================================

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

/// Log output settings. `RUST_LOG` overrides `level` at runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// One of [`LOG_LEVELS`].
    #[serde(default = "default_log_level")]
    pub level: String,

    /// One of [`LOG_FORMATS`].
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Also append logs to this file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
        }
    }
}

// ============================================================================
// AuditConfig
// ============================================================================

fn default_audit_path() -> String {
    "~/.regtoken/audit/audit.jsonl".to_string()
}

/// Settings for the HMAC-chained audit journal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Journal every emitted event.
    #[serde(default)]
    pub enabled: bool,

    /// JSONL file the journal appends to.
    #[serde(default = "default_audit_path")]
    pub path: String,

    /// Hex-encoded HMAC key. `REGTOKEN_AUDIT_KEY` takes precedence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_hex: Option<String>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: default_audit_path(),
            key_hex: None,
        }
    }
}

// ============================================================================
// DeploymentConfig
// ============================================================================

const fn default_operator() -> Address {
    Address::with_last_byte(1)
}

const fn default_store() -> Address {
    Address::with_last_byte(2)
}

const fn default_registry() -> Address {
    Address::with_last_byte(3)
}

/// Identities of the genesis deployment.
///
/// The operator deploys everything and therefore starts as owner and admin of
/// the policy store, owner of the registry and owner of every token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentConfig {
    /// Deployer identity.
    #[serde(default = "default_operator")]
    pub operator: Address,

    /// Address of the default policy store.
    #[serde(default = "default_store")]
    pub store: Address,

    /// Address of the policy registry.
    #[serde(default = "default_registry")]
    pub registry: Address,
}

impl Default for DeploymentConfig {
    fn default() -> Self {
        Self {
            operator: default_operator(),
            store: default_store(),
            registry: default_registry(),
        }
    }
}

// ============================================================================
// TokenConfig
// ============================================================================

const fn default_decimals() -> u8 {
    18
}

/// One token issued at genesis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenConfig {
    /// Token address.
    pub address: Address,

    /// Display name.
    pub name: String,

    /// Ticker symbol.
    pub symbol: String,

    /// Decimal places; one whole unit is `10^decimals` base units.
    #[serde(default = "default_decimals")]
    pub decimals: u8,

    /// Start frozen.
    #[serde(default)]
    pub locked: bool,

    /// Allow fractional-unit transfers.
    #[serde(default)]
    pub partial_transfers: bool,

    /// Participants with permissions, lock-ups or initial balances.
    #[serde(default)]
    pub participants: Vec<ParticipantConfig>,
}

impl TokenConfig {
    /// Create a token with default flags and no participants.
    #[must_use]
    pub fn new(address: Address, name: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self {
            address,
            name: name.into(),
            symbol: symbol.into(),
            decimals: default_decimals(),
            locked: false,
            partial_transfers: false,
            participants: Vec::new(),
        }
    }

    /// Add a participant.
    #[must_use]
    pub fn with_participant(mut self, participant: ParticipantConfig) -> Self {
        self.participants.push(participant);
        self
    }
}

/// Genesis state of one participant of a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantConfig {
    /// Participant address.
    pub address: Address,

    /// Raw permission bitmask (1 = send, 2 = receive).
    #[serde(default)]
    pub permission: u8,

    /// Holding-period anchor in unix seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub holding_period_start: Option<u64>,

    /// Balance minted at genesis, in base units.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance: Option<U256>,
}

impl ParticipantConfig {
    /// Create a participant with the given permission bits.
    #[must_use]
    pub const fn new(address: Address, permission: u8) -> Self {
        Self {
            address,
            permission,
            holding_period_start: None,
            balance: None,
        }
    }

    /// Set the genesis balance.
    #[must_use]
    pub const fn with_balance(mut self, balance: U256) -> Self {
        self.balance = Some(balance);
        self
    }

    /// Set the holding-period anchor.
    #[must_use]
    pub const fn with_holding_period_start(mut self, start: u64) -> Self {
        self.holding_period_start = Some(start);
        self
    }
}

// ============================================================================
// Config
// ============================================================================

impl Config {
    /// Look up a genesis token by address.
    #[must_use]
    pub fn token(&self, address: Address) -> Option<&TokenConfig> {
        self.tokens.iter().find(|t| t.address == address)
    }

    /// Add a genesis token.
    #[must_use]
    pub fn with_token(mut self, token: TokenConfig) -> Self {
        self.tokens.push(token);
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.policy.holding_period_secs == 0 {
            return Err(ConfigError::invalid_value("policy.holding_period_secs", "0"));
        }

        if !LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::invalid_value("logging.level", &self.logging.level));
        }
        if !LOG_FORMATS.contains(&self.logging.format.as_str()) {
            return Err(ConfigError::invalid_value("logging.format", &self.logging.format));
        }

        if self.audit.enabled && self.audit.path.is_empty() {
            return Err(ConfigError::invalid_value("audit.path", "<empty>"));
        }

        let d = &self.deployment;
        for (field, address) in [
            ("deployment.operator", d.operator),
            ("deployment.store", d.store),
            ("deployment.registry", d.registry),
        ] {
            if address == Address::ZERO {
                return Err(ConfigError::invalid_value(field, address.to_string()));
            }
        }
        if d.store == d.registry {
            return Err(ConfigError::invalid_value("deployment.registry", d.registry.to_string()));
        }

        let mut seen = HashSet::new();
        for token in &self.tokens {
            if token.address == Address::ZERO || !seen.insert(token.address) {
                return Err(ConfigError::invalid_value("tokens.address", token.address.to_string()));
            }
            if token.symbol.is_empty() {
                return Err(ConfigError::invalid_value("tokens.symbol", "<empty>"));
            }
            if token.decimals > MAX_DECIMALS {
                return Err(ConfigError::invalid_value("tokens.decimals", token.decimals.to_string()));
            }
            for participant in &token.participants {
                if participant.address == Address::ZERO {
                    return Err(ConfigError::invalid_value(
                        "tokens.participants.address",
                        participant.address.to_string(),
                    ));
                }
            }
        }

        Ok(())
    }

    /// Generates the default configuration as a TOML string.
    #[must_use]
    pub fn default_toml() -> String {
        r#"[policy]
# Sender lock-up length: 365 days + 1 second.
holding_period_secs = 31536001
# Smallest non-zero transfer, in base units.
minimal_transfer = "1000000000000"

[logging]
level = "warn"
format = "pretty"
# file = "~/.regtoken/logs/regtoken.log"

[audit]
enabled = false
path = "~/.regtoken/audit/audit.jsonl"

[deployment]
operator = "0x0000000000000000000000000000000000000001"
store = "0x0000000000000000000000000000000000000002"
registry = "0x0000000000000000000000000000000000000003"

# [[tokens]]
# address = "0x00000000000000000000000000000000000000aa"
# name = "Security Token Test"
# symbol = "STT"
# decimals = 18
# locked = false
# partial_transfers = false
#
# [[tokens.participants]]
# address = "0x0000000000000000000000000000000000000001"
# permission = 3
# balance = "100000000000000000000"
"#
        .to_string()
    }
}
