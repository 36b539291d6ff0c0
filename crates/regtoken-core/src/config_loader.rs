//! Loading and saving `~/.regtoken/config.toml`.
//!
//! Handles `~` expansion and falls back to [`Config::default`] when the file
//! does not exist.
//!
//! ```no_run
//! use regtoken_core::config_loader::ConfigLoader;
//!
//! let loader = ConfigLoader::new().expect("no home directory");
//! if !loader.exists() {
//!     loader.write_default().expect("failed to write default config");
//! }
//! let config = loader.load().expect("failed to load config");
//! println!("holding period: {}s", config.policy.holding_period_secs);
//! ```

use crate::config::Config;
use crate::error::ConfigError;
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the configuration file inside the base directory.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Base directory name within the home directory.
const BASE_DIR_NAME: &str = ".regtoken";

/// Reads and writes the configuration file under a base directory.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    base_dir: PathBuf,
}

impl ConfigLoader {
    /// Loader rooted at `~/.regtoken`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoHomeDirectory`] if the home directory is unknown.
    pub fn new() -> Result<Self, ConfigError> {
        Ok(Self {
            base_dir: default_base_dir()?,
        })
    }

    /// Loader rooted at a custom directory.
    #[must_use]
    pub const fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Loader for an explicit file path; its parent becomes the base directory.
    ///
    /// The file name must be `config.toml`, otherwise the parent directory's
    /// `config.toml` would be read instead.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for a path with another file name.
    pub fn for_file(path: &Path) -> Result<Self, ConfigError> {
        if path.file_name().and_then(|n| n.to_str()) != Some(CONFIG_FILE_NAME) {
            return Err(ConfigError::invalid_value("config", path.display().to_string()));
        }
        let base_dir = path
            .parent()
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        Ok(Self { base_dir })
    }

    /// Full path of the configuration file.
    #[must_use]
    pub fn config_path(&self) -> PathBuf {
        self.base_dir.join(CONFIG_FILE_NAME)
    }

    /// The base directory.
    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Load and validate the configuration, or return defaults if the file is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or fails validation.
    pub fn load(&self) -> Result<Config, ConfigError> {
        let config_path = self.config_path();
        if !config_path.exists() {
            return Ok(Config::default());
        }
        Self::load_from_path(&config_path)
    }

    /// Load and validate the configuration, failing if the file is missing.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::FileNotFound`] if the file does not exist, or any
    /// error [`ConfigLoader::load`] can return.
    pub fn load_required(&self) -> Result<Config, ConfigError> {
        let config_path = self.config_path();
        if !config_path.exists() {
            return Err(ConfigError::file_not_found(
                config_path.display().to_string(),
            ));
        }
        Self::load_from_path(&config_path)
    }

    /// Serialize `config` to the configuration file, creating the base directory.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or any filesystem operation fails.
    pub fn save(&self, config: &Config) -> Result<(), ConfigError> {
        self.ensure_base_dir()?;
        let config_path = self.config_path();

        let toml_str = toml::to_string_pretty(config).map_err(|e| {
            ConfigError::parse_failed(format!("failed to serialize configuration: {e}"))
        })?;

        fs::write(&config_path, toml_str).map_err(|e| {
            ConfigError::io(
                format!("failed to write configuration to {}", config_path.display()),
                e,
            )
        })
    }

    /// Write the commented default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any filesystem operation fails.
    pub fn write_default(&self) -> Result<(), ConfigError> {
        self.ensure_base_dir()?;
        let config_path = self.config_path();

        fs::write(&config_path, Config::default_toml()).map_err(|e| {
            ConfigError::io(
                format!(
                    "failed to write default configuration to {}",
                    config_path.display()
                ),
                e,
            )
        })
    }

    /// Whether the configuration file exists.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.config_path().exists()
    }

    fn ensure_base_dir(&self) -> Result<(), ConfigError> {
        if !self.base_dir.exists() {
            fs::create_dir_all(&self.base_dir).map_err(|e| {
                ConfigError::io(
                    format!(
                        "failed to create base directory {}",
                        self.base_dir.display()
                    ),
                    e,
                )
            })?;
        }
        Ok(())
    }

    fn load_from_path(path: &Path) -> Result<Config, ConfigError> {
        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::io(format!("failed to read {}", path.display()), e))?;

        let config: Config = toml::from_str(&content).map_err(|e| {
            ConfigError::parse_failed(format!("invalid TOML in {}: {e}", path.display()))
        })?;

        config.validate()?;
        Ok(config)
    }
}

/// Expand a leading `~` to the home directory.
///
/// # Errors
///
/// Returns [`ConfigError::NoHomeDirectory`] if expansion is needed and the home
/// directory is unknown.
pub fn expand_path(path: &str) -> Result<PathBuf, ConfigError> {
    if let Some(rest) = path.strip_prefix("~/") {
        let home = dirs::home_dir().ok_or_else(ConfigError::no_home_directory)?;
        Ok(home.join(rest))
    } else if path == "~" {
        dirs::home_dir().ok_or_else(ConfigError::no_home_directory)
    } else {
        Ok(PathBuf::from(path))
    }
}

/// `~/.regtoken`.
///
/// # Errors
///
/// Returns [`ConfigError::NoHomeDirectory`] if the home directory is unknown.
pub fn default_base_dir() -> Result<PathBuf, ConfigError> {
    let home = dirs::home_dir().ok_or_else(ConfigError::no_home_directory)?;
    Ok(home.join(BASE_DIR_NAME))
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::needless_raw_string_hashes
    )]

    use super::*;
    use alloy_primitives::{Address, U256};
    use tempfile::TempDir;

    // -------------------------------------------------------------------------
    // expand_path tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_expand_path_with_tilde_prefix() {
        let path = expand_path("~/.regtoken/config.toml").expect("should succeed");
        let home = dirs::home_dir().expect("home dir should exist");
        assert_eq!(path, home.join(".regtoken/config.toml"));
    }

    #[test]
    fn test_expand_path_with_tilde_only() {
        let path = expand_path("~").expect("should succeed");
        assert_eq!(path, dirs::home_dir().expect("home dir should exist"));
    }

    #[test]
    fn test_expand_path_leaves_other_paths_alone() {
        assert_eq!(
            expand_path("/etc/regtoken/config.toml").unwrap(),
            PathBuf::from("/etc/regtoken/config.toml")
        );
        assert_eq!(
            expand_path("/path/to/~/config.toml").unwrap(),
            PathBuf::from("/path/to/~/config.toml")
        );
    }

    // -------------------------------------------------------------------------
    // ConfigLoader tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_config_path() {
        let loader = ConfigLoader::with_base_dir(PathBuf::from("/test/base"));
        assert_eq!(loader.config_path(), PathBuf::from("/test/base/config.toml"));
    }

    #[test]
    fn test_for_file_requires_config_toml() {
        let loader = ConfigLoader::for_file(Path::new("/srv/regtoken/config.toml")).unwrap();
        assert_eq!(loader.base_dir(), Path::new("/srv/regtoken"));
        assert!(ConfigLoader::for_file(Path::new("/srv/regtoken/other.toml")).is_err());
    }

    #[test]
    fn test_load_with_missing_file_returns_defaults() {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let loader = ConfigLoader::with_base_dir(temp_dir.path().to_path_buf());

        assert!(!loader.exists());
        assert_eq!(loader.load().unwrap(), Config::default());
    }

    #[test]
    fn test_load_required_with_missing_file_fails() {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let loader = ConfigLoader::with_base_dir(temp_dir.path().to_path_buf());

        assert!(matches!(
            loader.load_required(),
            Err(ConfigError::FileNotFound { .. })
        ));
    }

    #[test]
    fn test_write_default_then_load() {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let loader = ConfigLoader::with_base_dir(temp_dir.path().join("nested"));

        loader.write_default().unwrap();
        assert!(loader.exists());
        assert_eq!(loader.load_required().unwrap(), Config::default());
    }

    #[test]
    fn test_save_then_load_preserves_tokens() {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let loader = ConfigLoader::with_base_dir(temp_dir.path().to_path_buf());

        let config = Config::default().with_token(
            crate::config::TokenConfig::new(Address::with_last_byte(0xaa), "R-Token", "RTKN")
                .with_participant(
                    crate::config::ParticipantConfig::new(Address::with_last_byte(1), 3)
                        .with_balance(U256::from(42u8)),
                ),
        );
        loader.save(&config).unwrap();
        assert_eq!(loader.load().unwrap(), config);
    }

    #[test]
    fn test_load_rejects_invalid_toml() {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        fs::write(temp_dir.path().join("config.toml"), "[policy\nbroken").unwrap();

        let loader = ConfigLoader::with_base_dir(temp_dir.path().to_path_buf());
        assert!(matches!(loader.load(), Err(ConfigError::ParseFailed { .. })));
    }

    #[test]
    fn test_load_runs_validation() {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        fs::write(
            temp_dir.path().join("config.toml"),
            r#"
[policy]
holding_period_secs = 0
"#,
        )
        .unwrap();

        let loader = ConfigLoader::with_base_dir(temp_dir.path().to_path_buf());
        assert!(matches!(loader.load(), Err(ConfigError::InvalidValue { .. })));
    }
}
