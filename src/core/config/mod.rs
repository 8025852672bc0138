//! core::config
//!
//! Engine configuration schema and loading.
//!
//! # Overview
//!
//! metabind has two configuration scopes:
//! - **Global**: User-level settings
//! - **Vault**: Settings for one document collection
//!
//! # Precedence
//!
//! Values are resolved in this order (later overrides earlier):
//! 1. Default values
//! 2. Global config file
//! 3. Vault config file
//! 4. CLI flags (not handled here)
//!
//! # Global Config Locations
//!
//! Searched in order:
//! 1. `$METABIND_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/metabind/config.toml`
//! 3. `~/.metabind/config.toml` (canonical write location)
//!
//! # Vault Config Locations
//!
//! Searched in order:
//! 1. `<vault>/.metabind/config.toml` (canonical)
//! 2. `<vault>/.metabind.toml` (compatibility, warns)
//!
//! # Example
//!
//! ```no_run
//! use metabind::core::config::Config;
//! use std::path::Path;
//!
//! let result = Config::load(Some(Path::new("/path/to/vault"))).unwrap();
//! let engine = result.config.engine();
//! println!("cycle every {:?}", engine.cycle_interval);
//! ```

pub mod schema;

pub use schema::{ConfigFile, EngineConfig};

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("failed to write config file '{path}': {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config value: {0}")]
    InvalidValue(String),

    #[error("home directory not found")]
    NoHomeDir,
}

/// Warnings generated during config loading.
#[derive(Debug, Clone)]
pub struct ConfigWarning {
    /// The warning message.
    pub message: String,
    /// The path that triggered the warning.
    pub path: PathBuf,
}

/// Result of loading configuration.
#[derive(Debug)]
pub struct ConfigLoadResult {
    /// The loaded configuration.
    pub config: Config,
    /// Any warnings generated during loading.
    pub warnings: Vec<ConfigWarning>,
}

/// Merged configuration from all sources.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Global configuration
    pub global: ConfigFile,
    /// Vault configuration (if a vault was given and has one)
    pub vault: Option<ConfigFile>,
    global_path: Option<PathBuf>,
    vault_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from default locations.
    ///
    /// If `vault_path` is provided, also loads vault-specific config.
    ///
    /// # Errors
    ///
    /// Returns an error if config files exist but cannot be parsed or hold
    /// invalid values. Missing config files are not an error.
    pub fn load(vault_path: Option<&Path>) -> Result<ConfigLoadResult, ConfigError> {
        let mut warnings = Vec::new();

        let (global, global_path) = Self::load_global()?;

        let (vault, vault_path_found) = match vault_path {
            Some(path) => Self::load_vault(path, &mut warnings)?,
            None => (None, None),
        };

        global.validate()?;
        if let Some(ref v) = vault {
            v.validate()?;
        }

        Ok(ConfigLoadResult {
            config: Config {
                global,
                vault,
                global_path,
                vault_path: vault_path_found,
            },
            warnings,
        })
    }

    fn load_global() -> Result<(ConfigFile, Option<PathBuf>), ConfigError> {
        if let Ok(path) = std::env::var("METABIND_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                let config = Self::read_config(&path)?;
                return Ok((config, Some(path)));
            }
        }

        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_home).join("metabind/config.toml");
            if path.exists() {
                let config = Self::read_config(&path)?;
                return Ok((config, Some(path)));
            }
        }

        if let Some(home) = dirs::home_dir() {
            let path = home.join(".metabind/config.toml");
            if path.exists() {
                let config = Self::read_config(&path)?;
                return Ok((config, Some(path)));
            }
        }

        Ok((ConfigFile::default(), None))
    }

    fn load_vault(
        vault_path: &Path,
        warnings: &mut Vec<ConfigWarning>,
    ) -> Result<(Option<ConfigFile>, Option<PathBuf>), ConfigError> {
        let canonical = Self::vault_config_path(vault_path);
        if canonical.exists() {
            let config = Self::read_config(&canonical)?;
            return Ok((Some(config), Some(canonical)));
        }

        let compat = vault_path.join(".metabind.toml");
        if compat.exists() {
            warnings.push(ConfigWarning {
                message: format!(
                    "Using deprecated config location. Please move to '{}'",
                    canonical.display()
                ),
                path: compat.clone(),
            });
            let config = Self::read_config(&compat)?;
            return Ok((Some(config), Some(compat)));
        }

        Ok((None, None))
    }

    fn read_config(path: &Path) -> Result<ConfigFile, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Get the canonical path for global config.
    ///
    /// Returns `~/.metabind/config.toml`.
    pub fn global_config_path() -> Result<PathBuf, ConfigError> {
        let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
        Ok(home.join(".metabind/config.toml"))
    }

    /// Get the canonical path for vault config.
    pub fn vault_config_path(vault_path: &Path) -> PathBuf {
        vault_path.join(".metabind/config.toml")
    }

    /// Write vault config atomically.
    ///
    /// Creates parent directories if needed. Writes to a temp file and
    /// renames it into place.
    pub fn write_vault(vault_path: &Path, config: &ConfigFile) -> Result<PathBuf, ConfigError> {
        config.validate()?;
        let path = Self::vault_config_path(vault_path);
        Self::write_config_atomic(&path, config)?;
        Ok(path)
    }

    fn write_config_atomic(path: &Path, config: &ConfigFile) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError {
                path: path.to_path_buf(),
                source: e,
            })?;
        }

        let contents =
            toml::to_string_pretty(config).map_err(|e| ConfigError::InvalidValue(e.to_string()))?;

        let temp_path = path.with_extension("toml.tmp");
        let mut file = fs::File::create(&temp_path).map_err(|e| ConfigError::WriteError {
            path: temp_path.clone(),
            source: e,
        })?;

        file.write_all(contents.as_bytes())
            .map_err(|e| ConfigError::WriteError {
                path: temp_path.clone(),
                source: e,
            })?;

        file.sync_all().map_err(|e| ConfigError::WriteError {
            path: temp_path.clone(),
            source: e,
        })?;

        fs::rename(&temp_path, path).map_err(|e| ConfigError::WriteError {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(())
    }

    /// The merged file view: vault values override global ones.
    pub fn merged(&self) -> ConfigFile {
        match &self.vault {
            Some(vault) => self.global.overlay(vault),
            None => self.global.clone(),
        }
    }

    /// Resolved engine settings with every default applied.
    pub fn engine(&self) -> EngineConfig {
        EngineConfig::from_file(&self.merged())
    }

    /// Get the path to the loaded global config file.
    pub fn global_config_loaded_from(&self) -> Option<&Path> {
        self.global_path.as_deref()
    }

    /// Get the path to the loaded vault config file.
    pub fn vault_config_loaded_from(&self) -> Option<&Path> {
        self.vault_path.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::StorageType;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn load_vault_config() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join(".metabind");
        fs::create_dir_all(&dir).unwrap();

        fs::write(
            dir.join("config.toml"),
            r#"
            cycle_interval_ms = 50
            default_storage_type = "memory"
            "#,
        )
        .unwrap();

        let result = Config::load(Some(temp.path())).unwrap();
        let engine = result.config.engine();

        assert_eq!(engine.cycle_interval, Duration::from_millis(50));
        assert_eq!(engine.default_storage_type, StorageType::Memory);
        assert!(result.warnings.is_empty());
        assert!(result.config.vault_config_loaded_from().is_some());
    }

    #[test]
    fn load_vault_compat_warns() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(".metabind.toml"), "flush_delay_cycles = 4").unwrap();

        let result = Config::load(Some(temp.path())).unwrap();

        assert_eq!(result.config.engine().flush_delay_cycles, 4);
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].message.contains("deprecated"));
    }

    #[test]
    fn write_vault_config_atomic() {
        let temp = TempDir::new().unwrap();
        let config = ConfigFile {
            cache_eviction_cycles: Some(3),
            ..Default::default()
        };

        let path = Config::write_vault(temp.path(), &config).unwrap();

        assert!(path.exists());
        let loaded = Config::load(Some(temp.path())).unwrap();
        assert_eq!(loaded.config.engine().cache_eviction_cycles, 3);
    }

    #[test]
    fn unknown_fields_rejected() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join(".metabind");
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("config.toml"),
            r#"
            cycle_interval_ms = 100
            unknown_field = true
            "#,
        )
        .unwrap();

        assert!(Config::load(Some(temp.path())).is_err());
    }

    #[test]
    fn invalid_storage_type_rejected() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join(".metabind");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("config.toml"), "default_storage_type = \"disk\"").unwrap();

        assert!(Config::load(Some(temp.path())).is_err());
    }

    #[test]
    fn precedence_vault_overrides_global() {
        let config = Config {
            global: ConfigFile {
                cycle_interval_ms: Some(1000),
                flush_delay_cycles: Some(5),
                ..Default::default()
            },
            vault: Some(ConfigFile {
                cycle_interval_ms: Some(20),
                ..Default::default()
            }),
            global_path: None,
            vault_path: None,
        };

        let engine = config.engine();
        assert_eq!(engine.cycle_interval, Duration::from_millis(20));
        assert_eq!(engine.flush_delay_cycles, 5);
    }
}
