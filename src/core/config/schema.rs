//! core::config::schema
//!
//! Configuration file schema.
//!
//! # Locations
//!
//! Global config (in order of precedence):
//! 1. `$METABIND_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/metabind/config.toml`
//! 3. `~/.metabind/config.toml` (canonical write location)
//!
//! Vault config: `<vault>/.metabind/config.toml`.
//!
//! # Validation
//!
//! Values are validated after parsing: intervals must be non-zero and the
//! default storage type must be a canonical identifier.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::core::types::StorageType;

/// Default reconciliation period.
pub const DEFAULT_CYCLE_INTERVAL_MS: u64 = 200;
/// Default number of idle cycles before an unobserved cache entry is dropped.
pub const DEFAULT_CACHE_EVICTION_CYCLES: u32 = 10;
/// Default number of cycles a pending write waits before reaching its backend.
pub const DEFAULT_FLUSH_DELAY_CYCLES: u32 = 1;

/// One configuration file. Every field is optional.
///
/// # Example
///
/// ```toml
/// cycle_interval_ms = 250
/// default_storage_type = "memory"
/// cache_eviction_cycles = 20
/// flush_delay_cycles = 2
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    /// Reconciliation period in milliseconds.
    pub cycle_interval_ms: Option<u64>,

    /// Storage type for declarations that do not name one.
    pub default_storage_type: Option<String>,

    /// Idle cycles before an unobserved cache entry is evicted.
    pub cache_eviction_cycles: Option<u32>,

    /// Cycles a write waits before it is persisted.
    pub flush_delay_cycles: Option<u32>,
}

impl ConfigFile {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cycle_interval_ms == Some(0) {
            return Err(ConfigError::InvalidValue(
                "cycle_interval_ms must be greater than 0".into(),
            ));
        }

        if self.cache_eviction_cycles == Some(0) {
            return Err(ConfigError::InvalidValue(
                "cache_eviction_cycles must be greater than 0".into(),
            ));
        }

        if let Some(storage_type) = &self.default_storage_type {
            storage_type
                .parse::<StorageType>()
                .map_err(|e| ConfigError::InvalidValue(e.to_string()))?;
        }

        Ok(())
    }

    /// Overlay `other` on top of `self`; fields set in `other` win.
    pub fn overlay(&self, other: &ConfigFile) -> ConfigFile {
        ConfigFile {
            cycle_interval_ms: other.cycle_interval_ms.or(self.cycle_interval_ms),
            default_storage_type: other
                .default_storage_type
                .clone()
                .or_else(|| self.default_storage_type.clone()),
            cache_eviction_cycles: other.cache_eviction_cycles.or(self.cache_eviction_cycles),
            flush_delay_cycles: other.flush_delay_cycles.or(self.flush_delay_cycles),
        }
    }
}

/// Resolved engine settings with defaults applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub cycle_interval: Duration,
    pub default_storage_type: StorageType,
    pub cache_eviction_cycles: u32,
    pub flush_delay_cycles: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cycle_interval: Duration::from_millis(DEFAULT_CYCLE_INTERVAL_MS),
            default_storage_type: StorageType::Frontmatter,
            cache_eviction_cycles: DEFAULT_CACHE_EVICTION_CYCLES,
            flush_delay_cycles: DEFAULT_FLUSH_DELAY_CYCLES,
        }
    }
}

impl EngineConfig {
    /// Apply a (validated) config file on top of the defaults.
    pub fn from_file(file: &ConfigFile) -> Self {
        let defaults = Self::default();
        Self {
            cycle_interval: file
                .cycle_interval_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.cycle_interval),
            default_storage_type: file
                .default_storage_type
                .as_deref()
                .and_then(StorageType::from_identifier)
                .unwrap_or(defaults.default_storage_type),
            cache_eviction_cycles: file
                .cache_eviction_cycles
                .unwrap_or(defaults.cache_eviction_cycles),
            flush_delay_cycles: file
                .flush_delay_cycles
                .unwrap_or(defaults.flush_delay_cycles),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_interval_rejected() {
        let file = ConfigFile {
            cycle_interval_ms: Some(0),
            ..Default::default()
        };
        assert!(file.validate().is_err());
    }

    #[test]
    fn unknown_storage_type_rejected() {
        let file = ConfigFile {
            default_storage_type: Some("scratch".into()),
            ..Default::default()
        };
        let err = file.validate().unwrap_err();
        assert!(err.to_string().contains("scratch"));
    }

    #[test]
    fn overlay_prefers_later_file() {
        let global = ConfigFile {
            cycle_interval_ms: Some(500),
            flush_delay_cycles: Some(3),
            ..Default::default()
        };
        let vault = ConfigFile {
            cycle_interval_ms: Some(100),
            ..Default::default()
        };
        let merged = global.overlay(&vault);
        assert_eq!(merged.cycle_interval_ms, Some(100));
        assert_eq!(merged.flush_delay_cycles, Some(3));
    }

    #[test]
    fn engine_defaults() {
        let engine = EngineConfig::from_file(&ConfigFile::default());
        assert_eq!(engine, EngineConfig::default());
        assert_eq!(engine.cycle_interval, Duration::from_millis(200));
    }
}
