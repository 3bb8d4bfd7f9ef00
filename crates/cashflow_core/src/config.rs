//! Engine configuration.
//!
//! # Responsibility
//! - Hold the reconciliation tolerances, the eager materialization horizon
//!   and logging settings.
//! - Load them from TOML with per-key defaults.
//!
//! # Invariants
//! - Defaults reproduce the historical behavior: 6 days (weekly), 25 days
//!   (monthly/yearly), 3 days (dedup safety net), 6 months horizon.
//! - `dedup_days` never exceeds the smallest match tolerance.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::model::rule::Frequency;

pub const DEFAULT_WEEKLY_TOLERANCE_DAYS: u32 = 6;
pub const DEFAULT_MONTHLY_TOLERANCE_DAYS: u32 = 25;
pub const DEFAULT_DEDUP_TOLERANCE_DAYS: u32 = 3;
pub const DEFAULT_HORIZON_MONTHS: u32 = 6;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file `{path}`: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config value: {0}")]
    Invalid(String),
}

/// Day-distance windows used when matching real commitments to slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToleranceConfig {
    pub weekly_days: u32,
    /// Applies to monthly and yearly rules.
    pub monthly_days: u32,
    /// Second-pass filter window.
    pub dedup_days: u32,
}

impl Default for ToleranceConfig {
    fn default() -> Self {
        Self {
            weekly_days: DEFAULT_WEEKLY_TOLERANCE_DAYS,
            monthly_days: DEFAULT_MONTHLY_TOLERANCE_DAYS,
            dedup_days: DEFAULT_DEDUP_TOLERANCE_DAYS,
        }
    }
}

impl ToleranceConfig {
    /// Match window for one schedule slot of a rule with `frequency`.
    pub fn match_window_days(&self, frequency: Frequency) -> u32 {
        match frequency {
            Frequency::Weekly => self.weekly_days,
            Frequency::Monthly | Frequency::Yearly => self.monthly_days,
        }
    }

    /// Widest window any rule can match across.
    pub fn max_window_days(&self) -> u32 {
        self.weekly_days
            .max(self.monthly_days)
            .max(self.dedup_days)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterializationConfig {
    /// How far ahead of today eager recurring entries are written.
    pub horizon_months: u32,
}

impl Default for MaterializationConfig {
    fn default() -> Self {
        Self {
            horizon_months: DEFAULT_HORIZON_MONTHS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// Absolute directory for rolling log files; logging stays off when unset.
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: crate::logging::default_log_level().to_string(),
            dir: None,
        }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub tolerance: ToleranceConfig,
    pub materialization: MaterializationConfig,
    pub logging: LoggingConfig,
}

impl EngineConfig {
    /// Parses and validates TOML text. Missing keys keep their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let tolerance = &self.tolerance;
        let narrowest = tolerance.weekly_days.min(tolerance.monthly_days);
        if tolerance.dedup_days > narrowest {
            return Err(ConfigError::Invalid(format!(
                "tolerance.dedup_days ({}) must not exceed the narrowest match window ({narrowest})",
                tolerance.dedup_days
            )));
        }
        if self.materialization.horizon_months == 0 {
            return Err(ConfigError::Invalid(
                "materialization.horizon_months must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
