use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::tier::DEFAULT_VOLUMETRIC_DIVISOR;

/// Deployment-level pricing knobs. Loaded from an optional TOML file with
/// `PARCELRATE_*` environment overrides applied on top.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PricingConfig {
    pub volumetric_divisor: Decimal,
    pub zone_cache_ttl_secs: u64,
    pub commission_cache_ttl_secs: u64,
    pub groupage_markup: GroupageMarkupMode,
    pub database: DatabaseConfig,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

/// Whether groupage category sums are priced at the backoffice base rate
/// only, or get the agency's override markup when one exists for the
/// category tariff. The source system did both depending on call site;
/// this stays a per-deployment flag pending product clarification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupageMarkupMode {
    BaseOnly,
    AgencyOverride,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            volumetric_divisor: Decimal::from(DEFAULT_VOLUMETRIC_DIVISOR),
            zone_cache_ttl_secs: 6 * 3600,
            commission_cache_ttl_secs: 3600,
            groupage_markup: GroupageMarkupMode::BaseOnly,
            database: DatabaseConfig {
                url: "sqlite://parcelrate.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
        }
    }
}

impl PricingConfig {
    pub fn zone_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.zone_cache_ttl_secs)
    }

    pub fn commission_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.commission_cache_ttl_secs)
    }

    /// Defaults, then the TOML file (when present), then env overrides.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(path) = config_path {
            config.apply_patch(read_patch(path)?)?;
        }
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) -> Result<(), ConfigError> {
        if let Some(divisor) = patch.volumetric_divisor {
            self.volumetric_divisor = divisor;
        }
        if let Some(secs) = patch.zone_cache_ttl_secs {
            self.zone_cache_ttl_secs = secs;
        }
        if let Some(secs) = patch.commission_cache_ttl_secs {
            self.commission_cache_ttl_secs = secs;
        }
        if let Some(mode) = patch.groupage_markup {
            self.groupage_markup = mode;
        }
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max) = database.max_connections {
                self.database.max_connections = max;
            }
            if let Some(secs) = database.timeout_secs {
                self.database.timeout_secs = secs;
            }
        }
        Ok(())
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(url) = env::var("PARCELRATE_DATABASE_URL") {
            self.database.url = url;
        }
        if let Ok(value) = env::var("PARCELRATE_GROUPAGE_MARKUP") {
            self.groupage_markup = value.parse()?;
        }
        if let Ok(value) = env::var("PARCELRATE_VOLUMETRIC_DIVISOR") {
            self.volumetric_divisor = value.parse().map_err(|_| ConfigError::InvalidEnvOverride {
                key: "PARCELRATE_VOLUMETRIC_DIVISOR".to_string(),
                value,
            })?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.volumetric_divisor <= Decimal::ZERO {
            return Err(ConfigError::Validation(format!(
                "volumetric divisor must be positive, got {}",
                self.volumetric_divisor
            )));
        }
        if self.database.url.is_empty() {
            return Err(ConfigError::Validation("database url must not be empty".to_string()));
        }
        Ok(())
    }
}

impl std::str::FromStr for GroupageMarkupMode {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "base_only" => Ok(Self::BaseOnly),
            "agency_override" => Ok(Self::AgencyOverride),
            other => Err(ConfigError::InvalidEnvOverride {
                key: "PARCELRATE_GROUPAGE_MARKUP".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    volumetric_divisor: Option<Decimal>,
    zone_cache_ttl_secs: Option<u64>,
    commission_cache_ttl_secs: Option<u64>,
    groupage_markup: Option<GroupageMarkupMode>,
    database: Option<DatabasePatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;
    toml::from_str(&raw)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}
