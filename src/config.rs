//! Configuration loading from environment variables and a license table.
//!
//! Scalar settings come from `FLEXTAPE_*` environment variables with
//! defaults; invalid values fall back to defaults without failing. License
//! capacities come from an optional TOML file, which must parse.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |---|---|---|
//! | `FLEXTAPE_CHECKIN_INTERVAL` | 10 | Expected client check-in period (secs) |
//! | `FLEXTAPE_EXPIRY_MULTIPLIER` | 3 | Missed intervals before expiry |
//! | `FLEXTAPE_SWEEP_INTERVAL` | 5 | Expiry sweep period (secs) |
//! | `FLEXTAPE_STATS_INTERVAL` | 60 | Usage gauge export period (secs) |
//! | `FLEXTAPE_DEFAULT_CAPACITY` | unset | Capacity for unlisted license types |
//! | `FLEXTAPE_REAP_EMPTY` | false | Drop idle ledgers during sweeps |
//! | `FLEXTAPE_LICENSE_FILE` | unset | TOML license capacity table |
//!
//! # License Table
//!
//! ```toml
//! [[license]]
//! vendor = "acme"
//! feature = "sim"
//! quantity = 4
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::license::{LicenseType, RegistryConfig, SweeperConfig, KEY_SEPARATOR};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read license file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid license file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("License {0} listed more than once")]
    DuplicateLicense(String),
    #[error("Invalid license entry {vendor:?}/{feature:?}: {reason}")]
    InvalidLicense {
        vendor: String,
        feature: String,
        reason: &'static str,
    },
}

#[derive(Debug, Deserialize)]
struct LicenseTable {
    #[serde(default)]
    license: Vec<LicenseEntry>,
}

#[derive(Debug, Deserialize)]
struct LicenseEntry {
    vendor: String,
    feature: String,
    quantity: u32,
}

/// All configuration for the host process.
#[derive(Debug, Clone)]
pub struct EnvConfig {
    pub registry: RegistryConfig,
    pub sweeper: SweeperConfig,
    pub stats_interval: Duration,
    pub license_file: Option<PathBuf>,
}

/// Effective configuration summary (serializable).
#[derive(Debug, Clone, Serialize)]
pub struct EffectiveConfig {
    pub checkin_interval_secs: u64,
    pub expiry_multiplier: u32,
    pub expiry_window_secs: u64,
    pub sweep_interval_secs: u64,
    pub stats_interval_secs: u64,
    pub default_capacity: Option<u32>,
    pub reap_empty: bool,
    pub license_file: Option<PathBuf>,
    /// Configured capacities keyed by `vendor::feature`.
    pub licenses: Vec<(String, u32)>,
}

/// Parse a `u64` env var, returning `default` on missing or invalid.
fn parse_u64(key: &str, default: u64) -> u64 {
    match std::env::var(key) {
        Ok(val) => val.parse::<u64>().unwrap_or(default),
        Err(_) => default,
    }
}

/// Parse a `u32` env var, returning `default` on missing or invalid.
fn parse_u32(key: &str, default: u32) -> u32 {
    match std::env::var(key) {
        Ok(val) => val.parse::<u32>().unwrap_or(default),
        Err(_) => default,
    }
}

fn parse_bool(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(val) => match val.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => default,
        },
        Err(_) => default,
    }
}

fn load_sweeper_config() -> SweeperConfig {
    let checkin = parse_u64("FLEXTAPE_CHECKIN_INTERVAL", 10).max(1);
    let multiplier = parse_u32("FLEXTAPE_EXPIRY_MULTIPLIER", 3).max(1);
    let sweep = parse_u64("FLEXTAPE_SWEEP_INTERVAL", 5).max(1);
    SweeperConfig {
        checkin_interval: Duration::from_secs(checkin),
        expiry_multiplier: multiplier,
        sweep_interval: Duration::from_secs(sweep),
    }
}

/// Parse a TOML license table into per-license capacities.
pub fn parse_license_table(source: &str) -> Result<HashMap<LicenseType, u32>, ConfigError> {
    let table: LicenseTable = toml::from_str(source)?;
    let mut capacities = HashMap::with_capacity(table.license.len());

    for entry in table.license {
        let invalid = |reason| ConfigError::InvalidLicense {
            vendor: entry.vendor.clone(),
            feature: entry.feature.clone(),
            reason,
        };
        if entry.vendor.is_empty() || entry.feature.is_empty() {
            return Err(invalid("vendor and feature must be non-empty"));
        }
        if entry.vendor.contains(KEY_SEPARATOR) || entry.feature.contains(KEY_SEPARATOR) {
            return Err(invalid("vendor and feature must not contain '::'"));
        }

        let license = LicenseType::new(entry.vendor, entry.feature);
        if capacities.contains_key(&license) {
            return Err(ConfigError::DuplicateLicense(license.to_string()));
        }
        capacities.insert(license, entry.quantity);
    }
    Ok(capacities)
}

/// Read and parse a license table from disk.
pub fn load_license_file(path: &Path) -> Result<HashMap<LicenseType, u32>, ConfigError> {
    let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_license_table(&source)
}

/// Load all configuration.
///
/// Invalid scalar values fall back to defaults; an unreadable or malformed
/// license file is an error.
pub fn load() -> Result<EnvConfig, ConfigError> {
    let license_file = std::env::var_os("FLEXTAPE_LICENSE_FILE").map(PathBuf::from);
    let capacities = match &license_file {
        Some(path) => load_license_file(path)?,
        None => HashMap::new(),
    };
    let default_capacity = std::env::var("FLEXTAPE_DEFAULT_CAPACITY")
        .ok()
        .and_then(|v| v.parse::<u32>().ok());
    let stats_secs = parse_u64("FLEXTAPE_STATS_INTERVAL", 60).max(1);

    Ok(EnvConfig {
        registry: RegistryConfig {
            capacities,
            default_capacity,
            reap_empty: parse_bool("FLEXTAPE_REAP_EMPTY", false),
        },
        sweeper: load_sweeper_config(),
        stats_interval: Duration::from_secs(stats_secs),
        license_file,
    })
}

impl EnvConfig {
    /// Return a serializable summary of all effective values.
    pub fn effective_config(&self) -> EffectiveConfig {
        let mut licenses: Vec<(String, u32)> = self
            .registry
            .capacities
            .iter()
            .map(|(license, quantity)| (license.key(), *quantity))
            .collect();
        licenses.sort();

        EffectiveConfig {
            checkin_interval_secs: self.sweeper.checkin_interval.as_secs(),
            expiry_multiplier: self.sweeper.expiry_multiplier,
            expiry_window_secs: self.sweeper.expiry_window().as_secs(),
            sweep_interval_secs: self.sweeper.sweep_interval.as_secs(),
            stats_interval_secs: self.stats_interval.as_secs(),
            default_capacity: self.registry.default_capacity,
            reap_empty: self.registry.reap_empty,
            license_file: self.license_file.clone(),
            licenses,
        }
    }
}
