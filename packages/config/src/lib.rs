#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Pipeline configuration.
//!
//! The fixed tables of a dataset release (sensor cutoff date, damage
//! deflator, country corrections, file locations) live in TOML rather
//! than in code. The release defaults are baked into the binary from
//! `config/default.toml`; a user file only needs to list the values it
//! changes.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use flood_events_geography_models::CountryCorrections;
use serde::Deserialize;
use thiserror::Error;

/// Release defaults, embedded at compile time.
const DEFAULT_CONFIG_TOML: &str = include_str!("../config/default.toml");

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("Failed to read config {}: {source}", path.display())]
    Io {
        /// Path of the config file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The config file is not valid TOML for this schema.
    #[error("Invalid config: {0}")]
    Toml(#[from] toml::de::Error),

    /// A value is outside its allowed range.
    #[error("Invalid config value for {field}: {message}")]
    Invalid {
        /// Offending key.
        field: &'static str,
        /// Description of what went wrong.
        message: String,
    },
}

/// Complete configuration of one pipeline run.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    /// Periods starting before this date predate the flood-extent sensor.
    pub sensor_cutoff: NaiveDate,
    /// Damage re-basing parameters.
    pub damage: DamageConfig,
    /// Input and output file locations.
    pub paths: PathsConfig,
    /// Coarse-region code -> corrected country name.
    pub country_corrections: CountryCorrections,
}

/// Damage re-basing parameters.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DamageConfig {
    /// Multiplier from nominal to reference-year US$.
    pub deflator_ratio: f64,
}

/// Input and output file locations.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PathsConfig {
    /// Original registry CSV.
    pub registry: PathBuf,
    /// Fine -> coarse region lookup CSV.
    pub region_hierarchy: PathBuf,
    /// Disaggregated dataset CSV (written by `disaggregate`).
    pub disaggregated: PathBuf,
    /// External metrics CSV.
    pub metrics: PathBuf,
    /// Final flagged dataset CSV.
    pub output: PathBuf,
    /// Per-region summary CSV.
    pub summary: PathBuf,
}

/// Partial configuration as written in a user file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigOverrides {
    sensor_cutoff: Option<NaiveDate>,
    #[serde(default)]
    damage: DamageOverrides,
    #[serde(default)]
    paths: PathsOverrides,
    country_corrections: Option<CountryCorrections>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct DamageOverrides {
    deflator_ratio: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PathsOverrides {
    registry: Option<PathBuf>,
    region_hierarchy: Option<PathBuf>,
    disaggregated: Option<PathBuf>,
    metrics: Option<PathBuf>,
    output: Option<PathBuf>,
    summary: Option<PathBuf>,
}

impl PipelineConfig {
    /// Returns the release defaults embedded in the binary.
    ///
    /// # Panics
    ///
    /// Panics if the embedded `default.toml` is malformed (caught by the
    /// unit tests, since the file is compiled in).
    #[must_use]
    pub fn release_default() -> Self {
        toml::from_str(DEFAULT_CONFIG_TOML)
            .unwrap_or_else(|e| panic!("Failed to parse embedded default.toml: {e}"))
    }

    /// Parses a user config and layers it over the release defaults.
    ///
    /// Country corrections listed in the file are added to (or replace
    /// entries of) the default table.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the TOML is invalid or a value is out of
    /// range.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let overrides: ConfigOverrides = toml::from_str(text)?;
        let config = Self::release_default().merged(overrides);
        config.validate()?;
        Ok(config)
    }

    /// Loads a user config file and layers it over the release defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or is invalid.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    fn merged(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(cutoff) = overrides.sensor_cutoff {
            self.sensor_cutoff = cutoff;
        }
        if let Some(ratio) = overrides.damage.deflator_ratio {
            self.damage.deflator_ratio = ratio;
        }

        let paths = overrides.paths;
        let slots = [
            (&mut self.paths.registry, paths.registry),
            (&mut self.paths.region_hierarchy, paths.region_hierarchy),
            (&mut self.paths.disaggregated, paths.disaggregated),
            (&mut self.paths.metrics, paths.metrics),
            (&mut self.paths.output, paths.output),
            (&mut self.paths.summary, paths.summary),
        ];
        for (slot, value) in slots {
            if let Some(value) = value {
                *slot = value;
            }
        }

        if let Some(corrections) = overrides.country_corrections {
            self.country_corrections.extend(corrections);
        }
        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let ratio = self.damage.deflator_ratio;
        if !ratio.is_finite() || ratio <= 0.0 {
            return Err(ConfigError::Invalid {
                field: "damage.deflator_ratio",
                message: format!("must be a positive number, got {ratio}"),
            });
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::release_default()
    }
}
