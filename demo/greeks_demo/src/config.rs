//! Demo configuration management.
//!
//! Handles loading of the demo configuration from TOML files with
//! `GREEKS_DEMO_*` environment variable overrides. The `[sensitivity]`
//! table is passed to the engine unchanged.

use greeks_engine::config::{BumpType, SensitivityConfig};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Output format of reports.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Aligned text table
    #[default]
    Table,
    /// Pretty-printed JSON
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(Self::Table),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(vec![format!(
                "Invalid output format '{}'. Valid values: table, json",
                other
            )])),
        }
    }
}

/// Demo configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    /// Number of swaps in the synthetic book
    pub swaps: usize,

    /// Number of CDS in the synthetic book
    pub cds: usize,

    /// Report format
    pub output: OutputFormat,

    /// Log level
    pub log_level: String,

    /// Engine settings
    pub sensitivity: SensitivityConfig,
}

fn default_config_path() -> PathBuf {
    PathBuf::from("demo/greeks_demo/greeks_demo.toml")
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            swaps: 4,
            cds: 2,
            output: OutputFormat::default(),
            log_level: "info".to_string(),
            sensitivity: SensitivityConfig::default(),
        }
    }
}

impl DemoConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load from `path`, the default path, or fall back to defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::load(&default_config_path()).unwrap_or_default()),
        }
    }

    /// Apply environment variable overrides
    pub fn with_env_override(mut self) -> Self {
        if let Ok(swaps) = std::env::var("GREEKS_DEMO_SWAPS") {
            self.swaps = swaps.parse().unwrap_or(self.swaps);
        }

        if let Ok(cds) = std::env::var("GREEKS_DEMO_CDS") {
            self.cds = cds.parse().unwrap_or(self.cds);
        }

        if let Ok(output) = std::env::var("GREEKS_DEMO_OUTPUT") {
            self.output = output.parse().unwrap_or(self.output);
        }

        if let Ok(log_level) = std::env::var("GREEKS_DEMO_LOG_LEVEL") {
            self.log_level = log_level;
        }

        if let Ok(bump_type) = std::env::var("GREEKS_DEMO_BUMP_TYPE") {
            self.sensitivity.bump_type = match bump_type.to_lowercase().as_str() {
                "uniform" => BumpType::Uniform,
                "parallel" => BumpType::Parallel,
                "by_tenor" | "bytenor" => BumpType::ByTenor,
                _ => self.sensitivity.bump_type,
            };
        }

        if let Ok(targets) = std::env::var("GREEKS_DEMO_TARGETS") {
            if let Ok(targets) = targets.parse() {
                self.sensitivity.targets = targets;
            }
        }

        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.log_level.to_lowercase().as_str()) {
            errors.push(format!(
                "Invalid log_level '{}'. Valid values: {:?}",
                self.log_level, valid_log_levels
            ));
        }

        if self.swaps + self.cds == 0 {
            errors.push("the book needs at least one swap or CDS".to_string());
        }
        if self.swaps > 10_000 || self.cds > 10_000 {
            errors.push(format!(
                "book size {}+{} exceeds maximum allowed (10,000 each)",
                self.swaps, self.cds
            ));
        }

        if let Err(e) = self.sensitivity.validate() {
            errors.push(format!("sensitivity: {}", e));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Load from file with environment overrides and validate
    pub fn load_with_env_and_validate(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = Self::load_or_default(path)?.with_env_override();
        config.validate()?;
        Ok(config)
    }
}

/// Configuration error type
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// IO error reading config file
    #[error("IO error: {0}")]
    Io(String),
    /// Parse error in config file
    #[error("Parse error: {0}")]
    Parse(String),
    /// Validation error
    #[error("Validation errors: {}", .0.join("; "))]
    Validation(Vec<String>),
}
