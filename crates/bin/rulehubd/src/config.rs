//! Configuration loading — TOML file with environment variable overrides.
//!
//! Looks for `rulehub.toml` in the working directory. Every field has a
//! sensible default so the file is optional. Environment variables take
//! precedence over file values.

use std::path::{Path, PathBuf};

use chrono::{FixedOffset, Local, Offset};
use serde::Deserialize;

use rulehub_app::rule_engine::{DEFAULT_MAX_CASCADE_DEPTH, EngineConfig};
use rulehub_domain::error::RuleHubError;
use rulehub_domain::rule::Rule;

/// Largest accepted UTC offset, exclusive, in minutes.
const MAX_OFFSET_MINUTES: i32 = 24 * 60;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Rule engine settings.
    pub engine: EngineSection,
    /// Virtual home simulator settings.
    pub simulator: SimulatorConfig,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

/// Rule engine configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct EngineSection {
    /// Seed the starter automations.
    pub seed_default_rules: bool,
    /// Deepest cascade level accepted from handlers.
    pub max_cascade_depth: usize,
    /// Offset used by time conditions. Local offset when unset.
    pub utc_offset_minutes: Option<i32>,
    /// JSON file with extra rules, loaded after seeding.
    pub rules_file: Option<PathBuf>,
}

/// Simulator configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Run the virtual home.
    pub enabled: bool,
    /// Milliseconds between simulation steps.
    pub interval_ms: u64,
}

impl Config {
    /// Load configuration from `rulehub.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// resulting configuration is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("rulehub.toml")?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(val) = lookup("RULEHUB_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = lookup("RUST_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = lookup("RULEHUB_RULES_FILE") {
            self.engine.rules_file = Some(PathBuf::from(val));
        }
        if let Some(val) = lookup("RULEHUB_SIMULATOR_INTERVAL_MS") {
            self.simulator.interval_ms = val.parse().map_err(|_| {
                ConfigError::Validation(format!("RULEHUB_SIMULATOR_INTERVAL_MS: {val}"))
            })?;
        }
        if let Some(val) = lookup("RULEHUB_UTC_OFFSET_MINUTES") {
            let minutes = val.parse().map_err(|_| {
                ConfigError::Validation(format!("RULEHUB_UTC_OFFSET_MINUTES: {val}"))
            })?;
            self.engine.utc_offset_minutes = Some(minutes);
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.engine.max_cascade_depth == 0 {
            return Err(ConfigError::Validation(
                "max_cascade_depth must be at least 1".to_string(),
            ));
        }
        if self.simulator.interval_ms == 0 {
            return Err(ConfigError::Validation(
                "simulator interval_ms must be non-zero".to_string(),
            ));
        }
        if let Some(minutes) = self.engine.utc_offset_minutes
            && minutes.abs() >= MAX_OFFSET_MINUTES
        {
            return Err(ConfigError::Validation(format!(
                "utc_offset_minutes out of range: {minutes}"
            )));
        }
        Ok(())
    }

    /// Build the engine settings.
    #[must_use]
    pub fn engine_config(&self) -> EngineConfig {
        let timezone = self
            .engine
            .utc_offset_minutes
            .and_then(|minutes| FixedOffset::east_opt(minutes * 60))
            .unwrap_or_else(|| Local::now().offset().fix());
        EngineConfig {
            seed_default_rules: self.engine.seed_default_rules,
            max_cascade_depth: self.engine.max_cascade_depth,
            timezone,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "rulehubd=info,rulehub_app=info,rulehub_adapter_virtual=info".to_string(),
        }
    }
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            seed_default_rules: true,
            max_cascade_depth: DEFAULT_MAX_CASCADE_DEPTH,
            utc_offset_minutes: None,
            rules_file: None,
        }
    }
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: 2_000,
        }
    }
}

/// Read a JSON array of rules from `path`.
///
/// # Errors
///
/// Returns [`ConfigError::Rules`] when the file can't be read, isn't a JSON
/// array of rules, or holds a rule with an empty id or name.
pub fn load_rules(path: &Path) -> Result<Vec<Rule>, ConfigError> {
    let rules_error = |source: RulesError| ConfigError::Rules {
        path: path.display().to_string(),
        source,
    };
    let content = std::fs::read_to_string(path).map_err(|err| rules_error(err.into()))?;
    let rules: Vec<Rule> =
        serde_json::from_str(&content).map_err(|err| rules_error(err.into()))?;
    for rule in &rules {
        rule.validate().map_err(|err| rules_error(err.into()))?;
    }
    Ok(rules)
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
    /// Rule file failure.
    #[error("failed to load rules from {path}")]
    Rules {
        path: String,
        #[source]
        source: RulesError,
    },
}

/// Why a rule file was rejected.
#[derive(Debug, thiserror::Error)]
pub enum RulesError {
    #[error("failed to read file")]
    Io(#[from] std::io::Error),
    #[error("malformed rule JSON")]
    Json(#[from] serde_json::Error),
    #[error("invalid rule")]
    Invalid(#[from] RuleHubError),
}
