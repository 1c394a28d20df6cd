//! Configuration management for tamperscan
//!
//! The main configuration file holds the numeric knobs of the analysis
//! (timeline grace window, severity thresholds) and points at the rule set
//! file. Case-specific rules live in the rule set, see [`crate::patterns`].

use crate::error::{Result, TamperError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

mod validator;

pub use validator::ConfigValidator;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "_meta")]
    pub meta: MetaConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub thresholds: ThresholdsConfig,
    #[serde(default)]
    pub rules: RulesFileConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

/// Metadata about the configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaConfig {
    pub schema_version: String,
    #[serde(default = "current_timestamp")]
    pub created_at: String,
    #[serde(default = "current_timestamp")]
    pub last_modified: String,
}

fn current_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Analysis-wide settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// How far a document's modification may postdate a later upload
    pub timeline_grace_hours: i64,
    /// Distinct slash dates tolerated in one document before flagging
    pub max_distinct_dates: usize,
    /// Indentation jump (columns) counted as a formatting inconsistency
    pub formatting_jump_columns: usize,
    /// Formatting inconsistencies tolerated in one document
    pub max_formatting_jumps: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            timeline_grace_hours: 24,
            max_distinct_dates: 3,
            formatting_jump_columns: 10,
            max_formatting_jumps: 5,
        }
    }
}

/// Severity thresholds for heuristic pair rules (all comparisons strict)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdsConfig {
    pub length_change_percent: f64,
    pub length_change_critical_percent: f64,
    pub numeric_high_changes: usize,
    pub numeric_critical_changes: usize,
    pub name_high_diff: usize,
    pub name_critical_diff: usize,
    pub structural_marker_diff: usize,
}

impl Default for ThresholdsConfig {
    fn default() -> Self {
        Self {
            length_change_percent: 20.0,
            length_change_critical_percent: 50.0,
            numeric_high_changes: 5,
            numeric_critical_changes: 10,
            name_high_diff: 1,
            name_critical_diff: 3,
            structural_marker_diff: 2,
        }
    }
}

/// Rule set location; `None` uses the built-in rule set
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RulesFileConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules_file: Option<PathBuf>,
}

/// Report output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub default_format: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            default_format: "markdown".to_string(),
        }
    }
}

/// Settings handed to the analyzer
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalysisSettings {
    pub analysis: AnalysisConfig,
    pub thresholds: ThresholdsConfig,
}

impl AnalysisSettings {
    /// Saturates for hour counts chrono cannot represent
    pub fn timeline_grace(&self) -> chrono::Duration {
        chrono::Duration::try_hours(self.analysis.timeline_grace_hours).unwrap_or(
            if self.analysis.timeline_grace_hours < 0 {
                chrono::Duration::MIN
            } else {
                chrono::Duration::MAX
            },
        )
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(TamperError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| TamperError::Io {
            source: e,
            context: format!("Failed to read config file: {:?}", path),
        })?;
        let mut config: Config = toml::from_str(&content)?;

        // Apply environment variable overrides
        config.apply_env_overrides();

        // Validate configuration
        ConfigValidator::validate(&config)?;

        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| TamperError::Io {
            source: e,
            context: format!("Failed to write config file: {:?}", path),
        })?;
        Ok(())
    }

    /// Analyzer settings view of this configuration
    pub fn settings(&self) -> AnalysisSettings {
        AnalysisSettings {
            analysis: self.analysis.clone(),
            thresholds: self.thresholds.clone(),
        }
    }

    /// Apply environment variable overrides
    /// Environment variables in format: TAMPERSCAN_SECTION__KEY=value
    pub fn apply_env_overrides(&mut self) {
        let vars: Vec<(String, String)> = std::env::vars().collect();
        self.apply_overrides(vars);
    }

    /// Apply `SECTION__KEY=value` style overrides from any source
    pub fn apply_overrides<I>(&mut self, vars: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            if let Some(config_key) = key.strip_prefix("TAMPERSCAN_") {
                if let Err(e) = self.set_value_from_env(config_key, &value) {
                    tracing::warn!("Failed to apply env override {}: {}", key, e);
                }
            }
        }
    }

    fn set_value_from_env(&mut self, path: &str, value: &str) -> Result<()> {
        match path {
            "ANALYSIS__TIMELINE_GRACE_HOURS" => {
                self.analysis.timeline_grace_hours = parse_value(path, value)?;
            }
            "ANALYSIS__MAX_DISTINCT_DATES" => {
                self.analysis.max_distinct_dates = parse_value(path, value)?;
            }
            "THRESHOLDS__LENGTH_CHANGE_PERCENT" => {
                self.thresholds.length_change_percent = parse_value(path, value)?;
            }
            "RULES__RULES_FILE" => {
                self.rules.rules_file = Some(PathBuf::from(value));
            }
            "REPORT__DEFAULT_FORMAT" => {
                self.report.default_format = value.to_string();
            }
            _ => {
                tracing::debug!("Unknown env config key: {}", path);
            }
        }
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| TamperError::Config("Cannot determine config directory".to_string()))?;

        Ok(config_dir.join("tamperscan").join("config.toml"))
    }
}

fn parse_value<T: std::str::FromStr>(path: &str, value: &str) -> Result<T> {
    value.parse().map_err(|_| TamperError::InvalidConfigValue {
        path: path.to_string(),
        message: format!("Cannot parse '{}'", value),
    })
}

impl Default for Config {
    fn default() -> Self {
        Self {
            meta: MetaConfig {
                schema_version: "1.0.0".to_string(),
                created_at: current_timestamp(),
                last_modified: current_timestamp(),
            },
            analysis: AnalysisConfig::default(),
            thresholds: ThresholdsConfig::default(),
            rules: RulesFileConfig::default(),
            report: ReportConfig::default(),
        }
    }
}
