use crate::config::Config;
use crate::error::{Result, TamperError, ValidationError};

const SUPPORTED_FORMATS: [&str; 2] = ["markdown", "json"];

/// One hundred years, in hours
const MAX_GRACE_HOURS: i64 = 100 * 366 * 24;

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration
    pub fn validate(config: &Config) -> Result<()> {
        let mut errors = Vec::new();

        Self::validate_schema_version(config, &mut errors);
        Self::validate_analysis(config, &mut errors);
        Self::validate_thresholds(config, &mut errors);
        Self::validate_rules(config, &mut errors);
        Self::validate_report(config, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(TamperError::ConfigValidation { errors })
        }
    }

    fn validate_schema_version(config: &Config, errors: &mut Vec<ValidationError>) {
        let version = &config.meta.schema_version;
        if version != "1.0.0" {
            errors.push(ValidationError::new(
                "_meta.schema_version",
                format!("Unsupported schema version: {}", version),
            ));
        }
    }

    fn validate_analysis(config: &Config, errors: &mut Vec<ValidationError>) {
        let grace = config.analysis.timeline_grace_hours;
        if grace < 0 {
            errors.push(ValidationError::new(
                "analysis.timeline_grace_hours",
                "Grace window cannot be negative",
            ));
        } else if grace > MAX_GRACE_HOURS {
            errors.push(ValidationError::new(
                "analysis.timeline_grace_hours",
                format!(
                    "Grace window must be at most {} hours, got {}",
                    MAX_GRACE_HOURS, grace
                ),
            ));
        }

        if config.analysis.formatting_jump_columns == 0 {
            errors.push(ValidationError::new(
                "analysis.formatting_jump_columns",
                "Formatting jump must be greater than 0",
            ));
        }
    }

    fn validate_thresholds(config: &Config, errors: &mut Vec<ValidationError>) {
        let t = &config.thresholds;

        if !(0.0..100.0).contains(&t.length_change_percent) {
            errors.push(ValidationError::new(
                "thresholds.length_change_percent",
                format!(
                    "Length change percent must be in [0, 100), got {}",
                    t.length_change_percent
                ),
            ));
        }

        if t.length_change_critical_percent < t.length_change_percent {
            errors.push(ValidationError::new(
                "thresholds.length_change_critical_percent",
                "Critical length change must not be below the flagging threshold",
            ));
        }

        if t.numeric_critical_changes < t.numeric_high_changes {
            errors.push(ValidationError::new(
                "thresholds.numeric_critical_changes",
                "Critical numeric change count must not be below the high threshold",
            ));
        }

        if t.name_critical_diff < t.name_high_diff {
            errors.push(ValidationError::new(
                "thresholds.name_critical_diff",
                "Critical name difference must not be below the high threshold",
            ));
        }
    }

    fn validate_rules(config: &Config, errors: &mut Vec<ValidationError>) {
        // File existence is checked when the rule registry loads it
        if let Some(path) = &config.rules.rules_file {
            if path.as_os_str().is_empty() {
                errors.push(ValidationError::new(
                    "rules.rules_file",
                    "Rules file path cannot be empty",
                ));
            }
        }
    }

    fn validate_report(config: &Config, errors: &mut Vec<ValidationError>) {
        let format = &config.report.default_format;
        if !SUPPORTED_FORMATS.contains(&format.as_str()) {
            errors.push(ValidationError::new(
                "report.default_format",
                format!(
                    "Format must be one of {:?}, got '{}'",
                    SUPPORTED_FORMATS, format
                ),
            ));
        }
    }
}
