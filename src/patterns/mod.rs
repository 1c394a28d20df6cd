//! Rule registry for configuration-driven tampering detection
//!
//! This module provides:
//! - The rule set file format (`rules.toml`): watch-list names, evidence
//!   identifier patterns, literal phrase substitutions, evidence count rules,
//!   statement removal rules and redaction markers
//! - Pre-compiled regexes for every configured pattern
//! - The fixed text patterns used by fingerprint extraction (dates, numbers,
//!   structural markers)
//!
//! Every regex is compiled once when the registry is built, so a bad pattern
//! fails at load time instead of during analysis.

use crate::detection::FlagType;
use crate::error::{Result, TamperError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Built-in rule set shipped with the crate
pub const BUILTIN_RULES: &str = include_str!("../../config-templates/rules.toml");

/// Evidence identifier pattern configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentifierPatternConfig {
    pub name: String,
    pub pattern: String,
}

/// Literal before/after substitution known to indicate tampering
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhraseRuleConfig {
    pub name: String,
    pub kind: FlagType,
    pub before: String,
    pub after: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: Option<String>,
}

/// Evidence count that must not decrease between versions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountRuleConfig {
    pub name: String,
    pub label: String,
    pub pattern: String,
}

/// Statement marker that must survive revision
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemovalRuleConfig {
    pub name: String,
    pub present: String,
    #[serde(default)]
    pub absent: Option<String>,
    #[serde(default)]
    pub description: String,
}

/// Redaction marker pattern for single-document checks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedactionPatternConfig {
    pub name: String,
    pub pattern: String,
}

/// Rule set file structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RulesConfig {
    pub watch_names: Vec<String>,
    #[serde(default)]
    pub identifier: Vec<IdentifierPatternConfig>,
    #[serde(default)]
    pub phrase: Vec<PhraseRuleConfig>,
    #[serde(default)]
    pub count: Vec<CountRuleConfig>,
    #[serde(default)]
    pub removal: Vec<RemovalRuleConfig>,
    #[serde(default)]
    pub redaction: Vec<RedactionPatternConfig>,
}

impl RulesConfig {
    /// Parse a rule set from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// The rule set embedded from `config-templates/rules.toml`
    pub fn builtin() -> Result<Self> {
        Self::from_toml_str(BUILTIN_RULES)
    }
}

/// Compiled watch-list name with a whole-word, case-insensitive regex
#[derive(Debug, Clone)]
pub struct CompiledName {
    pub name: String,
    pub regex: Regex,
}

/// Compiled evidence identifier pattern
#[derive(Debug, Clone)]
pub struct CompiledIdentifierPattern {
    pub name: String,
    pub regex: Regex,
}

/// Literal substitution rule (no regex involved)
#[derive(Debug, Clone)]
pub struct PhraseRule {
    pub name: String,
    pub kind: FlagType,
    pub before: String,
    pub after: String,
    pub description: String,
    pub location: Option<String>,
}

/// Compiled evidence count rule; capture group 1 is the count
#[derive(Debug, Clone)]
pub struct CompiledCountRule {
    pub name: String,
    pub label: String,
    pub regex: Regex,
}

/// Statement removal rule
#[derive(Debug, Clone)]
pub struct RemovalRule {
    pub name: String,
    pub present: String,
    pub absent: String,
    pub description: String,
}

/// Compiled redaction marker
#[derive(Debug, Clone)]
pub struct CompiledRedactionPattern {
    pub name: String,
    pub regex: Regex,
}

/// Fixed text patterns used by fingerprint extraction and grouping
#[derive(Debug, Clone)]
pub struct TextPatterns {
    /// `MM/DD/YYYY`, `Month DD, YYYY` and `YYYY/MM/DD` (with `/` or `-`)
    pub dates: Vec<Regex>,
    /// Slash-separated dates only, used for timestamp consistency checks
    pub slash_date: Regex,
    /// Maximal digit runs with an optional decimal part
    pub number: Regex,
    /// `LABEL:` header lines
    pub label_header: Regex,
    /// All-caps header lines
    pub caps_header: Regex,
    /// Dates embedded in file names (`MM.DD.YYYY` or `YYYY-MM-DD`)
    pub filename_date: Regex,
    /// `Date:` labels inside document text
    pub content_date: Regex,
}

impl TextPatterns {
    fn compile() -> Result<Self> {
        const MONTHS: &str =
            "January|February|March|April|May|June|July|August|September|October|November|December";

        let dates = vec![
            compile("date_numeric", r"\b\d{1,2}[/-]\d{1,2}[/-]\d{2,4}\b")?,
            compile(
                "date_month_name",
                &format!(r"(?i)\b(?:{MONTHS})\s+\d{{1,2}},?\s+\d{{4}}\b"),
            )?,
            compile("date_iso", r"\b\d{4}[/-]\d{1,2}[/-]\d{1,2}\b")?,
        ];

        Ok(Self {
            dates,
            slash_date: compile("slash_date", r"\b\d{1,2}/\d{1,2}/\d{2,4}\b")?,
            number: compile("number", r"\b\d+(?:\.\d+)?\b")?,
            label_header: compile("label_header", r"^[A-Z\s]+:$")?,
            caps_header: compile("caps_header", r"^[A-Z][A-Z\s]+$")?,
            filename_date: compile(
                "filename_date",
                r"(\d{2})\.(\d{2})\.(\d{4})|(\d{4})-(\d{2})-(\d{2})",
            )?,
            content_date: compile(
                "content_date",
                &format!(
                    r"Date:\s*(?:((?:{MONTHS})\s+\d{{1,2}},\s+\d{{4}})|(\d{{1,2}})/(\d{{1,2}})/(\d{{4}})|(\d{{4}})-(\d{{2}})-(\d{{2}}))"
                ),
            )?,
        })
    }
}

/// Rule registry with all pre-compiled patterns
#[derive(Debug, Clone)]
pub struct RuleRegistry {
    /// Watch-list names in configuration order
    pub names: Vec<CompiledName>,
    /// Evidence identifier patterns
    pub identifiers: Vec<CompiledIdentifierPattern>,
    /// Literal substitution rules
    pub phrases: Vec<PhraseRule>,
    /// Evidence count rules
    pub counts: Vec<CompiledCountRule>,
    /// Statement removal rules
    pub removals: Vec<RemovalRule>,
    /// Redaction markers
    pub redactions: Vec<CompiledRedactionPattern>,
    /// Fixed extraction patterns
    pub text: TextPatterns,
}

impl RuleRegistry {
    /// Load rule registry from a rule set file
    pub fn from_config_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| TamperError::Io {
            source: e,
            context: format!("Failed to read rules file: {:?}", path),
        })?;
        let config = RulesConfig::from_toml_str(&content)?;
        tracing::debug!("Loaded rule set from {:?}", path);

        Self::from_config(config)
    }

    /// Build the registry from the embedded rule set
    pub fn builtin() -> Result<Self> {
        Self::from_config(RulesConfig::builtin()?)
    }

    /// Build rule registry from a parsed rule set
    pub fn from_config(config: RulesConfig) -> Result<Self> {
        if config.watch_names.is_empty() {
            return Err(TamperError::Config(
                "Rule set must define at least one watch-list name".to_string(),
            ));
        }

        // Compile watch-list names
        let mut seen = HashSet::new();
        let mut names = Vec::new();
        for name in &config.watch_names {
            let trimmed = name.trim();
            if trimmed.is_empty() {
                return Err(TamperError::Config(
                    "Watch-list names cannot be empty".to_string(),
                ));
            }
            if !seen.insert(trimmed.to_lowercase()) {
                return Err(TamperError::Config(format!(
                    "Duplicate watch-list name '{}'",
                    trimmed
                )));
            }
            let pattern = format!(r"(?i)\b{}\b", regex::escape(trimmed));
            names.push(CompiledName {
                name: trimmed.to_string(),
                regex: compile(trimmed, &pattern)?,
            });
        }

        // Compile identifier patterns
        let identifiers = config
            .identifier
            .iter()
            .map(|ic| {
                compile(&ic.name, &ic.pattern).map(|regex| CompiledIdentifierPattern {
                    name: ic.name.clone(),
                    regex,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        // Validate phrase rules
        let phrases = config
            .phrase
            .iter()
            .map(|pc| {
                if pc.before.is_empty() || pc.after.is_empty() {
                    return Err(TamperError::Config(format!(
                        "Phrase rule '{}' needs non-empty before and after literals",
                        pc.name
                    )));
                }
                if pc.before == pc.after {
                    return Err(TamperError::Config(format!(
                        "Phrase rule '{}' has identical before and after literals",
                        pc.name
                    )));
                }
                if pc.kind == FlagType::TimelineConflict {
                    return Err(TamperError::Config(format!(
                        "Phrase rule '{}' cannot use kind '{}'",
                        pc.name, pc.kind
                    )));
                }
                Ok(PhraseRule {
                    name: pc.name.clone(),
                    kind: pc.kind,
                    before: pc.before.clone(),
                    after: pc.after.clone(),
                    description: if pc.description.is_empty() {
                        format!("{} altered", pc.name)
                    } else {
                        pc.description.clone()
                    },
                    location: pc.location.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        // Compile count rules; each needs a capture group for the count
        let counts = config
            .count
            .iter()
            .map(|cc| {
                let regex = compile(&cc.name, &cc.pattern)?;
                if regex.captures_len() < 2 {
                    return Err(TamperError::Config(format!(
                        "Count rule '{}' pattern needs a capture group for the count",
                        cc.name
                    )));
                }
                Ok(CompiledCountRule {
                    name: cc.name.clone(),
                    label: cc.label.clone(),
                    regex,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let removals = config
            .removal
            .iter()
            .map(|rc| {
                if rc.present.is_empty() {
                    return Err(TamperError::Config(format!(
                        "Removal rule '{}' needs a non-empty marker",
                        rc.name
                    )));
                }
                let absent = rc
                    .absent
                    .clone()
                    .filter(|a| !a.is_empty())
                    .unwrap_or_else(|| rc.present.clone());
                Ok(RemovalRule {
                    name: rc.name.clone(),
                    present: rc.present.clone(),
                    absent,
                    description: if rc.description.is_empty() {
                        format!("{} removed", rc.name)
                    } else {
                        rc.description.clone()
                    },
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let redactions = config
            .redaction
            .iter()
            .map(|rc| {
                compile(&rc.name, &rc.pattern).map(|regex| CompiledRedactionPattern {
                    name: rc.name.clone(),
                    regex,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            names,
            identifiers,
            phrases,
            counts,
            removals,
            redactions,
            text: TextPatterns::compile()?,
        })
    }

    /// Watch-list names in configuration order
    pub fn watch_names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(|n| n.name.as_str())
    }

    /// Total number of configured rules, for logging
    pub fn rule_count(&self) -> usize {
        self.names.len()
            + self.identifiers.len()
            + self.phrases.len()
            + self.counts.len()
            + self.removals.len()
            + self.redactions.len()
    }
}

fn compile(rule: &str, pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| TamperError::InvalidPattern {
        rule: rule.to_string(),
        source: e,
    })
}
