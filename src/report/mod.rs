//! Analysis report: aggregation of flags into risk levels and rendering
//!
//! This module provides:
//! - [`Analyzer`], the top-level entry point that runs every rule over a batch
//!   of documents
//! - The structured [`AnalysisReport`] and its roll-ups (per date group, per
//!   document, per corpus, cross-flag patterns)
//! - [`ReportRenderer`] for markdown and JSON output

mod analyzer;
mod render;

pub use analyzer::Analyzer;
pub use render::{ReportFormat, ReportRenderer};

use crate::detection::{FlagType, Severity, TamperingFlag};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Rolled-up risk tier for a group, a document or the whole corpus
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
    Critical,
}

impl RiskLevel {
    /// Date-group roll-up: one critical flag is enough, "high" needs either
    /// two high flags or a high flag backed by several medium ones
    pub fn for_group(flags: &[TamperingFlag]) -> Self {
        let counts = SeverityCounts::from_flags(flags.iter());
        if counts.critical > 0 {
            RiskLevel::Critical
        } else if counts.high > 1 || (counts.high > 0 && counts.medium > 2) {
            RiskLevel::High
        } else if counts.high > 0 || counts.medium > 1 {
            RiskLevel::Moderate
        } else {
            RiskLevel::Low
        }
    }

    /// Document and corpus roll-up: the most severe flag decides
    pub fn from_max_severity<'a, I>(flags: I) -> Self
    where
        I: IntoIterator<Item = &'a TamperingFlag>,
    {
        let mut any = false;
        let mut max = Severity::Low;
        for flag in flags {
            any = true;
            max = max.max(flag.severity);
        }
        match (any, max) {
            (false, _) => RiskLevel::Low,
            (true, Severity::Critical) => RiskLevel::Critical,
            (true, Severity::High) => RiskLevel::High,
            (true, _) => RiskLevel::Moderate,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Moderate => "moderate",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct SeverityCounts {
    critical: usize,
    high: usize,
    medium: usize,
}

impl SeverityCounts {
    fn from_flags<'a>(flags: impl Iterator<Item = &'a TamperingFlag>) -> Self {
        let mut counts = Self::default();
        for flag in flags {
            match flag.severity {
                Severity::Critical => counts.critical += 1,
                Severity::High => counts.high += 1,
                Severity::Medium => counts.medium += 1,
                Severity::Low => {}
            }
        }
        counts
    }
}

/// Documents sharing an inferred date and the flags between them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateGroupAnalysis {
    /// ISO date (`YYYY-MM-DD`)
    pub date: String,
    pub document_ids: Vec<String>,
    pub flags: Vec<TamperingFlag>,
    pub risk_level: RiskLevel,
}

/// Per-document roll-up across every flag naming the document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRisk {
    pub document_id: String,
    pub file_name: String,
    pub risk_level: RiskLevel,
    pub flag_count: usize,
    pub critical_count: usize,
    pub evidence_suppression_count: usize,
}

/// Cross-flag patterns that point at deliberate, coordinated edits
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternAnalysis {
    /// Three or more critical flags
    pub systematic_tampering: bool,
    /// Two or more name changes together with a status change
    pub coordinated_alterations: bool,
    pub evidence_suppression: bool,
    /// Any name change or witness statement removal
    pub witness_manipulation: bool,
}

impl PatternAnalysis {
    pub fn from_flags<'a, I>(flags: I) -> Self
    where
        I: IntoIterator<Item = &'a TamperingFlag>,
    {
        let (mut critical, mut names, mut statuses, mut suppressions, mut removals) = (0, 0, 0, 0, 0);
        for flag in flags {
            if flag.severity == Severity::Critical {
                critical += 1;
            }
            match flag.flag_type {
                FlagType::NameChange => names += 1,
                FlagType::StatusChange => statuses += 1,
                FlagType::EvidenceSuppression => suppressions += 1,
                FlagType::WitnessRemoval => removals += 1,
                _ => {}
            }
        }

        Self {
            systematic_tampering: critical >= 3,
            coordinated_alterations: names >= 2 && statuses >= 1,
            evidence_suppression: suppressions >= 1,
            witness_manipulation: names >= 1 || removals >= 1,
        }
    }
}

/// Corpus-level summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverallRiskAssessment {
    pub total_flags: usize,
    pub critical_flags: usize,
    /// Documents named by any critical or high flag, in first-seen order
    pub high_risk_documents: Vec<String>,
    pub risk_level: RiskLevel,
    pub summary: String,
}

impl OverallRiskAssessment {
    pub fn from_flags<'a, I>(flags: I) -> Self
    where
        I: IntoIterator<Item = &'a TamperingFlag>,
    {
        let flags: Vec<&TamperingFlag> = flags.into_iter().collect();
        let counts = SeverityCounts::from_flags(flags.iter().copied());

        let mut seen = HashSet::new();
        let high_risk_documents: Vec<String> = flags
            .iter()
            .filter(|f| f.severity >= Severity::High)
            .flat_map(|f| f.affected_documents.iter())
            .filter(|id| seen.insert(id.as_str()))
            .cloned()
            .collect();

        let risk_level = RiskLevel::from_max_severity(flags.iter().copied());
        let summary = match risk_level {
            RiskLevel::Critical => format!(
                "CRITICAL: {} critical tampering indicators detected. Immediate investigation recommended.",
                counts.critical
            ),
            RiskLevel::High => format!(
                "HIGH RISK: {} high-severity indicators found. Review recommended.",
                counts.high
            ),
            RiskLevel::Moderate => format!(
                "MODERATE: {} potential indicators detected. Monitoring advised.",
                flags.len()
            ),
            RiskLevel::Low => "LOW RISK: No significant tampering indicators detected.".to_string(),
        };

        Self {
            total_flags: flags.len(),
            critical_flags: counts.critical,
            high_risk_documents,
            risk_level,
            summary,
        }
    }
}

/// Top-level output of one analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub documents_analyzed: usize,
    /// Groups with at least two documents, most risky first
    pub date_groups: Vec<DateGroupAnalysis>,
    /// Single-document integrity flags
    pub document_flags: Vec<TamperingFlag>,
    pub timeline_flags: Vec<TamperingFlag>,
    pub document_risks: Vec<DocumentRisk>,
    pub patterns: PatternAnalysis,
    pub overall_risk_assessment: OverallRiskAssessment,
    pub recommendations: Vec<String>,
}

impl AnalysisReport {
    /// Every flag in report order: date groups, document flags, timeline
    pub fn all_flags(&self) -> impl Iterator<Item = &TamperingFlag> {
        self.date_groups
            .iter()
            .flat_map(|g| g.flags.iter())
            .chain(self.document_flags.iter())
            .chain(self.timeline_flags.iter())
    }

    pub fn flags_of_type(&self, flag_type: FlagType) -> impl Iterator<Item = &TamperingFlag> {
        self.all_flags().filter(move |f| f.flag_type == flag_type)
    }
}

/// Recommendations chosen by the same thresholds as the summary
pub fn recommendations(overall: &OverallRiskAssessment, patterns: &PatternAnalysis) -> Vec<String> {
    let mut recs: Vec<&str> = if overall.critical_flags > 0 {
        vec![
            "IMMEDIATE ACTION REQUIRED: Critical tampering indicators detected",
            "Preserve all document versions and metadata",
            "Conduct forensic analysis of affected documents",
            "Review access logs and modification history",
            "Consult legal counsel about potential evidence tampering",
        ]
    } else if overall.total_flags > 0 {
        vec![
            "Review flagged documents for potential issues",
            "Verify document authenticity through alternative sources",
            "Monitor for additional changes or inconsistencies",
            "Document review process and findings",
        ]
    } else {
        vec![
            "Continue monitoring for changes",
            "Maintain version control and audit trails",
            "Regular periodic analysis recommended",
        ]
    };

    if patterns.systematic_tampering {
        recs.push("Multiple critical alterations suggest systematic tampering; review all related documents together");
    }
    if patterns.witness_manipulation {
        recs.push("Witness names or statements changed; verify witness records against original sources");
    }
    if patterns.evidence_suppression {
        recs.push("Evidence counts decreased between versions; audit chain of custody");
    }

    recs.into_iter().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flag(severity: Severity, flag_type: FlagType, docs: &[&str]) -> TamperingFlag {
        TamperingFlag::new(flag_type, severity, 50, "test").with_documents(docs.iter().copied())
    }

    #[test]
    fn test_group_risk_levels() {
        let medium = || flag(Severity::Medium, FlagType::ContentChange, &["a"]);
        let high = || flag(Severity::High, FlagType::SignatureMismatch, &["a"]);

        assert_eq!(RiskLevel::for_group(&[]), RiskLevel::Low);
        assert_eq!(RiskLevel::for_group(&[medium()]), RiskLevel::Low);
        assert_eq!(RiskLevel::for_group(&[medium(), medium()]), RiskLevel::Moderate);
        assert_eq!(RiskLevel::for_group(&[high()]), RiskLevel::Moderate);
        assert_eq!(RiskLevel::for_group(&[high(), high()]), RiskLevel::High);
        assert_eq!(
            RiskLevel::for_group(&[high(), medium(), medium(), medium()]),
            RiskLevel::High
        );
        assert_eq!(
            RiskLevel::for_group(&[flag(Severity::Critical, FlagType::NameChange, &["a"])]),
            RiskLevel::Critical
        );
    }

    #[test]
    fn test_max_severity_levels() {
        let none: Vec<TamperingFlag> = vec![];
        assert_eq!(RiskLevel::from_max_severity(&none), RiskLevel::Low);
        let low = vec![flag(Severity::Low, FlagType::ContentInsertion, &["a"])];
        assert_eq!(RiskLevel::from_max_severity(&low), RiskLevel::Moderate);
        let high = vec![flag(Severity::High, FlagType::TimelineConflict, &["a"])];
        assert_eq!(RiskLevel::from_max_severity(&high), RiskLevel::High);
    }

    #[test]
    fn test_overall_empty() {
        let overall = OverallRiskAssessment::from_flags(&Vec::<TamperingFlag>::new());
        assert_eq!(overall.total_flags, 0);
        assert_eq!(overall.critical_flags, 0);
        assert!(overall.high_risk_documents.is_empty());
        assert!(overall.summary.starts_with("LOW RISK"));
    }

    #[test]
    fn test_high_risk_documents_deduplicated_in_order() {
        let flags = vec![
            flag(Severity::Medium, FlagType::ContentChange, &["z"]),
            flag(Severity::High, FlagType::SignatureMismatch, &["b", "a"]),
            flag(Severity::Critical, FlagType::NameChange, &["a", "c"]),
        ];
        let overall = OverallRiskAssessment::from_flags(&flags);
        assert_eq!(overall.high_risk_documents, vec!["b", "a", "c"]);
        assert_eq!(overall.critical_flags, 1);
        assert!(overall.summary.starts_with("CRITICAL: 1"));
    }

    #[test]
    fn test_pattern_analysis() {
        let flags = vec![
            flag(Severity::Critical, FlagType::NameChange, &["a"]),
            flag(Severity::Critical, FlagType::NameChange, &["a"]),
            flag(Severity::Critical, FlagType::StatusChange, &["a"]),
        ];
        let patterns = PatternAnalysis::from_flags(&flags);
        assert!(patterns.systematic_tampering);
        assert!(patterns.coordinated_alterations);
        assert!(patterns.witness_manipulation);
        assert!(!patterns.evidence_suppression);
    }

    #[test]
    fn test_recommendations_follow_thresholds() {
        let empty = OverallRiskAssessment::from_flags(&Vec::<TamperingFlag>::new());
        let recs = recommendations(&empty, &PatternAnalysis::default());
        assert_eq!(recs[0], "Continue monitoring for changes");

        let flags = vec![flag(Severity::Critical, FlagType::EvidenceSuppression, &["a"])];
        let overall = OverallRiskAssessment::from_flags(&flags);
        let recs = recommendations(&overall, &PatternAnalysis::from_flags(&flags));
        assert!(recs[0].starts_with("IMMEDIATE ACTION REQUIRED"));
        assert!(recs.iter().any(|r| r.contains("chain of custody")));
    }
}
