// Shared types for tampering detection
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of discrepancy a flag describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagType {
    NameDiscrepancy,
    NameChange,
    ContentChange,
    ContentInsertion,
    MetadataInconsistency,
    TimelineConflict,
    EvidenceSuppression,
    StatusChange,
    WitnessRemoval,
    AssessmentManipulation,
    RedactionTraces,
    TimestampManipulation,
    SignatureMismatch,
}

impl FlagType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlagType::NameDiscrepancy => "name_discrepancy",
            FlagType::NameChange => "name_change",
            FlagType::ContentChange => "content_change",
            FlagType::ContentInsertion => "content_insertion",
            FlagType::MetadataInconsistency => "metadata_inconsistency",
            FlagType::TimelineConflict => "timeline_conflict",
            FlagType::EvidenceSuppression => "evidence_suppression",
            FlagType::StatusChange => "status_change",
            FlagType::WitnessRemoval => "witness_removal",
            FlagType::AssessmentManipulation => "assessment_manipulation",
            FlagType::RedactionTraces => "redaction_traces",
            FlagType::TimestampManipulation => "timestamp_manipulation",
            FlagType::SignatureMismatch => "signature_mismatch",
        }
    }

    /// Heading form used in rendered reports ("NAME DISCREPANCY")
    pub fn heading(&self) -> String {
        self.as_str().replace('_', " ").to_uppercase()
    }
}

impl fmt::Display for FlagType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered severity tier: `Low < Medium < High < Critical`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            "critical" => Ok(Severity::Critical),
            other => Err(format!("unknown severity '{}'", other)),
        }
    }
}

/// One detected discrepancy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TamperingFlag {
    #[serde(rename = "type")]
    pub flag_type: FlagType,
    pub severity: Severity,
    /// Relative certainty (0-100), not a calibrated probability
    pub confidence: u8,
    pub description: String,
    /// Supporting excerpts and counts, in presentation order
    pub evidence: Vec<String>,
    /// The one or two documents involved
    pub affected_documents: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl TamperingFlag {
    pub fn new(
        flag_type: FlagType,
        severity: Severity,
        confidence: u8,
        description: impl Into<String>,
    ) -> Self {
        Self {
            flag_type,
            severity,
            confidence: confidence.min(100),
            description: description.into(),
            evidence: Vec::new(),
            affected_documents: Vec::new(),
            location: None,
        }
    }

    pub fn with_evidence<I, S>(mut self, evidence: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.evidence.extend(evidence.into_iter().map(Into::into));
        self
    }

    pub fn with_documents<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.affected_documents
            .extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn affects(&self, document_id: &str) -> bool {
        self.affected_documents.iter().any(|id| id == document_id)
    }
}

/// Stable sort by severity, most severe first; ties keep detection order
pub fn sort_by_severity(flags: &mut [TamperingFlag]) {
    flags.sort_by(|a, b| b.severity.cmp(&a.severity));
}

/// Clamp a heuristic confidence score into 0-100
pub(crate) fn capped_confidence(base: f64, cap: u8) -> u8 {
    base.round().clamp(0.0, cap as f64) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
        assert!(Severity::High < Severity::Critical);
    }

    #[test]
    fn test_sort_is_stable() {
        let mut flags = vec![
            TamperingFlag::new(FlagType::ContentChange, Severity::Medium, 50, "first medium"),
            TamperingFlag::new(FlagType::NameChange, Severity::Critical, 100, "critical"),
            TamperingFlag::new(FlagType::ContentChange, Severity::Medium, 50, "second medium"),
            TamperingFlag::new(FlagType::SignatureMismatch, Severity::High, 90, "high"),
        ];
        sort_by_severity(&mut flags);
        let order: Vec<&str> = flags.iter().map(|f| f.description.as_str()).collect();
        assert_eq!(order, vec!["critical", "high", "first medium", "second medium"]);
    }

    #[test]
    fn test_flag_type_serializes_snake_case() {
        let json = serde_json::to_string(&FlagType::AssessmentManipulation).unwrap();
        assert_eq!(json, "\"assessment_manipulation\"");
        assert_eq!(FlagType::WitnessRemoval.heading(), "WITNESS REMOVAL");
    }

    #[test]
    fn test_severity_from_str() {
        assert_eq!("HIGH".parse::<Severity>().unwrap(), Severity::High);
        assert!("severe".parse::<Severity>().is_err());
    }

    #[test]
    fn test_confidence_capped() {
        assert_eq!(capped_confidence(130.0, 85), 85);
        assert_eq!(capped_confidence(62.4, 90), 62);
        assert_eq!(TamperingFlag::new(FlagType::NameChange, Severity::Low, 250, "x").confidence, 100);
    }
}
