// Single-document integrity checks: redaction traces, date sprawl and
// indentation jumps around numeric lines.
use super::{FlagType, Severity, TamperingFlag};
use crate::config::AnalysisConfig;
use crate::document::Document;
use crate::patterns::RuleRegistry;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Runs the single-document rules over one document at a time
pub struct IntegrityChecker {
    registry: Arc<RuleRegistry>,
    settings: AnalysisConfig,
}

impl IntegrityChecker {
    pub fn new(registry: Arc<RuleRegistry>, settings: AnalysisConfig) -> Self {
        Self { registry, settings }
    }

    /// All single-document flags for `document`; none when it has no text
    pub fn check(&self, document: &Document) -> Vec<TamperingFlag> {
        let Some(text) = document.text() else {
            return Vec::new();
        };

        let mut flags = self.redaction_traces(text);
        flags.extend(self.date_sprawl(text));
        flags.extend(self.formatting_jumps(text));

        for flag in flags.iter_mut() {
            flag.affected_documents = vec![document.id.clone()];
        }
        flags
    }

    /// One flag per redaction marker kind that appears in the text
    pub fn redaction_traces(&self, text: &str) -> Vec<TamperingFlag> {
        self.registry
            .redactions
            .iter()
            .filter_map(|pattern| {
                let hits = pattern.regex.find_iter(text).count();
                (hits > 0).then(|| {
                    TamperingFlag::new(
                        FlagType::RedactionTraces,
                        Severity::Medium,
                        75,
                        "Potential redaction or deletion traces found",
                    )
                    .with_evidence([
                        format!("Found {} redaction indicators", hits),
                        format!("Pattern type: {}", pattern.name),
                    ])
                })
            })
            .collect()
    }

    fn date_sprawl(&self, text: &str) -> Option<TamperingFlag> {
        let all: Vec<&str> = self
            .registry
            .text
            .slash_date
            .find_iter(text)
            .map(|m| m.as_str())
            .collect();
        let unique: BTreeSet<&str> = all.iter().copied().collect();
        if unique.len() <= self.settings.max_distinct_dates {
            return None;
        }

        let shown: Vec<&str> = unique.iter().take(5).copied().collect();
        Some(
            TamperingFlag::new(
                FlagType::TimestampManipulation,
                Severity::Medium,
                70,
                "Multiple inconsistent dates found in single document",
            )
            .with_evidence([
                format!("Found {} date references", all.len()),
                format!("Dates: {}", shown.join(", ")),
            ]),
        )
    }

    fn formatting_jumps(&self, text: &str) -> Option<TamperingFlag> {
        let mut jumps = 0usize;
        let mut last_indent = 0usize;

        for line in text.lines() {
            let indent = line.chars().count() - line.trim_start().chars().count();
            let has_digit = line.chars().any(|c| c.is_ascii_digit());
            if has_digit && indent.abs_diff(last_indent) > self.settings.formatting_jump_columns {
                jumps += 1;
            }
            last_indent = indent;
        }

        if jumps <= self.settings.max_formatting_jumps {
            return None;
        }

        Some(
            TamperingFlag::new(
                FlagType::ContentInsertion,
                Severity::Low,
                60,
                "Inconsistent formatting suggests potential content insertion",
            )
            .with_evidence([
                format!("{} formatting inconsistencies detected", jumps),
                "May indicate text insertion or copy-paste modifications".to_string(),
            ]),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn checker() -> IntegrityChecker {
        IntegrityChecker::new(
            Arc::new(RuleRegistry::builtin().unwrap()),
            AnalysisConfig::default(),
        )
    }

    fn doc(text: &str) -> Document {
        Document::new("d1", "d1.pdf", Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
            .with_text(text)
    }

    #[test]
    fn test_redaction_markers() {
        let flags = checker().check(&doc("Name: [REDACTED]\nSigned: ______\nNote: ***"));
        let redactions: Vec<_> = flags
            .iter()
            .filter(|f| f.flag_type == FlagType::RedactionTraces)
            .collect();
        assert_eq!(redactions.len(), 3);
        assert!(redactions.iter().all(|f| f.confidence == 75 && f.severity == Severity::Medium));
        assert_eq!(redactions[0].affected_documents, vec!["d1"]);
        assert_eq!(redactions[0].evidence[1], "Pattern type: brackets");
    }

    #[test]
    fn test_clean_document() {
        assert!(checker().check(&doc("Officer arrived at 10:00 on 01/02/2024.")).is_empty());
    }

    #[test]
    fn test_no_text_no_flags() {
        let d = Document::new("d1", "d1.pdf", Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        assert!(checker().check(&d).is_empty());
    }

    #[test]
    fn test_date_sprawl() {
        let text = "01/01/2024 02/01/2024 03/01/2024 04/01/2024";
        let flags = checker().check(&doc(text));
        assert!(flags.iter().any(|f| f.flag_type == FlagType::TimestampManipulation));

        let text = "01/01/2024 02/01/2024 03/01/2024 01/01/2024";
        let flags = checker().check(&doc(text));
        assert!(flags.iter().all(|f| f.flag_type != FlagType::TimestampManipulation));
    }

    #[test]
    fn test_formatting_jumps() {
        let mut text = String::new();
        for i in 0..6 {
            text.push_str(&format!("line {i}\n                item {i}\n"));
        }
        let flags = checker().check(&doc(&text));
        let flag = flags
            .iter()
            .find(|f| f.flag_type == FlagType::ContentInsertion)
            .unwrap();
        assert_eq!(flag.severity, Severity::Low);
    }
}
