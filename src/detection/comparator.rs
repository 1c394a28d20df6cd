// Pairwise comparison of document fingerprints
//
// Rule order here is the detection order used to break severity ties in
// reports: names, numbers, length, category, literal rules, identifiers,
// structure, content hash.
use super::{capped_confidence, preview, FlagType, LiteralRuleMatcher, Severity, TamperingFlag};
use crate::config::ThresholdsConfig;
use crate::fingerprint::Fingerprint;
use crate::grouping::ComparisonPair;
use crate::patterns::RuleRegistry;
use std::collections::BTreeSet;
use std::sync::Arc;

const PREVIEW_LIMIT: usize = 10;

/// Emits flags for one oriented document pair
pub struct PairComparator {
    registry: Arc<RuleRegistry>,
    literals: LiteralRuleMatcher,
    thresholds: ThresholdsConfig,
}

impl PairComparator {
    pub fn new(registry: Arc<RuleRegistry>, thresholds: ThresholdsConfig) -> Self {
        Self {
            literals: LiteralRuleMatcher::new(registry.clone()),
            registry,
            thresholds,
        }
    }

    /// Compare `pair.before` against `pair.after` using their fingerprints
    ///
    /// Content rules only run when both documents carry text; the category
    /// check always runs.
    pub fn compare(
        &self,
        pair: &ComparisonPair<'_>,
        before_fp: &Fingerprint,
        after_fp: &Fingerprint,
    ) -> Vec<TamperingFlag> {
        let (a, b) = (pair.before, pair.after);
        let ids = [a.id.as_str(), b.id.as_str()];
        let mut flags = Vec::new();

        let texts = a.text().zip(b.text());

        if texts.is_some() {
            flags.extend(self.name_discrepancies(pair, before_fp, after_fp));
            flags.extend(self.numeric_changes(before_fp, after_fp));
            flags.extend(self.length_change(pair, before_fp, after_fp));
        }

        if a.category != b.category {
            flags.push(
                TamperingFlag::new(
                    FlagType::MetadataInconsistency,
                    Severity::Medium,
                    70,
                    "Document categorization differs for same-date documents",
                )
                .with_evidence([
                    format!("{}: {}", a.display_name(), a.category),
                    format!("{}: {}", b.display_name(), b.category),
                ]),
            );
        }

        if let Some((before_text, after_text)) = texts {
            flags.extend(self.literals.detect(before_text, after_text, (ids[0], ids[1])));
            flags.extend(self.identifier_changes(before_fp, after_fp));
            flags.extend(self.structure_change(before_fp, after_fp));
            flags.extend(content_hash_change(before_fp, after_fp));
        }

        for flag in flags.iter_mut() {
            if flag.affected_documents.is_empty() {
                flag.affected_documents = ids.iter().map(|s| s.to_string()).collect();
            }
        }

        flags
    }

    fn name_discrepancies(
        &self,
        pair: &ComparisonPair<'_>,
        before_fp: &Fingerprint,
        after_fp: &Fingerprint,
    ) -> Vec<TamperingFlag> {
        let t = &self.thresholds;
        let (a, b) = (pair.before.display_name(), pair.after.display_name());

        self.registry
            .watch_names()
            .filter_map(|name| {
                let count_a = before_fp.name_count(name);
                let count_b = after_fp.name_count(name);
                let diff = count_a.abs_diff(count_b);
                if diff == 0 {
                    return None;
                }

                let severity = if diff > t.name_critical_diff {
                    Severity::Critical
                } else if diff > t.name_high_diff {
                    Severity::High
                } else {
                    Severity::Medium
                };

                Some(
                    TamperingFlag::new(
                        FlagType::NameDiscrepancy,
                        severity,
                        capped_confidence(60.0 + 10.0 * diff as f64, 90),
                        format!(
                            "Name \"{}\" mentioned {} times in {} but {} times in {}",
                            name, count_a, a, count_b, b
                        ),
                    )
                    .with_evidence([
                        format!("Before ({}): {} mentions", a, count_a),
                        format!("After ({}): {} mentions", b, count_b),
                        format!("Difference: {} mentions", diff),
                    ]),
                )
            })
            .collect()
    }

    fn numeric_changes(&self, before_fp: &Fingerprint, after_fp: &Fingerprint) -> Option<TamperingFlag> {
        let added: Vec<&String> = after_fp.numbers.difference(&before_fp.numbers).collect();
        let removed: Vec<&String> = before_fp.numbers.difference(&after_fp.numbers).collect();
        let change_count = added.len() + removed.len();
        if change_count == 0 {
            return None;
        }

        let t = &self.thresholds;
        let severity = if change_count > t.numeric_critical_changes {
            Severity::Critical
        } else if change_count > t.numeric_high_changes {
            Severity::High
        } else {
            Severity::Medium
        };

        Some(
            TamperingFlag::new(
                FlagType::ContentChange,
                severity,
                capped_confidence(50.0 + 3.0 * change_count as f64, 85),
                format!(
                    "Numeric values altered between document versions ({} changes)",
                    change_count
                ),
            )
            .with_evidence([
                format!("Added numbers: {}", preview(added, PREVIEW_LIMIT)),
                format!("Removed numbers: {}", preview(removed, PREVIEW_LIMIT)),
            ]),
        )
    }

    fn length_change(
        &self,
        pair: &ComparisonPair<'_>,
        before_fp: &Fingerprint,
        after_fp: &Fingerprint,
    ) -> Option<TamperingFlag> {
        let (len_a, len_b) = (before_fp.char_count, after_fp.char_count);
        let longest = len_a.max(len_b);
        if longest == 0 {
            return None;
        }
        let diff = len_a.abs_diff(len_b);

        // Cross-multiplied so that exactly-at-threshold never fires
        let t = &self.thresholds;
        let scaled = diff as f64 * 100.0;
        if scaled <= longest as f64 * t.length_change_percent {
            return None;
        }

        let percent = scaled / longest as f64;
        let severity = if scaled > longest as f64 * t.length_change_critical_percent {
            Severity::Critical
        } else {
            Severity::High
        };

        Some(
            TamperingFlag::new(
                FlagType::ContentChange,
                severity,
                capped_confidence(40.0 + percent, 80),
                format!(
                    "Significant content length change ({:.1}% difference)",
                    percent
                ),
            )
            .with_evidence([
                format!("{}: {} characters", pair.before.display_name(), len_a),
                format!("{}: {} characters", pair.after.display_name(), len_b),
                format!("Difference: {} characters ({:.1}%)", diff, percent),
                format!(
                    "Paragraphs: {} -> {}",
                    before_fp.paragraph_count, after_fp.paragraph_count
                ),
            ]),
        )
    }

    fn identifier_changes(&self, before_fp: &Fingerprint, after_fp: &Fingerprint) -> Option<TamperingFlag> {
        let added: BTreeSet<&String> = after_fp
            .evidence_identifiers
            .difference(&before_fp.evidence_identifiers)
            .collect();
        let removed: BTreeSet<&String> = before_fp
            .evidence_identifiers
            .difference(&after_fp.evidence_identifiers)
            .collect();
        if added.is_empty() && removed.is_empty() {
            return None;
        }

        Some(
            TamperingFlag::new(
                FlagType::SignatureMismatch,
                Severity::High,
                90,
                "Evidence identifiers have been modified between document versions",
            )
            .with_evidence([
                format!("Added identifiers: {}", preview(added, PREVIEW_LIMIT)),
                format!("Removed identifiers: {}", preview(removed, PREVIEW_LIMIT)),
            ]),
        )
    }

    fn structure_change(&self, before_fp: &Fingerprint, after_fp: &Fingerprint) -> Option<TamperingFlag> {
        let before_count = before_fp.structural_markers.len();
        let after_count = after_fp.structural_markers.len();
        let diff = before_count.abs_diff(after_count);
        if diff <= self.thresholds.structural_marker_diff {
            return None;
        }

        Some(
            TamperingFlag::new(
                FlagType::SignatureMismatch,
                Severity::Medium,
                capped_confidence(50.0 + 5.0 * diff as f64, 85),
                "Document structure has been significantly altered",
            )
            .with_evidence([
                format!("Structural markers changed by {}", diff),
                format!("Before markers: {}", before_count),
                format!("After markers: {}", after_count),
            ]),
        )
    }
}

fn content_hash_change(before_fp: &Fingerprint, after_fp: &Fingerprint) -> Option<TamperingFlag> {
    if before_fp.content_hash == after_fp.content_hash {
        return None;
    }

    Some(
        TamperingFlag::new(
            FlagType::ContentInsertion,
            Severity::Medium,
            80,
            "Content has been modified between versions",
        )
        .with_evidence([
            "Content fingerprint changed".to_string(),
            format!("Before hash: {}", before_fp.content_hash),
            format!("After hash: {}", after_fp.content_hash),
        ]),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Document, DocumentCategory};
    use crate::fingerprint::FingerprintExtractor;
    use chrono::{TimeZone, Utc};

    struct Fixture {
        comparator: PairComparator,
        extractor: FingerprintExtractor,
    }

    impl Fixture {
        fn new() -> Self {
            let registry = Arc::new(RuleRegistry::builtin().unwrap());
            Self {
                comparator: PairComparator::new(registry.clone(), ThresholdsConfig::default()),
                extractor: FingerprintExtractor::new(registry),
            }
        }

        fn compare(&self, a: &Document, b: &Document) -> Vec<TamperingFlag> {
            let pair = ComparisonPair { before: a, after: b };
            self.comparator.compare(
                &pair,
                &self.extractor.extract_document(a),
                &self.extractor.extract_document(b),
            )
        }
    }

    fn doc(id: &str, text: Option<&str>) -> Document {
        let d = Document::new(id, format!("{id}.pdf"), Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        match text {
            Some(t) => d.with_text(t),
            None => d,
        }
    }

    fn length_flags(flags: &[TamperingFlag]) -> Vec<&TamperingFlag> {
        flags
            .iter()
            .filter(|f| f.description.starts_with("Significant content length change"))
            .collect()
    }

    #[test]
    fn test_identical_documents_produce_no_flags() {
        let fx = Fixture::new();
        let text = "INCIDENT REPORT\nNoel was present. Case #12.";
        assert!(fx.compare(&doc("a", Some(text)), &doc("b", Some(text))).is_empty());
    }

    #[test]
    fn test_name_discrepancy_severity_tiers() {
        let fx = Fixture::new();
        let cases = [(1, Severity::Medium), (2, Severity::High), (3, Severity::High), (4, Severity::Critical)];
        for (diff, expected) in cases {
            let before = "Noel. ".repeat(diff + 1);
            let flags = fx.compare(&doc("a", Some(&before)), &doc("b", Some("Noel. ")));
            let flag = flags
                .iter()
                .find(|f| f.flag_type == FlagType::NameDiscrepancy)
                .unwrap();
            assert_eq!(flag.severity, expected, "diff {diff}");
        }
    }

    #[test]
    fn test_name_discrepancy_symmetric() {
        let fx = Fixture::new();
        let a = doc("a", Some("Noel spoke with Noel's mother."));
        let b = doc("b", Some("Neil spoke with the mother."));
        let forward = fx.compare(&a, &b);
        let backward = fx.compare(&b, &a);
        let names = |flags: &[TamperingFlag]| {
            flags
                .iter()
                .filter(|f| f.flag_type == FlagType::NameDiscrepancy)
                .count()
        };
        assert_eq!(names(&forward), 2);
        assert_eq!(names(&forward), names(&backward));
    }

    #[test]
    fn test_length_threshold_exactly_twenty_percent() {
        let fx = Fixture::new();
        let flags = fx.compare(&doc("a", Some(&"a".repeat(100))), &doc("b", Some(&"a".repeat(80))));
        assert!(length_flags(&flags).is_empty());
    }

    #[test]
    fn test_length_threshold_just_over_twenty_percent() {
        let fx = Fixture::new();
        let flags = fx.compare(&doc("a", Some(&"a".repeat(10000))), &doc("b", Some(&"a".repeat(7999))));
        let found = length_flags(&flags);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].severity, Severity::High);
        assert_eq!(found[0].flag_type, FlagType::ContentChange);
    }

    #[test]
    fn test_length_change_reports_paragraphs() {
        let fx = Fixture::new();
        let before = format!("{}\n\n{}\n\n{}", "a".repeat(100), "b".repeat(100), "c".repeat(100));
        let after = "a".repeat(100);
        let flags = fx.compare(&doc("a", Some(&before)), &doc("b", Some(&after)));
        let found = length_flags(&flags);
        assert_eq!(found.len(), 1);
        assert!(found[0].evidence.contains(&"Paragraphs: 3 -> 1".to_string()));
    }

    #[test]
    fn test_length_threshold_just_over_fifty_percent() {
        let fx = Fixture::new();
        let flags = fx.compare(&doc("a", Some(&"a".repeat(10000))), &doc("b", Some(&"a".repeat(4999))));
        let found = length_flags(&flags);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].severity, Severity::Critical);
        assert_eq!(found[0].confidence, 80);
    }

    #[test]
    fn test_numeric_change_counts() {
        let fx = Fixture::new();
        let flags = fx.compare(
            &doc("a", Some("values 1 2 3 4")),
            &doc("b", Some("values 1 2 5 6")),
        );
        let flag = flags
            .iter()
            .find(|f| f.description.starts_with("Numeric values altered"))
            .unwrap();
        assert!(flag.description.contains("4 changes"));
        assert_eq!(flag.severity, Severity::Medium);
        assert_eq!(flag.confidence, 62);
        assert_eq!(flag.evidence[0], "Added numbers: 5, 6");
    }

    #[test]
    fn test_category_mismatch_without_text() {
        let fx = Fixture::new();
        let a = doc("a", None).with_category(DocumentCategory::Primary);
        let b = doc("b", None).with_category(DocumentCategory::External);
        let flags = fx.compare(&a, &b);
        assert_eq!(flags.len(), 1);
        assert_eq!(flags[0].flag_type, FlagType::MetadataInconsistency);
        assert_eq!(flags[0].confidence, 70);
        assert_eq!(flags[0].affected_documents, vec!["a", "b"]);
    }

    #[test]
    fn test_missing_text_skips_content_rules() {
        let fx = Fixture::new();
        let flags = fx.compare(&doc("a", Some("Noel Johnson 12")), &doc("b", None));
        assert!(flags.is_empty());
    }

    #[test]
    fn test_identifier_change() {
        let fx = Fixture::new();
        let flags = fx.compare(
            &doc("a", Some("Badge #4471 filed report")),
            &doc("b", Some("Badge #4472 filed report")),
        );
        let flag = flags
            .iter()
            .find(|f| f.flag_type == FlagType::SignatureMismatch)
            .unwrap();
        assert_eq!(flag.severity, Severity::High);
        assert_eq!(flag.confidence, 90);
        assert_eq!(flag.evidence[0], "Added identifiers: 4472");
        assert_eq!(flag.evidence[1], "Removed identifiers: 4471");
    }

    #[test]
    fn test_structure_change_confidence() {
        let fx = Fixture::new();
        let before = "ONE\nTWO\nTHREE\nFOUR\nbody";
        let after = "ONE\nbody";
        let flags = fx.compare(&doc("a", Some(before)), &doc("b", Some(after)));
        let flag = flags
            .iter()
            .find(|f| f.description.starts_with("Document structure"))
            .unwrap();
        assert_eq!(flag.severity, Severity::Medium);
        assert_eq!(flag.confidence, 65);
    }

    #[test]
    fn test_content_hash_flag_last() {
        let fx = Fixture::new();
        let flags = fx.compare(&doc("a", Some("the report")), &doc("b", Some("the memo")));
        let last = flags.last().unwrap();
        assert_eq!(last.flag_type, FlagType::ContentInsertion);
        assert_eq!(last.confidence, 80);
    }
}
