//! Fingerprint extraction
//!
//! A fingerprint is the set of signals pulled out of a document's text: watched
//! name counts, numeric tokens, dates, evidence identifiers, structural header
//! lines and a content checksum. Extraction is a pure function of the text.

use crate::document::Document;
use crate::patterns::RuleRegistry;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Signals extracted from one document's text
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint {
    /// Whole-word occurrences of each watch-list name (zero counts included)
    pub name_counts: BTreeMap<String, usize>,
    /// Numeric tokens, compared as strings
    pub numbers: BTreeSet<String>,
    /// Date-like substrings, lower-cased
    pub dates: BTreeSet<String>,
    /// Case, badge, report and code identifiers
    pub evidence_identifiers: BTreeSet<String>,
    /// Header-like lines
    pub structural_markers: BTreeSet<String>,
    /// Checksum of normalized text; empty for empty text
    pub content_hash: String,
    pub char_count: usize,
    pub paragraph_count: usize,
}

impl Fingerprint {
    /// The "no signal" fingerprint for absent or empty text
    pub fn empty(registry: &RuleRegistry) -> Self {
        Self {
            name_counts: registry
                .watch_names()
                .map(|name| (name.to_string(), 0))
                .collect(),
            ..Default::default()
        }
    }

    pub fn name_count(&self, name: &str) -> usize {
        self.name_counts.get(name).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.char_count == 0
    }
}

/// Fingerprint extractor backed by the compiled rule registry
#[derive(Clone)]
pub struct FingerprintExtractor {
    registry: Arc<RuleRegistry>,
}

impl FingerprintExtractor {
    pub fn new(registry: Arc<RuleRegistry>) -> Self {
        Self { registry }
    }

    /// Extract a fingerprint from a document; absent text yields the empty one
    pub fn extract_document(&self, document: &Document) -> Fingerprint {
        match document.text() {
            Some(text) => self.extract(text),
            None => Fingerprint::empty(&self.registry),
        }
    }

    /// Extract a fingerprint from raw text
    pub fn extract(&self, text: &str) -> Fingerprint {
        if text.is_empty() {
            return Fingerprint::empty(&self.registry);
        }

        Fingerprint {
            name_counts: self.count_names(text),
            numbers: self.extract_numbers(text),
            dates: self.extract_dates(text),
            evidence_identifiers: self.extract_identifiers(text),
            structural_markers: self.extract_structural_markers(text),
            content_hash: content_hash(text),
            char_count: text.chars().count(),
            paragraph_count: text.split("\n\n").count(),
        }
    }

    /// Count whole-word, case-insensitive mentions of each watched name
    pub fn count_names(&self, text: &str) -> BTreeMap<String, usize> {
        self.registry
            .names
            .iter()
            .map(|n| (n.name.clone(), n.regex.find_iter(text).count()))
            .collect()
    }

    pub fn extract_numbers(&self, text: &str) -> BTreeSet<String> {
        self.registry
            .text
            .number
            .find_iter(text)
            .map(|m| m.as_str().to_string())
            .collect()
    }

    pub fn extract_dates(&self, text: &str) -> BTreeSet<String> {
        self.registry
            .text
            .dates
            .iter()
            .flat_map(|re| re.find_iter(text).map(|m| m.as_str().to_lowercase()))
            .collect()
    }

    /// Identifier patterns report capture group 1 when they have one
    pub fn extract_identifiers(&self, text: &str) -> BTreeSet<String> {
        let mut identifiers = BTreeSet::new();
        for pattern in &self.registry.identifiers {
            for caps in pattern.regex.captures_iter(text) {
                let value = caps.get(1).or_else(|| caps.get(0));
                if let Some(m) = value {
                    identifiers.insert(m.as_str().to_string());
                }
            }
        }
        identifiers
    }

    pub fn extract_structural_markers(&self, text: &str) -> BTreeSet<String> {
        let patterns = &self.registry.text;
        text.lines()
            .map(str::trim)
            .filter(|line| patterns.label_header.is_match(line) || patterns.caps_header.is_match(line))
            .map(str::to_string)
            .collect()
    }
}

/// Cheap equality checksum: whitespace collapsed, lower-cased, blake3, 16 hex chars
pub fn content_hash(text: &str) -> String {
    let normalized = text
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    if normalized.is_empty() {
        return String::new();
    }
    let hash = blake3::hash(normalized.as_bytes());
    hash.to_hex()[..16].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> FingerprintExtractor {
        FingerprintExtractor::new(Arc::new(RuleRegistry::builtin().unwrap()))
    }

    #[test]
    fn test_word_boundary_names() {
        let ex = extractor();
        let fp = ex.extract("Noelle visited on Monday.");
        assert_eq!(fp.name_count("Noel"), 0);

        let fp = ex.extract("Noel visited on Monday.");
        assert_eq!(fp.name_count("Noel"), 1);
    }

    #[test]
    fn test_names_case_insensitive() {
        let fp = extractor().extract("NOEL said noel was there. Andy Maki agreed.");
        assert_eq!(fp.name_count("Noel"), 2);
        assert_eq!(fp.name_count("Andy Maki"), 1);
        assert_eq!(fp.name_count("Owen"), 0);
    }

    #[test]
    fn test_date_patterns() {
        let fp = extractor().extract(
            "Filed 01/15/2024, hearing on March 3, 2024, order dated 2024-02-10 and 1-5-24.",
        );
        assert!(fp.dates.contains("01/15/2024"));
        assert!(fp.dates.contains("march 3, 2024"));
        assert!(fp.dates.contains("2024-02-10"));
        assert!(fp.dates.contains("1-5-24"));
    }

    #[test]
    fn test_dates_deduplicated() {
        let fp = extractor().extract("01/15/2024 and again 01/15/2024");
        assert_eq!(fp.dates.len(), 1);
    }

    #[test]
    fn test_numbers_include_decimals() {
        let fp = extractor().extract("Age 34, weight 61.5, 12 photos, 12 more");
        let expected: BTreeSet<String> = ["34", "61.5", "12"].iter().map(|s| s.to_string()).collect();
        assert_eq!(fp.numbers, expected);
    }

    #[test]
    fn test_identifiers_use_capture_group() {
        let fp = extractor().extract("Case #2024-0117 handled by badge #4471, ref CP-20931.");
        assert!(fp.evidence_identifiers.contains("2024-0117"));
        assert!(fp.evidence_identifiers.contains("4471"));
        assert!(fp.evidence_identifiers.contains("CP-20931"));
    }

    #[test]
    fn test_case_number_without_marker() {
        let fp = extractor().extract("Re: Case 2024-0117, see also case no. 88-12.");
        assert!(fp.evidence_identifiers.contains("2024-0117"));
        assert!(fp.evidence_identifiers.contains("88-12"));
    }

    #[test]
    fn test_structural_markers() {
        let text = "INCIDENT REPORT\nNARRATIVE:\nOfficer arrived.\nCase Status: ACTIVE\n  SUMMARY  \n";
        let fp = extractor().extract(text);
        assert!(fp.structural_markers.contains("INCIDENT REPORT"));
        assert!(fp.structural_markers.contains("NARRATIVE:"));
        assert!(fp.structural_markers.contains("SUMMARY"));
        assert_eq!(fp.structural_markers.len(), 3);
    }

    #[test]
    fn test_empty_text_yields_empty_fingerprint() {
        let ex = extractor();
        let fp = ex.extract("");
        assert!(fp.is_empty());
        assert!(fp.numbers.is_empty());
        assert!(fp.content_hash.is_empty());
        assert_eq!(fp.name_count("Noel"), 0);
        assert!(fp.name_counts.contains_key("Noel"));
    }

    #[test]
    fn test_hash_ignores_whitespace_and_case() {
        assert_eq!(content_hash("Case  Closed\n"), content_hash("case closed"));
        assert_ne!(content_hash("case closed"), content_hash("case open"));
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let ex = extractor();
        let text = "REPORT\nNoel Johnson, age 34, case #77 on 02/02/2024";
        assert_eq!(ex.extract(text), ex.extract(text));
    }
}
