//! Date grouping and pair selection
//!
//! Documents that share an inferred document date are compared pairwise. The
//! date comes from the file name first (`MM.DD.YYYY` or `YYYY-MM-DD`), then from
//! a `Date:` label in the text. Within a pair, file-name markers decide which
//! side is the earlier version; upload time breaks the remaining ties.

use crate::document::Document;
use crate::patterns::RuleRegistry;
use chrono::NaiveDate;
use std::cmp::Ordering;
use std::collections::BTreeMap;

const BEFORE_MARKERS: [&str; 2] = ["original", "initial"];
const AFTER_MARKERS: [&str; 2] = ["revised", "amended"];

/// Documents sharing one inferred date, in input order
#[derive(Debug, Clone)]
pub struct DateGroup<'a> {
    pub date: NaiveDate,
    pub documents: Vec<&'a Document>,
}

/// Two documents oriented as earlier (`before`) and later (`after`) version
#[derive(Debug, Clone, Copy)]
pub struct ComparisonPair<'a> {
    pub before: &'a Document,
    pub after: &'a Document,
}

/// Which side of a revision a file name claims to be
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum VersionRole {
    Before,
    Unmarked,
    After,
}

impl VersionRole {
    pub fn from_file_name(file_name: &str) -> Self {
        let lower = file_name.to_lowercase();
        if BEFORE_MARKERS.iter().any(|m| lower.contains(m)) {
            VersionRole::Before
        } else if AFTER_MARKERS.iter().any(|m| lower.contains(m)) {
            VersionRole::After
        } else {
            VersionRole::Unmarked
        }
    }
}

impl<'a> DateGroup<'a> {
    /// Date in ISO form, used as the group key in reports
    pub fn date_key(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }

    /// All n·(n−1)/2 oriented pairs; empty for groups under two documents
    pub fn pairs(&self) -> Vec<ComparisonPair<'a>> {
        let docs = &self.documents;
        let mut pairs = Vec::with_capacity(docs.len() * docs.len().saturating_sub(1) / 2);
        for i in 0..docs.len() {
            for j in (i + 1)..docs.len() {
                pairs.push(ComparisonPair::oriented(docs[i], docs[j]));
            }
        }
        pairs
    }
}

impl<'a> ComparisonPair<'a> {
    /// Orient two documents; `first` precedes `second` in input order
    pub fn oriented(first: &'a Document, second: &'a Document) -> Self {
        let role_a = VersionRole::from_file_name(&first.file_name);
        let role_b = VersionRole::from_file_name(&second.file_name);

        let order = role_a
            .cmp(&role_b)
            .then_with(|| first.uploaded_at.cmp(&second.uploaded_at));

        match order {
            Ordering::Greater => Self {
                before: second,
                after: first,
            },
            _ => Self {
                before: first,
                after: second,
            },
        }
    }
}

/// Infer a document's logical date from its file name, then its text
pub fn infer_document_date(document: &Document, registry: &RuleRegistry) -> Option<NaiveDate> {
    date_from_file_name(&document.file_name, registry)
        .or_else(|| document.text().and_then(|t| date_from_content(t, registry)))
}

fn date_from_file_name(file_name: &str, registry: &RuleRegistry) -> Option<NaiveDate> {
    registry
        .text
        .filename_date
        .captures_iter(file_name)
        .find_map(|caps| {
            if let (Some(m), Some(d), Some(y)) = (caps.get(1), caps.get(2), caps.get(3)) {
                ymd(y.as_str(), m.as_str(), d.as_str())
            } else if let (Some(y), Some(m), Some(d)) = (caps.get(4), caps.get(5), caps.get(6)) {
                ymd(y.as_str(), m.as_str(), d.as_str())
            } else {
                None
            }
        })
}

fn date_from_content(text: &str, registry: &RuleRegistry) -> Option<NaiveDate> {
    registry
        .text
        .content_date
        .captures_iter(text)
        .find_map(|caps| {
            if let Some(named) = caps.get(1) {
                NaiveDate::parse_from_str(named.as_str(), "%B %d, %Y").ok()
            } else if let (Some(m), Some(d), Some(y)) = (caps.get(2), caps.get(3), caps.get(4)) {
                ymd(y.as_str(), m.as_str(), d.as_str())
            } else if let (Some(y), Some(m), Some(d)) = (caps.get(5), caps.get(6), caps.get(7)) {
                ymd(y.as_str(), m.as_str(), d.as_str())
            } else {
                None
            }
        })
}

fn ymd(year: &str, month: &str, day: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, day.parse().ok()?)
}

/// Bucket documents by inferred date, ascending; undated documents are skipped
pub fn group_by_date<'a>(documents: &'a [Document], registry: &RuleRegistry) -> Vec<DateGroup<'a>> {
    let mut groups: BTreeMap<NaiveDate, Vec<&'a Document>> = BTreeMap::new();

    for doc in documents {
        match infer_document_date(doc, registry) {
            Some(date) => groups.entry(date).or_default().push(doc),
            None => tracing::debug!("No document date for '{}', skipping grouping", doc.file_name),
        }
    }

    groups
        .into_iter()
        .map(|(date, documents)| DateGroup { date, documents })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn registry() -> RuleRegistry {
        RuleRegistry::builtin().unwrap()
    }

    fn doc(id: &str, file_name: &str, day: u32) -> Document {
        Document::new(id, file_name, Utc.with_ymd_and_hms(2024, 3, day, 9, 0, 0).unwrap())
    }

    #[test]
    fn test_date_from_file_name_formats() {
        let reg = registry();
        assert_eq!(
            infer_document_date(&doc("a", "Police Report 01.15.2024.pdf", 1), &reg),
            NaiveDate::from_ymd_opt(2024, 1, 15)
        );
        assert_eq!(
            infer_document_date(&doc("b", "cps-2024-02-03-revised.pdf", 1), &reg),
            NaiveDate::from_ymd_opt(2024, 2, 3)
        );
    }

    #[test]
    fn test_invalid_file_name_date_falls_back_to_content() {
        let reg = registry();
        let d = doc("a", "scan 13.45.2024.pdf", 1).with_text("Date: March 5, 2024\nBody");
        assert_eq!(infer_document_date(&d, &reg), NaiveDate::from_ymd_opt(2024, 3, 5));
    }

    #[test]
    fn test_content_date_numeric_forms() {
        let reg = registry();
        let d = doc("a", "scan.pdf", 1).with_text("Date: 04/09/2024");
        assert_eq!(infer_document_date(&d, &reg), NaiveDate::from_ymd_opt(2024, 4, 9));
        let d = doc("b", "scan.pdf", 1).with_text("Date: 2024-04-10");
        assert_eq!(infer_document_date(&d, &reg), NaiveDate::from_ymd_opt(2024, 4, 10));
    }

    #[test]
    fn test_undated_documents_not_grouped() {
        let reg = registry();
        let docs = vec![doc("a", "notes.pdf", 1), doc("b", "letter.pdf", 2)];
        assert!(group_by_date(&docs, &reg).is_empty());
    }

    #[test]
    fn test_groups_ordered_by_date() {
        let reg = registry();
        let docs = vec![
            doc("a", "report 02.01.2024.pdf", 1),
            doc("b", "report 01.01.2024.pdf", 1),
            doc("c", "report 02.01.2024 revised.pdf", 2),
        ];
        let groups = group_by_date(&docs, &reg);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].date_key(), "2024-01-01");
        assert_eq!(groups[1].documents.len(), 2);
    }

    #[test]
    fn test_pair_count() {
        let reg = registry();
        let docs: Vec<Document> = (1..=4)
            .map(|i| doc(&format!("d{i}"), "memo 05.05.2024.pdf", i))
            .collect();
        let groups = group_by_date(&docs, &reg);
        assert_eq!(groups[0].pairs().len(), 6);

        let single = vec![doc("x", "memo 05.05.2024.pdf", 1)];
        assert!(group_by_date(&single, &reg)[0].pairs().is_empty());
    }

    #[test]
    fn test_markers_override_upload_order() {
        let revised = doc("r", "CPS Report Revised 01.15.2024.pdf", 1);
        let original = doc("o", "CPS Report Original 01.15.2024.pdf", 5);
        let pair = ComparisonPair::oriented(&revised, &original);
        assert_eq!(pair.before.id, "o");
        assert_eq!(pair.after.id, "r");
    }

    #[test]
    fn test_unmarked_pair_uses_upload_time() {
        let later = doc("late", "report 01.15.2024.pdf", 9);
        let earlier = doc("early", "report copy 01.15.2024.pdf", 2);
        let pair = ComparisonPair::oriented(&later, &earlier);
        assert_eq!(pair.before.id, "early");
    }

    #[test]
    fn test_amended_is_after_unmarked() {
        let amended = doc("a", "report amended.pdf", 1);
        let plain = doc("p", "report.pdf", 7);
        let pair = ComparisonPair::oriented(&amended, &plain);
        assert_eq!(pair.before.id, "p");
    }
}
