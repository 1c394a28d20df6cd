// Tampering detection rules
//
// Pair rules:     comparator (heuristic deltas) + phrases (known literal patterns)
// Single rules:   integrity (redaction traces, date sprawl, formatting jumps)
// Global rules:   timeline (modification after a later upload)

mod comparator;
mod integrity;
mod phrases;
mod timeline;
mod types;

pub use comparator::PairComparator;
pub use integrity::IntegrityChecker;
pub use phrases::LiteralRuleMatcher;
pub use timeline::detect_timeline_conflicts;
pub use types::{sort_by_severity, FlagType, Severity, TamperingFlag};

pub(crate) use types::capped_confidence;

/// Line of `text` containing byte offset `at`, trimmed, for evidence excerpts
pub(crate) fn line_excerpt(text: &str, at: usize) -> &str {
    let start = text[..at].rfind('\n').map(|i| i + 1).unwrap_or(0);
    let end = text[at..].find('\n').map(|i| at + i).unwrap_or(text.len());
    text[start..end].trim()
}

/// Comma-joined preview of at most `limit` items, with an ellipsis when cut
pub(crate) fn preview<'a, I>(items: I, limit: usize) -> String
where
    I: IntoIterator<Item = &'a String>,
{
    let items: Vec<&String> = items.into_iter().collect();
    if items.is_empty() {
        return "none".to_string();
    }
    let shown: Vec<&str> = items.iter().take(limit).map(|s| s.as_str()).collect();
    let mut out = shown.join(", ");
    if items.len() > limit {
        out.push_str("...");
    }
    out
}
