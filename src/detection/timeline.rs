// Timeline conflicts: a document modified well after a later document was
// uploaded.
use super::{FlagType, Severity, TamperingFlag};
use crate::document::Document;
use chrono::{DateTime, Duration, Utc};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

fn fmt_time(t: &DateTime<Utc>) -> String {
    t.format(TIMESTAMP_FORMAT).to_string()
}

/// Flag every (earlier, later) upload pair where the earlier document's last
/// modification postdates the later upload by more than `grace`
pub fn detect_timeline_conflicts(documents: &[Document], grace: Duration) -> Vec<TamperingFlag> {
    let mut sorted: Vec<&Document> = documents.iter().collect();
    sorted.sort_by_key(|d| d.uploaded_at);

    let mut flags = Vec::new();
    for (i, current) in sorted.iter().enumerate() {
        let Some(modified) = current.last_modified else {
            continue;
        };

        for newer in &sorted[i + 1..] {
            // A window past the end of representable time never closes
            let Some(deadline) = newer.uploaded_at.checked_add_signed(grace) else {
                continue;
            };
            if modified <= deadline {
                continue;
            }

            flags.push(
                TamperingFlag::new(
                    FlagType::TimelineConflict,
                    Severity::High,
                    85,
                    format!(
                        "Document \"{}\" was modified after newer document \"{}\" was created",
                        current.display_name(),
                        newer.display_name()
                    ),
                )
                .with_evidence([
                    format!("{} last modified: {}", current.display_name(), fmt_time(&modified)),
                    format!("{} uploaded: {}", newer.display_name(), fmt_time(&newer.uploaded_at)),
                    format!(
                        "Modified by: {}",
                        current.last_modified_by.as_deref().unwrap_or("unknown")
                    ),
                ])
                .with_documents([current.id.as_str(), newer.id.as_str()])
                .with_location("Timeline Analysis"),
            );
        }
    }

    tracing::debug!("Timeline analysis produced {} flag(s)", flags.len());
    flags
}
