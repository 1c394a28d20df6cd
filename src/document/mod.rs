//! Input documents
//!
//! Documents arrive already ingested (text extracted, timestamps known). Field
//! names follow the camelCase JSON produced by the ingestion side.

use crate::error::{Result, TamperError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;

/// Document classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DocumentCategory {
    #[default]
    Primary,
    Supporting,
    External,
    No,
}

impl fmt::Display for DocumentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DocumentCategory::Primary => "Primary",
            DocumentCategory::Supporting => "Supporting",
            DocumentCategory::External => "External",
            DocumentCategory::No => "No",
        };
        f.write_str(s)
    }
}

/// A document submitted for analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    pub file_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_content: Option<String>,
    /// Authoritative creation time
    pub uploaded_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified_by: Option<String>,
    #[serde(default)]
    pub category: DocumentCategory,
}

impl Document {
    pub fn new(
        id: impl Into<String>,
        file_name: impl Into<String>,
        uploaded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            file_name: file_name.into(),
            title: None,
            description: None,
            text_content: None,
            uploaded_at,
            last_modified: None,
            last_modified_by: None,
            category: DocumentCategory::default(),
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text_content = Some(text.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_category(mut self, category: DocumentCategory) -> Self {
        self.category = category;
        self
    }

    pub fn with_last_modified(mut self, at: DateTime<Utc>, by: Option<String>) -> Self {
        self.last_modified = Some(at);
        self.last_modified_by = by;
        self
    }

    /// Title when present, otherwise the file name
    pub fn display_name(&self) -> &str {
        self.title
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(&self.file_name)
    }

    /// Text body, if any non-empty text was extracted
    pub fn text(&self) -> Option<&str> {
        self.text_content.as_deref().filter(|t| !t.is_empty())
    }
}

/// Load a JSON array of documents
pub fn load_documents(path: &Path) -> Result<Vec<Document>> {
    let content = std::fs::read_to_string(path).map_err(|e| TamperError::Io {
        source: e,
        context: format!("Failed to read documents file: {:?}", path),
    })?;
    let documents: Vec<Document> =
        serde_json::from_str(&content).map_err(|e| TamperError::Json {
            source: e,
            context: format!("Failed to parse documents file: {:?}", path),
        })?;

    ensure_unique_ids(&documents)?;
    Ok(documents)
}

/// Document ids must be unique within one analysis run
pub fn ensure_unique_ids(documents: &[Document]) -> Result<()> {
    let mut seen = HashSet::new();
    for doc in documents {
        if !seen.insert(doc.id.as_str()) {
            return Err(TamperError::Input(format!(
                "Duplicate document id '{}'",
                doc.id
            )));
        }
    }
    Ok(())
}
