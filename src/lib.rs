//! Tamperscan - heuristic document tampering detection
//!
//! Takes a batch of related documents (for example successive versions of the
//! same case file), groups them by the date they describe, compares every pair
//! of versions within a group and checks each document on its own. The result
//! is an [`report::AnalysisReport`] of severity-ranked flags with risk
//! roll-ups, rendered as markdown or JSON.
//!
//! ```no_run
//! use tamperscan::document::load_documents;
//! use tamperscan::report::{Analyzer, ReportFormat, ReportRenderer};
//!
//! # fn main() -> tamperscan::Result<()> {
//! let documents = load_documents(std::path::Path::new("documents.json"))?;
//! let report = Analyzer::with_defaults()?.analyze(&documents);
//! let markdown = ReportRenderer::new(ReportFormat::Markdown).render(&report, &documents)?;
//! println!("{markdown}");
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod detection;
pub mod document;
pub mod error;
pub mod fingerprint;
pub mod grouping;
pub mod patterns;
pub mod report;

pub use error::{Result, TamperError};
