// Markdown and JSON rendering. Rendering never reads the clock, so the same
// report always renders to the same bytes.
use super::{AnalysisReport, PatternAnalysis, RiskLevel};
use crate::detection::{Severity, TamperingFlag};
use crate::document::Document;
use crate::error::{Result, TamperError};
use std::collections::HashMap;
use std::fmt::{self, Write};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    #[default]
    Markdown,
    Json,
}

impl FromStr for ReportFormat {
    type Err = TamperError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "markdown" | "md" => Ok(ReportFormat::Markdown),
            "json" => Ok(ReportFormat::Json),
            other => Err(TamperError::Input(format!(
                "Unknown report format '{}' (expected markdown or json)",
                other
            ))),
        }
    }
}

/// Renders an [`AnalysisReport`]
///
/// Flags below `min_severity` are left out of the flag listings; counts and
/// risk levels always reflect the full analysis.
#[derive(Debug, Clone, Copy)]
pub struct ReportRenderer {
    format: ReportFormat,
    min_severity: Severity,
}

impl ReportRenderer {
    pub fn new(format: ReportFormat) -> Self {
        Self {
            format,
            min_severity: Severity::Low,
        }
    }

    pub fn with_min_severity(mut self, min_severity: Severity) -> Self {
        self.min_severity = min_severity;
        self
    }

    /// `documents` is only used to resolve ids to display names
    pub fn render(&self, report: &AnalysisReport, documents: &[Document]) -> Result<String> {
        match self.format {
            ReportFormat::Json => {
                serde_json::to_string_pretty(&self.visible(report)).map_err(|e| {
                    TamperError::Json {
                        source: e,
                        context: "Failed to serialize analysis report".to_string(),
                    }
                })
            }
            ReportFormat::Markdown => {
                let names: HashMap<&str, &str> = documents
                    .iter()
                    .map(|d| (d.id.as_str(), d.display_name()))
                    .collect();
                let mut out = String::new();
                self.write_markdown(&mut out, &self.visible(report), &names)
                    .map_err(|e| anyhow::anyhow!("Failed to render markdown report: {}", e))?;
                Ok(out)
            }
        }
    }

    fn visible(&self, report: &AnalysisReport) -> AnalysisReport {
        let min = self.min_severity;
        let keep = |flags: &[TamperingFlag]| -> Vec<TamperingFlag> {
            flags.iter().filter(|f| f.severity >= min).cloned().collect()
        };

        let mut visible = report.clone();
        for group in visible.date_groups.iter_mut() {
            group.flags = keep(&group.flags);
        }
        visible.document_flags = keep(&report.document_flags);
        visible.timeline_flags = keep(&report.timeline_flags);
        visible
    }

    fn write_markdown(
        &self,
        out: &mut String,
        report: &AnalysisReport,
        names: &HashMap<&str, &str>,
    ) -> fmt::Result {
        let name = |id: &str| names.get(id).copied().unwrap_or(id).to_string();
        let overall = &report.overall_risk_assessment;

        writeln!(out, "# Document Tampering Analysis Report")?;
        writeln!(out)?;
        writeln!(out, "**Documents Analyzed:** {}", report.documents_analyzed)?;
        writeln!(out, "**Total Flags:** {}", overall.total_flags)?;
        writeln!(out, "**Critical Flags:** {}", overall.critical_flags)?;
        writeln!(out, "**Overall Risk:** {}", risk_label(overall.risk_level))?;
        if self.min_severity > Severity::Low {
            writeln!(out, "**Showing Flags At Or Above:** {}", self.min_severity)?;
        }
        writeln!(out)?;

        writeln!(out, "## Overall Risk Assessment")?;
        writeln!(out)?;
        writeln!(out, "{}", overall.summary)?;
        writeln!(out)?;
        if !overall.high_risk_documents.is_empty() {
            writeln!(out, "### High-Risk Documents")?;
            writeln!(out)?;
            for id in &overall.high_risk_documents {
                writeln!(out, "- {}", name(id.as_str()))?;
            }
            writeln!(out)?;
        }

        if !report.date_groups.is_empty() {
            writeln!(out, "## Date-Based Analysis")?;
            writeln!(out)?;
            for group in &report.date_groups {
                writeln!(
                    out,
                    "### {} ({} RISK)",
                    group.date,
                    risk_label(group.risk_level)
                )?;
                writeln!(out)?;
                let docs: Vec<String> = group
                    .document_ids
                    .iter()
                    .map(|id| name(id.as_str()))
                    .collect();
                writeln!(out, "**Documents:** {}", docs.join(", "))?;
                writeln!(out)?;
                if group.flags.is_empty() {
                    writeln!(out, "No tampering indicators.")?;
                    writeln!(out)?;
                } else {
                    write_flags(out, &group.flags)?;
                }
            }
        }

        if !report.document_flags.is_empty() {
            writeln!(out, "## Document Integrity")?;
            writeln!(out)?;
            for id in report
                .document_risks
                .iter()
                .map(|r| r.document_id.as_str())
            {
                let flags: Vec<TamperingFlag> = report
                    .document_flags
                    .iter()
                    .filter(|f| f.affects(id))
                    .cloned()
                    .collect();
                if flags.is_empty() {
                    continue;
                }
                writeln!(out, "### {}", name(id))?;
                writeln!(out)?;
                write_flags(out, &flags)?;
            }
        }

        if !report.timeline_flags.is_empty() {
            writeln!(out, "## Timeline Inconsistencies")?;
            writeln!(out)?;
            write_flags(out, &report.timeline_flags)?;
        }

        let risky: Vec<_> = report
            .document_risks
            .iter()
            .filter(|r| r.flag_count > 0)
            .collect();
        if !risky.is_empty() {
            writeln!(out, "## Document Risk")?;
            writeln!(out)?;
            writeln!(out, "| Document | Risk | Flags | Critical | Evidence Suppression |")?;
            writeln!(out, "|---|---|---|---|---|")?;
            for risk in risky {
                writeln!(
                    out,
                    "| {} | {} | {} | {} | {} |",
                    name(risk.document_id.as_str()),
                    risk_label(risk.risk_level),
                    risk.flag_count,
                    risk.critical_count,
                    risk.evidence_suppression_count
                )?;
            }
            writeln!(out)?;
        }

        write_patterns(out, &report.patterns)?;

        writeln!(out, "## Recommendations")?;
        writeln!(out)?;
        for rec in &report.recommendations {
            writeln!(out, "- {}", rec)?;
        }

        Ok(())
    }
}

fn risk_label(level: RiskLevel) -> String {
    level.as_str().to_uppercase()
}

fn write_flags(out: &mut String, flags: &[TamperingFlag]) -> fmt::Result {
    for (i, flag) in flags.iter().enumerate() {
        writeln!(
            out,
            "{}. **{}** ({})",
            i + 1,
            flag.flag_type.heading(),
            flag.severity.as_str().to_uppercase()
        )?;
        writeln!(out, "   - {}", flag.description)?;
        writeln!(out, "   - Confidence: {}%", flag.confidence)?;
        if let Some(location) = &flag.location {
            writeln!(out, "   - Location: {}", location)?;
        }
        for line in &flag.evidence {
            writeln!(out, "   - {}", line)?;
        }
    }
    writeln!(out)
}

fn write_patterns(out: &mut String, patterns: &PatternAnalysis) -> fmt::Result {
    let mark = |on: bool| if on { "DETECTED" } else { "not detected" };

    writeln!(out, "## Pattern Analysis")?;
    writeln!(out)?;
    writeln!(out, "- Systematic tampering: {}", mark(patterns.systematic_tampering))?;
    writeln!(out, "- Coordinated alterations: {}", mark(patterns.coordinated_alterations))?;
    writeln!(out, "- Evidence suppression: {}", mark(patterns.evidence_suppression))?;
    writeln!(out, "- Witness manipulation: {}", mark(patterns.witness_manipulation))?;
    writeln!(out)
}
