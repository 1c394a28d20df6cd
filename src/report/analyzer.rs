use super::{
    recommendations, AnalysisReport, DateGroupAnalysis, DocumentRisk, OverallRiskAssessment,
    PatternAnalysis, RiskLevel,
};
use crate::config::AnalysisSettings;
use crate::detection::{
    detect_timeline_conflicts, sort_by_severity, FlagType, IntegrityChecker, PairComparator,
    Severity, TamperingFlag,
};
use crate::document::Document;
use crate::fingerprint::{Fingerprint, FingerprintExtractor};
use crate::grouping::group_by_date;
use crate::patterns::RuleRegistry;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Runs grouping, pairwise comparison, integrity and timeline rules over a
/// batch of documents and rolls the results up into an [`AnalysisReport`]
///
/// The analyzer holds no mutable state; `analyze` is a pure function of its
/// input and may be called concurrently from several threads.
pub struct Analyzer {
    registry: Arc<RuleRegistry>,
    settings: AnalysisSettings,
    extractor: FingerprintExtractor,
    comparator: PairComparator,
    integrity: IntegrityChecker,
}

impl Analyzer {
    pub fn new(registry: Arc<RuleRegistry>, settings: AnalysisSettings) -> Self {
        Self {
            extractor: FingerprintExtractor::new(registry.clone()),
            comparator: PairComparator::new(registry.clone(), settings.thresholds.clone()),
            integrity: IntegrityChecker::new(registry.clone(), settings.analysis.clone()),
            registry,
            settings,
        }
    }

    /// Built-in rule set with default settings
    pub fn with_defaults() -> crate::Result<Self> {
        Ok(Self::new(
            Arc::new(RuleRegistry::builtin()?),
            AnalysisSettings::default(),
        ))
    }

    /// Analyze `documents`. Ids are expected to be unique (see
    /// [`crate::document::ensure_unique_ids`]); an empty slice yields an
    /// empty low-risk report.
    pub fn analyze(&self, documents: &[Document]) -> AnalysisReport {
        info!("Analyzing {} document(s)", documents.len());

        let date_groups = self.analyze_date_groups(documents);

        let mut document_flags: Vec<TamperingFlag> = documents
            .iter()
            .flat_map(|d| self.integrity.check(d))
            .collect();
        sort_by_severity(&mut document_flags);

        let mut timeline_flags =
            detect_timeline_conflicts(documents, self.settings.timeline_grace());
        sort_by_severity(&mut timeline_flags);

        let all_flags: Vec<&TamperingFlag> = date_groups
            .iter()
            .flat_map(|g| g.flags.iter())
            .chain(document_flags.iter())
            .chain(timeline_flags.iter())
            .collect();
        let document_risks = document_risks(documents, &all_flags);
        let patterns = PatternAnalysis::from_flags(all_flags.iter().copied());
        let overall_risk_assessment = OverallRiskAssessment::from_flags(all_flags.iter().copied());
        let recommendations = recommendations(&overall_risk_assessment, &patterns);

        let report = AnalysisReport {
            documents_analyzed: documents.len(),
            date_groups,
            document_flags,
            timeline_flags,
            document_risks,
            patterns,
            overall_risk_assessment,
            recommendations,
        };

        info!(
            "Analysis complete: {} flag(s), {} critical, overall risk {}",
            report.overall_risk_assessment.total_flags,
            report.overall_risk_assessment.critical_flags,
            report.overall_risk_assessment.risk_level
        );

        report
    }

    fn analyze_date_groups(&self, documents: &[Document]) -> Vec<DateGroupAnalysis> {
        let groups = group_by_date(documents, &self.registry);
        let mut fingerprints: HashMap<&str, Fingerprint> = HashMap::new();
        let mut analyses = Vec::new();

        for group in &groups {
            if group.documents.len() < 2 {
                continue;
            }

            for doc in &group.documents {
                fingerprints
                    .entry(doc.id.as_str())
                    .or_insert_with(|| self.extractor.extract_document(doc));
            }

            let mut flags = Vec::new();
            for pair in group.pairs() {
                let (Some(before_fp), Some(after_fp)) = (
                    fingerprints.get(pair.before.id.as_str()),
                    fingerprints.get(pair.after.id.as_str()),
                ) else {
                    continue;
                };
                flags.extend(self.comparator.compare(&pair, before_fp, after_fp));
            }
            sort_by_severity(&mut flags);

            let risk_level = RiskLevel::for_group(&flags);
            debug!(
                "Date group {}: {} document(s), {} flag(s), risk {}",
                group.date_key(),
                group.documents.len(),
                flags.len(),
                risk_level
            );

            analyses.push(DateGroupAnalysis {
                date: group.date_key(),
                document_ids: group.documents.iter().map(|d| d.id.clone()).collect(),
                flags,
                risk_level,
            });
        }

        // Stable: equal-risk groups keep ascending date order
        analyses.sort_by(|a, b| b.risk_level.cmp(&a.risk_level));
        analyses
    }
}

fn document_risks(documents: &[Document], all_flags: &[&TamperingFlag]) -> Vec<DocumentRisk> {
    documents
        .iter()
        .map(|doc| {
            let flags: Vec<&TamperingFlag> = all_flags
                .iter()
                .copied()
                .filter(|f| f.affects(&doc.id))
                .collect();
            DocumentRisk {
                document_id: doc.id.clone(),
                file_name: doc.file_name.clone(),
                risk_level: RiskLevel::from_max_severity(flags.iter().copied()),
                flag_count: flags.len(),
                critical_count: flags
                    .iter()
                    .filter(|f| f.severity == Severity::Critical)
                    .count(),
                evidence_suppression_count: flags
                    .iter()
                    .filter(|f| f.flag_type == FlagType::EvidenceSuppression)
                    .count(),
            }
        })
        .collect()
}
