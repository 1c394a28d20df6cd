// Known literal tampering patterns: phrase substitutions, shrinking evidence
// counts and disappearing statements. All matches are verbatim substring checks
// and every hit is reported as critical with confidence 100.
use super::{line_excerpt, FlagType, Severity, TamperingFlag};
use crate::patterns::{CompiledCountRule, PhraseRule, RemovalRule, RuleRegistry};
use std::sync::Arc;

const LITERAL_CONFIDENCE: u8 = 100;

/// Applies the rule set's literal rules to a before/after text pair
pub struct LiteralRuleMatcher {
    registry: Arc<RuleRegistry>,
}

impl LiteralRuleMatcher {
    pub fn new(registry: Arc<RuleRegistry>) -> Self {
        Self { registry }
    }

    /// Run every phrase, count and removal rule; `ids` are (before, after)
    pub fn detect(&self, before: &str, after: &str, ids: (&str, &str)) -> Vec<TamperingFlag> {
        let mut flags = Vec::new();

        for rule in &self.registry.phrases {
            if let Some(flag) = phrase_substitution(rule, before, after) {
                flags.push(flag.with_documents([ids.0, ids.1]));
            }
        }

        for rule in &self.registry.counts {
            if let Some(flag) = count_reduction(rule, before, after) {
                flags.push(flag.with_documents([ids.0, ids.1]));
            }
        }

        for rule in &self.registry.removals {
            if let Some(flag) = statement_removal(rule, before, after) {
                flags.push(flag.with_documents([ids.0, ids.1]));
            }
        }

        if !flags.is_empty() {
            tracing::debug!(
                "{} literal rule hit(s) between {} and {}",
                flags.len(),
                ids.0,
                ids.1
            );
        }

        flags
    }
}

fn phrase_substitution(rule: &PhraseRule, before: &str, after: &str) -> Option<TamperingFlag> {
    // Count each literal with the other one masked out, so "ACTIVE" inside
    // "INACTIVE" or "substantiated" inside "unsubstantiated" is not a hit
    let before_masked = mask(before, &rule.before, &rule.after);
    let after_masked = mask(after, &rule.before, &rule.after);
    let old_in_before = before_masked.0.matches(rule.before.as_str()).count();
    let old_in_after = after_masked.0.matches(rule.before.as_str()).count();
    let new_in_before = before_masked.1.matches(rule.after.as_str()).count();
    let new_in_after = after_masked.1.matches(rule.after.as_str()).count();

    // Only an actual substitution counts: the old literal became rarer and
    // the new one more common
    if old_in_before <= old_in_after || new_in_after <= new_in_before {
        return None;
    }

    let before_at = before_masked.0.find(rule.before.as_str())?;
    let after_at = after_masked.1.find(rule.after.as_str())?;

    let mut flag = TamperingFlag::new(
        rule.kind,
        Severity::Critical,
        LITERAL_CONFIDENCE,
        format!(
            "{}: \"{}\" replaced by \"{}\"",
            rule.description, rule.before, rule.after
        ),
    )
    .with_evidence([
        format!("Before: {}", line_excerpt(before, before_at)),
        format!("After: {}", line_excerpt(after, after_at)),
    ]);

    if let Some(location) = &rule.location {
        flag = flag.with_location(location.clone());
    }
    Some(flag)
}

/// Two views of `text`: one for counting `old` with every `new` occurrence
/// blanked out (when `new` contains `old`), one for counting `new` with `old`
/// blanked out (when `old` contains `new`). Blanking keeps byte offsets.
fn mask(text: &str, old: &str, new: &str) -> (String, String) {
    let blank = |s: &str, hide: &str, keep: &str| {
        if hide.contains(keep) {
            s.replace(hide, &"\0".repeat(hide.len()))
        } else {
            s.to_string()
        }
    };
    (blank(text, new, old), blank(text, old, new))
}

fn first_count(rule: &CompiledCountRule, text: &str) -> Option<u64> {
    rule.regex
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

fn count_reduction(rule: &CompiledCountRule, before: &str, after: &str) -> Option<TamperingFlag> {
    let before_count = first_count(rule, before)?;
    let after_count = first_count(rule, after)?;
    if before_count <= after_count {
        return None;
    }

    Some(
        TamperingFlag::new(
            FlagType::EvidenceSuppression,
            Severity::Critical,
            LITERAL_CONFIDENCE,
            format!(
                "Evidence count reduced from {} to {} {}",
                before_count, after_count, rule.label
            ),
        )
        .with_evidence([
            format!("Before: {} {}", before_count, rule.label),
            format!(
                "After: {} {} ({} missing)",
                after_count,
                rule.label,
                before_count - after_count
            ),
        ])
        .with_location(rule.name.clone()),
    )
}

fn statement_removal(rule: &RemovalRule, before: &str, after: &str) -> Option<TamperingFlag> {
    let at = before.find(&rule.present)?;
    if after.contains(&rule.absent) {
        return None;
    }

    Some(
        TamperingFlag::new(
            FlagType::WitnessRemoval,
            Severity::Critical,
            LITERAL_CONFIDENCE,
            format!("{}: \"{}\" no longer present", rule.description, rule.present),
        )
        .with_evidence([
            format!("Before: {}", line_excerpt(before, at)),
            format!("After: no \"{}\" reference", rule.absent),
        ])
        .with_location(rule.name.clone()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher() -> LiteralRuleMatcher {
        LiteralRuleMatcher::new(Arc::new(RuleRegistry::builtin().unwrap()))
    }

    #[test]
    fn test_name_substitution() {
        let flags = matcher().detect(
            "Witness: Noel Johnson (witness, age 34)",
            "Witness: Neil Johnson (witness, age 34)",
            ("a", "b"),
        );
        let flag = flags
            .iter()
            .find(|f| f.flag_type == FlagType::NameChange)
            .unwrap();
        assert_eq!(flag.severity, Severity::Critical);
        assert_eq!(flag.confidence, 100);
        assert!(flag.description.contains("Johnson"));
        assert_eq!(flag.affected_documents, vec!["a", "b"]);
        assert_eq!(flag.evidence[0], "Before: Witness: Noel Johnson (witness, age 34)");
    }

    #[test]
    fn test_substitution_is_directional() {
        let flags = matcher().detect("Neil Johnson", "Noel Johnson", ("a", "b"));
        assert!(flags.iter().all(|f| f.flag_type != FlagType::NameChange));
    }

    #[test]
    fn test_count_reduction() {
        let flags = matcher().detect(
            "Collected 12 digital photographs",
            "Collected 8 digital photographs",
            ("a", "b"),
        );
        let flag = flags
            .iter()
            .find(|f| f.flag_type == FlagType::EvidenceSuppression)
            .unwrap();
        assert!(flag.description.contains("12"));
        assert!(flag.description.contains("8"));
        assert!(flag.evidence[1].contains("4 missing"));
    }

    #[test]
    fn test_count_increase_not_flagged() {
        let flags = matcher().detect("8 digital photographs", "12 digital photographs", ("a", "b"));
        assert!(flags.is_empty());
    }

    #[test]
    fn test_statement_removal() {
        let flags = matcher().detect(
            "Neighbor: Noel Johnson (provided statement)",
            "Neighbor interviews pending",
            ("a", "b"),
        );
        assert!(flags.iter().any(|f| f.flag_type == FlagType::WitnessRemoval));
    }

    #[test]
    fn test_statement_kept_not_flagged() {
        let flags = matcher().detect(
            "Neighbor: Noel Johnson (provided statement)",
            "Neighbor: N. Johnson (provided statement)",
            ("a", "b"),
        );
        assert!(flags.iter().all(|f| f.flag_type != FlagType::WitnessRemoval));
    }

    #[test]
    fn test_overlapping_literals_in_identical_text() {
        let text = "Case Status: INACTIVE. Prior complaint CLOSED.\nFinding: unsubstantiated";
        assert!(matcher().detect(text, text, ("a", "b")).is_empty());
    }

    #[test]
    fn test_substring_literal_substitution() {
        let flags = matcher().detect(
            "Finding: substantiated",
            "Finding: unsubstantiated",
            ("a", "b"),
        );
        assert_eq!(flags.len(), 1);
        assert_eq!(flags[0].flag_type, FlagType::StatusChange);
        assert_eq!(flags[0].evidence[0], "Before: Finding: substantiated");
    }

    #[test]
    fn test_both_literals_unchanged_not_flagged() {
        let text = "Status was ACTIVE until the case was CLOSED on review.";
        assert!(matcher().detect(text, text, ("a", "b")).is_empty());
    }

    #[test]
    fn test_identical_text_has_no_hits() {
        let text = "Case Status: ACTIVE. 12 digital photographs.";
        assert!(matcher().detect(text, text, ("a", "b")).is_empty());
    }
}
