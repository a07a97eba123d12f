//! Verdict aggregation: collapses the seven analyzer outcomes into a
//! single verdict and a deterministically ordered finding list.

use crate::core::{AnalyzerOutcome, AnalyzerStatus, Finding, Severity, Verdict};
use crate::runner::{analyzer_rank, ANALYZER_ORDER};
use std::collections::BTreeMap;

/// Reason string used when classification gates the rest of the run.
pub const GATED_REASON: &str = "proxy-detection-failed";

#[derive(Debug)]
pub struct Aggregated {
    pub verdict: Verdict,
    pub highest_severity: Option<Severity>,
    pub findings: Vec<Finding>,
    pub statuses: BTreeMap<String, AnalyzerStatus>,
}

pub fn aggregate(outcomes: &BTreeMap<String, AnalyzerOutcome>) -> Aggregated {
    debug_assert_eq!(outcomes.len(), ANALYZER_ORDER.len());

    let statuses: BTreeMap<String, AnalyzerStatus> = outcomes
        .iter()
        .map(|(name, outcome)| (name.clone(), outcome.status()))
        .collect();

    let mut findings: Vec<Finding> = outcomes
        .values()
        .flat_map(|o| o.findings().iter().cloned())
        .collect();
    findings.sort_by(|a, b| sort_key(a).cmp(&sort_key(b)));

    let gated = outcomes.values().any(
        |o| matches!(o, AnalyzerOutcome::Skipped { reason } if reason == GATED_REASON),
    );
    let errored = outcomes
        .values()
        .any(|o| matches!(o, AnalyzerOutcome::Errored { .. }));

    let verdict = if gated || errored {
        Verdict::Incomplete
    } else {
        let highest = findings.iter().map(|f| f.severity).max();
        match highest {
            Some(Severity::Critical) | Some(Severity::High) => Verdict::Unsafe,
            Some(Severity::Medium) => Verdict::ReviewRequired,
            _ => Verdict::Safe,
        }
    };

    let highest_severity = if verdict == Verdict::Incomplete {
        None
    } else {
        findings.iter().map(|f| f.severity).max()
    };

    Aggregated {
        verdict,
        highest_severity,
        findings,
        statuses,
    }
}

/// Stable total order: analyzer (fixed order), then code, then primary
/// location key. `u64::MAX`-style defaults push locationless findings
/// after located ones within a code.
fn sort_key(finding: &Finding) -> (usize, String, u64, u8, String) {
    let (slot, offset, function) = match &finding.location {
        Some(location) => (
            location.slot.unwrap_or(u64::MAX),
            location.offset.unwrap_or(u8::MAX),
            location.function.clone().unwrap_or_default(),
        ),
        None => (u64::MAX, u8::MAX, String::new()),
    };
    (
        analyzer_rank(&finding.analyzer),
        finding.code.clone(),
        slot,
        offset,
        function,
    )
}
