//! Deterministic markdown rendering of one analysis. No timestamps,
//! no environment data: identical inputs produce identical bytes.

use crate::core::{AnalyzerStatus, Finding};
use crate::proxy::ProxyInfo;
use crate::resolve::Resolved;
use crate::runner::aggregator::Aggregated;
use crate::runner::ANALYZER_ORDER;
use ethers::types::Address;
use std::fmt::Write;

pub fn render(
    proxy_address: Address,
    info: Option<&ProxyInfo>,
    resolved: Option<&Resolved>,
    aggregated: &Aggregated,
) -> String {
    let mut md = String::new();

    let _ = writeln!(md, "# Upgrade Safety Report\n");

    let _ = writeln!(md, "## Summary\n");
    let _ = writeln!(md, "- **Proxy:** `{proxy_address:?}`");
    match info {
        Some(info) => {
            let _ = writeln!(md, "- **Pattern:** {}", info.kind);
            let _ = writeln!(md, "- **Implementation:** `{:?}`", info.implementation);
            if let Some(admin) = info.admin {
                let _ = writeln!(md, "- **Admin:** `{admin:?}`");
            }
        }
        None => {
            let _ = writeln!(md, "- **Pattern:** undetermined");
        }
    }
    if let Some(resolved) = resolved {
        let _ = writeln!(
            md,
            "- **Old implementation:** `{}` ({})",
            resolved.old.path.display(),
            resolved.old.contract_name
        );
        let _ = writeln!(
            md,
            "- **New implementation:** `{}` ({})",
            resolved.new.path.display(),
            resolved.new.contract_name
        );
    }
    let _ = writeln!(md, "- **Verdict:** {}", aggregated.verdict);
    if let Some(severity) = aggregated.highest_severity {
        let _ = writeln!(md, "- **Highest severity:** {severity}");
    }
    let _ = writeln!(md);

    let _ = writeln!(md, "## Analyzer Status\n");
    let _ = writeln!(md, "| Analyzer | Status |");
    let _ = writeln!(md, "|---|---|");
    for name in ANALYZER_ORDER {
        let status = match aggregated.statuses.get(name) {
            Some(AnalyzerStatus::Completed) => "completed".to_string(),
            Some(AnalyzerStatus::Skipped { reason }) => format!("skipped ({reason})"),
            Some(AnalyzerStatus::Errored { message }) => format!("errored ({message})"),
            None => "missing".to_string(),
        };
        let _ = writeln!(md, "| {name} | {status} |");
    }
    let _ = writeln!(md);

    if aggregated.findings.is_empty() {
        let _ = writeln!(md, "## Findings\n\nNo findings.");
        return md;
    }

    let _ = writeln!(md, "## Findings ({})\n", aggregated.findings.len());
    for finding in &aggregated.findings {
        render_finding(&mut md, finding);
    }
    md
}

fn render_finding(md: &mut String, finding: &Finding) {
    let _ = writeln!(
        md,
        "### [{}] {} — {}\n",
        finding.code,
        finding.severity.badge(),
        finding.title
    );
    let _ = writeln!(md, "- **Analyzer:** {}", finding.analyzer);
    let _ = writeln!(md, "- **Confidence:** {}", finding.confidence);
    if let Some(location) = &finding.location {
        let mut parts = Vec::new();
        if let Some(contract) = &location.contract {
            parts.push(format!("contract `{contract}`"));
        }
        if let Some(function) = &location.function {
            parts.push(format!("function `{function}`"));
        }
        if let Some(slot) = location.slot {
            parts.push(format!("slot {slot}"));
        }
        if let Some(offset) = location.offset {
            parts.push(format!("offset {offset}"));
        }
        if !parts.is_empty() {
            let _ = writeln!(md, "- **Location:** {}", parts.join(", "));
        }
    }
    let _ = writeln!(md, "\n{}\n", finding.description);
    if !finding.details.is_empty() {
        let _ = writeln!(md, "**Details:**\n");
        for (key, value) in &finding.details {
            let _ = writeln!(md, "- `{key}`: {value}");
        }
        let _ = writeln!(md);
    }
    if !finding.remediation.is_empty() {
        let _ = writeln!(md, "**Remediation:** {}\n", finding.remediation);
    }
}
