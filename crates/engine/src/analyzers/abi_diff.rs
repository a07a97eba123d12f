//! Interface differ: detects removed and reshaped functions, selector
//! collisions, and event signature drift between the two ABIs.

use crate::analyzers::{AnalysisContext, Analyzer};
use crate::artifacts::abi::{selector_hex, Abi, EventSig, FunctionSig};
use crate::core::{Confidence, Finding, FindingLocation, Severity};
use crate::runner::ABI_DIFF;
use anyhow::Result;
use std::collections::HashSet;

pub struct InterfaceDiffAnalyzer;

impl Analyzer for InterfaceDiffAnalyzer {
    fn id(&self) -> &'static str {
        ABI_DIFF
    }

    fn description(&self) -> &'static str {
        "Compares old and new ABIs for breaking interface changes"
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> Result<Vec<Finding>> {
        Ok(diff_abis(
            &ctx.resolved.old.abi,
            &ctx.resolved.new.abi,
            &ctx.resolved.new.contract_name,
        ))
    }
}

pub fn diff_abis(old: &Abi, new: &Abi, new_contract: &str) -> Vec<Finding> {
    let mut findings = Vec::new();

    for old_fn in &old.functions {
        match new.function_by_selector(&old_fn.selector) {
            None => {
                if let Some(renamed) = new.functions.iter().find(|f| f.name == old_fn.name) {
                    findings.push(signature_changed(old_fn, renamed, new_contract));
                } else {
                    findings.push(selector_removed(old_fn, new_contract));
                }
            }
            Some(new_fn) => {
                if old_fn.outputs != new_fn.outputs {
                    findings.push(return_type_changed(old_fn, new_fn, new_contract));
                }
            }
        }
    }

    let mut seen = HashSet::new();
    for new_fn in &new.functions {
        if !seen.insert(new_fn.selector) {
            findings.push(selector_collision(new_fn, new_contract));
        }
    }

    let old_selectors: HashSet<_> = old.functions.iter().map(|f| f.selector).collect();
    for new_fn in &new.functions {
        if !old_selectors.contains(&new_fn.selector) {
            findings.push(new_function(new_fn, new_contract));
        }
    }

    let new_topics: HashSet<_> = new.events.iter().map(|e| e.topic0).collect();
    for old_event in &old.events {
        if !new_topics.contains(&old_event.topic0) {
            if let Some(renamed) = new.events.iter().find(|e| e.name == old_event.name) {
                findings.push(event_signature_changed(old_event, renamed, new_contract));
            } else {
                findings.push(event_removed(old_event, new_contract));
            }
        }
    }

    findings
}

fn selector_removed(old_fn: &FunctionSig, contract: &str) -> Finding {
    Finding::new(
        "ABI-001",
        Severity::High,
        Confidence::High,
        format!("Function `{}` removed", old_fn.signature()),
        format!(
            "selector {} (`{}`) exists in the old interface and is absent from the new one; \
             integrators calling it will hit the fallback or revert",
            selector_hex(&old_fn.selector),
            old_fn.signature()
        ),
    )
    .with_analyzer(ABI_DIFF)
    .with_detail("selector", selector_hex(&old_fn.selector))
    .with_detail("signature", old_fn.signature())
    .with_location(FindingLocation::function(contract, &old_fn.name))
    .with_remediation("keep the function, or deprecate it behind a revert with a clear message")
}

fn signature_changed(old_fn: &FunctionSig, new_fn: &FunctionSig, contract: &str) -> Finding {
    Finding::new(
        "ABI-003",
        Severity::High,
        Confidence::High,
        format!("Signature of `{}` changed", old_fn.name),
        format!(
            "`{}` became `{}`; the selector changed from {} to {}, so existing callers \
             dispatch into nothing",
            old_fn.signature(),
            new_fn.signature(),
            selector_hex(&old_fn.selector),
            selector_hex(&new_fn.selector)
        ),
    )
    .with_analyzer(ABI_DIFF)
    .with_detail("old_signature", old_fn.signature())
    .with_detail("new_signature", new_fn.signature())
    .with_location(FindingLocation::function(contract, &old_fn.name))
    .with_remediation("add an overload with the old signature that forwards to the new one")
}

fn return_type_changed(old_fn: &FunctionSig, new_fn: &FunctionSig, contract: &str) -> Finding {
    Finding::new(
        "ABI-004",
        Severity::Medium,
        Confidence::High,
        format!("Return type of `{}` changed", old_fn.signature()),
        format!(
            "outputs changed from ({}) to ({}); callers decoding the old shape will \
             misinterpret the returned words",
            old_fn.outputs.join(","),
            new_fn.outputs.join(",")
        ),
    )
    .with_analyzer(ABI_DIFF)
    .with_detail("old_outputs", old_fn.outputs.join(","))
    .with_detail("new_outputs", new_fn.outputs.join(","))
    .with_location(FindingLocation::function(contract, &old_fn.name))
    .with_remediation("keep return types stable; add a new function for the new shape")
}

fn selector_collision(new_fn: &FunctionSig, contract: &str) -> Finding {
    Finding::new(
        "ABI-002",
        Severity::Critical,
        Confidence::High,
        format!("Selector collision on {}", selector_hex(&new_fn.selector)),
        format!(
            "`{}` shares selector {} with an earlier function in the new interface; only one \
             of them is reachable through dispatch",
            new_fn.signature(),
            selector_hex(&new_fn.selector)
        ),
    )
    .with_analyzer(ABI_DIFF)
    .with_detail("selector", selector_hex(&new_fn.selector))
    .with_detail("signature", new_fn.signature())
    .with_location(FindingLocation::function(contract, &new_fn.name))
    .with_remediation("rename one of the colliding functions")
}

fn new_function(new_fn: &FunctionSig, contract: &str) -> Finding {
    Finding::new(
        "ABI-005",
        Severity::Low,
        Confidence::High,
        format!("New function `{}`", new_fn.signature()),
        format!(
            "selector {} is new in this implementation; review its access control and state \
             effects",
            selector_hex(&new_fn.selector)
        ),
    )
    .with_analyzer(ABI_DIFF)
    .with_detail("selector", selector_hex(&new_fn.selector))
    .with_detail("signature", new_fn.signature())
    .with_location(FindingLocation::function(contract, &new_fn.name))
    .with_remediation("confirm the new entry point is intended and guarded appropriately")
}

fn event_signature_changed(old_event: &EventSig, new_event: &EventSig, contract: &str) -> Finding {
    Finding::new(
        "ABI-006",
        Severity::High,
        Confidence::High,
        format!("Signature of event `{}` changed", old_event.name),
        format!(
            "`{}` became `{}`; topic0 changed, so existing log subscriptions silently stop \
             matching",
            old_event.signature(),
            new_event.signature()
        ),
    )
    .with_analyzer(ABI_DIFF)
    .with_detail("old_signature", old_event.signature())
    .with_detail("new_signature", new_event.signature())
    .with_location(FindingLocation::function(contract, &old_event.name))
    .with_remediation("keep event signatures stable; emit an additional event if needed")
}

fn event_removed(old_event: &EventSig, contract: &str) -> Finding {
    Finding::new(
        "ABI-007",
        Severity::Medium,
        Confidence::High,
        format!("Event `{}` removed", old_event.signature()),
        format!(
            "the event `{}` no longer exists in the new implementation; off-chain indexers \
             relying on it will miss activity",
            old_event.signature()
        ),
    )
    .with_analyzer(ABI_DIFF)
    .with_detail("signature", old_event.signature())
    .with_location(FindingLocation::function(contract, &old_event.name))
    .with_remediation("keep emitting the event, or coordinate the removal with indexers")
}
