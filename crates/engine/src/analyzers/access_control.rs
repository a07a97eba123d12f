//! Access-control regression: functions present on both sides must not
//! lose their guards or widen their visibility across the upgrade.

use crate::analyzers::{has_access_signal, has_guard_modifier, AnalysisContext, Analyzer};
use crate::artifacts::{ContractAst, FunctionDecl};
use crate::core::{Confidence, Finding, FindingLocation, Severity};
use crate::runner::ACCESS_CONTROL_REGRESSION;
use anyhow::Result;
use std::collections::BTreeMap;

const AUTHORIZE_UPGRADE: &str = "_authorizeUpgrade";

pub struct AccessControlAnalyzer;

impl Analyzer for AccessControlAnalyzer {
    fn id(&self) -> &'static str {
        ACCESS_CONTROL_REGRESSION
    }

    fn description(&self) -> &'static str {
        "Detects per-function access-control regressions from old to new"
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> Result<Vec<Finding>> {
        Ok(diff_access_control(
            &ctx.resolved.old.ast,
            &ctx.resolved.new.ast,
        ))
    }
}

fn named_functions(ast: &ContractAst) -> BTreeMap<&str, &FunctionDecl> {
    ast.functions
        .iter()
        .filter(|f| !f.name.is_empty())
        .map(|f| (f.name.as_str(), f))
        .collect()
}

fn has_only_owner(decl: &FunctionDecl) -> bool {
    decl.modifiers.iter().any(|m| m == "onlyOwner")
}

fn has_only_role(decl: &FunctionDecl) -> bool {
    decl.modifiers.iter().any(|m| m.starts_with("onlyRole"))
}

pub fn diff_access_control(old_ast: &ContractAst, new_ast: &ContractAst) -> Vec<Finding> {
    let contract = new_ast.name.as_str();
    let old_fns = named_functions(old_ast);
    let new_fns = named_functions(new_ast);
    let mut findings = Vec::new();

    // Functions removed from new are interface-diff territory; only
    // names present on both sides are compared here.
    for (name, old_fn) in &old_fns {
        let Some(new_fn) = new_fns.get(name) else {
            continue;
        };
        let mut modifier_rule_fired = false;

        if has_only_owner(old_fn) && !has_only_owner(new_fn) {
            modifier_rule_fired = true;
            findings.push(
                Finding::new(
                    "ACL-001",
                    Severity::Critical,
                    Confidence::High,
                    format!("`{name}` lost its `onlyOwner` modifier"),
                    format!(
                        "`{name}` was owner-gated in the old implementation and the new one \
                         drops the modifier; any account can now call it"
                    ),
                )
                .with_analyzer(ACCESS_CONTROL_REGRESSION)
                .with_location(FindingLocation::function(contract, name))
                .with_remediation("restore the `onlyOwner` modifier or an equivalent guard"),
            );
        }

        if has_only_role(old_fn) && !has_only_role(new_fn) {
            modifier_rule_fired = true;
            findings.push(
                Finding::new(
                    "ACL-002",
                    Severity::Critical,
                    Confidence::High,
                    format!("`{name}` lost its role restriction"),
                    format!(
                        "`{name}` carried an `onlyRole` modifier in the old implementation \
                         and the new one has none; the role gate is gone"
                    ),
                )
                .with_analyzer(ACCESS_CONTROL_REGRESSION)
                .with_location(FindingLocation::function(contract, name))
                .with_remediation("restore the `onlyRole` modifier with the original role"),
            );
        }

        if !modifier_rule_fired && has_access_signal(old_fn) && !has_access_signal(new_fn) {
            findings.push(
                Finding::new(
                    "ACL-003",
                    Severity::High,
                    Confidence::Medium,
                    format!("`{name}` lost its access-control signal"),
                    format!(
                        "the old `{name}` carried a guard modifier or caller-identity check \
                         and the new one carries neither; the function looks newly open"
                    ),
                )
                .with_analyzer(ACCESS_CONTROL_REGRESSION)
                .with_location(FindingLocation::function(contract, name))
                .with_remediation("re-apply the guard, or document why the function is now open"),
            );
        }

        if old_fn.visibility.is_internal() && new_fn.visibility.is_external_surface() {
            findings.push(
                Finding::new(
                    "ACL-004",
                    Severity::High,
                    Confidence::High,
                    format!("`{name}` became externally callable"),
                    format!(
                        "`{name}` was {:?} and is now {:?}; previously unreachable logic \
                         joined the external surface",
                        old_fn.visibility, new_fn.visibility
                    ),
                )
                .with_analyzer(ACCESS_CONTROL_REGRESSION)
                .with_detail("old_visibility", format!("{:?}", old_fn.visibility).to_lowercase())
                .with_detail("new_visibility", format!("{:?}", new_fn.visibility).to_lowercase())
                .with_location(FindingLocation::function(contract, name))
                .with_remediation("keep helper functions internal, or guard the new entry point"),
            );
        }

        if *name == AUTHORIZE_UPGRADE
            && (has_guard_modifier(old_fn) || old_fn.references_sender())
            && !(has_guard_modifier(new_fn) || new_fn.references_sender())
        {
            findings.push(
                Finding::new(
                    "ACL-007",
                    Severity::Critical,
                    Confidence::Medium,
                    "Upgrade authorization weakened",
                    format!(
                        "the old `{AUTHORIZE_UPGRADE}` had a guard modifier or sender check; \
                         the new one has neither, so upgrade authorization regressed to open"
                    ),
                )
                .with_analyzer(ACCESS_CONTROL_REGRESSION)
                .with_location(FindingLocation::function(contract, AUTHORIZE_UPGRADE))
                .with_remediation("guard `_authorizeUpgrade` exactly as the old implementation did"),
            );
        }
    }

    findings
}
