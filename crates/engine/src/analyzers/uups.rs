//! UUPS branch of the upgrade-auth check: the new implementation must
//! define `_authorizeUpgrade` with a guarded, non-empty body.

use crate::analyzers::{has_access_signal, AnalysisContext, Analyzer};
use crate::artifacts::ContractAst;
use crate::core::{Confidence, Finding, FindingLocation, Severity};
use crate::runner::UUPS_SAFETY;
use anyhow::Result;

const AUTHORIZE_UPGRADE: &str = "_authorizeUpgrade";

pub struct UupsSafetyAnalyzer;

impl Analyzer for UupsSafetyAnalyzer {
    fn id(&self) -> &'static str {
        UUPS_SAFETY
    }

    fn description(&self) -> &'static str {
        "Checks the UUPS upgrade-authorization hook of the new implementation"
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> Result<Vec<Finding>> {
        Ok(check_uups(&ctx.resolved.new.ast))
    }
}

pub fn check_uups(new_ast: &ContractAst) -> Vec<Finding> {
    let contract = new_ast.name.as_str();

    let Some(hook) = new_ast.function(AUTHORIZE_UPGRADE) else {
        return vec![Finding::new(
            "UUPS-001",
            Severity::Critical,
            Confidence::High,
            "Missing `_authorizeUpgrade`",
            format!(
                "`{contract}` defines no `_authorizeUpgrade`; a UUPS implementation without \
                 the hook cannot restrict who replaces it"
            ),
        )
        .with_analyzer(UUPS_SAFETY)
        .with_location(FindingLocation::function(contract, AUTHORIZE_UPGRADE))
        .with_remediation("override `_authorizeUpgrade` and guard it with an owner or role check")];
    };

    if hook.has_empty_body() {
        return vec![Finding::new(
            "UUPS-002",
            Severity::Critical,
            Confidence::High,
            "`_authorizeUpgrade` has an empty body",
            format!(
                "`{contract}._authorizeUpgrade` exists but its body is empty; every caller \
                 is authorized to upgrade the proxy"
            ),
        )
        .with_analyzer(UUPS_SAFETY)
        .with_location(FindingLocation::function(contract, AUTHORIZE_UPGRADE))
        .with_remediation("add an access check (e.g. an `onlyOwner` modifier) to the hook body")];
    }

    if !has_access_signal(hook) {
        return vec![Finding::new(
            "UUPS-003",
            Severity::Critical,
            Confidence::Medium,
            "`_authorizeUpgrade` is unguarded",
            format!(
                "`{contract}._authorizeUpgrade` has a body but neither a guard modifier nor a \
                 caller-identity check; the upgrade path appears open to anyone"
            ),
        )
        .with_analyzer(UUPS_SAFETY)
        .with_location(FindingLocation::function(contract, AUTHORIZE_UPGRADE))
        .with_remediation("restrict the hook with a guard modifier or an explicit sender check")];
    }

    Vec::new()
}
