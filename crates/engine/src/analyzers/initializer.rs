//! Initializer discipline of the new implementation: constructors must
//! not touch storage, initializers must exist and be unique, and the
//! constructor should disable initializers on the implementation.

use crate::analyzers::{AnalysisContext, Analyzer};
use crate::artifacts::{ContractAst, FunctionDecl, FunctionKind};
use crate::core::{Confidence, Finding, FindingLocation, Severity};
use crate::runner::INITIALIZER_INTEGRITY;
use anyhow::Result;

const DISABLE_INITIALIZERS: &str = "_disableInitializers";

pub struct InitializerAnalyzer;

impl Analyzer for InitializerAnalyzer {
    fn id(&self) -> &'static str {
        INITIALIZER_INTEGRITY
    }

    fn description(&self) -> &'static str {
        "Checks constructor and initializer discipline of the new implementation"
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> Result<Vec<Finding>> {
        Ok(check_initializers(&ctx.resolved.new.ast))
    }
}

fn is_initializer(decl: &FunctionDecl) -> bool {
    decl.kind == FunctionKind::Regular
        && decl
            .modifiers
            .iter()
            .any(|m| m == "initializer" || m == "reinitializer")
}

pub fn check_initializers(new_ast: &ContractAst) -> Vec<Finding> {
    let contract = new_ast.name.as_str();
    let mut findings = Vec::new();

    let constructors: Vec<&FunctionDecl> = new_ast.constructors().collect();
    let init_fns: Vec<&FunctionDecl> = new_ast
        .functions
        .iter()
        .filter(|f| is_initializer(f))
        .collect();

    for ctor in &constructors {
        if ctor.has_storage_assignment() {
            findings.push(
                Finding::new(
                    "INIT-001",
                    Severity::Critical,
                    Confidence::High,
                    "Constructor writes to storage",
                    format!(
                        "the constructor of `{contract}` assigns state; constructor effects \
                         live in the implementation's own storage and are invisible through \
                         the proxy, so the proxied state stays uninitialized"
                    ),
                )
                .with_analyzer(INITIALIZER_INTEGRITY)
                .with_location(FindingLocation::function(contract, "constructor"))
                .with_remediation("move state setup from the constructor into the initializer"),
            );
        }
    }

    if !constructors.is_empty()
        && !constructors.iter().any(|c| c.calls(DISABLE_INITIALIZERS))
    {
        findings.push(
            Finding::new(
                "INIT-005",
                Severity::Medium,
                Confidence::Medium,
                "Constructor does not disable initializers",
                format!(
                    "`{contract}` has a constructor that never calls `{DISABLE_INITIALIZERS}`; \
                     the uninitialized implementation contract can be initialized directly by \
                     anyone"
                ),
            )
            .with_analyzer(INITIALIZER_INTEGRITY)
            .with_location(FindingLocation::function(contract, "constructor"))
            .with_remediation("call `_disableInitializers()` in the implementation constructor"),
        );
    }

    if init_fns.is_empty() {
        findings.push(
            Finding::new(
                "INIT-002",
                Severity::High,
                Confidence::High,
                "No initializer function",
                format!(
                    "`{contract}` defines no function with an `initializer` or `reinitializer` \
                     modifier; proxied state has no sanctioned setup path"
                ),
            )
            .with_analyzer(INITIALIZER_INTEGRITY)
            .with_location(FindingLocation {
                contract: Some(contract.to_string()),
                ..Default::default()
            })
            .with_remediation("add an `initialize` function guarded by the `initializer` modifier"),
        );
    }

    let plain_initializers: Vec<&&FunctionDecl> = init_fns
        .iter()
        .filter(|f| f.modifiers.iter().any(|m| m == "initializer"))
        .collect();
    if plain_initializers.len() > 1 {
        let names: Vec<&str> = plain_initializers.iter().map(|f| f.name.as_str()).collect();
        findings.push(
            Finding::new(
                "INIT-006",
                Severity::High,
                Confidence::High,
                "Multiple `initializer` functions",
                format!(
                    "`{contract}` defines {} functions with the plain `initializer` modifier \
                     ([{}]); only one can ever run, the rest are dead or a setup trap",
                    names.len(),
                    names.join(", ")
                ),
            )
            .with_analyzer(INITIALIZER_INTEGRITY)
            .with_detail("functions", serde_json::json!(names))
            .with_location(FindingLocation {
                contract: Some(contract.to_string()),
                ..Default::default()
            })
            .with_remediation("keep one `initializer`; use `reinitializer(n)` for upgrades"),
        );
    }

    findings
}
