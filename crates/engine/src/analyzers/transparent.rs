//! Transparent branch of the upgrade-auth check: the proxy's admin
//! must be set, and the implementation must not shadow the proxy's own
//! admin surface.

use crate::analyzers::{AnalysisContext, Analyzer};
use crate::artifacts::abi::{selector, selector_hex, Abi, Selector};
use crate::core::{Confidence, Finding, FindingLocation, Severity};
use crate::proxy::ProxyInfo;
use crate::runner::TRANSPARENT_SAFETY;
use anyhow::Result;

/// Signatures the transparent proxy itself answers when called by the
/// admin. An implementation re-exposing one of these is unreachable
/// for the admin and confusing for everyone else.
const PROXY_ADMIN_SIGNATURES: [&str; 5] = [
    "upgradeTo(address)",
    "upgradeToAndCall(address,bytes)",
    "changeAdmin(address)",
    "admin()",
    "implementation()",
];

const UPGRADE_FUNCTION_NAMES: [&str; 2] = ["upgradeTo", "upgradeToAndCall"];

pub struct TransparentSafetyAnalyzer;

impl Analyzer for TransparentSafetyAnalyzer {
    fn id(&self) -> &'static str {
        TRANSPARENT_SAFETY
    }

    fn description(&self) -> &'static str {
        "Checks admin configuration and selector shadowing for transparent proxies"
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> Result<Vec<Finding>> {
        Ok(check_transparent(
            ctx.proxy,
            &ctx.resolved.new.abi,
            &ctx.resolved.new.contract_name,
        ))
    }
}

pub fn check_transparent(proxy: &ProxyInfo, new_abi: &Abi, new_contract: &str) -> Vec<Finding> {
    let mut findings = Vec::new();

    if proxy.admin.is_some_and(|admin| admin.is_zero()) {
        findings.push(
            Finding::new(
                "TPROXY-001",
                Severity::Critical,
                Confidence::High,
                "Proxy admin is the zero address",
                format!(
                    "the admin slot of {:?} holds the zero address; nobody can ever upgrade \
                     this proxy again",
                    proxy.proxy
                ),
            )
            .with_analyzer(TRANSPARENT_SAFETY)
            .with_remediation("set the admin to a controlled address before upgrading"),
        );
    }

    let exposed: Vec<&str> = UPGRADE_FUNCTION_NAMES
        .iter()
        .copied()
        .filter(|name| new_abi.functions.iter().any(|f| f.name == *name))
        .collect();
    if !exposed.is_empty() {
        findings.push(
            Finding::new(
                "TPROXY-002",
                Severity::High,
                Confidence::High,
                "Upgrade function exposed on the implementation",
                format!(
                    "`{new_contract}` defines [{}]; under a transparent proxy the upgrade \
                     machinery belongs to the proxy, and an implementation-side copy invites \
                     direct calls that bypass the admin",
                    exposed.join(", ")
                ),
            )
            .with_analyzer(TRANSPARENT_SAFETY)
            .with_detail("functions", serde_json::json!(exposed))
            .with_location(FindingLocation {
                contract: Some(new_contract.to_string()),
                ..Default::default()
            })
            .with_remediation("remove upgrade functions from transparent-proxy implementations"),
        );
    }

    let admin_selectors: Vec<(Selector, &str)> = PROXY_ADMIN_SIGNATURES
        .iter()
        .map(|sig| (selector(sig), *sig))
        .collect();
    for function in &new_abi.functions {
        if let Some((_, shadowed)) = admin_selectors
            .iter()
            .find(|(sel, _)| *sel == function.selector)
        {
            findings.push(
                Finding::new(
                    "TPROXY-004",
                    Severity::High,
                    Confidence::High,
                    format!("`{}` collides with the proxy admin surface", function.signature()),
                    format!(
                        "selector {} of `{}` equals the proxy's `{shadowed}`; admin calls \
                         intercepted by the proxy never reach the implementation, and \
                         non-admin calls reach a function pretending to be proxy machinery",
                        selector_hex(&function.selector),
                        function.signature()
                    ),
                )
                .with_analyzer(TRANSPARENT_SAFETY)
                .with_detail("selector", selector_hex(&function.selector))
                .with_detail("shadowed_signature", *shadowed)
                .with_location(FindingLocation::function(new_contract, &function.name))
                .with_remediation("rename the function so its selector no longer collides"),
            );
        }
    }

    findings
}
