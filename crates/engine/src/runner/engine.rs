//! The engine orchestrator: probe, classify (gating), resolve, fan
//! out the analyzers, aggregate, render. One invocation builds the
//! whole graph on its own call frame; nothing is cached or persisted.

use crate::analyzers::{
    AccessControlAnalyzer, AnalysisContext, Analyzer, InitializerAnalyzer, InterfaceDiffAnalyzer,
    StorageLayoutAnalyzer, TransparentSafetyAnalyzer, UupsSafetyAnalyzer,
};
use crate::artifacts::ArtifactOracle;
use crate::chain::ChainReader;
use crate::core::{AnalyzerOutcome, AnalyzerStatus, Finding, Severity, Verdict};
use crate::error::EngineError;
use crate::proxy::{self, ProxyKind, ProxyInfo};
use crate::report;
use crate::resolve::{resolve, Resolved};
use crate::runner::aggregator::{aggregate, GATED_REASON};
use crate::runner::{
    ACCESS_CONTROL_REGRESSION, ABI_DIFF, INITIALIZER_INTEGRITY, PROXY_DETECTION, STORAGE_LAYOUT,
    TRANSPARENT_SAFETY, UUPS_SAFETY,
};
use ethers::types::Address;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    /// 0x-prefixed 20-byte proxy address.
    pub proxy_address: String,
    pub old_implementation: PathBuf,
    pub new_implementation: PathBuf,
    pub rpc_endpoint: String,
    /// Explicit contract name; auto-detected from artifacts when absent.
    pub contract_name: Option<String>,
}

/// The single entry operation: analyze one upgrade candidate using the
/// `forge` toolchain and the request's RPC endpoint.
pub async fn analyze_upgrade(request: &AnalysisRequest) -> Result<EngineResult, EngineError> {
    let chain = crate::chain::HttpChainReader::new(&request.rpc_endpoint)?;
    let engine = UpgradeEngine::new(
        Box::new(crate::artifacts::FoundryOracle::new()),
        Box::new(chain),
    );
    engine.analyze(request).await
}

#[derive(Debug, Serialize)]
pub struct EngineResult {
    pub verdict: Verdict,
    pub highest_severity: Option<Severity>,
    pub findings: Vec<Finding>,
    pub analyzer_status: BTreeMap<String, AnalyzerStatus>,
    /// Always produced; excluded from the JSON rendering, which
    /// carries the same data structurally.
    #[serde(skip)]
    pub report_markdown: String,
}

impl EngineResult {
    /// Process exit code for subprocess callers.
    pub fn exit_code(&self) -> i32 {
        match self.verdict {
            Verdict::Safe => 0,
            Verdict::Unsafe => match self.highest_severity {
                Some(Severity::Critical) => 1,
                _ => 2,
            },
            Verdict::ReviewRequired => 3,
            Verdict::Incomplete => 4,
        }
    }
}

pub struct UpgradeEngine {
    oracle: Box<dyn ArtifactOracle>,
    chain: Box<dyn ChainReader>,
}

impl UpgradeEngine {
    pub fn new(oracle: Box<dyn ArtifactOracle>, chain: Box<dyn ChainReader>) -> Self {
        Self { oracle, chain }
    }

    pub async fn analyze(&self, request: &AnalysisRequest) -> Result<EngineResult, EngineError> {
        self.oracle.probe()?;

        let proxy_address: Address = request.proxy_address.parse().map_err(|_| {
            EngineError::InputInvalid(format!(
                "`{}` is not a valid 20-byte address",
                request.proxy_address
            ))
        })?;

        let classification = proxy::classify(self.chain.as_ref(), proxy_address).await?;

        let mut outcomes: BTreeMap<String, AnalyzerOutcome> = BTreeMap::new();
        outcomes.insert(
            PROXY_DETECTION.to_string(),
            AnalyzerOutcome::completed(classification.findings.clone()),
        );

        let info = match (&classification.info, classification.is_blocking()) {
            (Some(info), false) => info.clone(),
            _ => {
                warn!("proxy classification failed; gating all downstream analyzers");
                for name in [
                    STORAGE_LAYOUT,
                    ABI_DIFF,
                    UUPS_SAFETY,
                    TRANSPARENT_SAFETY,
                    INITIALIZER_INTEGRITY,
                    ACCESS_CONTROL_REGRESSION,
                ] {
                    outcomes.insert(name.to_string(), AnalyzerOutcome::skipped(GATED_REASON));
                }
                return Ok(self.finish(proxy_address, None, None, outcomes));
            }
        };

        let resolved = resolve(
            self.oracle.as_ref(),
            &request.old_implementation,
            &request.new_implementation,
            request.contract_name.as_deref(),
        )?;

        let ctx = AnalysisContext {
            resolved: &resolved,
            proxy: &info,
        };
        let analyzers: Vec<Box<dyn Analyzer>> = vec![
            Box::new(StorageLayoutAnalyzer),
            Box::new(InterfaceDiffAnalyzer),
            match info.kind {
                ProxyKind::Uups => Box::new(UupsSafetyAnalyzer),
                ProxyKind::Transparent => Box::new(TransparentSafetyAnalyzer),
            },
            Box::new(InitializerAnalyzer),
            Box::new(AccessControlAnalyzer),
        ];

        // All-complete-or-all-trapped: each analyzer's panic or error
        // is captured as its own outcome, never propagated to siblings.
        let results: Vec<(&'static str, AnalyzerOutcome)> = analyzers
            .par_iter()
            .map(|analyzer| (analyzer.id(), run_trapped(analyzer.as_ref(), &ctx)))
            .collect();
        for (name, outcome) in results {
            outcomes.insert(name.to_string(), outcome);
        }

        let inactive = match info.kind {
            ProxyKind::Uups => TRANSPARENT_SAFETY,
            ProxyKind::Transparent => UUPS_SAFETY,
        };
        outcomes.insert(
            inactive.to_string(),
            AnalyzerOutcome::skipped(format!("proxy-type-is-{}", info.kind)),
        );

        Ok(self.finish(proxy_address, Some(&info), Some(&resolved), outcomes))
    }

    fn finish(
        &self,
        proxy_address: Address,
        info: Option<&ProxyInfo>,
        resolved: Option<&Resolved>,
        outcomes: BTreeMap<String, AnalyzerOutcome>,
    ) -> EngineResult {
        let aggregated = aggregate(&outcomes);
        info!(
            verdict = %aggregated.verdict,
            findings = aggregated.findings.len(),
            "analysis complete"
        );
        let report_markdown = report::render(proxy_address, info, resolved, &aggregated);
        EngineResult {
            verdict: aggregated.verdict,
            highest_severity: aggregated.highest_severity,
            findings: aggregated.findings,
            analyzer_status: aggregated.statuses,
            report_markdown,
        }
    }
}

fn run_trapped(analyzer: &dyn Analyzer, ctx: &AnalysisContext<'_>) -> AnalyzerOutcome {
    match catch_unwind(AssertUnwindSafe(|| analyzer.analyze(ctx))) {
        Ok(Ok(findings)) => AnalyzerOutcome::completed(findings),
        Ok(Err(error)) => {
            warn!(analyzer = analyzer.id(), %error, "analyzer errored");
            AnalyzerOutcome::errored(error.to_string())
        }
        Err(payload) => {
            let message = panic_message(payload);
            warn!(analyzer = analyzer.id(), message, "analyzer panicked");
            AnalyzerOutcome::errored(message)
        }
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "analyzer panicked".to_string()
    }
}
