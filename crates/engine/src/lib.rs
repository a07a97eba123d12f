//! Upgradeguard Engine - Deterministic Upgrade-Safety Analysis
//!
//! Given a deployed proxy, artifacts for the old and new implementation
//! contracts, and a JSON-RPC endpoint, the engine decides whether
//! swapping implementations would corrupt storage, break the external
//! interface, or weaken access control. Findings are facts, not
//! errors: an `Unsafe` verdict is a normal, successful output.

pub mod analyzers;
pub mod artifacts;
pub mod chain;
pub mod core;
pub mod error;
pub mod proxy;
pub mod report;
pub mod resolve;
pub mod runner;

pub use analyzers::{AnalysisContext, Analyzer};
pub use artifacts::{Abi, ArtifactKey, ArtifactOracle, ContractAst, FoundryOracle, StorageLayout};
pub use chain::{ChainReader, HttpChainReader};
pub use core::{
    AnalyzerOutcome, AnalyzerStatus, Confidence, Finding, FindingLocation, Severity, Verdict,
};
pub use error::EngineError;
pub use proxy::{ProxyInfo, ProxyKind};
pub use resolve::{Resolved, Side};
pub use runner::{analyze_upgrade, AnalysisRequest, EngineResult, UpgradeEngine, ANALYZER_ORDER};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
