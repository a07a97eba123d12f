//! Analysis orchestration: the engine sequences classification,
//! resolution, and the analyzer fan-out, then hands outcomes to the
//! aggregator for the verdict.

pub mod aggregator;
pub mod engine;

pub use aggregator::{aggregate, Aggregated};
pub use engine::{analyze_upgrade, AnalysisRequest, EngineResult, UpgradeEngine};

pub const PROXY_DETECTION: &str = "proxy-detection";
pub const STORAGE_LAYOUT: &str = "storage-layout";
pub const ABI_DIFF: &str = "abi-diff";
pub const UUPS_SAFETY: &str = "uups-safety";
pub const TRANSPARENT_SAFETY: &str = "transparent-safety";
pub const INITIALIZER_INTEGRITY: &str = "initializer-integrity";
pub const ACCESS_CONTROL_REGRESSION: &str = "access-control-regression";

/// Fixed presentation order. Drives both the status table and the
/// first key of the finding sort, so reports are reproducible.
pub const ANALYZER_ORDER: [&str; 7] = [
    PROXY_DETECTION,
    STORAGE_LAYOUT,
    ABI_DIFF,
    UUPS_SAFETY,
    TRANSPARENT_SAFETY,
    INITIALIZER_INTEGRITY,
    ACCESS_CONTROL_REGRESSION,
];

pub(crate) fn analyzer_rank(name: &str) -> usize {
    ANALYZER_ORDER
        .iter()
        .position(|n| *n == name)
        .unwrap_or(ANALYZER_ORDER.len())
}

/// `(name, description)` pairs in report order, for listing what the
/// engine runs.
pub fn analyzer_inventory() -> Vec<(&'static str, &'static str)> {
    use crate::analyzers::{
        AccessControlAnalyzer, Analyzer, InitializerAnalyzer, InterfaceDiffAnalyzer,
        StorageLayoutAnalyzer, TransparentSafetyAnalyzer, UupsSafetyAnalyzer,
    };

    let analyzers: [&dyn Analyzer; 6] = [
        &StorageLayoutAnalyzer,
        &InterfaceDiffAnalyzer,
        &UupsSafetyAnalyzer,
        &TransparentSafetyAnalyzer,
        &InitializerAnalyzer,
        &AccessControlAnalyzer,
    ];
    let mut inventory = vec![(
        PROXY_DETECTION,
        "Classifies the proxy pattern and gates the other analyzers",
    )];
    inventory.extend(analyzers.iter().map(|a| (a.id(), a.description())));
    inventory.sort_by_key(|(name, _)| analyzer_rank(name));
    inventory
}
