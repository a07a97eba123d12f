//! The fan-out analyzers. Each one is a pure function of borrowed
//! views over `Resolved` and `ProxyInfo`; they share no mutable state
//! and are trivially parallelizable.

pub mod abi_diff;
pub mod access_control;
pub mod initializer;
pub mod storage_layout;
pub mod transparent;
pub mod uups;

pub use abi_diff::InterfaceDiffAnalyzer;
pub use access_control::AccessControlAnalyzer;
pub use initializer::InitializerAnalyzer;
pub use storage_layout::StorageLayoutAnalyzer;
pub use transparent::TransparentSafetyAnalyzer;
pub use uups::UupsSafetyAnalyzer;

use crate::artifacts::FunctionDecl;
use crate::core::Finding;
use crate::proxy::ProxyInfo;
use crate::resolve::Resolved;
use anyhow::Result;

/// Borrowed inputs handed to every analyzer in the fan-out.
pub struct AnalysisContext<'a> {
    pub resolved: &'a Resolved,
    pub proxy: &'a ProxyInfo,
}

pub trait Analyzer: Send + Sync {
    /// Stable name, also the key in the analyzer status map.
    fn id(&self) -> &'static str;

    fn description(&self) -> &'static str;

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> Result<Vec<Finding>>;
}

/// Modifier-name fragments that indicate a guard. Lowercased
/// containment; deliberately broad so custom guards are not missed.
pub(crate) const GUARD_KEYWORDS: [&str; 7] = [
    "only",
    "auth",
    "authorized",
    "owner",
    "admin",
    "role",
    "guard",
];

/// A modifier whose lowercased name contains any guard keyword.
pub(crate) fn has_guard_modifier(decl: &FunctionDecl) -> bool {
    decl.modifiers.iter().any(|modifier| {
        let lowered = modifier.to_ascii_lowercase();
        GUARD_KEYWORDS.iter().any(|kw| lowered.contains(kw))
    })
}

/// The access-control signal shared by the upgrade-auth and
/// access-control analyzers: a guard modifier, or a caller-identity
/// check in the body.
pub(crate) fn has_access_signal(decl: &FunctionDecl) -> bool {
    has_guard_modifier(decl) || decl.references_sender()
}
