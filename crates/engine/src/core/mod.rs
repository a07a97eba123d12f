//! Core data model shared by every analyzer: findings, severities,
//! analyzer outcomes, and the verdict type the aggregator produces.

pub mod finding;
pub mod outcome;
pub mod severity;
pub mod verdict;

pub use finding::{Finding, FindingLocation};
pub use outcome::{AnalyzerOutcome, AnalyzerStatus};
pub use severity::{Confidence, Severity};
pub use verdict::Verdict;
