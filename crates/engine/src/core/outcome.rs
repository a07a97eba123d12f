use crate::core::Finding;
use serde::{Deserialize, Serialize};

/// How a single analyzer finished. The three-way split is load-bearing
/// for verdict computation: an analyzer that does not apply (wrong
/// proxy kind, gated by classification) is `Skipped`; one that tried
/// and failed is `Errored`. The two are never conflated.
#[derive(Debug, Clone)]
pub enum AnalyzerOutcome {
    Completed { findings: Vec<Finding> },
    Skipped { reason: String },
    Errored { message: String },
}

impl AnalyzerOutcome {
    pub fn completed(findings: Vec<Finding>) -> Self {
        Self::Completed { findings }
    }

    pub fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped {
            reason: reason.into(),
        }
    }

    pub fn errored(message: impl Into<String>) -> Self {
        Self::Errored {
            message: message.into(),
        }
    }

    pub fn findings(&self) -> &[Finding] {
        match self {
            Self::Completed { findings } => findings,
            _ => &[],
        }
    }

    pub fn status(&self) -> AnalyzerStatus {
        match self {
            Self::Completed { .. } => AnalyzerStatus::Completed,
            Self::Skipped { reason } => AnalyzerStatus::Skipped {
                reason: reason.clone(),
            },
            Self::Errored { message } => AnalyzerStatus::Errored {
                message: message.clone(),
            },
        }
    }
}

/// Serializable projection of an outcome, without the findings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum AnalyzerStatus {
    Completed,
    Skipped { reason: String },
    Errored { message: String },
}

impl AnalyzerStatus {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}
