use crate::core::{Confidence, Severity};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Where a finding points inside the upgrade candidate. All fields are
/// optional; storage findings carry slot/offset, AST and ABI findings
/// carry contract/function.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindingLocation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub function: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub slot: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u8>,
}

impl FindingLocation {
    pub fn function(contract: &str, function: &str) -> Self {
        Self {
            contract: Some(contract.to_string()),
            function: Some(function.to_string()),
            ..Default::default()
        }
    }

    pub fn storage(slot: u64, offset: u8) -> Self {
        Self {
            slot: Some(slot),
            offset: Some(offset),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    /// Stable machine code, e.g. `STOR-001`.
    pub code: String,

    /// Name of the analyzer that emitted this finding.
    pub analyzer: String,

    pub severity: Severity,

    pub confidence: Confidence,

    pub title: String,

    pub description: String,

    /// Structured evidence. BTreeMap so serialized output is stable.
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub details: BTreeMap<String, Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<FindingLocation>,

    pub remediation: String,
}

impl Finding {
    pub fn new(
        code: &str,
        severity: Severity,
        confidence: Confidence,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            code: code.to_string(),
            analyzer: String::new(),
            severity,
            confidence,
            title: title.into(),
            description: description.into(),
            details: BTreeMap::new(),
            location: None,
            remediation: String::new(),
        }
    }

    pub fn with_analyzer(mut self, analyzer: &str) -> Self {
        self.analyzer = analyzer.to_string();
        self
    }

    pub fn with_detail(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }

    pub fn with_location(mut self, location: FindingLocation) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_remediation(mut self, remediation: impl Into<String>) -> Self {
        self.remediation = remediation.into();
        self
    }
}
