//! Canonical interface model, normalized from the raw JSON ABI, with
//! selector and topic computation over canonical signatures.

use crate::artifacts::layout::canonicalize_type;
use anyhow::{bail, Result};
use ethers::utils::keccak256;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 4-byte function selector.
pub type Selector = [u8; 4];

/// 32-byte event topic.
pub type TopicHash = [u8; 32];

/// Raw ABI item as solc emits it.
#[derive(Debug, Clone, Deserialize)]
pub struct RawAbiItem {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub inputs: Vec<RawAbiParam>,
    #[serde(default)]
    pub outputs: Vec<RawAbiParam>,
    #[serde(rename = "stateMutability", default)]
    pub state_mutability: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawAbiParam {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub indexed: Option<bool>,
    #[serde(default)]
    pub components: Vec<RawAbiParam>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mutability {
    Pure,
    View,
    Nonpayable,
    Payable,
}

impl fmt::Display for Mutability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pure => write!(f, "pure"),
            Self::View => write!(f, "view"),
            Self::Nonpayable => write!(f, "nonpayable"),
            Self::Payable => write!(f, "payable"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionSig {
    pub selector: Selector,
    pub name: String,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
    pub mutability: Mutability,
}

impl FunctionSig {
    pub fn signature(&self) -> String {
        format!("{}({})", self.name, self.inputs.join(","))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSig {
    pub topic0: TopicHash,
    pub name: String,
    pub inputs: Vec<(String, bool)>,
}

impl EventSig {
    pub fn signature(&self) -> String {
        let types: Vec<&str> = self.inputs.iter().map(|(t, _)| t.as_str()).collect();
        format!("{}({})", self.name, types.join(","))
    }
}

/// Functions and events of one contract interface, in artifact order.
/// Duplicate selectors are representable on purpose: the interface
/// differ reports them as a finding instead of rejecting the ABI.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Abi {
    pub functions: Vec<FunctionSig>,
    pub events: Vec<EventSig>,
}

impl Abi {
    pub fn function_by_selector(&self, selector: &Selector) -> Option<&FunctionSig> {
        self.functions.iter().find(|f| &f.selector == selector)
    }

    pub fn event_by_topic(&self, topic0: &TopicHash) -> Option<&EventSig> {
        self.events.iter().find(|e| &e.topic0 == topic0)
    }
}

/// Keccak-256 of the canonical signature, truncated to 4 bytes.
pub fn selector(signature: &str) -> Selector {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Keccak-256 of the canonical signature, full width.
pub fn topic0(signature: &str) -> TopicHash {
    keccak256(signature.as_bytes())
}

pub fn selector_hex(selector: &Selector) -> String {
    format!("0x{}", ethers::utils::hex::encode(selector))
}

/// Canonical ABI type of one parameter: tuples expand to their
/// parenthesized component list, aliases resolve, array suffixes are
/// preserved.
fn canonical_param(param: &RawAbiParam) -> String {
    if let Some(suffix) = param.type_name.strip_prefix("tuple") {
        let inner: Vec<String> = param.components.iter().map(canonical_param).collect();
        format!("({}){}", inner.join(","), suffix)
    } else {
        canonicalize_type(&param.type_name)
    }
}

fn parse_mutability(raw: Option<&str>) -> Mutability {
    match raw {
        Some("pure") => Mutability::Pure,
        Some("view") => Mutability::View,
        Some("payable") => Mutability::Payable,
        _ => Mutability::Nonpayable,
    }
}

/// Normalize a raw JSON ABI into the canonical interface model.
pub fn normalize_abi(items: &[RawAbiItem]) -> Result<Abi> {
    let mut abi = Abi::default();

    for item in items {
        match item.kind.as_str() {
            "function" => {
                let name = match &item.name {
                    Some(name) => name.clone(),
                    None => bail!("function ABI item without a name"),
                };
                let inputs: Vec<String> = item.inputs.iter().map(canonical_param).collect();
                let outputs: Vec<String> = item.outputs.iter().map(canonical_param).collect();
                let signature = format!("{}({})", name, inputs.join(","));
                abi.functions.push(FunctionSig {
                    selector: selector(&signature),
                    name,
                    inputs,
                    outputs,
                    mutability: parse_mutability(item.state_mutability.as_deref()),
                });
            }
            "event" => {
                let name = match &item.name {
                    Some(name) => name.clone(),
                    None => bail!("event ABI item without a name"),
                };
                let inputs: Vec<(String, bool)> = item
                    .inputs
                    .iter()
                    .map(|p| (canonical_param(p), p.indexed.unwrap_or(false)))
                    .collect();
                let types: Vec<&str> = inputs.iter().map(|(t, _)| t.as_str()).collect();
                let signature = format!("{}({})", name, types.join(","));
                abi.events.push(EventSig {
                    topic0: topic0(&signature),
                    name,
                    inputs,
                });
            }
            // constructor / fallback / receive / error items carry no
            // dispatchable surface.
            _ => {}
        }
    }

    Ok(abi)
}
