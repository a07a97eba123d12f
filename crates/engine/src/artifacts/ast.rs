//! Typed projection of the solc AST. The relevant node kinds
//! (`FunctionDefinition`, `ModifierInvocation`, `Block`, `Assignment`)
//! are extracted once into `FunctionDecl` values; analyzers never
//! re-scan raw tree nodes.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FunctionKind {
    Regular,
    Constructor,
    Fallback,
    Receive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    External,
    Internal,
    Private,
}

impl Visibility {
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Internal | Self::Private)
    }

    pub fn is_external_surface(&self) -> bool {
        matches!(self, Self::Public | Self::External)
    }
}

/// What a function body does, summarized once at extraction time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BodyInfo {
    pub statement_count: usize,
    /// `msg.sender` or its `_msgSender()` wrapper appears in the body.
    pub references_sender: bool,
    /// The body contains at least one assignment node.
    pub has_storage_assignment: bool,
    /// Names of functions invoked in the body.
    pub calls: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionDecl {
    pub name: String,
    pub kind: FunctionKind,
    pub visibility: Visibility,
    pub modifiers: Vec<String>,
    /// `None` for declarations without a body (virtual/interface).
    pub body: Option<BodyInfo>,
}

impl FunctionDecl {
    pub fn has_empty_body(&self) -> bool {
        match &self.body {
            None => true,
            Some(body) => body.statement_count == 0,
        }
    }

    pub fn references_sender(&self) -> bool {
        self.body.as_ref().is_some_and(|b| b.references_sender)
    }

    pub fn has_storage_assignment(&self) -> bool {
        self.body.as_ref().is_some_and(|b| b.has_storage_assignment)
    }

    pub fn calls(&self, callee: &str) -> bool {
        self.body.as_ref().is_some_and(|b| b.calls.contains(callee))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractAst {
    pub name: String,
    pub functions: Vec<FunctionDecl>,
}

impl ContractAst {
    pub fn function(&self, name: &str) -> Option<&FunctionDecl> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn constructors(&self) -> impl Iterator<Item = &FunctionDecl> {
        self.functions
            .iter()
            .filter(|f| f.kind == FunctionKind::Constructor)
    }
}

/// Extract the contract with the given name from a solc source-unit
/// AST.
pub fn extract_contract(ast_root: &Value, contract_name: &str) -> Result<ContractAst> {
    let nodes = ast_root
        .get("nodes")
        .and_then(Value::as_array)
        .ok_or_else(|| anyhow!("AST root has no `nodes` array"))?;

    let contract = nodes
        .iter()
        .find(|node| {
            node.get("nodeType").and_then(Value::as_str) == Some("ContractDefinition")
                && node.get("name").and_then(Value::as_str) == Some(contract_name)
        })
        .ok_or_else(|| anyhow!("contract `{contract_name}` not found in AST"))?;

    let mut functions = Vec::new();
    if let Some(members) = contract.get("nodes").and_then(Value::as_array) {
        for member in members {
            if member.get("nodeType").and_then(Value::as_str) == Some("FunctionDefinition") {
                functions.push(function_decl(member)?);
            }
        }
    }

    Ok(ContractAst {
        name: contract_name.to_string(),
        functions,
    })
}

fn function_decl(node: &Value) -> Result<FunctionDecl> {
    let name = node
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let kind = match node.get("kind").and_then(Value::as_str) {
        Some("constructor") => FunctionKind::Constructor,
        Some("fallback") => FunctionKind::Fallback,
        Some("receive") => FunctionKind::Receive,
        _ => FunctionKind::Regular,
    };

    let visibility = match node.get("visibility").and_then(Value::as_str) {
        Some("external") => Visibility::External,
        Some("internal") => Visibility::Internal,
        Some("private") => Visibility::Private,
        _ => Visibility::Public,
    };

    let mut modifiers = Vec::new();
    if let Some(invocations) = node.get("modifiers").and_then(Value::as_array) {
        for invocation in invocations {
            if let Some(name) = invocation
                .pointer("/modifierName/name")
                .and_then(Value::as_str)
            {
                modifiers.push(name.to_string());
            }
        }
    }

    let body = match node.get("body") {
        Some(block) if !block.is_null() => Some(summarize_body(block)),
        _ => None,
    };

    Ok(FunctionDecl {
        name,
        kind,
        visibility,
        modifiers,
        body,
    })
}

fn summarize_body(block: &Value) -> BodyInfo {
    let statement_count = block
        .get("statements")
        .and_then(Value::as_array)
        .map(Vec::len)
        .unwrap_or(0);

    let mut info = BodyInfo {
        statement_count,
        ..Default::default()
    };
    visit(block, &mut info);
    info
}

fn visit(node: &Value, info: &mut BodyInfo) {
    match node {
        Value::Object(map) => {
            let node_type = map.get("nodeType").and_then(Value::as_str);
            match node_type {
                Some("Assignment") => info.has_storage_assignment = true,
                Some("MemberAccess") => {
                    let member = map.get("memberName").and_then(Value::as_str);
                    if member == Some("sender")
                        && map
                            .get("expression")
                            .and_then(|v| v.get("name"))
                            .and_then(Value::as_str)
                            == Some("msg")
                    {
                        info.references_sender = true;
                    }
                }
                Some("FunctionCall") => {
                    if let Some(callee) = callee_name(map) {
                        if callee == "_msgSender" {
                            info.references_sender = true;
                        }
                        info.calls.insert(callee);
                    }
                }
                _ => {}
            }
            for value in map.values() {
                visit(value, info);
            }
        }
        Value::Array(items) => {
            for item in items {
                visit(item, info);
            }
        }
        _ => {}
    }
}

fn callee_name(call: &serde_json::Map<String, Value>) -> Option<String> {
    let expression = call.get("expression")?;
    let node_type = expression.get("nodeType").and_then(Value::as_str)?;
    match node_type {
        "Identifier" => expression
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_string),
        "MemberAccess" => expression
            .get("memberName")
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    }
}
