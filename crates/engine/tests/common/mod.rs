//! In-memory oracle and chain fakes plus fixture builders for the
//! end-to-end scenarios.

use async_trait::async_trait;
use ethers::types::{Address, H256};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use upgradeguard_engine::artifacts::abi::RawAbiItem;
use upgradeguard_engine::artifacts::layout::RawStorageLayout;
use upgradeguard_engine::{ArtifactKey, ArtifactOracle, ChainReader, EngineError};

#[derive(Default)]
pub struct MockOracle {
    /// source file name -> contract names compiled from it
    pub contracts_by_file: HashMap<String, Vec<String>>,
    /// contract name -> (storageLayout, abi, ast) artifact sections
    pub artifacts: HashMap<String, (Value, Value, Value)>,
}

impl MockOracle {
    pub fn with_contract(
        mut self,
        file_name: &str,
        contract_name: &str,
        layout: Value,
        abi: Value,
        ast: Value,
    ) -> Self {
        self.contracts_by_file
            .entry(file_name.to_string())
            .or_default()
            .push(contract_name.to_string());
        self.artifacts
            .insert(contract_name.to_string(), (layout, abi, ast));
        self
    }

    fn artifact(&self, key: &ArtifactKey) -> Result<&(Value, Value, Value), EngineError> {
        self.artifacts
            .get(&key.contract_name)
            .ok_or_else(|| EngineError::ToolchainFailure {
                diagnostics: format!("no artifact for `{}`", key.contract_name),
            })
    }
}

impl ArtifactOracle for MockOracle {
    fn probe(&self) -> Result<(), EngineError> {
        Ok(())
    }

    fn build(&self, _project_root: &Path) -> Result<(), EngineError> {
        Ok(())
    }

    fn contract_names(
        &self,
        _project_root: &Path,
        source_file: &str,
    ) -> Result<Vec<String>, EngineError> {
        let file_name = Path::new(source_file)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(self
            .contracts_by_file
            .get(&file_name)
            .cloned()
            .unwrap_or_default())
    }

    fn fetch_storage_layout(&self, key: &ArtifactKey) -> Result<RawStorageLayout, EngineError> {
        let (layout, _, _) = self.artifact(key)?;
        serde_json::from_value(layout.clone()).map_err(|e| EngineError::ToolchainFailure {
            diagnostics: e.to_string(),
        })
    }

    fn fetch_abi(&self, key: &ArtifactKey) -> Result<Vec<RawAbiItem>, EngineError> {
        let (_, abi, _) = self.artifact(key)?;
        serde_json::from_value(abi.clone()).map_err(|e| EngineError::ToolchainFailure {
            diagnostics: e.to_string(),
        })
    }

    fn fetch_ast(&self, key: &ArtifactKey) -> Result<Value, EngineError> {
        let (_, _, ast) = self.artifact(key)?;
        Ok(ast.clone())
    }
}

#[derive(Default)]
pub struct MockChain {
    pub slots: HashMap<(Address, H256), H256>,
    pub code: HashMap<Address, Vec<u8>>,
}

impl MockChain {
    pub fn with_slot(mut self, address: Address, slot: H256, value: H256) -> Self {
        self.slots.insert((address, slot), value);
        self
    }

    pub fn with_code(mut self, address: Address, code: Vec<u8>) -> Self {
        self.code.insert(address, code);
        self
    }
}

#[async_trait]
impl ChainReader for MockChain {
    async fn read_storage_slot(&self, address: Address, slot: H256) -> anyhow::Result<H256> {
        Ok(self
            .slots
            .get(&(address, slot))
            .copied()
            .unwrap_or_default())
    }

    async fn read_code(&self, address: Address) -> anyhow::Result<Vec<u8>> {
        Ok(self.code.get(&address).cloned().unwrap_or_default())
    }
}

pub fn word_for(address: Address) -> H256 {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(address.as_bytes());
    H256(word)
}

/// A throwaway Foundry-shaped project with the two source files the
/// resolver validates. Keep the guard alive for the test's duration.
pub struct Project {
    pub dir: tempfile::TempDir,
    pub old_path: PathBuf,
    pub new_path: PathBuf,
}

pub fn project(old_file: &str, new_file: &str) -> Project {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("foundry.toml"), "[profile.default]\n").unwrap();
    let src = dir.path().join("src");
    std::fs::create_dir(&src).unwrap();
    let old_path = src.join(old_file);
    let new_path = src.join(new_file);
    std::fs::write(&old_path, "// old implementation\n").unwrap();
    std::fs::write(&new_path, "// new implementation\n").unwrap();
    Project {
        dir,
        old_path,
        new_path,
    }
}

/// solc-shaped storage layout from `(slot, offset, type, label)` rows.
pub fn layout_json(contract: &str, entries: &[(u64, u8, &str, &str)]) -> Value {
    let mut types = serde_json::Map::new();
    let storage: Vec<Value> = entries
        .iter()
        .map(|(slot, offset, ty, label)| {
            let type_id = format!("t_{}", ty.replace(['[', ']', '(', ')', ' ', ','], "_"));
            let bytes = match *ty {
                "address" => "20".to_string(),
                "bool" => "1".to_string(),
                "uint128" => "16".to_string(),
                array if array.starts_with("uint256[") => {
                    let n: u64 = array
                        .trim_start_matches("uint256[")
                        .trim_end_matches(']')
                        .parse()
                        .unwrap();
                    (n * 32).to_string()
                }
                _ => "32".to_string(),
            };
            types.insert(
                type_id.clone(),
                json!({"encoding": "inplace", "label": ty, "numberOfBytes": bytes}),
            );
            json!({
                "label": label,
                "offset": offset,
                "slot": slot.to_string(),
                "type": type_id,
                "contract": format!("src/{contract}.sol:{contract}"),
            })
        })
        .collect();
    json!({"storage": storage, "types": types})
}

/// Minimal one-function view ABI shared by most fixtures.
pub fn balance_of_abi() -> Value {
    json!([{
        "type": "function",
        "name": "balanceOf",
        "inputs": [{"name": "who", "type": "address"}],
        "outputs": [{"name": "", "type": "uint256"}],
        "stateMutability": "view"
    }])
}

pub struct AstFunction {
    pub name: &'static str,
    pub kind: &'static str,
    pub visibility: &'static str,
    pub modifiers: Vec<&'static str>,
    pub body: Option<Value>,
}

impl AstFunction {
    pub fn regular(name: &'static str, visibility: &'static str) -> Self {
        Self {
            name,
            kind: "function",
            visibility,
            modifiers: vec![],
            body: Some(json!({"nodeType": "Block", "statements": []})),
        }
    }

    pub fn with_modifiers(mut self, modifiers: Vec<&'static str>) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn with_statements(mut self, statements: Vec<Value>) -> Self {
        self.body = Some(json!({"nodeType": "Block", "statements": statements}));
        self
    }
}

pub fn noop_statement() -> Value {
    json!({
        "nodeType": "ExpressionStatement",
        "expression": {"nodeType": "Identifier", "name": "noop"}
    })
}

pub fn ast_json(contract: &str, functions: Vec<AstFunction>) -> Value {
    let nodes: Vec<Value> = functions
        .into_iter()
        .map(|f| {
            json!({
                "nodeType": "FunctionDefinition",
                "name": f.name,
                "kind": f.kind,
                "visibility": f.visibility,
                "modifiers": f.modifiers.iter().map(|m| {
                    json!({"nodeType": "ModifierInvocation", "modifierName": {"name": m}})
                }).collect::<Vec<_>>(),
                "body": f.body.unwrap_or(Value::Null),
            })
        })
        .collect();
    json!({
        "nodeType": "SourceUnit",
        "nodes": [{
            "nodeType": "ContractDefinition",
            "name": contract,
            "nodes": nodes,
        }]
    })
}

/// The AST every "otherwise healthy" fixture uses: a guarded upgrade
/// hook and a single initializer, no constructor.
pub fn healthy_ast(contract: &str) -> Value {
    ast_json(
        contract,
        vec![
            AstFunction::regular("initialize", "external")
                .with_modifiers(vec!["initializer"])
                .with_statements(vec![noop_statement()]),
            AstFunction::regular("_authorizeUpgrade", "internal")
                .with_modifiers(vec!["onlyOwner"])
                .with_statements(vec![noop_statement()]),
            AstFunction::regular("balanceOf", "external"),
        ],
    )
}
