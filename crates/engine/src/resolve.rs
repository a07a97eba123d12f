//! Resolver: validates the two implementation paths, drives the
//! artifact oracle for both sides, and produces the immutable
//! `Resolved` bundle every analyzer borrows.

use crate::artifacts::{
    abi::{self, Abi},
    ast::{self, ContractAst},
    layout::{self, StorageLayout},
    ArtifactKey, ArtifactOracle,
};
use crate::error::EngineError;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// One side of the upgrade: everything the analyzers need about a
/// single implementation contract.
#[derive(Debug, Clone)]
pub struct Side {
    pub path: PathBuf,
    pub project_root: PathBuf,
    pub contract_name: String,
    pub layout: StorageLayout,
    pub abi: Abi,
    pub ast: ContractAst,
}

/// Old and new implementations, fully normalized. Built once by the
/// resolver and borrowed read-only for the rest of the run.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub old: Side,
    pub new: Side,
}

pub fn resolve(
    oracle: &dyn ArtifactOracle,
    old_path: &Path,
    new_path: &Path,
    contract_name: Option<&str>,
) -> Result<Resolved, EngineError> {
    let old_project = validate_source_path(old_path)?;
    let new_project = validate_source_path(new_path)?;

    oracle.build(&old_project)?;
    if new_project != old_project {
        oracle.build(&new_project)?;
    }

    let old = resolve_side(oracle, old_path, &old_project, contract_name)?;
    let new = resolve_side(oracle, new_path, &new_project, contract_name)?;

    info!(
        old = %old.contract_name,
        new = %new.contract_name,
        "resolved both implementations"
    );
    Ok(Resolved { old, new })
}

/// Check the path names an existing `.sol` file and locate the
/// enclosing Foundry project root.
fn validate_source_path(path: &Path) -> Result<PathBuf, EngineError> {
    if !path.is_file() {
        return Err(EngineError::InputInvalid(format!(
            "`{}` is not a file",
            path.display()
        )));
    }
    if path.extension().and_then(|e| e.to_str()) != Some("sol") {
        return Err(EngineError::InputInvalid(format!(
            "`{}` is not a Solidity source file",
            path.display()
        )));
    }

    let mut dir = path.parent();
    while let Some(candidate) = dir {
        if candidate.join("foundry.toml").is_file() {
            return Ok(candidate.to_path_buf());
        }
        dir = candidate.parent();
    }
    Err(EngineError::InputInvalid(format!(
        "no foundry.toml found in any ancestor of `{}`",
        path.display()
    )))
}

fn resolve_side(
    oracle: &dyn ArtifactOracle,
    path: &Path,
    project_root: &Path,
    contract_name: Option<&str>,
) -> Result<Side, EngineError> {
    let source_file = path
        .strip_prefix(project_root)
        .unwrap_or(path)
        .to_string_lossy()
        .into_owned();

    let contract_name = match contract_name {
        Some(name) => name.to_string(),
        None => detect_contract_name(oracle, project_root, &source_file)?,
    };
    debug!(source = %source_file, contract = %contract_name, "resolving side");

    let key = ArtifactKey::new(project_root, &source_file, &contract_name);

    let raw_layout = oracle.fetch_storage_layout(&key)?;
    let layout = layout::normalize_layout(&raw_layout).map_err(|e| {
        EngineError::ToolchainFailure {
            diagnostics: format!("storage layout for `{contract_name}` is invalid: {e}"),
        }
    })?;

    let raw_abi = oracle.fetch_abi(&key)?;
    let abi = abi::normalize_abi(&raw_abi).map_err(|e| EngineError::ToolchainFailure {
        diagnostics: format!("ABI for `{contract_name}` is invalid: {e}"),
    })?;

    let ast_root = oracle.fetch_ast(&key)?;
    let ast = ast::extract_contract(&ast_root, &contract_name).map_err(|e| {
        EngineError::ToolchainFailure {
            diagnostics: format!("AST for `{contract_name}` is invalid: {e}"),
        }
    })?;

    Ok(Side {
        path: path.to_path_buf(),
        project_root: project_root.to_path_buf(),
        contract_name,
        layout,
        abi,
        ast,
    })
}

fn detect_contract_name(
    oracle: &dyn ArtifactOracle,
    project_root: &Path,
    source_file: &str,
) -> Result<String, EngineError> {
    let names = oracle.contract_names(project_root, source_file)?;
    match names.as_slice() {
        [] => Err(EngineError::ContractAmbiguous(format!(
            "no compiled contracts found for `{source_file}`"
        ))),
        [only] => Ok(only.clone()),
        many => Err(EngineError::ContractAmbiguous(format!(
            "`{source_file}` defines multiple contracts ({}); pass --contract to pick one",
            many.join(", ")
        ))),
    }
}
