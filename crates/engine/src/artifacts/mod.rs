//! Artifact oracle: the narrow interface to the Solidity toolchain.
//! The engine treats compilation as an external oracle invoked through
//! this seam; analyzers only ever see the normalized models.

pub mod abi;
pub mod ast;
pub mod forge;
pub mod layout;

pub use abi::{Abi, EventSig, FunctionSig, Mutability, Selector, TopicHash};
pub use ast::{BodyInfo, ContractAst, FunctionDecl, FunctionKind, Visibility};
pub use forge::FoundryOracle;
pub use layout::{StorageEntry, StorageLayout};

use crate::error::EngineError;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Identifies one compiled contract inside a project.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactKey {
    pub project_root: PathBuf,
    /// Source file path relative to the project root.
    pub source_file: String,
    pub contract_name: String,
}

impl ArtifactKey {
    pub fn new(project_root: &Path, source_file: &str, contract_name: &str) -> Self {
        Self {
            project_root: project_root.to_path_buf(),
            source_file: source_file.to_string(),
            contract_name: contract_name.to_string(),
        }
    }
}

/// The toolchain seam. Implementations are expected to be synchronous
/// from the caller's perspective: they return a value or an error.
pub trait ArtifactOracle: Send + Sync {
    /// Cheap availability check, run once before any analysis.
    fn probe(&self) -> Result<(), EngineError>;

    /// Compile the project so artifacts exist for the fetches below.
    fn build(&self, project_root: &Path) -> Result<(), EngineError>;

    /// Contract names with artifacts for one source file, used for
    /// contract-name auto-detection.
    fn contract_names(
        &self,
        project_root: &Path,
        source_file: &str,
    ) -> Result<Vec<String>, EngineError>;

    fn fetch_storage_layout(
        &self,
        key: &ArtifactKey,
    ) -> Result<layout::RawStorageLayout, EngineError>;

    fn fetch_abi(&self, key: &ArtifactKey) -> Result<Vec<abi::RawAbiItem>, EngineError>;

    fn fetch_ast(&self, key: &ArtifactKey) -> Result<Value, EngineError>;
}
