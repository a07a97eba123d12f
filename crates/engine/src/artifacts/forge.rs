//! `forge`-backed implementation of the artifact oracle. Builds with
//! AST and storage-layout output enabled, then reads the artifact JSON
//! files that land under `out/`.

use crate::artifacts::{abi::RawAbiItem, layout::RawStorageLayout, ArtifactKey, ArtifactOracle};
use crate::error::EngineError;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

pub struct FoundryOracle {
    forge_bin: String,
}

impl FoundryOracle {
    pub fn new() -> Self {
        Self {
            forge_bin: "forge".to_string(),
        }
    }

    pub fn with_binary(forge_bin: impl Into<String>) -> Self {
        Self {
            forge_bin: forge_bin.into(),
        }
    }

    fn artifact_dir(&self, project_root: &Path, source_file: &str) -> PathBuf {
        let file_name = Path::new(source_file)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| source_file.to_string());
        project_root.join("out").join(file_name)
    }

    fn read_artifact(&self, key: &ArtifactKey) -> Result<Value, EngineError> {
        let path = self
            .artifact_dir(&key.project_root, &key.source_file)
            .join(format!("{}.json", key.contract_name));
        debug!(artifact = %path.display(), "reading forge artifact");

        let raw = std::fs::read_to_string(&path).map_err(|e| EngineError::ToolchainFailure {
            diagnostics: format!("artifact missing at {}: {e}", path.display()),
        })?;
        serde_json::from_str(&raw).map_err(|e| EngineError::ToolchainFailure {
            diagnostics: format!("artifact at {} is not valid JSON: {e}", path.display()),
        })
    }

    fn artifact_section(&self, key: &ArtifactKey, section: &str) -> Result<Value, EngineError> {
        let artifact = self.read_artifact(key)?;
        match artifact.get(section) {
            Some(value) if !value.is_null() => Ok(value.clone()),
            _ => Err(EngineError::ToolchainFailure {
                diagnostics: format!(
                    "artifact for `{}` has no `{section}` section; was the project built with \
                     AST and storage-layout output enabled?",
                    key.contract_name
                ),
            }),
        }
    }
}

impl Default for FoundryOracle {
    fn default() -> Self {
        Self::new()
    }
}

impl ArtifactOracle for FoundryOracle {
    fn probe(&self) -> Result<(), EngineError> {
        let output = Command::new(&self.forge_bin)
            .arg("--version")
            .output()
            .map_err(|e| EngineError::ToolchainUnavailable(format!("`forge` not found: {e}")))?;
        if !output.status.success() {
            return Err(EngineError::ToolchainUnavailable(
                String::from_utf8_lossy(&output.stderr).into_owned(),
            ));
        }
        debug!(
            version = %String::from_utf8_lossy(&output.stdout).trim(),
            "forge toolchain available"
        );
        Ok(())
    }

    fn build(&self, project_root: &Path) -> Result<(), EngineError> {
        debug!(project = %project_root.display(), "running forge build");
        let output = Command::new(&self.forge_bin)
            .args(["build", "--ast", "--extra-output", "storageLayout"])
            .current_dir(project_root)
            .output()
            .map_err(|e| EngineError::ToolchainUnavailable(format!("failed to spawn forge: {e}")))?;

        if !output.status.success() {
            let mut diagnostics = String::from_utf8_lossy(&output.stdout).into_owned();
            diagnostics.push_str(&String::from_utf8_lossy(&output.stderr));
            return Err(EngineError::ToolchainFailure { diagnostics });
        }
        Ok(())
    }

    fn contract_names(
        &self,
        project_root: &Path,
        source_file: &str,
    ) -> Result<Vec<String>, EngineError> {
        let dir = self.artifact_dir(project_root, source_file);
        let entries = std::fs::read_dir(&dir).map_err(|e| EngineError::ToolchainFailure {
            diagnostics: format!("no artifacts under {}: {e}", dir.display()),
        })?;

        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let path = entry.path();
                match path.extension().and_then(|e| e.to_str()) {
                    Some("json") => path
                        .file_stem()
                        .map(|stem| stem.to_string_lossy().into_owned()),
                    _ => None,
                }
            })
            .collect();
        names.sort();
        Ok(names)
    }

    fn fetch_storage_layout(&self, key: &ArtifactKey) -> Result<RawStorageLayout, EngineError> {
        let section = self.artifact_section(key, "storageLayout")?;
        serde_json::from_value(section).map_err(|e| EngineError::ToolchainFailure {
            diagnostics: format!("malformed storage layout for `{}`: {e}", key.contract_name),
        })
    }

    fn fetch_abi(&self, key: &ArtifactKey) -> Result<Vec<RawAbiItem>, EngineError> {
        let section = self.artifact_section(key, "abi")?;
        serde_json::from_value(section).map_err(|e| EngineError::ToolchainFailure {
            diagnostics: format!("malformed ABI for `{}`: {e}", key.contract_name),
        })
    }

    fn fetch_ast(&self, key: &ArtifactKey) -> Result<Value, EngineError> {
        self.artifact_section(key, "ast")
    }
}
