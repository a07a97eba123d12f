use thiserror::Error;

/// Typed errors at the engine boundary. Findings are never errors: a
/// well-formed `Unsafe` verdict is a normal output. These variants are
/// reserved for failures that prevent the analysis from running at all.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The `forge` toolchain probe failed.
    #[error("foundry toolchain unavailable: {0}")]
    ToolchainUnavailable(String),

    /// Missing or malformed path, malformed address, missing option.
    #[error("invalid input: {0}")]
    InputInvalid(String),

    /// Contract-name auto-detection produced no unique answer.
    #[error("contract name is ambiguous: {0}")]
    ContractAmbiguous(String),

    /// Build or artifact inspection failed; carries the toolchain's
    /// diagnostic text verbatim.
    #[error("toolchain failure: {diagnostics}")]
    ToolchainFailure { diagnostics: String },

    /// Any unanticipated failure inside the engine.
    #[error("unexpected failure: {0}")]
    Unexpected(String),
}

impl EngineError {
    /// Stable machine-readable kind, used by the CLI's structured
    /// diagnostic output.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ToolchainUnavailable(_) => "toolchain-unavailable",
            Self::InputInvalid(_) => "input-invalid",
            Self::ContractAmbiguous(_) => "contract-ambiguous",
            Self::ToolchainFailure { .. } => "toolchain-failure",
            Self::Unexpected(_) => "unexpected",
        }
    }

    /// Whether the failure is correctable by fixing the invocation
    /// rather than the environment. Drives the exit-code split between
    /// input errors and runtime errors.
    pub fn is_input_error(&self) -> bool {
        matches!(self, Self::InputInvalid(_) | Self::ContractAmbiguous(_))
    }
}
