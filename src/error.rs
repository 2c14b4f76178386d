// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use core::fmt;

/// The unit of Rego source a parse failure was reported for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleId {
    Template,
    Library(usize),
    /// Template and libraries concatenated into one compilation unit.
    Merged,
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleId::Template => f.write_str("template"),
            ModuleId::Library(idx) => write!(f, "library {idx}"),
            ModuleId::Merged => f.write_str("merged template"),
        }
    }
}

/// Error type for template compilation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompileError {
    /// Malformed Rego. `message` is the parser's diagnostic verbatim.
    #[error("failed to parse {module}: {message}")]
    Parse { module: ModuleId, message: String },

    #[error("library {index} has an empty package name")]
    EmptyLibraryPackage { index: usize },

    /// Every unrecognized kind, sorted, each listed once.
    #[error("invalid kinds: {}", .0.join(", "))]
    UnknownKind(Vec<String>),

    #[error("invalid type: {0}")]
    InvalidParamType(String),

    #[error("rule call depth limit {limit} exceeded while tracing `{rule}`")]
    CallDepthExceeded { rule: String, limit: usize },

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl CompileError {
    pub(crate) fn parse(module: ModuleId, err: anyhow::Error) -> Self {
        CompileError::Parse {
            module,
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for CompileError {
    fn from(error: serde_json::Error) -> Self {
        CompileError::Serialization(format!("{error}"))
    }
}

#[cfg(feature = "yaml")]
impl From<serde_yaml::Error> for CompileError {
    fn from(error: serde_yaml::Error) -> Self {
        CompileError::Serialization(format!("{error}"))
    }
}
