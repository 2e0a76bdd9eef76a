//! Compiler configuration.

use serde::{Deserialize, Serialize};

use crate::error::{CompileError, CompileResult};

/// Options for a compile pass. Missing JSON fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Run structural validation on the generated module.
    pub validate_output: bool,
    /// Export graph variables as named globals. `self` is always exported.
    pub export_variables: bool,
    /// Module name of the host-call imports.
    pub host_module: String,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            validate_output: true,
            export_variables: true,
            host_module: "LumixAPI".to_string(),
        }
    }
}

impl CompilerConfig {
    pub fn from_json(json: &str) -> CompileResult<Self> {
        serde_json::from_str(json).map_err(|e| CompileError::Config(e.to_string()))
    }
}
