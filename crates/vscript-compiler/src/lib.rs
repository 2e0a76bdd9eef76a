//! Visual script compiler: orchestrates the full compilation pipeline.
//!
//! ```text
//! .vscript bytes → Graph (load + rebind) → Codegen → validate → header ‖ .wasm
//! ```
//!
//! [`compile`] never fails. Graph problems come back as per-node
//! [`Diagnostics`] next to whatever module could still be produced; only
//! I/O, malformed graph files and bad configuration are errors.

pub mod asset;
pub mod config;
pub mod error;
pub mod header;

use serde::Serialize;
use tracing::{debug, info, warn};
use vscript_codegen::types::{HOST_IMPORTS, VAL_F32, VAL_I32, VAL_I64};
use vscript_codegen::{EmitContext, ModuleWriter, ENTRY_POINTS};
use vscript_graph::Graph;
use vscript_types::{Diagnostic, Diagnostics, ValueType};

pub use asset::{compile_asset, compile_file, load_graph, new_script_bytes, save_graph};
pub use config::CompilerConfig;
pub use error::{CompileError, CompileResult};
pub use header::{ResourceHeader, HEADER_SIZE, RESOURCE_MAGIC, RESOURCE_VERSION};

/// Name of the always-present global holding the owning entity.
pub const SELF_GLOBAL: &str = "self";

// ══════════════════════════════════════════════════════════════════════════════
// Output
// ══════════════════════════════════════════════════════════════════════════════

/// The output of one compile pass.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledModule {
    /// Resource header followed by the WASM module.
    pub bytes: Vec<u8>,
    pub diagnostics: Diagnostics,
    /// Set when the module failed structural validation.
    pub validation_error: Option<String>,
    /// Exported function and global names, in export order.
    pub exports: Vec<String>,
}

impl CompiledModule {
    /// The WASM module without the resource header.
    pub fn module_bytes(&self) -> &[u8] {
        self.bytes.get(HEADER_SIZE..).unwrap_or_default()
    }

    pub fn is_success(&self) -> bool {
        self.diagnostics.is_empty() && self.validation_error.is_none()
    }

    pub fn report(&self) -> CompileReport {
        CompileReport {
            success: self.is_success(),
            module_size: self.module_bytes().len(),
            diagnostics: self.diagnostics.iter().cloned().collect(),
            validation_error: self.validation_error.clone(),
            exports: self.exports.clone(),
        }
    }
}

/// JSON-friendly summary of a compile pass for editor tooling.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompileReport {
    pub success: bool,
    pub module_size: usize,
    pub diagnostics: Vec<Diagnostic>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation_error: Option<String>,
    pub exports: Vec<String>,
}

impl CompileReport {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"success":false,"validation_error":"serialization error: {e}"}}"#)
        })
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Pipeline
// ══════════════════════════════════════════════════════════════════════════════

/// Compile `graph` with the default configuration.
pub fn compile(graph: &Graph) -> CompiledModule {
    compile_with_config(graph, &CompilerConfig::default())
}

/// Compile `graph` into a header-prefixed WASM module.
///
/// Every call starts from fresh diagnostics, so compiling the same graph
/// twice gives identical results.
pub fn compile_with_config(graph: &Graph, config: &CompilerConfig) -> CompiledModule {
    info!(
        nodes = graph.node_count(),
        links = graph.links().len(),
        variables = graph.variables().len(),
        "compiling graph"
    );

    let writer = module_interface(graph, config);
    let mut ctx = EmitContext::new(graph);
    let mut module = Vec::new();
    writer.write(&mut module, &mut ctx);
    let diagnostics = ctx.into_diagnostics();

    let validation_error = if config.validate_output {
        wasmparser::validate(&module).err().map(|e| {
            warn!(error = %e, "generated module failed validation");
            e.to_string()
        })
    } else {
        None
    };

    let exports: Vec<String> = writer
        .exports()
        .iter()
        .map(|e| e.name.clone())
        .chain(writer.exported_globals().into_iter().map(|(_, name)| name.to_string()))
        .collect();

    let mut bytes = Vec::with_capacity(HEADER_SIZE + module.len());
    ResourceHeader::default().write(&mut bytes);
    bytes.extend_from_slice(&module);

    info!(
        module_size = module.len(),
        exports = exports.len(),
        diagnostics = diagnostics.len(),
        "compiled graph"
    );

    CompiledModule {
        bytes,
        diagnostics,
        validation_error,
        exports,
    }
}

/// Declare the host imports, one export per entry node present, `self`
/// and one global per variable.
fn module_interface(graph: &Graph, config: &CompilerConfig) -> ModuleWriter {
    let mut writer = ModuleWriter::new();
    let [set_yaw, set_property, get_property] = HOST_IMPORTS;
    writer.add_function_import(&config.host_module, set_yaw, None, &[VAL_I32, VAL_F32]);
    writer.add_function_import(
        &config.host_module,
        set_property,
        None,
        &[VAL_I32, VAL_I64, VAL_F32],
    );
    writer.add_function_import(
        &config.host_module,
        get_property,
        Some(VAL_F32),
        &[VAL_I32, VAL_I64],
    );

    for entry in ENTRY_POINTS.iter() {
        let Some(root) = graph.first_of_kind(entry.kind) else {
            continue;
        };
        debug!(export = entry.name, root = root.0, "entry point");
        writer.add_function_export(entry.name, root, entry.params);
    }

    writer.add_global(ValueType::Entity, Some(SELF_GLOBAL));
    for var in graph.variables() {
        let name = config.export_variables.then_some(var.name.as_str());
        writer.add_global(var.ty, name);
    }
    writer
}
