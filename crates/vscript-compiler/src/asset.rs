//! Script assets on disk: loading, saving and compiling them into
//! resources.

use std::ffi::OsStr;
use std::fs;
use std::path::Path;

use tracing::{debug, info};
use vscript_graph::{Graph, LoadedGraph};
use vscript_types::{Diagnostics, Reflection};

use crate::error::{CompileError, CompileResult};
use crate::header::{ResourceHeader, HEADER_SIZE};
use crate::{compile, CompiledModule};

fn is_wasm(path: &Path) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .is_some_and(|ext| ext.eq_ignore_ascii_case("wasm"))
}

/// Compile the asset `bytes` read from `path`.
///
/// A `.wasm` source is already a module and is passed through behind the
/// resource header. Anything else is a serialized graph. Reflection failures
/// found while loading it are merged into the returned diagnostics.
pub fn compile_asset(
    path: &Path,
    bytes: &[u8],
    reflection: &dyn Reflection,
) -> CompileResult<CompiledModule> {
    if is_wasm(path) {
        debug!(path = %path.display(), size = bytes.len(), "passing wasm through");
        let mut out = Vec::with_capacity(HEADER_SIZE + bytes.len());
        ResourceHeader::default().write(&mut out);
        out.extend_from_slice(bytes);
        return Ok(CompiledModule {
            bytes: out,
            diagnostics: Diagnostics::new(),
            validation_error: None,
            exports: Vec::new(),
        });
    }

    let LoadedGraph {
        mut graph,
        mut diagnostics,
    } = Graph::deserialize(bytes, reflection)?;
    graph.path = path.to_path_buf();
    let mut compiled = compile(&graph);
    diagnostics.extend(compiled.diagnostics);
    compiled.diagnostics = diagnostics;
    Ok(compiled)
}

/// Read and compile the asset at `src`.
pub fn compile_file(src: &Path, reflection: &dyn Reflection) -> CompileResult<CompiledModule> {
    let bytes = fs::read(src).map_err(|e| CompileError::io(src, e))?;
    let compiled = compile_asset(src, &bytes, reflection)?;
    info!(path = %src.display(), size = compiled.bytes.len(), "compiled asset");
    Ok(compiled)
}

/// Load the graph stored at `path`, resolving its reflected references.
pub fn load_graph(path: &Path, reflection: &dyn Reflection) -> CompileResult<LoadedGraph> {
    let bytes = fs::read(path).map_err(|e| CompileError::io(path, e))?;
    let mut loaded = Graph::deserialize(&bytes, reflection)?;
    loaded.graph.path = path.to_path_buf();
    Ok(loaded)
}

/// Save `graph` to `path`.
///
/// The graph is compiled first so the caller gets current diagnostics back
/// together with the save; they never block writing.
pub fn save_graph(path: &Path, graph: &Graph) -> CompileResult<Diagnostics> {
    let diagnostics = compile(graph).diagnostics;
    fs::write(path, graph.serialize()).map_err(|e| CompileError::io(path, e))?;
    debug!(path = %path.display(), diagnostics = diagnostics.len(), "saved graph");
    Ok(diagnostics)
}

/// Serialized contents of a freshly created script asset.
pub fn new_script_bytes() -> Vec<u8> {
    Graph::new_script().serialize()
}
