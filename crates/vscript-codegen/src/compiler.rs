//! Module assembler.
//!
//! [`ModuleWriter`] collects host imports, exported entry points and globals,
//! then writes the complete module in a fixed order:
//!
//! 1. Header (`\0asm`, version 1)
//! 2. Type section: import signatures, then export signatures
//! 3. Import section
//! 4. Function section: one signature per export
//! 5. Global section: mutable, zero-initialised
//! 6. Export section: functions, then named globals
//! 7. Code section: one body per export, generated from its root node
//!
//! All indices are positional. Function `i` of the module is import `i` for
//! `i < imports`, otherwise export `i - imports`.

use std::collections::HashSet;

use vscript_graph::{Graph, NodeRole};
use vscript_types::{DiagnosticCode, Diagnostics, NodeId, ValueType};

use crate::encode::{write_name, write_section, write_var_u32};
use crate::expr::emit_value;
use crate::stmt::{emit_entry_body, emit_entry_param, emit_flow};
use crate::types::*;

// ══════════════════════════════════════════════════════════════════════════════
// Emission context
// ══════════════════════════════════════════════════════════════════════════════

/// State shared by every node emitted during one compile pass.
pub struct EmitContext<'g> {
    pub graph: &'g Graph,
    /// Problems found so far in this pass.
    pub diagnostics: Diagnostics,
    /// Nodes whose emission is in progress, outermost first.
    stack: Vec<NodeId>,
    /// Same nodes as `stack`, for constant-time membership checks.
    active: HashSet<NodeId>,
}

impl<'g> EmitContext<'g> {
    pub fn new(graph: &'g Graph) -> Self {
        Self {
            graph,
            diagnostics: Diagnostics::new(),
            stack: Vec::new(),
            active: HashSet::new(),
        }
    }

    pub fn report(&mut self, node: NodeId, code: DiagnosticCode, message: impl Into<String>) {
        self.diagnostics.report(node, code, message);
    }

    pub fn into_diagnostics(self) -> Diagnostics {
        self.diagnostics
    }

    fn enter(&mut self, node: NodeId) -> bool {
        if !self.active.insert(node) {
            self.report(node, DiagnosticCode::FLOW_CYCLE, "Cycle detected");
            return false;
        }
        self.stack.push(node);
        true
    }

    /// Pop the stack back down to `depth` entries.
    fn leave_to(&mut self, depth: usize) {
        while self.stack.len() > depth {
            if let Some(node) = self.stack.pop() {
                self.active.remove(&node);
            }
        }
    }
}

/// Emit `node` into `buf`.
///
/// The selector depends on the node's role: value nodes read it as the
/// output pin to produce, entry nodes read `0` as "whole function body" and
/// `n > 0` as "event parameter `n`", flow nodes ignore it.
pub fn emit_node(ctx: &mut EmitContext<'_>, buf: &mut Vec<u8>, node: NodeId, selector: u32) {
    let graph = ctx.graph;
    let Some(n) = graph.node(node) else {
        return;
    };
    let role = n.kind().role();

    // Parameter reads never recurse, and the entry node is usually on the
    // stack while its body pulls them.
    if role == NodeRole::Entry && selector != 0 {
        emit_entry_param(ctx, buf, n, selector);
        return;
    }

    if role == NodeRole::Flow {
        emit_chain(ctx, buf, node);
        return;
    }

    let depth = ctx.stack.len();
    if !ctx.enter(node) {
        return;
    }
    match role {
        NodeRole::Value => emit_value(ctx, buf, n, selector),
        NodeRole::Entry => emit_entry_body(ctx, buf, n),
        NodeRole::Flow => {}
    }
    ctx.leave_to(depth);
}

/// Emit a run of flow nodes starting at `first`, following each node's
/// continuation in a loop. Every node of the run stays on the stack until
/// the run ends, so a continuation leading back into it is a cycle.
fn emit_chain(ctx: &mut EmitContext<'_>, buf: &mut Vec<u8>, first: NodeId) {
    let graph = ctx.graph;
    let depth = ctx.stack.len();
    let mut next = Some(first);
    while let Some(id) = next {
        let Some(n) = graph.node(id) else {
            break;
        };
        if n.kind().role() != NodeRole::Flow {
            emit_node(ctx, buf, id, 0);
            break;
        }
        if !ctx.enter(id) {
            break;
        }
        next = emit_flow(ctx, buf, n);
    }
    ctx.leave_to(depth);
}

// ══════════════════════════════════════════════════════════════════════════════
// Module writer
// ══════════════════════════════════════════════════════════════════════════════

/// A host function the module imports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionImport {
    pub module: String,
    pub field: String,
    /// Result type byte, `None` for no result.
    pub ret: Option<u8>,
    pub params: Vec<u8>,
}

/// An exported function whose body is generated from `root`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionExport {
    pub name: String,
    pub root: NodeId,
    pub params: Vec<u8>,
}

/// A mutable, zero-initialised module global.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Global {
    pub ty: u8,
    pub export_name: Option<String>,
}

/// Collects the module's interface, then writes it.
#[derive(Debug, Clone, Default)]
pub struct ModuleWriter {
    imports: Vec<FunctionImport>,
    exports: Vec<FunctionExport>,
    globals: Vec<Global>,
}

impl ModuleWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a host import and return its function index.
    pub fn add_function_import(
        &mut self,
        module: &str,
        field: &str,
        ret: Option<u8>,
        params: &[u8],
    ) -> u32 {
        self.imports.push(FunctionImport {
            module: module.to_string(),
            field: field.to_string(),
            ret,
            params: params.to_vec(),
        });
        self.imports.len() as u32 - 1
    }

    /// Export a function generated from the entry node `root`.
    pub fn add_function_export(&mut self, name: &str, root: NodeId, params: &[ValueType]) {
        self.exports.push(FunctionExport {
            name: name.to_string(),
            root,
            params: params.iter().map(|ty| val_type(*ty)).collect(),
        });
    }

    /// Declare a global and return its index. Empty names are not exported.
    pub fn add_global(&mut self, ty: ValueType, export_name: Option<&str>) -> u32 {
        self.globals.push(Global {
            ty: val_type(ty),
            export_name: export_name.map(str::to_string),
        });
        self.globals.len() as u32 - 1
    }

    pub fn imports(&self) -> &[FunctionImport] {
        &self.imports
    }

    pub fn exports(&self) -> &[FunctionExport] {
        &self.exports
    }

    pub fn globals(&self) -> &[Global] {
        &self.globals
    }

    /// Write the complete module, generating every export's body through
    /// `ctx`.
    pub fn write(&self, buf: &mut Vec<u8>, ctx: &mut EmitContext<'_>) {
        buf.extend_from_slice(&WASM_MAGIC.to_le_bytes());
        buf.extend_from_slice(&WASM_VERSION.to_le_bytes());

        self.write_types(buf);
        self.write_imports(buf);
        self.write_functions(buf);
        self.write_globals(buf);
        self.write_exports(buf);
        self.write_code(buf, ctx);
    }

    // ── Type section ─────────────────────────────────────────────────────

    fn write_types(&self, buf: &mut Vec<u8>) {
        write_section(buf, SectionId::Type, |body| {
            write_var_u32(body, (self.imports.len() + self.exports.len()) as u32);
            for import in &self.imports {
                write_signature(body, &import.params, import.ret);
            }
            for export in &self.exports {
                write_signature(body, &export.params, None);
            }
        });
    }

    // ── Import section ───────────────────────────────────────────────────

    fn write_imports(&self, buf: &mut Vec<u8>) {
        write_section(buf, SectionId::Import, |body| {
            write_var_u32(body, self.imports.len() as u32);
            for (i, import) in self.imports.iter().enumerate() {
                write_name(body, &import.module);
                write_name(body, &import.field);
                body.push(EXTERNAL_FUNCTION);
                write_var_u32(body, i as u32);
            }
        });
    }

    // ── Function section ─────────────────────────────────────────────────

    fn write_functions(&self, buf: &mut Vec<u8>) {
        let imports = self.imports.len() as u32;
        write_section(buf, SectionId::Function, |body| {
            write_var_u32(body, self.exports.len() as u32);
            for i in 0..self.exports.len() as u32 {
                write_var_u32(body, imports + i);
            }
        });
    }

    // ── Global section ───────────────────────────────────────────────────

    fn write_globals(&self, buf: &mut Vec<u8>) {
        write_section(buf, SectionId::Global, |body| {
            write_var_u32(body, self.globals.len() as u32);
            for global in &self.globals {
                body.push(global.ty);
                body.push(1);
                write_zero_const(body, global.ty);
                body.push(op::END);
            }
        });
    }

    // ── Export section ───────────────────────────────────────────────────

    /// Globals whose export name is non-empty and not already taken, with
    /// their indices.
    pub fn exported_globals(&self) -> Vec<(u32, &str)> {
        let mut taken: HashSet<&str> = self.exports.iter().map(|e| e.name.as_str()).collect();
        let mut out = Vec::new();
        for (index, global) in self.globals.iter().enumerate() {
            let Some(name) = global.export_name.as_deref() else {
                continue;
            };
            if name.is_empty() {
                tracing::warn!(global = index, "global has an empty name, not exported");
                continue;
            }
            if !taken.insert(name) {
                tracing::warn!(global = index, name, "export name already used, not exported");
                continue;
            }
            out.push((index as u32, name));
        }
        out
    }

    fn write_exports(&self, buf: &mut Vec<u8>) {
        let imports = self.imports.len() as u32;
        let globals = self.exported_globals();
        write_section(buf, SectionId::Export, |body| {
            write_var_u32(body, (self.exports.len() + globals.len()) as u32);
            for (i, export) in self.exports.iter().enumerate() {
                write_name(body, &export.name);
                body.push(EXTERNAL_FUNCTION);
                write_var_u32(body, imports + i as u32);
            }
            for (index, name) in &globals {
                write_name(body, name);
                body.push(EXTERNAL_GLOBAL);
                write_var_u32(body, *index);
            }
        });
    }

    // ── Code section ─────────────────────────────────────────────────────

    fn write_code(&self, buf: &mut Vec<u8>, ctx: &mut EmitContext<'_>) {
        write_section(buf, SectionId::Code, |body| {
            write_var_u32(body, self.exports.len() as u32);
            for export in &self.exports {
                let mut func = Vec::new();
                emit_node(ctx, &mut func, export.root, 0);
                if func.is_empty() {
                    tracing::warn!(export = %export.name, root = %export.root, "entry node missing, body left empty");
                    func.extend_from_slice(&[0x00, op::END]);
                }
                tracing::debug!(export = %export.name, root = %export.root, size = func.len(), "function emitted");
                write_var_u32(body, func.len() as u32);
                body.extend_from_slice(&func);
            }
        });
    }
}

fn write_signature(buf: &mut Vec<u8>, params: &[u8], ret: Option<u8>) {
    buf.push(FUNC_FORM);
    write_var_u32(buf, params.len() as u32);
    buf.extend_from_slice(params);
    match ret {
        Some(ty) => {
            buf.push(1);
            buf.push(ty);
        }
        None => buf.push(0),
    }
}

/// Constant initialiser yielding zero of type `ty`.
fn write_zero_const(buf: &mut Vec<u8>, ty: u8) {
    match ty {
        VAL_F32 => {
            buf.push(op::F32_CONST);
            buf.extend_from_slice(&0f32.to_le_bytes());
        }
        VAL_F64 => {
            buf.push(op::F64_CONST);
            buf.extend_from_slice(&0f64.to_le_bytes());
        }
        VAL_I64 => {
            buf.push(op::I64_CONST);
            buf.push(0);
        }
        _ => {
            buf.push(op::I32_CONST);
            buf.push(0);
        }
    }
}
