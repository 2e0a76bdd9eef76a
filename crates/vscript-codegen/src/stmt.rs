//! Flow and entry node code generation.
//!
//! Flow nodes append side effects and then continue down their flow output.
//! Entry nodes open and close a function body; downstream value nodes read
//! their event parameters through selectors `1..`.

use vscript_graph::{Node, NodeData, ReflectedRef};
use vscript_types::{DiagnosticCode, NodeId};

use crate::compiler::{emit_node, EmitContext};
use crate::encode::{write_f32, write_var_u32};
use crate::expr::emit_property_hash;
use crate::types::*;

/// Emit the side effects of flow node `node` and return the node its flow
/// continues with, if any. The caller walks the continuation.
pub fn emit_flow(ctx: &mut EmitContext<'_>, buf: &mut Vec<u8>, node: &Node) -> Option<NodeId> {
    match &node.data {
        NodeData::SetYaw => emit_set_yaw(ctx, buf, node.id),
        NodeData::SetVariable { var } => emit_set_variable(ctx, buf, node.id, *var),
        NodeData::SetProperty { target, fallback } => {
            emit_set_property(ctx, buf, node.id, target, fallback)
        }
        NodeData::If => {
            emit_if(ctx, buf, node.id);
            None
        }
        NodeData::Sequence => {
            let graph = ctx.graph;
            for pin in 0..=u16::MAX {
                let Some((next, _)) = graph.output_target(node.id, pin) else {
                    break;
                };
                emit_node(ctx, buf, next, 0);
            }
            None
        }
        // Resolved at compile time: only the selected branch is emitted.
        NodeData::Switch { on } => next_of(ctx, node.id, if *on { 0 } else { 1 }),
        NodeData::Call(func) => {
            ctx.report(
                node.id,
                DiagnosticCode::UNSUPPORTED_NODE,
                format!("Calling {} is not supported yet", func.label()),
            );
            next_of(ctx, node.id, 0)
        }
        _ => None,
    }
}

/// Whatever output `pin` of `node` leads to.
fn next_of(ctx: &EmitContext<'_>, node: NodeId, pin: u16) -> Option<NodeId> {
    ctx.graph.output_target(node, pin).map(|(next, _)| next)
}

fn emit_set_yaw(ctx: &mut EmitContext<'_>, buf: &mut Vec<u8>, node: NodeId) -> Option<NodeId> {
    let graph = ctx.graph;
    let (Some(entity), Some(yaw)) = (graph.input_source(node, 1), graph.input_source(node, 2))
    else {
        ctx.report(node, DiagnosticCode::MISSING_INPUT, "Missing inputs");
        return None;
    };
    emit_node(ctx, buf, entity.0, u32::from(entity.1));
    emit_node(ctx, buf, yaw.0, u32::from(yaw.1));
    buf.push(op::CALL);
    write_var_u32(buf, IMPORT_SET_YAW);
    next_of(ctx, node, 0)
}

fn emit_set_variable(
    ctx: &mut EmitContext<'_>,
    buf: &mut Vec<u8>,
    node: NodeId,
    var: u32,
) -> Option<NodeId> {
    let graph = ctx.graph;
    let Some((value, pin)) = graph.input_source(node, 1) else {
        ctx.report(node, DiagnosticCode::MISSING_INPUT, "Missing input");
        return None;
    };
    emit_node(ctx, buf, value, u32::from(pin));
    if graph.variable(var).is_none() {
        ctx.report(
            node,
            DiagnosticCode::UNKNOWN_VARIABLE,
            format!("Unknown variable {var}"),
        );
    }
    buf.push(op::GLOBAL_SET);
    write_var_u32(buf, var.saturating_add(GLOBAL_USER));
    next_of(ctx, node, 0)
}

fn emit_set_property(
    ctx: &mut EmitContext<'_>,
    buf: &mut Vec<u8>,
    node: NodeId,
    target: &ReflectedRef,
    fallback: &str,
) -> Option<NodeId> {
    let graph = ctx.graph;
    let Some((entity, pin)) = graph.input_source(node, 1) else {
        ctx.report(node, DiagnosticCode::MISSING_INPUT, "Missing entity input");
        return None;
    };
    let Some(binding) = &target.binding else {
        ctx.report(
            node,
            DiagnosticCode::UNRESOLVED_REFLECTION,
            format!("Unresolved property {}", target.label()),
        );
        return next_of(ctx, node, 0);
    };

    emit_node(ctx, buf, entity, u32::from(pin));
    emit_property_hash(buf, binding.property_hash.0);
    match graph.input_source(node, 2) {
        Some((value, pin)) => emit_node(ctx, buf, value, u32::from(pin)),
        None => {
            buf.push(op::F32_CONST);
            write_f32(buf, parse_float_prefix(fallback));
        }
    }
    buf.push(op::CALL);
    write_var_u32(buf, IMPORT_SET_PROPERTY_FLOAT);
    next_of(ctx, node, 0)
}

fn emit_if(ctx: &mut EmitContext<'_>, buf: &mut Vec<u8>, node: NodeId) {
    let graph = ctx.graph;
    let (Some((on_true, _)), Some((on_false, _))) =
        (graph.output_target(node, 0), graph.output_target(node, 1))
    else {
        ctx.report(node, DiagnosticCode::MISSING_OUTPUT, "Missing outputs");
        return;
    };
    let Some((cond, pin)) = graph.input_source(node, 1) else {
        ctx.report(node, DiagnosticCode::MISSING_INPUT, "Missing condition");
        return;
    };

    emit_node(ctx, buf, cond, u32::from(pin));
    buf.push(op::IF);
    buf.push(BLOCK_EMPTY);
    emit_node(ctx, buf, on_true, 0);
    buf.push(op::ELSE);
    emit_node(ctx, buf, on_false, 0);
    buf.push(op::END);
}

// ══════════════════════════════════════════════════════════════════════════════
// Entry nodes
// ══════════════════════════════════════════════════════════════════════════════

/// Emit the full function body rooted at entry node `node`: no locals, the
/// flow chain, `end`.
pub fn emit_entry_body(ctx: &mut EmitContext<'_>, buf: &mut Vec<u8>, node: &Node) {
    buf.push(0x00);
    if let Some(next) = next_of(ctx, node.id, 0) {
        emit_node(ctx, buf, next, 0);
    }
    buf.push(op::END);
}

/// Read event parameter `selector` (1-based) of entry node `node`.
pub fn emit_entry_param(ctx: &mut EmitContext<'_>, buf: &mut Vec<u8>, node: &Node, selector: u32) {
    let params = entry_point(node.kind()).map_or(0, |e| e.params.len());
    if selector == 0 || selector as usize > params {
        ctx.report(
            node.id,
            DiagnosticCode::INVALID_SELECTOR,
            format!("{} has no parameter {selector}", node.kind().title()),
        );
        return;
    }
    buf.push(op::LOCAL_GET);
    write_var_u32(buf, selector - 1);
}

/// The longest leading float literal of `text`, or `0.0`.
fn parse_float_prefix(text: &str) -> f32 {
    let text = text.trim_start();
    (1..=text.len())
        .rev()
        .filter(|end| text.is_char_boundary(*end))
        .find_map(|end| text[..end].parse::<f32>().ok())
        .unwrap_or(0.0)
}
