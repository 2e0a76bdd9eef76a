//! Value node code generation.
//!
//! A value node pushes exactly one value. When a required input is missing
//! the node reports a diagnostic and emits nothing.

use vscript_graph::{CompareOp, Node, NodeData, ReflectedRef};
use vscript_types::{DiagnosticCode, NodeId, ValueType};

use crate::compiler::{emit_node, EmitContext};
use crate::encode::{write_f32, write_leb128, write_var_u32};
use crate::types::*;

/// Emit value node `node`. `_pin` is the requested output; every value node
/// has a single one.
pub fn emit_value(ctx: &mut EmitContext<'_>, buf: &mut Vec<u8>, node: &Node, _pin: u32) {
    match &node.data {
        NodeData::Add => {
            if let Some(ty) = emit_operands(ctx, buf, node.id) {
                buf.push(if ty.is_float() { op::F32_ADD } else { op::I32_ADD });
            }
        }
        NodeData::Mul => {
            if let Some(ty) = emit_operands(ctx, buf, node.id) {
                buf.push(if ty.is_float() { op::F32_MUL } else { op::I32_MUL });
            }
        }
        NodeData::Compare(cmp) => {
            if let Some(ty) = emit_operands(ctx, buf, node.id) {
                buf.push(compare_opcode(*cmp, ty));
            }
        }
        NodeData::Const { value } => {
            buf.push(op::F32_CONST);
            write_f32(buf, *value);
        }
        NodeData::SelfRef => {
            buf.push(op::GLOBAL_GET);
            write_var_u32(buf, GLOBAL_SELF);
        }
        NodeData::GetVariable { var } => {
            if ctx.graph.variable(*var).is_none() {
                ctx.report(
                    node.id,
                    DiagnosticCode::UNKNOWN_VARIABLE,
                    format!("Unknown variable {var}"),
                );
            }
            buf.push(op::GLOBAL_GET);
            write_var_u32(buf, var.saturating_add(GLOBAL_USER));
        }
        NodeData::GetProperty(prop) => emit_get_property(ctx, buf, node.id, prop),
        NodeData::Vec3 | NodeData::YawToDir => {
            ctx.report(
                node.id,
                DiagnosticCode::UNSUPPORTED_NODE,
                format!("{} is not supported yet", node.kind().title()),
            );
        }
        _ => {}
    }
}

/// Emit both operands of a binary node, left first.
///
/// Returns the left operand's type, which picks the opcode family, or
/// `None` when an operand is unconnected. Mismatched operand types are
/// reported but do not stop emission.
fn emit_operands(ctx: &mut EmitContext<'_>, buf: &mut Vec<u8>, node: NodeId) -> Option<ValueType> {
    let graph = ctx.graph;
    let (Some(lhs), Some(rhs)) = (graph.input_source(node, 0), graph.input_source(node, 1)) else {
        ctx.report(node, DiagnosticCode::MISSING_INPUT, "Missing inputs");
        return None;
    };
    emit_node(ctx, buf, lhs.0, u32::from(lhs.1));
    emit_node(ctx, buf, rhs.0, u32::from(rhs.1));

    let lhs_ty = graph.output_type(lhs.0, lhs.1);
    let rhs_ty = graph.output_type(rhs.0, rhs.1);
    if lhs_ty != rhs_ty {
        ctx.report(
            node,
            DiagnosticCode::TYPE_MISMATCH,
            format!("Types do not match ({lhs_ty} vs {rhs_ty})"),
        );
    }
    Some(lhs_ty)
}

fn compare_opcode(cmp: CompareOp, ty: ValueType) -> u8 {
    if ty.is_float() {
        match cmp {
            CompareOp::Eq => op::F32_EQ,
            CompareOp::Neq => op::F32_NE,
            CompareOp::Lt => op::F32_LT,
            CompareOp::Gt => op::F32_GT,
            CompareOp::Lte => op::F32_LE,
            CompareOp::Gte => op::F32_GE,
        }
    } else {
        match cmp {
            CompareOp::Eq => op::I32_EQ,
            CompareOp::Neq => op::I32_NE,
            CompareOp::Lt => op::I32_LT_S,
            CompareOp::Gt => op::I32_GT_S,
            CompareOp::Lte => op::I32_LE_S,
            CompareOp::Gte => op::I32_GE_S,
        }
    }
}

fn emit_get_property(
    ctx: &mut EmitContext<'_>,
    buf: &mut Vec<u8>,
    node: NodeId,
    prop: &ReflectedRef,
) {
    let graph = ctx.graph;
    let Some((entity, pin)) = graph.input_source(node, 0) else {
        ctx.report(node, DiagnosticCode::MISSING_INPUT, "Missing entity input");
        return;
    };
    let Some(binding) = &prop.binding else {
        ctx.report(
            node,
            DiagnosticCode::UNRESOLVED_REFLECTION,
            format!("Unresolved property {}", prop.label()),
        );
        return;
    };
    emit_node(ctx, buf, entity, u32::from(pin));
    emit_property_hash(buf, binding.property_hash.0);
    buf.push(op::CALL);
    write_var_u32(buf, IMPORT_GET_PROPERTY_FLOAT);
}

/// `i64.const` carrying a 64-bit property hash, reinterpreted as signed.
pub(crate) fn emit_property_hash(buf: &mut Vec<u8>, hash: u64) {
    buf.push(op::I64_CONST);
    write_leb128(buf, hash as i64);
}
