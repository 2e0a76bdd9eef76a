//! Scalar type inference on value pins.

use std::collections::HashSet;

use vscript_types::{NodeId, ValueType};

use crate::graph::Graph;
use crate::node::NodeData;

/// Type reported for disconnected or untyped pins.
pub const FALLBACK_TYPE: ValueType = ValueType::I32;

impl Graph {
    /// Infer the scalar type produced on output `pin` of `node`.
    ///
    /// Pure query, shared by the editor (pin colouring) and the code
    /// generator (opcode family selection). Arithmetic chains are walked
    /// upstream without recursion; a pin seen twice means a cycle.
    pub fn output_type(&self, node: NodeId, pin: u16) -> ValueType {
        let mut seen = HashSet::new();
        let (mut node, mut pin) = (node, pin);
        loop {
            if !seen.insert((node, pin)) {
                return FALLBACK_TYPE;
            }
            let Some(n) = self.node(node) else {
                return FALLBACK_TYPE;
            };
            match &n.data {
                // Arithmetic adopts the type of its first operand.
                NodeData::Add | NodeData::Mul => match self.input_source(node, 0) {
                    Some((src, src_pin)) => (node, pin) = (src, src_pin),
                    None => return FALLBACK_TYPE,
                },
                NodeData::Compare(_) => return ValueType::I32,
                NodeData::Const { .. } | NodeData::GetProperty(_) => return ValueType::Float,
                NodeData::Update | NodeData::MouseMove => return ValueType::Float,
                NodeData::KeyInput => return ValueType::I32,
                NodeData::SelfRef => return ValueType::Entity,
                NodeData::GetVariable { var } => {
                    return self.variable(*var).map_or(FALLBACK_TYPE, |v| v.ty)
                }
                _ => return FALLBACK_TYPE,
            }
        }
    }
}
