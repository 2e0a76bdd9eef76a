use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a node within one graph.
///
/// Identifiers are 15 bits wide so that a node id and a pin index can share
/// a single `u32` link endpoint (see [`PinRef`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u16);

impl NodeId {
    /// Largest identifier a graph can hand out.
    pub const MAX: u16 = 0x7FFF;

    /// Build an id from a persisted `u32`, rejecting values wider than 15 bits.
    pub fn from_u32(raw: u32) -> Option<Self> {
        if raw <= u32::from(Self::MAX) {
            Some(Self(raw as u16))
        } else {
            None
        }
    }

    pub fn get(self) -> u16 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An encoded link endpoint.
///
/// ```text
/// bits 0..15  : node id
/// bit  15     : output flag
/// bits 16..32 : pin index on that side of the node
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PinRef(pub u32);

impl PinRef {
    const NODE_MASK: u32 = 0x7FFF;
    const OUTPUT_FLAG: u32 = 0x8000;

    /// Input pin `pin` of `node`.
    pub fn input(node: NodeId, pin: u16) -> Self {
        Self(u32::from(node.0) | (u32::from(pin) << 16))
    }

    /// Output pin `pin` of `node`.
    pub fn output(node: NodeId, pin: u16) -> Self {
        Self(u32::from(node.0) | Self::OUTPUT_FLAG | (u32::from(pin) << 16))
    }

    pub fn node(self) -> NodeId {
        NodeId((self.0 & Self::NODE_MASK) as u16)
    }

    pub fn pin(self) -> u16 {
        (self.0 >> 16) as u16
    }

    pub fn is_output(self) -> bool {
        self.0 & Self::OUTPUT_FLAG != 0
    }

    pub fn raw(self) -> u32 {
        self.0
    }
}

/// A directed edge from an output pin to an input pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Link {
    pub from: PinRef,
    pub to: PinRef,
}

impl Link {
    /// Connect output pin `from_pin` of `from` to input pin `to_pin` of `to`.
    pub fn new(from: NodeId, from_pin: u16, to: NodeId, to_pin: u16) -> Self {
        Self {
            from: PinRef::output(from, from_pin),
            to: PinRef::input(to, to_pin),
        }
    }

    /// Whether either endpoint belongs to `node`.
    pub fn involves(&self, node: NodeId) -> bool {
        self.from.node() == node || self.to.node() == node
    }
}
