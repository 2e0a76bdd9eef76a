use crate::NodeId;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Fatal failures while building or loading a graph.
///
/// Loading fails closed: any of these aborts the operation and no partial
/// graph is returned.
#[derive(Debug, Error, PartialEq)]
pub enum GraphError {
    /// The stream does not start with the graph magic.
    #[error("bad magic: expected {expected:#010x}, found {found:#010x}")]
    BadMagic { expected: u32, found: u32 },

    /// The stream was written by an unknown format version.
    #[error("unsupported graph version {0}")]
    UnsupportedVersion(u32),

    /// The stream ended in the middle of a record.
    #[error("unexpected end of data while reading {0}")]
    UnexpectedEof(&'static str),

    /// A node record carries a kind tag outside the known set.
    #[error("unknown node kind {0}")]
    UnknownNodeKind(u32),

    /// A variable record carries a value type tag outside the known set.
    #[error("unknown value type {0}")]
    UnknownValueType(u32),

    /// A persisted string is not valid UTF-8.
    #[error("string is not valid UTF-8")]
    InvalidUtf8,

    /// A persisted node id does not fit in 15 bits.
    #[error("node id {0} does not fit in 15 bits")]
    InvalidNodeId(u32),

    /// Two node records share the same id.
    #[error("duplicate node id {0}")]
    DuplicateNodeId(NodeId),

    /// The graph already handed out every available identifier.
    #[error("graph is full: node ids are limited to {max}", max = NodeId::MAX)]
    NodeLimit,

    /// No node with this id exists.
    #[error("node {0} not found")]
    NodeNotFound(NodeId),
}

/// Numeric diagnostic code (W100–W199).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DiagnosticCode(pub u16);

impl DiagnosticCode {
    // ── Connectivity ──
    pub const MISSING_INPUT: Self = Self(100);
    pub const MISSING_OUTPUT: Self = Self(101);
    pub const FLOW_CYCLE: Self = Self(102);

    // ── Typing ──
    pub const TYPE_MISMATCH: Self = Self(110);
    pub const UNKNOWN_VARIABLE: Self = Self(111);
    pub const INVALID_SELECTOR: Self = Self(112);

    // ── Host integration ──
    pub const UNRESOLVED_REFLECTION: Self = Self(120);
    pub const UNSUPPORTED_NODE: Self = Self(121);
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "W{}", self.0)
    }
}

/// A non-fatal problem found on one node during the latest pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub node: NodeId,
    pub code: DiagnosticCode,
    /// Human-readable message shown next to the node.
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: [{}] {}", self.node, self.code, self.message)
    }
}

/// Per-node diagnostics of a single pass.
///
/// A node holds at most one current diagnostic; reporting again replaces the
/// earlier message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `message` for `node`, replacing any earlier one.
    pub fn report(&mut self, node: NodeId, code: DiagnosticCode, message: impl Into<String>) {
        let message = message.into();
        match self.entries.iter_mut().find(|d| d.node == node) {
            Some(existing) => {
                existing.code = code;
                existing.message = message;
            }
            None => self.entries.push(Diagnostic {
                node,
                code,
                message,
            }),
        }
    }

    /// The current diagnostic of `node`, if any.
    pub fn get(&self, node: NodeId) -> Option<&Diagnostic> {
        self.entries.iter().find(|d| d.node == node)
    }

    /// The current message of `node`, or `""` when the node is clean.
    pub fn message(&self, node: NodeId) -> &str {
        self.get(node).map_or("", |d| d.message.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    /// Fold another pass's diagnostics into this one.
    pub fn extend(&mut self, other: Diagnostics) {
        for d in other.entries {
            self.report(d.node, d.code, d.message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_replaces_previous_message() {
        let mut diags = Diagnostics::new();
        diags.report(NodeId(4), DiagnosticCode::MISSING_INPUT, "Missing input");
        diags.report(NodeId(4), DiagnosticCode::TYPE_MISMATCH, "Types do not match");
        assert_eq!(diags.len(), 1);
        let d = diags.get(NodeId(4)).unwrap();
        assert_eq!(d.code, DiagnosticCode::TYPE_MISMATCH);
        assert_eq!(d.message, "Types do not match");
    }

    #[test]
    fn test_clean_node_has_empty_message() {
        let diags = Diagnostics::new();
        assert_eq!(diags.message(NodeId(1)), "");
        assert!(diags.is_empty());
    }

    #[test]
    fn test_code_display() {
        assert_eq!(DiagnosticCode::TYPE_MISMATCH.to_string(), "W110");
        let d = Diagnostic {
            node: NodeId(3),
            code: DiagnosticCode::MISSING_INPUT,
            message: "Missing input".into(),
        };
        assert_eq!(d.to_string(), "#3: [W100] Missing input");
    }

    #[test]
    fn test_diagnostics_json_output() {
        let mut diags = Diagnostics::new();
        diags.report(NodeId(2), DiagnosticCode::MISSING_OUTPUT, "Missing outputs");
        let json = serde_json::to_string(&diags).unwrap();
        assert!(json.contains("\"message\":\"Missing outputs\""));
        let back: Diagnostics = serde_json::from_str(&json).unwrap();
        assert_eq!(back, diags);
    }

    #[test]
    fn test_graph_error_messages() {
        let err = GraphError::BadMagic {
            expected: 0x5F4C_5653,
            found: 0,
        };
        assert_eq!(err.to_string(), "bad magic: expected 0x5f4c5653, found 0x00000000");
        assert_eq!(
            GraphError::NodeLimit.to_string(),
            "graph is full: node ids are limited to 32767"
        );
    }
}
