//! Binary persistence of a graph.
//!
//! Layout (all integers little-endian):
//!
//! ```text
//! magic u32 | version u32 | next_id u32
//! var_count u32  | (name string, type u32)*
//! link_count u32 | (from u32, to u32)*
//! node_count u32 | (kind u32, id u32, x f32, y f32, payload)*
//! ```
//!
//! Strings are a `u32` byte length followed by UTF-8 bytes. Each node kind
//! owns its payload:
//!
//! | Kind          | Payload                                              |
//! |---------------|------------------------------------------------------|
//! | `Const`       | `f32` value                                          |
//! | `Switch`      | `u8` flag                                            |
//! | `Get/SetVar`  | `u32` variable index                                 |
//! | `Call`        | `u32` component hash, string function                |
//! | `GetProperty` | `u32` component hash, string property                |
//! | `SetProperty` | `u32` component hash, string property, string value  |
//!
//! Loading fails closed on any mismatch. Reflected references that no longer
//! resolve are not fatal: they are reported and the node stays inert.

use vscript_types::reflection::Reflection;
use vscript_types::{
    ComponentHash, DiagnosticCode, Diagnostics, GraphError, GraphResult, Link, NodeId, PinRef,
    ValueType,
};

use crate::graph::Graph;
use crate::node::{Node, NodeData, NodeKind, ReflectedRef};

/// `'_LVS'` as a multi-character constant.
pub const GRAPH_MAGIC: u32 = 0x5F4C_5653;
/// The only format version understood.
pub const GRAPH_VERSION: u32 = 0;

/// Result of a successful load.
#[derive(Debug, Clone)]
pub struct LoadedGraph {
    pub graph: Graph,
    /// Reflected references that failed to resolve.
    pub diagnostics: Diagnostics,
}

// ══════════════════════════════════════════════════════════════════════════════
// Reader
// ══════════════════════════════════════════════════════════════════════════════

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn take(&mut self, len: usize, what: &'static str) -> GraphResult<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.data.len())
            .ok_or(GraphError::UnexpectedEof(what))?;
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn u8(&mut self, what: &'static str) -> GraphResult<u8> {
        Ok(self.take(1, what)?[0])
    }

    fn u32(&mut self, what: &'static str) -> GraphResult<u32> {
        let b = self.take(4, what)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn f32(&mut self, what: &'static str) -> GraphResult<f32> {
        self.u32(what).map(f32::from_bits)
    }

    fn string(&mut self, what: &'static str) -> GraphResult<String> {
        let len = self.u32(what)? as usize;
        let bytes = self.take(len, what)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| GraphError::InvalidUtf8)
    }

    /// Capacity hint for `count` records of at least `min_size` bytes each,
    /// bounded by what the remaining input could hold.
    fn capacity(&self, count: u32, min_size: usize) -> usize {
        (count as usize).min((self.data.len() - self.pos) / min_size)
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Writer helpers
// ══════════════════════════════════════════════════════════════════════════════

fn put_u32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn put_f32(out: &mut Vec<u8>, v: f32) {
    out.extend_from_slice(&v.to_bits().to_le_bytes());
}

fn put_string(out: &mut Vec<u8>, s: &str) {
    put_u32(out, s.len() as u32);
    out.extend_from_slice(s.as_bytes());
}

fn put_reflected(out: &mut Vec<u8>, r: &ReflectedRef) {
    put_u32(out, r.component.0);
    put_string(out, &r.member);
}

// ══════════════════════════════════════════════════════════════════════════════
// Graph persistence
// ══════════════════════════════════════════════════════════════════════════════

impl Graph {
    /// Serialize the graph. Structural inverse of [`Graph::deserialize`].
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::new();
        put_u32(&mut out, GRAPH_MAGIC);
        put_u32(&mut out, GRAPH_VERSION);
        put_u32(&mut out, self.next_id);

        put_u32(&mut out, self.variables().len() as u32);
        for var in self.variables() {
            put_string(&mut out, &var.name);
            put_u32(&mut out, var.ty.tag());
        }

        put_u32(&mut out, self.links().len() as u32);
        for link in self.links() {
            put_u32(&mut out, link.from.raw());
            put_u32(&mut out, link.to.raw());
        }

        put_u32(&mut out, self.node_count() as u32);
        for node in self.nodes() {
            put_u32(&mut out, node.kind().tag());
            put_u32(&mut out, u32::from(node.id.get()));
            put_f32(&mut out, node.position[0]);
            put_f32(&mut out, node.position[1]);
            write_payload(&mut out, &node.data);
        }
        out
    }

    /// Load a graph and resolve its reflected references against
    /// `reflection`.
    pub fn deserialize(bytes: &[u8], reflection: &dyn Reflection) -> GraphResult<LoadedGraph> {
        let mut r = Reader::new(bytes);

        let magic = r.u32("magic")?;
        if magic != GRAPH_MAGIC {
            return Err(GraphError::BadMagic {
                expected: GRAPH_MAGIC,
                found: magic,
            });
        }
        let version = r.u32("version")?;
        if version != GRAPH_VERSION {
            return Err(GraphError::UnsupportedVersion(version));
        }

        let mut graph = Graph::new();
        graph.next_id = r.u32("node counter")?;

        let var_count = r.u32("variable count")?;
        for _ in 0..var_count {
            let name = r.string("variable name")?;
            let tag = r.u32("variable type")?;
            let ty = ValueType::from_tag(tag).ok_or(GraphError::UnknownValueType(tag))?;
            graph.add_variable(name, ty);
        }

        let link_count = r.u32("link count")?;
        let mut links = Vec::with_capacity(r.capacity(link_count, 8));
        for _ in 0..link_count {
            let from = PinRef(r.u32("link")?);
            let to = PinRef(r.u32("link")?);
            links.push(Link { from, to });
        }
        for link in links {
            graph.add_link(link);
        }

        let node_count = r.u32("node count")?;
        for _ in 0..node_count {
            let tag = r.u32("node kind")?;
            let kind = NodeKind::from_tag(tag).ok_or(GraphError::UnknownNodeKind(tag))?;
            let raw_id = r.u32("node id")?;
            let id = NodeId::from_u32(raw_id).ok_or(GraphError::InvalidNodeId(raw_id))?;
            let position = [r.f32("node position")?, r.f32("node position")?];
            let data = read_payload(&mut r, kind)?;
            graph.insert_node(Node { id, position, data })?;
        }

        let diagnostics = graph.rebind(reflection);
        tracing::debug!(
            nodes = graph.node_count(),
            links = graph.links().len(),
            variables = graph.variables().len(),
            unresolved = diagnostics.len(),
            "graph loaded"
        );
        Ok(LoadedGraph { graph, diagnostics })
    }

    /// Re-resolve every reflected reference against `reflection`.
    ///
    /// Returns one diagnostic per node whose reference no longer resolves.
    pub fn rebind(&mut self, reflection: &dyn Reflection) -> Diagnostics {
        let mut diagnostics = Diagnostics::new();
        for node in self.nodes_mut() {
            let result = match &mut node.data {
                NodeData::GetProperty(r) => r.bind_property(reflection),
                NodeData::SetProperty { target, .. } => target.bind_property(reflection),
                NodeData::Call(r) => r.bind_function(reflection),
                _ => Ok(()),
            };
            if let Err(message) = result {
                tracing::warn!(node = %node.id, %message, "unresolved reflected reference");
                diagnostics.report(node.id, DiagnosticCode::UNRESOLVED_REFLECTION, message);
            }
        }
        diagnostics
    }
}

fn write_payload(out: &mut Vec<u8>, data: &NodeData) {
    match data {
        NodeData::Const { value } => put_f32(out, *value),
        NodeData::Switch { on } => out.push(u8::from(*on)),
        NodeData::GetVariable { var } | NodeData::SetVariable { var } => put_u32(out, *var),
        NodeData::Call(r) | NodeData::GetProperty(r) => put_reflected(out, r),
        NodeData::SetProperty { target, fallback } => {
            put_reflected(out, target);
            put_string(out, fallback);
        }
        _ => {}
    }
}

fn read_reflected(r: &mut Reader<'_>) -> GraphResult<ReflectedRef> {
    let component = ComponentHash(r.u32("component hash")?);
    let member = r.string("member name")?;
    Ok(ReflectedRef::unbound(component, member))
}

fn read_payload(r: &mut Reader<'_>, kind: NodeKind) -> GraphResult<NodeData> {
    Ok(match kind {
        NodeKind::Const => NodeData::Const {
            value: r.f32("constant")?,
        },
        NodeKind::Switch => NodeData::Switch {
            on: r.u8("switch flag")? != 0,
        },
        NodeKind::GetVariable => NodeData::GetVariable {
            var: r.u32("variable index")?,
        },
        NodeKind::SetVariable => NodeData::SetVariable {
            var: r.u32("variable index")?,
        },
        NodeKind::Call => NodeData::Call(read_reflected(r)?),
        NodeKind::GetProperty => NodeData::GetProperty(read_reflected(r)?),
        NodeKind::SetProperty => NodeData::SetProperty {
            target: read_reflected(r)?,
            fallback: r.string("fallback value")?,
        },
        other => NodeData::default_for(other),
    })
}
