//! Graph container: nodes, links and variables.

use std::path::PathBuf;

use vscript_types::{GraphError, GraphResult, Link, NodeId, PinRef, ValueType};

use crate::node::{declared_pins, Node, NodeData, NodeKind, Pins};

/// A named, typed graph-global. Backs one module global at compile time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub name: String,
    pub ty: ValueType,
}

/// A visual script graph.
///
/// The graph is the single owner of its nodes, links and variables. Node ids
/// are handed out from a monotonically increasing counter and never reused,
/// even after the node they named has been removed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Graph {
    nodes: Vec<Node>,
    links: Vec<Link>,
    variables: Vec<Variable>,
    /// Last id handed out; the next node gets `next_id + 1`.
    pub(crate) next_id: u32,
    /// Where the graph was loaded from, if anywhere.
    pub path: PathBuf,
}

impl Graph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// The template used for new script assets: a single `Update` entry.
    pub fn new_script() -> Self {
        let mut graph = Self::new();
        // An empty graph always has room for one node.
        let _ = graph.add_node(NodeData::Update);
        graph
    }

    /// Remove every node, link and variable. The id counter keeps running.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.links.clear();
        self.variables.clear();
    }

    // ── Nodes ────────────────────────────────────────────────────────────

    /// Add a node at the origin and return its freshly assigned id.
    pub fn add_node(&mut self, data: NodeData) -> GraphResult<NodeId> {
        self.add_node_at(data, [0.0, 0.0])
    }

    /// Add a node at `position`.
    pub fn add_node_at(&mut self, data: NodeData, position: [f32; 2]) -> GraphResult<NodeId> {
        let raw = self.next_id.checked_add(1).ok_or(GraphError::NodeLimit)?;
        let id = NodeId::from_u32(raw).ok_or(GraphError::NodeLimit)?;
        self.next_id = raw;
        self.nodes.push(Node { id, position, data });
        Ok(id)
    }

    /// Insert a node with a persisted id.
    pub(crate) fn insert_node(&mut self, node: Node) -> GraphResult<()> {
        if self.node(node.id).is_some() {
            return Err(GraphError::DuplicateNodeId(node.id));
        }
        self.next_id = self.next_id.max(u32::from(node.id.get()));
        self.nodes.push(node);
        Ok(())
    }

    /// Remove a node and every link touching it.
    pub fn remove_node(&mut self, id: NodeId) -> GraphResult<Node> {
        let index = self
            .nodes
            .iter()
            .position(|n| n.id == id)
            .ok_or(GraphError::NodeNotFound(id))?;
        self.links.retain(|l| !l.involves(id));
        Ok(self.nodes.remove(index))
    }

    /// Remove a selection of nodes. Unknown ids are ignored.
    pub fn remove_nodes(&mut self, ids: &[NodeId]) -> usize {
        let before = self.nodes.len();
        self.links
            .retain(|l| !ids.contains(&l.from.node()) && !ids.contains(&l.to.node()));
        self.nodes.retain(|n| !ids.contains(&n.id));
        before - self.nodes.len()
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    pub(crate) fn nodes_mut(&mut self) -> impl Iterator<Item = &mut Node> {
        self.nodes.iter_mut()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// The last id handed out by this graph.
    pub fn last_id(&self) -> u32 {
        self.next_id
    }

    /// The first node of `kind`, in insertion order.
    pub fn first_of_kind(&self, kind: NodeKind) -> Option<NodeId> {
        self.nodes.iter().find(|n| n.kind() == kind).map(|n| n.id)
    }

    // ── Links ────────────────────────────────────────────────────────────

    /// Add a link. Endpoints are not checked here; links that do not match
    /// the nodes' declared pins degrade to missing connections at compile
    /// time.
    pub fn add_link(&mut self, link: Link) {
        self.links.push(link);
    }

    /// Connect output `from_pin` of `from` to input `to_pin` of `to`.
    pub fn connect(&mut self, from: NodeId, from_pin: u16, to: NodeId, to_pin: u16) {
        self.add_link(Link::new(from, from_pin, to, to_pin));
    }

    /// Remove the link at `index`.
    pub fn remove_link(&mut self, index: usize) -> Option<Link> {
        (index < self.links.len()).then(|| self.links.remove(index))
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    /// The upstream end of input `pin` of `node`: the source node and the
    /// index of its output pin.
    pub fn input_source(&self, node: NodeId, pin: u16) -> Option<(NodeId, u16)> {
        let to = PinRef::input(node, pin);
        self.links
            .iter()
            .find(|l| l.to == to)
            .map(|l| (l.from.node(), l.from.pin()))
    }

    /// The downstream end of output `pin` of `node`: the target node and the
    /// index of its input pin.
    pub fn output_target(&self, node: NodeId, pin: u16) -> Option<(NodeId, u16)> {
        self.links
            .iter()
            .find(|l| l.from.node() == node && l.from.pin() == pin)
            .map(|l| (l.to.node(), l.to.pin()))
    }

    // ── Pins ─────────────────────────────────────────────────────────────

    /// Declared pins of `node`.
    pub fn pins(&self, node: NodeId) -> Option<Pins> {
        let n = self.node(node)?;
        let sequence_outputs = match n.data {
            NodeData::Sequence => self.linked_output_count(node) + 1,
            _ => 0,
        };
        Some(declared_pins(&n.data, sequence_outputs))
    }

    /// One past the highest output pin index that has a link.
    fn linked_output_count(&self, node: NodeId) -> usize {
        self.links
            .iter()
            .filter(|l| l.from.node() == node)
            .map(|l| usize::from(l.from.pin()) + 1)
            .max()
            .unwrap_or(0)
    }

    /// Indices of links whose endpoints reference a missing node or a pin the
    /// node does not declare.
    pub fn invalid_links(&self) -> Vec<usize> {
        let declared = |pin: PinRef, output: bool| -> bool {
            self.pins(pin.node()).is_some_and(|pins| {
                let side = if output { &pins.outputs } else { &pins.inputs };
                usize::from(pin.pin()) < side.len()
            })
        };
        self.links
            .iter()
            .enumerate()
            .filter(|(_, l)| !declared(l.from, true) || !declared(l.to, false))
            .map(|(i, _)| i)
            .collect()
    }

    // ── Variables ────────────────────────────────────────────────────────

    /// Declare a variable and return its index.
    pub fn add_variable(&mut self, name: impl Into<String>, ty: ValueType) -> usize {
        self.variables.push(Variable {
            name: name.into(),
            ty,
        });
        self.variables.len() - 1
    }

    /// Remove a variable. Nodes referring to later indices are not
    /// renumbered; dangling references are reported when compiling.
    pub fn remove_variable(&mut self, index: usize) -> Option<Variable> {
        (index < self.variables.len()).then(|| self.variables.remove(index))
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn variable(&self, index: u32) -> Option<&Variable> {
        self.variables.get(index as usize)
    }

    pub fn variable_mut(&mut self, index: usize) -> Option<&mut Variable> {
        self.variables.get_mut(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_start_at_one_and_are_never_reused() {
        let mut g = Graph::new();
        let a = g.add_node(NodeData::Add).unwrap();
        let b = g.add_node(NodeData::Mul).unwrap();
        assert_eq!(a, NodeId(1));
        assert_eq!(b, NodeId(2));
        g.remove_node(b).unwrap();
        let c = g.add_node(NodeData::SelfRef).unwrap();
        assert_eq!(c, NodeId(3));
    }

    #[test]
    fn test_node_limit() {
        let mut g = Graph::new();
        g.next_id = u32::from(NodeId::MAX) - 1;
        assert_eq!(g.add_node(NodeData::Add), Ok(NodeId(NodeId::MAX)));
        assert_eq!(g.add_node(NodeData::Add), Err(GraphError::NodeLimit));
    }

    #[test]
    fn test_sequence_exposes_one_free_output() {
        let mut g = Graph::new();
        let seq = g.add_node(NodeData::Sequence).unwrap();
        let c = g.add_node(NodeData::Const { value: 1.0 }).unwrap();
        assert_eq!(g.pins(seq).unwrap().outputs.len(), 1);
        g.connect(seq, 2, c, 0);
        assert_eq!(g.pins(seq).unwrap().outputs.len(), 4);
    }

    #[test]
    fn test_remove_missing_node() {
        let mut g = Graph::new();
        assert_eq!(
            g.remove_node(NodeId(9)),
            Err(GraphError::NodeNotFound(NodeId(9)))
        );
    }
}
