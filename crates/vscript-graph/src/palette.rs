//! Node palette: the templates an editor offers for creating nodes.

use vscript_types::reflection::Reflection;
use vscript_types::{ComponentHash, GraphResult, NodeId};

use crate::graph::Graph;
use crate::node::{CompareOp, NodeData, NodeKind, ReflectedRef};

/// What a palette entry creates.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeTemplate {
    /// A node of this kind with its default payload.
    Kind(NodeKind),
    GetVariable(u32),
    SetVariable(u32),
    GetProperty { component: String, property: String },
    SetProperty { component: String, property: String },
    Call { component: String, function: String },
}

/// One creatable node.
#[derive(Debug, Clone, PartialEq)]
pub struct PaletteEntry {
    /// Menu path, outermost first. Empty for top-level entries.
    pub category: Vec<String>,
    pub label: String,
    pub shortcut: Option<char>,
    pub template: NodeTemplate,
}

impl PaletteEntry {
    fn new(category: &[&str], label: impl Into<String>, template: NodeTemplate) -> Self {
        Self {
            category: category.iter().map(|c| c.to_string()).collect(),
            label: label.into(),
            shortcut: None,
            template,
        }
    }

    fn with_shortcut(mut self, key: char) -> Self {
        self.shortcut = Some(key);
        self
    }
}

/// Fixed kinds offered at the top level, with their shortcut keys.
const FIXED: &[(NodeKind, Option<char>)] = &[
    (NodeKind::Add, Some('A')),
    (NodeKind::Const, Some('1')),
    (NodeKind::If, Some('I')),
    (NodeKind::KeyInput, None),
    (NodeKind::MouseMove, None),
    (NodeKind::Mul, Some('M')),
    (NodeKind::SelfRef, Some('S')),
    (NodeKind::Sequence, None),
    (NodeKind::SetYaw, None),
    (NodeKind::Start, None),
    (NodeKind::Switch, None),
    (NodeKind::Update, None),
    (NodeKind::Vec3, Some('3')),
    (NodeKind::YawToDir, None),
];

/// Every node template available for `graph` given the registered
/// components.
pub fn palette(graph: &Graph, reflection: &dyn Reflection) -> Vec<PaletteEntry> {
    let mut entries = Vec::new();

    for op in CompareOp::ALL {
        let kind = op.kind();
        entries.push(PaletteEntry::new(
            &["Compare"],
            kind.title(),
            NodeTemplate::Kind(kind),
        ));
    }

    for (index, var) in graph.variables().iter().enumerate() {
        if var.name.is_empty() {
            continue;
        }
        let index = index as u32;
        entries.push(PaletteEntry::new(
            &["Set variable"],
            var.name.clone(),
            NodeTemplate::SetVariable(index),
        ));
        entries.push(PaletteEntry::new(
            &["Get variable"],
            var.name.clone(),
            NodeTemplate::GetVariable(index),
        ));
    }

    let components = reflection.components();
    for info in &components {
        for prop in &info.properties {
            entries.push(PaletteEntry::new(
                &["Get property", &info.name],
                prop.clone(),
                NodeTemplate::GetProperty {
                    component: info.name.clone(),
                    property: prop.clone(),
                },
            ));
            entries.push(PaletteEntry::new(
                &["Set property", &info.name],
                prop.clone(),
                NodeTemplate::SetProperty {
                    component: info.name.clone(),
                    property: prop.clone(),
                },
            ));
        }
    }
    for info in &components {
        for func in &info.functions {
            entries.push(PaletteEntry::new(
                &["Call", &info.name],
                func.name.clone(),
                NodeTemplate::Call {
                    component: info.name.clone(),
                    function: func.name.clone(),
                },
            ));
        }
    }

    for (kind, shortcut) in FIXED {
        let entry = PaletteEntry::new(&[], kind.title(), NodeTemplate::Kind(*kind));
        entries.push(match shortcut {
            Some(key) => entry.with_shortcut(*key),
            None => entry,
        });
    }
    entries
}

/// Entries whose label contains `query`, ignoring case. An empty query
/// matches everything.
pub fn palette_filter<'a>(entries: &'a [PaletteEntry], query: &str) -> Vec<&'a PaletteEntry> {
    let query = query.to_lowercase();
    entries
        .iter()
        .filter(|e| e.label.to_lowercase().contains(&query))
        .collect()
}

impl Graph {
    /// Create the node described by `template` at `position`.
    ///
    /// Reflected templates are bound immediately; a template naming a
    /// component the registry no longer knows still creates an inert node.
    pub fn instantiate(
        &mut self,
        template: &NodeTemplate,
        reflection: &dyn Reflection,
        position: [f32; 2],
    ) -> GraphResult<NodeId> {
        let reflected = |component: &str, member: &str| {
            ReflectedRef::unbound(ComponentHash::of(component), member)
        };
        let (data, bound) = match template {
            NodeTemplate::Kind(kind) => (NodeData::default_for(*kind), Ok(())),
            NodeTemplate::GetVariable(var) => (NodeData::GetVariable { var: *var }, Ok(())),
            NodeTemplate::SetVariable(var) => (NodeData::SetVariable { var: *var }, Ok(())),
            NodeTemplate::GetProperty {
                component,
                property,
            } => {
                let mut r = reflected(component, property);
                let bound = r.bind_property(reflection);
                (NodeData::GetProperty(r), bound)
            }
            NodeTemplate::SetProperty {
                component,
                property,
            } => {
                let mut target = reflected(component, property);
                let bound = target.bind_property(reflection);
                let data = NodeData::SetProperty {
                    target,
                    fallback: String::new(),
                };
                (data, bound)
            }
            NodeTemplate::Call {
                component,
                function,
            } => {
                let mut r = reflected(component, function);
                let bound = r.bind_function(reflection);
                (NodeData::Call(r), bound)
            }
        };
        let id = self.add_node_at(data, position)?;
        if let Err(message) = bound {
            tracing::warn!(node = %id, %message, "created node with unresolved reference");
        }
        Ok(id)
    }
}
