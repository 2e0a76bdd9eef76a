//! Node kinds, per-kind payloads and pin declarations.

use vscript_types::reflection::Reflection;
use vscript_types::{ComponentHandle, ComponentHash, NodeId, PropertyHash};

// ══════════════════════════════════════════════════════════════════════════════
// Kinds
// ══════════════════════════════════════════════════════════════════════════════

/// Persisted type tag of a node. The set is closed; tags are positional.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Add,
    Sequence,
    SelfRef,
    SetYaw,
    Const,
    MouseMove,
    Update,
    GetVariable,
    SetVariable,
    SetProperty,
    Mul,
    Call,
    Vec3,
    YawToDir,
    Start,
    If,
    Eq,
    Neq,
    Gt,
    Lt,
    Gte,
    Lte,
    KeyInput,
    GetProperty,
    Switch,
}

/// How a node participates in code generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRole {
    /// Pushes exactly one value.
    Value,
    /// Appends side effects, then continues down its flow output.
    Flow,
    /// Root of an exported function.
    Entry,
}

impl NodeKind {
    /// Every kind in tag order.
    pub const ALL: [NodeKind; 25] = [
        Self::Add,
        Self::Sequence,
        Self::SelfRef,
        Self::SetYaw,
        Self::Const,
        Self::MouseMove,
        Self::Update,
        Self::GetVariable,
        Self::SetVariable,
        Self::SetProperty,
        Self::Mul,
        Self::Call,
        Self::Vec3,
        Self::YawToDir,
        Self::Start,
        Self::If,
        Self::Eq,
        Self::Neq,
        Self::Gt,
        Self::Lt,
        Self::Gte,
        Self::Lte,
        Self::KeyInput,
        Self::GetProperty,
        Self::Switch,
    ];

    pub fn tag(self) -> u32 {
        Self::ALL.iter().position(|k| *k == self).unwrap_or(0) as u32
    }

    pub fn from_tag(tag: u32) -> Option<Self> {
        Self::ALL.get(tag as usize).copied()
    }

    pub fn role(self) -> NodeRole {
        match self {
            Self::Start | Self::Update | Self::MouseMove | Self::KeyInput => NodeRole::Entry,
            Self::Sequence
            | Self::SetYaw
            | Self::SetVariable
            | Self::SetProperty
            | Self::Call
            | Self::If
            | Self::Switch => NodeRole::Flow,
            _ => NodeRole::Value,
        }
    }

    /// Display title.
    pub fn title(self) -> &'static str {
        match self {
            Self::Add => "Add",
            Self::Sequence => "Sequence",
            Self::SelfRef => "Self",
            Self::SetYaw => "Set entity yaw",
            Self::Const => "Constant",
            Self::MouseMove => "Mouse move",
            Self::Update => "Update",
            Self::GetVariable => "Get variable",
            Self::SetVariable => "Set variable",
            Self::SetProperty => "Set property",
            Self::Mul => "Multiply",
            Self::Call => "Call",
            Self::Vec3 => "Vector 3",
            Self::YawToDir => "Yaw to direction",
            Self::Start => "Start",
            Self::If => "If",
            Self::Eq => "=",
            Self::Neq => "<>",
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Gte => ">=",
            Self::Lte => "<=",
            Self::KeyInput => "Key input",
            Self::GetProperty => "Get property",
            Self::Switch => "Switch",
        }
    }
}

/// Comparison performed by a compare node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Eq,
    Neq,
    Lt,
    Gt,
    Lte,
    Gte,
}

impl CompareOp {
    pub const ALL: [CompareOp; 6] = [
        Self::Eq,
        Self::Neq,
        Self::Lt,
        Self::Gt,
        Self::Lte,
        Self::Gte,
    ];

    pub fn kind(self) -> NodeKind {
        match self {
            Self::Eq => NodeKind::Eq,
            Self::Neq => NodeKind::Neq,
            Self::Lt => NodeKind::Lt,
            Self::Gt => NodeKind::Gt,
            Self::Lte => NodeKind::Lte,
            Self::Gte => NodeKind::Gte,
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Reflected references
// ══════════════════════════════════════════════════════════════════════════════

/// Live resolution of a [`ReflectedRef`] against the registry.
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub handle: ComponentHandle,
    pub component_name: String,
    /// Hash passed to the host property accessors.
    pub property_hash: PropertyHash,
    /// Argument count, for function references.
    pub arg_count: u32,
}

/// A component member (property or function) referenced by a node.
///
/// The persisted form is the component name hash plus the member name; the
/// binding is recomputed whenever the graph is loaded. An unbound reference
/// keeps its raw fields so the node still saves byte-identically.
#[derive(Debug, Clone, PartialEq)]
pub struct ReflectedRef {
    pub component: ComponentHash,
    pub member: String,
    pub binding: Option<Binding>,
}

impl ReflectedRef {
    /// An unresolved reference, as read from persisted bytes.
    pub fn unbound(component: ComponentHash, member: impl Into<String>) -> Self {
        Self {
            component,
            member: member.into(),
            binding: None,
        }
    }

    /// Resolve as a float property. Returns the failure message on error.
    pub fn bind_property(&mut self, reflection: &dyn Reflection) -> Result<(), String> {
        self.binding = None;
        let handle = reflection
            .component_by_hash(self.component)
            .ok_or_else(|| "Component not found".to_string())?;
        if !reflection.has_property(handle, &self.member) {
            return Err(format!("Property '{}' not found", self.member));
        }
        self.binding = Self::make_binding(reflection, handle, &self.member, 0);
        self.binding
            .as_ref()
            .map(|_| ())
            .ok_or_else(|| "Component not found".to_string())
    }

    /// Resolve as a component function. Returns the failure message on error.
    pub fn bind_function(&mut self, reflection: &dyn Reflection) -> Result<(), String> {
        self.binding = None;
        let handle = reflection
            .component_by_hash(self.component)
            .ok_or_else(|| "Component not found".to_string())?;
        let arg_count = reflection
            .function_arg_count(handle, &self.member)
            .ok_or_else(|| format!("Function '{}' not found", self.member))?;
        self.binding = Self::make_binding(reflection, handle, &self.member, arg_count);
        self.binding
            .as_ref()
            .map(|_| ())
            .ok_or_else(|| "Component not found".to_string())
    }

    fn make_binding(
        reflection: &dyn Reflection,
        handle: ComponentHandle,
        member: &str,
        arg_count: u32,
    ) -> Option<Binding> {
        let component_name = reflection.component_name(handle)?.to_string();
        let property_hash = reflection
            .property_hash(handle, member)
            .unwrap_or_else(|| PropertyHash::of(&component_name, member));
        Some(Binding {
            handle,
            component_name,
            property_hash,
            arg_count,
        })
    }

    /// `component.member`, or `?.member` while unbound.
    pub fn label(&self) -> String {
        match &self.binding {
            Some(b) => format!("{}.{}", b.component_name, self.member),
            None => format!("?.{}", self.member),
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Nodes
// ══════════════════════════════════════════════════════════════════════════════

/// Kind-specific payload of a node.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeData {
    Add,
    Mul,
    Compare(CompareOp),
    Sequence,
    SelfRef,
    SetYaw,
    Const { value: f32 },
    MouseMove,
    Update,
    Start,
    KeyInput,
    GetVariable { var: u32 },
    SetVariable { var: u32 },
    GetProperty(ReflectedRef),
    SetProperty {
        target: ReflectedRef,
        /// Literal used when the value pin is unconnected.
        fallback: String,
    },
    Call(ReflectedRef),
    Vec3,
    YawToDir,
    If,
    Switch { on: bool },
}

impl NodeData {
    /// The payload a freshly created node of `kind` starts with.
    pub fn default_for(kind: NodeKind) -> Self {
        let unbound = || ReflectedRef::unbound(ComponentHash(0), "");
        match kind {
            NodeKind::Add => Self::Add,
            NodeKind::Mul => Self::Mul,
            NodeKind::Eq => Self::Compare(CompareOp::Eq),
            NodeKind::Neq => Self::Compare(CompareOp::Neq),
            NodeKind::Lt => Self::Compare(CompareOp::Lt),
            NodeKind::Gt => Self::Compare(CompareOp::Gt),
            NodeKind::Lte => Self::Compare(CompareOp::Lte),
            NodeKind::Gte => Self::Compare(CompareOp::Gte),
            NodeKind::Sequence => Self::Sequence,
            NodeKind::SelfRef => Self::SelfRef,
            NodeKind::SetYaw => Self::SetYaw,
            NodeKind::Const => Self::Const { value: 0.0 },
            NodeKind::MouseMove => Self::MouseMove,
            NodeKind::Update => Self::Update,
            NodeKind::Start => Self::Start,
            NodeKind::KeyInput => Self::KeyInput,
            NodeKind::GetVariable => Self::GetVariable { var: 0 },
            NodeKind::SetVariable => Self::SetVariable { var: 0 },
            NodeKind::GetProperty => Self::GetProperty(unbound()),
            NodeKind::SetProperty => Self::SetProperty {
                target: unbound(),
                fallback: String::new(),
            },
            NodeKind::Call => Self::Call(unbound()),
            NodeKind::Vec3 => Self::Vec3,
            NodeKind::YawToDir => Self::YawToDir,
            NodeKind::If => Self::If,
            NodeKind::Switch => Self::Switch { on: true },
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Self::Add => NodeKind::Add,
            Self::Mul => NodeKind::Mul,
            Self::Compare(op) => op.kind(),
            Self::Sequence => NodeKind::Sequence,
            Self::SelfRef => NodeKind::SelfRef,
            Self::SetYaw => NodeKind::SetYaw,
            Self::Const { .. } => NodeKind::Const,
            Self::MouseMove => NodeKind::MouseMove,
            Self::Update => NodeKind::Update,
            Self::Start => NodeKind::Start,
            Self::KeyInput => NodeKind::KeyInput,
            Self::GetVariable { .. } => NodeKind::GetVariable,
            Self::SetVariable { .. } => NodeKind::SetVariable,
            Self::GetProperty(_) => NodeKind::GetProperty,
            Self::SetProperty { .. } => NodeKind::SetProperty,
            Self::Call(_) => NodeKind::Call,
            Self::Vec3 => NodeKind::Vec3,
            Self::YawToDir => NodeKind::YawToDir,
            Self::If => NodeKind::If,
            Self::Switch { .. } => NodeKind::Switch,
        }
    }

    /// The reflected reference carried by this payload, if any.
    pub fn reflected(&self) -> Option<&ReflectedRef> {
        match self {
            Self::GetProperty(r) | Self::Call(r) => Some(r),
            Self::SetProperty { target, .. } => Some(target),
            _ => None,
        }
    }
}

/// A graph vertex.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    /// Editor position; preserved but irrelevant to compilation.
    pub position: [f32; 2],
    pub data: NodeData,
}

impl Node {
    pub fn kind(&self) -> NodeKind {
        self.data.kind()
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Pins
// ══════════════════════════════════════════════════════════════════════════════

/// Purpose of a pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PinKind {
    Flow,
    Value,
}

/// Declared pins of a node, in index order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pins {
    pub inputs: Vec<PinKind>,
    pub outputs: Vec<PinKind>,
}

/// Pin declaration of `data`. `sequence_outputs` is the flow output count a
/// sequence node currently exposes (it grows with its links).
pub(crate) fn declared_pins(data: &NodeData, sequence_outputs: usize) -> Pins {
    use PinKind::{Flow, Value};
    let (inputs, outputs) = match data {
        NodeData::Add | NodeData::Mul | NodeData::Compare(_) => (vec![Value, Value], vec![Value]),
        NodeData::Const { .. } | NodeData::SelfRef | NodeData::GetVariable { .. } => {
            (vec![], vec![Value])
        }
        NodeData::GetProperty(_) => (vec![Value], vec![Value]),
        NodeData::Vec3 => (vec![Value, Value, Value], vec![Value]),
        NodeData::YawToDir => (vec![Value], vec![Value]),
        NodeData::SetYaw => (vec![Flow, Value, Value], vec![Flow]),
        NodeData::SetVariable { .. } => (vec![Flow, Value], vec![Flow]),
        NodeData::SetProperty { .. } => (vec![Flow, Value, Value], vec![Flow]),
        NodeData::Call(r) => {
            let args = r.binding.as_ref().map_or(0, |b| b.arg_count as usize);
            let mut inputs = vec![Flow];
            inputs.extend(std::iter::repeat(Value).take(args));
            (inputs, vec![Flow])
        }
        NodeData::If => (vec![Flow, Value], vec![Flow, Flow]),
        NodeData::Switch { .. } => (vec![Flow], vec![Flow, Flow]),
        NodeData::Sequence => (vec![Flow], vec![Flow; sequence_outputs]),
        NodeData::Start => (vec![], vec![Flow]),
        NodeData::Update => (vec![], vec![Flow, Value]),
        NodeData::MouseMove => (vec![], vec![Flow, Value, Value]),
        NodeData::KeyInput => (vec![], vec![Flow, Value]),
    };
    Pins { inputs, outputs }
}
