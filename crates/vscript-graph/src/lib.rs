//! Visual script graph model.
//!
//! A [`Graph`] owns its nodes, the links between their pins and the
//! graph-global variables. Nodes refer to each other only by [`NodeId`];
//! links are plain `u32` pin references, so structural edits such as node
//! removal never leave dangling pointers.
//!
//! ```text
//! .lvs bytes ⇄ Graph::deserialize / Graph::serialize
//! ```
//!
//! The graph also answers the pure queries the editor and the code generator
//! share: pin declarations per node kind ([`Graph::pins`]) and scalar type
//! inference on value pins ([`Graph::output_type`]).

mod graph;
mod infer;
mod node;
pub mod palette;
pub mod persist;

pub use graph::{Graph, Variable};
pub use infer::FALLBACK_TYPE;
pub use node::{
    Binding, CompareOp, Node, NodeData, NodeKind, NodeRole, PinKind, Pins, ReflectedRef,
};
pub use palette::{palette, palette_filter, NodeTemplate, PaletteEntry};
pub use persist::{LoadedGraph, GRAPH_MAGIC, GRAPH_VERSION};

pub use vscript_types::{GraphError, GraphResult, Link, NodeId, PinRef, ValueType};
