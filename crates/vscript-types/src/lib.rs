//! Shared types for the visual script compiler.
//!
//! This crate defines the vocabulary shared by every compiler stage: scalar
//! value types, node identifiers and encoded pin references, links, the
//! diagnostics produced by a compile pass, load errors, and the reflection
//! collaborator used to resolve engine components.

mod error;
mod ids;
mod value;
pub mod reflection;

pub use error::{Diagnostic, DiagnosticCode, Diagnostics, GraphError};
pub use ids::{Link, NodeId, PinRef};
pub use reflection::{ComponentHandle, ComponentHash, PropertyHash, Reflection, StaticRegistry};
pub use value::ValueType;

/// Result type used by graph construction and persistence.
pub type GraphResult<T> = std::result::Result<T, GraphError>;
