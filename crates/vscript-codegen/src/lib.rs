//! Visual script WASM code generator: turns a graph into a `.wasm` binary.
//!
//! # Architecture
//!
//! Code is generated by walking the graph from each entry node. Every node
//! kind has a role that fixes how it emits:
//!
//! - **Value** nodes ([`expr`]) push exactly one value, pulling their inputs
//!   first, left to right.
//! - **Flow** nodes ([`stmt`]) append side effects, then continue down their
//!   flow output.
//! - **Entry** nodes ([`stmt`]) open and close an exported function and
//!   expose its event parameters as locals.
//!
//! [`ModuleWriter`] assembles the function bodies with the host imports and
//! the globals into a module. Problems found along the way never abort
//! generation; they are collected as per-node diagnostics in the
//! [`EmitContext`].
//!
//! ## Imports
//! - `setYaw(entity: i32, yaw: f32)`
//! - `setPropertyFloat(entity: i32, property: i64, value: f32)`
//! - `getPropertyFloat(entity: i32, property: i64) -> f32`
//!
//! ## Exports
//! - `update(dt: f32)`, `onMouseMove(x: f32, y: f32)`, `onKeyEvent(key: i32)`,
//!   `start()`: one per entry kind present in the graph
//! - `self` and one global per named graph variable

pub mod compiler;
pub mod encode;
pub mod expr;
pub mod stmt;
pub mod types;

pub use compiler::{emit_node, EmitContext, FunctionExport, FunctionImport, Global, ModuleWriter};
pub use types::{entry_point, EntryPoint, ENTRY_POINTS};
