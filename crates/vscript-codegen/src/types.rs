//! WASM binary-format constants and the fixed host contract.
//!
//! ```text
//! imports : setYaw 0, setPropertyFloat 1, getPropertyFloat 2
//! globals : self 0, graph variable i at i + 1
//! funcs   : import count + export order
//! ```

use vscript_graph::NodeKind;
use vscript_types::ValueType;

/// `\0asm`, little-endian.
pub const WASM_MAGIC: u32 = 0x6d73_6100;
pub const WASM_VERSION: u32 = 1;

// ── Section ids ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SectionId {
    Type = 1,
    Import = 2,
    Function = 3,
    Global = 6,
    Export = 7,
    Code = 10,
}

// ── External kinds ───────────────────────────────────────────────────────────

pub const EXTERNAL_FUNCTION: u8 = 0x00;
pub const EXTERNAL_GLOBAL: u8 = 0x03;

// ── Value types ──────────────────────────────────────────────────────────────

pub const VAL_I32: u8 = 0x7F;
pub const VAL_I64: u8 = 0x7E;
pub const VAL_F32: u8 = 0x7D;
pub const VAL_F64: u8 = 0x7C;

/// Form byte of a function signature.
pub const FUNC_FORM: u8 = 0x60;
/// Block type of a structured instruction that yields nothing.
pub const BLOCK_EMPTY: u8 = 0x40;

/// Machine type backing a graph scalar. Only `Float` maps to `f32`.
pub fn val_type(ty: ValueType) -> u8 {
    match ty {
        ValueType::Float => VAL_F32,
        ValueType::U32 | ValueType::I32 | ValueType::Entity => VAL_I32,
    }
}

// ── Opcodes ──────────────────────────────────────────────────────────────────

pub mod op {
    pub const IF: u8 = 0x04;
    pub const ELSE: u8 = 0x05;
    pub const END: u8 = 0x0B;
    pub const CALL: u8 = 0x10;

    pub const LOCAL_GET: u8 = 0x20;
    pub const GLOBAL_GET: u8 = 0x23;
    pub const GLOBAL_SET: u8 = 0x24;

    pub const I32_CONST: u8 = 0x41;
    pub const I64_CONST: u8 = 0x42;
    pub const F32_CONST: u8 = 0x43;
    pub const F64_CONST: u8 = 0x44;

    pub const I32_EQ: u8 = 0x46;
    pub const I32_NE: u8 = 0x47;
    pub const I32_LT_S: u8 = 0x48;
    pub const I32_GT_S: u8 = 0x4A;
    pub const I32_LE_S: u8 = 0x4C;
    pub const I32_GE_S: u8 = 0x4E;

    pub const F32_EQ: u8 = 0x5B;
    pub const F32_NE: u8 = 0x5C;
    pub const F32_LT: u8 = 0x5D;
    pub const F32_GT: u8 = 0x5E;
    pub const F32_LE: u8 = 0x5F;
    pub const F32_GE: u8 = 0x60;

    pub const I32_ADD: u8 = 0x6A;
    pub const I32_MUL: u8 = 0x6C;
    pub const F32_ADD: u8 = 0x92;
    pub const F32_MUL: u8 = 0x94;
}

// ── Imported function indices ────────────────────────────────────────────────
// (order must match the import registration in the compiler driver)

/// `setYaw(entity: i32, yaw: f32)`
pub const IMPORT_SET_YAW: u32 = 0;
/// `setPropertyFloat(entity: i32, property: i64, value: f32)`
pub const IMPORT_SET_PROPERTY_FLOAT: u32 = 1;
/// `getPropertyFloat(entity: i32, property: i64) -> f32`
pub const IMPORT_GET_PROPERTY_FLOAT: u32 = 2;

/// Field names of the host imports, in index order.
pub const HOST_IMPORTS: [&str; 3] = ["setYaw", "setPropertyFloat", "getPropertyFloat"];

// ── Global indices ───────────────────────────────────────────────────────────

/// The entity running the script.
pub const GLOBAL_SELF: u32 = 0;
/// Graph variable `i` lives in global `GLOBAL_USER + i`.
pub const GLOBAL_USER: u32 = 1;

// ── Entry points ─────────────────────────────────────────────────────────────

/// An exported function bound to the first node of `kind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryPoint {
    pub kind: NodeKind,
    pub name: &'static str,
    /// Event parameters, readable downstream as selectors `1..=len`.
    pub params: &'static [ValueType],
}

/// Every entry point, in export order.
pub static ENTRY_POINTS: [EntryPoint; 4] = [
    EntryPoint {
        kind: NodeKind::Update,
        name: "update",
        params: &[ValueType::Float],
    },
    EntryPoint {
        kind: NodeKind::MouseMove,
        name: "onMouseMove",
        params: &[ValueType::Float, ValueType::Float],
    },
    EntryPoint {
        kind: NodeKind::KeyInput,
        name: "onKeyEvent",
        params: &[ValueType::I32],
    },
    EntryPoint {
        kind: NodeKind::Start,
        name: "start",
        params: &[],
    },
];

pub fn entry_point(kind: NodeKind) -> Option<&'static EntryPoint> {
    ENTRY_POINTS.iter().find(|e| e.kind == kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_lowering() {
        assert_eq!(val_type(ValueType::Float), VAL_F32);
        assert_eq!(val_type(ValueType::U32), VAL_I32);
        assert_eq!(val_type(ValueType::I32), VAL_I32);
        assert_eq!(val_type(ValueType::Entity), VAL_I32);
    }

    #[test]
    fn test_every_entry_kind_has_an_entry_point() {
        for kind in NodeKind::ALL {
            let is_entry = kind.role() == vscript_graph::NodeRole::Entry;
            assert_eq!(entry_point(kind).is_some(), is_entry, "{kind:?}");
        }
    }

    #[test]
    fn test_magic_spells_asm() {
        assert_eq!(&WASM_MAGIC.to_le_bytes(), b"\0asm");
    }
}
