use serde::{Deserialize, Serialize};
use std::fmt;

/// Scalar type carried by a value pin or a graph variable.
///
/// Persisted as a `u32` tag. Only `Float` lowers to `f32`; the remaining
/// kinds all live in the `i32` family at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    U32,
    I32,
    Float,
    Entity,
}

impl ValueType {
    /// Every value type in tag order.
    pub const ALL: [ValueType; 4] = [Self::U32, Self::I32, Self::Float, Self::Entity];

    /// The persisted tag.
    pub fn tag(self) -> u32 {
        match self {
            Self::U32 => 0,
            Self::I32 => 1,
            Self::Float => 2,
            Self::Entity => 3,
        }
    }

    /// Decode a persisted tag.
    pub fn from_tag(tag: u32) -> Option<Self> {
        Self::ALL.get(tag as usize).copied()
    }

    /// Whether the value lowers to the float opcode family.
    pub fn is_float(self) -> bool {
        matches!(self, Self::Float)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::U32 => write!(f, "u32"),
            Self::I32 => write!(f, "i32"),
            Self::Float => write!(f, "float"),
            Self::Entity => write!(f, "entity"),
        }
    }
}
