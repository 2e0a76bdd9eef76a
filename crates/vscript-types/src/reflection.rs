//! Reflection collaborator: the host engine's component registry.
//!
//! The compiler only consumes reflection as an opaque lookup. Graphs persist
//! a component by the [`ComponentHash`] of its name, and generated code
//! addresses a property by its [`PropertyHash`], so neither depends on the
//! registry's in-memory ordering.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Stable 32-bit hash of a component name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ComponentHash(pub u32);

impl ComponentHash {
    pub fn of(component: &str) -> Self {
        let digest = Sha256::digest(component.as_bytes());
        Self(u32::from_le_bytes([digest[0], digest[1], digest[2], digest[3]]))
    }
}

/// Stable 64-bit hash of a `component.property` pair, passed to the host
/// property accessors at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PropertyHash(pub u64);

impl PropertyHash {
    pub fn of(component: &str, property: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(component.as_bytes());
        hasher.update(b".");
        hasher.update(property.as_bytes());
        let digest = hasher.finalize();
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest[..8]);
        Self(u64::from_le_bytes(bytes))
    }
}

/// Registry-specific handle of a resolved component type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ComponentHandle(pub u32);

/// A reflected component function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionInfo {
    pub name: String,
    pub arg_count: u32,
}

/// A registered component with its float properties and functions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentInfo {
    pub handle: ComponentHandle,
    pub name: String,
    /// Names of the scalar float properties.
    pub properties: Vec<String>,
    pub functions: Vec<FunctionInfo>,
}

/// Lookup interface onto the host's reflection registry.
pub trait Reflection {
    /// Every registered component.
    fn components(&self) -> Vec<ComponentInfo>;

    fn component_by_hash(&self, hash: ComponentHash) -> Option<ComponentHandle>;

    fn component_by_name(&self, name: &str) -> Option<ComponentHandle> {
        self.component_by_hash(ComponentHash::of(name))
    }

    fn component_name(&self, handle: ComponentHandle) -> Option<&str>;

    /// Whether `handle` has a float property called `property`.
    fn has_property(&self, handle: ComponentHandle, property: &str) -> bool;

    /// Argument count of `function` on `handle`, if it exists.
    fn function_arg_count(&self, handle: ComponentHandle, function: &str) -> Option<u32>;

    fn property_hash(&self, handle: ComponentHandle, property: &str) -> Option<PropertyHash> {
        self.component_name(handle)
            .map(|component| PropertyHash::of(component, property))
    }
}

/// In-memory registry for hosts without a live engine, and for tests.
#[derive(Debug, Clone, Default)]
pub struct StaticRegistry {
    components: Vec<ComponentInfo>,
}

impl StaticRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a component with the given float properties.
    pub fn with_component(mut self, name: &str, properties: &[&str]) -> Self {
        let handle = ComponentHandle(self.components.len() as u32);
        self.components.push(ComponentInfo {
            handle,
            name: name.to_string(),
            properties: properties.iter().map(|p| p.to_string()).collect(),
            functions: Vec::new(),
        });
        self
    }

    /// Add a function to the most recently registered component.
    pub fn with_function(mut self, name: &str, arg_count: u32) -> Self {
        if let Some(last) = self.components.last_mut() {
            last.functions.push(FunctionInfo {
                name: name.to_string(),
                arg_count,
            });
        }
        self
    }

    fn info(&self, handle: ComponentHandle) -> Option<&ComponentInfo> {
        self.components.get(handle.0 as usize)
    }
}

impl Reflection for StaticRegistry {
    fn components(&self) -> Vec<ComponentInfo> {
        self.components.clone()
    }

    fn component_by_hash(&self, hash: ComponentHash) -> Option<ComponentHandle> {
        self.components
            .iter()
            .find(|c| ComponentHash::of(&c.name) == hash)
            .map(|c| c.handle)
    }

    fn component_name(&self, handle: ComponentHandle) -> Option<&str> {
        self.info(handle).map(|c| c.name.as_str())
    }

    fn has_property(&self, handle: ComponentHandle, property: &str) -> bool {
        self.info(handle)
            .is_some_and(|c| c.properties.iter().any(|p| p == property))
    }

    fn function_arg_count(&self, handle: ComponentHandle, function: &str) -> Option<u32> {
        self.info(handle)?
            .functions
            .iter()
            .find(|f| f.name == function)
            .map(|f| f.arg_count)
    }
}
