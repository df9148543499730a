//! Component model
//!
//! Components are the unit of polymorphic serialization: a scene object
//! carries a list of `Box<dyn Component>` behind one trait, and the codec
//! drives encode/decode entirely from each type's descriptor table —
//! no runtime introspection on the hot path.
//!
//! Every component also carries a `key` (the componentKey): a scene-wide
//! identifier other components can target with KEY-sourced references.

pub mod builtin;
mod descriptor;
mod registry;

pub use descriptor::{
    ComponentTypeDescriptor, FieldDescriptor, FieldType, RefSource, ReferenceFieldDescriptor,
};
pub use registry::{
    builtin_registry, with_builtin_components, ComponentRegistry, RegisteredType, Resolution,
    ResolutionNote,
};

use std::any::Any;

use crate::asset::AssetHandle;
use crate::scene::ComponentId;

/// A field value in transit between a component and the document tree
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Vec2([f32; 2]),
    Color([f32; 4]),
    Asset(AssetHandle),
    List(Vec<FieldValue>),
}

/// Why a `set_field` call was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    /// The component has no persisted field with that name
    Unknown,
    /// The value's variant does not match the field's declared type
    Mismatch { expected: &'static str },
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldError::Unknown => write!(f, "unknown field"),
            FieldError::Mismatch { expected } => write!(f, "expected {}", expected),
        }
    }
}

impl FieldValue {
    pub fn expect_bool(self) -> Result<bool, FieldError> {
        match self {
            FieldValue::Bool(b) => Ok(b),
            _ => Err(FieldError::Mismatch { expected: "bool" }),
        }
    }

    pub fn expect_int(self) -> Result<i64, FieldError> {
        match self {
            FieldValue::Int(i) => Ok(i),
            _ => Err(FieldError::Mismatch { expected: "int" }),
        }
    }

    pub fn expect_float(self) -> Result<f64, FieldError> {
        match self {
            FieldValue::Float(x) => Ok(x),
            FieldValue::Int(i) => Ok(i as f64),
            _ => Err(FieldError::Mismatch { expected: "float" }),
        }
    }

    pub fn expect_str(self) -> Result<String, FieldError> {
        match self {
            FieldValue::Str(s) => Ok(s),
            _ => Err(FieldError::Mismatch { expected: "string" }),
        }
    }

    pub fn expect_vec2(self) -> Result<[f32; 2], FieldError> {
        match self {
            FieldValue::Vec2(v) => Ok(v),
            _ => Err(FieldError::Mismatch { expected: "vec2" }),
        }
    }

    pub fn expect_color(self) -> Result<[f32; 4], FieldError> {
        match self {
            FieldValue::Color(c) => Ok(c),
            _ => Err(FieldError::Mismatch { expected: "color" }),
        }
    }

    pub fn expect_asset(self) -> Result<AssetHandle, FieldError> {
        match self {
            FieldValue::Asset(h) => Ok(h),
            _ => Err(FieldError::Mismatch { expected: "asset" }),
        }
    }

    pub fn expect_list(self) -> Result<Vec<FieldValue>, FieldError> {
        match self {
            FieldValue::List(items) => Ok(items),
            _ => Err(FieldError::Mismatch { expected: "list" }),
        }
    }
}

/// A runtime behavior/data unit attached to a scene object
///
/// Implementations are plain structs; `field`/`set_field` dispatch by name
/// over exactly the fields listed in the descriptor table. Reference
/// fields are not reachable through `field`/`set_field` — they go through
/// `ref_keys`/`set_ref_keys` (KEY sources) and `set_refs` (phase-2 wiring).
pub trait Component: Any + Send {
    /// The descriptor table for this concrete type
    fn descriptor(&self) -> &'static ComponentTypeDescriptor;

    /// The componentKey; empty means "not addressable by key"
    fn key(&self) -> &str;

    fn set_key(&mut self, key: String);

    /// Read a persisted field. None means the field is unset and should be
    /// omitted from the document.
    fn field(&self, name: &str) -> Option<FieldValue>;

    /// Write a persisted field decoded from a document
    fn set_field(&mut self, name: &str, value: FieldValue) -> Result<(), FieldError>;

    /// Lookup keys currently held by a KEY-sourced reference field
    fn ref_keys(&self, _field: &str) -> Vec<String> {
        Vec::new()
    }

    /// Store the lookup key(s) for a KEY-sourced reference field
    fn set_ref_keys(&mut self, _field: &str, _keys: Vec<String>) {}

    /// Assign the resolved target(s) of a reference field (phase 2)
    fn set_refs(&mut self, _field: &str, _targets: Vec<ComponentId>) {}

    /// Reset runtime-only fields to their fresh-instance defaults.
    ///
    /// Runs at the end of decode phase 1, so derived state is never
    /// trusted from a document even if one accidentally carries it.
    fn reset_transient(&mut self) {}

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl dyn Component {
    /// The canonical type tag
    pub fn tag(&self) -> &'static str {
        self.descriptor().tag
    }

    pub fn downcast_ref<T: Component>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    pub fn downcast_mut<T: Component>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }
}
