//! Descriptor tables
//!
//! One `ComponentTypeDescriptor` per concrete component type, built as a
//! `static` at registration time and immutable thereafter. The codec
//! consumes these tables to decide generic vs. asset vs. reference
//! handling per field; it never inspects component structs directly.

use crate::asset::AssetKind;

/// Declared type of a persisted field (the element type for list fields)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Bool,
    Int,
    Float,
    Str,
    Vec2,
    Color,
    /// An asset reference of the given kind
    Asset(AssetKind),
}

/// One persisted field of a component type
#[derive(Debug, Clone, Copy)]
pub struct FieldDescriptor {
    pub name: &'static str,
    /// Declared value type; the element type when `is_list` is set
    pub ty: FieldType,
    pub is_list: bool,
}

impl FieldDescriptor {
    pub const fn scalar(name: &'static str, ty: FieldType) -> Self {
        FieldDescriptor {
            name,
            ty,
            is_list: false,
        }
    }

    pub const fn list(name: &'static str, element: FieldType) -> Self {
        FieldDescriptor {
            name,
            ty: element,
            is_list: true,
        }
    }
}

/// Where a component-to-component reference gets its value
///
/// Everything except `Key` is a pure runtime derivation: recomputed from
/// the live object tree on every load and never present in the persisted
/// form. `Key` fields persist the lookup key string(s) only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefSource {
    /// First component of the target type on the same object
    SelfObject,
    /// First match walking owner-chain ancestors outward
    Parent,
    /// First match among direct children, in child-list order
    Children,
    /// First match in a depth-first walk of all descendants
    ChildrenRecursive,
    /// Looked up in the scene-wide key registry after the tree is built
    Key,
}

/// One reference field of a component type
#[derive(Debug, Clone, Copy)]
pub struct ReferenceFieldDescriptor {
    pub name: &'static str,
    /// Type tag of the referenced component type
    pub target_tag: &'static str,
    pub source: RefSource,
    /// A miss on a required reference is warned about, never fatal
    pub required: bool,
    pub is_list: bool,
}

/// Everything the codec knows about one concrete component type
#[derive(Debug)]
pub struct ComponentTypeDescriptor {
    /// Canonical type tag, stable across renames only via the migration table
    pub tag: &'static str,
    /// Persisted fields, in document order
    pub fields: &'static [FieldDescriptor],
    pub references: &'static [ReferenceFieldDescriptor],
}

impl ComponentTypeDescriptor {
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn reference(&self, name: &str) -> Option<&ReferenceFieldDescriptor> {
        self.references.iter().find(|r| r.name == name)
    }

    /// The trailing simple name of the tag (after the final `.` or `/`)
    pub fn simple_name(&self) -> &'static str {
        simple_name(self.tag)
    }
}

/// Strip a tag to its trailing simple name
pub(crate) fn simple_name(tag: &str) -> &str {
    tag.rsplit(['.', '/']).next().unwrap_or(tag)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_name() {
        assert_eq!(simple_name("game.render.SpriteRenderer"), "SpriteRenderer");
        assert_eq!(simple_name("ui/HealthBar"), "HealthBar");
        assert_eq!(simple_name("Bare"), "Bare");
    }
}
