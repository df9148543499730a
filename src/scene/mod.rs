//! Scene arena
//!
//! A scene owns its game objects in a flat `Vec`, addressed by `ObjectId`;
//! the tree shape lives in per-object parent/children links. Components
//! are addressed by `ComponentId` (object + slot), which is what reference
//! fields store after phase-2 resolution — never raw pointers.

mod file;

pub use file::{load_scene, parse_scene_bytes, save_scene, serialize_scene};

use std::collections::HashMap;

use crate::component::Component;

/// Index of a game object within its scene
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId(pub(crate) u32);

impl ObjectId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Address of one component: which object, and which slot on it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComponentId {
    pub object: ObjectId,
    pub slot: u16,
}

/// A node in the scene tree: a name, a place in the hierarchy, and a list
/// of attached components
pub struct GameObject {
    pub name: String,
    parent: Option<ObjectId>,
    children: Vec<ObjectId>,
    components: Vec<Box<dyn Component>>,
}

impl GameObject {
    fn new(name: String, parent: Option<ObjectId>) -> Self {
        Self {
            name,
            parent,
            children: Vec::new(),
            components: Vec::new(),
        }
    }

    pub fn parent(&self) -> Option<ObjectId> {
        self.parent
    }

    /// Direct children, in child-list order
    pub fn children(&self) -> &[ObjectId] {
        &self.children
    }

    pub fn components(&self) -> &[Box<dyn Component>] {
        &self.components
    }
}

/// The runtime object graph the codec persists and reconstructs
pub struct Scene {
    pub name: String,
    objects: Vec<GameObject>,
    roots: Vec<ObjectId>,
}

impl Scene {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            objects: Vec::new(),
            roots: Vec::new(),
        }
    }

    /// Create an object, attached under `parent` or as a root
    pub fn spawn(&mut self, name: impl Into<String>, parent: Option<ObjectId>) -> ObjectId {
        let id = ObjectId(self.objects.len() as u32);
        self.objects.push(GameObject::new(name.into(), parent));
        match parent {
            Some(p) => self.objects[p.index()].children.push(id),
            None => self.roots.push(id),
        }
        id
    }

    /// Attach a component to an object, returning its address
    pub fn attach(&mut self, object: ObjectId, component: Box<dyn Component>) -> ComponentId {
        let obj = &mut self.objects[object.index()];
        let slot = obj.components.len() as u16;
        obj.components.push(component);
        ComponentId { object, slot }
    }

    pub fn object(&self, id: ObjectId) -> &GameObject {
        &self.objects[id.index()]
    }

    pub fn object_mut(&mut self, id: ObjectId) -> &mut GameObject {
        &mut self.objects[id.index()]
    }

    pub fn roots(&self) -> &[ObjectId] {
        &self.roots
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn component(&self, id: ComponentId) -> &dyn Component {
        self.objects[id.object.index()].components[id.slot as usize].as_ref()
    }

    pub fn component_mut(&mut self, id: ComponentId) -> &mut Box<dyn Component> {
        &mut self.objects[id.object.index()].components[id.slot as usize]
    }

    /// Typed component access
    pub fn get<T: Component>(&self, id: ComponentId) -> Option<&T> {
        self.component(id).downcast_ref::<T>()
    }

    pub fn get_mut<T: Component>(&mut self, id: ComponentId) -> Option<&mut T> {
        self.component_mut(id).downcast_mut::<T>()
    }

    /// All components on one object, with their addresses
    pub fn components_of(
        &self,
        object: ObjectId,
    ) -> impl Iterator<Item = (ComponentId, &dyn Component)> {
        self.objects[object.index()]
            .components
            .iter()
            .enumerate()
            .map(move |(slot, c)| {
                (
                    ComponentId {
                        object,
                        slot: slot as u16,
                    },
                    c.as_ref(),
                )
            })
    }

    /// First component of the given type tag on one object
    pub fn find_on_object(&self, object: ObjectId, tag: &str) -> Option<ComponentId> {
        self.components_of(object)
            .find(|(_, c)| c.tag() == tag)
            .map(|(id, _)| id)
    }

    /// Every object id, roots first, depth-first through the tree
    pub fn objects_depth_first(&self) -> Vec<ObjectId> {
        let mut out = Vec::with_capacity(self.objects.len());
        let mut stack: Vec<ObjectId> = self.roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            for child in self.object(id).children().iter().rev() {
                stack.push(*child);
            }
        }
        out
    }

    /// All descendants of an object, depth-first
    pub fn descendants_depth_first(&self, object: ObjectId) -> Vec<ObjectId> {
        let mut out = Vec::new();
        let mut stack: Vec<ObjectId> = self.object(object).children().iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            for child in self.object(id).children().iter().rev() {
                stack.push(*child);
            }
        }
        out
    }

    /// Rebuild the key registry from the live tree, in depth-first order.
    ///
    /// Decode populates its registry as components are instantiated; this
    /// produces the equivalent for a scene built in memory.
    pub fn rebuild_key_registry(&self) -> KeyRegistry {
        let mut keys = KeyRegistry::new();
        for object in self.objects_depth_first() {
            for (id, component) in self.components_of(object) {
                if !component.key().is_empty() {
                    keys.insert(component.key().to_string(), id);
                }
            }
        }
        keys
    }
}

impl std::fmt::Debug for Scene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scene")
            .field("name", &self.name)
            .field("objects", &self.objects.len())
            .field("roots", &self.roots.len())
            .finish()
    }
}

/// Scene-wide mapping from componentKey to component instances
///
/// A multimap: several components may share a key. Single-valued KEY
/// reference fields take the first instance registered under the key
/// (document order); list-valued fields take all of them.
#[derive(Debug, Default)]
pub struct KeyRegistry {
    map: HashMap<String, Vec<ComponentId>>,
}

impl KeyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: String, id: ComponentId) {
        self.map.entry(key).or_default().push(id);
    }

    pub fn get(&self, key: &str) -> Option<&[ComponentId]> {
        self.map.get(key).map(|v| v.as_slice())
    }

    pub fn first(&self, key: &str) -> Option<ComponentId> {
        self.map.get(key).and_then(|v| v.first().copied())
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
