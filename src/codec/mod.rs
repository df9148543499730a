//! Polymorphic scene codec
//!
//! Every component persists as a `{"type": tag, "properties": payload}`
//! node inside its object's `components` array; objects nest through
//! `children`. The payload is descriptor-driven for ordinary components
//! and the packed palette scalar for `TileMap`.
//!
//! Decode is two-phase: phase 1 walks the document in order, instantiates
//! and populates every component, and records key-sourced references;
//! phase 2 wires all reference fields once the whole tree exists. A
//! component that cannot be decoded is skipped and reported, never the
//! whole document.

mod resolve;
pub mod tilemap;
mod value;

pub use resolve::{resolve_references, PendingReference};

use serde_json::{Map, Value};

use crate::asset::AssetServer;
use crate::component::builtin::TileMap;
use crate::component::{Component, ComponentRegistry, RefSource, ResolutionNote};
use crate::error::CodecError;
use crate::scene::{KeyRegistry, ObjectId, Scene};

use value::{decode_value, encode_value, ValueError};

/// Per-component failures that were skipped during a load
///
/// The rest of the document loaded fine; these are for surfacing in
/// editor UI or logs rather than aborting.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub skipped: Vec<CodecError>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// Scene encoder/decoder bound to a registry and an asset server
pub struct SceneCodec<'a> {
    registry: &'a ComponentRegistry,
    assets: &'a AssetServer,
}

impl<'a> SceneCodec<'a> {
    pub fn new(registry: &'a ComponentRegistry, assets: &'a AssetServer) -> Self {
        Self { registry, assets }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Encode
    // ─────────────────────────────────────────────────────────────────────

    pub fn encode_scene(&self, scene: &Scene) -> Value {
        let mut doc = Map::new();
        doc.insert("name".to_string(), Value::String(scene.name.clone()));
        doc.insert(
            "objects".to_string(),
            Value::from(
                scene
                    .roots()
                    .iter()
                    .map(|&id| self.encode_object(scene, id))
                    .collect::<Vec<Value>>(),
            ),
        );
        Value::Object(doc)
    }

    fn encode_object(&self, scene: &Scene, id: ObjectId) -> Value {
        let object = scene.object(id);
        let mut node = Map::new();
        node.insert("name".to_string(), Value::String(object.name.clone()));

        let components: Vec<Value> = object
            .components()
            .iter()
            .map(|c| self.encode_component(c.as_ref()))
            .collect();
        if !components.is_empty() {
            node.insert("components".to_string(), Value::from(components));
        }

        let children: Vec<Value> = object
            .children()
            .iter()
            .map(|&child| self.encode_object(scene, child))
            .collect();
        if !children.is_empty() {
            node.insert("children".to_string(), Value::from(children));
        }
        Value::Object(node)
    }

    fn encode_component(&self, component: &dyn Component) -> Value {
        let mut node = Map::new();
        node.insert(
            "type".to_string(),
            Value::String(component.tag().to_string()),
        );

        // The grid payload is one packed scalar, so its key rides on the
        // envelope instead of inside the properties object.
        if let Some(map) = component.as_any().downcast_ref::<TileMap>() {
            if !component.key().is_empty() {
                node.insert("key".to_string(), Value::String(component.key().to_string()));
            }
            node.insert(
                "properties".to_string(),
                Value::String(tilemap::encode_packed(map)),
            );
            return Value::Object(node);
        }

        let descriptor = component.descriptor();
        let mut props = Map::new();
        if !component.key().is_empty() {
            props.insert("key".to_string(), Value::String(component.key().to_string()));
        }
        for field in descriptor.fields {
            if let Some(v) = component.field(field.name) {
                props.insert(field.name.to_string(), encode_value(&v));
            }
        }
        // Only key-sourced references persist; the rest are recomputed
        // from the tree on load.
        for reference in descriptor.references {
            if reference.source != RefSource::Key {
                continue;
            }
            let keys = component.ref_keys(reference.name);
            if keys.is_empty() {
                continue;
            }
            let v = if reference.is_list {
                Value::from(keys)
            } else {
                Value::String(keys.into_iter().next().unwrap_or_default())
            };
            props.insert(reference.name.to_string(), v);
        }

        node.insert("properties".to_string(), Value::Object(props));
        Value::Object(node)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Decode
    // ─────────────────────────────────────────────────────────────────────

    pub fn decode_scene(&self, doc: &Value) -> Result<(Scene, LoadReport), CodecError> {
        let root = doc
            .as_object()
            .ok_or_else(|| CodecError::Parse("document is not an object".to_string()))?;
        let name = root.get("name").and_then(|v| v.as_str()).unwrap_or("");

        let mut scene = Scene::new(name);
        let mut keys = KeyRegistry::new();
        let mut pending = Vec::new();
        let mut report = LoadReport::default();

        if let Some(objects) = root.get("objects") {
            let objects = objects
                .as_array()
                .ok_or_else(|| CodecError::Parse("'objects' is not an array".to_string()))?;
            for node in objects {
                self.decode_object(node, None, &mut scene, &mut keys, &mut pending, &mut report)?;
            }
        }

        resolve_references(&mut scene, pending, &keys);
        Ok((scene, report))
    }

    fn decode_object(
        &self,
        node: &Value,
        parent: Option<ObjectId>,
        scene: &mut Scene,
        keys: &mut KeyRegistry,
        pending: &mut Vec<PendingReference>,
        report: &mut LoadReport,
    ) -> Result<(), CodecError> {
        let node = node
            .as_object()
            .ok_or_else(|| CodecError::Parse("object node is not an object".to_string()))?;
        let name = node.get("name").and_then(|v| v.as_str()).unwrap_or("");
        let id = scene.spawn(name, parent);

        if let Some(components) = node.get("components").and_then(|v| v.as_array()) {
            for comp_node in components {
                match self.decode_component(comp_node, name) {
                    Ok((component, key_refs)) => {
                        let key = component.key().to_string();
                        let cid = scene.attach(id, component);
                        if !key.is_empty() {
                            keys.insert(key, cid);
                        }
                        for (field, field_keys) in key_refs {
                            pending.push(PendingReference {
                                component: cid,
                                field,
                                keys: field_keys,
                            });
                        }
                    }
                    Err(e) => {
                        log::error!("skipping component on '{}': {}", name, e);
                        report.skipped.push(e);
                    }
                }
            }
        }

        if let Some(children) = node.get("children").and_then(|v| v.as_array()) {
            for child in children {
                self.decode_object(child, Some(id), scene, keys, pending, report)?;
            }
        }
        Ok(())
    }

    /// Phase-1 decode of one component node.
    ///
    /// Returns the populated component plus its key-sourced reference
    /// keys; the caller attaches it and registers them.
    fn decode_component(
        &self,
        node: &Value,
        object_name: &str,
    ) -> Result<(Box<dyn Component>, Vec<(&'static str, Vec<String>)>), CodecError> {
        let node = node.as_object().ok_or_else(|| CodecError::MissingTypeTag {
            object: object_name.to_string(),
        })?;
        let tag = node
            .get("type")
            .and_then(|v| v.as_str())
            .ok_or_else(|| CodecError::MissingTypeTag {
                object: object_name.to_string(),
            })?;

        let resolution = self.registry.resolve(tag)?;
        match &resolution.note {
            Some(ResolutionNote::Migrated { from, to }) => {
                log::warn!("component type '{}' migrated to '{}'", from, to);
            }
            Some(ResolutionNote::SimpleName { requested, matched }) => {
                log::warn!(
                    "component type '{}' matched '{}' by simple name only",
                    requested,
                    matched
                );
            }
            None => {}
        }

        let mut component = (resolution.entry.factory)();
        let props = node.get("properties");

        if let Some(map) = component.as_any_mut().downcast_mut::<TileMap>() {
            match props {
                Some(Value::String(payload)) => tilemap::decode_packed(map, payload, self.assets)?,
                Some(doc @ Value::Object(_)) => tilemap::decode_legacy(map, doc, self.assets)?,
                Some(other) => {
                    return Err(CodecError::MalformedTilePayload {
                        component: resolution.tag().to_string(),
                        detail: format!("unexpected payload shape: {}", other),
                    })
                }
                None => {}
            }
            if let Some(key) = node.get("key").and_then(|v| v.as_str()) {
                component.set_key(key.to_string());
            }
            component.reset_transient();
            return Ok((component, Vec::new()));
        }

        let mut key_refs = Vec::new();
        if let Some(props) = props {
            let Some(props) = props.as_object() else {
                log::warn!(
                    "'{}' on '{}': properties is not an object; using defaults",
                    resolution.tag(),
                    object_name
                );
                component.reset_transient();
                return Ok((component, key_refs));
            };

            if let Some(key) = props.get("key").and_then(|v| v.as_str()) {
                component.set_key(key.to_string());
            }

            let descriptor = resolution.entry.descriptor;
            for field in descriptor.fields {
                let Some(raw) = props.get(field.name) else {
                    continue;
                };
                match decode_value(field.ty, field.is_list, raw, self.assets) {
                    Ok(v) => {
                        if let Err(e) = component.set_field(field.name, v) {
                            log::warn!(
                                "'{}.{}': {}; keeping default",
                                resolution.tag(),
                                field.name,
                                e
                            );
                        }
                    }
                    Err(ValueError::Asset(e)) => {
                        log::warn!(
                            "'{}.{}': {}; keeping default",
                            resolution.tag(),
                            field.name,
                            e
                        );
                    }
                    Err(ValueError::Mismatch(detail)) => {
                        let e = CodecError::FieldDecodeError {
                            component: resolution.tag().to_string(),
                            field: field.name.to_string(),
                            detail,
                        };
                        log::warn!("{}; keeping default", e);
                    }
                }
            }

            for reference in descriptor.references {
                if reference.source != RefSource::Key {
                    continue;
                }
                let field_keys = match props.get(reference.name) {
                    Some(Value::String(s)) => vec![s.clone()],
                    Some(Value::Array(items)) => items
                        .iter()
                        .filter_map(|v| v.as_str().map(str::to_string))
                        .collect(),
                    Some(other) => {
                        log::warn!(
                            "'{}.{}': expected key string(s), got {}; keeping default",
                            resolution.tag(),
                            reference.name,
                            other
                        );
                        Vec::new()
                    }
                    None => Vec::new(),
                };
                if !field_keys.is_empty() {
                    component.set_ref_keys(reference.name, field_keys.clone());
                    key_refs.push((reference.name, field_keys));
                }
            }
        }

        // Runtime-only state never survives a load, whatever the document
        // claims.
        component.reset_transient();
        Ok((component, key_refs))
    }
}

/// Wire reference fields of a scene built in memory, without a document.
///
/// Equivalent to the phase 2 a decode performs: key-sourced fields are
/// looked up from the components' own persisted keys.
pub fn resolve_scene(scene: &mut Scene) {
    let keys = scene.rebuild_key_registry();
    let mut pending = Vec::new();
    for object in scene.objects_depth_first() {
        for (id, component) in scene.components_of(object) {
            for reference in component.descriptor().references {
                if reference.source != RefSource::Key {
                    continue;
                }
                let ref_keys = component.ref_keys(reference.name);
                if !ref_keys.is_empty() {
                    pending.push(PendingReference {
                        component: id,
                        field: reference.name,
                        keys: ref_keys,
                    });
                }
            }
        }
    }
    resolve_references(scene, pending, &keys);
}
