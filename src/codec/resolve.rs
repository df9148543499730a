//! Phase-2 reference resolution
//!
//! Runs after the whole object tree exists. Hierarchy-sourced references
//! (self, parent, children, recursive) are recomputed from the live tree;
//! key-sourced references look persisted key strings up in the scene-wide
//! registry. All assignments are collected first and applied in one sweep,
//! so no component observes a half-wired scene.

use crate::component::RefSource;
use crate::scene::{ComponentId, KeyRegistry, ObjectId, Scene};

/// A key-sourced reference recorded during phase 1, waiting for the
/// registry to be complete
pub struct PendingReference {
    pub component: ComponentId,
    pub field: &'static str,
    pub keys: Vec<String>,
}

/// Wire every reference field in the scene
pub fn resolve_references(scene: &mut Scene, pending: Vec<PendingReference>, keys: &KeyRegistry) {
    let mut assignments: Vec<(ComponentId, &'static str, Vec<ComponentId>)> = Vec::new();

    for object in scene.objects_depth_first() {
        for (id, component) in scene.components_of(object) {
            for reference in component.descriptor().references {
                if reference.source == RefSource::Key {
                    continue;
                }
                let targets = hierarchy_targets(
                    scene,
                    object,
                    reference.source,
                    reference.target_tag,
                    reference.is_list,
                );
                if targets.is_empty() && reference.required {
                    log::warn!(
                        "{} '{}.{}': no {} found via {:?}",
                        scene.object(object).name,
                        component.tag(),
                        reference.name,
                        reference.target_tag,
                        reference.source,
                    );
                }
                assignments.push((id, reference.name, targets));
            }
        }
    }

    for p in pending {
        let component = scene.component(p.component);
        let Some(reference) = component.descriptor().reference(p.field) else {
            continue;
        };
        let targets = if reference.is_list {
            // Every instance under every key, key order then document order.
            let mut out = Vec::new();
            for key in &p.keys {
                if let Some(ids) = keys.get(key) {
                    out.extend_from_slice(ids);
                } else {
                    log::warn!(
                        "'{}.{}': key '{}' not registered",
                        component.tag(),
                        reference.name,
                        key
                    );
                }
            }
            out
        } else {
            // First instance of the first key that resolves.
            match p.keys.iter().find_map(|key| keys.first(key)) {
                Some(id) => vec![id],
                None => Vec::new(),
            }
        };
        if targets.is_empty() && reference.required && !p.keys.is_empty() {
            log::warn!(
                "'{}.{}': none of the keys {:?} resolved",
                component.tag(),
                reference.name,
                p.keys
            );
        }
        assignments.push((p.component, reference.name, targets));
    }

    for (id, field, targets) in assignments {
        scene.component_mut(id).set_refs(field, targets);
    }
}

fn hierarchy_targets(
    scene: &Scene,
    object: ObjectId,
    source: RefSource,
    target_tag: &str,
    is_list: bool,
) -> Vec<ComponentId> {
    match source {
        RefSource::SelfObject => collect(scene, [object].into_iter(), target_tag, is_list),
        RefSource::Parent => {
            let mut current = scene.object(object).parent();
            while let Some(ancestor) = current {
                if let Some(id) = scene.find_on_object(ancestor, target_tag) {
                    return vec![id];
                }
                current = scene.object(ancestor).parent();
            }
            Vec::new()
        }
        RefSource::Children => collect(
            scene,
            scene.object(object).children().iter().copied(),
            target_tag,
            is_list,
        ),
        RefSource::ChildrenRecursive => collect(
            scene,
            scene.descendants_depth_first(object).into_iter(),
            target_tag,
            is_list,
        ),
        RefSource::Key => Vec::new(),
    }
}

fn collect(
    scene: &Scene,
    objects: impl Iterator<Item = ObjectId>,
    target_tag: &str,
    is_list: bool,
) -> Vec<ComponentId> {
    let mut out = Vec::new();
    for object in objects {
        for (id, component) in scene.components_of(object) {
            if component.tag() == target_tag {
                out.push(id);
                if !is_list {
                    return out;
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::builtin::{
        Animator, DialogueBox, HealthBar, Minimap, Npc, SpriteRenderer, TileMap, Transform,
    };

    #[test]
    fn test_self_reference_finds_sibling_component() {
        let mut scene = Scene::new("test");
        let obj = scene.spawn("player", None);
        let renderer = scene.attach(obj, Box::new(SpriteRenderer::default()));
        let animator = scene.attach(obj, Box::new(Animator::default()));

        let keys = scene.rebuild_key_registry();
        resolve_references(&mut scene, Vec::new(), &keys);

        assert_eq!(scene.get::<Animator>(animator).unwrap().renderer, Some(renderer));
    }

    #[test]
    fn test_parent_reference_walks_ancestors() {
        let mut scene = Scene::new("test");
        let npc_obj = scene.spawn("npc", None);
        let npc = scene.attach(npc_obj, Box::new(Npc::default()));
        let mid = scene.spawn("anchor", Some(npc_obj));
        let bar_obj = scene.spawn("bar", Some(mid));
        let bar = scene.attach(bar_obj, Box::new(HealthBar::default()));

        let keys = scene.rebuild_key_registry();
        resolve_references(&mut scene, Vec::new(), &keys);

        // The Npc is two levels up; the walk skips the empty middle object.
        assert_eq!(scene.get::<HealthBar>(bar).unwrap().owner, Some(npc));
    }

    #[test]
    fn test_children_reference_takes_first_direct_child_match() {
        let mut scene = Scene::new("test");
        let box_obj = scene.spawn("dialogue", None);
        let dialogue = scene.attach(box_obj, Box::new(DialogueBox::default()));
        let text_a = scene.spawn("text_a", Some(box_obj));
        let first = scene.attach(text_a, Box::new(SpriteRenderer::default()));
        let text_b = scene.spawn("text_b", Some(box_obj));
        scene.attach(text_b, Box::new(SpriteRenderer::default()));

        let keys = scene.rebuild_key_registry();
        resolve_references(&mut scene, Vec::new(), &keys);

        assert_eq!(
            scene.get::<DialogueBox>(dialogue).unwrap().text_renderer,
            Some(first)
        );
    }

    #[test]
    fn test_recursive_reference_searches_descendants_only() {
        let mut scene = Scene::new("test");
        // A map at the root should NOT be found by a minimap below it.
        let root = scene.spawn("root", None);
        scene.attach(root, Box::new(TileMap::default()));

        let ui = scene.spawn("ui", Some(root));
        let minimap = scene.attach(ui, Box::new(Minimap::default()));
        let world = scene.spawn("world", Some(ui));
        let inner = scene.spawn("inner", Some(world));
        let map = scene.attach(inner, Box::new(TileMap::default()));

        let keys = scene.rebuild_key_registry();
        resolve_references(&mut scene, Vec::new(), &keys);

        assert_eq!(scene.get::<Minimap>(minimap).unwrap().map, Some(map));
    }

    #[test]
    fn test_required_miss_leaves_field_unset() {
        let mut scene = Scene::new("test");
        let obj = scene.spawn("lonely", None);
        let animator = scene.attach(obj, Box::new(Animator::default()));

        let keys = scene.rebuild_key_registry();
        resolve_references(&mut scene, Vec::new(), &keys);

        assert_eq!(scene.get::<Animator>(animator).unwrap().renderer, None);
    }

    #[test]
    fn test_key_reference_takes_first_registered_instance() {
        let mut scene = Scene::new("test");
        let a = scene.spawn("a", None);
        let mut first_box = DialogueBox::default();
        first_box.key = "main_box".to_string();
        let first = scene.attach(a, Box::new(first_box));
        let b = scene.spawn("b", None);
        let mut second_box = DialogueBox::default();
        second_box.key = "main_box".to_string();
        scene.attach(b, Box::new(second_box));

        let npc_obj = scene.spawn("npc", None);
        let npc = scene.attach(npc_obj, Box::new(Npc::default()));

        let keys = scene.rebuild_key_registry();
        let pending = vec![PendingReference {
            component: npc,
            field: "dialogue_box",
            keys: vec!["main_box".to_string()],
        }];
        resolve_references(&mut scene, pending, &keys);

        assert_eq!(scene.get::<Npc>(npc).unwrap().dialogue_box, Some(first));
    }

    #[test]
    fn test_key_list_reference_collects_all_matches() {
        let mut scene = Scene::new("test");
        let world = scene.spawn("world", None);
        let mut t1 = Transform::default();
        t1.key = "poi".to_string();
        let p1 = scene.attach(world, Box::new(t1));
        let obj2 = scene.spawn("shrine", Some(world));
        let mut t2 = Transform::default();
        t2.key = "poi".to_string();
        let p2 = scene.attach(obj2, Box::new(t2));
        let obj3 = scene.spawn("exit", Some(world));
        let mut t3 = Transform::default();
        t3.key = "exit".to_string();
        let p3 = scene.attach(obj3, Box::new(t3));

        let ui = scene.spawn("ui", None);
        let minimap = scene.attach(ui, Box::new(Minimap::default()));

        let keys = scene.rebuild_key_registry();
        let pending = vec![PendingReference {
            component: minimap,
            field: "markers",
            keys: vec!["poi".to_string(), "ghost".to_string(), "exit".to_string()],
        }];
        resolve_references(&mut scene, pending, &keys);

        // Unresolved keys are skipped, resolved ones keep key order.
        assert_eq!(
            scene.get::<Minimap>(minimap).unwrap().markers,
            vec![p1, p2, p3]
        );
    }
}
