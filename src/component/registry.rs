//! Component type registry and tag resolution
//!
//! "Component type" is a closed, registered set: a descriptor plus a
//! factory per type, keyed by canonical tag. Renamed or moved types stay
//! loadable through a migration table (`old tag → new tag`) and, failing
//! that, a unique-simple-name fallback. Both fallbacks succeed with a
//! warning so tooling can offer a one-time rewrite of the data.

use std::collections::HashMap;

use crate::error::CodecError;

use super::builtin;
use super::descriptor::{simple_name, ComponentTypeDescriptor};
use super::Component;

/// A registered component type: its descriptor and how to construct one
#[derive(Debug)]
pub struct RegisteredType {
    pub descriptor: &'static ComponentTypeDescriptor,
    pub factory: fn() -> Box<dyn Component>,
}

/// How a tag was resolved, for warnings and error context
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionNote {
    /// The tag went through the migration table
    Migrated { from: String, to: String },
    /// The tag matched a registered type by simple name only
    SimpleName { requested: String, matched: String },
}

/// A successful tag resolution
#[derive(Debug)]
pub struct Resolution<'a> {
    pub entry: &'a RegisteredType,
    /// Present when resolution used a fallback; the codec logs it
    pub note: Option<ResolutionNote>,
}

impl Resolution<'_> {
    pub fn tag(&self) -> &'static str {
        self.entry.descriptor.tag
    }
}

/// Registry of every component type a document may contain
///
/// Built at startup and read-only afterwards; share it freely across
/// threads. The codec takes it by reference rather than reaching for a
/// global, but [`builtin_registry`] provides a ready-made one carrying
/// the stock set.
#[derive(Default)]
pub struct ComponentRegistry {
    types: HashMap<&'static str, RegisteredType>,
    migrations: HashMap<String, String>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a component type under its canonical tag.
    ///
    /// Registering the same tag twice keeps the later entry.
    pub fn register(
        &mut self,
        descriptor: &'static ComponentTypeDescriptor,
        factory: fn() -> Box<dyn Component>,
    ) {
        self.types
            .insert(descriptor.tag, RegisteredType { descriptor, factory });
    }

    /// Record that documents may still carry `old_tag` for the type now
    /// registered as `new_tag`
    pub fn add_migration(&mut self, old_tag: impl Into<String>, new_tag: impl Into<String>) {
        self.migrations.insert(old_tag.into(), new_tag.into());
    }

    pub fn get(&self, tag: &str) -> Option<&RegisteredType> {
        self.types.get(tag)
    }

    /// All registered canonical tags
    pub fn tags(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.types.keys().copied()
    }

    /// Resolve a persisted type tag to a registered type.
    ///
    /// Resolution order, first match wins:
    /// 1. Exact tag match.
    /// 2. Migration table; the mapped tag must itself be registered.
    /// 3. Unique simple-name match among registered tags.
    ///
    /// Failure is fatal for the one component being decoded, not for the
    /// whole document.
    pub fn resolve(&self, tag: &str) -> Result<Resolution<'_>, CodecError> {
        if let Some(entry) = self.types.get(tag) {
            return Ok(Resolution { entry, note: None });
        }

        let mut attempted_migration = None;
        if let Some(new_tag) = self.migrations.get(tag) {
            if let Some(entry) = self.types.get(new_tag.as_str()) {
                return Ok(Resolution {
                    entry,
                    note: Some(ResolutionNote::Migrated {
                        from: tag.to_string(),
                        to: new_tag.clone(),
                    }),
                });
            }
            attempted_migration = Some(new_tag.clone());
        }

        let wanted = simple_name(tag);
        let candidates: Vec<&RegisteredType> = self
            .types
            .values()
            .filter(|t| t.descriptor.simple_name() == wanted)
            .collect();
        match candidates.as_slice() {
            [entry] => Ok(Resolution {
                entry,
                note: Some(ResolutionNote::SimpleName {
                    requested: tag.to_string(),
                    matched: entry.descriptor.tag.to_string(),
                }),
            }),
            [] => Err(CodecError::UnknownTypeTag {
                tag: tag.to_string(),
                migrated: attempted_migration,
                candidates: Vec::new(),
            }),
            many => {
                let mut matches: Vec<String> =
                    many.iter().map(|t| t.descriptor.tag.to_string()).collect();
                matches.sort();
                Err(CodecError::AmbiguousTypeTag {
                    tag: tag.to_string(),
                    matches,
                })
            }
        }
    }
}

/// Build a registry carrying the stock component set
pub fn with_builtin_components() -> ComponentRegistry {
    let mut registry = ComponentRegistry::new();
    registry.register(&builtin::TRANSFORM, || {
        Box::new(builtin::Transform::default())
    });
    registry.register(&builtin::SPRITE_RENDERER, || {
        Box::new(builtin::SpriteRenderer::default())
    });
    registry.register(&builtin::ANIMATOR, || Box::new(builtin::Animator::default()));
    registry.register(&builtin::COLLIDER, || Box::new(builtin::Collider::default()));
    registry.register(&builtin::TILE_MAP, || Box::new(builtin::TileMap::default()));
    registry.register(&builtin::NPC, || Box::new(builtin::Npc::default()));
    registry.register(&builtin::DIALOGUE_BOX, || {
        Box::new(builtin::DialogueBox::default())
    });
    registry.register(&builtin::HEALTH_BAR, || {
        Box::new(builtin::HealthBar::default())
    });
    registry.register(&builtin::MINIMAP, || Box::new(builtin::Minimap::default()));
    registry
}

lazy_static::lazy_static! {
    static ref BUILTIN: ComponentRegistry = with_builtin_components();
}

/// The shared registry of stock components
pub fn builtin_registry() -> &'static ComponentRegistry {
    &BUILTIN
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::builtin::{NPC_TAG, TRANSFORM_TAG};

    #[test]
    fn test_exact_match_has_no_note() {
        let registry = with_builtin_components();
        let res = registry.resolve(TRANSFORM_TAG).unwrap();
        assert_eq!(res.tag(), TRANSFORM_TAG);
        assert!(res.note.is_none());
    }

    #[test]
    fn test_migration_resolves_with_note() {
        let mut registry = with_builtin_components();
        registry.add_migration("old.pkg.Npc", NPC_TAG);

        let res = registry.resolve("old.pkg.Npc").unwrap();
        assert_eq!(res.tag(), NPC_TAG);
        assert_eq!(
            res.note,
            Some(ResolutionNote::Migrated {
                from: "old.pkg.Npc".to_string(),
                to: NPC_TAG.to_string(),
            })
        );
    }

    #[test]
    fn test_simple_name_fallback() {
        let registry = with_builtin_components();
        // No migration registered: falls through to the simple name.
        let res = registry.resolve("legacy.components.Npc").unwrap();
        assert_eq!(res.tag(), NPC_TAG);
        assert!(matches!(res.note, Some(ResolutionNote::SimpleName { .. })));
    }

    #[test]
    fn test_unknown_tag_reports_attempted_migration() {
        let mut registry = with_builtin_components();
        registry.add_migration("old.pkg.Gone", "new.pkg.AlsoGone");

        let err = registry.resolve("old.pkg.Gone").unwrap_err();
        match err {
            CodecError::UnknownTypeTag { tag, migrated, .. } => {
                assert_eq!(tag, "old.pkg.Gone");
                assert_eq!(migrated.as_deref(), Some("new.pkg.AlsoGone"));
            }
            other => panic!("expected UnknownTypeTag, got {}", other),
        }
    }

    #[test]
    fn test_ambiguous_simple_name() {
        static OTHER_NPC: ComponentTypeDescriptor = ComponentTypeDescriptor {
            tag: "mods.town.Npc",
            fields: &[],
            references: &[],
        };
        let mut registry = with_builtin_components();
        registry.register(&OTHER_NPC, || Box::new(crate::component::builtin::Npc::default()));

        let err = registry.resolve("somewhere.else.Npc").unwrap_err();
        match err {
            CodecError::AmbiguousTypeTag { matches, .. } => {
                assert_eq!(matches.len(), 2);
                assert!(matches.contains(&NPC_TAG.to_string()));
                assert!(matches.contains(&"mods.town.Npc".to_string()));
            }
            other => panic!("expected AmbiguousTypeTag, got {}", other),
        }
    }

    #[test]
    fn test_builtin_registry_is_shared() {
        assert!(builtin_registry().get(TRANSFORM_TAG).is_some());
    }
}
