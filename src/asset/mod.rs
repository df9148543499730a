//! Asset references
//!
//! Fields that point at externally managed resources (textures, sprites,
//! dialogues) serialize as stable path strings, never as inline data —
//! unless the value is untracked (has no path), in which case its data is
//! embedded directly. The wire form for a tracked asset is
//! `"<kind-tag>:<path>"`, e.g. `"sprite:sprites/player.png#3"`; the `#3`
//! sub-index belongs to the asset system, not this codec.

mod server;

pub use server::{AssetLoader, AssetServer, MemoryAssets};

use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Delimiter between the kind tag and the path in the wire form
pub const ASSET_DELIMITER: char = ':';

/// The closed set of asset kinds the codec knows how to reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    Texture,
    Sprite,
    Dialogue,
}

impl AssetKind {
    /// Stable tag used in the wire form and the cache key
    pub fn tag(self) -> &'static str {
        match self {
            AssetKind::Texture => "texture",
            AssetKind::Sprite => "sprite",
            AssetKind::Dialogue => "dialogue",
        }
    }

    /// Inverse of [`tag`](Self::tag)
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "texture" => Some(AssetKind::Texture),
            "sprite" => Some(AssetKind::Sprite),
            "dialogue" => Some(AssetKind::Dialogue),
            _ => None,
        }
    }
}

/// The data behind an asset reference
///
/// Deliberately minimal: the codec only needs enough structure to embed an
/// untracked asset inline and to hand loaded data to the game. Loading
/// pixels from disk is the asset system's job, not this crate's.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetData {
    Texture {
        width: u32,
        height: u32,
    },
    /// A rectangular region of a texture
    Sprite {
        texture: String,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    },
    Dialogue {
        lines: Vec<String>,
    },
}

impl AssetData {
    pub fn kind(&self) -> AssetKind {
        match self {
            AssetData::Texture { .. } => AssetKind::Texture,
            AssetData::Sprite { .. } => AssetKind::Sprite,
            AssetData::Dialogue { .. } => AssetKind::Dialogue,
        }
    }
}

/// A cheap, shareable handle to an asset
///
/// Tracked handles carry the stable path they were loaded from and encode
/// as `"<kind-tag>:<path>"`. Untracked handles (no path) encode inline.
/// The asset server hands out the same handle for repeated loads of one
/// path, so multiple fields pointing at the same asset share identity.
#[derive(Debug, Clone)]
pub struct AssetHandle(Arc<AssetEntry>);

#[derive(Debug)]
struct AssetEntry {
    path: Option<String>,
    data: AssetData,
}

impl AssetHandle {
    /// Create a handle for an asset loaded from a stable path
    pub fn tracked(path: impl Into<String>, data: AssetData) -> Self {
        AssetHandle(Arc::new(AssetEntry {
            path: Some(path.into()),
            data,
        }))
    }

    /// Create a handle for a value the asset system does not track
    pub fn untracked(data: AssetData) -> Self {
        AssetHandle(Arc::new(AssetEntry { path: None, data }))
    }

    pub fn kind(&self) -> AssetKind {
        self.0.data.kind()
    }

    /// The stable path, or None for untracked values
    pub fn path(&self) -> Option<&str> {
        self.0.path.as_deref()
    }

    pub fn data(&self) -> &AssetData {
        &self.0.data
    }

    /// The `"<kind-tag>:<path>"` wire form, or None for untracked values
    pub fn wire_ref(&self) -> Option<String> {
        self.path()
            .map(|p| format!("{}{}{}", self.kind().tag(), ASSET_DELIMITER, p))
    }

    /// True if both handles point at the same underlying entry
    pub fn same_instance(a: &AssetHandle, b: &AssetHandle) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }
}

/// Split a wire reference into its kind and path.
///
/// Returns None if the string has no delimiter or the kind tag is unknown.
pub fn parse_wire_ref(s: &str) -> Option<(AssetKind, &str)> {
    let (tag, path) = s.split_once(ASSET_DELIMITER)?;
    AssetKind::from_tag(tag).map(|kind| (kind, path))
}

// Tracked handles compare by (kind, path) so a re-encoded document matches
// the original even when the cache was rebuilt in between. Untracked
// handles compare structurally.
impl PartialEq for AssetHandle {
    fn eq(&self, other: &Self) -> bool {
        match (self.path(), other.path()) {
            (Some(a), Some(b)) => self.kind() == other.kind() && a == b,
            (None, None) => self.data() == other.data(),
            _ => false,
        }
    }
}

impl Eq for AssetHandle {}

impl std::hash::Hash for AssetHandle {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.kind().hash(state);
        match self.path() {
            Some(p) => {
                true.hash(state);
                p.hash(state);
            }
            None => {
                false.hash(state);
                self.data().hash(state);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_ref_round_trip() {
        let handle = AssetHandle::tracked(
            "sprites/player.png#3",
            AssetData::Sprite {
                texture: "sprites/player.png".to_string(),
                x: 0,
                y: 0,
                width: 16,
                height: 16,
            },
        );

        let wire = handle.wire_ref().unwrap();
        assert_eq!(wire, "sprite:sprites/player.png#3");

        let (kind, path) = parse_wire_ref(&wire).unwrap();
        assert_eq!(kind, AssetKind::Sprite);
        assert_eq!(path, "sprites/player.png#3");
    }

    #[test]
    fn test_untracked_has_no_wire_form() {
        let handle = AssetHandle::untracked(AssetData::Texture {
            width: 8,
            height: 8,
        });
        assert!(handle.wire_ref().is_none());
        assert!(handle.path().is_none());
    }

    #[test]
    fn test_parse_rejects_unknown_kind() {
        assert!(parse_wire_ref("mesh:models/crate.obj").is_none());
        assert!(parse_wire_ref("no-delimiter-here").is_none());
    }

    #[test]
    fn test_handle_equality() {
        let data = AssetData::Texture {
            width: 4,
            height: 4,
        };
        let a = AssetHandle::tracked("tex/a.png", data.clone());
        let b = AssetHandle::tracked("tex/a.png", data.clone());
        let c = AssetHandle::untracked(data);

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(!AssetHandle::same_instance(&a, &b));
    }
}
