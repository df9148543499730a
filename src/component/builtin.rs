//! The stock component set
//!
//! A closed, registered set of concrete component types — "component type"
//! is a finite registry of factories, not an open class namespace. Each
//! type carries an explicit descriptor table the codec drives encode and
//! decode from.
//!
//! `TileMap` is the grid-shaped component; its payload bypasses the
//! generic field path entirely (see `codec::tilemap`).

use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::asset::{AssetHandle, AssetKind};
use crate::scene::ComponentId;

use super::descriptor::{
    ComponentTypeDescriptor, FieldDescriptor, FieldType, RefSource, ReferenceFieldDescriptor,
};
use super::{Component, FieldError, FieldValue};

pub const TRANSFORM_TAG: &str = "game.core.Transform";
pub const SPRITE_RENDERER_TAG: &str = "game.render.SpriteRenderer";
pub const ANIMATOR_TAG: &str = "game.render.Animator";
pub const COLLIDER_TAG: &str = "game.physics.Collider";
pub const TILE_MAP_TAG: &str = "game.map.TileMap";
pub const NPC_TAG: &str = "game.dialogue.Npc";
pub const DIALOGUE_BOX_TAG: &str = "game.ui.DialogueBox";
pub const HEALTH_BAR_TAG: &str = "game.ui.HealthBar";
pub const MINIMAP_TAG: &str = "game.ui.Minimap";

// ─────────────────────────────────────────────────────────────────────────────
// Transform
// ─────────────────────────────────────────────────────────────────────────────

/// Position, rotation and scale of an object
#[derive(Debug, Clone)]
pub struct Transform {
    pub key: String,
    pub position: [f32; 2],
    pub rotation: f32,
    pub scale: [f32; 2],
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            key: String::new(),
            position: [0.0, 0.0],
            rotation: 0.0,
            scale: [1.0, 1.0],
        }
    }
}

pub static TRANSFORM: ComponentTypeDescriptor = ComponentTypeDescriptor {
    tag: TRANSFORM_TAG,
    fields: &[
        FieldDescriptor::scalar("position", FieldType::Vec2),
        FieldDescriptor::scalar("rotation", FieldType::Float),
        FieldDescriptor::scalar("scale", FieldType::Vec2),
    ],
    references: &[],
};

impl Component for Transform {
    fn descriptor(&self) -> &'static ComponentTypeDescriptor {
        &TRANSFORM
    }

    fn key(&self) -> &str {
        &self.key
    }

    fn set_key(&mut self, key: String) {
        self.key = key;
    }

    fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "position" => Some(FieldValue::Vec2(self.position)),
            "rotation" => Some(FieldValue::Float(self.rotation as f64)),
            "scale" => Some(FieldValue::Vec2(self.scale)),
            _ => None,
        }
    }

    fn set_field(&mut self, name: &str, value: FieldValue) -> Result<(), FieldError> {
        match name {
            "position" => self.position = value.expect_vec2()?,
            "rotation" => self.rotation = value.expect_float()? as f32,
            "scale" => self.scale = value.expect_vec2()?,
            _ => return Err(FieldError::Unknown),
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SpriteRenderer
// ─────────────────────────────────────────────────────────────────────────────

/// Draws one sprite at the owning object's transform
#[derive(Debug, Clone)]
pub struct SpriteRenderer {
    pub key: String,
    pub sprite: Option<AssetHandle>,
    pub flip_x: bool,
    pub flip_y: bool,
    pub layer: i32,
    pub tint: [f32; 4],
}

impl Default for SpriteRenderer {
    fn default() -> Self {
        Self {
            key: String::new(),
            sprite: None,
            flip_x: false,
            flip_y: false,
            layer: 0,
            tint: [1.0, 1.0, 1.0, 1.0],
        }
    }
}

pub static SPRITE_RENDERER: ComponentTypeDescriptor = ComponentTypeDescriptor {
    tag: SPRITE_RENDERER_TAG,
    fields: &[
        FieldDescriptor::scalar("sprite", FieldType::Asset(AssetKind::Sprite)),
        FieldDescriptor::scalar("flip_x", FieldType::Bool),
        FieldDescriptor::scalar("flip_y", FieldType::Bool),
        FieldDescriptor::scalar("layer", FieldType::Int),
        FieldDescriptor::scalar("tint", FieldType::Color),
    ],
    references: &[],
};

impl Component for SpriteRenderer {
    fn descriptor(&self) -> &'static ComponentTypeDescriptor {
        &SPRITE_RENDERER
    }

    fn key(&self) -> &str {
        &self.key
    }

    fn set_key(&mut self, key: String) {
        self.key = key;
    }

    fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "sprite" => self.sprite.clone().map(FieldValue::Asset),
            "flip_x" => Some(FieldValue::Bool(self.flip_x)),
            "flip_y" => Some(FieldValue::Bool(self.flip_y)),
            "layer" => Some(FieldValue::Int(self.layer as i64)),
            "tint" => Some(FieldValue::Color(self.tint)),
            _ => None,
        }
    }

    fn set_field(&mut self, name: &str, value: FieldValue) -> Result<(), FieldError> {
        match name {
            "sprite" => self.sprite = Some(value.expect_asset()?),
            "flip_x" => self.flip_x = value.expect_bool()?,
            "flip_y" => self.flip_y = value.expect_bool()?,
            "layer" => self.layer = value.expect_int()? as i32,
            "tint" => self.tint = value.expect_color()?,
            _ => return Err(FieldError::Unknown),
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Animator
// ─────────────────────────────────────────────────────────────────────────────

/// Flips the sibling SpriteRenderer through a list of frames
///
/// `elapsed` and `frame` are playback state, not authored data: they are
/// reset after every load regardless of what a document claims.
#[derive(Debug, Clone)]
pub struct Animator {
    pub key: String,
    pub frames: Vec<AssetHandle>,
    pub frame_time: f32,
    pub playing: bool,
    /// Transient playback clock
    pub elapsed: f32,
    /// Transient current frame index
    pub frame: usize,
    /// Wired in phase 2 from the same object
    pub renderer: Option<ComponentId>,
}

impl Default for Animator {
    fn default() -> Self {
        Self {
            key: String::new(),
            frames: Vec::new(),
            frame_time: 0.1,
            playing: true,
            elapsed: 0.0,
            frame: 0,
            renderer: None,
        }
    }
}

pub static ANIMATOR: ComponentTypeDescriptor = ComponentTypeDescriptor {
    tag: ANIMATOR_TAG,
    fields: &[
        FieldDescriptor::list("frames", FieldType::Asset(AssetKind::Sprite)),
        FieldDescriptor::scalar("frame_time", FieldType::Float),
        FieldDescriptor::scalar("playing", FieldType::Bool),
    ],
    references: &[ReferenceFieldDescriptor {
        name: "renderer",
        target_tag: SPRITE_RENDERER_TAG,
        source: RefSource::SelfObject,
        required: true,
        is_list: false,
    }],
};

impl Component for Animator {
    fn descriptor(&self) -> &'static ComponentTypeDescriptor {
        &ANIMATOR
    }

    fn key(&self) -> &str {
        &self.key
    }

    fn set_key(&mut self, key: String) {
        self.key = key;
    }

    fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "frames" => Some(FieldValue::List(
                self.frames.iter().cloned().map(FieldValue::Asset).collect(),
            )),
            "frame_time" => Some(FieldValue::Float(self.frame_time as f64)),
            "playing" => Some(FieldValue::Bool(self.playing)),
            _ => None,
        }
    }

    fn set_field(&mut self, name: &str, value: FieldValue) -> Result<(), FieldError> {
        match name {
            "frames" => {
                let items = value.expect_list()?;
                let mut frames = Vec::with_capacity(items.len());
                for item in items {
                    frames.push(item.expect_asset()?);
                }
                self.frames = frames;
            }
            "frame_time" => self.frame_time = value.expect_float()? as f32,
            "playing" => self.playing = value.expect_bool()?,
            _ => return Err(FieldError::Unknown),
        }
        Ok(())
    }

    fn set_refs(&mut self, field: &str, targets: Vec<ComponentId>) {
        if field == "renderer" {
            self.renderer = targets.first().copied();
        }
    }

    fn reset_transient(&mut self) {
        self.elapsed = 0.0;
        self.frame = 0;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Collider
// ─────────────────────────────────────────────────────────────────────────────

/// Axis-aligned collision box
#[derive(Debug, Clone)]
pub struct Collider {
    pub key: String,
    pub width: f32,
    pub height: f32,
    pub solid: bool,
    pub offset: [f32; 2],
}

impl Default for Collider {
    fn default() -> Self {
        Self {
            key: String::new(),
            width: 16.0,
            height: 16.0,
            solid: true,
            offset: [0.0, 0.0],
        }
    }
}

pub static COLLIDER: ComponentTypeDescriptor = ComponentTypeDescriptor {
    tag: COLLIDER_TAG,
    fields: &[
        FieldDescriptor::scalar("width", FieldType::Float),
        FieldDescriptor::scalar("height", FieldType::Float),
        FieldDescriptor::scalar("solid", FieldType::Bool),
        FieldDescriptor::scalar("offset", FieldType::Vec2),
    ],
    references: &[],
};

impl Component for Collider {
    fn descriptor(&self) -> &'static ComponentTypeDescriptor {
        &COLLIDER
    }

    fn key(&self) -> &str {
        &self.key
    }

    fn set_key(&mut self, key: String) {
        self.key = key;
    }

    fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "width" => Some(FieldValue::Float(self.width as f64)),
            "height" => Some(FieldValue::Float(self.height as f64)),
            "solid" => Some(FieldValue::Bool(self.solid)),
            "offset" => Some(FieldValue::Vec2(self.offset)),
            _ => None,
        }
    }

    fn set_field(&mut self, name: &str, value: FieldValue) -> Result<(), FieldError> {
        match name {
            "width" => self.width = value.expect_float()? as f32,
            "height" => self.height = value.expect_float()? as f32,
            "solid" => self.solid = value.expect_bool()?,
            "offset" => self.offset = value.expect_vec2()?,
            _ => return Err(FieldError::Unknown),
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tile grid
// ─────────────────────────────────────────────────────────────────────────────

/// Side length of a tile chunk, in cells.
///
/// Shared by the packed and the legacy decoder; both formats assume it.
pub const CHUNK_SIZE: usize = 32;

/// Which direction a one-way ledge tile can be crossed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LedgeDirection {
    #[default]
    None,
    Up,
    Down,
    Left,
    Right,
}

impl LedgeDirection {
    /// Ordinal used in the packed binary form
    pub fn ordinal(self) -> u8 {
        match self {
            LedgeDirection::None => 0,
            LedgeDirection::Up => 1,
            LedgeDirection::Down => 2,
            LedgeDirection::Left => 3,
            LedgeDirection::Right => 4,
        }
    }

    pub fn from_ordinal(ord: u8) -> Option<Self> {
        match ord {
            0 => Some(LedgeDirection::None),
            1 => Some(LedgeDirection::Up),
            2 => Some(LedgeDirection::Down),
            3 => Some(LedgeDirection::Left),
            4 => Some(LedgeDirection::Right),
            _ => None,
        }
    }

    /// Name used in the legacy structured form
    pub fn name(self) -> &'static str {
        match self {
            LedgeDirection::None => "NONE",
            LedgeDirection::Up => "UP",
            LedgeDirection::Down => "DOWN",
            LedgeDirection::Left => "LEFT",
            LedgeDirection::Right => "RIGHT",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "NONE" => Some(LedgeDirection::None),
            "UP" => Some(LedgeDirection::Up),
            "DOWN" => Some(LedgeDirection::Down),
            "LEFT" => Some(LedgeDirection::Left),
            "RIGHT" => Some(LedgeDirection::Right),
            _ => None,
        }
    }
}

/// An immutable tile definition
///
/// Equality is structural: two tiles with equal fields collapse to one
/// palette entry on encode, whether or not they share an `Arc`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tile {
    pub name: String,
    pub sprite: Option<AssetHandle>,
    pub solid: bool,
    pub ledge: LedgeDirection,
}

impl Tile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sprite: None,
            solid: false,
            ledge: LedgeDirection::None,
        }
    }
}

/// A fixed-size sparse square of optional tile references
#[derive(Debug)]
pub struct TileChunk {
    cells: Vec<Option<Arc<Tile>>>,
    tile_count: usize,
}

impl Default for TileChunk {
    fn default() -> Self {
        Self::new()
    }
}

impl TileChunk {
    pub fn new() -> Self {
        Self {
            cells: vec![None; CHUNK_SIZE * CHUNK_SIZE],
            tile_count: 0,
        }
    }

    /// Number of non-empty cells
    pub fn tile_count(&self) -> usize {
        self.tile_count
    }

    pub fn get(&self, lx: usize, ly: usize) -> Option<&Arc<Tile>> {
        self.cells[ly * CHUNK_SIZE + lx].as_ref()
    }

    pub fn set(&mut self, lx: usize, ly: usize, tile: Option<Arc<Tile>>) {
        let cell = &mut self.cells[ly * CHUNK_SIZE + lx];
        match (&cell, &tile) {
            (None, Some(_)) => self.tile_count += 1,
            (Some(_), None) => self.tile_count -= 1,
            _ => {}
        }
        *cell = tile;
    }

    /// Populated cells in row-major order (top-to-bottom, left-to-right)
    pub fn iter_cells(&self) -> impl Iterator<Item = (usize, usize, &Arc<Tile>)> {
        self.cells
            .iter()
            .enumerate()
            .filter_map(|(i, cell)| cell.as_ref().map(|t| (i % CHUNK_SIZE, i / CHUNK_SIZE, t)))
    }
}

/// A two-dimensional tile map stored as sparse 32×32 chunks
///
/// The one component whose payload is not field-by-field: it persists as a
/// packed palette blob (see `codec::tilemap`).
#[derive(Debug)]
pub struct TileMap {
    pub key: String,
    pub tile_size: f32,
    pub z_index: i32,
    chunks: BTreeMap<(i32, i32), TileChunk>,
}

impl Default for TileMap {
    fn default() -> Self {
        Self {
            key: String::new(),
            tile_size: 16.0,
            z_index: 0,
            chunks: BTreeMap::new(),
        }
    }
}

impl TileMap {
    /// Set or clear the tile at global cell coordinates
    pub fn set_tile(&mut self, x: i32, y: i32, tile: Option<Arc<Tile>>) {
        let size = CHUNK_SIZE as i32;
        let cx = x.div_euclid(size);
        let cy = y.div_euclid(size);
        let lx = x.rem_euclid(size) as usize;
        let ly = y.rem_euclid(size) as usize;
        self.chunks
            .entry((cx, cy))
            .or_default()
            .set(lx, ly, tile);
    }

    pub fn tile_at(&self, x: i32, y: i32) -> Option<&Arc<Tile>> {
        let size = CHUNK_SIZE as i32;
        let chunk = self.chunks.get(&(x.div_euclid(size), y.div_euclid(size)))?;
        chunk.get(x.rem_euclid(size) as usize, y.rem_euclid(size) as usize)
    }

    pub fn chunks(&self) -> &BTreeMap<(i32, i32), TileChunk> {
        &self.chunks
    }

    pub(crate) fn chunk_mut(&mut self, cx: i32, cy: i32) -> &mut TileChunk {
        self.chunks.entry((cx, cy)).or_default()
    }

    /// Populated chunks in scan order: chunk rows top-to-bottom, then
    /// left-to-right within a row.
    ///
    /// This order fixes first-seen palette index assignment, so a
    /// compliant encoder reproduces byte-identical output for the same
    /// grid — needed for diffability, not correctness.
    pub fn chunks_scan_order(&self) -> Vec<((i32, i32), &TileChunk)> {
        let mut chunks: Vec<_> = self
            .chunks
            .iter()
            .filter(|(_, c)| c.tile_count() > 0)
            .map(|(&coord, c)| (coord, c))
            .collect();
        chunks.sort_by_key(|((cx, cy), _)| (*cy, *cx));
        chunks
    }

    /// Total number of populated cells across all chunks
    pub fn populated_count(&self) -> usize {
        self.chunks.values().map(|c| c.tile_count()).sum()
    }
}

pub static TILE_MAP: ComponentTypeDescriptor = ComponentTypeDescriptor {
    tag: TILE_MAP_TAG,
    fields: &[
        FieldDescriptor::scalar("tile_size", FieldType::Float),
        FieldDescriptor::scalar("z_index", FieldType::Int),
    ],
    references: &[],
};

impl Component for TileMap {
    fn descriptor(&self) -> &'static ComponentTypeDescriptor {
        &TILE_MAP
    }

    fn key(&self) -> &str {
        &self.key
    }

    fn set_key(&mut self, key: String) {
        self.key = key;
    }

    fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "tile_size" => Some(FieldValue::Float(self.tile_size as f64)),
            "z_index" => Some(FieldValue::Int(self.z_index as i64)),
            _ => None,
        }
    }

    fn set_field(&mut self, name: &str, value: FieldValue) -> Result<(), FieldError> {
        match name {
            "tile_size" => self.tile_size = value.expect_float()? as f32,
            "z_index" => self.z_index = value.expect_int()? as i32,
            _ => return Err(FieldError::Unknown),
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Npc
// ─────────────────────────────────────────────────────────────────────────────

/// A talkable character: portrait, dialogue, and a keyed link to whatever
/// dialogue box should display it
#[derive(Debug, Clone, Default)]
pub struct Npc {
    pub key: String,
    pub display_name: String,
    pub portrait: Option<AssetHandle>,
    pub dialogue: Option<AssetHandle>,
    /// Persisted lookup key for the dialogue box
    pub dialogue_box_key: String,
    /// Wired in phase 2 from the key registry
    pub dialogue_box: Option<ComponentId>,
}

pub static NPC: ComponentTypeDescriptor = ComponentTypeDescriptor {
    tag: NPC_TAG,
    fields: &[
        FieldDescriptor::scalar("display_name", FieldType::Str),
        FieldDescriptor::scalar("portrait", FieldType::Asset(AssetKind::Texture)),
        FieldDescriptor::scalar("dialogue", FieldType::Asset(AssetKind::Dialogue)),
    ],
    references: &[ReferenceFieldDescriptor {
        name: "dialogue_box",
        target_tag: DIALOGUE_BOX_TAG,
        source: RefSource::Key,
        required: false,
        is_list: false,
    }],
};

impl Component for Npc {
    fn descriptor(&self) -> &'static ComponentTypeDescriptor {
        &NPC
    }

    fn key(&self) -> &str {
        &self.key
    }

    fn set_key(&mut self, key: String) {
        self.key = key;
    }

    fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "display_name" => Some(FieldValue::Str(self.display_name.clone())),
            "portrait" => self.portrait.clone().map(FieldValue::Asset),
            "dialogue" => self.dialogue.clone().map(FieldValue::Asset),
            _ => None,
        }
    }

    fn set_field(&mut self, name: &str, value: FieldValue) -> Result<(), FieldError> {
        match name {
            "display_name" => self.display_name = value.expect_str()?,
            "portrait" => self.portrait = Some(value.expect_asset()?),
            "dialogue" => self.dialogue = Some(value.expect_asset()?),
            _ => return Err(FieldError::Unknown),
        }
        Ok(())
    }

    fn ref_keys(&self, field: &str) -> Vec<String> {
        if field == "dialogue_box" && !self.dialogue_box_key.is_empty() {
            vec![self.dialogue_box_key.clone()]
        } else {
            Vec::new()
        }
    }

    fn set_ref_keys(&mut self, field: &str, keys: Vec<String>) {
        if field == "dialogue_box" {
            self.dialogue_box_key = keys.into_iter().next().unwrap_or_default();
        }
    }

    fn set_refs(&mut self, field: &str, targets: Vec<ComponentId>) {
        if field == "dialogue_box" {
            self.dialogue_box = targets.first().copied();
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// DialogueBox
// ─────────────────────────────────────────────────────────────────────────────

/// On-screen dialogue display, usually registered under a well-known key
#[derive(Debug, Clone)]
pub struct DialogueBox {
    pub key: String,
    pub chars_per_second: f32,
    pub auto_advance: bool,
    /// Wired in phase 2 from the direct children
    pub text_renderer: Option<ComponentId>,
}

impl Default for DialogueBox {
    fn default() -> Self {
        Self {
            key: String::new(),
            chars_per_second: 30.0,
            auto_advance: false,
            text_renderer: None,
        }
    }
}

pub static DIALOGUE_BOX: ComponentTypeDescriptor = ComponentTypeDescriptor {
    tag: DIALOGUE_BOX_TAG,
    fields: &[
        FieldDescriptor::scalar("chars_per_second", FieldType::Float),
        FieldDescriptor::scalar("auto_advance", FieldType::Bool),
    ],
    references: &[ReferenceFieldDescriptor {
        name: "text_renderer",
        target_tag: SPRITE_RENDERER_TAG,
        source: RefSource::Children,
        required: true,
        is_list: false,
    }],
};

impl Component for DialogueBox {
    fn descriptor(&self) -> &'static ComponentTypeDescriptor {
        &DIALOGUE_BOX
    }

    fn key(&self) -> &str {
        &self.key
    }

    fn set_key(&mut self, key: String) {
        self.key = key;
    }

    fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "chars_per_second" => Some(FieldValue::Float(self.chars_per_second as f64)),
            "auto_advance" => Some(FieldValue::Bool(self.auto_advance)),
            _ => None,
        }
    }

    fn set_field(&mut self, name: &str, value: FieldValue) -> Result<(), FieldError> {
        match name {
            "chars_per_second" => self.chars_per_second = value.expect_float()? as f32,
            "auto_advance" => self.auto_advance = value.expect_bool()?,
            _ => return Err(FieldError::Unknown),
        }
        Ok(())
    }

    fn set_refs(&mut self, field: &str, targets: Vec<ComponentId>) {
        if field == "text_renderer" {
            self.text_renderer = targets.first().copied();
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// HealthBar
// ─────────────────────────────────────────────────────────────────────────────

/// Floating health display attached under an NPC in the hierarchy
#[derive(Debug, Clone)]
pub struct HealthBar {
    pub key: String,
    pub width: f32,
    pub show_when_full: bool,
    /// Wired in phase 2 by walking ancestors outward
    pub owner: Option<ComponentId>,
}

impl Default for HealthBar {
    fn default() -> Self {
        Self {
            key: String::new(),
            width: 24.0,
            show_when_full: false,
            owner: None,
        }
    }
}

pub static HEALTH_BAR: ComponentTypeDescriptor = ComponentTypeDescriptor {
    tag: HEALTH_BAR_TAG,
    fields: &[
        FieldDescriptor::scalar("width", FieldType::Float),
        FieldDescriptor::scalar("show_when_full", FieldType::Bool),
    ],
    references: &[ReferenceFieldDescriptor {
        name: "owner",
        target_tag: NPC_TAG,
        source: RefSource::Parent,
        required: true,
        is_list: false,
    }],
};

impl Component for HealthBar {
    fn descriptor(&self) -> &'static ComponentTypeDescriptor {
        &HEALTH_BAR
    }

    fn key(&self) -> &str {
        &self.key
    }

    fn set_key(&mut self, key: String) {
        self.key = key;
    }

    fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "width" => Some(FieldValue::Float(self.width as f64)),
            "show_when_full" => Some(FieldValue::Bool(self.show_when_full)),
            _ => None,
        }
    }

    fn set_field(&mut self, name: &str, value: FieldValue) -> Result<(), FieldError> {
        match name {
            "width" => self.width = value.expect_float()? as f32,
            "show_when_full" => self.show_when_full = value.expect_bool()?,
            _ => return Err(FieldError::Unknown),
        }
        Ok(())
    }

    fn set_refs(&mut self, field: &str, targets: Vec<ComponentId>) {
        if field == "owner" {
            self.owner = targets.first().copied();
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Minimap
// ─────────────────────────────────────────────────────────────────────────────

/// Scaled-down map view: finds its TileMap anywhere below it in the tree,
/// and draws markers for keyed transforms anywhere in the scene
#[derive(Debug, Clone)]
pub struct Minimap {
    pub key: String,
    pub scale: f32,
    /// Wired in phase 2 from a depth-first descendant walk
    pub map: Option<ComponentId>,
    /// Persisted lookup keys for marker transforms
    pub marker_keys: Vec<String>,
    /// Wired in phase 2 from the key registry
    pub markers: Vec<ComponentId>,
}

impl Default for Minimap {
    fn default() -> Self {
        Self {
            key: String::new(),
            scale: 0.1,
            map: None,
            marker_keys: Vec::new(),
            markers: Vec::new(),
        }
    }
}

pub static MINIMAP: ComponentTypeDescriptor = ComponentTypeDescriptor {
    tag: MINIMAP_TAG,
    fields: &[FieldDescriptor::scalar("scale", FieldType::Float)],
    references: &[
        ReferenceFieldDescriptor {
            name: "map",
            target_tag: TILE_MAP_TAG,
            source: RefSource::ChildrenRecursive,
            required: true,
            is_list: false,
        },
        ReferenceFieldDescriptor {
            name: "markers",
            target_tag: TRANSFORM_TAG,
            source: RefSource::Key,
            required: false,
            is_list: true,
        },
    ],
};

impl Component for Minimap {
    fn descriptor(&self) -> &'static ComponentTypeDescriptor {
        &MINIMAP
    }

    fn key(&self) -> &str {
        &self.key
    }

    fn set_key(&mut self, key: String) {
        self.key = key;
    }

    fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "scale" => Some(FieldValue::Float(self.scale as f64)),
            _ => None,
        }
    }

    fn set_field(&mut self, name: &str, value: FieldValue) -> Result<(), FieldError> {
        match name {
            "scale" => self.scale = value.expect_float()? as f32,
            _ => return Err(FieldError::Unknown),
        }
        Ok(())
    }

    fn ref_keys(&self, field: &str) -> Vec<String> {
        if field == "markers" {
            self.marker_keys.clone()
        } else {
            Vec::new()
        }
    }

    fn set_ref_keys(&mut self, field: &str, keys: Vec<String>) {
        if field == "markers" {
            self.marker_keys = keys;
        }
    }

    fn set_refs(&mut self, field: &str, targets: Vec<ComponentId>) {
        match field {
            "map" => self.map = targets.first().copied(),
            "markers" => self.markers = targets,
            _ => {}
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
