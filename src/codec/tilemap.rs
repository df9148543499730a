//! Tile map payload codec
//!
//! A `TileMap` persists as a single base64 scalar wrapping a packed
//! big-endian stream: header, deduplicated tile palette, then per-chunk
//! cell runs. Palette indices are assigned in first-seen scan order
//! (chunk rows top-to-bottom then left-to-right, cells row-major), so the
//! same grid always encodes to the same bytes.
//!
//! The legacy structured form (one JSON object per cell) is never written
//! anymore but stays readable forever; old documents migrate to the packed
//! form on their next save.

use std::collections::HashMap;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::Value;

use crate::asset::{AssetKind, AssetServer};
use crate::component::builtin::{
    LedgeDirection, Tile, TileMap, CHUNK_SIZE, TILE_MAP_TAG,
};
use crate::error::CodecError;

/// Caps on header counts, checked before any allocation
///
/// A corrupt length prefix must not translate into a giant reservation.
mod limits {
    pub const MAX_PALETTE: i32 = 65_536;
    pub const MAX_CHUNKS: i32 = 1_048_576;
}

const CELLS_PER_CHUNK: i32 = (CHUNK_SIZE * CHUNK_SIZE) as i32;

// ─────────────────────────────────────────────────────────────────────────────
// Packed encode
// ─────────────────────────────────────────────────────────────────────────────

/// Encode the map's grid as the packed base64 payload
pub fn encode_packed(map: &TileMap) -> String {
    let chunks = map.chunks_scan_order();

    // First-seen palette over the fixed scan order.
    let mut palette: Vec<Arc<Tile>> = Vec::new();
    let mut indices: HashMap<Arc<Tile>, i32> = HashMap::new();
    for (_, chunk) in &chunks {
        for (_, _, tile) in chunk.iter_cells() {
            if !indices.contains_key(tile) {
                indices.insert(tile.clone(), palette.len() as i32);
                palette.push(tile.clone());
            }
        }
    }

    let mut w = ByteWriter::new();
    w.put_f32(map.tile_size);
    w.put_i32(map.z_index);

    w.put_i32(palette.len() as i32);
    for tile in &palette {
        w.put_str(&tile.name);
        let sprite_path = tile
            .sprite
            .as_ref()
            .and_then(|h| h.path())
            .unwrap_or("");
        w.put_str(sprite_path);
        w.put_u8(tile.solid as u8);
        w.put_u8(tile.ledge.ordinal());
    }

    w.put_i32(chunks.len() as i32);
    for ((cx, cy), chunk) in &chunks {
        w.put_i32(*cx);
        w.put_i32(*cy);
        w.put_i32(chunk.tile_count() as i32);
        for (lx, ly, tile) in chunk.iter_cells() {
            w.put_u8(lx as u8);
            w.put_u8(ly as u8);
            w.put_i32(indices[tile]);
        }
    }

    BASE64.encode(w.finish())
}

// ─────────────────────────────────────────────────────────────────────────────
// Packed decode
// ─────────────────────────────────────────────────────────────────────────────

/// Decode the packed base64 payload into an empty map
pub fn decode_packed(
    map: &mut TileMap,
    payload: &str,
    assets: &AssetServer,
) -> Result<(), CodecError> {
    let bytes = BASE64
        .decode(payload)
        .map_err(|e| malformed(format!("bad base64: {}", e)))?;
    let mut r = ByteReader::new(&bytes);

    map.tile_size = r.get_f32()?;
    map.z_index = r.get_i32()?;

    let palette_len = r.get_i32()?;
    if !(0..=limits::MAX_PALETTE).contains(&palette_len) {
        return Err(malformed(format!("palette length {} out of range", palette_len)));
    }
    let mut palette: Vec<Arc<Tile>> = Vec::with_capacity(palette_len as usize);
    for i in 0..palette_len {
        let name = r.get_str()?;
        let sprite_path = r.get_str()?;
        let solid = r.get_u8()? != 0;
        let ord = r.get_u8()?;
        let ledge = LedgeDirection::from_ordinal(ord)
            .ok_or_else(|| malformed(format!("palette entry {}: bad ledge ordinal {}", i, ord)))?;

        // A palette entry naming a sprite that no longer resolves still
        // loads; the tile just draws nothing.
        let sprite = if sprite_path.is_empty() {
            None
        } else {
            match assets.load(AssetKind::Sprite, &sprite_path) {
                Ok(handle) => Some(handle),
                Err(e) => {
                    log::warn!("tile '{}': {}", name, e);
                    None
                }
            }
        };

        palette.push(Arc::new(Tile {
            name,
            sprite,
            solid,
            ledge,
        }));
    }

    let chunk_count = r.get_i32()?;
    if !(0..=limits::MAX_CHUNKS).contains(&chunk_count) {
        return Err(malformed(format!("chunk count {} out of range", chunk_count)));
    }
    for _ in 0..chunk_count {
        let cx = r.get_i32()?;
        let cy = r.get_i32()?;
        let count = r.get_i32()?;
        if !(0..=CELLS_PER_CHUNK).contains(&count) {
            return Err(malformed(format!(
                "chunk ({},{}): cell count {} out of range",
                cx, cy, count
            )));
        }
        let chunk = map.chunk_mut(cx, cy);
        for _ in 0..count {
            let lx = r.get_u8()? as usize;
            let ly = r.get_u8()? as usize;
            if lx >= CHUNK_SIZE || ly >= CHUNK_SIZE {
                return Err(malformed(format!(
                    "chunk ({},{}): cell ({},{}) out of bounds",
                    cx, cy, lx, ly
                )));
            }
            let index = r.get_i32()?;
            if !(0..palette_len).contains(&index) {
                return Err(malformed(format!(
                    "chunk ({},{}): palette index {} out of range",
                    cx, cy, index
                )));
            }
            chunk.set(lx, ly, Some(palette[index as usize].clone()));
        }
    }

    if !r.is_empty() {
        return Err(malformed(format!("{} trailing bytes", r.remaining())));
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Legacy decode
// ─────────────────────────────────────────────────────────────────────────────

/// Decode the legacy structured form: `chunks` maps `"cx,cy"` keys to
/// objects mapping `"lx,ly"` keys to per-cell tile objects.
///
/// Cells with equal fields are interned to one shared tile, matching what
/// the packed form's palette produces.
pub fn decode_legacy(
    map: &mut TileMap,
    doc: &Value,
    assets: &AssetServer,
) -> Result<(), CodecError> {
    let obj = doc
        .as_object()
        .ok_or_else(|| malformed("legacy payload is not an object".to_string()))?;

    if let Some(v) = obj.get("tileSize") {
        map.tile_size = v
            .as_f64()
            .ok_or_else(|| malformed("tileSize is not a number".to_string()))? as f32;
    }
    if let Some(v) = obj.get("zIndex") {
        map.z_index = v
            .as_i64()
            .ok_or_else(|| malformed("zIndex is not an integer".to_string()))? as i32;
    }

    let chunks = match obj.get("chunks") {
        Some(v) => v
            .as_object()
            .ok_or_else(|| malformed("chunks is not an object".to_string()))?,
        None => return Ok(()),
    };

    let mut interned: HashMap<Tile, Arc<Tile>> = HashMap::new();
    for (chunk_key, cells) in chunks {
        let (cx, cy) = parse_coord_key(chunk_key)
            .ok_or_else(|| malformed(format!("bad chunk key '{}'", chunk_key)))?;
        let cells = cells
            .as_object()
            .ok_or_else(|| malformed(format!("chunk '{}' is not an object", chunk_key)))?;

        for (cell_key, cell) in cells {
            let (lx, ly) = parse_coord_key(cell_key)
                .ok_or_else(|| malformed(format!("bad cell key '{}'", cell_key)))?;
            if !(0..CHUNK_SIZE as i32).contains(&lx) || !(0..CHUNK_SIZE as i32).contains(&ly) {
                return Err(malformed(format!(
                    "chunk '{}': cell ({},{}) out of bounds",
                    chunk_key, lx, ly
                )));
            }

            let tile = decode_legacy_cell(cell, assets)?;
            let shared = interned
                .entry(tile.clone())
                .or_insert_with(|| Arc::new(tile))
                .clone();
            map.chunk_mut(cx, cy).set(lx as usize, ly as usize, Some(shared));
        }
    }
    Ok(())
}

fn decode_legacy_cell(cell: &Value, assets: &AssetServer) -> Result<Tile, CodecError> {
    let obj = cell
        .as_object()
        .ok_or_else(|| malformed("cell is not an object".to_string()))?;

    let name = obj
        .get("name")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string();
    let solid = obj.get("solid").and_then(|v| v.as_bool()).unwrap_or(false);
    let ledge = match obj.get("ledge").and_then(|v| v.as_str()) {
        Some(s) => LedgeDirection::from_name(s)
            .ok_or_else(|| malformed(format!("bad ledge '{}'", s)))?,
        None => LedgeDirection::None,
    };

    let sprite = match obj.get("sprite").and_then(|v| v.as_str()) {
        Some(path) if !path.is_empty() => match assets.load(AssetKind::Sprite, path) {
            Ok(handle) => Some(handle),
            Err(e) => {
                log::warn!("tile '{}': {}", name, e);
                None
            }
        },
        _ => None,
    };

    Ok(Tile {
        name,
        sprite,
        solid,
        ledge,
    })
}

fn parse_coord_key(key: &str) -> Option<(i32, i32)> {
    let (a, b) = key.split_once(',')?;
    Some((a.trim().parse().ok()?, b.trim().parse().ok()?))
}

fn malformed(detail: String) -> CodecError {
    CodecError::MalformedTilePayload {
        component: TILE_MAP_TAG.to_string(),
        detail,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Byte stream helpers
// ─────────────────────────────────────────────────────────────────────────────

struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    fn new() -> Self {
        Self { buf: Vec::new() }
    }

    fn put_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn put_u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    fn put_i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    fn put_f32(&mut self, v: f32) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    /// u16 byte length followed by UTF-8 bytes
    fn put_str(&mut self, s: &str) {
        debug_assert!(s.len() <= u16::MAX as usize);
        self.put_u16(s.len() as u16);
        self.buf.extend_from_slice(s.as_bytes());
    }

    fn finish(self) -> Vec<u8> {
        self.buf
    }
}

struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        if self.remaining() < n {
            return Err(malformed(format!(
                "unexpected end of stream at byte {}",
                self.pos
            )));
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn get_u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.take(1)?[0])
    }

    fn get_u16(&mut self) -> Result<u16, CodecError> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn get_i32(&mut self) -> Result<i32, CodecError> {
        let b = self.take(4)?;
        Ok(i32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn get_f32(&mut self) -> Result<f32, CodecError> {
        let b = self.take(4)?;
        Ok(f32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn get_str(&mut self) -> Result<String, CodecError> {
        let len = self.get_u16()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| malformed(format!("invalid UTF-8 at byte {}", self.pos)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::{AssetData, MemoryAssets};
    use serde_json::json;

    fn server() -> AssetServer {
        MemoryAssets::new()
            .with(
                "tiles/grass.png",
                AssetData::Sprite {
                    texture: "tiles/grass.png".to_string(),
                    x: 0,
                    y: 0,
                    width: 16,
                    height: 16,
                },
            )
            .with(
                "tiles/wall.png",
                AssetData::Sprite {
                    texture: "tiles/wall.png".to_string(),
                    x: 16,
                    y: 0,
                    width: 16,
                    height: 16,
                },
            )
            .into_server()
    }

    fn tile(assets: &AssetServer, name: &str, path: &str, solid: bool) -> Arc<Tile> {
        Arc::new(Tile {
            name: name.to_string(),
            sprite: Some(assets.load(AssetKind::Sprite, path).unwrap()),
            solid,
            ledge: LedgeDirection::None,
        })
    }

    fn assert_same_grid(a: &TileMap, b: &TileMap) {
        assert_eq!(a.populated_count(), b.populated_count());
        for ((coord, chunk_a), (coord_b, chunk_b)) in
            a.chunks_scan_order().iter().zip(b.chunks_scan_order().iter())
        {
            assert_eq!(coord, coord_b);
            for (lx, ly, tile_a) in chunk_a.iter_cells() {
                let tile_b = chunk_b.get(lx, ly).unwrap_or_else(|| {
                    panic!("cell ({},{}) in chunk {:?} missing", lx, ly, coord)
                });
                assert_eq!(tile_a.as_ref(), tile_b.as_ref());
            }
        }
    }

    #[test]
    fn test_packed_round_trip_with_palette_dedup() {
        let assets = server();
        let tiles = [
            tile(&assets, "grass", "tiles/grass.png", false),
            tile(&assets, "wall", "tiles/wall.png", true),
            Arc::new(Tile {
                name: "ledge".to_string(),
                sprite: None,
                solid: true,
                ledge: LedgeDirection::Up,
            }),
        ];

        // 500 cells over a 64x64 area, three distinct tiles repeating.
        let mut map = TileMap::default();
        map.tile_size = 8.0;
        map.z_index = -2;
        for i in 0..500 {
            let (x, y) = ((i % 64) as i32, (i / 64) as i32);
            map.set_tile(x, y, Some(tiles[i % 3].clone()));
        }

        let payload = encode_packed(&map);

        // The binary header must carry exactly three palette entries and
        // per-chunk counts summing to the populated cell count.
        let bytes = BASE64.decode(&payload).unwrap();
        let mut r = ByteReader::new(&bytes);
        assert_eq!(r.get_f32().unwrap(), 8.0);
        assert_eq!(r.get_i32().unwrap(), -2);
        let palette_len = r.get_i32().unwrap();
        assert_eq!(palette_len, 3);
        for _ in 0..palette_len {
            r.get_str().unwrap();
            r.get_str().unwrap();
            r.get_u8().unwrap();
            r.get_u8().unwrap();
        }
        let chunk_count = r.get_i32().unwrap();
        let mut total = 0;
        for _ in 0..chunk_count {
            r.get_i32().unwrap();
            r.get_i32().unwrap();
            let count = r.get_i32().unwrap();
            total += count;
            for _ in 0..count {
                r.get_u8().unwrap();
                r.get_u8().unwrap();
                r.get_i32().unwrap();
            }
        }
        assert_eq!(total, 500);
        assert!(r.is_empty());

        let mut back = TileMap::default();
        decode_packed(&mut back, &payload, &assets).unwrap();
        assert_eq!(back.tile_size, 8.0);
        assert_eq!(back.z_index, -2);
        assert_same_grid(&map, &back);
    }

    #[test]
    fn test_structurally_equal_tiles_share_a_palette_entry() {
        let assets = server();
        let mut map = TileMap::default();
        // Two separately constructed but equal tiles.
        map.set_tile(0, 0, Some(tile(&assets, "grass", "tiles/grass.png", false)));
        map.set_tile(1, 0, Some(tile(&assets, "grass", "tiles/grass.png", false)));

        let bytes = BASE64.decode(encode_packed(&map)).unwrap();
        let mut r = ByteReader::new(&bytes);
        r.get_f32().unwrap();
        r.get_i32().unwrap();
        assert_eq!(r.get_i32().unwrap(), 1);
    }

    #[test]
    fn test_encode_is_byte_stable_across_insertion_order() {
        let assets = server();
        let grass = tile(&assets, "grass", "tiles/grass.png", false);
        let wall = tile(&assets, "wall", "tiles/wall.png", true);

        let mut a = TileMap::default();
        a.set_tile(0, 0, Some(grass.clone()));
        a.set_tile(40, 40, Some(wall.clone()));

        let mut b = TileMap::default();
        b.set_tile(40, 40, Some(wall));
        b.set_tile(0, 0, Some(grass));

        assert_eq!(encode_packed(&a), encode_packed(&b));
    }

    #[test]
    fn test_cleared_chunk_is_not_emitted() {
        let mut map = TileMap::default();
        let t = Arc::new(Tile::new("t"));
        map.set_tile(0, 0, Some(t.clone()));
        map.set_tile(100, 100, Some(t));
        map.set_tile(100, 100, None);

        let assets = server();
        let mut back = TileMap::default();
        decode_packed(&mut back, &encode_packed(&map), &assets).unwrap();
        assert_eq!(back.chunks().len(), 1);
        assert_eq!(back.populated_count(), 1);
    }

    #[test]
    fn test_decode_rejects_corrupt_payloads() {
        let assets = server();

        let mut map = TileMap::default();
        assert!(matches!(
            decode_packed(&mut map, "not-base64!!!", &assets),
            Err(CodecError::MalformedTilePayload { .. })
        ));

        // Truncated stream.
        let mut good = TileMap::default();
        good.set_tile(0, 0, Some(Arc::new(Tile::new("t"))));
        let bytes = BASE64.decode(encode_packed(&good)).unwrap();
        let truncated = BASE64.encode(&bytes[..bytes.len() - 3]);
        let mut map = TileMap::default();
        assert!(matches!(
            decode_packed(&mut map, &truncated, &assets),
            Err(CodecError::MalformedTilePayload { .. })
        ));

        // Palette index out of range: flip the cell's index bytes.
        let mut bad = bytes.clone();
        let n = bad.len();
        bad[n - 4..].copy_from_slice(&99i32.to_be_bytes());
        let mut map = TileMap::default();
        assert!(matches!(
            decode_packed(&mut map, &BASE64.encode(&bad), &assets),
            Err(CodecError::MalformedTilePayload { .. })
        ));
    }

    #[test]
    fn test_missing_sprite_loads_as_bare_tile() {
        let assets = server();
        let mut map = TileMap::default();
        map.set_tile(
            0,
            0,
            Some(Arc::new(Tile {
                name: "gone".to_string(),
                sprite: Some(
                    crate::asset::AssetHandle::tracked(
                        "tiles/deleted.png",
                        AssetData::Sprite {
                            texture: "tiles/deleted.png".to_string(),
                            x: 0,
                            y: 0,
                            width: 16,
                            height: 16,
                        },
                    ),
                ),
                solid: true,
                ledge: LedgeDirection::None,
            })),
        );

        let mut back = TileMap::default();
        decode_packed(&mut back, &encode_packed(&map), &assets).unwrap();
        let t = back.tile_at(0, 0).unwrap();
        assert_eq!(t.name, "gone");
        assert!(t.sprite.is_none());
        assert!(t.solid);
    }

    #[test]
    fn test_legacy_decode_and_interning() {
        let assets = server();
        let doc = json!({
            "tileSize": 24.0,
            "zIndex": 3,
            "chunks": {
                "0,0": {
                    "0,0": {"name": "grass", "sprite": "tiles/grass.png", "solid": false, "ledge": "NONE"},
                    "1,0": {"name": "grass", "sprite": "tiles/grass.png", "solid": false, "ledge": "NONE"},
                    "2,0": {"name": "wall", "sprite": "tiles/wall.png", "solid": true, "ledge": "UP"}
                },
                "-1,0": {
                    "31,5": {"name": "void", "solid": true}
                }
            }
        });

        let mut map = TileMap::default();
        decode_legacy(&mut map, &doc, &assets).unwrap();

        assert_eq!(map.tile_size, 24.0);
        assert_eq!(map.z_index, 3);
        assert_eq!(map.populated_count(), 4);
        assert_eq!(map.tile_at(2, 0).unwrap().ledge, LedgeDirection::Up);
        assert!(map.tile_at(-1, 5).unwrap().solid);
        assert!(map.tile_at(-1, 5).unwrap().sprite.is_none());

        // Equal cells collapse to one shared tile.
        let a = map.tile_at(0, 0).unwrap();
        let b = map.tile_at(1, 0).unwrap();
        assert!(Arc::ptr_eq(a, b));
    }

    #[test]
    fn test_legacy_rejects_bad_keys_and_bounds() {
        let assets = server();

        let mut map = TileMap::default();
        let doc = json!({"chunks": {"zero,zero": {}}});
        assert!(matches!(
            decode_legacy(&mut map, &doc, &assets),
            Err(CodecError::MalformedTilePayload { .. })
        ));

        let mut map = TileMap::default();
        let doc = json!({"chunks": {"0,0": {"32,0": {"name": "t"}}}});
        assert!(matches!(
            decode_legacy(&mut map, &doc, &assets),
            Err(CodecError::MalformedTilePayload { .. })
        ));
    }

    #[test]
    fn test_legacy_then_packed_round_trip() {
        let assets = server();
        let doc = json!({
            "tileSize": 16.0,
            "zIndex": 0,
            "chunks": {
                "0,0": {
                    "3,4": {"name": "wall", "sprite": "tiles/wall.png", "solid": true, "ledge": "LEFT"}
                }
            }
        });

        let mut legacy = TileMap::default();
        decode_legacy(&mut legacy, &doc, &assets).unwrap();

        let mut packed = TileMap::default();
        decode_packed(&mut packed, &encode_packed(&legacy), &assets).unwrap();
        assert_same_grid(&legacy, &packed);
    }
}
