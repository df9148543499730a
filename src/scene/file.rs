//! Scene files on disk
//!
//! Saved scenes are pretty-printed JSON run through brotli. Loading
//! sniffs the first byte: `{` (or leading whitespace) means a plain
//! uncompressed document, anything else is decompressed first — so
//! hand-edited files and files from before compression both load.

use std::fs;
use std::io::{Read, Write};
use std::path::Path;

use crate::codec::{LoadReport, SceneCodec};
use crate::error::CodecError;

use super::Scene;

const BROTLI_BUFFER: usize = 4096;
const BROTLI_QUALITY: u32 = 6;
const BROTLI_LGWIN: u32 = 22;

/// Serialize a scene to compressed bytes
pub fn serialize_scene(codec: &SceneCodec<'_>, scene: &Scene) -> Result<Vec<u8>, CodecError> {
    let json = serde_json::to_string_pretty(&codec.encode_scene(scene))?;

    let mut out = Vec::new();
    {
        let mut writer =
            brotli::CompressorWriter::new(&mut out, BROTLI_BUFFER, BROTLI_QUALITY, BROTLI_LGWIN);
        writer.write_all(json.as_bytes())?;
    }
    Ok(out)
}

/// Serialize and write a scene to a file
pub fn save_scene(
    codec: &SceneCodec<'_>,
    scene: &Scene,
    path: impl AsRef<Path>,
) -> Result<(), CodecError> {
    let bytes = serialize_scene(codec, scene)?;
    fs::write(path, bytes)?;
    Ok(())
}

/// Decode a scene from bytes, compressed or plain
pub fn parse_scene_bytes(
    codec: &SceneCodec<'_>,
    bytes: &[u8],
) -> Result<(Scene, LoadReport), CodecError> {
    let plain = match bytes.first() {
        Some(b) if *b == b'{' || b.is_ascii_whitespace() => bytes.to_vec(),
        Some(_) => {
            let mut decompressed = Vec::new();
            brotli::Decompressor::new(bytes, BROTLI_BUFFER).read_to_end(&mut decompressed)?;
            decompressed
        }
        None => return Err(CodecError::Parse("empty scene file".to_string())),
    };

    let doc = serde_json::from_slice(&plain)?;
    codec.decode_scene(&doc)
}

/// Read and decode a scene file
pub fn load_scene(
    codec: &SceneCodec<'_>,
    path: impl AsRef<Path>,
) -> Result<(Scene, LoadReport), CodecError> {
    let bytes = fs::read(path)?;
    parse_scene_bytes(codec, &bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::MemoryAssets;
    use crate::component::builtin::{Collider, Transform};
    use crate::component::builtin_registry;

    fn sample_scene() -> Scene {
        let mut scene = Scene::new("save_test");
        let root = scene.spawn("root", None);
        let mut transform = Transform::default();
        transform.position = [7.0, -3.0];
        scene.attach(root, Box::new(transform));
        let child = scene.spawn("child", Some(root));
        scene.attach(child, Box::new(Collider::default()));
        scene
    }

    #[test]
    fn test_file_round_trip() {
        let assets = MemoryAssets::new().into_server();
        let codec = SceneCodec::new(builtin_registry(), &assets);
        let scene = sample_scene();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.scn");
        save_scene(&codec, &scene, &path).unwrap();

        let (back, report) = load_scene(&codec, &path).unwrap();
        assert!(report.is_clean());
        assert_eq!(back.name, "save_test");
        assert_eq!(back.object_count(), 2);

        let root = back.roots()[0];
        let transform = back
            .components_of(root)
            .find_map(|(id, _)| back.get::<Transform>(id))
            .unwrap();
        assert_eq!(transform.position, [7.0, -3.0]);
    }

    #[test]
    fn test_saved_bytes_are_compressed() {
        let assets = MemoryAssets::new().into_server();
        let codec = SceneCodec::new(builtin_registry(), &assets);
        let scene = sample_scene();

        let bytes = serialize_scene(&codec, &scene).unwrap();
        assert_ne!(bytes.first(), Some(&b'{'));
    }

    #[test]
    fn test_plain_json_still_loads() {
        let assets = MemoryAssets::new().into_server();
        let codec = SceneCodec::new(builtin_registry(), &assets);
        let scene = sample_scene();

        let json = serde_json::to_vec_pretty(&codec.encode_scene(&scene)).unwrap();
        let (back, report) = parse_scene_bytes(&codec, &json).unwrap();
        assert!(report.is_clean());
        assert_eq!(back.object_count(), 2);

        // Leading whitespace is still plain text.
        let mut padded = b"\n  ".to_vec();
        padded.extend_from_slice(&json);
        assert!(parse_scene_bytes(&codec, &padded).is_ok());
    }

    #[test]
    fn test_empty_file_is_a_parse_error() {
        let assets = MemoryAssets::new().into_server();
        let codec = SceneCodec::new(builtin_registry(), &assets);
        assert!(matches!(
            parse_scene_bytes(&codec, b""),
            Err(CodecError::Parse(_))
        ));
    }
}
