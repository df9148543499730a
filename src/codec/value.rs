//! General-purpose field value codec
//!
//! Converts between `FieldValue` and the document tree, driven by the
//! declared type from the descriptor table. Asset-typed values encode as
//! their `"<kind>:<path>"` wire form when tracked and as an inline object
//! when not; decode accepts both shapes.

use serde_json::Value;

use crate::asset::{parse_wire_ref, AssetData, AssetHandle, AssetServer};
use crate::component::{FieldType, FieldValue};
use crate::error::CodecError;

/// Why a single field value failed to decode
///
/// The two cases recover differently: a mismatch is a plain
/// `FieldDecodeError` (field keeps its default), while a missing asset is
/// reported as `AssetNotFound` with the path and kind.
#[derive(Debug)]
pub(crate) enum ValueError {
    Asset(CodecError),
    Mismatch(String),
}

/// Encode a field value into the document tree
pub fn encode_value(value: &FieldValue) -> Value {
    match value {
        FieldValue::Bool(b) => Value::Bool(*b),
        FieldValue::Int(i) => Value::from(*i),
        FieldValue::Float(x) => Value::from(*x),
        FieldValue::Str(s) => Value::String(s.clone()),
        FieldValue::Vec2(v) => Value::from(vec![v[0] as f64, v[1] as f64]),
        FieldValue::Color(c) => {
            Value::from(c.iter().map(|&x| x as f64).collect::<Vec<f64>>())
        }
        FieldValue::Asset(handle) => encode_asset(handle),
        FieldValue::List(items) => Value::from(
            items.iter().map(encode_value).collect::<Vec<Value>>(),
        ),
    }
}

/// Tracked assets emit the self-describing path form so decode knows both
/// the concrete asset kind and the path without guessing; untracked values
/// fall through to inline encoding.
fn encode_asset(handle: &AssetHandle) -> Value {
    match handle.wire_ref() {
        Some(wire) => Value::String(wire),
        None => serde_json::to_value(handle.data()).unwrap_or(Value::Null),
    }
}

/// Decode a document value into a field value of the declared type
pub(crate) fn decode_value(
    ty: FieldType,
    is_list: bool,
    doc: &Value,
    assets: &AssetServer,
) -> Result<FieldValue, ValueError> {
    if is_list {
        let items = doc
            .as_array()
            .ok_or_else(|| ValueError::Mismatch(format!("expected array, got {}", kind_of(doc))))?;
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            out.push(decode_scalar(ty, item, assets)?);
        }
        return Ok(FieldValue::List(out));
    }
    decode_scalar(ty, doc, assets)
}

fn decode_scalar(ty: FieldType, doc: &Value, assets: &AssetServer) -> Result<FieldValue, ValueError> {
    match ty {
        FieldType::Bool => doc
            .as_bool()
            .map(FieldValue::Bool)
            .ok_or_else(|| mismatch("bool", doc)),
        FieldType::Int => doc
            .as_i64()
            .map(FieldValue::Int)
            .ok_or_else(|| mismatch("int", doc)),
        FieldType::Float => doc
            .as_f64()
            .map(FieldValue::Float)
            .ok_or_else(|| mismatch("float", doc)),
        FieldType::Str => doc
            .as_str()
            .map(|s| FieldValue::Str(s.to_string()))
            .ok_or_else(|| mismatch("string", doc)),
        FieldType::Vec2 => {
            let parts = float_array(doc, 2).ok_or_else(|| mismatch("vec2", doc))?;
            Ok(FieldValue::Vec2([parts[0] as f32, parts[1] as f32]))
        }
        FieldType::Color => {
            let parts = float_array(doc, 4).ok_or_else(|| mismatch("color", doc))?;
            Ok(FieldValue::Color([
                parts[0] as f32,
                parts[1] as f32,
                parts[2] as f32,
                parts[3] as f32,
            ]))
        }
        FieldType::Asset(declared) => match doc {
            Value::String(s) => {
                // The wire form names the runtime kind; trust it over the
                // declared one so asset subtypes survive.
                let (kind, path) = parse_wire_ref(s).ok_or_else(|| {
                    ValueError::Mismatch(format!(
                        "expected '{}' asset reference, got '{}'",
                        declared.tag(),
                        s
                    ))
                })?;
                assets
                    .load(kind, path)
                    .map(FieldValue::Asset)
                    .map_err(ValueError::Asset)
            }
            Value::Object(_) => {
                let data: AssetData = serde_json::from_value(doc.clone())
                    .map_err(|e| ValueError::Mismatch(format!("bad inline asset: {}", e)))?;
                Ok(FieldValue::Asset(AssetHandle::untracked(data)))
            }
            other => Err(mismatch("asset", other)),
        },
    }
}

fn float_array(doc: &Value, len: usize) -> Option<Vec<f64>> {
    let arr = doc.as_array()?;
    if arr.len() != len {
        return None;
    }
    arr.iter().map(|v| v.as_f64()).collect()
}

fn mismatch(expected: &str, got: &Value) -> ValueError {
    ValueError::Mismatch(format!("expected {}, got {}", expected, kind_of(got)))
}

fn kind_of(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::{AssetKind, MemoryAssets};
    use serde_json::json;

    fn server() -> AssetServer {
        MemoryAssets::new()
            .with(
                "sprites/a.png",
                AssetData::Sprite {
                    texture: "sprites/a.png".to_string(),
                    x: 0,
                    y: 0,
                    width: 8,
                    height: 8,
                },
            )
            .into_server()
    }

    #[test]
    fn test_scalar_round_trips() {
        let assets = server();
        let cases = vec![
            (FieldType::Bool, FieldValue::Bool(true)),
            (FieldType::Int, FieldValue::Int(-7)),
            (FieldType::Float, FieldValue::Float(2.5)),
            (FieldType::Str, FieldValue::Str("hi".to_string())),
            (FieldType::Vec2, FieldValue::Vec2([1.0, -3.5])),
            (FieldType::Color, FieldValue::Color([0.5, 0.25, 1.0, 1.0])),
        ];
        for (ty, value) in cases {
            let doc = encode_value(&value);
            let back = decode_value(ty, false, &doc, &assets)
                .unwrap_or_else(|_| panic!("decode failed for {:?}", value));
            assert_eq!(back, value);
        }
    }

    #[test]
    fn test_int_accepted_as_float() {
        let assets = server();
        let v = decode_value(FieldType::Float, false, &json!(3), &assets).unwrap();
        assert_eq!(v, FieldValue::Float(3.0));
    }

    #[test]
    fn test_tracked_asset_encodes_as_path_form() {
        let assets = server();
        let handle = assets.load(AssetKind::Sprite, "sprites/a.png").unwrap();
        let doc = encode_value(&FieldValue::Asset(handle.clone()));
        assert_eq!(doc, json!("sprite:sprites/a.png"));

        let back = decode_value(
            FieldType::Asset(AssetKind::Sprite),
            false,
            &doc,
            &assets,
        )
        .unwrap();
        assert_eq!(back, FieldValue::Asset(handle));
    }

    #[test]
    fn test_untracked_asset_encodes_inline() {
        let assets = server();
        let data = AssetData::Dialogue {
            lines: vec!["hey".to_string()],
        };
        let handle = AssetHandle::untracked(data.clone());
        let doc = encode_value(&FieldValue::Asset(handle));
        assert!(doc.is_object());

        let back = decode_value(
            FieldType::Asset(AssetKind::Dialogue),
            false,
            &doc,
            &assets,
        )
        .unwrap();
        match back {
            FieldValue::Asset(h) => {
                assert!(h.path().is_none());
                assert_eq!(h.data(), &data);
            }
            other => panic!("expected asset, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_asset_is_distinct_from_mismatch() {
        let assets = server();
        let err = decode_value(
            FieldType::Asset(AssetKind::Sprite),
            false,
            &json!("sprite:sprites/missing.png"),
            &assets,
        )
        .unwrap_err();
        assert!(matches!(err, ValueError::Asset(CodecError::AssetNotFound { .. })));

        let err = decode_value(FieldType::Int, false, &json!("nope"), &assets).unwrap_err();
        assert!(matches!(err, ValueError::Mismatch(_)));
    }

    #[test]
    fn test_list_decode() {
        let assets = server();
        let doc = json!(["sprite:sprites/a.png", "sprite:sprites/a.png"]);
        let v = decode_value(
            FieldType::Asset(AssetKind::Sprite),
            true,
            &doc,
            &assets,
        )
        .unwrap();
        match v {
            FieldValue::List(items) => assert_eq!(items.len(), 2),
            other => panic!("expected list, got {:?}", other),
        }
    }
}
