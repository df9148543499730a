//! scenebook - scene persistence for a 2D tile game
//!
//! Encodes a scene tree (objects, components, tile grids, asset and
//! component references) to a JSON document and back:
//!
//! - every component persists as a `{"type", "properties"}` node, driven
//!   by an explicit per-type descriptor table ([`component`])
//! - asset-valued fields persist as `"<kind>:<path>"` strings resolved
//!   through a caching [`asset::AssetServer`]
//! - renamed component types stay loadable via a migration table and a
//!   simple-name fallback ([`component::ComponentRegistry`])
//! - tile maps persist as one packed, palette-deduplicated base64 scalar,
//!   with the old per-cell JSON form still readable ([`codec::tilemap`])
//! - component-to-component references are re-wired in a second phase
//!   after the whole tree exists ([`codec::resolve_references`])
//!
//! ```no_run
//! use scenebook::asset::MemoryAssets;
//! use scenebook::component::builtin_registry;
//! use scenebook::codec::SceneCodec;
//! use scenebook::scene::{load_scene, save_scene};
//!
//! # fn main() -> Result<(), scenebook::CodecError> {
//! let assets = MemoryAssets::new().into_server();
//! let codec = SceneCodec::new(builtin_registry(), &assets);
//!
//! let (scene, report) = load_scene(&codec, "scenes/village.scn")?;
//! for skipped in &report.skipped {
//!     eprintln!("skipped: {}", skipped);
//! }
//! save_scene(&codec, &scene, "scenes/village.scn")?;
//! # Ok(())
//! # }
//! ```

pub mod asset;
pub mod codec;
pub mod component;
pub mod error;
pub mod scene;

pub use codec::{LoadReport, SceneCodec};
pub use error::CodecError;
pub use scene::{ComponentId, ObjectId, Scene};
