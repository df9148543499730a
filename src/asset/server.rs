//! Asset server - path↔object resolution with a shared cache
//!
//! The codec never touches disk for assets. It asks the server to turn a
//! path into a handle (`load`) or a handle into a path (`path_for`); the
//! actual fetch goes through an injected [`AssetLoader`]. Loaded handles
//! are cached so every field referencing the same path gets the same
//! instance within a session.
//!
//! The cache is behind a `RwLock`, so one server can back scene loads
//! running on separate worker threads.

use std::collections::HashMap;

use parking_lot::RwLock;

use super::{AssetData, AssetHandle, AssetKind};
use crate::error::CodecError;

/// Source of asset data, injected into the [`AssetServer`]
///
/// Returning None means the path does not resolve; the server turns that
/// into an `AssetNotFound` error rather than inventing a placeholder.
pub trait AssetLoader: Send + Sync {
    fn load(&self, kind: AssetKind, path: &str) -> Option<AssetData>;
}

/// Process-wide asset resolution service
pub struct AssetServer {
    loader: Box<dyn AssetLoader>,
    cache: RwLock<HashMap<(AssetKind, String), AssetHandle>>,
}

impl AssetServer {
    pub fn new(loader: Box<dyn AssetLoader>) -> Self {
        Self {
            loader,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// The stable path for a value, or None if it is not a tracked asset.
    ///
    /// None means "serialize inline or as a primitive" — the codec must
    /// never emit path form for an untracked value.
    pub fn path_for<'a>(&self, handle: &'a AssetHandle) -> Option<&'a str> {
        handle.path()
    }

    /// Load an asset by path, preferring the cached instance.
    ///
    /// Repeated loads of the same `(kind, path)` return the same handle so
    /// reference identity is preserved across fields. A path the loader
    /// cannot resolve, or that resolves to data of the wrong kind, fails
    /// with `AssetNotFound` naming the path and the expected kind.
    pub fn load(&self, kind: AssetKind, path: &str) -> Result<AssetHandle, CodecError> {
        if let Some(handle) = self.cache.read().get(&(kind, path.to_string())) {
            return Ok(handle.clone());
        }

        let data = self
            .loader
            .load(kind, path)
            .ok_or_else(|| CodecError::AssetNotFound {
                kind,
                path: path.to_string(),
            })?;
        if data.kind() != kind {
            return Err(CodecError::AssetNotFound {
                kind,
                path: path.to_string(),
            });
        }

        let mut cache = self.cache.write();
        // A racing load may have inserted in the meantime; keep its handle.
        let handle = cache
            .entry((kind, path.to_string()))
            .or_insert_with(|| AssetHandle::tracked(path, data))
            .clone();
        Ok(handle)
    }

    /// Register an already-constructed asset under a path.
    ///
    /// Subsequent `load` calls for the path return this handle.
    pub fn register(&self, path: impl Into<String>, data: AssetData) -> AssetHandle {
        let path = path.into();
        let handle = AssetHandle::tracked(path.clone(), data);
        self.cache
            .write()
            .insert((handle.kind(), path), handle.clone());
        handle
    }

    /// Number of cached assets
    pub fn cached_count(&self) -> usize {
        self.cache.read().len()
    }
}

/// In-memory asset source for tests and tooling
///
/// Pre-populate with `with`, then hand to an [`AssetServer`].
#[derive(Default)]
pub struct MemoryAssets {
    entries: HashMap<(AssetKind, String), AssetData>,
}

impl MemoryAssets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, path: impl Into<String>, data: AssetData) -> Self {
        self.entries.insert((data.kind(), path.into()), data);
        self
    }

    /// Wrap this source in a ready-to-use server
    pub fn into_server(self) -> AssetServer {
        AssetServer::new(Box::new(self))
    }
}

impl AssetLoader for MemoryAssets {
    fn load(&self, kind: AssetKind, path: &str) -> Option<AssetData> {
        self.entries.get(&(kind, path.to_string())).cloned()
    }
}
