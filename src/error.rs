//! Error types for scene encoding and decoding
//!
//! Decode errors come in two severities:
//! - Fatal for the single component being decoded (`MissingTypeTag`,
//!   `UnknownTypeTag`, `AmbiguousTypeTag`, `MalformedTilePayload`). The
//!   component is skipped and reported; the rest of the document still loads.
//! - Recovered locally (`FieldDecodeError`, `AssetNotFound` on an optional
//!   field): the field keeps its default and the error is logged.
//!
//! Every fatal error carries the component type tag (and the original
//! un-migrated tag where one was attempted) so the data or the migration
//! table can be repaired instead of failing silently.

use crate::asset::AssetKind;

/// Error type for scene codec operations
#[derive(Debug, Clone)]
pub enum CodecError {
    /// File I/O error
    Io(String),
    /// Document is not valid JSON or has the wrong overall shape
    Parse(String),
    /// A component node has no `type` tag
    MissingTypeTag {
        /// Name of the object the node was attached to
        object: String,
    },
    /// Type resolution exhausted exact match, migration, and simple-name fallback
    UnknownTypeTag {
        /// The tag as it appeared in the document
        tag: String,
        /// The tag the migration table pointed at, if a migration was attempted
        migrated: Option<String>,
        /// Registered tags whose simple name was considered in the fallback
        candidates: Vec<String>,
    },
    /// The simple-name fallback matched more than one registered type
    AmbiguousTypeTag {
        /// The tag as it appeared in the document
        tag: String,
        /// All registered tags sharing the simple name
        matches: Vec<String>,
    },
    /// An asset path could not be resolved by the asset server
    AssetNotFound {
        /// Expected asset kind
        kind: AssetKind,
        /// The path that failed to resolve
        path: String,
    },
    /// Tile payload header/length/index inconsistency (packed or legacy form)
    MalformedTilePayload {
        /// Type tag of the owning component
        component: String,
        detail: String,
    },
    /// A generic field value did not match its declared type
    FieldDecodeError {
        /// Type tag of the owning component
        component: String,
        field: String,
        detail: String,
    },
}

impl std::fmt::Display for CodecError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CodecError::Io(msg) => write!(f, "I/O error: {}", msg),
            CodecError::Parse(msg) => write!(f, "Parse error: {}", msg),
            CodecError::MissingTypeTag { object } => {
                write!(f, "component node on object '{}' has no type tag", object)
            }
            CodecError::UnknownTypeTag { tag, migrated, candidates } => {
                write!(f, "unknown component type '{}'", tag)?;
                if let Some(m) = migrated {
                    write!(f, " (migration to '{}' also failed)", m)?;
                }
                if !candidates.is_empty() {
                    write!(f, " (simple-name candidates: {})", candidates.join(", "))?;
                }
                Ok(())
            }
            CodecError::AmbiguousTypeTag { tag, matches } => write!(
                f,
                "component type '{}' is ambiguous by simple name: matches {}",
                tag,
                matches.join(", ")
            ),
            CodecError::AssetNotFound { kind, path } => {
                write!(f, "{} asset not found: '{}'", kind.tag(), path)
            }
            CodecError::MalformedTilePayload { component, detail } => {
                write!(f, "malformed tile payload in '{}': {}", component, detail)
            }
            CodecError::FieldDecodeError { component, field, detail } => {
                write!(f, "cannot decode field '{}.{}': {}", component, field, detail)
            }
        }
    }
}

impl std::error::Error for CodecError {}

impl From<std::io::Error> for CodecError {
    fn from(e: std::io::Error) -> Self {
        CodecError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for CodecError {
    fn from(e: serde_json::Error) -> Self {
        CodecError::Parse(e.to_string())
    }
}

impl CodecError {
    /// True if this error aborts the enclosing component entirely.
    ///
    /// Non-fatal errors are recovered field-by-field: the field keeps its
    /// default and decoding of sibling fields continues.
    pub fn is_fatal_for_component(&self) -> bool {
        matches!(
            self,
            CodecError::MissingTypeTag { .. }
                | CodecError::UnknownTypeTag { .. }
                | CodecError::AmbiguousTypeTag { .. }
                | CodecError::MalformedTilePayload { .. }
        )
    }
}
