//! Vector records: identifier, embedding, and opaque metadata.

use crate::vector::Vector;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 128-bit record identifier, stored binary as 16 bytes.
///
/// Ranking ties are broken by comparing the big-endian byte encoding,
/// so the derived `Ord` on the inner `Uuid` is exactly the order used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordId(Uuid);

impl RecordId {
    /// Generate a fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// The 16-byte binary encoding used by the persistence layer.
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }

    /// Reconstruct an identifier from its 16-byte binary encoding.
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for RecordId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// JSON metadata attached to a record. Opaque to the engine and
/// returned verbatim on query.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// An immutable vector-embedded document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    id: RecordId,
    embedding: Vector,
    metadata: Metadata,
}

impl VectorRecord {
    /// Create a record with metadata.
    pub fn new(id: RecordId, embedding: Vector, metadata: Metadata) -> Self {
        Self {
            id,
            embedding,
            metadata,
        }
    }

    /// Create a record with empty metadata.
    pub fn without_metadata(id: RecordId, embedding: Vector) -> Self {
        Self::new(id, embedding, Metadata::new())
    }

    pub fn id(&self) -> RecordId {
        self.id
    }

    pub fn embedding(&self) -> &Vector {
        &self.embedding
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }
}
