//! Persistence backend contract.
//!
//! The engine treats durable storage as an external collaborator behind
//! a narrow row-oriented interface: schema DDL, single-row durable
//! writes, full scans for index rebuild, and table drop. Any relational
//! or document database can sit behind this trait via an adapter; the
//! in-tree implementations are [`memory::MemoryBackend`] and the
//! append-only [`log::LogBackend`].

pub mod log;
pub mod memory;

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Column type in a table schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    /// Fixed-length binary, e.g. a 16-byte record id.
    Binary { length: usize },
    /// JSON text.
    Json,
    /// Fixed-length float sequence.
    Vector { length: usize },
}

/// A column in a table schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub ty: ColumnType,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, ty: ColumnType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// A native vector index the backend may build over one column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorIndexSpec {
    pub name: String,
    pub column: String,
}

/// Schema of one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSpec {
    pub name: String,
    pub columns: Vec<ColumnSpec>,
    pub primary_key: Vec<String>,
    pub vector_index: Option<VectorIndexSpec>,
}

/// A single column value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColumnValue {
    Binary(Vec<u8>),
    Json(String),
    Vector(Vec<f32>),
}

/// One row: column name to value.
pub type Row = BTreeMap<String, ColumnValue>;

/// Durable storage consumed by the store engine.
///
/// Handles are shared across calls and must be safe for concurrent use;
/// implementations own their interior locking. A durable call that
/// exceeds the implementation's deadline surfaces as
/// `StoreError::BackendTimeout` — the engine never retries on its own.
pub trait PersistenceBackend: Send + Sync {
    /// Create a table. Fails if a table with the same name exists.
    fn create_table(&self, spec: &TableSpec) -> Result<()>;

    /// Return the schema of an existing table, or `None` if absent.
    fn describe_table(&self, name: &str) -> Result<Option<TableSpec>>;

    /// Write one row durably. Rows share the table's primary key;
    /// writing an existing key replaces the row (last write wins).
    fn insert_row(&self, table: &str, row: Row) -> Result<()>;

    /// Read every row of a table, in unspecified order.
    fn scan_all(&self, table: &str) -> Result<Vec<Row>>;

    /// Drop a table and its rows. Fails with `NotFound` if absent.
    fn drop_table(&self, name: &str) -> Result<()>;
}

/// Extract the primary-key bytes of a row under the given spec.
/// Used by backends to key rows for last-write-wins semantics.
pub(crate) fn primary_key_bytes(spec: &TableSpec, row: &Row) -> Option<Vec<u8>> {
    let mut key = Vec::new();
    for col in &spec.primary_key {
        match row.get(col)? {
            ColumnValue::Binary(bytes) => key.extend_from_slice(bytes),
            ColumnValue::Json(text) => key.extend_from_slice(text.as_bytes()),
            ColumnValue::Vector(data) => {
                for v in data {
                    key.extend_from_slice(&v.to_le_bytes());
                }
            }
        }
    }
    Some(key)
}
