//! In-process backend: tables in a shared map, no durability.
//!
//! Useful as an embedded store and as the test double for the engine.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use crate::backend::{primary_key_bytes, PersistenceBackend, Row, TableSpec};
use crate::error::{Result, StoreError};

#[derive(Debug)]
struct TableData {
    spec: TableSpec,
    /// Rows keyed by primary-key bytes; inserting an existing key
    /// replaces the row (last write wins).
    rows: BTreeMap<Vec<u8>, Row>,
}

/// An in-memory persistence backend.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    tables: RwLock<HashMap<String, TableData>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_poisoned() -> StoreError {
        StoreError::backend("memory backend lock poisoned")
    }
}

impl PersistenceBackend for MemoryBackend {
    fn create_table(&self, spec: &TableSpec) -> Result<()> {
        let mut tables = self.tables.write().map_err(|_| Self::lock_poisoned())?;
        if tables.contains_key(&spec.name) {
            return Err(StoreError::backend(format!(
                "table '{}' already exists",
                spec.name
            )));
        }
        tables.insert(
            spec.name.clone(),
            TableData {
                spec: spec.clone(),
                rows: BTreeMap::new(),
            },
        );
        Ok(())
    }

    fn describe_table(&self, name: &str) -> Result<Option<TableSpec>> {
        let tables = self.tables.read().map_err(|_| Self::lock_poisoned())?;
        Ok(tables.get(name).map(|t| t.spec.clone()))
    }

    fn insert_row(&self, table: &str, row: Row) -> Result<()> {
        let mut tables = self.tables.write().map_err(|_| Self::lock_poisoned())?;
        let data = tables.get_mut(table).ok_or_else(|| StoreError::NotFound {
            table: table.to_string(),
        })?;

        let key = primary_key_bytes(&data.spec, &row)
            .ok_or_else(|| StoreError::backend("row is missing its primary key column"))?;
        data.rows.insert(key, row);
        Ok(())
    }

    fn scan_all(&self, table: &str) -> Result<Vec<Row>> {
        let tables = self.tables.read().map_err(|_| Self::lock_poisoned())?;
        let data = tables.get(table).ok_or_else(|| StoreError::NotFound {
            table: table.to_string(),
        })?;
        Ok(data.rows.values().cloned().collect())
    }

    fn drop_table(&self, name: &str) -> Result<()> {
        let mut tables = self.tables.write().map_err(|_| Self::lock_poisoned())?;
        if tables.remove(name).is_none() {
            return Err(StoreError::NotFound {
                table: name.to_string(),
            });
        }
        Ok(())
    }
}
