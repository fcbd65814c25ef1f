//! Durable append-only log backend.
//!
//! Every mutation is one framed entry: [length: u32][crc32: u32][bincode
//! payload], fsynced before the call returns. On open the log is
//! replayed to rebuild table state; replay stops at the first torn or
//! corrupt entry, so a crash mid-write loses at most the entry being
//! written.

use std::collections::{BTreeMap, HashMap};
use std::fs::{File, OpenOptions};
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::backend::{primary_key_bytes, PersistenceBackend, Row, TableSpec};
use crate::error::{Result, StoreError};

/// A single log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
enum LogEntry {
    CreateTable(TableSpec),
    InsertRow { table: String, row: Row },
    DropTable(String),
}

#[derive(Debug)]
struct TableData {
    spec: TableSpec,
    rows: BTreeMap<Vec<u8>, Row>,
}

struct Inner {
    file: File,
    tables: HashMap<String, TableData>,
}

/// Persistence backend writing all mutations to one append-only log file.
pub struct LogBackend {
    path: PathBuf,
    inner: Mutex<Inner>,
}

impl LogBackend {
    /// Open (or create) a log-backed store at the given path, replaying
    /// any existing entries.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        let mut tables = HashMap::new();
        for entry in Self::replay(&path)? {
            Self::apply(&mut tables, entry);
        }

        Ok(Self {
            path,
            inner: Mutex::new(Inner { file, tables }),
        })
    }

    /// Read all valid entries from the log, stopping at the first
    /// truncated or corrupted one.
    fn replay(path: &Path) -> Result<Vec<LogEntry>> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        let mut entries = Vec::new();

        loop {
            let mut len_buf = [0u8; 4];
            match reader.read_exact(&mut len_buf) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(StoreError::Io(e)),
            }
            let len = u32::from_le_bytes(len_buf) as usize;

            let mut crc_buf = [0u8; 4];
            if reader.read_exact(&mut crc_buf).is_err() {
                break; // truncated
            }
            let expected_crc = u32::from_le_bytes(crc_buf);

            let mut payload = vec![0u8; len];
            if reader.read_exact(&mut payload).is_err() {
                break; // truncated
            }

            if crc32fast::hash(&payload) != expected_crc {
                break; // corrupted
            }

            match bincode::deserialize::<LogEntry>(&payload) {
                Ok(entry) => entries.push(entry),
                Err(_) => break, // corrupted
            }
        }

        Ok(entries)
    }

    /// Apply an already-validated entry to the in-memory state.
    fn apply(tables: &mut HashMap<String, TableData>, entry: LogEntry) {
        match entry {
            LogEntry::CreateTable(spec) => {
                tables.insert(
                    spec.name.clone(),
                    TableData {
                        spec,
                        rows: BTreeMap::new(),
                    },
                );
            }
            LogEntry::InsertRow { table, row } => {
                if let Some(data) = tables.get_mut(&table) {
                    if let Some(key) = primary_key_bytes(&data.spec, &row) {
                        data.rows.insert(key, row);
                    }
                }
            }
            LogEntry::DropTable(name) => {
                tables.remove(&name);
            }
        }
    }

    /// Append one entry and fsync.
    fn append(file: &mut File, entry: &LogEntry) -> Result<()> {
        let payload =
            bincode::serialize(entry).map_err(|e| StoreError::Serialization(e.to_string()))?;
        let crc = crc32fast::hash(&payload);
        let len = payload.len() as u32;

        file.write_all(&len.to_le_bytes())?;
        file.write_all(&crc.to_le_bytes())?;
        file.write_all(&payload)?;
        file.sync_all()?;
        Ok(())
    }

    /// Path of the underlying log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_poisoned() -> StoreError {
        StoreError::backend("log backend lock poisoned")
    }
}

impl PersistenceBackend for LogBackend {
    fn create_table(&self, spec: &TableSpec) -> Result<()> {
        let mut inner = self.inner.lock().map_err(|_| Self::lock_poisoned())?;
        if inner.tables.contains_key(&spec.name) {
            return Err(StoreError::backend(format!(
                "table '{}' already exists",
                spec.name
            )));
        }
        Self::append(&mut inner.file, &LogEntry::CreateTable(spec.clone()))?;
        Self::apply(&mut inner.tables, LogEntry::CreateTable(spec.clone()));
        Ok(())
    }

    fn describe_table(&self, name: &str) -> Result<Option<TableSpec>> {
        let inner = self.inner.lock().map_err(|_| Self::lock_poisoned())?;
        Ok(inner.tables.get(name).map(|t| t.spec.clone()))
    }

    fn insert_row(&self, table: &str, row: Row) -> Result<()> {
        let mut inner = self.inner.lock().map_err(|_| Self::lock_poisoned())?;
        let data = inner.tables.get(table).ok_or_else(|| StoreError::NotFound {
            table: table.to_string(),
        })?;
        if primary_key_bytes(&data.spec, &row).is_none() {
            return Err(StoreError::backend("row is missing its primary key column"));
        }

        let entry = LogEntry::InsertRow {
            table: table.to_string(),
            row,
        };
        Self::append(&mut inner.file, &entry)?;
        Self::apply(&mut inner.tables, entry);
        Ok(())
    }

    fn scan_all(&self, table: &str) -> Result<Vec<Row>> {
        let inner = self.inner.lock().map_err(|_| Self::lock_poisoned())?;
        let data = inner.tables.get(table).ok_or_else(|| StoreError::NotFound {
            table: table.to_string(),
        })?;
        Ok(data.rows.values().cloned().collect())
    }

    fn drop_table(&self, name: &str) -> Result<()> {
        let mut inner = self.inner.lock().map_err(|_| Self::lock_poisoned())?;
        if !inner.tables.contains_key(name) {
            return Err(StoreError::NotFound {
                table: name.to_string(),
            });
        }
        Self::append(&mut inner.file, &LogEntry::DropTable(name.to_string()))?;
        Self::apply(&mut inner.tables, LogEntry::DropTable(name.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{ColumnSpec, ColumnType, ColumnValue};
    use tempfile::TempDir;

    fn spec(name: &str) -> TableSpec {
        TableSpec {
            name: name.to_string(),
            columns: vec![
                ColumnSpec::new("id", ColumnType::Binary { length: 16 }),
                ColumnSpec::new("metadata", ColumnType::Json),
                ColumnSpec::new("embedding", ColumnType::Vector { length: 2 }),
            ],
            primary_key: vec!["id".to_string()],
            vector_index: None,
        }
    }

    fn row(id: u8, embedding: Vec<f32>) -> Row {
        let mut row = Row::new();
        row.insert("id".to_string(), ColumnValue::Binary(vec![id; 16]));
        row.insert("metadata".to_string(), ColumnValue::Json("{}".to_string()));
        row.insert("embedding".to_string(), ColumnValue::Vector(embedding));
        row
    }

    #[test]
    fn test_replay_after_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.log");

        {
            let backend = LogBackend::open(&path).unwrap();
            backend.create_table(&spec("docs")).unwrap();
            backend.insert_row("docs", row(1, vec![1.0, 0.0])).unwrap();
            backend.insert_row("docs", row(2, vec![0.0, 1.0])).unwrap();
        }

        let backend = LogBackend::open(&path).unwrap();
        assert_eq!(backend.describe_table("docs").unwrap(), Some(spec("docs")));
        assert_eq!(backend.scan_all("docs").unwrap().len(), 2);
    }

    #[test]
    fn test_torn_tail_is_ignored() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.log");

        {
            let backend = LogBackend::open(&path).unwrap();
            backend.create_table(&spec("docs")).unwrap();
            backend.insert_row("docs", row(1, vec![1.0, 0.0])).unwrap();
        }

        // Garbage tail simulates a crash mid-write
        {
            let mut file = OpenOptions::new().append(true).open(&path).unwrap();
            file.write_all(&[0xFF, 0xFF, 0xFF]).unwrap();
        }

        let backend = LogBackend::open(&path).unwrap();
        assert_eq!(backend.scan_all("docs").unwrap().len(), 1);
    }

    #[test]
    fn test_drop_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.log");

        {
            let backend = LogBackend::open(&path).unwrap();
            backend.create_table(&spec("docs")).unwrap();
            backend.drop_table("docs").unwrap();
        }

        let backend = LogBackend::open(&path).unwrap();
        assert!(backend.describe_table("docs").unwrap().is_none());
    }

    #[test]
    fn test_same_key_last_write_wins_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.log");

        {
            let backend = LogBackend::open(&path).unwrap();
            backend.create_table(&spec("docs")).unwrap();
            backend.insert_row("docs", row(1, vec![1.0, 0.0])).unwrap();
            backend.insert_row("docs", row(1, vec![0.5, 0.5])).unwrap();
        }

        let backend = LogBackend::open(&path).unwrap();
        let rows = backend.scan_all("docs").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["embedding"], ColumnValue::Vector(vec![0.5, 0.5]));
    }
}
