//! Store engine: orchestrates setup/add/query/drop against a
//! nearest-neighbor index and a persistence backend.

use std::collections::HashMap;
use std::sync::{Mutex, RwLock};

use tracing::{debug, info};

use crate::backend::{
    ColumnSpec, ColumnType, ColumnValue, PersistenceBackend, Row, TableSpec, VectorIndexSpec,
};
use crate::distance::DistanceMetric;
use crate::error::{Result, StoreError};
use crate::flat_index::FlatIndex;
use crate::hnsw::HnswIndex;
use crate::index::VectorIndex;
use crate::record::{Metadata, RecordId, VectorRecord};
use crate::vector::Vector;

const FIELD_ID: &str = "id";
const FIELD_METADATA: &str = "metadata";

/// Stripe count for per-id write serialization.
const WRITE_STRIPES: usize = 16;

/// Default embedding dimensionality.
pub const DEFAULT_DIMENSIONS: usize = 1536;
/// Default query result limit.
pub const DEFAULT_LIMIT: usize = 10;

/// Configuration of one store instance. Fixed at setup; changing
/// `dimensions` requires `drop()` followed by `setup()` (full rebuild).
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub dimensions: usize,
    pub metric: DistanceMetric,
    pub table_name: String,
    pub index_name: String,
    pub vector_column: String,
}

impl StoreConfig {
    /// Config with default dimensionality (1536) and cosine metric.
    pub fn new(
        table_name: impl Into<String>,
        index_name: impl Into<String>,
        vector_column: impl Into<String>,
    ) -> Self {
        Self {
            dimensions: DEFAULT_DIMENSIONS,
            metric: DistanceMetric::Cosine,
            table_name: table_name.into(),
            index_name: index_name.into(),
            vector_column: vector_column.into(),
        }
    }

    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = dimensions;
        self
    }

    pub fn with_metric(mut self, metric: DistanceMetric) -> Self {
        self.metric = metric;
        self
    }
}

/// Predicate over record metadata, applied before truncation.
pub type MetadataFilter = Box<dyn Fn(&Metadata) -> bool + Send + Sync>;

/// Options recognized by [`StoreEngine::query`].
pub struct QueryOptions {
    /// Maximum number of results, must be > 0.
    pub limit: usize,
    /// Drop results scoring below this threshold.
    pub min_score: Option<f32>,
    /// Keep only records whose metadata satisfies the predicate.
    pub filter: Option<MetadataFilter>,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            min_score: None,
            filter: None,
        }
    }
}

impl QueryOptions {
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }
}

/// One ranked query result.
#[derive(Debug, Clone)]
pub struct QueryMatch {
    pub record: VectorRecord,
    pub score: f32,
}

/// Per-record outcome of a batch add. The batch is not atomic: records
/// committed before a failure stay committed.
#[derive(Debug, Default)]
pub struct AddReport {
    committed: Vec<RecordId>,
    failures: Vec<(RecordId, StoreError)>,
}

impl AddReport {
    pub fn committed(&self) -> &[RecordId] {
        &self.committed
    }

    pub fn failures(&self) -> &[(RecordId, StoreError)] {
        &self.failures
    }

    /// Whether every record in the batch was committed.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Collapse into a Result, surfacing the first failure.
    pub fn into_result(mut self) -> Result<()> {
        if self.failures.is_empty() {
            Ok(())
        } else {
            Err(self.failures.remove(0).1)
        }
    }
}

/// In-memory state of an open table: the search index plus the
/// metadata needed to reconstruct full records on query.
struct TableState<I> {
    index: I,
    metadata: HashMap<RecordId, Metadata>,
}

/// The vector store engine.
///
/// Safe for concurrent `add`/`query` from multiple threads on a shared
/// instance. `setup`, `open`, and `drop` take the engine exclusively;
/// an `add` or `query` racing a `drop` either completes against the old
/// storage or fails with `NotFound`. Queries see a snapshot: an `add`
/// committed after the snapshot was taken may not be visible
/// (eventual visibility, not linearizable).
pub struct StoreEngine<I: VectorIndex, B: PersistenceBackend> {
    backend: B,
    config: StoreConfig,
    /// `None` until `setup` or `open` succeeds. The outer lock guards
    /// presence (exclusive for setup/open/drop); the inner lock guards
    /// index contents and is held only for in-memory reads and writes,
    /// never across a backend call issued by another caller.
    state: RwLock<Option<RwLock<TableState<I>>>>,
    /// Serializes same-id adds: the stripe for a record id is held
    /// across the durable write and the index update, so the backend
    /// and the index always agree on which write won. Unrelated ids
    /// land on other stripes and stay unblocked.
    write_stripes: Vec<Mutex<()>>,
}

impl<B: PersistenceBackend> StoreEngine<FlatIndex, B> {
    /// Engine with the exact brute-force index.
    pub fn with_flat_index(backend: B, config: StoreConfig) -> Self {
        Self::new(backend, config)
    }
}

impl<B: PersistenceBackend> StoreEngine<HnswIndex, B> {
    /// Engine with an approximate HNSW index using default parameters.
    pub fn with_hnsw_index(backend: B, config: StoreConfig) -> Self {
        Self::new(backend, config)
    }
}

impl<I: VectorIndex, B: PersistenceBackend> StoreEngine<I, B> {
    /// Create an engine over existing or to-be-created storage.
    /// No backend call is made until `setup` or `open`.
    pub fn new(backend: B, config: StoreConfig) -> Self {
        Self {
            backend,
            config,
            state: RwLock::new(None),
            write_stripes: (0..WRITE_STRIPES).map(|_| Mutex::new(())).collect(),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// The persistence backend this engine writes through.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn write_stripe(&self, id: RecordId) -> &Mutex<()> {
        let key = u128::from_be_bytes(*id.as_bytes());
        &self.write_stripes[(key % WRITE_STRIPES as u128) as usize]
    }

    pub fn metric(&self) -> DistanceMetric {
        self.config.metric
    }

    /// Number of records visible to queries.
    pub fn len(&self) -> usize {
        self.state
            .read()
            .ok()
            .and_then(|state| {
                state
                    .as_ref()
                    .and_then(|table| table.read().ok().map(|t| t.index.len()))
            })
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn table_spec(&self) -> Result<TableSpec> {
        if self.config.dimensions == 0 {
            return Err(StoreError::Configuration {
                reason: "dimensions must be a positive integer".to_string(),
            });
        }
        Ok(TableSpec {
            name: self.config.table_name.clone(),
            columns: vec![
                ColumnSpec::new(FIELD_ID, ColumnType::Binary { length: 16 }),
                ColumnSpec::new(FIELD_METADATA, ColumnType::Json),
                ColumnSpec::new(
                    self.config.vector_column.clone(),
                    ColumnType::Vector {
                        length: self.config.dimensions,
                    },
                ),
            ],
            primary_key: vec![FIELD_ID.to_string()],
            vector_index: Some(VectorIndexSpec {
                name: self.config.index_name.clone(),
                column: self.config.vector_column.clone(),
            }),
        })
    }

    fn empty_state(&self) -> TableState<I> {
        TableState {
            index: I::with_metric(self.config.metric),
            metadata: HashMap::new(),
        }
    }

    fn lock_poisoned() -> StoreError {
        StoreError::backend("engine lock poisoned")
    }

    fn not_found(&self) -> StoreError {
        StoreError::NotFound {
            table: self.config.table_name.clone(),
        }
    }

    /// Provision storage for the configured dimensionality.
    ///
    /// Idempotent in intent: an existing table with the exact same
    /// shape is accepted; any other existing shape fails with
    /// `SchemaConflict`.
    pub fn setup(&self) -> Result<()> {
        let spec = self.table_spec()?;
        let mut state = self.state.write().map_err(|_| Self::lock_poisoned())?;

        match self.backend.describe_table(&spec.name)? {
            Some(existing) if existing == spec => {}
            Some(_) => {
                return Err(StoreError::SchemaConflict {
                    table: spec.name,
                    reason: "existing table has an incompatible shape".to_string(),
                });
            }
            None => self.backend.create_table(&spec)?,
        }

        *state = Some(RwLock::new(self.empty_state()));
        info!(
            table = %self.config.table_name,
            dimensions = self.config.dimensions,
            "store set up"
        );
        Ok(())
    }

    /// Attach to existing storage and rebuild the index from it.
    ///
    /// The rebuild is blocking: `open` replays every persisted record
    /// before returning, so a query can never observe a half-built
    /// index.
    pub fn open(&self) -> Result<()> {
        let spec = self.table_spec()?;
        let mut state = self.state.write().map_err(|_| Self::lock_poisoned())?;

        match self.backend.describe_table(&spec.name)? {
            None => return Err(self.not_found()),
            Some(existing) if existing != spec => {
                return Err(StoreError::SchemaConflict {
                    table: spec.name,
                    reason: "existing table does not match the configured shape".to_string(),
                });
            }
            Some(_) => {}
        }

        let mut table = self.empty_state();
        let rows = self.backend.scan_all(&self.config.table_name)?;
        let count = rows.len();
        for row in rows {
            let record = self.decode_row(row)?;
            table.metadata.insert(record.id(), record.metadata().clone());
            table.index.insert(record.id(), record.embedding().clone())?;
        }

        *state = Some(RwLock::new(table));
        info!(
            table = %self.config.table_name,
            records = count,
            "index rebuilt from storage"
        );
        Ok(())
    }

    /// Persist records and make them searchable.
    ///
    /// Every embedding is validated against the configured
    /// dimensionality before any write; a mismatch fails the whole call
    /// with no side effects. After validation each record is one
    /// durable write followed by a short exclusive index update;
    /// backend failures are reported per record and earlier records
    /// stay committed. Adding an existing id replaces it (last write
    /// wins).
    pub fn add(&self, records: &[VectorRecord]) -> Result<AddReport> {
        let state = self.state.read().map_err(|_| Self::lock_poisoned())?;
        let table = state.as_ref().ok_or_else(|| self.not_found())?;

        // Fail fast, before any side effect
        for record in records {
            record.embedding().check_dimensions(self.config.dimensions)?;
        }

        let mut report = AddReport::default();
        for record in records {
            // Same-id adds must serialize: hold the id's stripe over
            // both the durable write and the index update.
            let _stripe = self
                .write_stripe(record.id())
                .lock()
                .map_err(|_| Self::lock_poisoned())?;
            let outcome = self
                .encode_row(record)
                .and_then(|row| self.backend.insert_row(&self.config.table_name, row));
            match outcome {
                Ok(()) => {
                    let mut inner = table.write().map_err(|_| Self::lock_poisoned())?;
                    inner.index.insert(record.id(), record.embedding().clone())?;
                    inner.metadata.insert(record.id(), record.metadata().clone());
                    report.committed.push(record.id());
                }
                Err(e) => report.failures.push((record.id(), e)),
            }
        }

        debug!(
            table = %self.config.table_name,
            committed = report.committed.len(),
            failed = report.failures.len(),
            "add batch finished"
        );
        Ok(report)
    }

    /// Rank stored records by similarity to `vector`.
    ///
    /// Results are best-first; exact score ties are ordered by
    /// ascending id byte value. An empty store yields an empty Vec.
    pub fn query(&self, vector: &Vector, options: QueryOptions) -> Result<Vec<QueryMatch>> {
        if options.limit == 0 {
            return Err(StoreError::Configuration {
                reason: "limit must be greater than zero".to_string(),
            });
        }

        let state = self.state.read().map_err(|_| Self::lock_poisoned())?;
        let table = state.as_ref().ok_or_else(|| self.not_found())?;
        vector.check_dimensions(self.config.dimensions)?;

        let inner = table.read().map_err(|_| Self::lock_poisoned())?;
        if inner.index.is_empty() {
            return Ok(vec![]);
        }

        // A metadata filter can reject arbitrarily many of the top k,
        // so it forces exhaustive ranking before filtering.
        let k = if options.filter.is_some() {
            inner.index.len()
        } else {
            options.limit
        };

        let ranked = inner.index.search(vector, k)?;
        let mut matches = Vec::with_capacity(options.limit.min(ranked.len()));
        for (id, score) in ranked {
            if matches.len() == options.limit {
                break;
            }
            if let Some(min) = options.min_score {
                if score < min {
                    break; // ranking is descending, the rest score lower
                }
            }

            let metadata = match inner.metadata.get(&id) {
                Some(m) => m,
                None => continue,
            };
            if let Some(filter) = &options.filter {
                if !filter(metadata) {
                    continue;
                }
            }
            let embedding = match inner.index.vector(id) {
                Some(v) => v.clone(),
                None => continue,
            };
            matches.push(QueryMatch {
                record: VectorRecord::new(id, embedding, metadata.clone()),
                score,
            });
        }

        debug!(
            table = %self.config.table_name,
            results = matches.len(),
            "query finished"
        );
        Ok(matches)
    }

    /// Remove one record from the index. Returns whether it was present.
    ///
    /// This is the per-record deletion extension point: the backend
    /// contract has no row delete, so the durable row remains until it
    /// is overwritten or the table is dropped; it will reappear after
    /// a cold-start `open`.
    pub fn remove(&self, id: RecordId) -> Result<bool> {
        let state = self.state.read().map_err(|_| Self::lock_poisoned())?;
        let table = state.as_ref().ok_or_else(|| self.not_found())?;

        let mut inner = table.write().map_err(|_| Self::lock_poisoned())?;
        let present = inner.metadata.remove(&id).is_some();
        if present {
            inner.index.remove(id)?;
        }
        Ok(present)
    }

    /// Irreversibly delete the underlying storage and in-memory index.
    ///
    /// Fails with `NotFound` if the storage does not exist — surfaced,
    /// not silently ignored, since it signals a caller logic error.
    pub fn drop_store(&self) -> Result<()> {
        let mut state = self.state.write().map_err(|_| Self::lock_poisoned())?;
        self.backend.drop_table(&self.config.table_name)?;
        *state = None;
        info!(table = %self.config.table_name, "store dropped");
        Ok(())
    }

    fn encode_row(&self, record: &VectorRecord) -> Result<Row> {
        let metadata = serde_json::to_string(record.metadata())
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let mut row = Row::new();
        row.insert(
            FIELD_ID.to_string(),
            ColumnValue::Binary(record.id().as_bytes().to_vec()),
        );
        row.insert(FIELD_METADATA.to_string(), ColumnValue::Json(metadata));
        row.insert(
            self.config.vector_column.clone(),
            ColumnValue::Vector(record.embedding().as_slice().to_vec()),
        );
        Ok(row)
    }

    fn decode_row(&self, row: Row) -> Result<VectorRecord> {
        let id = match row.get(FIELD_ID) {
            Some(ColumnValue::Binary(bytes)) => {
                let bytes: [u8; 16] = bytes.as_slice().try_into().map_err(|_| {
                    StoreError::backend("id column is not 16 bytes")
                })?;
                RecordId::from_bytes(bytes)
            }
            _ => return Err(StoreError::backend("row is missing its id column")),
        };

        let metadata: Metadata = match row.get(FIELD_METADATA) {
            Some(ColumnValue::Json(text)) => serde_json::from_str(text)
                .map_err(|e| StoreError::Serialization(e.to_string()))?,
            _ => return Err(StoreError::backend("row is missing its metadata column")),
        };

        let embedding = match row.get(self.config.vector_column.as_str()) {
            Some(ColumnValue::Vector(data)) => Vector::new(data.clone()),
            _ => return Err(StoreError::backend("row is missing its vector column")),
        };
        embedding.check_dimensions(self.config.dimensions)?;

        Ok(VectorRecord::new(id, embedding, metadata))
    }
}
