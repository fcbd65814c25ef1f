//! # vecstore
//!
//! A vector store engine: persist vector-embedded documents and
//! retrieve them by similarity.
//!
//! This library provides:
//! - Immutable vector records (128-bit id, embedding, JSON metadata)
//! - Similarity metrics (cosine, Euclidean, dot product) as scores
//! - Brute-force and HNSW-based nearest-neighbor indexes
//! - A store engine with setup/add/query/drop over a pluggable
//!   persistence backend
//!
//! ## Example
//!
//! ```rust
//! use vecstore::backend::memory::MemoryBackend;
//! use vecstore::{
//!     QueryOptions, RecordId, StoreConfig, StoreEngine, Vector, VectorRecord,
//! };
//!
//! let config = StoreConfig::new("docs", "docs_idx", "embedding").with_dimensions(3);
//! let store = StoreEngine::with_flat_index(MemoryBackend::new(), config);
//! store.setup().unwrap();
//!
//! let record = VectorRecord::without_metadata(
//!     RecordId::new(),
//!     Vector::new(vec![1.0, 2.0, 3.0]),
//! );
//! store.add(&[record]).unwrap();
//!
//! let results = store
//!     .query(&Vector::new(vec![1.1, 2.1, 3.1]), QueryOptions::default())
//!     .unwrap();
//! assert_eq!(results.len(), 1);
//! ```

pub mod backend;
pub mod distance;
pub mod engine;
pub mod error;
pub mod flat_index;
pub mod hnsw;
pub mod index;
pub mod record;
pub mod vector;

pub use distance::DistanceMetric;
pub use engine::{
    AddReport, MetadataFilter, QueryMatch, QueryOptions, StoreConfig, StoreEngine,
};
pub use error::{Result, StoreError};
pub use flat_index::FlatIndex;
pub use hnsw::{HnswIndex, HnswParams};
pub use index::VectorIndex;
pub use record::{Metadata, RecordId, VectorRecord};
pub use vector::Vector;
