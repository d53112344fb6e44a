//! Panorama Storage - read-only backends behind the data tools.
//!
//! - [`SnapshotStore`]: in-memory `DataStore` loaded from a JSON snapshot
//! - [`QdrantIndex`]: `SemanticIndex` over a Qdrant collection, with
//!   [`OpenAIEmbedding`] for query vectors

pub mod embedding;
pub mod snapshot;
pub mod vector;

pub use embedding::{EmbeddingConfig, EmbeddingProvider, OpenAIEmbedding};
pub use snapshot::SnapshotStore;
pub use vector::{QdrantIndex, VectorConfig};
