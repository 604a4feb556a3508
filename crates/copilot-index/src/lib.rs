//! Repository indexing and hybrid retrieval.
//!
//! Source files are split into structural chunks with tree-sitter, indexed
//! twice (BM25 keywords and embedded vectors in `SQLite`), and queried through
//! Reciprocal Rank Fusion of both channels.

pub mod builder;
pub mod chunker;
pub mod crawler;
pub mod embedding;
pub mod error;
pub mod hybrid;
pub mod keyword;
pub mod languages;
pub mod syntax;
pub mod types;
pub mod vector;
pub mod vector_store;

pub use builder::{BuildOptions, IndexBuilder, IndexReport};
pub use chunker::extract_structures;
pub use embedding::{EmbeddingProvider, MockEmbedder};
pub use error::{ChannelError, IndexError, Result, VectorStoreError};
pub use hybrid::{HybridRetriever, Retriever, reciprocal_rank_fusion};
pub use keyword::KeywordIndex;
pub use types::{ChunkType, CodeChunk, ResultSource, SearchResult};
