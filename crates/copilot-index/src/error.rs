//! Error types for copilot-index.

use std::num::TryFromIntError;
use std::path::PathBuf;

/// Errors raised while building or querying the indexes.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Embedding provider failure.
    #[error("LLM error: {0}")]
    Llm(#[from] copilot_llm::LlmError),

    #[error("vector store error: {0}")]
    VectorStore(#[from] VectorStoreError),

    /// Keyword search was invoked before `index` or `load`.
    #[error("keyword index not built; index chunks or load a saved index first")]
    NotBuilt,

    #[error("embedding provider returned an empty probe vector")]
    EmptyProbe,

    #[error("parse failed: {0}")]
    Parse(String),

    #[error("unsupported language")]
    UnsupportedLanguage,
}

/// Errors from the persistent vector store.
#[derive(Debug, thiserror::Error)]
pub enum VectorStoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] sqlx::Error),

    #[error("migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Another handle holds the store's exclusive lock.
    #[error("vector store at {} is locked by another handle", path.display())]
    Locked { path: PathBuf },

    #[error("collection not found: {0}")]
    CollectionNotFound(String),

    #[error("dimension mismatch in collection {collection}: expected {expected}, got {actual}")]
    DimensionMismatch {
        collection: String,
        expected: usize,
        actual: usize,
    },

    #[error("payload serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("integer conversion failed: {0}")]
    IntConversion(#[from] TryFromIntError),
}

/// Failure of a single retrieval channel. The hybrid engine treats any of
/// these as an empty contribution.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("embedding failed: {0}")]
    Embedding(#[from] copilot_llm::LlmError),

    #[error("vector store failed: {0}")]
    Store(#[from] VectorStoreError),

    #[error("keyword index failed: {0}")]
    Keyword(#[from] IndexError),

    #[error("stored payload is unreadable: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("vector channel unavailable")]
    Unavailable,
}

/// Result type alias using `IndexError`.
pub type Result<T> = std::result::Result<T, IndexError>;
