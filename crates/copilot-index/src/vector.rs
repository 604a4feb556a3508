//! Semantic retrieval channel: embed the query, search the vector store.

use std::sync::Arc;

use crate::embedding::EmbeddingProvider;
use crate::error::ChannelError;
use crate::types::{CodeChunk, ResultSource, SearchResult};
use crate::vector_store::SqliteVectorStore;

pub const DEFAULT_COLLECTION: &str = "repo_code";

#[derive(Debug, Clone)]
pub struct VectorIndex {
    store: SqliteVectorStore,
    embedder: EmbeddingProvider,
    collection: String,
}

impl VectorIndex {
    #[must_use]
    pub fn new(
        store: SqliteVectorStore,
        embedder: EmbeddingProvider,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            store,
            embedder,
            collection: collection.into(),
        }
    }

    #[must_use]
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Nearest `top_k` chunks by cosine similarity, `source = vector`.
    ///
    /// # Errors
    ///
    /// Returns a [`ChannelError`] if embedding, the store query, or payload
    /// decoding fails.
    pub async fn search(&self, query: &str, top_k: usize) -> Result<Vec<SearchResult>, ChannelError> {
        let vector = self.embedder.embed_query(query).await?;
        let hits = self.store.search(&self.collection, &vector, top_k).await?;

        hits.into_iter()
            .map(|hit| {
                Ok(SearchResult {
                    chunk: Arc::new(CodeChunk::from_payload(hit.id, hit.payload)?),
                    score: hit.score,
                    source: ResultSource::Vector,
                })
            })
            .collect()
    }

    /// Release the store handle.
    pub async fn close(&self) {
        self.store.close().await;
    }
}
