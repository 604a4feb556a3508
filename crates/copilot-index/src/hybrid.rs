//! Hybrid retrieval: keyword and vector channels fused by Reciprocal Rank Fusion.

use std::collections::HashMap;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use crate::builder::{keyword_path, vector_dir};
use crate::embedding::EmbeddingProvider;
use crate::error::{ChannelError, VectorStoreError};
use crate::keyword::KeywordIndex;
use crate::types::{CodeChunk, ResultSource, SearchResult};
use crate::vector::VectorIndex;
use crate::vector_store::SqliteVectorStore;

/// RRF smoothing constant.
pub const DEFAULT_RRF_K: usize = 60;

/// Anything the answering loop can retrieve evidence from.
pub trait Retriever: Send + Sync {
    /// Ranked results for `query`. Channel failures degrade to fewer results.
    fn search(&self, query: &str, top_k: usize) -> impl Future<Output = Vec<SearchResult>> + Send;

    /// Release held resources such as the vector store lock.
    fn close(&self) -> impl Future<Output = ()> + Send;
}

/// Fuse ranked lists, earlier lists winning ties.
///
/// Each result at 0-based `rank` adds `1 / (k + rank + 1)` to its chunk's
/// score; chunks are keyed by id. The output is sorted by fused score with
/// ties kept in first-appearance order, truncated to `top_k`, and tagged
/// `source = hybrid`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn reciprocal_rank_fusion(
    lists: &[Vec<SearchResult>],
    k: usize,
    top_k: usize,
) -> Vec<SearchResult> {
    let mut fused: Vec<(Arc<CodeChunk>, f32)> = Vec::new();
    let mut position: HashMap<String, usize> = HashMap::new();

    for list in lists {
        for (rank, result) in list.iter().enumerate() {
            let slot = *position.entry(result.chunk.id.clone()).or_insert_with(|| {
                fused.push((Arc::clone(&result.chunk), 0.0));
                fused.len() - 1
            });
            fused[slot].1 += 1.0 / (k + rank + 1) as f32;
        }
    }

    fused.sort_by(|a, b| b.1.total_cmp(&a.1));
    fused.truncate(top_k);
    fused
        .into_iter()
        .map(|(chunk, score)| SearchResult {
            chunk,
            score,
            source: ResultSource::Hybrid,
        })
        .collect()
}

/// Keyword index plus an optional vector channel.
#[derive(Debug)]
pub struct HybridRetriever {
    keyword: KeywordIndex,
    vector: Option<VectorIndex>,
}

impl HybridRetriever {
    #[must_use]
    pub fn new(keyword: KeywordIndex, vector: Option<VectorIndex>) -> Self {
        Self { keyword, vector }
    }

    /// Open the indexes persisted under `data_dir`.
    ///
    /// A missing keyword file leaves that channel unbuilt. A store locked by a
    /// running build leaves the vector channel out; both are logged and the
    /// retriever degrades to the remaining channel.
    ///
    /// # Errors
    ///
    /// Returns an error if the vector store exists but cannot be opened for a
    /// reason other than locking.
    pub async fn open(
        data_dir: &Path,
        embedder: EmbeddingProvider,
        collection: &str,
    ) -> Result<Self, VectorStoreError> {
        let path = keyword_path(data_dir);
        let keyword = match KeywordIndex::load(&path) {
            Ok(index) => index,
            Err(e) => {
                tracing::warn!(path = %path.display(), "keyword index unavailable: {e}");
                KeywordIndex::new()
            }
        };

        let vector = match SqliteVectorStore::open(&vector_dir(data_dir)).await {
            Ok(store) => Some(VectorIndex::new(store, embedder, collection)),
            Err(e @ VectorStoreError::Locked { .. }) => {
                tracing::warn!("vector channel disabled: {e}");
                None
            }
            Err(e) => return Err(e),
        };

        Ok(Self::new(keyword, vector))
    }

    /// [`Retriever::search`] with an explicit RRF constant.
    pub async fn search_with_k(&self, query: &str, top_k: usize, k: usize) -> Vec<SearchResult> {
        let fetch = top_k.saturating_mul(2);
        let (keyword, vector) = tokio::join!(
            async { self.keyword.search(query, fetch).map_err(ChannelError::from) },
            self.vector_search(query, fetch),
        );

        let keyword = keyword.unwrap_or_else(|e| {
            tracing::warn!("keyword search failed: {e}");
            Vec::new()
        });
        let vector = vector.unwrap_or_else(|e| {
            tracing::warn!("vector search failed: {e}");
            Vec::new()
        });
        tracing::debug!(
            keyword = keyword.len(),
            vector = vector.len(),
            "fusing channel results"
        );

        reciprocal_rank_fusion(&[keyword, vector], k, top_k)
    }

    async fn vector_search(&self, query: &str, top_k: usize) -> Result<Vec<SearchResult>, ChannelError> {
        match &self.vector {
            Some(vector) => vector.search(query, top_k).await,
            None => Err(ChannelError::Unavailable),
        }
    }
}

impl Retriever for HybridRetriever {
    async fn search(&self, query: &str, top_k: usize) -> Vec<SearchResult> {
        self.search_with_k(query, top_k, DEFAULT_RRF_K).await
    }

    async fn close(&self) {
        if let Some(vector) = &self.vector {
            vector.close().await;
        }
    }
}
