//! Full index build: crawl → chunk → embed → store, plus the keyword index.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use copilot_llm::LlmError;

use crate::chunker::extract_structures;
use crate::crawler::RepositoryCrawler;
use crate::embedding::EmbeddingProvider;
use crate::error::{IndexError, Result};
use crate::keyword::KeywordIndex;
use crate::types::CodeChunk;
use crate::vector::DEFAULT_COLLECTION;
use crate::vector_store::{SqliteVectorStore, VectorPoint};

pub const KEYWORD_FILE: &str = "bm25.json";
pub const VECTOR_DIR: &str = "vectors";

/// `<data_dir>/bm25.json`
#[must_use]
pub fn keyword_path(data_dir: &Path) -> PathBuf {
    data_dir.join(KEYWORD_FILE)
}

/// `<data_dir>/vectors`
#[must_use]
pub fn vector_dir(data_dir: &Path) -> PathBuf {
    data_dir.join(VECTOR_DIR)
}

#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub data_dir: PathBuf,
    pub collection: String,
    pub batch_size: usize,
    /// Replaces the crawler's default ignore set when present.
    pub ignore_dirs: Option<HashSet<String>>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            collection: DEFAULT_COLLECTION.to_string(),
            batch_size: 100,
            ignore_dirs: None,
        }
    }
}

/// Summary of a build run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IndexReport {
    pub files_scanned: usize,
    pub files_failed: usize,
    pub chunks: usize,
    pub vectors: usize,
    pub dimension: usize,
    pub recreated_collection: bool,
    pub duration_ms: u64,
}

/// Rebuilds the keyword and vector indexes of one repository together.
#[derive(Debug, Clone)]
pub struct IndexBuilder {
    embedder: EmbeddingProvider,
    options: BuildOptions,
}

impl IndexBuilder {
    #[must_use]
    pub fn new(embedder: EmbeddingProvider, options: BuildOptions) -> Self {
        Self { embedder, options }
    }

    #[must_use]
    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    /// Rebuild both indexes from every allowed file under `root`.
    ///
    /// A persisted collection with a different vector length is deleted from
    /// disk and recreated. Unreadable files are logged and counted, not fatal.
    ///
    /// # Errors
    ///
    /// Returns an error if the embedding probe fails, the vector store cannot
    /// be opened (e.g. it is locked by a live retriever), or a write fails.
    pub async fn build(&self, root: &Path) -> Result<IndexReport> {
        let start = Instant::now();
        let mut report = IndexReport::default();

        let dimension = self.embedder.dimension().await?;
        if dimension == 0 {
            return Err(IndexError::EmptyProbe);
        }
        report.dimension = dimension;
        tracing::info!(provider = self.embedder.name(), dimension, "embedding provider probed");

        tokio::fs::create_dir_all(&self.options.data_dir).await?;
        let (store, recreated) = self.prepare_store(dimension).await?;
        report.recreated_collection = recreated;

        let populated = self.populate(&store, root, &mut report).await;
        let counted = match populated {
            Ok(()) => store
                .count(&self.options.collection)
                .await
                .map_err(IndexError::from),
            Err(e) => Err(e),
        };
        store.close().await;
        report.vectors = counted?;

        report.duration_ms = start.elapsed().as_millis().try_into().unwrap_or(u64::MAX);
        tracing::info!(
            files = report.files_scanned,
            failed = report.files_failed,
            chunks = report.chunks,
            vectors = report.vectors,
            duration_ms = report.duration_ms,
            "index build complete"
        );
        Ok(report)
    }

    /// Open the store with an empty collection of the probed dimension.
    async fn prepare_store(&self, dimension: usize) -> Result<(SqliteVectorStore, bool)> {
        let dir = vector_dir(&self.options.data_dir);
        let collection = &self.options.collection;
        let store = SqliteVectorStore::open(&dir).await?;

        match store.collection_dimension(collection).await {
            Ok(Some(existing)) if existing != dimension => {
                tracing::warn!(
                    collection = %collection,
                    existing,
                    dimension,
                    "vector dimension changed, recreating store"
                );
                store.close().await;
                tokio::fs::remove_dir_all(&dir).await?;
                let store = SqliteVectorStore::open(&dir).await?;
                store.create_collection(collection, dimension).await?;
                Ok((store, true))
            }
            Ok(Some(_)) => {
                let removed = store.clear_collection(collection).await?;
                tracing::debug!(collection = %collection, removed, "cleared previous vectors");
                Ok((store, false))
            }
            Ok(None) => {
                store.create_collection(collection, dimension).await?;
                Ok((store, false))
            }
            Err(e) => {
                store.close().await;
                Err(e.into())
            }
        }
    }

    async fn populate(
        &self,
        store: &SqliteVectorStore,
        root: &Path,
        report: &mut IndexReport,
    ) -> Result<()> {
        let chunks = self.collect_chunks(root, report).await;
        report.chunks = chunks.len();
        tracing::info!(files = report.files_scanned, chunks = chunks.len(), "repository chunked");

        let batch_size = self.options.batch_size.max(1);
        let batches = chunks.len().div_ceil(batch_size);
        for (i, batch) in chunks.chunks(batch_size).enumerate() {
            let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
            let vectors = self.embedder.get_embeddings(&texts).await?;
            let points = to_points(batch, vectors)?;
            store.upsert(&self.options.collection, &points).await?;
            tracing::debug!(batch = i + 1, batches, "embedded batch stored");
        }

        let mut keyword = KeywordIndex::new();
        keyword.index(chunks);
        let path = keyword_path(&self.options.data_dir);
        keyword.save(&path)?;
        tracing::info!(path = %path.display(), "keyword index saved");
        Ok(())
    }

    async fn collect_chunks(&self, root: &Path, report: &mut IndexReport) -> Vec<Arc<CodeChunk>> {
        let mut crawler = RepositoryCrawler::new(root);
        if let Some(dirs) = &self.options.ignore_dirs {
            crawler = crawler.with_ignore_dirs(dirs.iter().cloned());
        }

        let mut chunks = Vec::new();
        for path in crawler.scan() {
            report.files_scanned += 1;
            let rel_path = relative_path(root, &path);
            match tokio::fs::read_to_string(&path).await {
                Ok(source) => {
                    chunks.extend(extract_structures(&source, &rel_path).into_iter().map(Arc::new));
                }
                Err(e) => {
                    report.files_failed += 1;
                    tracing::warn!(file = %rel_path, "skipping file: {e}");
                }
            }
        }
        chunks
    }
}

/// Pair each chunk with its vector; a short or long batch is an error so the
/// keyword and vector indexes always hold the same chunks.
fn to_points(batch: &[Arc<CodeChunk>], vectors: Vec<Vec<f32>>) -> Result<Vec<VectorPoint>> {
    if vectors.len() != batch.len() {
        return Err(LlmError::EmbeddingCount {
            expected: batch.len(),
            actual: vectors.len(),
        }
        .into());
    }
    batch
        .iter()
        .zip(vectors)
        .map(|(chunk, vector)| {
            Ok(VectorPoint {
                id: chunk.id.clone(),
                vector,
                payload: chunk.payload()?,
            })
        })
        .collect()
}

/// Root-relative path with `/` separators.
fn relative_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
