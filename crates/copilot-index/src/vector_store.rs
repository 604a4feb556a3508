//! Persistent vector store on `SQLite` with brute-force cosine search.
//!
//! One database file per store directory holds named collections of
//! `(id, vector, payload)` points. The connection runs in exclusive locking
//! mode, so only one handle can use a store at a time; a second opener fails
//! with [`VectorStoreError::Locked`] once the busy timeout elapses.

use std::path::{Path, PathBuf};
use std::time::Duration;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqliteLockingMode, SqlitePoolOptions};

use crate::error::VectorStoreError;

pub const DB_FILE: &str = "store.db";
const BUSY_TIMEOUT: Duration = Duration::from_secs(2);
/// Primary result code `SQLITE_BUSY`; extended codes keep it in the low byte.
const SQLITE_BUSY: i32 = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct VectorPoint {
    pub id: String,
    pub vector: Vec<f32>,
    pub payload: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredPoint {
    pub id: String,
    pub score: f32,
    pub payload: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct SqliteVectorStore {
    pool: SqlitePool,
    path: PathBuf,
}

impl SqliteVectorStore {
    /// Open (or create) the store under `dir` and take its exclusive lock.
    ///
    /// # Errors
    ///
    /// Returns [`VectorStoreError::Locked`] if another handle holds the store,
    /// or an error if the directory or database cannot be created.
    pub async fn open(dir: &Path) -> Result<Self, VectorStoreError> {
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(DB_FILE);

        let opts = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Delete)
            .locking_mode(SqliteLockingMode::Exclusive)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(opts)
            .await
            .map_err(|e| locked_or(e, &path))?;

        // In exclusive locking mode the lock taken here is held until the pool closes.
        let claim = async {
            let mut conn = pool.acquire().await?;
            sqlx::query("BEGIN EXCLUSIVE").execute(&mut *conn).await?;
            sqlx::query("COMMIT").execute(&mut *conn).await?;
            Ok::<_, sqlx::Error>(())
        };
        if let Err(e) = claim.await {
            pool.close().await;
            return Err(locked_or(e, &path));
        }

        sqlx::migrate!().run(&pool).await?;
        tracing::debug!(path = %path.display(), "vector store opened");
        Ok(Self { pool, path })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release the connection and its file lock.
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::debug!(path = %self.path.display(), "vector store closed");
    }

    /// Vector length of a collection, or `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn collection_dimension(
        &self,
        collection: &str,
    ) -> Result<Option<usize>, VectorStoreError> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT dimension FROM collections WHERE name = ?")
                .bind(collection)
                .fetch_optional(&self.pool)
                .await?;
        row.map(|(dim,)| usize::try_from(dim).map_err(VectorStoreError::from))
            .transpose()
    }

    /// Create an empty collection. Re-creating with the same dimension is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`VectorStoreError::DimensionMismatch`] if the collection exists
    /// with a different dimension.
    pub async fn create_collection(
        &self,
        collection: &str,
        dimension: usize,
    ) -> Result<(), VectorStoreError> {
        match self.collection_dimension(collection).await? {
            Some(existing) if existing == dimension => Ok(()),
            Some(existing) => Err(VectorStoreError::DimensionMismatch {
                collection: collection.to_string(),
                expected: existing,
                actual: dimension,
            }),
            None => {
                sqlx::query("INSERT INTO collections (name, dimension) VALUES (?, ?)")
                    .bind(collection)
                    .bind(i64::try_from(dimension)?)
                    .execute(&self.pool)
                    .await?;
                Ok(())
            }
        }
    }

    /// Remove every point, keeping the collection.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub async fn clear_collection(&self, collection: &str) -> Result<u64, VectorStoreError> {
        let result = sqlx::query("DELETE FROM points WHERE collection = ?")
            .bind(collection)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Insert or replace points by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection is missing, a vector has the wrong
    /// length, or the write fails.
    pub async fn upsert(
        &self,
        collection: &str,
        points: &[VectorPoint],
    ) -> Result<(), VectorStoreError> {
        let dimension = self.require_dimension(collection).await?;

        let mut tx = self.pool.begin().await?;
        for point in points {
            if point.vector.len() != dimension {
                return Err(VectorStoreError::DimensionMismatch {
                    collection: collection.to_string(),
                    expected: dimension,
                    actual: point.vector.len(),
                });
            }
            sqlx::query(
                "INSERT INTO points (collection, id, vector, payload) VALUES (?, ?, ?, ?) \
                 ON CONFLICT(collection, id) DO UPDATE SET vector = excluded.vector, payload = excluded.payload",
            )
            .bind(collection)
            .bind(&point.id)
            .bind(encode_vector(&point.vector))
            .bind(serde_json::to_string(&point.payload)?)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// The `limit` points with the highest cosine similarity to `query`.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection is missing, the query has the wrong
    /// length, or a stored payload is corrupt.
    pub async fn search(
        &self,
        collection: &str,
        query: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredPoint>, VectorStoreError> {
        let dimension = self.require_dimension(collection).await?;
        if query.len() != dimension {
            return Err(VectorStoreError::DimensionMismatch {
                collection: collection.to_string(),
                expected: dimension,
                actual: query.len(),
            });
        }

        let rows: Vec<(String, Vec<u8>, String)> =
            sqlx::query_as("SELECT id, vector, payload FROM points WHERE collection = ?")
                .bind(collection)
                .fetch_all(&self.pool)
                .await?;

        let mut scored: Vec<(f32, String, String)> = rows
            .into_iter()
            .map(|(id, blob, payload)| (cosine_similarity(query, &decode_vector(&blob)), id, payload))
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored.truncate(limit);

        scored
            .into_iter()
            .map(|(score, id, payload)| {
                Ok(ScoredPoint {
                    id,
                    score,
                    payload: serde_json::from_str(&payload)?,
                })
            })
            .collect()
    }

    /// Number of points in a collection.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn count(&self, collection: &str) -> Result<usize, VectorStoreError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM points WHERE collection = ?")
            .bind(collection)
            .fetch_one(&self.pool)
            .await?;
        Ok(usize::try_from(count)?)
    }

    async fn require_dimension(&self, collection: &str) -> Result<usize, VectorStoreError> {
        self.collection_dimension(collection)
            .await?
            .ok_or_else(|| VectorStoreError::CollectionNotFound(collection.to_string()))
    }
}

fn locked_or(e: sqlx::Error, path: &Path) -> VectorStoreError {
    if let sqlx::Error::Database(db) = &e
        && db
            .code()
            .and_then(|code| code.parse::<i32>().ok())
            .is_some_and(|code| code & 0xff == SQLITE_BUSY)
    {
        return VectorStoreError::Locked {
            path: path.to_path_buf(),
        };
    }
    VectorStoreError::Sqlite(e)
}

fn encode_vector(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|x| x.to_le_bytes()).collect()
}

fn decode_vector(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
