//! SQLite-backed vector index.
//!
//! Vectors are stored as little-endian `f32` blobs and scored with a
//! brute-force scan, which is plenty for a single-machine document set.

use crate::types::{DocumentMetadata, IndexRecord, RetrievedDocument};
use crate::vector_index::{cosine_similarity, dot, euclidean_distance, VectorIndex};
use docent_core::{AppError, AppResult, DistanceMetric, ScoreScale};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};

/// SQLite vector index. Cosine and dot collections return similarities,
/// L2 collections return Euclidean distances.
///
/// Similarity scans run on the blocking thread pool so concurrent queries do
/// not stall the async workers while they wait for the connection.
pub struct SqliteIndex {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteIndex {
    /// Open (or create) the index database at `db_path`.
    pub fn open(db_path: &Path) -> AppResult<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(db_path).map_err(backend_error("open SQLite index"))?;
        tracing::debug!("Opened SQLite index at {:?}", db_path);
        Self::with_connection(conn)
    }

    /// In-memory index, used by tests and throwaway runs.
    pub fn open_in_memory() -> AppResult<Self> {
        let conn = Connection::open_in_memory().map_err(backend_error("open SQLite index"))?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> AppResult<Self> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS collections (
                name TEXT PRIMARY KEY,
                dimension INTEGER NOT NULL,
                metric TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS vectors (
                collection TEXT NOT NULL,
                id TEXT NOT NULL,
                text TEXT NOT NULL,
                metadata TEXT NOT NULL,
                embedding BLOB NOT NULL,
                PRIMARY KEY (collection, id),
                FOREIGN KEY (collection) REFERENCES collections(name)
            );
            "#,
        )
        .map_err(backend_error("create tables"))?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, Connection>> {
        lock(&self.conn)
    }

    fn collection_info(
        conn: &Connection,
        collection: &str,
    ) -> AppResult<Option<(usize, DistanceMetric)>> {
        let row: Option<(i64, String)> = conn
            .query_row(
                "SELECT dimension, metric FROM collections WHERE name = ?1",
                params![collection],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(backend_error("read collection"))?;

        match row {
            Some((dimension, metric)) => {
                let metric = DistanceMetric::from_str(&metric)
                    .map_err(|e| AppError::RetrievalBackend(e.to_string()))?;
                Ok(Some((dimension as usize, metric)))
            }
            None => Ok(None),
        }
    }

    fn require_collection(
        conn: &Connection,
        collection: &str,
    ) -> AppResult<(usize, DistanceMetric)> {
        Self::collection_info(conn, collection)?
            .ok_or_else(|| AppError::CollectionNotFound(collection.to_string()))
    }

    /// Score every vector in `collection` against `vector`, best first.
    fn scan(
        conn: &Connection,
        collection: &str,
        vector: &[f32],
        k: usize,
    ) -> AppResult<Vec<(RetrievedDocument, f32)>> {
        let (dimension, metric) = Self::require_collection(conn, collection)?;

        if vector.len() != dimension {
            return Err(AppError::RetrievalBackend(format!(
                "Query vector dimension mismatch: expected {}, got {}",
                dimension,
                vector.len()
            )));
        }

        let mut stmt = conn
            .prepare("SELECT id, text, metadata, embedding FROM vectors WHERE collection = ?1")
            .map_err(backend_error("prepare query"))?;

        let rows = stmt
            .query_map(params![collection], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Vec<u8>>(3)?,
                ))
            })
            .map_err(backend_error("query vectors"))?;

        let mut results = Vec::new();
        for row in rows {
            let (id, text, metadata, embedding) = row.map_err(backend_error("read vector"))?;
            let embedding = bytes_to_embedding(&embedding)?;
            let metadata: DocumentMetadata = serde_json::from_str(&metadata)?;

            let score = match metric {
                DistanceMetric::Cosine => cosine_similarity(vector, &embedding),
                DistanceMetric::Dot => dot(vector, &embedding),
                DistanceMetric::L2 => euclidean_distance(vector, &embedding),
            };

            results.push((RetrievedDocument { id, text, metadata }, score));
        }

        // Best first: highest similarity, or lowest distance
        match metric {
            DistanceMetric::L2 => results.sort_by(|a, b| a.1.total_cmp(&b.1)),
            DistanceMetric::Cosine | DistanceMetric::Dot => {
                results.sort_by(|a, b| b.1.total_cmp(&a.1))
            }
        }
        results.truncate(k);

        tracing::debug!(
            collection,
            retrieved = results.len(),
            requested = k,
            "Similarity query complete"
        );

        Ok(results)
    }
}

#[async_trait::async_trait]
impl VectorIndex for SqliteIndex {
    fn backend_name(&self) -> &str {
        "sqlite"
    }

    fn native_score_scale(&self, metric: DistanceMetric) -> ScoreScale {
        match metric {
            DistanceMetric::Cosine | DistanceMetric::Dot => ScoreScale::Similarity,
            DistanceMetric::L2 => ScoreScale::Distance,
        }
    }

    async fn collection_exists(&self, collection: &str) -> AppResult<bool> {
        let conn = self.lock()?;
        Ok(Self::collection_info(&conn, collection)?.is_some())
    }

    async fn create_collection(
        &self,
        collection: &str,
        dimension: usize,
        metric: DistanceMetric,
    ) -> AppResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO collections (name, dimension, metric) VALUES (?1, ?2, ?3)",
            params![collection, dimension as i64, metric.as_str()],
        )
        .map_err(backend_error("create collection"))?;

        tracing::info!(collection, dimension, metric = metric.as_str(), "Created collection");
        Ok(())
    }

    async fn collection_dimension(&self, collection: &str) -> AppResult<Option<usize>> {
        let conn = self.lock()?;
        Ok(Self::collection_info(&conn, collection)?.map(|(dimension, _)| dimension))
    }

    async fn upsert(&self, collection: &str, records: Vec<IndexRecord>) -> AppResult<()> {
        let mut conn = self.lock()?;
        let (dimension, _) = Self::require_collection(&conn, collection)?;

        let tx = conn.transaction().map_err(backend_error("begin upsert"))?;
        {
            let mut stmt = tx
                .prepare(
                    "INSERT OR REPLACE INTO vectors (collection, id, text, metadata, embedding)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                )
                .map_err(backend_error("prepare upsert"))?;

            for record in &records {
                if record.vector.len() != dimension {
                    return Err(AppError::RetrievalBackend(format!(
                        "Vector dimension mismatch for {}: expected {}, got {}",
                        record.id,
                        dimension,
                        record.vector.len()
                    )));
                }

                let metadata = serde_json::to_string(&record.metadata)?;
                stmt.execute(params![
                    collection,
                    record.id,
                    record.text,
                    metadata,
                    embedding_to_bytes(&record.vector),
                ])
                .map_err(backend_error("upsert vector"))?;
            }
        }
        tx.commit().map_err(backend_error("commit upsert"))?;

        tracing::debug!(collection, records = records.len(), "Upserted vectors");
        Ok(())
    }

    async fn query_similar(
        &self,
        collection: &str,
        vector: &[f32],
        k: usize,
    ) -> AppResult<Vec<(RetrievedDocument, f32)>> {
        let conn = Arc::clone(&self.conn);
        let collection = collection.to_string();
        let vector = vector.to_vec();

        tokio::task::spawn_blocking(move || {
            let conn = lock(&conn)?;
            Self::scan(&conn, &collection, &vector, k)
        })
        .await
        .map_err(|e| AppError::RetrievalBackend(format!("Similarity scan task failed: {}", e)))?
    }

    async fn count(&self, collection: &str) -> AppResult<usize> {
        let conn = self.lock()?;
        Self::require_collection(&conn, collection)?;
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM vectors WHERE collection = ?1",
                params![collection],
                |row| row.get(0),
            )
            .map_err(backend_error("count vectors"))?;
        Ok(count as usize)
    }
}

fn lock(conn: &Mutex<Connection>) -> AppResult<MutexGuard<'_, Connection>> {
    conn.lock()
        .map_err(|_| AppError::RetrievalBackend("SQLite connection lock poisoned".to_string()))
}

fn backend_error(action: &'static str) -> impl Fn(rusqlite::Error) -> AppError {
    move |e| AppError::RetrievalBackend(format!("Failed to {}: {}", action, e))
}

/// Convert embedding vector to bytes for storage.
fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(embedding.len() * 4);
    for &value in embedding {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Convert bytes back to embedding vector.
fn bytes_to_embedding(bytes: &[u8]) -> AppResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(AppError::RetrievalBackend(
            "Invalid embedding bytes length".to_string(),
        ));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(id: &str, vector: Vec<f32>, source: Option<&str>) -> IndexRecord {
        IndexRecord {
            id: id.to_string(),
            vector,
            text: format!("text of {}", id),
            metadata: DocumentMetadata {
                source: source.map(str::to_string),
                page: None,
            },
        }
    }

    #[tokio::test]
    async fn test_create_and_inspect_collection() {
        let index = SqliteIndex::open_in_memory().unwrap();
        assert!(!index.collection_exists("docs").await.unwrap());
        assert_eq!(index.collection_dimension("docs").await.unwrap(), None);

        index
            .create_collection("docs", 3, DistanceMetric::Cosine)
            .await
            .unwrap();

        assert!(index.collection_exists("docs").await.unwrap());
        assert!(!index.collection_exists("Docs").await.unwrap());
        assert_eq!(index.collection_dimension("docs").await.unwrap(), Some(3));
    }

    #[tokio::test]
    async fn test_query_orders_by_similarity() {
        let index = SqliteIndex::open_in_memory().unwrap();
        index
            .create_collection("docs", 3, DistanceMetric::Cosine)
            .await
            .unwrap();
        index
            .upsert(
                "docs",
                vec![
                    record("far", vec![0.0, 1.0, 0.0], Some("b.txt")),
                    record("near", vec![1.0, 0.1, 0.0], Some("a.txt")),
                    record("mid", vec![1.0, 1.0, 0.0], None),
                ],
            )
            .await
            .unwrap();

        let results = index.query_similar("docs", &[1.0, 0.0, 0.0], 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0.id, "near");
        assert_eq!(results[1].0.id, "mid");
        assert!(results[0].1 > results[1].1);
        assert!(results[0].1 <= 1.0);
        assert_eq!(results[0].0.metadata.source.as_deref(), Some("a.txt"));
    }

    #[tokio::test]
    async fn test_l2_returns_distances_ascending() {
        let index = SqliteIndex::open_in_memory().unwrap();
        index.create_collection("docs", 2, DistanceMetric::L2).await.unwrap();
        index
            .upsert(
                "docs",
                vec![
                    record("far", vec![10.0, 0.0], None),
                    record("near", vec![1.0, 0.0], None),
                ],
            )
            .await
            .unwrap();

        let results = index.query_similar("docs", &[0.0, 0.0], 5).await.unwrap();
        assert_eq!(results[0].0.id, "near");
        assert!((results[0].1 - 1.0).abs() < 1e-6);
        assert!((results[1].1 - 10.0).abs() < 1e-6);
        assert_eq!(index.native_score_scale(DistanceMetric::L2), ScoreScale::Distance);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_queries_share_connection() {
        let index = Arc::new(SqliteIndex::open_in_memory().unwrap());
        index.create_collection("docs", 2, DistanceMetric::Cosine).await.unwrap();
        let records = (0..200)
            .map(|i| record(&format!("r{:03}", i), vec![1.0, i as f32], None))
            .collect();
        index.upsert("docs", records).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..16 {
            let index = index.clone();
            handles.push(tokio::spawn(async move {
                index.query_similar("docs", &[1.0, 0.0], 3).await
            }));
        }

        for handle in handles {
            let results = handle.await.unwrap().unwrap();
            let ids: Vec<_> = results.iter().map(|(d, _)| d.id.as_str()).collect();
            assert_eq!(ids, vec!["r000", "r001", "r002"]);
        }
    }

    #[tokio::test]
    async fn test_upsert_replaces_same_id() {
        let index = SqliteIndex::open_in_memory().unwrap();
        index.create_collection("docs", 2, DistanceMetric::Cosine).await.unwrap();

        index.upsert("docs", vec![record("a", vec![1.0, 0.0], None)]).await.unwrap();
        index.upsert("docs", vec![record("a", vec![0.0, 1.0], None)]).await.unwrap();

        assert_eq!(index.count("docs").await.unwrap(), 1);
        let results = index.query_similar("docs", &[0.0, 1.0], 1).await.unwrap();
        assert!((results[0].1 - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_missing_collection_is_an_error() {
        let index = SqliteIndex::open_in_memory().unwrap();

        let query = index.query_similar("ghost", &[1.0], 4).await;
        assert!(matches!(query, Err(AppError::CollectionNotFound(name)) if name == "ghost"));

        let upsert = index.upsert("ghost", vec![record("a", vec![1.0], None)]).await;
        assert!(matches!(upsert, Err(AppError::CollectionNotFound(_))));
    }

    #[tokio::test]
    async fn test_dimension_mismatch_is_rejected() {
        let index = SqliteIndex::open_in_memory().unwrap();
        index.create_collection("docs", 3, DistanceMetric::Cosine).await.unwrap();

        let upsert = index.upsert("docs", vec![record("a", vec![1.0], None)]).await;
        assert!(matches!(upsert, Err(AppError::RetrievalBackend(_))));
        assert_eq!(index.count("docs").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("index/docent.db");

        {
            let index = SqliteIndex::open(&path).unwrap();
            index.create_collection("docs", 2, DistanceMetric::Dot).await.unwrap();
            index.upsert("docs", vec![record("a", vec![1.0, 0.0], None)]).await.unwrap();
        }

        let index = SqliteIndex::open(&path).unwrap();
        assert_eq!(index.collection_dimension("docs").await.unwrap(), Some(2));
        assert_eq!(index.count("docs").await.unwrap(), 1);
    }
}
