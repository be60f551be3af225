//! LanceDB-backed vector index implementation.

use crate::types::{DocumentMetadata, IndexRecord, RetrievedDocument};
use crate::vector_index::VectorIndex;
use arrow_array::{
    Array, FixedSizeListArray, Float32Array, RecordBatch, RecordBatchIterator, StringArray,
    UInt32Array,
};
use arrow_schema::{DataType, Field, Schema, SchemaRef};
use docent_core::{AppError, AppResult, DistanceMetric, ScoreScale};
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{Connection, DistanceType, Table};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

const VECTOR_COLUMN: &str = "vector";
const DISTANCE_COLUMN: &str = "_distance";
const METRIC_KEY: &str = "docent.metric";

/// LanceDB-backed vector index. One table per collection.
///
/// LanceDB always reports distances, so every metric has a
/// [`ScoreScale::Distance`] native scale.
pub struct LanceDbIndex {
    conn: Connection,
    default_metric: DistanceMetric,
}

impl LanceDbIndex {
    /// Connect to (or create) a LanceDB database directory.
    ///
    /// # Arguments
    /// * `db_path` - Directory path for the LanceDB database
    /// * `default_metric` - Metric assumed for tables that do not record one
    pub async fn connect(db_path: &Path, default_metric: DistanceMetric) -> AppResult<Self> {
        std::fs::create_dir_all(db_path).map_err(|e| {
            AppError::RetrievalBackend(format!("Failed to create index directory: {}", e))
        })?;

        let uri = db_path.to_string_lossy().to_string();
        let conn = lancedb::connect(&uri)
            .execute()
            .await
            .map_err(backend_error("connect to LanceDB"))?;

        tracing::debug!("Connected to LanceDB at {:?}", db_path);

        Ok(Self {
            conn,
            default_metric,
        })
    }

    fn create_schema(dimension: usize, metric: DistanceMetric) -> SchemaRef {
        let metadata = HashMap::from([(METRIC_KEY.to_string(), metric.as_str().to_string())]);
        Arc::new(Schema::new_with_metadata(
            vec![
                Field::new("id", DataType::Utf8, false),
                Field::new("text", DataType::Utf8, false),
                Field::new("source", DataType::Utf8, true),
                Field::new("page", DataType::UInt32, true),
                Field::new(
                    VECTOR_COLUMN,
                    DataType::FixedSizeList(
                        Arc::new(Field::new("item", DataType::Float32, true)),
                        dimension as i32,
                    ),
                    false,
                ),
            ],
            metadata,
        ))
    }

    async fn open(&self, collection: &str) -> AppResult<Option<Table>> {
        let names = self
            .conn
            .table_names()
            .execute()
            .await
            .map_err(backend_error("list tables"))?;

        if !names.iter().any(|name| name == collection) {
            return Ok(None);
        }

        let table = self
            .conn
            .open_table(collection)
            .execute()
            .await
            .map_err(backend_error("open table"))?;
        Ok(Some(table))
    }

    async fn require(&self, collection: &str) -> AppResult<Table> {
        self.open(collection)
            .await?
            .ok_or_else(|| AppError::CollectionNotFound(collection.to_string()))
    }

    fn metric_of(&self, schema: &Schema) -> DistanceMetric {
        schema
            .metadata()
            .get(METRIC_KEY)
            .and_then(|m| DistanceMetric::from_str(m).ok())
            .unwrap_or(self.default_metric)
    }

    fn records_to_batch(
        schema: SchemaRef,
        dimension: usize,
        records: &[IndexRecord],
    ) -> AppResult<RecordBatch> {
        let mut flat = Vec::with_capacity(records.len() * dimension);
        for record in records {
            if record.vector.len() != dimension {
                return Err(AppError::RetrievalBackend(format!(
                    "Vector dimension mismatch for {}: expected {}, got {}",
                    record.id,
                    dimension,
                    record.vector.len()
                )));
            }
            flat.extend_from_slice(&record.vector);
        }

        let ids = StringArray::from(records.iter().map(|r| r.id.as_str()).collect::<Vec<_>>());
        let texts = StringArray::from(records.iter().map(|r| r.text.as_str()).collect::<Vec<_>>());
        let sources = StringArray::from(
            records
                .iter()
                .map(|r| r.metadata.source.as_deref())
                .collect::<Vec<_>>(),
        );
        let pages = UInt32Array::from(records.iter().map(|r| r.metadata.page).collect::<Vec<_>>());
        let vectors = FixedSizeListArray::try_new(
            Arc::new(Field::new("item", DataType::Float32, true)),
            dimension as i32,
            Arc::new(Float32Array::from(flat)),
            None,
        )
        .map_err(|e| AppError::RetrievalBackend(format!("Failed to build vector array: {}", e)))?;

        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(ids),
                Arc::new(texts),
                Arc::new(sources),
                Arc::new(pages),
                Arc::new(vectors),
            ],
        )
        .map_err(|e| AppError::RetrievalBackend(format!("Failed to create RecordBatch: {}", e)))
    }

    fn batch_to_results(batch: &RecordBatch) -> AppResult<Vec<(RetrievedDocument, f32)>> {
        let ids = string_column(batch, "id")?;
        let texts = string_column(batch, "text")?;
        let sources = string_column(batch, "source")?;
        let pages = batch
            .column_by_name("page")
            .and_then(|c| c.as_any().downcast_ref::<UInt32Array>())
            .ok_or_else(|| AppError::RetrievalBackend("Invalid page column".to_string()))?;
        let distances = batch
            .column_by_name(DISTANCE_COLUMN)
            .and_then(|c| c.as_any().downcast_ref::<Float32Array>())
            .ok_or_else(|| AppError::RetrievalBackend("Missing distance column".to_string()))?;

        let mut results = Vec::with_capacity(batch.num_rows());
        for row in 0..batch.num_rows() {
            let metadata = DocumentMetadata {
                source: (!sources.is_null(row)).then(|| sources.value(row).to_string()),
                page: (!pages.is_null(row)).then(|| pages.value(row)),
            };
            let document = RetrievedDocument {
                id: ids.value(row).to_string(),
                text: texts.value(row).to_string(),
                metadata,
            };
            results.push((document, distances.value(row)));
        }
        Ok(results)
    }
}

#[async_trait::async_trait]
impl VectorIndex for LanceDbIndex {
    fn backend_name(&self) -> &str {
        "lancedb"
    }

    fn native_score_scale(&self, _metric: DistanceMetric) -> ScoreScale {
        ScoreScale::Distance
    }

    async fn collection_exists(&self, collection: &str) -> AppResult<bool> {
        Ok(self.open(collection).await?.is_some())
    }

    async fn create_collection(
        &self,
        collection: &str,
        dimension: usize,
        metric: DistanceMetric,
    ) -> AppResult<()> {
        let schema = Self::create_schema(dimension, metric);
        self.conn
            .create_empty_table(collection, schema)
            .execute()
            .await
            .map_err(backend_error("create table"))?;

        tracing::info!(collection, dimension, metric = metric.as_str(), "Created collection");
        Ok(())
    }

    async fn collection_dimension(&self, collection: &str) -> AppResult<Option<usize>> {
        let Some(table) = self.open(collection).await? else {
            return Ok(None);
        };
        let schema = table.schema().await.map_err(backend_error("read schema"))?;
        let dimension = schema
            .field_with_name(VECTOR_COLUMN)
            .ok()
            .and_then(|field| match field.data_type() {
                DataType::FixedSizeList(_, size) => Some(*size as usize),
                _ => None,
            })
            .ok_or_else(|| {
                AppError::RetrievalBackend(format!("Table {} has no vector column", collection))
            })?;
        Ok(Some(dimension))
    }

    async fn upsert(&self, collection: &str, records: Vec<IndexRecord>) -> AppResult<()> {
        let table = self.require(collection).await?;
        if records.is_empty() {
            return Ok(());
        }

        let schema = table.schema().await.map_err(backend_error("read schema"))?;
        let dimension = match schema.field_with_name(VECTOR_COLUMN).map(|f| f.data_type()) {
            Ok(DataType::FixedSizeList(_, size)) => *size as usize,
            _ => {
                return Err(AppError::RetrievalBackend(format!(
                    "Table {} has no vector column",
                    collection
                )))
            }
        };

        let batch = Self::records_to_batch(schema.clone(), dimension, &records)?;
        let reader = RecordBatchIterator::new(vec![Ok(batch)], schema);

        let mut merge = table.merge_insert(&["id"]);
        merge
            .when_matched_update_all(None)
            .when_not_matched_insert_all();
        merge
            .execute(Box::new(reader))
            .await
            .map_err(backend_error("upsert records"))?;

        tracing::debug!(collection, records = records.len(), "Upserted records into LanceDB");
        Ok(())
    }

    async fn query_similar(
        &self,
        collection: &str,
        vector: &[f32],
        k: usize,
    ) -> AppResult<Vec<(RetrievedDocument, f32)>> {
        let table = self.require(collection).await?;
        let schema = table.schema().await.map_err(backend_error("read schema"))?;
        let distance_type = match self.metric_of(&schema) {
            DistanceMetric::Cosine => DistanceType::Cosine,
            DistanceMetric::L2 => DistanceType::L2,
            DistanceMetric::Dot => DistanceType::Dot,
        };

        let batches = table
            .query()
            .nearest_to(vector.to_vec())
            .map_err(backend_error("create query"))?
            .column(VECTOR_COLUMN)
            .distance_type(distance_type)
            .limit(k)
            .execute()
            .await
            .map_err(backend_error("execute search"))?
            .try_collect::<Vec<RecordBatch>>()
            .await
            .map_err(backend_error("collect results"))?;

        let mut results = Vec::new();
        for batch in &batches {
            results.extend(Self::batch_to_results(batch)?);
        }
        results.sort_by(|a, b| a.1.total_cmp(&b.1));
        results.truncate(k);

        tracing::debug!(
            collection,
            retrieved = results.len(),
            requested = k,
            "Similarity query complete"
        );

        Ok(results)
    }

    async fn count(&self, collection: &str) -> AppResult<usize> {
        let table = self.require(collection).await?;
        table
            .count_rows(None)
            .await
            .map_err(backend_error("count rows"))
    }
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> AppResult<&'a StringArray> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| AppError::RetrievalBackend(format!("Invalid {} column", name)))
}

fn backend_error(action: &'static str) -> impl Fn(lancedb::Error) -> AppError {
    move |e| AppError::RetrievalBackend(format!("Failed to {}: {}", action, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(id: &str, vector: Vec<f32>, page: Option<u32>) -> IndexRecord {
        IndexRecord {
            id: id.to_string(),
            vector,
            text: format!("text of {}", id),
            metadata: DocumentMetadata {
                source: Some("guide.pdf".to_string()),
                page,
            },
        }
    }

    #[tokio::test]
    async fn test_create_upsert_and_query() {
        let dir = TempDir::new().unwrap();
        let index = LanceDbIndex::connect(&dir.path().join("lance"), DistanceMetric::Cosine)
            .await
            .unwrap();

        assert!(!index.collection_exists("docs").await.unwrap());
        index
            .create_collection("docs", 3, DistanceMetric::Cosine)
            .await
            .unwrap();
        assert_eq!(index.collection_dimension("docs").await.unwrap(), Some(3));

        index
            .upsert(
                "docs",
                vec![
                    record("near", vec![1.0, 0.0, 0.0], Some(2)),
                    record("far", vec![0.0, 1.0, 0.0], None),
                ],
            )
            .await
            .unwrap();
        index
            .upsert("docs", vec![record("near", vec![1.0, 0.0, 0.0], Some(2))])
            .await
            .unwrap();
        assert_eq!(index.count("docs").await.unwrap(), 2);

        let results = index.query_similar("docs", &[1.0, 0.0, 0.0], 2).await.unwrap();
        assert_eq!(results[0].0.id, "near");
        assert_eq!(results[0].0.metadata.page, Some(2));
        assert!(results[0].1 < results[1].1);
    }

    #[tokio::test]
    async fn test_missing_table_is_collection_not_found() {
        let dir = TempDir::new().unwrap();
        let index = LanceDbIndex::connect(dir.path(), DistanceMetric::Cosine)
            .await
            .unwrap();

        let result = index.query_similar("ghost", &[1.0], 3).await;
        assert!(matches!(result, Err(AppError::CollectionNotFound(_))));
        assert_eq!(index.collection_dimension("ghost").await.unwrap(), None);
    }
}
