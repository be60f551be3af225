//! Batching, collection bootstrap and failure behavior of the upserter.

use super::fakes::{FakeEmbedder, FakeIndex};
use crate::ingest::{ensure_collection, BatchCounters, BatchUpserter, UpsertSettings};
use crate::types::{Chunk, DocumentMetadata};
use docent_core::{AppError, DistanceMetric};
use std::sync::atomic::Ordering;
use std::sync::Arc;

const DIM: usize = 4;

fn settings(batch_size: usize) -> UpsertSettings {
    UpsertSettings {
        collection: "docs".to_string(),
        dimension: DIM,
        metric: DistanceMetric::Cosine,
        batch_size,
    }
}

fn chunk(i: usize) -> Chunk {
    Chunk {
        id: format!("chunk-{:03}", i),
        position: i as u32,
        text: format!("chunk text {}", i),
        metadata: DocumentMetadata::new("manual.pdf", Some(1)),
    }
}

fn upserter(index: &Arc<FakeIndex>, batch_size: usize) -> BatchUpserter {
    BatchUpserter::new(
        index.clone(),
        Arc::new(FakeEmbedder::new(DIM)),
        settings(batch_size),
    )
    .unwrap()
}

#[tokio::test]
async fn test_hundred_chunks_flush_in_four_batches() {
    let index = Arc::new(FakeIndex::new());
    let mut upserter = upserter(&index, 32);

    upserter.extend((0..100).map(chunk)).await.unwrap();
    assert_eq!(*index.upsert_sizes.lock().unwrap(), vec![32, 32, 32]);

    let counters = upserter.finish().await.unwrap();
    assert_eq!(*index.upsert_sizes.lock().unwrap(), vec![32, 32, 32, 4]);
    assert_eq!(counters.chunks_buffered, 100);
    assert_eq!(counters.chunks_flushed, 100);
    assert_eq!(counters.flushes, 4);
    assert_eq!(index.stored_ids().len(), 100);
}

#[tokio::test]
async fn test_exact_multiple_has_no_remainder_flush() {
    let index = Arc::new(FakeIndex::new());
    let mut upserter = upserter(&index, 8);

    upserter.extend((0..24).map(chunk)).await.unwrap();
    let counters = upserter.finish().await.unwrap();

    assert_eq!(*index.upsert_sizes.lock().unwrap(), vec![8, 8, 8]);
    assert_eq!(counters.flushes, 3);
}

#[tokio::test]
async fn test_nothing_buffered_means_no_calls() {
    let index = Arc::new(FakeIndex::new());
    let counters = upserter(&index, 8).finish().await.unwrap();

    assert_eq!(counters, BatchCounters::default());
    assert_eq!(index.create_calls.load(Ordering::SeqCst), 0);
    assert!(index.upsert_sizes.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_collection_created_once_before_first_flush() {
    let index = Arc::new(FakeIndex::new());
    let mut upserter = upserter(&index, 2);

    upserter.push(chunk(0)).await.unwrap();
    assert_eq!(index.create_calls.load(Ordering::SeqCst), 0);

    upserter.extend((1..7).map(chunk)).await.unwrap();
    upserter.finish().await.unwrap();

    assert_eq!(index.create_calls.load(Ordering::SeqCst), 1);
    assert_eq!(index.upsert_sizes.lock().unwrap().len(), 4);
}

#[tokio::test]
async fn test_existing_collection_is_reused() {
    let index = Arc::new(FakeIndex::new().with_collection("docs", DIM));
    let mut upserter = upserter(&index, 4);

    upserter.extend((0..5).map(chunk)).await.unwrap();
    upserter.finish().await.unwrap();

    assert_eq!(index.create_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_ensure_collection_is_idempotent() {
    let index = FakeIndex::new();

    let created = ensure_collection(&index, "docs", DIM, DistanceMetric::Cosine)
        .await
        .unwrap();
    let again = ensure_collection(&index, "docs", DIM, DistanceMetric::Cosine)
        .await
        .unwrap();

    assert!(created);
    assert!(!again);
    assert_eq!(index.create_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_dimension_mismatch_is_config_error() {
    let index = Arc::new(FakeIndex::new().with_collection("docs", 768));
    let mut upserter = upserter(&index, 1);

    let result = upserter.push(chunk(0)).await;
    assert!(matches!(result, Err(AppError::Config(_))));
    assert!(index.upsert_sizes.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_flush_is_not_retried() {
    let index = Arc::new(FakeIndex::new().with_collection("docs", DIM));
    index.fail_next_upsert(AppError::RetrievalBackend("connection reset".to_string()));
    let mut upserter = upserter(&index, 3);

    upserter.push(chunk(0)).await.unwrap();
    upserter.push(chunk(1)).await.unwrap();
    let result = upserter.push(chunk(2)).await;

    assert!(matches!(result, Err(AppError::RetrievalBackend(ref m)) if m == "connection reset"));
    assert!(index.upsert_sizes.lock().unwrap().is_empty());
    assert_eq!(upserter.counters().chunks_flushed, 0);
    assert_eq!(upserter.counters().flushes, 0);
}

#[tokio::test]
async fn test_embedding_failure_propagates() {
    let index = Arc::new(FakeIndex::new());
    let mut upserter = BatchUpserter::new(
        index.clone(),
        Arc::new(FakeEmbedder::failing(DIM)),
        settings(1),
    )
    .unwrap();

    let result = upserter.push(chunk(0)).await;
    assert!(matches!(result, Err(AppError::Embedding(_))));
    assert!(index.stored_ids().is_empty());
}

#[tokio::test]
async fn test_documents_are_counted() {
    let index = Arc::new(FakeIndex::new());
    let mut upserter = upserter(&index, 10);

    upserter.add_document((0..3).map(chunk).collect()).await.unwrap();
    upserter.add_document(Vec::new()).await.unwrap();
    upserter.add_document((3..5).map(chunk).collect()).await.unwrap();

    let counters = upserter.finish().await.unwrap();
    assert_eq!(counters.documents_processed, 3);
    assert_eq!(counters.chunks_buffered, 5);
}

#[tokio::test]
async fn test_records_carry_chunk_fields() {
    let index = Arc::new(FakeIndex::new());
    let mut upserter = upserter(&index, 10);
    upserter.push(chunk(7)).await.unwrap();
    upserter.finish().await.unwrap();

    let record = index.stored("chunk-007").unwrap();
    assert_eq!(record.text, "chunk text 7");
    assert_eq!(record.vector.len(), DIM);
    assert_eq!(record.metadata, DocumentMetadata::new("manual.pdf", Some(1)));
}

#[test]
fn test_zero_batch_size_is_rejected() {
    let result = BatchUpserter::new(
        Arc::new(FakeIndex::new()),
        Arc::new(FakeEmbedder::new(DIM)),
        settings(0),
    );
    assert!(matches!(result, Err(AppError::Config(_))));
}
