use async_trait::async_trait;
use claimnorm::database::sqlite::SqliteDatabase;
use claimnorm::errors::AppError;
use claimnorm::models::claim::STATUS_PROCESSED;
use claimnorm::services::batch::BatchService;
use claimnorm::services::history::HistoryService;
use claimnorm::services::normalizer::{Normalizer, ERROR_TAG};
use std::sync::Arc;
use uuid::Uuid;

/// Deterministic stand-in for the external model.
struct PrefixNormalizer;

#[async_trait]
impl Normalizer for PrefixNormalizer {
    async fn normalize(&self, text: &str) -> String {
        format!("NORMALIZED:{}", text)
    }
}

/// Simulates a hard adapter failure on every call; the batch must absorb it.
struct OutageNormalizer;

#[async_trait]
impl Normalizer for OutageNormalizer {
    async fn normalize(&self, _text: &str) -> String {
        format!("{} simulated outage", ERROR_TAG)
    }
}

const THREE_ROW_CSV: &[u8] = b"id,text\n1,claim A\n2,\n3,claim B\n";

async fn service_with_store(normalizer: Arc<dyn Normalizer>) -> (BatchService, Arc<SqliteDatabase>) {
    let db = Arc::new(SqliteDatabase::new_in_memory().await.unwrap());
    let service = BatchService::new(normalizer, HistoryService::new(Some(db.clone())));
    (service, db)
}

#[tokio::test]
async fn three_row_batch_end_to_end() {
    let (service, db) = service_with_store(Arc::new(PrefixNormalizer)).await;
    let user_id = Uuid::new_v4();

    let outcome = service
        .process(&user_id, THREE_ROW_CSV, "text", |_, _| {})
        .await
        .unwrap();

    let normalized: Vec<&str> = outcome.rows.iter().map(|r| r.normalized.as_str()).collect();
    assert_eq!(
        normalized,
        vec!["NORMALIZED:claim A", "NORMALIZED:", "NORMALIZED:claim B"]
    );

    // exactly one history record per row, in row order (listing is newest first)
    let records = db.claims_for_user(&user_id).await.unwrap();
    assert_eq!(records.len(), 3);
    let originals: Vec<&str> = records.iter().rev().map(|r| r.original_text.as_str()).collect();
    assert_eq!(originals, vec!["claim A", "", "claim B"]);
    assert!(records.iter().all(|r| r.status == STATUS_PROCESSED));
}

#[tokio::test]
async fn progress_is_monotonic_and_per_row() {
    let (service, _db) = service_with_store(Arc::new(PrefixNormalizer)).await;
    let user_id = Uuid::new_v4();

    let mut ticks = Vec::new();
    service
        .process(&user_id, THREE_ROW_CSV, "text", |done, total| {
            ticks.push((done, total));
        })
        .await
        .unwrap();

    assert_eq!(ticks, vec![(1, 3), (2, 3), (3, 3)]);
}

#[tokio::test]
async fn failing_adapter_never_aborts_the_batch() {
    let (service, db) = service_with_store(Arc::new(OutageNormalizer)).await;
    let user_id = Uuid::new_v4();

    let outcome = service
        .process(&user_id, THREE_ROW_CSV, "text", |_, _| {})
        .await
        .unwrap();

    assert_eq!(outcome.rows.len(), 3);
    assert!(outcome.rows.iter().all(|r| r.normalized.contains(ERROR_TAG)));

    // failed rows are still recorded, error text and all
    let records = db.claims_for_user(&user_id).await.unwrap();
    assert_eq!(records.len(), 3);
    assert!(records.iter().all(|r| r.normalized_text.contains(ERROR_TAG)));
}

#[tokio::test]
async fn empty_original_row_gets_zero_percent() {
    let (service, _db) = service_with_store(Arc::new(PrefixNormalizer)).await;
    let user_id = Uuid::new_v4();

    let outcome = service
        .process(&user_id, THREE_ROW_CSV, "text", |_, _| {})
        .await
        .unwrap();

    let empty_row = &outcome.rows[1];
    assert_eq!(empty_row.original_length, 0);
    assert_eq!(empty_row.reduction_percent, 0.0);
}

#[tokio::test]
async fn unknown_column_is_a_validation_error() {
    let (service, db) = service_with_store(Arc::new(PrefixNormalizer)).await;
    let user_id = Uuid::new_v4();

    let result = service
        .process(&user_id, THREE_ROW_CSV, "description", |_, _| {})
        .await;
    assert!(matches!(result, Err(AppError::ValidationError(_))));

    // nothing was processed or recorded
    assert_eq!(db.count_claims_for_user(&user_id).await.unwrap(), 0);
}

#[tokio::test]
async fn result_csv_carries_original_and_derived_columns() {
    let (service, _db) = service_with_store(Arc::new(PrefixNormalizer)).await;
    let user_id = Uuid::new_v4();

    let outcome = service
        .process(&user_id, THREE_ROW_CSV, "text", |_, _| {})
        .await
        .unwrap();

    let mut lines = outcome.result_csv.lines();
    assert_eq!(
        lines.next().unwrap(),
        "id,text,Normalized_Claim,Original_Length,Cleaned_Length,Reduction,Reduction_%"
    );
    let first = lines.next().unwrap();
    assert!(first.starts_with("1,claim A,NORMALIZED:claim A,7,18,-11,"));
}

#[tokio::test]
async fn history_listing_is_newest_first() {
    let db = Arc::new(SqliteDatabase::new_in_memory().await.unwrap());
    let history = HistoryService::new(Some(db));
    let user_id = Uuid::new_v4();

    history.record(&user_id, "first", "n1").await.unwrap();
    history.record(&user_id, "second", "n2").await.unwrap();
    history.record(&user_id, "third", "n3").await.unwrap();

    let records = history.list(&user_id).await;
    let originals: Vec<&str> = records.iter().map(|r| r.original_text.as_str()).collect();
    assert_eq!(originals, vec!["third", "second", "first"]);
}

#[tokio::test]
async fn history_export_includes_header_and_all_rows() {
    let db = Arc::new(SqliteDatabase::new_in_memory().await.unwrap());
    let history = HistoryService::new(Some(db));
    let user_id = Uuid::new_v4();

    history.record(&user_id, "a claim", "cleaned claim").await.unwrap();

    let csv = history.export_csv(&user_id).await.unwrap();
    let mut lines = csv.lines();
    assert_eq!(
        lines.next().unwrap(),
        "id,user_id,original_text,normalized_text,status,created_at"
    );
    assert_eq!(lines.count(), 1);
}
