use crate::database::sqlite::SqliteDatabase;
use crate::errors::Result;
use crate::models::claim::ClaimRecord;
use std::sync::Arc;
use tracing::error;
use uuid::Uuid;

/// Best-effort per-user history of (original, normalized) pairs. Writes are a
/// non-blocking side effect: callers get a `Result` they may ignore, and the
/// failure is already logged here. No idempotency key, so re-running the same
/// batch creates duplicate records.
#[derive(Clone)]
pub struct HistoryService {
    database: Option<Arc<SqliteDatabase>>,
}

impl HistoryService {
    pub fn new(database: Option<Arc<SqliteDatabase>>) -> Self {
        Self { database }
    }

    pub async fn record(&self, user_id: &Uuid, original: &str, normalized: &str) -> Result<()> {
        let db = match &self.database {
            Some(db) => db,
            // Demo mode: history is never persisted.
            None => return Ok(()),
        };

        let record = ClaimRecord::new(*user_id, original, normalized);
        if let Err(e) = db.insert_claim(&record).await {
            error!(action = "history_write_failed", user_id = %user_id, error = %e);
            return Err(e);
        }
        Ok(())
    }

    /// Newest first. Degrades to an empty listing when the store is disabled
    /// or the query fails.
    pub async fn list(&self, user_id: &Uuid) -> Vec<ClaimRecord> {
        let db = match &self.database {
            Some(db) => db,
            None => return Vec::new(),
        };

        match db.claims_for_user(user_id).await {
            Ok(records) => records,
            Err(e) => {
                error!(action = "history_fetch_failed", user_id = %user_id, error = %e);
                Vec::new()
            }
        }
    }

    pub async fn export_csv(&self, user_id: &Uuid) -> Result<String> {
        let records = self.list(user_id).await;

        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record([
            "id",
            "user_id",
            "original_text",
            "normalized_text",
            "status",
            "created_at",
        ])?;
        for record in &records {
            writer.write_record([
                record.id.to_string(),
                record.user_id.to_string(),
                record.original_text.clone(),
                record.normalized_text.clone(),
                record.status.clone(),
                record.created_at.to_rfc3339(),
            ])?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| crate::errors::AppError::SerializationError(e.to_string()))?;
        String::from_utf8(bytes)
            .map_err(|e| crate::errors::AppError::SerializationError(e.to_string()))
    }
}
