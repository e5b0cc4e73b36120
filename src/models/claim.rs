use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

pub const STATUS_PROCESSED: &str = "processed";

/// One persisted normalization. Written exactly once per processed row and
/// never mutated or deleted afterwards. The normalized text is either genuine
/// model output or an error-tagged placeholder; failed rows are recorded too.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ClaimRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub original_text: String,
    pub normalized_text: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl ClaimRecord {
    pub fn new(user_id: Uuid, original_text: &str, normalized_text: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            original_text: original_text.to_string(),
            normalized_text: normalized_text.to_string(),
            status: STATUS_PROCESSED.to_string(),
            created_at: Utc::now(),
        }
    }
}
