use crate::services::batch::{BatchSummary, CsvPreview, ProcessedRow};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub message: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub expires_in: u64,
    pub user_id: Option<Uuid>,
    pub email: Option<String>,
    pub demo_mode: bool,
    pub message: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TokenRequest {
    pub token: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ValidateResponse {
    pub valid: bool,
    pub user_id: Option<Uuid>,
    pub email: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LogoutResponse {
    pub message: String,
}

/// CSV content travels in the request body as text; the original table plus
/// derived columns comes back the same way.
#[derive(Debug, Deserialize, ToSchema)]
pub struct PreviewRequest {
    pub csv: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PreviewResponse {
    pub preview: Option<CsvPreview>,
    pub message: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ProcessRequest {
    pub csv: String,
    pub column: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProcessResponse {
    pub rows: Vec<ProcessedRow>,
    pub summary: Option<BatchSummary>,
    pub result_csv: String,
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ClaimRecordSummary {
    pub id: Uuid,
    pub original_text: String,
    pub normalized_text: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HistoryResponse {
    pub records: Vec<ClaimRecordSummary>,
    pub total: usize,
    pub latest_entry: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AboutResponse {
    pub name: String,
    pub description: String,
    pub features: Vec<String>,
}
