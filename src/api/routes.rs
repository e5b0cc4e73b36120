use crate::api::types::*;
use crate::api::{app_state, AppState};
use crate::errors::AppError;
use crate::services::auth::AuthService;
use crate::services::batch::BatchService;
use crate::services::history::HistoryService;
use crate::services::jwt::AuthenticatedUser;
use crate::utils::validation::Validator;
use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use tracing::{error, info};
use uuid::Uuid;

const PREVIEW_ROW_LIMIT: usize = 20;

// JWT extractor for Authorization: Bearer ...
pub struct AuthBearer(pub String);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthBearer
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, String);
    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(auth) = parts.headers.get(AUTHORIZATION) {
            if let Ok(auth_str) = auth.to_str() {
                if let Some(token) = auth_str.strip_prefix("Bearer ") {
                    return Ok(AuthBearer(token.to_string()));
                }
            }
        }
        Err((StatusCode::UNAUTHORIZED, "Missing or invalid Authorization header".to_string()))
    }
}

fn auth_service(state: &AppState) -> AuthService {
    AuthService::new(state.database.clone(), state.config.jwt_secret.clone())
}

fn batch_service(state: &AppState) -> BatchService {
    BatchService::new(
        state.normalizer.clone(),
        HistoryService::new(state.database.clone()),
    )
}

async fn user_from_token(token: &str) -> Result<AuthenticatedUser, StatusCode> {
    let state = app_state();
    auth_service(&state)
        .validate_token(token)
        .await
        .map_err(|_| StatusCode::UNAUTHORIZED)
}

pub fn auth_router() -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/validate", post(validate))
        .route("/logout", post(logout))
}

pub fn claims_router() -> Router {
    Router::new()
        .route("/preview", post(preview_claims))
        .route("/process", post(process_claims))
}

pub fn history_router() -> Router {
    Router::new()
        .route("/", get(view_history))
        .route("/export", get(export_history))
}

#[utoipa::path(post, path = "/api/auth/register", request_body = RegisterRequest, responses((status = 200, body = RegisterResponse), (status = 409, description = "Email already registered"), (status = 503, description = "Store disabled (demo mode)")))]
pub async fn register(Json(req): Json<RegisterRequest>) -> impl IntoResponse {
    let state = app_state();
    let email = req.email.trim().to_string();

    if let Err(_e) = Validator::validate_email(&email) {
        return (
            StatusCode::BAD_REQUEST,
            Json(RegisterResponse {
                user_id: Uuid::nil(),
                message: "Invalid email address.".to_string(),
            }),
        );
    }
    if let Err(_e) = Validator::validate_password(&req.password) {
        return (
            StatusCode::BAD_REQUEST,
            Json(RegisterResponse {
                user_id: Uuid::nil(),
                message: "Invalid password.".to_string(),
            }),
        );
    }

    match auth_service(&state).register(&email, &req.password).await {
        Ok(user) => (
            StatusCode::OK,
            Json(RegisterResponse {
                user_id: user.id,
                message: "Account created. Please log in.".to_string(),
            }),
        ),
        Err(AppError::AlreadyExists(_)) => {
            info!(action = "register_email_conflict", user = %email);
            (
                StatusCode::CONFLICT,
                Json(RegisterResponse {
                    user_id: Uuid::nil(),
                    message: "This email is already registered. Try logging in or use a different email.".to_string(),
                }),
            )
        }
        Err(AppError::StoreDisabled) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(RegisterResponse {
                user_id: Uuid::nil(),
                message: "Database disabled - running in demo mode. Any login will work.".to_string(),
            }),
        ),
        Err(e) => {
            error!(action = "register_failed", user = %email, error = %e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(RegisterResponse {
                    user_id: Uuid::nil(),
                    message: "Could not create account. Please try again later.".to_string(),
                }),
            )
        }
    }
}

#[utoipa::path(post, path = "/api/auth/login", request_body = LoginRequest, responses((status = 200, body = LoginResponse), (status = 401, description = "Unknown user or wrong password")))]
pub async fn login(Json(req): Json<LoginRequest>) -> impl IntoResponse {
    let state = app_state();
    let demo_mode = state.config.demo_mode();

    match auth_service(&state)
        .login_and_generate_token(req.email.trim(), &req.password)
        .await
    {
        Ok((user, token)) => (
            StatusCode::OK,
            Json(LoginResponse {
                token,
                expires_in: 86400,
                user_id: Some(user.id),
                email: Some(user.email),
                demo_mode,
                message: "Login successful".to_string(),
            }),
        ),
        Err(e) => {
            error!(action = "login_failed", user = %req.email, error = %e);
            let message = match e {
                AppError::NotFound(_) => "User not found.",
                AppError::InvalidCredentials => "Incorrect password.",
                _ => "Login failed. Please try again later.",
            };
            (
                StatusCode::UNAUTHORIZED,
                Json(LoginResponse {
                    token: String::new(),
                    expires_in: 0,
                    user_id: None,
                    email: None,
                    demo_mode,
                    message: message.to_string(),
                }),
            )
        }
    }
}

#[utoipa::path(post, path = "/api/auth/validate", request_body = TokenRequest, responses((status = 200, body = ValidateResponse)))]
pub async fn validate(Json(req): Json<TokenRequest>) -> impl IntoResponse {
    let state = app_state();
    match auth_service(&state).validate_token(&req.token).await {
        Ok(user) => (
            StatusCode::OK,
            Json(ValidateResponse {
                valid: true,
                user_id: Some(user.user_id),
                email: Some(user.email),
            }),
        ),
        Err(_e) => (
            StatusCode::UNAUTHORIZED,
            Json(ValidateResponse {
                valid: false,
                user_id: None,
                email: None,
            }),
        ),
    }
}

#[utoipa::path(post, path = "/api/auth/logout", request_body = TokenRequest, responses((status = 200, body = LogoutResponse)))]
pub async fn logout(Json(req): Json<TokenRequest>) -> impl IntoResponse {
    let state = app_state();
    match auth_service(&state).logout(&req.token).await {
        Ok(_) => (
            StatusCode::OK,
            Json(LogoutResponse {
                message: "Logged out successfully".to_string(),
            }),
        ),
        Err(_e) => (
            StatusCode::UNAUTHORIZED,
            Json(LogoutResponse {
                message: "Logout failed".to_string(),
            }),
        ),
    }
}

#[utoipa::path(post, path = "/api/claims/preview", request_body = PreviewRequest, responses((status = 200, body = PreviewResponse), (status = 400, description = "CSV could not be parsed"), (status = 401, description = "Unauthorized")))]
pub async fn preview_claims(
    AuthBearer(token): AuthBearer,
    Json(req): Json<PreviewRequest>,
) -> (StatusCode, Json<PreviewResponse>) {
    if user_from_token(&token).await.is_err() {
        return (
            StatusCode::UNAUTHORIZED,
            Json(PreviewResponse {
                preview: None,
                message: "Please login to continue.".to_string(),
            }),
        );
    }

    match BatchService::preview(req.csv.as_bytes(), PREVIEW_ROW_LIMIT) {
        Ok(preview) => (
            StatusCode::OK,
            Json(PreviewResponse {
                preview: Some(preview),
                message: "File parsed".to_string(),
            }),
        ),
        Err(e) => (
            StatusCode::BAD_REQUEST,
            Json(PreviewResponse {
                preview: None,
                message: format!("Could not read file: {}", e),
            }),
        ),
    }
}

#[utoipa::path(post, path = "/api/claims/process", request_body = ProcessRequest, responses((status = 200, body = ProcessResponse), (status = 400, description = "Bad CSV or unknown column"), (status = 401, description = "Unauthorized")))]
pub async fn process_claims(
    AuthBearer(token): AuthBearer,
    Json(req): Json<ProcessRequest>,
) -> (StatusCode, Json<ProcessResponse>) {
    let state = app_state();
    let user = match user_from_token(&token).await {
        Ok(u) => u,
        Err(_) => {
            return (
                StatusCode::UNAUTHORIZED,
                Json(ProcessResponse {
                    rows: vec![],
                    summary: None,
                    result_csv: String::new(),
                    message: "Please login to continue.".to_string(),
                }),
            );
        }
    };

    if let Err(e) = Validator::validate_column_name(&req.column) {
        return (
            StatusCode::BAD_REQUEST,
            Json(ProcessResponse {
                rows: vec![],
                summary: None,
                result_csv: String::new(),
                message: e.to_string(),
            }),
        );
    }

    let outcome = batch_service(&state)
        .process(&user.user_id, req.csv.as_bytes(), &req.column, |done, total| {
            info!(action = "batch_progress", user_id = %user.user_id, done = done, total = total);
        })
        .await;

    match outcome {
        Ok(outcome) => (
            StatusCode::OK,
            Json(ProcessResponse {
                rows: outcome.rows,
                summary: Some(outcome.summary),
                result_csv: outcome.result_csv,
                message: "All claims processed".to_string(),
            }),
        ),
        Err(e) => {
            error!(action = "process_claims_failed", user_id = %user.user_id, error = %e);
            let status = match e {
                AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (
                status,
                Json(ProcessResponse {
                    rows: vec![],
                    summary: None,
                    result_csv: String::new(),
                    message: e.to_string(),
                }),
            )
        }
    }
}

#[utoipa::path(get, path = "/api/history", responses((status = 200, body = HistoryResponse), (status = 401, description = "Unauthorized")))]
pub async fn view_history(AuthBearer(token): AuthBearer) -> (StatusCode, Json<HistoryResponse>) {
    let state = app_state();
    let user = match user_from_token(&token).await {
        Ok(u) => u,
        Err(_) => {
            return (
                StatusCode::UNAUTHORIZED,
                Json(HistoryResponse {
                    records: vec![],
                    total: 0,
                    latest_entry: None,
                }),
            );
        }
    };

    let records = HistoryService::new(state.database.clone())
        .list(&user.user_id)
        .await;
    let latest_entry = records.first().map(|r| r.created_at);
    let items: Vec<ClaimRecordSummary> = records
        .into_iter()
        .map(|r| ClaimRecordSummary {
            id: r.id,
            original_text: r.original_text,
            normalized_text: r.normalized_text,
            status: r.status,
            created_at: r.created_at,
        })
        .collect();

    let total = items.len();
    (
        StatusCode::OK,
        Json(HistoryResponse {
            records: items,
            total,
            latest_entry,
        }),
    )
}

#[utoipa::path(get, path = "/api/history/export", responses((status = 200, description = "History as a CSV attachment"), (status = 401, description = "Unauthorized")))]
pub async fn export_history(AuthBearer(token): AuthBearer) -> impl IntoResponse {
    let state = app_state();
    let user = match user_from_token(&token).await {
        Ok(u) => u,
        Err(_) => return (StatusCode::UNAUTHORIZED, "Unauthorized").into_response(),
    };

    match HistoryService::new(state.database.clone())
        .export_csv(&user.user_id)
        .await
    {
        Ok(csv) => axum::response::Response::builder()
            .header("Content-Type", "text/csv")
            .header("Content-Disposition", "attachment; filename=\"history.csv\"")
            .body(axum::body::Body::from(csv))
            .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response()),
        Err(e) => {
            error!(action = "export_history_failed", user_id = %user.user_id, error = %e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Export failed").into_response()
        }
    }
}

#[utoipa::path(get, path = "/api/about", responses((status = 200, body = AboutResponse)))]
pub async fn about() -> Json<AboutResponse> {
    Json(AboutResponse {
        name: "AI Claim Normalizer".to_string(),
        description: "Cleans and standardizes insurance claim descriptions using an external language model.".to_string(),
        features: vec![
            "CSV upload with column selection".to_string(),
            "Before/after length metrics per claim".to_string(),
            "Full per-user processing history with export".to_string(),
        ],
    })
}
