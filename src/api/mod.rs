use crate::config::AppConfig;
use crate::database::sqlite::SqliteDatabase;
use crate::errors::Result;
use crate::services::normalizer::{GeminiNormalizer, Normalizer};
use crate::utils::middleware::global_rate_limiter;
use axum::http::Method;
use axum::response::IntoResponse;
use axum::{Json, Router};
use once_cell::sync::OnceCell;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, Instrument};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use uuid::Uuid;

pub mod routes;
pub mod types;

pub struct AppState {
    pub config: AppConfig,
    pub database: Option<Arc<SqliteDatabase>>,
    pub normalizer: Arc<dyn Normalizer>,
}

pub static APP_STATE: OnceCell<Arc<AppState>> = OnceCell::new();

pub fn app_state() -> Arc<AppState> {
    APP_STATE.get().expect("app state not initialized").clone()
}

#[derive(OpenApi)]
#[openapi(
    paths(
        routes::register,
        routes::login,
        routes::validate,
        routes::logout,
        routes::preview_claims,
        routes::process_claims,
        routes::view_history,
        routes::export_history,
        routes::about,
    ),
    components(
        schemas(
            types::RegisterRequest,
            types::RegisterResponse,
            types::LoginRequest,
            types::LoginResponse,
            types::TokenRequest,
            types::ValidateResponse,
            types::LogoutResponse,
            types::PreviewRequest,
            types::PreviewResponse,
            types::ProcessRequest,
            types::ProcessResponse,
            types::ClaimRecordSummary,
            types::HistoryResponse,
            types::AboutResponse,
            crate::services::batch::ProcessedRow,
            crate::services::batch::BatchSummary,
            crate::services::batch::CsvPreview,
        )
    ),
    tags(
        (name = "Auth", description = "Registration, login and session endpoints"),
        (name = "Claims", description = "CSV upload, preview and batch normalization. Requires a Bearer token from /api/auth/login."),
        (name = "History", description = "Per-user normalization history and CSV export")
    )
)]
pub struct ApiDoc;

pub async fn request_id_middleware(
    mut req: axum::http::Request<axum::body::Body>,
    next: axum::middleware::Next,
) -> axum::response::Response {
    let request_id = Uuid::new_v4().to_string();
    req.extensions_mut().insert(request_id.clone());
    let span = tracing::info_span!("request", request_id = %request_id, method = %req.method(), uri = %req.uri());
    next.run(req).instrument(span).await
}

/// Builds the application state from config: real SQLite store when a path is
/// configured, demo mode otherwise. The Gemini key may be absent; calls then
/// come back as error-tagged rows rather than failing at startup.
pub async fn init_state(config: AppConfig) -> Result<Arc<AppState>> {
    let database = match &config.database_path {
        Some(path) => Some(Arc::new(SqliteDatabase::new(path).await?)),
        None => {
            info!(action = "demo_mode", reason = "DATABASE_PATH not configured");
            None
        }
    };

    let normalizer: Arc<dyn Normalizer> = Arc::new(GeminiNormalizer::new(
        config.gemini_api_key.clone().unwrap_or_default(),
    ));

    Ok(Arc::new(AppState {
        config,
        database,
        normalizer,
    }))
}

pub fn build_router() -> Router {
    let openapi = ApiDoc::openapi();

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .nest("/api/auth", routes::auth_router())
        .nest("/api/claims", routes::claims_router())
        .nest("/api/history", routes::history_router())
        .route("/api/about", axum::routing::get(routes::about))
        .route("/health", axum::routing::get(health_check))
        .route("/docs/openapi.json", axum::routing::get(openapi_json))
        .merge(SwaggerUi::new("/api/docs").url("/api/openapi.json", openapi))
        .layer(cors)
        .layer(axum::middleware::from_fn(global_rate_limiter))
        .layer(axum::middleware::from_fn(request_id_middleware))
}

pub async fn start_http_server(config: AppConfig) -> Result<()> {
    let port = config.port;
    let state = init_state(config).await?;
    APP_STATE
        .set(state)
        .map_err(|_| crate::errors::AppError::InternalError("App state already set".to_string()))?;

    let app = build_router();

    let addr: SocketAddr = format!("0.0.0.0:{}", port)
        .parse()
        .map_err(|e| crate::errors::AppError::ConfigError(format!("Invalid listen address: {}", e)))?;

    info!(action = "http_server_started", addr = %addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| crate::errors::AppError::InternalError(format!("Failed to bind {}: {}", addr, e)))?;
    axum::serve(listener, app)
        .await
        .map_err(|e| crate::errors::AppError::InternalError(format!("Server error: {}", e)))?;

    Ok(())
}

async fn health_check() -> impl IntoResponse {
    "OK"
}

/// Export OpenAPI specification as JSON
async fn openapi_json() -> Json<Value> {
    let openapi = ApiDoc::openapi();
    Json(serde_json::to_value(openapi).unwrap_or_default())
}
