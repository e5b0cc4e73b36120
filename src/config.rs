use crate::errors::{AppError, Result};

/// Placeholder value that counts as "no database configured", so a copied
/// sample .env does not accidentally enable persistence.
pub const DATABASE_PATH_PLACEHOLDER: &str = "YOUR_DATABASE_PATH";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub gemini_api_key: Option<String>,
    pub database_path: Option<String>,
    pub jwt_secret: String,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let jwt_secret = std::env::var("JWT_SECRET")
            .map_err(|_| AppError::ConfigError("JWT_SECRET must be set".to_string()))?;

        let database_path = std::env::var("DATABASE_PATH")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty() && v != DATABASE_PATH_PLACEHOLDER);

        let gemini_api_key = std::env::var("GEMINI_API_KEY")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        let port = std::env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(8080);

        Ok(Self {
            gemini_api_key,
            database_path,
            jwt_secret,
            port,
        })
    }

    /// Demo mode: no persistent store, auth always succeeds with a
    /// placeholder identity and history is never written.
    pub fn demo_mode(&self) -> bool {
        self.database_path.is_none()
    }
}
