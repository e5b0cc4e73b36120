use crate::database::sqlite::SqliteDatabase;
use crate::errors::{AppError, Result};
use crate::models::user::User;
use crate::services::jwt::{AuthenticatedUser, JwtManager};
use crate::utils::crypto::PasswordManager;
use chrono::{Duration, Utc};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Auth against the `users` table, or the demo fallback when no database is
/// configured: login then always succeeds with a placeholder identity and
/// registration is refused. The fallback is for offline demoing, not security.
pub struct AuthService {
    jwt_manager: JwtManager,
    database: Option<Arc<SqliteDatabase>>,
}

impl AuthService {
    pub fn new(database: Option<Arc<SqliteDatabase>>, jwt_secret: String) -> Self {
        Self {
            jwt_manager: JwtManager::new(jwt_secret),
            database,
        }
    }

    pub async fn register(&self, email: &str, password: &str) -> Result<User> {
        let db = self.database.as_ref().ok_or(AppError::StoreDisabled)?;

        if db.get_user_by_email(email).await?.is_some() {
            return Err(AppError::AlreadyExists(email.to_string()));
        }

        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: PasswordManager::hash_password(password)?,
            created_at: Utc::now(),
        };
        db.create_user(&user).await?;

        info!(action = "register_success", user = %email);
        Ok(user)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<User> {
        let db = match &self.database {
            Some(db) => db,
            None => {
                info!(action = "login_demo_mode", user = %email);
                return Ok(User::demo(email));
            }
        };

        let user = db
            .get_user_by_email(email)
            .await?
            .ok_or_else(|| AppError::NotFound(email.to_string()))?;

        if !PasswordManager::verify_password(password, &user.password_hash)? {
            return Err(AppError::InvalidCredentials);
        }

        Ok(user)
    }

    /// Authenticate and open a session: issues a JWT and, when the store is
    /// enabled, records its hash so it can be revoked at logout.
    pub async fn login_and_generate_token(&self, email: &str, password: &str) -> Result<(User, String)> {
        let user = self.login(email, password).await?;
        let token = self.jwt_manager.generate_token(&user.id, &user.email)?;

        if let Some(db) = &self.database {
            let token_data = self.jwt_manager.validate_token(&token)?;
            let token_hash = self.hash_token(&token);
            let expires_at = Utc::now() + Duration::hours(24);
            db.store_user_token(&user.id, &token_data.claims.jti, &token_hash, expires_at)
                .await?;
            let _ = db.cleanup_expired_tokens().await;
        }

        info!(action = "login_success", user = %user.email);
        Ok((user, token))
    }

    pub async fn validate_token(&self, token: &str) -> Result<AuthenticatedUser> {
        let token_data = self.jwt_manager.validate_token(token)?;

        // Demo-mode tokens are stateless; store-backed tokens must still be active.
        if let Some(db) = &self.database {
            if !db.is_token_valid(&token_data.claims.jti).await? {
                return Err(AppError::AuthenticationError(
                    "Token revoked or expired".to_string(),
                ));
            }
        }

        AuthenticatedUser::try_from(token_data.claims)
    }

    pub async fn logout(&self, token: &str) -> Result<()> {
        let token_data = self.jwt_manager.validate_token(token)?;
        if let Some(db) = &self.database {
            db.revoke_token(&token_data.claims.jti).await?;
        }
        info!(action = "logout", user = %token_data.claims.email);
        Ok(())
    }

    fn hash_token(&self, token: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}
