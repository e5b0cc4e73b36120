use crate::errors::{AppError, Result};
use crate::models::claim::ClaimRecord;
use crate::models::user::User;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};
use std::path::Path;
use tracing::info;
use uuid::Uuid;

#[derive(Debug)]
pub struct SqliteDatabase {
    pool: SqlitePool,
}

// Timestamps are stored as fixed-width RFC 3339 text (microsecond precision)
// so that lexicographic ORDER BY is chronological.
fn format_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| AppError::DatabaseError(format!("Invalid timestamp '{}': {}", raw, e)))
}

fn parse_uuid(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|e| AppError::DatabaseError(format!("Invalid uuid '{}': {}", raw, e)))
}

impl SqliteDatabase {
    pub async fn new(database_path: &str) -> Result<Self> {
        if let Some(parent) = Path::new(database_path).parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::DatabaseError(format!("Failed to create database directory: {}", e))
            })?;
        }

        if !Path::new(database_path).exists() {
            std::fs::File::create(database_path).map_err(|e| {
                AppError::DatabaseError(format!("Failed to create database file: {}", e))
            })?;
        }

        let database_url = format!("sqlite:{}", database_path);
        let pool = SqlitePool::connect(&database_url)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to connect to database: {}", e)))?;

        let db = Self { pool };
        db.create_tables().await?;

        info!(action = "database_connected", path = %database_path);
        Ok(db)
    }

    /// Single-connection in-memory database, used by tests.
    pub async fn new_in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to open in-memory database: {}", e)))?;

        let db = Self { pool };
        db.create_tables().await?;
        Ok(db)
    }

    async fn create_tables(&self) -> Result<()> {
        let query = r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                email TEXT UNIQUE NOT NULL,
                password_hash TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS claims (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                original_text TEXT NOT NULL,
                normalized_text TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'processed',
                created_at TEXT NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users (id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS user_tokens (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                token_id TEXT UNIQUE NOT NULL,
                token_hash TEXT NOT NULL,
                created_at TEXT NOT NULL,
                expires_at TEXT NOT NULL,
                is_active BOOLEAN DEFAULT TRUE,
                FOREIGN KEY (user_id) REFERENCES users (id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_claims_user_created
                ON claims (user_id, created_at DESC);
        "#;

        sqlx::query(query)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to create tables: {}", e)))?;

        Ok(())
    }

    // ---- users ----

    pub async fn create_user(&self, user: &User) -> Result<()> {
        sqlx::query(
            r#"INSERT INTO users (id, email, password_hash, created_at) VALUES (?, ?, ?, ?)"#,
        )
        .bind(user.id.to_string())
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(format_ts(&user.created_at))
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to create user: {}", e)))?;

        Ok(())
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query(
            r#"SELECT id, email, password_hash, created_at FROM users WHERE email = ?"#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| self.row_to_user(&r)).transpose()
    }

    fn row_to_user(&self, row: &sqlx::sqlite::SqliteRow) -> Result<User> {
        Ok(User {
            id: parse_uuid(row.get("id"))?,
            email: row.get("email"),
            password_hash: row.get("password_hash"),
            created_at: parse_ts(row.get("created_at"))?,
        })
    }

    // ---- claims ----

    pub async fn insert_claim(&self, record: &ClaimRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO claims (id, user_id, original_text, normalized_text, status, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.id.to_string())
        .bind(record.user_id.to_string())
        .bind(&record.original_text)
        .bind(&record.normalized_text)
        .bind(&record.status)
        .bind(format_ts(&record.created_at))
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to insert claim: {}", e)))?;

        Ok(())
    }

    /// All claims for a user, newest first. Insertion order breaks timestamp ties.
    pub async fn claims_for_user(&self, user_id: &Uuid) -> Result<Vec<ClaimRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, original_text, normalized_text, status, created_at
            FROM claims
            WHERE user_id = ?
            ORDER BY created_at DESC, rowid DESC
            "#,
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to fetch claims: {}", e)))?;

        rows.iter()
            .map(|row| {
                Ok(ClaimRecord {
                    id: parse_uuid(row.get("id"))?,
                    user_id: parse_uuid(row.get("user_id"))?,
                    original_text: row.get("original_text"),
                    normalized_text: row.get("normalized_text"),
                    status: row.get("status"),
                    created_at: parse_ts(row.get("created_at"))?,
                })
            })
            .collect()
    }

    pub async fn count_claims_for_user(&self, user_id: &Uuid) -> Result<i64> {
        let row = sqlx::query(r#"SELECT COUNT(*) AS n FROM claims WHERE user_id = ?"#)
            .bind(user_id.to_string())
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("n"))
    }

    // ---- session tokens ----

    pub async fn store_user_token(
        &self,
        user_id: &Uuid,
        token_id: &str,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO user_tokens (user_id, token_id, token_hash, created_at, expires_at, is_active)
            VALUES (?, ?, ?, ?, ?, TRUE)
            "#,
        )
        .bind(user_id.to_string())
        .bind(token_id)
        .bind(token_hash)
        .bind(format_ts(&Utc::now()))
        .bind(format_ts(&expires_at))
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to store token: {}", e)))?;

        Ok(())
    }

    pub async fn is_token_valid(&self, token_id: &str) -> Result<bool> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS n FROM user_tokens
            WHERE token_id = ? AND is_active = TRUE AND expires_at > ?
            "#,
        )
        .bind(token_id)
        .bind(format_ts(&Utc::now()))
        .fetch_one(&self.pool)
        .await?;

        let n: i64 = row.get("n");
        Ok(n > 0)
    }

    pub async fn revoke_token(&self, token_id: &str) -> Result<()> {
        sqlx::query(r#"UPDATE user_tokens SET is_active = FALSE WHERE token_id = ?"#)
            .bind(token_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn cleanup_expired_tokens(&self) -> Result<u64> {
        let result = sqlx::query(r#"DELETE FROM user_tokens WHERE expires_at <= ?"#)
            .bind(format_ts(&Utc::now()))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
