use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Placeholder identity used when no database is configured. Login always
    /// succeeds with this identity; nothing it does is ever persisted.
    pub fn demo(email: &str) -> Self {
        Self {
            id: Uuid::nil(),
            email: email.to_string(),
            password_hash: String::new(),
            created_at: Utc::now(),
        }
    }

    pub fn is_demo(&self) -> bool {
        self.id.is_nil()
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        UserResponse {
            id: user.id,
            email: user.email,
            created_at: user.created_at,
        }
    }
}
