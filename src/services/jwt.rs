use crate::errors::{AppError, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
}

pub struct JwtManager {
    secret: String,
}

impl JwtManager {
    pub fn new(secret: String) -> Self {
        Self { secret }
    }

    pub fn generate_token(&self, user_id: &Uuid, email: &str) -> Result<String> {
        let now = Utc::now();
        let expiration = now + Duration::hours(24);
        let jti = Uuid::new_v4().to_string();

        let claims = Claims {
            sub: user_id.to_string(),
            email: email.to_string(),
            exp: expiration.timestamp(),
            iat: now.timestamp(),
            jti,
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_ref()),
        )
        .map_err(|e| AppError::AuthenticationError(format!("Failed to generate token: {}", e)))?;

        Ok(token)
    }

    pub fn validate_token(&self, token: &str) -> Result<TokenData<Claims>> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_ref()),
            &Validation::default(),
        )
        .map_err(|e| AppError::AuthenticationError(format!("Invalid token: {}", e)))?;

        Ok(token_data)
    }
}

/// Per-request session context, recovered from a validated token. Created at
/// login, torn down by revoking the token row at logout.
#[derive(Debug)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub email: String,
    pub token_id: String,
}

impl TryFrom<Claims> for AuthenticatedUser {
    type Error = AppError;

    fn try_from(claims: Claims) -> Result<Self> {
        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|e| AppError::ValidationError(format!("Invalid user ID in token: {}", e)))?;

        Ok(Self {
            user_id,
            email: claims.email,
            token_id: claims.jti,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trip() {
        let manager = JwtManager::new("test-secret".to_string());
        let user_id = Uuid::new_v4();
        let token = manager.generate_token(&user_id, "a@b.com").unwrap();

        let data = manager.validate_token(&token).unwrap();
        let user = AuthenticatedUser::try_from(data.claims).unwrap();
        assert_eq!(user.user_id, user_id);
        assert_eq!(user.email, "a@b.com");
    }

    #[test]
    fn rejects_token_signed_with_other_secret() {
        let manager = JwtManager::new("secret-a".to_string());
        let token = manager.generate_token(&Uuid::new_v4(), "a@b.com").unwrap();

        let other = JwtManager::new("secret-b".to_string());
        assert!(other.validate_token(&token).is_err());
    }
}
