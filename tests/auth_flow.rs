use claimnorm::database::sqlite::SqliteDatabase;
use claimnorm::errors::AppError;
use claimnorm::services::auth::AuthService;
use claimnorm::services::history::HistoryService;
use std::sync::Arc;
use uuid::Uuid;

const SECRET: &str = "integration-test-secret";

async fn store_backed_auth() -> AuthService {
    let db = Arc::new(SqliteDatabase::new_in_memory().await.unwrap());
    AuthService::new(Some(db), SECRET.to_string())
}

#[tokio::test]
async fn register_twice_yields_already_exists() {
    let auth = store_backed_auth().await;

    auth.register("adjuster@example.com", "Pass-word1").await.unwrap();
    let second = auth.register("adjuster@example.com", "Other-pass2").await;
    assert!(matches!(second, Err(AppError::AlreadyExists(_))));
}

#[tokio::test]
async fn login_with_correct_password_returns_stored_identity() {
    let auth = store_backed_auth().await;

    let created = auth.register("adjuster@example.com", "Pass-word1").await.unwrap();
    let logged_in = auth.login("adjuster@example.com", "Pass-word1").await.unwrap();
    assert_eq!(logged_in.id, created.id);
    assert_eq!(logged_in.email, "adjuster@example.com");
}

#[tokio::test]
async fn login_with_wrong_password_is_invalid_credentials() {
    let auth = store_backed_auth().await;

    auth.register("adjuster@example.com", "Pass-word1").await.unwrap();
    let attempt = auth.login("adjuster@example.com", "not-the-password").await;
    assert!(matches!(attempt, Err(AppError::InvalidCredentials)));
}

#[tokio::test]
async fn login_with_unknown_email_is_not_found() {
    let auth = store_backed_auth().await;

    let attempt = auth.login("nobody@example.com", "whatever-pw").await;
    assert!(matches!(attempt, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn demo_mode_login_always_succeeds_with_placeholder_identity() {
    let auth = AuthService::new(None, SECRET.to_string());

    let first = auth.login("anyone@example.com", "any password").await.unwrap();
    let second = auth.login("someone-else@example.com", "garbage").await.unwrap();
    assert!(first.is_demo());
    assert!(second.is_demo());
    assert_eq!(first.id, second.id);
}

#[tokio::test]
async fn demo_mode_register_is_store_disabled() {
    let auth = AuthService::new(None, SECRET.to_string());

    let attempt = auth.register("anyone@example.com", "Pass-word1").await;
    assert!(matches!(attempt, Err(AppError::StoreDisabled)));
}

#[tokio::test]
async fn demo_mode_history_is_empty() {
    let history = HistoryService::new(None);

    // record is a silent no-op without a store
    history.record(&Uuid::nil(), "original", "normalized").await.unwrap();
    assert!(history.list(&Uuid::nil()).await.is_empty());
}

#[tokio::test]
async fn session_token_round_trip_and_revocation() {
    let auth = store_backed_auth().await;
    auth.register("adjuster@example.com", "Pass-word1").await.unwrap();

    let (user, token) = auth
        .login_and_generate_token("adjuster@example.com", "Pass-word1")
        .await
        .unwrap();

    let session = auth.validate_token(&token).await.unwrap();
    assert_eq!(session.user_id, user.id);
    assert_eq!(session.email, "adjuster@example.com");

    auth.logout(&token).await.unwrap();
    assert!(auth.validate_token(&token).await.is_err());
}
