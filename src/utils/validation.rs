use crate::errors::{AppError, Result};
use regex::Regex;

pub struct Validator;

impl Validator {
    pub fn validate_email(email: &str) -> Result<()> {
        let email_regex = Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .map_err(|e| AppError::InternalError(format!("Regex error: {}", e)))?;

        if !email_regex.is_match(email) {
            return Err(AppError::ValidationError("Invalid email format".to_string()));
        }

        if email.len() > 254 {
            return Err(AppError::ValidationError("Email too long".to_string()));
        }

        Ok(())
    }

    pub fn validate_password(password: &str) -> Result<()> {
        if password.len() < 8 {
            return Err(AppError::ValidationError(
                "Password must be at least 8 characters long".to_string(),
            ));
        }

        if password.len() > 128 {
            return Err(AppError::ValidationError(
                "Password must be less than 128 characters".to_string(),
            ));
        }

        Ok(())
    }

    /// The CSV column holding the claim text, chosen by the client at runtime.
    pub fn validate_column_name(column: &str) -> Result<()> {
        if column.trim().is_empty() {
            return Err(AppError::ValidationError(
                "Column name must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_email() {
        assert!(Validator::validate_email("adjuster@example.com").is_ok());
    }

    #[test]
    fn rejects_malformed_email() {
        assert!(Validator::validate_email("not-an-email").is_err());
        assert!(Validator::validate_email("a@b").is_err());
    }

    #[test]
    fn password_length_bounds() {
        assert!(Validator::validate_password("short").is_err());
        assert!(Validator::validate_password("long enough pw").is_ok());
    }

    #[test]
    fn empty_column_rejected() {
        assert!(Validator::validate_column_name("  ").is_err());
        assert!(Validator::validate_column_name("text").is_ok());
    }
}
