use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::auth::CurrentUser;

#[derive(Debug, Deserialize, Validate)]
pub struct SignUpRequest {
    #[validate(
        length(min = 1, max = 255, message = "Ensure this value has between 1 and 255 characters."),
        custom(function = "validate_username")
    )]
    pub username: String,

    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,

    #[validate(length(min = 8, message = "Ensure this value has at least 8 characters."))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SignInRequest {
    #[validate(length(min = 1, message = "This field may not be blank."))]
    pub username: String,

    #[validate(length(min = 1, message = "This field may not be blank."))]
    pub password: String,
}

/// Usernames may contain letters, digits and `@ . + - _`.
fn validate_username(username: &str) -> Result<(), ValidationError> {
    let allowed = |c: char| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_');
    if username.chars().all(allowed) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_username").with_message(Cow::Borrowed(
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
        )))
    }
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub id: i64,
}

#[derive(Debug, Serialize)]
pub struct CsrfTokenResponse {
    pub csrftoken: String,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
}

impl From<CurrentUser> for UserResponse {
    fn from(user: CurrentUser) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign_up(username: &str, email: &str, password: &str) -> SignUpRequest {
        SignUpRequest {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn accepts_valid_sign_up() {
        assert!(sign_up("jane.doe+todo", "jane@example.com", "password123").validate().is_ok());
    }

    #[test]
    fn rejects_short_password() {
        let errors = sign_up("jane", "jane@example.com", "short").validate().unwrap_err();
        assert!(errors.field_errors().contains_key("password"));
    }

    #[test]
    fn rejects_bad_email() {
        let errors = sign_up("jane", "not-an-email", "password123").validate().unwrap_err();
        assert!(errors.field_errors().contains_key("email"));
    }

    #[test]
    fn rejects_long_or_odd_usernames() {
        let long = "a".repeat(256);
        assert!(sign_up(&long, "jane@example.com", "password123").validate().is_err());
        assert!(sign_up(&"a".repeat(255), "jane@example.com", "password123").validate().is_ok());
        assert!(sign_up("jane doe", "jane@example.com", "password123").validate().is_err());
        assert!(sign_up("", "jane@example.com", "password123").validate().is_err());
    }
}
