// src/models/user.rs

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::{Validate, ValidationError};

static USERNAME_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[\w.@+-]+$").unwrap());

/// Usernames that collide with API routes.
const RESERVED_USERNAMES: &[&str] = &["me"];

/// Validates the username character set.
pub fn validate_username_pattern(username: &str) -> Result<(), ValidationError> {
    if !USERNAME_RE.is_match(username) {
        return Err(ValidationError::new("invalid_username"));
    }
    Ok(())
}

/// Validates the username character set and rejects reserved names.
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    validate_username_pattern(username)?;
    if RESERVED_USERNAMES.contains(&username) {
        return Err(ValidationError::new("reserved_username"));
    }
    Ok(())
}

/// Validates the role field on admin user writes.
pub fn validate_role(role: &str) -> Result<(), ValidationError> {
    match role {
        "user" | "moderator" | "admin" => Ok(()),
        _ => Err(ValidationError::new("unknown_role")),
    }
}

/// Represents the 'users' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: i64,

    /// Unique username.
    pub username: String,

    /// Unique email address.
    pub email: String,

    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,

    /// User role: 'user', 'moderator' or 'admin'.
    pub role: String,

    /// Argon2 hash of the last confirmation code issued at signup.
    /// Skipped during serialization to prevent leaking sensitive data.
    #[serde(skip)]
    pub confirmation_code: Option<String>,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for self-service registration. Only the identity pair; the
/// confirmation code arrives out of band.
#[derive(Debug, Deserialize, Validate)]
pub struct SignUpRequest {
    #[validate(
        length(min = 1, max = 150, message = "Username must be at most 150 characters."),
        custom(function = validate_username)
    )]
    pub username: String,

    #[validate(email, length(max = 254))]
    pub email: String,
}

/// DTO for exchanging a confirmation code for an access token.
#[derive(Debug, Deserialize, Validate)]
pub struct TokenRequest {
    #[validate(
        length(min = 1, max = 150),
        custom(function = validate_username_pattern)
    )]
    pub username: String,

    #[validate(length(min = 1, max = 150))]
    pub confirmation_code: String,
}

/// DTO for an admin creating a user (can specify role).
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(
        length(min = 1, max = 150, message = "Username must be at most 150 characters."),
        custom(function = validate_username)
    )]
    pub username: String,

    #[validate(email, length(max = 254))]
    pub email: String,

    #[validate(length(max = 150))]
    pub first_name: Option<String>,

    #[validate(length(max = 150))]
    pub last_name: Option<String>,

    pub bio: Option<String>,

    #[validate(custom(function = validate_role))]
    pub role: Option<String>,
}

/// DTO for an admin updating a user. Fields are optional.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(
        length(min = 1, max = 150),
        custom(function = validate_username)
    )]
    pub username: Option<String>,

    #[validate(email, length(max = 254))]
    pub email: Option<String>,

    #[validate(length(max = 150))]
    pub first_name: Option<String>,

    #[validate(length(max = 150))]
    pub last_name: Option<String>,

    pub bio: Option<String>,

    #[validate(custom(function = validate_role))]
    pub role: Option<String>,
}

/// DTO for a user updating their own profile. No role field: a posted
/// 'role' key is dropped during deserialization, so users cannot promote
/// themselves.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateMeRequest {
    #[validate(
        length(min = 1, max = 150),
        custom(function = validate_username)
    )]
    pub username: Option<String>,

    #[validate(email, length(max = 254))]
    pub email: Option<String>,

    #[validate(length(max = 150))]
    pub first_name: Option<String>,

    #[validate(length(max = 150))]
    pub last_name: Option<String>,

    pub bio: Option<String>,
}

/// Query parameters for listing users.
#[derive(Debug, Deserialize)]
pub struct UserListParams {
    /// Substring match on username.
    pub search: Option<String>,

    /// Number of items to return (default: 20, max: 100).
    pub limit: Option<i64>,

    pub offset: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_pattern_accepts_word_chars_and_symbols() {
        assert!(validate_username("some.user@host+x-1").is_ok());
        assert!(validate_username("bad name").is_err());
        assert!(validate_username("bad!name").is_err());
    }

    #[test]
    fn reserved_username_rejected() {
        assert!(validate_username("me").is_err());
        // The token endpoint only checks the pattern.
        assert!(validate_username_pattern("me").is_ok());
    }

    #[test]
    fn role_must_be_known() {
        assert!(validate_role("moderator").is_ok());
        assert!(validate_role("owner").is_err());
    }

    #[test]
    fn signup_request_validation() {
        let ok = SignUpRequest {
            username: "reader_1".to_string(),
            email: "reader@example.com".to_string(),
        };
        assert!(ok.validate().is_ok());

        let bad_email = SignUpRequest {
            username: "reader_1".to_string(),
            email: "not-an-email".to_string(),
        };
        assert!(bad_email.validate().is_err());
    }
}
