// src/models/mod.rs

pub mod category;
pub mod comment;
pub mod genre;
pub mod review;
pub mod title;
pub mod user;

use std::sync::LazyLock;

use regex::Regex;
use validator::ValidationError;

static SLUG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[-a-zA-Z0-9_]+$").unwrap());

/// Validates a URL-safe slug (letters, digits, hyphens, underscores).
pub fn validate_slug(slug: &str) -> Result<(), ValidationError> {
    if !SLUG_RE.is_match(slug) {
        return Err(ValidationError::new("invalid_slug"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_pattern() {
        assert!(validate_slug("sci-fi_2").is_ok());
        assert!(validate_slug("with space").is_err());
        assert!(validate_slug("кино").is_err());
    }
}
