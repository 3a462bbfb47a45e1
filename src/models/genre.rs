use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use super::validate_slug;

/// Represents the 'genres' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Genre {
    #[serde(skip)]
    pub id: i64,
    pub name: String,
    pub slug: String,
}

/// DTO for creating a new genre.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateGenreRequest {
    #[validate(length(min = 1, max = 256))]
    pub name: String,

    #[validate(length(min = 1, max = 50), custom(function = validate_slug))]
    pub slug: String,
}

/// Query parameters for listing genres.
#[derive(Debug, Deserialize)]
pub struct GenreListParams {
    /// Substring match on name.
    pub search: Option<String>,

    /// Number of items to return (default: 20, max: 100).
    pub limit: Option<i64>,

    pub offset: Option<i64>,
}
