use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use super::validate_slug;

/// Represents the 'categories' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Category {
    #[serde(skip)]
    pub id: i64,
    pub name: String,
    pub slug: String,
}

/// DTO for creating a new category.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCategoryRequest {
    #[validate(length(min = 1, max = 256))]
    pub name: String,

    #[validate(length(min = 1, max = 50), custom(function = validate_slug))]
    pub slug: String,
}

/// Query parameters for listing categories.
#[derive(Debug, Deserialize)]
pub struct CategoryListParams {
    /// Substring match on name.
    pub search: Option<String>,

    /// Number of items to return (default: 20, max: 100).
    pub limit: Option<i64>,

    pub offset: Option<i64>,
}
