use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use super::{category::Category, genre::Genre, validate_slug};

/// Flat row shape produced by the titles queries: base columns, the joined
/// category and the aggregate rating. Genres are attached separately.
#[derive(Debug, FromRow)]
pub struct TitleRow {
    pub id: i64,
    pub name: String,
    pub year: i64,
    pub description: String,
    /// Rounded average review score; NULL until the first review lands.
    pub rating: Option<i64>,
    pub category_id: Option<i64>,
    pub category_name: Option<String>,
    pub category_slug: Option<String>,
}

/// Wire shape for title reads: nested category and genre objects.
#[derive(Debug, Serialize)]
pub struct TitleResponse {
    pub id: i64,
    pub name: String,
    pub year: i64,
    pub rating: Option<i64>,
    pub description: String,
    pub genre: Vec<Genre>,
    pub category: Option<Category>,
}

impl TitleRow {
    pub fn into_response(self, genres: Vec<Genre>) -> TitleResponse {
        let category = match (self.category_id, self.category_name, self.category_slug) {
            (Some(id), Some(name), Some(slug)) => Some(Category { id, name, slug }),
            _ => None,
        };
        TitleResponse {
            id: self.id,
            name: self.name,
            year: self.year,
            rating: self.rating,
            description: self.description,
            genre: genres,
            category,
        }
    }
}

/// DTO for creating a new title. Genres and the category arrive as slugs.
/// The year bound is checked in the handler against the current year.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTitleRequest {
    #[validate(length(min = 1, max = 256))]
    pub name: String,

    pub year: i64,

    #[serde(default)]
    pub description: String,

    #[validate(custom(function = validate_genre_slugs))]
    #[serde(default)]
    pub genre: Vec<String>,

    #[validate(custom(function = validate_slug))]
    pub category: Option<String>,
}

/// DTO for updating a title. Fields are optional; a present genre list
/// replaces the title's genres wholesale.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTitleRequest {
    #[validate(length(min = 1, max = 256))]
    pub name: Option<String>,

    pub year: Option<i64>,

    pub description: Option<String>,

    #[validate(custom(function = validate_genre_slugs))]
    pub genre: Option<Vec<String>>,

    #[validate(custom(function = validate_slug))]
    pub category: Option<String>,
}

/// Validates every slug in a genre list.
fn validate_genre_slugs(slugs: &[String]) -> Result<(), validator::ValidationError> {
    for slug in slugs {
        if slug.len() > 50 {
            return Err(validator::ValidationError::new("slug_too_long"));
        }
        validate_slug(slug)?;
    }
    Ok(())
}

/// Query parameters for listing titles.
#[derive(Debug, Deserialize)]
pub struct TitleListParams {
    /// Filter by category slug.
    pub category: Option<String>,

    /// Filter by genre slug.
    pub genre: Option<String>,

    /// Substring match on name.
    pub name: Option<String>,

    /// Exact release year.
    pub year: Option<i64>,

    /// Number of items to return (default: 20, max: 100).
    pub limit: Option<i64>,

    pub offset: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genre_slug_list_validation() {
        assert!(validate_genre_slugs(&["drama".to_string(), "sci-fi".to_string()]).is_ok());
        assert!(validate_genre_slugs(&["not a slug".to_string()]).is_err());
    }

    #[test]
    fn row_without_category_maps_to_none() {
        let row = TitleRow {
            id: 1,
            name: "t".to_string(),
            year: 1999,
            description: String::new(),
            rating: None,
            category_id: None,
            category_name: None,
            category_slug: None,
        };
        let resp = row.into_response(Vec::new());
        assert!(resp.category.is_none());
        assert!(resp.genre.is_empty());
    }
}
