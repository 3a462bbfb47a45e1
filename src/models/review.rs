use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'reviews' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Review {
    pub id: i64,
    pub title_id: i64,
    pub author_id: i64,
    pub text: String,
    pub score: i64,
    pub pub_date: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for creating a new review.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateReviewRequest {
    #[validate(length(min = 1, message = "Review text must not be empty"))]
    pub text: String,

    #[validate(range(min = 1, max = 10, message = "Score must be between 1 and 10"))]
    pub score: i64,
}

/// DTO for updating a review. Fields are optional.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateReviewRequest {
    #[validate(length(min = 1))]
    pub text: Option<String>,

    #[validate(range(min = 1, max = 10, message = "Score must be between 1 and 10"))]
    pub score: Option<i64>,
}

/// DTO for displaying a review with author info.
#[derive(Debug, Serialize, FromRow)]
pub struct ReviewResponse {
    pub id: i64,
    pub title_id: i64,
    /// Author's username.
    pub author: String,
    pub text: String,
    pub score: i64,
    pub pub_date: Option<chrono::DateTime<chrono::Utc>>,
}

/// Query parameters for listing reviews.
#[derive(Debug, Deserialize)]
pub struct ReviewListParams {
    /// Number of items to return (default: 20, max: 100).
    pub limit: Option<i64>,

    pub offset: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_bounds() {
        let low = CreateReviewRequest {
            text: "x".to_string(),
            score: 0,
        };
        let high = CreateReviewRequest {
            text: "x".to_string(),
            score: 11,
        };
        let ok = CreateReviewRequest {
            text: "x".to_string(),
            score: 10,
        };
        assert!(low.validate().is_err());
        assert!(high.validate().is_err());
        assert!(ok.validate().is_ok());
    }
}
