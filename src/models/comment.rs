use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'comments' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub review_id: i64,
    pub author_id: i64,
    pub text: String,
    pub pub_date: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for creating a new comment.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCommentRequest {
    #[validate(length(min = 1, message = "Comment text must not be empty"))]
    pub text: String,
}

/// DTO for updating a comment.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCommentRequest {
    #[validate(length(min = 1))]
    pub text: Option<String>,
}

/// DTO for displaying a comment with author info.
#[derive(Debug, Serialize, FromRow)]
pub struct CommentResponse {
    pub id: i64,
    pub review_id: i64,
    /// Author's username.
    pub author: String,
    pub text: String,
    pub pub_date: Option<chrono::DateTime<chrono::Utc>>,
}

/// Query parameters for listing comments.
#[derive(Debug, Deserialize)]
pub struct CommentListParams {
    /// Number of items to return (default: 20, max: 100).
    pub limit: Option<i64>,

    pub offset: Option<i64>,
}
