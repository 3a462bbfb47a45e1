// src/handlers/comments.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    error::AppError,
    models::comment::{
        CommentListParams, CommentResponse, CreateCommentRequest, UpdateCommentRequest,
    },
    utils::{html::clean_html, jwt::AuthUser},
};

/// Confirms the review exists under the given title. Comments are only
/// addressable through their full nesting path.
async fn ensure_review(pool: &SqlitePool, title_id: i64, review_id: i64) -> Result<(), AppError> {
    sqlx::query_scalar::<_, i64>("SELECT id FROM reviews WHERE id = ? AND title_id = ?")
        .bind(review_id)
        .bind(title_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("Review not found".to_string()))?;
    Ok(())
}

async fn fetch_comment(
    pool: &SqlitePool,
    review_id: i64,
    comment_id: i64,
) -> Result<CommentResponse, AppError> {
    sqlx::query_as::<_, CommentResponse>(
        r#"
        SELECT c.id, c.review_id, u.username AS author, c.text, c.pub_date
        FROM comments c
        JOIN users u ON u.id = c.author_id
        WHERE c.id = ? AND c.review_id = ?
        "#,
    )
    .bind(comment_id)
    .bind(review_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Comment not found".to_string()))
}

async fn fetch_comment_author(
    pool: &SqlitePool,
    review_id: i64,
    comment_id: i64,
) -> Result<i64, AppError> {
    sqlx::query_scalar::<_, i64>("SELECT author_id FROM comments WHERE id = ? AND review_id = ?")
        .bind(comment_id)
        .bind(review_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("Comment not found".to_string()))
}

/// Lists the comments under a review, oldest first.
pub async fn list_comments(
    State(pool): State<SqlitePool>,
    Path((title_id, review_id)): Path<(i64, i64)>,
    Query(params): Query<CommentListParams>,
) -> Result<impl IntoResponse, AppError> {
    ensure_review(&pool, title_id, review_id).await?;

    let limit = params.limit.unwrap_or(20).min(100);
    let offset = params.offset.unwrap_or(0).max(0);

    let comments = sqlx::query_as::<_, CommentResponse>(
        r#"
        SELECT c.id, c.review_id, u.username AS author, c.text, c.pub_date
        FROM comments c
        JOIN users u ON u.id = c.author_id
        WHERE c.review_id = ?
        ORDER BY c.pub_date, c.id
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(review_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(&pool)
    .await?;

    Ok(Json(comments))
}

/// Creates a comment under a review.
pub async fn create_comment(
    auth: AuthUser,
    State(pool): State<SqlitePool>,
    Path((title_id, review_id)): Path<(i64, i64)>,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    ensure_review(&pool, title_id, review_id).await?;

    let text = clean_html(&payload.text);

    let comment_id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO comments (review_id, author_id, text, pub_date)
        VALUES (?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(review_id)
    .bind(auth.user_id)
    .bind(&text)
    .bind(chrono::Utc::now())
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create comment: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    let comment = fetch_comment(&pool, review_id, comment_id).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

/// Gets a single comment.
pub async fn get_comment(
    State(pool): State<SqlitePool>,
    Path((title_id, review_id, comment_id)): Path<(i64, i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    ensure_review(&pool, title_id, review_id).await?;
    let comment = fetch_comment(&pool, review_id, comment_id).await?;
    Ok(Json(comment))
}

/// Partially updates a comment.
/// Requires: author, moderator or admin.
pub async fn update_comment(
    auth: AuthUser,
    State(pool): State<SqlitePool>,
    Path((title_id, review_id, comment_id)): Path<(i64, i64, i64)>,
    Json(payload): Json<UpdateCommentRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    ensure_review(&pool, title_id, review_id).await?;
    let author_id = fetch_comment_author(&pool, review_id, comment_id).await?;

    if author_id != auth.user_id && !auth.can_moderate() {
        return Err(AppError::Forbidden(
            "You are not allowed to edit this comment".to_string(),
        ));
    }

    if let Some(text) = &payload.text {
        let text = clean_html(text);
        sqlx::query("UPDATE comments SET text = ? WHERE id = ?")
            .bind(&text)
            .bind(comment_id)
            .execute(&pool)
            .await?;
    }

    let comment = fetch_comment(&pool, review_id, comment_id).await?;
    Ok(Json(comment))
}

/// Deletes a comment.
/// Requires: author, moderator or admin.
pub async fn delete_comment(
    auth: AuthUser,
    State(pool): State<SqlitePool>,
    Path((title_id, review_id, comment_id)): Path<(i64, i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    ensure_review(&pool, title_id, review_id).await?;
    let author_id = fetch_comment_author(&pool, review_id, comment_id).await?;

    if author_id != auth.user_id && !auth.can_moderate() {
        return Err(AppError::Forbidden(
            "You are not allowed to delete this comment".to_string(),
        ));
    }

    sqlx::query("DELETE FROM comments WHERE id = ?")
        .bind(comment_id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete comment: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    Ok(StatusCode::NO_CONTENT)
}
