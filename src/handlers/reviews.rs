// src/handlers/reviews.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    error::{AppError, is_unique_violation},
    models::review::{CreateReviewRequest, ReviewListParams, ReviewResponse, UpdateReviewRequest},
    utils::{html::clean_html, jwt::AuthUser},
};

async fn ensure_title(pool: &SqlitePool, title_id: i64) -> Result<(), AppError> {
    sqlx::query_scalar::<_, i64>("SELECT id FROM titles WHERE id = ?")
        .bind(title_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("Title not found".to_string()))?;
    Ok(())
}

async fn fetch_review(
    pool: &SqlitePool,
    title_id: i64,
    review_id: i64,
) -> Result<ReviewResponse, AppError> {
    sqlx::query_as::<_, ReviewResponse>(
        r#"
        SELECT r.id, r.title_id, u.username AS author, r.text, r.score, r.pub_date
        FROM reviews r
        JOIN users u ON u.id = r.author_id
        WHERE r.id = ? AND r.title_id = ?
        "#,
    )
    .bind(review_id)
    .bind(title_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Review not found".to_string()))
}

/// Loads the author of a review for the ownership check.
async fn fetch_review_author(
    pool: &SqlitePool,
    title_id: i64,
    review_id: i64,
) -> Result<i64, AppError> {
    sqlx::query_scalar::<_, i64>("SELECT author_id FROM reviews WHERE id = ? AND title_id = ?")
        .bind(review_id)
        .bind(title_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("Review not found".to_string()))
}

/// Lists the reviews of a title, oldest first.
pub async fn list_reviews(
    State(pool): State<SqlitePool>,
    Path(title_id): Path<i64>,
    Query(params): Query<ReviewListParams>,
) -> Result<impl IntoResponse, AppError> {
    ensure_title(&pool, title_id).await?;

    let limit = params.limit.unwrap_or(20).min(100);
    let offset = params.offset.unwrap_or(0).max(0);

    let reviews = sqlx::query_as::<_, ReviewResponse>(
        r#"
        SELECT r.id, r.title_id, u.username AS author, r.text, r.score, r.pub_date
        FROM reviews r
        JOIN users u ON u.id = r.author_id
        WHERE r.title_id = ?
        ORDER BY r.pub_date, r.id
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(title_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(&pool)
    .await?;

    Ok(Json(reviews))
}

/// Creates a review for a title. One review per author per title.
pub async fn create_review(
    auth: AuthUser,
    State(pool): State<SqlitePool>,
    Path(title_id): Path<i64>,
    Json(payload): Json<CreateReviewRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    ensure_title(&pool, title_id).await?;

    let existing =
        sqlx::query_scalar::<_, i64>("SELECT id FROM reviews WHERE title_id = ? AND author_id = ?")
            .bind(title_id)
            .bind(auth.user_id)
            .fetch_optional(&pool)
            .await?;

    if existing.is_some() {
        return Err(AppError::BadRequest(
            "Only one review per title is allowed".to_string(),
        ));
    }

    let text = clean_html(&payload.text);

    let review_id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO reviews (title_id, author_id, text, score, pub_date)
        VALUES (?, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(title_id)
    .bind(auth.user_id)
    .bind(&text)
    .bind(payload.score)
    .bind(chrono::Utc::now())
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        // Concurrent double-post lands on the UNIQUE constraint.
        if is_unique_violation(&e) {
            AppError::BadRequest("Only one review per title is allowed".to_string())
        } else {
            tracing::error!("Failed to create review: {:?}", e);
            AppError::InternalServerError(e.to_string())
        }
    })?;

    let review = fetch_review(&pool, title_id, review_id).await?;
    Ok((StatusCode::CREATED, Json(review)))
}

/// Gets a single review of a title.
pub async fn get_review(
    State(pool): State<SqlitePool>,
    Path((title_id, review_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    let review = fetch_review(&pool, title_id, review_id).await?;
    Ok(Json(review))
}

/// Partially updates a review.
/// Requires: author, moderator or admin.
pub async fn update_review(
    auth: AuthUser,
    State(pool): State<SqlitePool>,
    Path((title_id, review_id)): Path<(i64, i64)>,
    Json(payload): Json<UpdateReviewRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let author_id = fetch_review_author(&pool, title_id, review_id).await?;

    if author_id != auth.user_id && !auth.can_moderate() {
        return Err(AppError::Forbidden(
            "You are not allowed to edit this review".to_string(),
        ));
    }

    if let Some(text) = &payload.text {
        let text = clean_html(text);
        sqlx::query("UPDATE reviews SET text = ? WHERE id = ?")
            .bind(&text)
            .bind(review_id)
            .execute(&pool)
            .await?;
    }

    if let Some(score) = payload.score {
        sqlx::query("UPDATE reviews SET score = ? WHERE id = ?")
            .bind(score)
            .bind(review_id)
            .execute(&pool)
            .await?;
    }

    let review = fetch_review(&pool, title_id, review_id).await?;
    Ok(Json(review))
}

/// Deletes a review and its comments.
/// Requires: author, moderator or admin.
pub async fn delete_review(
    auth: AuthUser,
    State(pool): State<SqlitePool>,
    Path((title_id, review_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    let author_id = fetch_review_author(&pool, title_id, review_id).await?;

    if author_id != auth.user_id && !auth.can_moderate() {
        return Err(AppError::Forbidden(
            "You are not allowed to delete this review".to_string(),
        ));
    }

    sqlx::query("DELETE FROM reviews WHERE id = ?")
        .bind(review_id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete review: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    Ok(StatusCode::NO_CONTENT)
}
