// src/handlers/genres.rs

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
    models::genre::{CreateGenreRequest, Genre, GenreListParams},
    utils::jwt::RequireAdmin,
};

/// Lists genres, optionally filtered by a name substring.
pub async fn list_genres(
    State(pool): State<SqlitePool>,
    Query(params): Query<GenreListParams>,
) -> Result<impl IntoResponse, AppError> {
    let limit = params.limit.unwrap_or(20).min(100);
    let offset = params.offset.unwrap_or(0).max(0);

    let genres = sqlx::query_as::<_, Genre>(
        r#"
        SELECT id, name, slug FROM genres
        WHERE (? IS NULL OR name LIKE '%' || ? || '%')
        ORDER BY id
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(&params.search)
    .bind(&params.search)
    .bind(limit)
    .bind(offset)
    .fetch_all(&pool)
    .await?;

    Ok(Json(genres))
}

/// Creates a new genre.
/// Admin only.
pub async fn create_genre(
    RequireAdmin(_admin): RequireAdmin,
    State(pool): State<SqlitePool>,
    Json(payload): Json<CreateGenreRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let id =
        sqlx::query_scalar::<_, i64>("INSERT INTO genres (name, slug) VALUES (?, ?) RETURNING id")
            .bind(&payload.name)
            .bind(&payload.slug)
            .fetch_one(&pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    AppError::Conflict(format!("Genre slug '{}' already exists", payload.slug))
                } else {
                    tracing::error!("Failed to create genre: {:?}", e);
                    AppError::InternalServerError(e.to_string())
                }
            })?;

    let genre = Genre {
        id,
        name: payload.name,
        slug: payload.slug,
    };

    Ok((StatusCode::CREATED, Json(genre)))
}

/// Deletes a genre by slug.
/// Admin only.
pub async fn delete_genre(
    RequireAdmin(_admin): RequireAdmin,
    State(pool): State<SqlitePool>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM genres WHERE slug = ?")
        .bind(&slug)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete genre: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Genre not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}
