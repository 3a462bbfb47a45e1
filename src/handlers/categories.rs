// src/handlers/categories.rs

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
    models::category::{Category, CategoryListParams, CreateCategoryRequest},
    utils::jwt::RequireAdmin,
};

/// Lists categories, optionally filtered by a name substring.
pub async fn list_categories(
    State(pool): State<SqlitePool>,
    Query(params): Query<CategoryListParams>,
) -> Result<impl IntoResponse, AppError> {
    let limit = params.limit.unwrap_or(20).min(100);
    let offset = params.offset.unwrap_or(0).max(0);

    let categories = sqlx::query_as::<_, Category>(
        r#"
        SELECT id, name, slug FROM categories
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

    Ok(Json(categories))
}

/// Creates a new category.
/// Admin only.
pub async fn create_category(
    RequireAdmin(_admin): RequireAdmin,
    State(pool): State<SqlitePool>,
    Json(payload): Json<CreateCategoryRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO categories (name, slug) VALUES (?, ?) RETURNING id",
    )
    .bind(&payload.name)
    .bind(&payload.slug)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict(format!("Category slug '{}' already exists", payload.slug))
        } else {
            tracing::error!("Failed to create category: {:?}", e);
            AppError::InternalServerError(e.to_string())
        }
    })?;

    let category = Category {
        id,
        name: payload.name,
        slug: payload.slug,
    };

    Ok((StatusCode::CREATED, Json(category)))
}

/// Deletes a category by slug. Titles in the category survive with no
/// category.
/// Admin only.
pub async fn delete_category(
    RequireAdmin(_admin): RequireAdmin,
    State(pool): State<SqlitePool>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM categories WHERE slug = ?")
        .bind(&slug)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete category: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Category not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}
