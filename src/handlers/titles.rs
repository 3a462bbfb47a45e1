// src/handlers/titles.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Datelike;
use sqlx::{QueryBuilder, Sqlite, SqlitePool, Transaction};
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        genre::Genre,
        title::{CreateTitleRequest, TitleListParams, TitleResponse, TitleRow, UpdateTitleRequest},
    },
    utils::jwt::RequireAdmin,
};

/// Base SELECT used by list and retrieve: category joined in, rating
/// aggregated from reviews.
const TITLE_SELECT: &str = r#"
    SELECT
        t.id, t.name, t.year, t.description,
        t.category_id, c.name AS category_name, c.slug AS category_slug,
        (SELECT CAST(ROUND(AVG(r.score)) AS INTEGER)
           FROM reviews r WHERE r.title_id = t.id) AS rating
    FROM titles t
    LEFT JOIN categories c ON c.id = t.category_id
"#;

fn check_year(year: i64) -> Result<(), AppError> {
    let current = chrono::Utc::now().year() as i64;
    if year > current {
        return Err(AppError::BadRequest(format!(
            "Year {} is in the future",
            year
        )));
    }
    Ok(())
}

async fn fetch_genres(pool: &SqlitePool, title_id: i64) -> Result<Vec<Genre>, AppError> {
    let genres = sqlx::query_as::<_, Genre>(
        r#"
        SELECT g.id, g.name, g.slug
        FROM title_genres tg
        JOIN genres g ON g.id = tg.genre_id
        WHERE tg.title_id = ?
        ORDER BY g.id
        "#,
    )
    .bind(title_id)
    .fetch_all(pool)
    .await?;

    Ok(genres)
}

async fn fetch_title(pool: &SqlitePool, id: i64) -> Result<TitleResponse, AppError> {
    let row = sqlx::query_as::<_, TitleRow>(&format!("{TITLE_SELECT} WHERE t.id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("Title not found".to_string()))?;

    let genres = fetch_genres(pool, id).await?;
    Ok(row.into_response(genres))
}

/// Resolves a category slug to its id inside a write transaction.
/// Unknown slugs are a client error, not a 500.
async fn resolve_category(
    tx: &mut Transaction<'_, Sqlite>,
    slug: &str,
) -> Result<i64, AppError> {
    sqlx::query_scalar::<_, i64>("SELECT id FROM categories WHERE slug = ?")
        .bind(slug)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| AppError::BadRequest(format!("Unknown category slug '{}'", slug)))
}

/// Replaces a title's genre links with the given slugs.
async fn set_genres(
    tx: &mut Transaction<'_, Sqlite>,
    title_id: i64,
    slugs: &[String],
) -> Result<(), AppError> {
    sqlx::query("DELETE FROM title_genres WHERE title_id = ?")
        .bind(title_id)
        .execute(&mut **tx)
        .await?;

    for slug in slugs {
        let genre_id = sqlx::query_scalar::<_, i64>("SELECT id FROM genres WHERE slug = ?")
            .bind(slug)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| AppError::BadRequest(format!("Unknown genre slug '{}'", slug)))?;

        sqlx::query("INSERT OR IGNORE INTO title_genres (title_id, genre_id) VALUES (?, ?)")
            .bind(title_id)
            .bind(genre_id)
            .execute(&mut **tx)
            .await?;
    }

    Ok(())
}

/// Lists titles with their rating, category and genres.
/// Filterable by category slug, genre slug, name substring and year.
pub async fn list_titles(
    State(pool): State<SqlitePool>,
    Query(params): Query<TitleListParams>,
) -> Result<impl IntoResponse, AppError> {
    let limit = params.limit.unwrap_or(20).min(100);
    let offset = params.offset.unwrap_or(0).max(0);

    let rows = sqlx::query_as::<_, TitleRow>(&format!(
        r#"
        {TITLE_SELECT}
        WHERE (? IS NULL OR c.slug = ?)
          AND (? IS NULL OR EXISTS (
                SELECT 1 FROM title_genres tg
                JOIN genres g ON g.id = tg.genre_id
                WHERE tg.title_id = t.id AND g.slug = ?))
          AND (? IS NULL OR t.name LIKE '%' || ? || '%')
          AND (? IS NULL OR t.year = ?)
        ORDER BY t.id
        LIMIT ? OFFSET ?
        "#
    ))
    .bind(&params.category)
    .bind(&params.category)
    .bind(&params.genre)
    .bind(&params.genre)
    .bind(&params.name)
    .bind(&params.name)
    .bind(params.year)
    .bind(params.year)
    .bind(limit)
    .bind(offset)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list titles: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    let mut titles = Vec::with_capacity(rows.len());
    for row in rows {
        let genres = fetch_genres(&pool, row.id).await?;
        titles.push(row.into_response(genres));
    }

    Ok(Json(titles))
}

/// Gets a single title by ID.
pub async fn get_title(
    State(pool): State<SqlitePool>,
    Path(title_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let title = fetch_title(&pool, title_id).await?;
    Ok(Json(title))
}

/// Creates a new title with its genre and category links.
/// Admin only.
pub async fn create_title(
    RequireAdmin(_admin): RequireAdmin,
    State(pool): State<SqlitePool>,
    Json(payload): Json<CreateTitleRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }
    check_year(payload.year)?;

    let mut tx = pool.begin().await?;

    let category_id = match &payload.category {
        Some(slug) => Some(resolve_category(&mut tx, slug).await?),
        None => None,
    };

    let title_id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO titles (name, year, description, category_id)
        VALUES (?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(&payload.name)
    .bind(payload.year)
    .bind(&payload.description)
    .bind(category_id)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create title: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    set_genres(&mut tx, title_id, &payload.genre).await?;

    tx.commit().await?;

    let title = fetch_title(&pool, title_id).await?;
    Ok((StatusCode::CREATED, Json(title)))
}

/// Partially updates a title. A present genre list replaces the links
/// wholesale.
/// Admin only.
pub async fn update_title(
    RequireAdmin(_admin): RequireAdmin,
    State(pool): State<SqlitePool>,
    Path(title_id): Path<i64>,
    Json(payload): Json<UpdateTitleRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }
    if let Some(year) = payload.year {
        check_year(year)?;
    }

    // Check existence
    sqlx::query_scalar::<_, i64>("SELECT id FROM titles WHERE id = ?")
        .bind(title_id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("Title not found".to_string()))?;

    let mut tx = pool.begin().await?;

    let category_id = match &payload.category {
        Some(slug) => Some(resolve_category(&mut tx, slug).await?),
        None => None,
    };

    if payload.name.is_some()
        || payload.year.is_some()
        || payload.description.is_some()
        || category_id.is_some()
    {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE titles SET ");
        let mut separated = builder.separated(", ");

        if let Some(name) = &payload.name {
            separated.push("name = ");
            separated.push_bind_unseparated(name);
        }

        if let Some(year) = payload.year {
            separated.push("year = ");
            separated.push_bind_unseparated(year);
        }

        if let Some(description) = &payload.description {
            separated.push("description = ");
            separated.push_bind_unseparated(description);
        }

        if let Some(category_id) = category_id {
            separated.push("category_id = ");
            separated.push_bind_unseparated(category_id);
        }

        builder.push(" WHERE id = ");
        builder.push_bind(title_id);

        builder.build().execute(&mut *tx).await.map_err(|e| {
            tracing::error!("Failed to update title: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;
    }

    if let Some(slugs) = &payload.genre {
        set_genres(&mut tx, title_id, slugs).await?;
    }

    tx.commit().await?;

    let title = fetch_title(&pool, title_id).await?;
    Ok(Json(title))
}

/// Deletes a title. Its reviews and their comments cascade away.
/// Admin only.
pub async fn delete_title(
    RequireAdmin(_admin): RequireAdmin,
    State(pool): State<SqlitePool>,
    Path(title_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM titles WHERE id = ?")
        .bind(title_id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete title: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Title not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}
