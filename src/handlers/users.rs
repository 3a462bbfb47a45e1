// src/handlers/users.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use validator::Validate;

use crate::{
    error::{AppError, is_unique_violation},
    models::user::{
        CreateUserRequest, UpdateMeRequest, UpdateUserRequest, User, UserListParams,
    },
    utils::jwt::{AuthUser, RequireAdmin},
};

async fn fetch_user_by_id(pool: &SqlitePool, id: i64) -> Result<User, AppError> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))
}

async fn fetch_user_by_username(pool: &SqlitePool, username: &str) -> Result<User, AppError> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = ?")
        .bind(username)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))
}

/// Applies the optional profile fields shared by the admin and self-service
/// updates. Returns early when nothing was supplied.
async fn apply_user_update(
    pool: &SqlitePool,
    id: i64,
    username: Option<&str>,
    email: Option<&str>,
    first_name: Option<&str>,
    last_name: Option<&str>,
    bio: Option<&str>,
    role: Option<&str>,
) -> Result<(), AppError> {
    if username.is_none()
        && email.is_none()
        && first_name.is_none()
        && last_name.is_none()
        && bio.is_none()
        && role.is_none()
    {
        return Ok(());
    }

    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE users SET ");
    let mut separated = builder.separated(", ");

    if let Some(username) = username {
        separated.push("username = ");
        separated.push_bind_unseparated(username);
    }

    if let Some(email) = email {
        separated.push("email = ");
        separated.push_bind_unseparated(email);
    }

    if let Some(first_name) = first_name {
        separated.push("first_name = ");
        separated.push_bind_unseparated(first_name);
    }

    if let Some(last_name) = last_name {
        separated.push("last_name = ");
        separated.push_bind_unseparated(last_name);
    }

    if let Some(bio) = bio {
        separated.push("bio = ");
        separated.push_bind_unseparated(bio);
    }

    if let Some(role) = role {
        separated.push("role = ");
        separated.push_bind_unseparated(role);
    }

    builder.push(" WHERE id = ");
    builder.push_bind(id);

    builder.build().execute(pool).await.map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict("Username or email already exists".to_string())
        } else {
            tracing::error!("Failed to update user: {:?}", e);
            AppError::InternalServerError(e.to_string())
        }
    })?;

    Ok(())
}

/// Lists users, optionally filtered by a username substring.
/// Admin only.
pub async fn list_users(
    RequireAdmin(_admin): RequireAdmin,
    State(pool): State<SqlitePool>,
    Query(params): Query<UserListParams>,
) -> Result<impl IntoResponse, AppError> {
    let limit = params.limit.unwrap_or(20).min(100);
    let offset = params.offset.unwrap_or(0).max(0);

    let users = sqlx::query_as::<_, User>(
        r#"
        SELECT * FROM users
        WHERE (? IS NULL OR username LIKE '%' || ? || '%')
        ORDER BY id
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(&params.search)
    .bind(&params.search)
    .bind(limit)
    .bind(offset)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list users: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(users))
}

/// Creates a new user with a specific role.
/// Admin only.
pub async fn create_user(
    RequireAdmin(_admin): RequireAdmin,
    State(pool): State<SqlitePool>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let role = payload.role.as_deref().unwrap_or("user");

    let id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO users (username, email, first_name, last_name, bio, role, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(&payload.username)
    .bind(&payload.email)
    .bind(&payload.first_name)
    .bind(&payload.last_name)
    .bind(&payload.bio)
    .bind(role)
    .bind(chrono::Utc::now())
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict(format!("Username '{}' already exists", payload.username))
        } else {
            tracing::error!("Failed to create user: {:?}", e);
            AppError::InternalServerError(e.to_string())
        }
    })?;

    let user = fetch_user_by_id(&pool, id).await?;

    Ok((StatusCode::CREATED, Json(user)))
}

/// Retrieves a user by username.
/// Admin only.
pub async fn get_user(
    RequireAdmin(_admin): RequireAdmin,
    State(pool): State<SqlitePool>,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let user = fetch_user_by_username(&pool, &username).await?;
    Ok(Json(user))
}

/// Partially updates a user by username.
/// Admin only.
pub async fn update_user(
    RequireAdmin(_admin): RequireAdmin,
    State(pool): State<SqlitePool>,
    Path(username): Path<String>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let user = fetch_user_by_username(&pool, &username).await?;

    apply_user_update(
        &pool,
        user.id,
        payload.username.as_deref(),
        payload.email.as_deref(),
        payload.first_name.as_deref(),
        payload.last_name.as_deref(),
        payload.bio.as_deref(),
        payload.role.as_deref(),
    )
    .await?;

    let user = fetch_user_by_id(&pool, user.id).await?;
    Ok(Json(user))
}

/// Deletes a user by username. The user's reviews and comments go with it.
/// Admin only.
pub async fn delete_user(
    RequireAdmin(_admin): RequireAdmin,
    State(pool): State<SqlitePool>,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM users WHERE username = ?")
        .bind(&username)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete user: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Returns the current user's profile.
pub async fn get_me(
    auth: AuthUser,
    State(pool): State<SqlitePool>,
) -> Result<impl IntoResponse, AppError> {
    let user = fetch_user_by_id(&pool, auth.user_id).await?;
    Ok(Json(user))
}

/// Partially updates the current user's profile. The role cannot be changed
/// through this endpoint.
pub async fn update_me(
    auth: AuthUser,
    State(pool): State<SqlitePool>,
    Json(payload): Json<UpdateMeRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    apply_user_update(
        &pool,
        auth.user_id,
        payload.username.as_deref(),
        payload.email.as_deref(),
        payload.first_name.as_deref(),
        payload.last_name.as_deref(),
        payload.bio.as_deref(),
        None,
    )
    .await?;

    let user = fetch_user_by_id(&pool, auth.user_id).await?;
    Ok(Json(user))
}
