// src/handlers/auth.rs

use axum::{Json, extract::State, response::IntoResponse};
use serde_json::json;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    config::Config,
    error::{AppError, is_unique_violation},
    models::user::{SignUpRequest, TokenRequest, User},
    utils::{
        code::generate_code,
        hash::{hash_code, verify_code},
        jwt::sign_jwt,
        mail::send_confirmation_code,
    },
};

/// Registers a new user, or re-issues a confirmation code for an existing
/// (username, email) pair.
///
/// The code is stored hashed and delivered by email; with SMTP unconfigured
/// it goes to the log. Returns 200 and the identity pair.
pub async fn signup(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    Json(payload): Json<SignUpRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let existing = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = ? OR email = ?")
        .bind(&payload.username)
        .bind(&payload.email)
        .fetch_all(&pool)
        .await?;

    let user_id = match existing
        .iter()
        .find(|u| u.username == payload.username && u.email == payload.email)
    {
        // Same identity pair: re-request of a confirmation code.
        Some(user) => user.id,
        None if !existing.is_empty() => {
            return Err(AppError::BadRequest(
                "username or email is already taken".to_string(),
            ));
        }
        None => sqlx::query_scalar::<_, i64>(
            "INSERT INTO users (username, email, created_at) VALUES (?, ?, ?) RETURNING id",
        )
        .bind(&payload.username)
        .bind(&payload.email)
        .bind(chrono::Utc::now())
        .fetch_one(&pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict(format!("Username '{}' already exists", payload.username))
            } else {
                tracing::error!("Failed to register user: {:?}", e);
                AppError::from(e)
            }
        })?,
    };

    let code = generate_code();
    let code_hash = hash_code(&code)?;

    sqlx::query("UPDATE users SET confirmation_code = ? WHERE id = ?")
        .bind(&code_hash)
        .bind(user_id)
        .execute(&pool)
        .await?;

    send_confirmation_code(config.smtp.as_ref(), &payload.email, &payload.username, &code).await?;

    Ok(Json(json!({
        "email": payload.email,
        "username": payload.username,
    })))
}

/// Exchanges a username and confirmation code for a JWT access token.
///
/// 404 for an unknown username, 400 for a wrong or never-issued code.
pub async fn token(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    Json(payload): Json<TokenRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = ?")
        .bind(&payload.username)
        .fetch_optional(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Token DB error: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    let stored = user.confirmation_code.as_deref().ok_or(AppError::BadRequest(
        "No confirmation code has been issued for this user".to_string(),
    ))?;

    if !verify_code(&payload.confirmation_code, stored)? {
        return Err(AppError::BadRequest(
            "Invalid confirmation code".to_string(),
        ));
    }

    let token = sign_jwt(
        user.id,
        &user.role,
        &config.jwt_secret,
        config.jwt_expiration,
    )?;

    Ok(Json(json!({ "token": token })))
}
