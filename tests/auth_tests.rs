// tests/auth_tests.rs

use reviewhub::{config::Config, routes, state::AppState, utils::hash::hash_code, utils::jwt::sign_jwt};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;

const JWT_SECRET: &str = "test_secret_for_integration_tests";

/// Spawns the app on a random port against a fresh in-memory database.
/// Returns the base URL and the pool, which is shared with the server so
/// tests can seed and inspect rows directly.
async fn spawn_app() -> (String, SqlitePool) {
    let connect_options = SqliteConnectOptions::from_str("sqlite::memory:")
        .expect("invalid sqlite URL")
        .foreign_keys(true);

    // A single connection keeps every query on the same in-memory database.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .connect_with(connect_options)
        .await
        .expect("Failed to open in-memory SQLite");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    let config = Config {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: JWT_SECRET.to_string(),
        jwt_expiration: 600, // 10 minutes for tests
        rust_log: "error".to_string(),
        admin_username: None,
        admin_email: None,
        smtp: None,
    };

    let state = AppState {
        pool: pool.clone(),
        config,
    };

    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");

    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (address, pool)
}

/// Inserts a user directly and mints a token for it.
async fn seed_user(pool: &SqlitePool, username: &str, role: &str) -> (i64, String) {
    let email = format!("{}@example.com", username);
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO users (username, email, role, created_at) VALUES (?, ?, ?, ?) RETURNING id",
    )
    .bind(username)
    .bind(&email)
    .bind(role)
    .bind(chrono::Utc::now())
    .fetch_one(pool)
    .await
    .unwrap();

    let token = sign_jwt(id, role, JWT_SECRET, 600).unwrap();
    (id, token)
}

fn unique_name(prefix: &str) -> String {
    format!("{}_{}", prefix, &uuid::Uuid::new_v4().to_string()[..8])
}

#[tokio::test]
async fn health_check_404() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/random_path_that_does_not_exist", address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn signup_works_and_stores_hashed_code() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let username = unique_name("reader");

    let response = client
        .post(format!("{}/api/v1/auth/signup", address))
        .json(&serde_json::json!({
            "username": username,
            "email": format!("{}@example.com", username),
        }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["username"], username.as_str());

    let code: Option<String> =
        sqlx::query_scalar("SELECT confirmation_code FROM users WHERE username = ?")
            .bind(&username)
            .fetch_one(&pool)
            .await
            .unwrap();
    let code = code.expect("confirmation code should be stored");
    // Stored hashed, never in the clear.
    assert!(code.starts_with("$argon2"));
}

#[tokio::test]
async fn signup_rejects_reserved_username() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/v1/auth/signup", address))
        .json(&serde_json::json!({
            "username": "me",
            "email": "me@example.com",
        }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn signup_rejects_invalid_username() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/v1/auth/signup", address))
        .json(&serde_json::json!({
            "username": "no spaces allowed",
            "email": "spaces@example.com",
        }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn signup_reissues_code_for_same_pair() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let username = unique_name("again");
    let payload = serde_json::json!({
        "username": username,
        "email": format!("{}@example.com", username),
    });

    let first = client
        .post(format!("{}/api/v1/auth/signup", address))
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(first.status().as_u16(), 200);

    let code_before: Option<String> =
        sqlx::query_scalar("SELECT confirmation_code FROM users WHERE username = ?")
            .bind(&username)
            .fetch_one(&pool)
            .await
            .unwrap();

    let second = client
        .post(format!("{}/api/v1/auth/signup", address))
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(second.status().as_u16(), 200);

    let code_after: Option<String> =
        sqlx::query_scalar("SELECT confirmation_code FROM users WHERE username = ?")
            .bind(&username)
            .fetch_one(&pool)
            .await
            .unwrap();

    assert_ne!(code_before, code_after, "code should rotate on re-signup");

    // Still only one account for the pair.
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE username = ?")
        .bind(&username)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn signup_rejects_taken_email_with_other_username() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let username = unique_name("owner");
    let email = format!("{}@example.com", username);

    let first = client
        .post(format!("{}/api/v1/auth/signup", address))
        .json(&serde_json::json!({ "username": username, "email": email }))
        .send()
        .await
        .unwrap();
    assert_eq!(first.status().as_u16(), 200);

    let second = client
        .post(format!("{}/api/v1/auth/signup", address))
        .json(&serde_json::json!({ "username": unique_name("intruder"), "email": email }))
        .send()
        .await
        .unwrap();
    assert_eq!(second.status().as_u16(), 400);
}

#[tokio::test]
async fn token_exchange_and_me_round_trip() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let username = unique_name("login");

    client
        .post(format!("{}/api/v1/auth/signup", address))
        .json(&serde_json::json!({
            "username": username,
            "email": format!("{}@example.com", username),
        }))
        .send()
        .await
        .expect("Signup failed");

    // Replace the stored hash with one for a code the test knows.
    let known_hash = hash_code("KNOWN_CODE_123").unwrap();
    sqlx::query("UPDATE users SET confirmation_code = ? WHERE username = ?")
        .bind(&known_hash)
        .bind(&username)
        .execute(&pool)
        .await
        .unwrap();

    let token_resp = client
        .post(format!("{}/api/v1/auth/token", address))
        .json(&serde_json::json!({
            "username": username,
            "confirmation_code": "KNOWN_CODE_123",
        }))
        .send()
        .await
        .expect("Token request failed");
    assert_eq!(token_resp.status().as_u16(), 200);

    let body: serde_json::Value = token_resp.json().await.unwrap();
    let token = body["token"].as_str().expect("Token not found");

    let me_resp = client
        .get(format!("{}/api/v1/users/me", address))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Me request failed");
    assert_eq!(me_resp.status().as_u16(), 200);

    let me: serde_json::Value = me_resp.json().await.unwrap();
    assert_eq!(me["username"], username.as_str());
    assert_eq!(me["role"], "user");
}

#[tokio::test]
async fn token_rejects_wrong_code() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let username = unique_name("wrongcode");

    client
        .post(format!("{}/api/v1/auth/signup", address))
        .json(&serde_json::json!({
            "username": username,
            "email": format!("{}@example.com", username),
        }))
        .send()
        .await
        .unwrap();

    let known_hash = hash_code("RIGHT").unwrap();
    sqlx::query("UPDATE users SET confirmation_code = ? WHERE username = ?")
        .bind(&known_hash)
        .bind(&username)
        .execute(&pool)
        .await
        .unwrap();

    let response = client
        .post(format!("{}/api/v1/auth/token", address))
        .json(&serde_json::json!({
            "username": username,
            "confirmation_code": "WRONG",
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn token_unknown_user_is_404() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/v1/auth/token", address))
        .json(&serde_json::json!({
            "username": "ghost",
            "confirmation_code": "whatever",
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn me_patch_cannot_change_role() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let username = unique_name("plain");
    let (_id, token) = seed_user(&pool, &username, "user").await;

    let response = client
        .patch(format!("{}/api/v1/users/me", address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({
            "bio": "writes about films",
            "role": "admin",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let me: serde_json::Value = response.json().await.unwrap();
    assert_eq!(me["bio"], "writes about films");
    assert_eq!(me["role"], "user", "self-service role change must be ignored");
}

#[tokio::test]
async fn user_admin_endpoints_are_gated() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let (_id, user_token) = seed_user(&pool, &unique_name("mortal"), "user").await;

    // Anonymous
    let anon = client
        .get(format!("{}/api/v1/users", address))
        .send()
        .await
        .unwrap();
    assert_eq!(anon.status().as_u16(), 401);

    // Plain user
    let forbidden = client
        .get(format!("{}/api/v1/users", address))
        .header("Authorization", format!("Bearer {}", user_token))
        .send()
        .await
        .unwrap();
    assert_eq!(forbidden.status().as_u16(), 403);

    // Admin
    let (_aid, admin_token) = seed_user(&pool, &unique_name("root"), "admin").await;
    let allowed = client
        .get(format!("{}/api/v1/users", address))
        .header("Authorization", format!("Bearer {}", admin_token))
        .send()
        .await
        .unwrap();
    assert_eq!(allowed.status().as_u16(), 200);
}

#[tokio::test]
async fn admin_user_crud_flow() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let (_aid, admin_token) = seed_user(&pool, &unique_name("root"), "admin").await;
    let username = unique_name("managed");

    // Create with an explicit role
    let created = client
        .post(format!("{}/api/v1/users", address))
        .header("Authorization", format!("Bearer {}", admin_token))
        .json(&serde_json::json!({
            "username": username,
            "email": format!("{}@example.com", username),
            "role": "moderator",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(created.status().as_u16(), 201);
    let body: serde_json::Value = created.json().await.unwrap();
    assert_eq!(body["role"], "moderator");

    // Retrieve by username
    let fetched = client
        .get(format!("{}/api/v1/users/{}", address, username))
        .header("Authorization", format!("Bearer {}", admin_token))
        .send()
        .await
        .unwrap();
    assert_eq!(fetched.status().as_u16(), 200);

    // Demote
    let patched = client
        .patch(format!("{}/api/v1/users/{}", address, username))
        .header("Authorization", format!("Bearer {}", admin_token))
        .json(&serde_json::json!({ "role": "user" }))
        .send()
        .await
        .unwrap();
    assert_eq!(patched.status().as_u16(), 200);
    let body: serde_json::Value = patched.json().await.unwrap();
    assert_eq!(body["role"], "user");

    // Delete
    let deleted = client
        .delete(format!("{}/api/v1/users/{}", address, username))
        .header("Authorization", format!("Bearer {}", admin_token))
        .send()
        .await
        .unwrap();
    assert_eq!(deleted.status().as_u16(), 204);

    let gone = client
        .get(format!("{}/api/v1/users/{}", address, username))
        .header("Authorization", format!("Bearer {}", admin_token))
        .send()
        .await
        .unwrap();
    assert_eq!(gone.status().as_u16(), 404);
}

#[tokio::test]
async fn admin_create_rejects_reserved_username_and_unknown_role() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let (_aid, admin_token) = seed_user(&pool, &unique_name("root"), "admin").await;

    let reserved = client
        .post(format!("{}/api/v1/users", address))
        .header("Authorization", format!("Bearer {}", admin_token))
        .json(&serde_json::json!({
            "username": "me",
            "email": "me2@example.com",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(reserved.status().as_u16(), 400);

    let bad_role = client
        .post(format!("{}/api/v1/users", address))
        .header("Authorization", format!("Bearer {}", admin_token))
        .json(&serde_json::json!({
            "username": unique_name("owner"),
            "email": "owner@example.com",
            "role": "owner",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(bad_role.status().as_u16(), 400);
}

#[tokio::test]
async fn duplicate_username_is_conflict() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let (_aid, admin_token) = seed_user(&pool, &unique_name("root"), "admin").await;
    let username = unique_name("taken");
    seed_user(&pool, &username, "user").await;

    let response = client
        .post(format!("{}/api/v1/users", address))
        .header("Authorization", format!("Bearer {}", admin_token))
        .json(&serde_json::json!({
            "username": username,
            "email": "fresh@example.com",
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 409);
}
