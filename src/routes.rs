// src/routes.rs

use axum::{
    Router,
    http::Method,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{auth, categories, comments, genres, reviews, titles, users},
    state::AppState,
};

/// Assembles the main application router.
///
/// * One sub-router per resource, nested under /api/v1.
/// * Authentication and role gates live in the handler extractors
///   ([`crate::utils::jwt::AuthUser`], [`crate::utils::jwt::RequireAdmin`]),
///   since most paths mix public reads with gated writes.
/// * Applies global middleware (Trace, CORS).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        "http://localhost:3000".parse().unwrap(),
        "http://127.0.0.1:3000".parse().unwrap(),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let auth_routes = Router::new()
        .route("/signup", post(auth::signup))
        .route("/token", post(auth::token));

    let user_routes = Router::new()
        .route("/", get(users::list_users).post(users::create_user))
        .route("/me", get(users::get_me).patch(users::update_me))
        .route(
            "/{username}",
            get(users::get_user)
                .patch(users::update_user)
                .delete(users::delete_user),
        );

    let category_routes = Router::new()
        .route(
            "/",
            get(categories::list_categories).post(categories::create_category),
        )
        .route("/{slug}", axum::routing::delete(categories::delete_category));

    let genre_routes = Router::new()
        .route("/", get(genres::list_genres).post(genres::create_genre))
        .route("/{slug}", axum::routing::delete(genres::delete_genre));

    let title_routes = Router::new()
        .route("/", get(titles::list_titles).post(titles::create_title))
        .route(
            "/{title_id}",
            get(titles::get_title)
                .patch(titles::update_title)
                .delete(titles::delete_title),
        )
        .route(
            "/{title_id}/reviews",
            get(reviews::list_reviews).post(reviews::create_review),
        )
        .route(
            "/{title_id}/reviews/{review_id}",
            get(reviews::get_review)
                .patch(reviews::update_review)
                .delete(reviews::delete_review),
        )
        .route(
            "/{title_id}/reviews/{review_id}/comments",
            get(comments::list_comments).post(comments::create_comment),
        )
        .route(
            "/{title_id}/reviews/{review_id}/comments/{comment_id}",
            get(comments::get_comment)
                .patch(comments::update_comment)
                .delete(comments::delete_comment),
        );

    Router::new()
        .nest("/api/v1/auth", auth_routes)
        .nest("/api/v1/users", user_routes)
        .nest("/api/v1/categories", category_routes)
        .nest("/api/v1/genres", genre_routes)
        .nest("/api/v1/titles", title_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
