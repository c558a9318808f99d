pub mod characters;
pub mod chats;
pub mod config;
pub mod credentials;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod state;
pub mod token;
pub mod users;
pub mod validation;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post, put},
};

use crate::middleware::require_auth;
use crate::state::AppState;

/// Every API route, nested under `/api/v1`, plus the unauthenticated health check.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/users/register", post(users::register))
        .route("/users/login", post(users::login));

    let protected_routes = Router::new()
        .route("/characters", get(characters::list).post(characters::create))
        .route(
            "/characters/{id}",
            get(characters::show)
                .put(characters::update)
                .delete(characters::destroy),
        )
        .route("/chats", get(chats::list).post(chats::create))
        .route("/chats/{id}", put(chats::update))
        .layer(axum_middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", public_routes.merge(protected_routes))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}
