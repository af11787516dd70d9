//! Pluggable cookie-session authentication layer for axum.
//!
//! The core is the session subsystem: a secure token codec (AES-256-GCM with
//! secret rotation), a namespaced key-value record store over embedded
//! SQLite, a session store implementing the create/load/save/delete
//! lifecycle with lazy expiry, and a one-shot flash channel. The account
//! store and the HTTP handlers sit on top as the consuming auth flow.

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use tower_cookies::CookieManagerLayer;
use tower_http::trace::TraceLayer;

pub mod config;
pub mod db;
pub mod error;
pub mod flash;
pub mod state;

pub mod crypto {
    pub mod codec;
}

pub mod models {
    pub mod session;
    pub mod user;
}

pub mod store {
    pub mod records;
    pub mod sessions;
    pub mod users;
}

pub mod handlers {
    pub mod auth;
}

pub mod middleware_layer {
    pub mod auth;
}

pub mod validation {
    pub mod auth;
}

use state::AppState;

/// Builds the application router.
pub fn app(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/api/auth/register", post(handlers::auth::register))
        .route("/api/auth/login", post(handlers::auth::login))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/api/auth/logout", post(handlers::auth::logout))
        .route("/api/auth/me", get(handlers::auth::me))
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware_layer::auth::require_auth,
        ))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CookieManagerLayer::new())
}
