use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tower_cookies::Cookies;

use crate::{
    error::Result,
    flash::Flash,
    models::session::Session,
    models::user::{LoginForm, RegisterForm, User},
    state::AppState,
    validation::auth::validate_form,
};

/// The response payload for authentication-related requests.
#[derive(Serialize)]
pub struct AuthResponse {
    pub success: bool,
    pub message: String,
}

/// The response payload for the current-user endpoint.
#[derive(Serialize)]
pub struct ProfileResponse {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flash: Option<Flash>,
}

/// Handles user registration.
///
/// On success the new account is logged in immediately: the session gets the
/// account email and a success flash, then is saved before the response.
#[axum::debug_handler]
pub async fn register(
    State(state): State<AppState>,
    cookies: Cookies,
    Json(payload): Json<RegisterForm>,
) -> Result<impl IntoResponse> {
    tracing::info!(email = %payload.email, "register attempt");
    validate_form(&payload)?;

    let user = state.users.create_user(&payload).await?;

    let name = state.config.session_cookie_name.clone();
    let (mut session, err) = state.sessions.new_session(&cookies, &name).await;
    if let Some(e) = err {
        // Resolution errors just mean "anonymous visitor"; anything else is
        // a real storage problem and aborts.
        if !e.is_resolution_error() {
            return Err(e);
        }
        tracing::debug!("registering anonymous visitor: {}", e);
    }

    session.insert("user", serde_json::json!(user.email));
    let mut flash = Flash::new();
    flash.success("Successfully created your account");
    flash.add(&mut session);
    state.sessions.save(&cookies, &mut session).await?;

    tracing::info!(email = %user.email, "user registered");

    let response = AuthResponse {
        success: true,
        message: "Registration successful. Welcome!".to_string(),
    };
    Ok((StatusCode::CREATED, Json(response)).into_response())
}

/// Handles user login.
#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    cookies: Cookies,
    Json(payload): Json<LoginForm>,
) -> Result<Response> {
    tracing::info!(email = %payload.email, "login attempt");

    let name = state.config.session_cookie_name.clone();
    let (mut session, _) = state.sessions.new_session(&cookies, &name).await;
    if !session.is_new {
        tracing::debug!("already authenticated, skipping credential check");
        let response = AuthResponse {
            success: true,
            message: "Already logged in".to_string(),
        };
        return Ok((StatusCode::OK, Json(response)).into_response());
    }

    validate_form(&payload)?;

    // UserNotFound and CredentialMismatch both map to the same user-facing
    // 401 so login cannot be used to probe which emails are registered.
    let user = state.users.get_user(&payload.email).await?;
    user.match_password(&payload.password)?;

    session.insert("user", serde_json::json!(user.email));
    state.sessions.save(&cookies, &mut session).await?;

    tracing::info!(email = %user.email, "user logged in");

    let response = AuthResponse {
        success: true,
        message: "Login successful".to_string(),
    };
    Ok((StatusCode::OK, Json(response)).into_response())
}

/// Handles user logout: tears down the session resolved by the auth
/// middleware.
#[axum::debug_handler]
pub async fn logout(
    State(state): State<AppState>,
    Extension(mut session): Extension<Session>,
    cookies: Cookies,
) -> Result<Response> {
    state.sessions.delete(&cookies, &mut session).await?;

    tracing::info!("user logged out");

    let response = AuthResponse {
        success: true,
        message: "Logout successful".to_string(),
    };
    Ok((StatusCode::OK, Json(response)).into_response())
}

/// Returns the current account's profile, consuming at most one queued
/// flash message.
#[axum::debug_handler]
pub async fn me(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Extension(mut session): Extension<Session>,
    cookies: Cookies,
) -> Result<Response> {
    let flash = Flash::get(&mut session);
    if flash.is_some() {
        // Persist the consumption so the flash really is one-shot.
        state.sessions.save(&cookies, &mut session).await?;
    }

    let response = ProfileResponse {
        email: user.email,
        first_name: user.first_name,
        last_name: user.last_name,
        created_at: user.created_at,
        flash,
    };
    Ok((StatusCode::OK, Json(response)).into_response())
}
