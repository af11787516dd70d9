use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};
use tower_cookies::Cookies;

use crate::state::AppState;

/// A middleware that requires an authenticated session.
///
/// Resolves the session cookie, rejects anonymous or unauthenticated
/// visitors, loads the account and makes both the session and the account
/// available to handlers as request extensions.
pub async fn require_auth(
    State(state): State<AppState>,
    cookies: Cookies,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let name = state.config.session_cookie_name.clone();
    let (session, err) = state.sessions.new_session(&cookies, &name).await;

    if let Some(e) = err {
        tracing::debug!("session resolution failed: {}", e);
        return Err(StatusCode::UNAUTHORIZED);
    }
    if session.is_new {
        return Err(StatusCode::UNAUTHORIZED);
    }

    let email = session
        .get_str("user")
        .map(str::to_string)
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let user = state.users.get_user(&email).await.map_err(|e| {
        tracing::warn!(email = %email, "session names an unknown account: {}", e);
        StatusCode::UNAUTHORIZED
    })?;

    tracing::debug!(email = %email, "user authenticated");

    request.extensions_mut().insert(session);
    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}
