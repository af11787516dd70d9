use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// The application's error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// A record store error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// An I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// No session cookie was present on the request (anonymous visitor).
    #[error("No session cookie present")]
    NoCookie,

    /// A cookie or stored payload failed authentication against every
    /// configured secret.
    #[error("Token integrity check failed")]
    Integrity,

    /// The session id was not found in the record store.
    #[error("Session not found")]
    SessionNotFound,

    /// The session record exists but is past its expiry.
    #[error("Session expired")]
    SessionExpired,

    /// A serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The account identifier is already taken.
    #[error("Account already exists")]
    AlreadyExists,

    /// No account with the given identifier.
    #[error("Account not found")]
    UserNotFound,

    /// The candidate password does not match the stored hash.
    #[error("Credential mismatch")]
    CredentialMismatch,

    /// A validation error.
    #[error("Validation error: {0}")]
    Validation(String),

    /// An encryption error.
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// An authorization error.
    #[error("Authorization failed")]
    Unauthorized,

    /// An internal server error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

/// A `Result` type that uses `AppError` as the error type.
pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    /// Whether this error is one of the non-fatal session-resolution kinds.
    ///
    /// Resolution errors degrade to "treat as anonymous" and never abort the
    /// request; everything else is a hard failure.
    pub fn is_resolution_error(&self) -> bool {
        matches!(
            self,
            AppError::NoCookie
                | AppError::Integrity
                | AppError::SessionNotFound
                | AppError::SessionExpired
        )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Database(ref e) => {
                tracing::error!("Database error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error".to_string())
            }

            AppError::Io(ref e) => {
                tracing::error!("IO error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "File system error".to_string())
            }

            AppError::NoCookie => {
                tracing::debug!("No session cookie present");
                (StatusCode::UNAUTHORIZED, "Not authenticated".to_string())
            }

            AppError::Integrity => {
                tracing::warn!("Token integrity check failed");
                (StatusCode::UNAUTHORIZED, "Not authenticated".to_string())
            }

            AppError::SessionNotFound | AppError::SessionExpired => {
                tracing::debug!("Session absent or expired");
                (StatusCode::UNAUTHORIZED, "Session expired".to_string())
            }

            AppError::Serialization(ref e) => {
                tracing::error!("Serialization error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Serialization error".to_string())
            }

            AppError::AlreadyExists => {
                tracing::debug!("Account already exists");
                (StatusCode::CONFLICT, "Account already exists".to_string())
            }

            AppError::UserNotFound => {
                tracing::debug!("Account not found");
                (StatusCode::UNAUTHORIZED, "Wrong email or password".to_string())
            }

            AppError::CredentialMismatch => {
                tracing::debug!("Credential mismatch");
                (StatusCode::UNAUTHORIZED, "Wrong email or password".to_string())
            }

            AppError::Validation(ref msg) => {
                tracing::debug!("Validation error: {}", msg);
                (StatusCode::BAD_REQUEST, msg.clone())
            }

            AppError::Encryption(ref msg) => {
                tracing::error!("Encryption error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Encryption error".to_string())
            }

            AppError::Unauthorized => {
                tracing::warn!("Authorization failed");
                (StatusCode::FORBIDDEN, "Forbidden".to_string())
            }

            AppError::Internal(ref msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let body = serde_json::to_string(&serde_json::json!({
            "error": message
        }))
        .unwrap_or_else(|_| r#"{"error":"Internal server error"}"#.to_string());

        (status, body).into_response()
    }
}
