use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordVerifier},
};
use chrono::{DateTime, Utc};
use garde::Validate;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// A registered account: credential and profile record, keyed by email.
///
/// `password` always holds an Argon2 hash, never plaintext; the plaintext is
/// consumed during registration and discarded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// The account's globally unique identifier.
    pub email: String,
    /// The user's first name.
    pub first_name: String,
    /// The user's last name.
    pub last_name: String,
    /// The Argon2 hash of the user's password.
    pub password: String,
    /// The timestamp when the account was created.
    pub created_at: DateTime<Utc>,
    /// The timestamp when the account was last updated.
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Verifies a candidate password against the stored hash.
    ///
    /// # Errors
    ///
    /// [`AppError::CredentialMismatch`] when the candidate does not match;
    /// [`AppError::Encryption`] when the stored hash is unparseable.
    pub fn match_password(&self, candidate: &str) -> Result<()> {
        let parsed_hash = PasswordHash::new(&self.password)
            .map_err(|e| AppError::Encryption(format!("Hash parse error: {}", e)))?;
        Argon2::default()
            .verify_password(candidate.as_bytes(), &parsed_hash)
            .map_err(|_| AppError::CredentialMismatch)
    }
}

/// The request payload for user registration.
#[derive(Deserialize, Validate, Debug)]
pub struct RegisterForm {
    #[garde(length(min = 1, max = 255))]
    pub first_name: String,
    #[garde(length(min = 1, max = 255))]
    pub last_name: String,
    #[garde(email)]
    pub email: String,
    #[garde(length(min = 8, max = 128))]
    pub password: String,
    #[garde(matches(password))]
    pub confirm_password: String,
}

/// The request payload for user login.
#[derive(Deserialize, Validate, Debug)]
pub struct LoginForm {
    #[garde(email)]
    pub email: String,
    #[garde(length(min = 1, max = 128))]
    pub password: String,
}
