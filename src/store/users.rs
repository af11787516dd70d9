use argon2::{
    Argon2, ParamsBuilder,
    password_hash::{PasswordHasher, SaltString},
};
use chrono::Utc;
use rand::{RngCore, rngs::OsRng};
use zeroize::Zeroize;

use crate::error::{AppError, Result};
use crate::models::user::{RegisterForm, User};
use crate::store::records::{NS_ACCOUNTS, RecordStore};

/// The memory cost for Argon2 in MB.
const ARGON2_MEMORY_MB: u32 = 19;
/// The number of iterations for Argon2.
const ARGON2_ITERATIONS: u32 = 3;
/// The parallelism factor for Argon2.
const ARGON2_PARALLELISM: u32 = 6;

/// Hashes a password using Argon2id.
fn hash_password(password: &str) -> Result<String> {
    let mut password_bytes = password.as_bytes().to_vec();

    let mut salt_bytes = [0u8; 16];
    OsRng.fill_bytes(&mut salt_bytes);

    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| AppError::Encryption(format!("Salt encoding error: {}", e)))?;

    let argon2 = Argon2::new(
        argon2::Algorithm::Argon2id,
        argon2::Version::V0x13,
        ParamsBuilder::new()
            .m_cost(ARGON2_MEMORY_MB * 1024)
            .t_cost(ARGON2_ITERATIONS)
            .p_cost(ARGON2_PARALLELISM)
            .build()
            .map_err(|e| AppError::Encryption(format!("Argon2 params: {}", e)))?,
    );

    let password_hash = argon2
        .hash_password(&password_bytes, &salt)
        .map_err(|e| AppError::Encryption(format!("Argon2 hash error: {}", e)))?
        .to_string();

    password_bytes.zeroize();
    Ok(password_hash)
}

/// Account persistence over the "accounts" namespace, keyed by email.
///
/// The session core treats accounts as opaque blobs; only this store knows
/// their shape.
#[derive(Clone)]
pub struct UserStore {
    records: RecordStore,
}

impl UserStore {
    /// Creates a user store over the shared record store.
    pub fn new(records: RecordStore) -> Self {
        Self { records }
    }

    /// Creates a new account; the email is the key.
    ///
    /// The password is hashed before anything touches the store, and the
    /// write goes through the atomic conditional insert, so two racing
    /// registrations of the same email cannot both win.
    ///
    /// # Errors
    ///
    /// [`AppError::AlreadyExists`] when the email is taken.
    pub async fn create_user(&self, form: &RegisterForm) -> Result<User> {
        let now = Utc::now();
        let user = User {
            email: form.email.clone(),
            first_name: form.first_name.clone(),
            last_name: form.last_name.clone(),
            password: hash_password(&form.password)?,
            created_at: now,
            updated_at: now,
        };

        let blob = serde_json::to_vec(&user)?;
        let created = self
            .records
            .create_if_absent(NS_ACCOUNTS, &user.email, &blob)
            .await?;
        if !created {
            return Err(AppError::AlreadyExists);
        }

        tracing::info!(email = %user.email, "account created");
        Ok(user)
    }

    /// Retrieves an account by email.
    ///
    /// # Errors
    ///
    /// [`AppError::UserNotFound`] when no account exists for `email`.
    pub async fn get_user(&self, email: &str) -> Result<User> {
        let blob = self
            .records
            .get(NS_ACCOUNTS, email)
            .await?
            .ok_or(AppError::UserNotFound)?;
        Ok(serde_json::from_slice(&blob)?)
    }

    /// Overwrites an existing account, re-stamping `updated_at`.
    pub async fn update_user(&self, user: &mut User) -> Result<()> {
        user.updated_at = Utc::now();
        let blob = serde_json::to_vec(user)?;
        self.records.update(NS_ACCOUNTS, &user.email, &blob).await
    }

    /// Whether an account exists for `email`.
    pub async fn exists(&self, email: &str) -> Result<bool> {
        Ok(self.records.get(NS_ACCOUNTS, email).await?.is_some())
    }
}
