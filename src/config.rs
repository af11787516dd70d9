use anyhow::{Context, Result};
use std::env;
use zeroize::Zeroizing;

/// Fallback secret so the crate works out of the box in development.
const DEV_SECRET: &str = "warden-dev-secret-do-not-ship";

/// The application's configuration.
#[derive(Clone)]
pub struct Config {
    /// The URL of the SQLite database backing the record store.
    pub database_url: String,
    /// Codec secrets, newest first. The first entry signs new tokens; the
    /// rest only verify tokens minted before a rotation.
    pub secrets: Vec<Zeroizing<Vec<u8>>>,
    /// The session cookie max-age in seconds.
    pub session_max_age_secs: i64,
    /// The cookie path attribute.
    pub session_path: String,
    /// The session cookie name.
    pub session_cookie_name: String,
    /// Fallback record lifetime used when the session max-age is `<= 0`.
    pub store_default_duration_secs: i64,
}

impl Config {
    /// Creates a new `Config` from environment variables.
    ///
    /// Every knob has a documented default and is independently overridable:
    ///
    /// * `DATABASE_URL` - default `sqlite://warden.db?mode=rwc`
    /// * `WARDEN_SECRETS` - comma-separated secrets, newest first
    /// * `SESSION_MAX_AGE_SECS` - default 86400
    /// * `SESSION_PATH` - default `/`
    /// * `SESSION_COOKIE_NAME` - default `_warden`
    /// * `STORE_DEFAULT_DURATION_SECS` - default 3600
    pub fn from_env() -> Result<Self> {
        let secrets = match env::var("WARDEN_SECRETS") {
            Ok(raw) => {
                let list: Vec<Zeroizing<Vec<u8>>> = raw
                    .split(',')
                    .map(|s| s.trim())
                    .filter(|s| !s.is_empty())
                    .map(|s| Zeroizing::new(s.as_bytes().to_vec()))
                    .collect();
                if list.is_empty() {
                    anyhow::bail!("WARDEN_SECRETS is set but contains no secrets");
                }
                list
            }
            Err(_) => {
                tracing::warn!(
                    "WARDEN_SECRETS not set, using a built-in development secret"
                );
                vec![Zeroizing::new(DEV_SECRET.as_bytes().to_vec())]
            }
        };

        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://warden.db?mode=rwc".to_string()),
            secrets,
            session_max_age_secs: env::var("SESSION_MAX_AGE_SECS")
                .unwrap_or_else(|_| "86400".to_string())
                .parse()
                .context("Invalid SESSION_MAX_AGE_SECS")?,
            session_path: env::var("SESSION_PATH").unwrap_or_else(|_| "/".to_string()),
            session_cookie_name: env::var("SESSION_COOKIE_NAME")
                .unwrap_or_else(|_| "_warden".to_string()),
            store_default_duration_secs: env::var("STORE_DEFAULT_DURATION_SECS")
                .unwrap_or_else(|_| "3600".to_string())
                .parse()
                .context("Invalid STORE_DEFAULT_DURATION_SECS")?,
        })
    }
}
