use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, Utc};
use rand::{RngCore, rngs::OsRng};
use serde::{Deserialize, Serialize};
use tower_cookies::cookie::SameSite;
use tower_cookies::cookie::time::Duration as CookieDuration;
use tower_cookies::{Cookie, Cookies};

use crate::crypto::codec::CodecChain;
use crate::error::{AppError, Result};
use crate::models::session::{Session, SessionOptions};
use crate::store::records::{NS_SESSIONS, RecordStore};

/// The number of random bytes in a session identifier.
const SESSION_ID_BYTES: usize = 32;

/// The on-disk shape of a session, keyed by session id in the "sessions"
/// namespace. `data` is the codec token of the values map, so the stored
/// payload is as tamper-evident as the cookie itself.
#[derive(Serialize, Deserialize)]
struct SessionRecord {
    data: String,
    expires: DateTime<Utc>,
}

/// Orchestrates the codec chain and the record store into the session
/// create/load/save/delete lifecycle with lazy expiry.
#[derive(Clone)]
pub struct SessionStore {
    records: RecordStore,
    codecs: CodecChain,
    options: SessionOptions,
    default_duration_secs: i64,
}

impl SessionStore {
    /// Creates a session store.
    ///
    /// # Arguments
    ///
    /// * `records` - The backing record store.
    /// * `codecs` - The codec chain securing cookies and stored payloads.
    /// * `options` - Cookie options copied into every session.
    /// * `default_duration_secs` - Record lifetime used when the options'
    ///   max-age is `<= 0`.
    pub fn new(
        records: RecordStore,
        codecs: CodecChain,
        options: SessionOptions,
        default_duration_secs: i64,
    ) -> Self {
        Self {
            records,
            codecs,
            options,
            default_duration_secs,
        }
    }

    /// Creates a fresh, empty, unpersisted session carrying this store's
    /// options.
    pub fn fresh(&self, name: &str) -> Session {
        Session::new(name, self.options.clone())
    }

    /// Resolves an incoming cookie value into a session.
    ///
    /// Every failure path returns a well-formed, empty, `is_new = true`
    /// session alongside the error, so callers can always proceed treating
    /// the visitor as anonymous:
    ///
    /// * no cookie - [`AppError::NoCookie`]
    /// * cookie fails verification - [`AppError::Integrity`]
    /// * id not in the store - [`AppError::SessionNotFound`]
    /// * record past its expiry - [`AppError::SessionExpired`] (the id is
    ///   never reused)
    pub async fn resolve(
        &self,
        name: &str,
        cookie_value: Option<&str>,
    ) -> (Session, Option<AppError>) {
        let mut session = self.fresh(name);

        let Some(token) = cookie_value else {
            return (session, Some(AppError::NoCookie));
        };

        let id: String = match self.codecs.decode_value(name, token) {
            Ok(id) => id,
            Err(e) => return (session, Some(e)),
        };

        let raw = match self.records.get(NS_SESSIONS, &id).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return (session, Some(AppError::SessionNotFound)),
            Err(e) => return (session, Some(e)),
        };

        let record: SessionRecord = match serde_json::from_slice(&raw) {
            Ok(record) => record,
            Err(e) => return (session, Some(e.into())),
        };

        let values = match self.codecs.decode_value(name, &record.data) {
            Ok(values) => values,
            Err(e) => return (session, Some(e)),
        };

        if record.expires < Utc::now() {
            return (session, Some(AppError::SessionExpired));
        }

        session.id = id;
        session.values = values;
        session.is_new = false;
        (session, None)
    }

    /// Resolves the session for the cookie named `name` in the request jar.
    pub async fn new_session(
        &self,
        cookies: &Cookies,
        name: &str,
    ) -> (Session, Option<AppError>) {
        let value = cookies.get(name).map(|c| c.value().to_string());
        self.resolve(name, value.as_deref()).await
    }

    /// Alias of [`new_session`](SessionStore::new_session).
    ///
    /// There is no per-request memoization: calling this twice within one
    /// request performs the full resolution twice and is therefore not
    /// idempotent with respect to intervening saves.
    pub async fn get(&self, cookies: &Cookies, name: &str) -> (Session, Option<AppError>) {
        self.new_session(cookies, name).await
    }

    /// Persists the session record and returns the encoded cookie value.
    ///
    /// Assigns a fresh random id on first save. The record write happens
    /// before the cookie value is minted, so a storage failure never leaves
    /// an orphaned cookie pointing at a missing record.
    pub async fn persist(&self, session: &mut Session) -> Result<String> {
        if session.id.is_empty() {
            session.id = generate_session_id();
        }

        let data = self.codecs.encode_value(&session.name, &session.values)?;
        let record = SessionRecord {
            data,
            expires: Utc::now() + Duration::seconds(self.effective_max_age(&session.options)),
        };
        self.records
            .put(NS_SESSIONS, &session.id, &serde_json::to_vec(&record)?)
            .await?;

        self.codecs.encode_value(&session.name, &session.id)
    }

    /// Persists the session and sets the response cookie.
    pub async fn save(&self, cookies: &Cookies, session: &mut Session) -> Result<()> {
        let encoded = self.persist(session).await?;
        let max_age = self.effective_max_age(&session.options);
        cookies.add(build_cookie(&session.name, encoded, &session.options, max_age));
        tracing::debug!(id = %session.id, "session saved");
        Ok(())
    }

    /// Removes the backing record and clears the in-memory value map.
    pub async fn destroy(&self, session: &mut Session) -> Result<()> {
        session.values.clear();
        if session.id.is_empty() {
            return Ok(());
        }
        self.records.delete(NS_SESSIONS, &session.id).await
    }

    /// Tears the session down: expires the client cookie and removes the
    /// backing record.
    ///
    /// The cookie is cleared before the store delete is attempted, so a
    /// storage failure still logs the browser out; the orphaned record is
    /// reaped by lazy expiry.
    pub async fn delete(&self, cookies: &Cookies, session: &mut Session) -> Result<()> {
        let mut cookie = Cookie::new(session.name.clone(), "");
        cookie.set_path(session.options.path.clone());
        cookie.set_max_age(CookieDuration::seconds(0));
        cookies.remove(cookie);

        let result = self.destroy(session).await;
        tracing::debug!(id = %session.id, "session deleted");
        result
    }

    fn effective_max_age(&self, options: &SessionOptions) -> i64 {
        if options.max_age_secs <= 0 {
            self.default_duration_secs
        } else {
            options.max_age_secs
        }
    }
}

/// Generates a random, URL-safe session identifier.
fn generate_session_id() -> String {
    let mut raw = [0u8; SESSION_ID_BYTES];
    OsRng.fill_bytes(&mut raw);
    URL_SAFE_NO_PAD.encode(raw)
}

/// Builds the session cookie the way every response sets it.
fn build_cookie(
    name: &str,
    value: String,
    options: &SessionOptions,
    max_age_secs: i64,
) -> Cookie<'static> {
    let mut cookie = Cookie::new(name.to_string(), value);

    let is_production =
        std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()) == "production";

    cookie.set_http_only(true);
    if is_production {
        cookie.set_secure(true);
    }
    cookie.set_same_site(SameSite::Lax);
    cookie.set_max_age(CookieDuration::seconds(max_age_secs));
    cookie.set_path(options.path.clone());

    cookie
}
