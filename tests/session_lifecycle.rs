use chrono::{Duration, Utc};
use serde_json::json;
use sqlx::sqlite::SqlitePoolOptions;

use warden::crypto::codec::CodecChain;
use warden::db;
use warden::error::AppError;
use warden::flash::Flash;
use warden::models::session::SessionOptions;
use warden::models::user::RegisterForm;
use warden::store::records::{NS_SESSIONS, RecordStore};
use warden::store::sessions::SessionStore;
use warden::store::users::UserStore;

const COOKIE: &str = "_warden";

async fn record_store() -> RecordStore {
    // A single connection keeps one shared in-memory database.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    db::init_schema(&pool).await.unwrap();
    RecordStore::new(pool)
}

fn session_store(records: RecordStore, max_age_secs: i64) -> SessionStore {
    SessionStore::new(
        records,
        CodecChain::from_secrets(&["test-secret"]),
        SessionOptions {
            max_age_secs,
            path: "/".to_string(),
        },
        100,
    )
}

#[tokio::test]
async fn no_cookie_resolves_to_anonymous() {
    let store = session_store(record_store().await, 60);
    let (session, err) = store.resolve(COOKIE, None).await;
    assert!(session.is_new);
    assert!(session.values.is_empty());
    assert!(matches!(err, Some(AppError::NoCookie)));
}

#[tokio::test]
async fn save_then_replay_cookie_restores_values() {
    let store = session_store(record_store().await, 60);

    let mut session = store.fresh(COOKIE);
    session.insert("user", json!("me@me.com"));
    session.insert("theme", json!("dark"));
    let cookie_value = store.persist(&mut session).await.unwrap();
    assert!(!session.id.is_empty());

    let (restored, err) = store.resolve(COOKIE, Some(&cookie_value)).await;
    assert!(err.is_none());
    assert!(!restored.is_new);
    assert_eq!(restored.id, session.id);
    assert_eq!(restored.get_str("user"), Some("me@me.com"));
    assert_eq!(restored.get_str("theme"), Some("dark"));
}

#[tokio::test]
async fn tampered_cookie_fails_integrity() {
    let store = session_store(record_store().await, 60);
    let (session, err) = store.resolve(COOKIE, Some("bogus-cookie-value")).await;
    assert!(session.is_new);
    assert!(matches!(err, Some(AppError::Integrity)));
}

#[tokio::test]
async fn forged_id_is_not_found() {
    let store = session_store(record_store().await, 60);

    // A validly encoded id that was never persisted.
    let codecs = CodecChain::from_secrets(&["test-secret"]);
    let forged = codecs.encode_value(COOKIE, &"never-saved-id").unwrap();

    let (session, err) = store.resolve(COOKIE, Some(&forged)).await;
    assert!(session.is_new);
    assert!(matches!(err, Some(AppError::SessionNotFound)));
}

#[tokio::test]
async fn expired_record_is_treated_as_absent() {
    let records = record_store().await;
    let store = session_store(records.clone(), 60);

    let mut session = store.fresh(COOKIE);
    session.insert("user", json!("me@me.com"));
    let cookie_value = store.persist(&mut session).await.unwrap();

    // Loadable while the record is within its max-age.
    let (live, err) = store.resolve(COOKIE, Some(&cookie_value)).await;
    assert!(err.is_none());
    assert!(!live.is_new);

    // Rewind the record's expiry into the past; the session must now fail
    // without reusing the id.
    let codecs = CodecChain::from_secrets(&["test-secret"]);
    let data = codecs.encode_value(COOKIE, &session.values).unwrap();
    let stale = json!({
        "data": data,
        "expires": Utc::now() - Duration::seconds(1),
    });
    records
        .put(NS_SESSIONS, &session.id, &serde_json::to_vec(&stale).unwrap())
        .await
        .unwrap();

    let (expired, err) = store.resolve(COOKIE, Some(&cookie_value)).await;
    assert!(expired.is_new);
    assert!(expired.id.is_empty());
    assert!(matches!(err, Some(AppError::SessionExpired)));
}

#[tokio::test]
async fn nonpositive_max_age_falls_back_to_store_default() {
    let records = record_store().await;
    let store = session_store(records.clone(), 0);

    let mut session = store.fresh(COOKIE);
    let cookie_value = store.persist(&mut session).await.unwrap();

    // The record's expiry must come from the store default (100s here),
    // not from the zero max-age.
    let raw = records.get(NS_SESSIONS, &session.id).await.unwrap().unwrap();
    let record: serde_json::Value = serde_json::from_slice(&raw).unwrap();
    let expires: chrono::DateTime<Utc> =
        serde_json::from_value(record["expires"].clone()).unwrap();
    let remaining = (expires - Utc::now()).num_seconds();
    assert!((50..=100).contains(&remaining), "remaining = {}", remaining);

    let (restored, err) = store.resolve(COOKIE, Some(&cookie_value)).await;
    assert!(err.is_none());
    assert!(!restored.is_new);
}

#[tokio::test]
async fn delete_invalidates_the_old_cookie() {
    let store = session_store(record_store().await, 60);

    let mut session = store.fresh(COOKIE);
    session.insert("user", json!("me@me.com"));
    let cookie_value = store.persist(&mut session).await.unwrap();

    store.destroy(&mut session).await.unwrap();
    assert!(session.values.is_empty());

    let (after, err) = store.resolve(COOKIE, Some(&cookie_value)).await;
    assert!(after.is_new);
    assert!(matches!(err, Some(AppError::SessionNotFound)));
}

#[tokio::test]
async fn session_ids_are_never_reused() {
    let store = session_store(record_store().await, 60);

    let mut first = store.fresh(COOKIE);
    store.persist(&mut first).await.unwrap();
    let mut second = store.fresh(COOKIE);
    store.persist(&mut second).await.unwrap();

    assert_ne!(first.id, second.id);

    // Re-saving an existing session keeps its id.
    let old_id = first.id.clone();
    store.persist(&mut first).await.unwrap();
    assert_eq!(first.id, old_id);
}

#[tokio::test]
async fn flash_survives_one_round_trip_only() {
    let store = session_store(record_store().await, 60);

    let mut session = store.fresh(COOKIE);
    let mut flash = Flash::new();
    flash.success("Successfully created your account");
    flash.add(&mut session);
    let cookie_value = store.persist(&mut session).await.unwrap();

    // Next request: the flash is there exactly once.
    let (mut restored, err) = store.resolve(COOKIE, Some(&cookie_value)).await;
    assert!(err.is_none());
    let got = Flash::get(&mut restored).expect("queued flash");
    assert_eq!(got.success.as_deref(), Some("Successfully created your account"));
    assert!(Flash::get(&mut restored).is_none());

    // Persist the consumption; the request after that sees nothing.
    let cookie_value = store.persist(&mut restored).await.unwrap();
    let (mut next, _) = store.resolve(COOKIE, Some(&cookie_value)).await;
    assert!(Flash::get(&mut next).is_none());
}

#[tokio::test]
async fn secret_rotation_keeps_live_sessions_valid() {
    let records = record_store().await;

    let old_store = SessionStore::new(
        records.clone(),
        CodecChain::from_secrets(&["old-secret"]),
        SessionOptions {
            max_age_secs: 60,
            path: "/".to_string(),
        },
        100,
    );
    let mut session = old_store.fresh(COOKIE);
    session.insert("user", json!("me@me.com"));
    let cookie_value = old_store.persist(&mut session).await.unwrap();

    let rotated_store = SessionStore::new(
        records,
        CodecChain::from_secrets(&["new-secret", "old-secret"]),
        SessionOptions {
            max_age_secs: 60,
            path: "/".to_string(),
        },
        100,
    );
    let (restored, err) = rotated_store.resolve(COOKIE, Some(&cookie_value)).await;
    assert!(err.is_none());
    assert_eq!(restored.get_str("user"), Some("me@me.com"));
}

fn register_form(email: &str) -> RegisterForm {
    RegisterForm {
        first_name: "Geofrey".to_string(),
        last_name: "Ernest".to_string(),
        email: email.to_string(),
        password: "pass".to_string(),
        confirm_password: "pass".to_string(),
    }
}

#[tokio::test]
async fn account_lifecycle() {
    let users = UserStore::new(record_store().await);

    let created = users.create_user(&register_form("me@me.com")).await.unwrap();
    assert_ne!(created.password, "pass", "password must be stored hashed");

    // Second registration with the same email loses the race.
    let err = users.create_user(&register_form("me@me.com")).await;
    assert!(matches!(err, Err(AppError::AlreadyExists)));

    let fetched = users.get_user("me@me.com").await.unwrap();
    assert_eq!(fetched.first_name, "Geofrey");
    assert_eq!(fetched.last_name, "Ernest");

    assert!(fetched.match_password("pass").is_ok());
    assert!(matches!(
        fetched.match_password("wrong"),
        Err(AppError::CredentialMismatch)
    ));

    assert!(users.exists("me@me.com").await.unwrap());
    assert!(!users.exists("nobody@me.com").await.unwrap());

    let mut updated = fetched.clone();
    updated.first_name = "Geofrey wa".to_string();
    users.update_user(&mut updated).await.unwrap();
    assert!(updated.updated_at >= created.updated_at);

    let after = users.get_user("me@me.com").await.unwrap();
    assert_eq!(after.first_name, "Geofrey wa");

    assert!(matches!(
        users.get_user("nobody@me.com").await,
        Err(AppError::UserNotFound)
    ));
}
