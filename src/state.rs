use crate::config::Config;
use crate::crypto::codec::CodecChain;
use crate::error::Result;
use crate::models::session::SessionOptions;
use crate::store::records::RecordStore;
use crate::store::sessions::SessionStore;
use crate::store::users::UserStore;

/// The application's state: the shared record store plus the stores built
/// on top of it.
#[derive(Clone)]
pub struct AppState {
    /// The application's configuration.
    pub config: Config,
    /// The namespaced key-value store (the single shared mutable resource).
    pub records: RecordStore,
    /// The session store.
    pub sessions: SessionStore,
    /// The account store.
    pub users: UserStore,
}

impl AppState {
    /// Creates a new `AppState` from the configuration: opens the embedded
    /// database, bootstraps the schema and wires the stores together.
    pub async fn new(config: &Config) -> Result<Self> {
        let pool = crate::db::create_pool(&config.database_url).await?;
        crate::db::init_schema(&pool).await?;
        tracing::info!("record store initialized at {}", config.database_url);

        let records = RecordStore::new(pool);

        let secret_slices: Vec<&[u8]> = config.secrets.iter().map(|s| s.as_slice()).collect();
        let codecs = CodecChain::from_secrets(&secret_slices);
        let options = SessionOptions {
            max_age_secs: config.session_max_age_secs,
            path: config.session_path.clone(),
        };
        let sessions = SessionStore::new(
            records.clone(),
            codecs,
            options,
            config.store_default_duration_secs,
        );
        let users = UserStore::new(records.clone());

        Ok(AppState {
            config: config.clone(),
            records,
            sessions,
            users,
        })
    }
}
