use std::sync::Arc;

use sessionstore_config::{DEFAULT_TTL_SECS, StoreConfig};
use tracing::{debug, error, info, warn};

use crate::{Clock, DbPool, Error, SchemaGuard, Session, SessionRecord, SystemClock};

/// A session store backed by the `sessions` table.
///
/// Each operation is a single SQL statement against the shared pool; the store
/// itself holds no locks. Concurrent writes to the same sid are resolved by the
/// database, last commit wins.
///
/// Building a store kicks off schema creation in the background (see
/// [`SchemaGuard`]); operations wait for it before touching the table.
///
/// ```rust,ignore
/// let store = SessionStore::builder()
///     .pool(pool)
///     .default_ttl_secs(3600)
///     .build()?;
///
/// store.set("abc", &session).await?;
/// let loaded = store.get("abc").await?;
/// ```
#[derive(Clone, Debug)]
pub struct SessionStore {
    pool: DbPool,
    default_ttl_secs: u64,
    clock: Arc<dyn Clock>,
    schema: Arc<SchemaGuard>,
}

#[derive(Debug)]
pub struct SessionStoreBuilder {
    pool: Option<DbPool>,
    default_ttl_secs: u64,
    clock: Arc<dyn Clock>,
    schema: Arc<SchemaGuard>,
}

impl Default for SessionStoreBuilder {
    fn default() -> Self {
        Self {
            pool: None,
            default_ttl_secs: DEFAULT_TTL_SECS,
            clock: Arc::new(SystemClock),
            schema: SchemaGuard::global(),
        }
    }
}

impl SessionStoreBuilder {
    /// The pool all queries run on. Required.
    pub fn pool(mut self, pool: DbPool) -> Self {
        self.pool = Some(pool);
        self
    }

    /// Lifetime of sessions whose cookie carries no numeric max-age.
    pub fn default_ttl_secs(mut self, secs: u64) -> Self {
        self.default_ttl_secs = secs;
        self
    }

    /// Takes the store settings from the loaded configuration.
    pub fn config(self, config: &StoreConfig) -> Self {
        self.default_ttl_secs(config.default_ttl_secs)
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replaces the process-wide [`SchemaGuard`].
    pub fn schema_guard(mut self, schema: Arc<SchemaGuard>) -> Self {
        self.schema = schema;
        self
    }

    /// Builds the store and starts schema creation in the background.
    ///
    /// Fails only when no pool was supplied. Schema creation errors are
    /// logged and retried by the next operation, never returned here.
    pub fn build(self) -> Result<SessionStore, Error> {
        let pool = self.pool.ok_or(Error::MissingExecutor)?;

        let store = SessionStore {
            pool,
            default_ttl_secs: self.default_ttl_secs,
            clock: self.clock,
            schema: self.schema,
        };
        store.init_schema_in_background();

        Ok(store)
    }
}

impl SessionStore {
    /// A store on `pool` with the default TTL, the system clock and the
    /// process-wide schema guard.
    pub fn new(pool: DbPool) -> Self {
        let store = SessionStore {
            pool,
            default_ttl_secs: DEFAULT_TTL_SECS,
            clock: Arc::new(SystemClock),
            schema: SchemaGuard::global(),
        };
        store.init_schema_in_background();
        store
    }

    pub fn builder() -> SessionStoreBuilder {
        SessionStoreBuilder::default()
    }

    pub fn default_ttl_secs(&self) -> u64 {
        self.default_ttl_secs
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Waits until the schema exists, creating it if needed.
    pub async fn ready(&self) -> Result<(), Error> {
        self.schema.ensure(&self.pool).await
    }

    /// Loads a session that has not expired yet.
    ///
    /// Expired rows are filtered out by the query, so an expired session reads
    /// as `None` even before it is pruned.
    pub async fn get(&self, sid: &str) -> Result<Option<Session>, Error> {
        self.schema_ready().await;

        let now = self.clock.now_millis();
        let Some(data) = SessionRecord::try_get_live_data(sid, now, &self.pool).await? else {
            return Ok(None);
        };

        let session = serde_json::from_str(&data).map_err(Error::Deserialize)?;
        Ok(Some(session))
    }

    /// Stores a session, replacing its payload and expiry if it already exists.
    pub async fn set(&self, sid: &str, session: &Session) -> Result<(), Error> {
        self.schema_ready().await;

        let now = self.clock.now_millis();
        let expires = self.expires_at(session, now);
        let data = serde_json::to_string(session).map_err(Error::Serialize)?;

        SessionRecord::upsert(sid, expires, &data, now, &self.pool).await
    }

    /// Pushes back the expiry of a stored session without changing its payload.
    ///
    /// Touching a sid that is not stored is not an error.
    pub async fn touch(&self, sid: &str, session: &Session) -> Result<(), Error> {
        self.schema_ready().await;

        let expires = self.expires_at(session, self.clock.now_millis());
        let touched = SessionRecord::update_expires(sid, expires, &self.pool).await?;
        if touched == 0 {
            debug!("touched a session that is not stored");
        }

        Ok(())
    }

    /// Deletes a session. Deleting a sid that is not stored is not an error.
    pub async fn destroy(&self, sid: &str) -> Result<(), Error> {
        self.schema_ready().await;

        SessionRecord::delete(sid, &self.pool).await?;
        Ok(())
    }

    /// Deletes every session.
    pub async fn clear(&self) -> Result<(), Error> {
        self.schema_ready().await;

        let deleted = SessionRecord::delete_all(&self.pool).await?;
        info!(deleted, "cleared session store");
        Ok(())
    }

    /// Number of stored rows, **including expired rows not pruned yet**.
    ///
    /// This is what the table occupies, not how many sessions are usable; use
    /// [`SessionStore::live_length`] for the latter.
    pub async fn length(&self) -> Result<u64, Error> {
        self.schema_ready().await;

        SessionRecord::count(&self.pool).await
    }

    /// Number of sessions that have not expired yet.
    pub async fn live_length(&self) -> Result<u64, Error> {
        self.schema_ready().await;

        SessionRecord::count_live(self.clock.now_millis(), &self.pool).await
    }

    /// Sids of all sessions that have not expired yet, in ascending order.
    pub async fn ids(&self) -> Result<Vec<String>, Error> {
        Ok(self
            .all()
            .await?
            .into_iter()
            .map(|(sid, _)| sid)
            .collect())
    }

    /// All sessions that have not expired yet, ordered by sid.
    pub async fn all(&self) -> Result<Vec<(String, Session)>, Error> {
        self.schema_ready().await;

        let records = SessionRecord::load_live(self.clock.now_millis(), &self.pool).await?;
        records
            .into_iter()
            .map(|record| -> Result<(String, Session), Error> {
                let session = serde_json::from_str(&record.data).map_err(Error::Deserialize)?;
                Ok((record.sid, session))
            })
            .collect()
    }

    /// The raw row stored for `sid`, expired or not.
    pub async fn record(&self, sid: &str) -> Result<Option<SessionRecord>, Error> {
        self.schema_ready().await;

        SessionRecord::try_get(sid, &self.pool).await
    }

    /// Deletes every session that expired strictly before now and returns how
    /// many rows went away.
    pub async fn prune_expired(&self) -> Result<u64, Error> {
        self.schema_ready().await;

        SessionRecord::delete_expired(self.clock.now_millis(), &self.pool).await
    }

    /// Housekeeping variant of [`SessionStore::prune_expired`]: the outcome is
    /// logged and nothing is returned, since no request waits on it.
    pub async fn prune(&self) {
        match self.prune_expired().await {
            Ok(0) => debug!("session prune: no expired sessions"),
            Ok(pruned) => info!(pruned, "session prune completed"),
            Err(e) => warn!(error = %e, "session prune failed"),
        }
    }

    /// Absolute expiry of `session` when written at `now`.
    fn expires_at(&self, session: &Session, now: i64) -> i64 {
        let ttl_millis = session
            .cookie
            .max_age_millis()
            .unwrap_or_else(|| self.default_ttl_millis());

        now.saturating_add(ttl_millis)
    }

    fn default_ttl_millis(&self) -> i64 {
        i64::try_from(self.default_ttl_secs.saturating_mul(1000)).unwrap_or(i64::MAX)
    }

    async fn schema_ready(&self) {
        if let Err(e) = self.ready().await {
            error!(error = %e, "sessions schema initialization failed, will retry");
        }
    }

    fn init_schema_in_background(&self) {
        if self.schema.is_initialized() {
            return;
        }

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            debug!("no runtime to create the sessions schema on, deferring to first use");
            return;
        };

        let pool = self.pool.clone();
        let schema = Arc::clone(&self.schema);
        runtime.spawn(async move {
            if let Err(e) = schema.ensure(&pool).await {
                error!(error = %e, "sessions schema initialization failed, will retry");
            }
        });
    }
}
