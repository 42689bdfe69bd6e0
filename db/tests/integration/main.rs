mod prune_test;
mod store_test;

use std::sync::{Arc, OnceLock};

use sessionstore_db::{DbPool, ManualClock, SchemaGuard, SessionRecord, SessionStore};

fn lazy_tracing() {
    static TRACING: OnceLock<()> = OnceLock::new();
    TRACING.get_or_init(|| {
        tracing_subscriber::fmt()
            .with_env_filter("sessionstore_db=debug")
            .with_test_writer()
            .init()
    });
}

/// A store on the per-test database with its own schema guard and a clock
/// frozen at `now`.
///
/// [`sqlx::test`] sets up a fresh database for every test, so the guard must
/// not be shared with the process-wide one.
pub async fn test_store(pool: DbPool, now: i64) -> (SessionStore, Arc<ManualClock>) {
    if std::env::var("TEST_LOG").is_ok() {
        lazy_tracing();
    }

    let clock = Arc::new(ManualClock::new(now));
    let store = SessionStore::builder()
        .pool(pool)
        .clock(clock.clone())
        .schema_guard(Arc::new(SchemaGuard::new()))
        .build()
        .expect("failed to build session store");

    store.ready().await.expect("failed to create sessions schema");

    (store, clock)
}

pub async fn raw_record(store: &SessionStore, sid: &str) -> SessionRecord {
    SessionRecord::try_get(sid, store.pool())
        .await
        .expect("failed to load session row")
        .expect("session row is missing")
}
