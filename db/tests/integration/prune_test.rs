use std::sync::Arc;

use sessionstore_db::{SchemaGuard, Session, SessionStore};

use crate::test_store;

#[sqlx::test(migrations = false)]
async fn prune_removes_only_expired_rows(pool: sqlx::SqlitePool) {
    let (store, clock) = test_store(pool, 0).await;
    store.set("expired", &Session::with_max_age(100)).await.unwrap();
    store.set("live", &Session::with_max_age(10_000)).await.unwrap();
    clock.set(1_000);
    let before = store.length().await.unwrap();

    store.prune().await;

    assert_eq!(store.length().await.unwrap(), before - 1);
    assert!(store.record("expired").await.unwrap().is_none());
    assert!(store.record("live").await.unwrap().is_some());
}

#[sqlx::test(migrations = false)]
async fn prune_keeps_rows_expiring_exactly_now(pool: sqlx::SqlitePool) {
    let (store, clock) = test_store(pool, 0).await;
    store.set("edge", &Session::with_max_age(1_000)).await.unwrap();
    clock.set(1_000);

    assert_eq!(store.prune_expired().await.unwrap(), 0);
    // gone for reads all the same
    assert!(store.get("edge").await.unwrap().is_none());

    clock.set(1_001);
    assert_eq!(store.prune_expired().await.unwrap(), 1);
}

#[sqlx::test(migrations = false)]
async fn concurrent_prunes_do_not_fail(pool: sqlx::SqlitePool) {
    let (store, clock) = test_store(pool, 0).await;
    for i in 0..20 {
        store
            .set(&format!("sid-{i}"), &Session::with_max_age(10))
            .await
            .unwrap();
    }
    clock.set(1_000);

    let (a, b, c) = tokio::join!(
        store.prune_expired(),
        store.prune_expired(),
        store.prune_expired()
    );

    assert_eq!(a.unwrap() + b.unwrap() + c.unwrap(), 20);
    assert_eq!(store.length().await.unwrap(), 0);
}

#[tokio::test]
async fn prune_on_a_closed_pool_only_logs() {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .connect_lazy("sqlite::memory:")
        .unwrap();
    pool.close().await;
    let store = SessionStore::builder()
        .pool(pool)
        .schema_guard(Arc::new(SchemaGuard::new()))
        .build()
        .unwrap();

    store.prune().await;

    assert!(store.prune_expired().await.is_err());
}
