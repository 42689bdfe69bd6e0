use fake::{Fake, faker::name::en::Name};
use serde_json::json;
use sessionstore_db::Session;

use crate::{raw_record, test_store};

fn session(value: serde_json::Value) -> Session {
    serde_json::from_value(value).expect("invalid session fixture")
}

#[sqlx::test(migrations = false)]
async fn set_then_get_returns_the_payload(pool: sqlx::SqlitePool) {
    let (store, _) = test_store(pool, 1_000).await;
    let user: String = Name().fake();
    let payload = session(json!({
        "cookie": { "maxAge": 60_000, "path": "/", "httpOnly": true },
        "user": user,
        "roles": ["admin"]
    }));

    store.set("abc", &payload).await.unwrap();

    assert_eq!(store.get("abc").await.unwrap(), Some(payload));
}

#[sqlx::test(migrations = false)]
async fn get_of_unknown_sid_is_none(pool: sqlx::SqlitePool) {
    let (store, _) = test_store(pool, 1_000).await;

    assert_eq!(store.get("nope").await.unwrap(), None);
}

#[sqlx::test(migrations = false)]
async fn session_expires_after_max_age(pool: sqlx::SqlitePool) {
    let t = 1_700_000_000_000;
    let (store, clock) = test_store(pool, t).await;
    let payload = session(json!({ "cookie": { "maxAge": 1000 }, "user": "x" }));

    store.set("abc", &payload).await.unwrap();

    clock.set(t + 500);
    assert_eq!(store.get("abc").await.unwrap(), Some(payload));

    clock.set(t + 1_500);
    assert_eq!(store.get("abc").await.unwrap(), None);

    // still physically stored until pruned
    assert_eq!(store.length().await.unwrap(), 1);
}

#[sqlx::test(migrations = false)]
async fn expiry_instant_is_exclusive(pool: sqlx::SqlitePool) {
    let (store, clock) = test_store(pool, 0).await;

    store.set("abc", &Session::with_max_age(1_000)).await.unwrap();

    clock.set(999);
    assert!(store.get("abc").await.unwrap().is_some());

    clock.set(1_000);
    assert!(store.get("abc").await.unwrap().is_none());
}

#[sqlx::test(migrations = false)]
async fn default_ttl_applies_without_max_age(pool: sqlx::SqlitePool) {
    let (store, _) = test_store(pool, 2_000).await;

    store.set("abc", &session(json!({ "user": "x" }))).await.unwrap();

    let record = raw_record(&store, "abc").await;
    assert_eq!(record.expires, 2_000 + 86_400 * 1_000);
}

#[sqlx::test(migrations = false)]
async fn second_set_replaces_payload_and_keeps_created_at(pool: sqlx::SqlitePool) {
    let (store, clock) = test_store(pool, 1_000).await;
    let first = session(json!({ "cookie": { "maxAge": 10_000 }, "step": 1 }));
    let second = session(json!({ "cookie": { "maxAge": 10_000 }, "step": 2 }));

    store.set("abc", &first).await.unwrap();
    clock.advance(3_000);
    store.set("abc", &second).await.unwrap();

    assert_eq!(store.length().await.unwrap(), 1);
    assert_eq!(store.get("abc").await.unwrap(), Some(second));

    let record = raw_record(&store, "abc").await;
    assert_eq!(record.created_at, 1_000);
    assert_eq!(record.expires, 14_000);
}

#[sqlx::test(migrations = false)]
async fn destroy_removes_the_session(pool: sqlx::SqlitePool) {
    let (store, _) = test_store(pool, 0).await;
    store.set("abc", &Session::with_max_age(1_000)).await.unwrap();

    store.destroy("abc").await.unwrap();

    assert_eq!(store.get("abc").await.unwrap(), None);
    assert_eq!(store.length().await.unwrap(), 0);
}

#[sqlx::test(migrations = false)]
async fn destroy_of_unknown_sid_is_ok(pool: sqlx::SqlitePool) {
    let (store, _) = test_store(pool, 0).await;

    store.destroy("never-stored").await.unwrap();
}

#[sqlx::test(migrations = false)]
async fn touch_moves_expiry_but_not_data(pool: sqlx::SqlitePool) {
    let (store, clock) = test_store(pool, 10_000).await;
    let stored = session(json!({ "cookie": { "maxAge": 1_000 }, "user": "x" }));
    store.set("abc", &stored).await.unwrap();

    clock.advance(500);
    let refreshed = session(json!({ "cookie": { "maxAge": 5_000 }, "user": "changed" }));
    store.touch("abc", &refreshed).await.unwrap();

    let record = raw_record(&store, "abc").await;
    assert_eq!(record.expires, 15_500);
    assert_eq!(record.created_at, 10_000);

    // past the original expiry, the touched session is still there, unchanged
    clock.set(12_000);
    assert_eq!(store.get("abc").await.unwrap(), Some(stored));
}

#[sqlx::test(migrations = false)]
async fn clear_removes_everything(pool: sqlx::SqlitePool) {
    let (store, _) = test_store(pool, 0).await;
    for sid in ["a", "b", "c"] {
        store.set(sid, &Session::with_max_age(1_000)).await.unwrap();
    }

    store.clear().await.unwrap();

    assert_eq!(store.length().await.unwrap(), 0);
}

#[sqlx::test(migrations = false)]
async fn length_counts_expired_rows_until_pruned(pool: sqlx::SqlitePool) {
    let (store, clock) = test_store(pool, 0).await;
    store.set("short", &Session::with_max_age(100)).await.unwrap();
    store.set("long", &Session::with_max_age(10_000)).await.unwrap();

    clock.set(1_000);

    // length reports storage occupancy, live_length reports usable sessions
    assert_eq!(store.length().await.unwrap(), 2);
    assert_eq!(store.live_length().await.unwrap(), 1);
}

#[sqlx::test(migrations = false)]
async fn ids_and_all_skip_expired_sessions(pool: sqlx::SqlitePool) {
    let (store, clock) = test_store(pool, 0).await;
    let mut b = Session::with_max_age(10_000);
    b.insert("user", "bee");
    store.set("b", &b).await.unwrap();
    store.set("a", &Session::with_max_age(10_000)).await.unwrap();
    store.set("gone", &Session::with_max_age(10)).await.unwrap();

    clock.set(100);

    assert_eq!(store.ids().await.unwrap(), vec!["a", "b"]);
    let all = store.all().await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[1], ("b".to_string(), b));
}
