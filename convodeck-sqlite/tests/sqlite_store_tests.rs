use chrono::Utc;
use convodeck_core::{KeyValueStore, KvProgressRepo, ManualClock, ProgressTracker};
use convodeck_sqlite::SqliteKvStore;
use std::sync::Arc;
use tempfile::tempdir;

#[tokio::test]
async fn set_is_an_upsert() {
    let store = SqliteKvStore::open_memory().await.unwrap();
    store.set("k", "1").await.unwrap();
    store.set("k", "2").await.unwrap();
    assert_eq!(store.get("k").await.unwrap(), Some("2".to_string()));
    assert_eq!(store.get_all_keys().await.unwrap(), vec!["k".to_string()]);

    store.remove("k").await.unwrap();
    store.remove("k").await.unwrap();
    assert_eq!(store.get("k").await.unwrap(), None);
}

#[tokio::test]
async fn multi_get_keeps_order_and_missing_keys() {
    let store = SqliteKvStore::open_memory().await.unwrap();
    store.set("b", "2").await.unwrap();
    let got = store.multi_get(&["a".into(), "b".into()]).await.unwrap();
    assert_eq!(got, vec![("a".to_string(), None), ("b".to_string(), Some("2".to_string()))]);
}

#[tokio::test]
async fn file_store_survives_reopen() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("convodeck.sqlite3");
    {
        let store = Arc::new(SqliteKvStore::open_file(&db).await.unwrap());
        let tracker = ProgressTracker::new(
            Arc::new(KvProgressRepo::new(store)),
            Arc::new(ManualClock::new(Utc::now())),
        );
        tracker.track_card_view("deep talks", "c1").await.unwrap();
    }

    let store = Arc::new(SqliteKvStore::open_file(&db).await.unwrap());
    let tracker = ProgressTracker::new(
        Arc::new(KvProgressRepo::new(store)),
        Arc::new(ManualClock::new(Utc::now())),
    );
    let summary = tracker.get_set_progress("deep talks", 4).await.unwrap();
    assert_eq!(summary.percentage, 25);
}
