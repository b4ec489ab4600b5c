mod common;

use std::collections::HashSet;
use std::sync::Arc;

use exploremh::db::storage::{KeyValueStore, MemoryStore, StorageError};
use exploremh::services::session::SessionContext;
use exploremh::services::trip_repository::{storage_key, TripRepository};

use common::{sample_trip, session_with_store, TEST_EMAIL, TEST_PASSWORD};

#[tokio::test]
async fn test_save_without_principal_leaves_storage_untouched() {
    let store = Arc::new(MemoryStore::new());
    let repo = TripRepository::new(store.clone(), SessionContext::new());

    assert!(repo.save_trip(&sample_trip("Solo")).unwrap().is_none());
    assert!(repo.delete_trip("123").unwrap().is_none());
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_each_save_adds_one_trip_newest_first() {
    let session = session_with_store(Arc::new(MemoryStore::new()));
    session.login(TEST_EMAIL, TEST_PASSWORD).await.unwrap();

    let first = session.trips().save_trip(&sample_trip("First")).unwrap().unwrap();
    let second = session.trips().save_trip(&sample_trip("Second")).unwrap().unwrap();
    let third = session.trips().save_trip(&sample_trip("First")).unwrap().unwrap();

    assert_eq!(first.saved_trips.len(), 1);
    assert_eq!(second.saved_trips.len(), 2);
    assert_eq!(third.saved_trips.len(), 3);

    let titles: Vec<&str> = third
        .saved_trips
        .iter()
        .map(|t| t.trip_title.as_str())
        .collect();
    assert_eq!(titles, vec!["First", "Second", "First"]);

    let ids: HashSet<&str> = third
        .saved_trips
        .iter()
        .map(|t| t.id.as_deref().unwrap())
        .collect();
    assert_eq!(ids.len(), 3);
    assert!(third.saved_trips.iter().all(|t| t.created_at.is_some()));

    let numeric: Vec<i64> = third
        .saved_trips
        .iter()
        .map(|t| t.id.as_deref().unwrap().parse().unwrap())
        .collect();
    assert!(numeric.windows(2).all(|w| w[0] > w[1]));
}

#[tokio::test]
async fn test_delete_unknown_id_returns_unchanged_list() {
    let session = session_with_store(Arc::new(MemoryStore::new()));
    session.login(TEST_EMAIL, TEST_PASSWORD).await.unwrap();
    let saved = session.trips().save_trip(&sample_trip("Keep me")).unwrap().unwrap();

    let after = session.trips().delete_trip("does-not-exist").unwrap().unwrap();
    assert_eq!(after.saved_trips, saved.saved_trips);
}

#[tokio::test]
async fn test_delete_removes_matching_trip() {
    let session = session_with_store(Arc::new(MemoryStore::new()));
    session.login(TEST_EMAIL, TEST_PASSWORD).await.unwrap();
    session.trips().save_trip(&sample_trip("Old")).unwrap();
    let user = session.trips().save_trip(&sample_trip("New")).unwrap().unwrap();

    let newest_id = user.saved_trips[0].id.clone().unwrap();
    let after = session.trips().delete_trip(&newest_id).unwrap().unwrap();

    assert_eq!(after.saved_trips.len(), 1);
    assert_eq!(after.saved_trips[0].trip_title, "Old");
    assert_eq!(session.current_user().unwrap().saved_trips, after.saved_trips);
}

#[tokio::test]
async fn test_persisted_trips_read_back_identically() {
    let store = Arc::new(MemoryStore::new());
    let session = session_with_store(store.clone());
    session.login(TEST_EMAIL, TEST_PASSWORD).await.unwrap();
    session.trips().save_trip(&sample_trip("A")).unwrap();
    let user = session.trips().save_trip(&sample_trip("B")).unwrap().unwrap();

    let fresh = TripRepository::new(store, SessionContext::new());
    let reread = fresh.load(&user.id).unwrap();
    assert_eq!(reread.saved_trips, user.saved_trips);
    assert_eq!(reread.favorites, user.favorites);
}

#[tokio::test]
async fn test_corrupt_record_is_not_overwritten() {
    let store = Arc::new(MemoryStore::new());
    store.set(&storage_key("test_user_123"), "{not json").unwrap();

    let session = session_with_store(store.clone());
    let user = session.login(TEST_EMAIL, TEST_PASSWORD).await.unwrap();
    assert!(user.saved_trips.is_empty());

    let err = session.trips().save_trip(&sample_trip("X")).unwrap_err();
    assert!(matches!(err, StorageError::Corrupt { .. }));
    assert_eq!(
        store.get(&storage_key("test_user_123")).unwrap().as_deref(),
        Some("{not json")
    );
}
