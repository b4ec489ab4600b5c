mod common;

use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};

use exploremh::db::storage::{KeyValueStore, MemoryStore};
use exploremh::models::user::StoredUserData;
use exploremh::services::identity::{AuthErrorKind, ProviderCallback, ProviderKind};
use exploremh::services::session::SESSION_KEY;
use exploremh::services::trip_repository::storage_key;

use common::{
    record_events, sample_trip, session_with_store, GOOD_CODE, TEST_EMAIL, TEST_PASSWORD,
};

#[tokio::test]
async fn test_listener_fires_immediately_with_current_state() {
    let session = session_with_store(Arc::new(MemoryStore::new()));
    let events = record_events(&session);

    assert_eq!(events.lock().unwrap().as_slice(), &[None]);
}

#[tokio::test]
async fn test_rejected_sign_in_emits_nothing_and_keeps_message() {
    let store = Arc::new(MemoryStore::new());
    let session = session_with_store(store.clone());
    let events = record_events(&session);

    let err = session.login(TEST_EMAIL, "wrong-password").await.unwrap_err();

    assert_eq!(err.kind, AuthErrorKind::InvalidCredentials);
    assert_eq!(err.to_string(), "INVALID_LOGIN_CREDENTIALS");
    assert_eq!(events.lock().unwrap().len(), 1);
    assert!(session.current_user().is_none());
    assert!(!session.context().is_authenticated());
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_login_merges_locally_saved_trips() {
    let store = Arc::new(MemoryStore::new());
    let mut saved = sample_trip("Konkan Coast");
    saved.id = Some("1700000000000".to_string());
    let data = StoredUserData {
        favorites: vec![],
        saved_trips: vec![saved.clone()],
    };
    store
        .set(
            &storage_key("test_user_123"),
            &serde_json::to_string(&data).unwrap(),
        )
        .unwrap();

    let session = session_with_store(store);
    let events = record_events(&session);

    let user = session.login(TEST_EMAIL, TEST_PASSWORD).await.unwrap();
    assert_eq!(user.id, "test_user_123");
    assert_eq!(user.name, "test");
    assert_eq!(user.saved_trips, vec![saved]);

    let events = events.lock().unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[1].as_ref(), Some(&user));
}

#[tokio::test]
async fn test_sign_up_existing_email_surfaces_provider_text() {
    let session = session_with_store(Arc::new(MemoryStore::new()));
    let err = session.sign_up(TEST_EMAIL, "whatever").await.unwrap_err();
    assert_eq!(err.kind, AuthErrorKind::EmailInUse);
    assert_eq!(err.to_string(), "EMAIL_EXISTS");

    let user = session.sign_up("new@example.com", "secret1").await.unwrap();
    assert_eq!(user.email, "new@example.com");
    assert!(user.saved_trips.is_empty());
}

#[tokio::test]
async fn test_logout_clears_session_and_notifies() {
    let store = Arc::new(MemoryStore::new());
    let session = session_with_store(store.clone());
    let events = record_events(&session);

    session.login(TEST_EMAIL, TEST_PASSWORD).await.unwrap();
    assert!(store.get(SESSION_KEY).unwrap().is_some());

    session.logout().await.unwrap();

    assert!(session.current_user().is_none());
    assert!(store.get(SESSION_KEY).unwrap().is_none());
    assert_eq!(events.lock().unwrap().last().cloned(), Some(None));
}

#[tokio::test]
async fn test_unsubscribe_stops_notifications() {
    let session = session_with_store(Arc::new(MemoryStore::new()));
    let seen = Arc::new(Mutex::new(0usize));
    let counter = seen.clone();
    let subscription = session.on_auth_change(move |_| *counter.lock().unwrap() += 1);

    session.login(TEST_EMAIL, TEST_PASSWORD).await.unwrap();
    assert_eq!(*seen.lock().unwrap(), 2);

    subscription.unsubscribe();
    session.logout().await.unwrap();
    assert_eq!(*seen.lock().unwrap(), 2);
}

#[tokio::test]
async fn test_restore_brings_back_previous_session() {
    let store = Arc::new(MemoryStore::new());
    {
        let first = session_with_store(store.clone());
        first.login(TEST_EMAIL, TEST_PASSWORD).await.unwrap();
        first.trips().save_trip(&sample_trip("Hill stations")).unwrap();
    }

    let second = session_with_store(store);
    assert!(second.current_user().is_none());

    let restored = second.restore().unwrap();
    assert_eq!(restored.id, "test_user_123");
    assert_eq!(restored.saved_trips.len(), 1);
    assert_eq!(second.current_user(), Some(restored));
}

#[tokio::test]
async fn test_restore_without_persisted_session() {
    let session = session_with_store(Arc::new(MemoryStore::new()));
    assert!(session.restore().is_none());
}

#[tokio::test]
async fn test_provider_login_round_trip() {
    let session = session_with_store(Arc::new(MemoryStore::new()));
    let events = record_events(&session);

    let url = session.begin_provider_login(ProviderKind::Google).unwrap();
    let state = url
        .query_pairs()
        .find(|(k, _)| k == "state")
        .map(|(_, v)| v.into_owned());

    let callback = ProviderCallback {
        code: Some(GOOD_CODE.to_string()),
        state,
        error: None,
    };
    let user = session
        .login_with_provider(ProviderKind::Google, &callback)
        .await
        .unwrap();

    assert_eq!(user.name, "Federated Explorer");
    assert_eq!(events.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_provider_popup_dismissed() {
    let session = session_with_store(Arc::new(MemoryStore::new()));
    let events = record_events(&session);
    session.begin_provider_login(ProviderKind::Google).unwrap();

    let callback = ProviderCallback {
        code: None,
        state: None,
        error: Some("access_denied".to_string()),
    };
    let err = session
        .login_with_provider(ProviderKind::Google, &callback)
        .await
        .unwrap_err();

    assert_eq!(err.kind, AuthErrorKind::PopupClosed);
    assert_eq!(events.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_provider_state_mismatch_rejected() {
    let session = session_with_store(Arc::new(MemoryStore::new()));
    session.begin_provider_login(ProviderKind::Google).unwrap();

    let callback = ProviderCallback {
        code: Some(GOOD_CODE.to_string()),
        state: Some("forged".to_string()),
        error: None,
    };
    let err = session
        .login_with_provider(ProviderKind::Google, &callback)
        .await
        .unwrap_err();
    assert_eq!(err.kind, AuthErrorKind::StateMismatch);
    assert!(session.current_user().is_none());
}

#[tokio::test]
async fn test_disabled_provider_reports_not_enabled() {
    let session = session_with_store(Arc::new(MemoryStore::new()));
    let err = session.begin_provider_login(ProviderKind::GitHub).unwrap_err();
    assert_eq!(err.kind, AuthErrorKind::ProviderNotEnabled);
    assert_eq!(err.to_string(), "Sign-in with GitHub is not enabled");
}

#[tokio::test]
async fn test_sign_out_reaches_provider() {
    let session = session_with_store(Arc::new(MemoryStore::new()));
    session.login(TEST_EMAIL, TEST_PASSWORD).await.unwrap();
    session.logout().await.unwrap();
    // Logging out twice only signs the account out once.
    session.logout().await.unwrap();

    let provider_sign_outs = session_sign_outs(&session);
    assert_eq!(provider_sign_outs, 1);
}

fn session_sign_outs(session: &common::TestSession) -> usize {
    session.provider().sign_outs.load(Ordering::SeqCst)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_login_runs_on_spawned_task() {
    let session = Arc::new(session_with_store(Arc::new(MemoryStore::new())));

    let handle = tokio::spawn({
        let session = session.clone();
        async move { session.login(TEST_EMAIL, TEST_PASSWORD).await }
    });

    let user = handle.await.unwrap().unwrap();
    assert_eq!(user.id, "test_user_123");
    assert_eq!(session.current_user(), Some(user));
}
