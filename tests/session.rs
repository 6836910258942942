mod common;

use common::{FakeBackend, MemoryStore, PASSWORD, TOKEN};
use std::sync::Arc;
use tasklane::session::{Session, SessionEvent, SessionManager, SessionState};
use tasklane::storage::DurableStore;
use tasklane::task::{Task, TaskStatus};

fn manager(store: &Arc<MemoryStore>) -> SessionManager {
    SessionManager::new(store.clone(), Some(FakeBackend::new()))
}

#[tokio::test]
async fn test_login_persists_and_broadcasts() {
    let store = Arc::new(MemoryStore::default());
    let session = manager(&store);
    let mut events = session.subscribe_events();
    assert_eq!(session.state(), SessionState::SignedOut { manual: false });

    let signed_in = session.login("alice", PASSWORD).await.unwrap();
    assert_eq!(signed_in.token, TOKEN);
    assert_eq!(signed_in.username, "alice");
    assert!(signed_in.user_id.starts_with("user_"));
    assert!(session.state().is_signed_in());
    assert_eq!(store.stored_session(), Some(signed_in.clone()));
    assert_eq!(events.recv().await.unwrap(), SessionEvent::LoggedIn(signed_in));
}

#[tokio::test]
async fn test_failed_login_stays_signed_out() {
    let store = Arc::new(MemoryStore::default());
    let session = manager(&store);

    assert!(session.login("alice", "wrong").await.is_err());
    assert!(session.current().is_none());
    assert!(store.stored_session().is_none());
}

#[tokio::test]
async fn test_register_does_not_sign_in() {
    let store = Arc::new(MemoryStore::default());
    let session = manager(&store);

    let registered = session.register("bob", "bob@example.com", "pw").await.unwrap();
    assert_eq!(registered.token, "token-bob");
    assert!(session.current().is_none());

    session.sign_in(registered.clone()).await.unwrap();
    assert_eq!(session.current(), Some(registered));
}

#[tokio::test]
async fn test_restore_signs_back_in() {
    let store = Arc::new(MemoryStore::default());
    manager(&store).sign_in(Session::new("alice", TOKEN)).await.unwrap();

    let restarted = manager(&store);
    let restored = restarted.restore().await.unwrap();
    assert!(restored.is_some());
    assert_eq!(restarted.current(), restored);
}

#[tokio::test]
async fn test_manual_logout_wipes_store() {
    let store = Arc::new(MemoryStore::default());
    let session = manager(&store);
    session.sign_in(Session::new("alice", TOKEN)).await.unwrap();
    store
        .save_tasks(&[Task::new("private", "", TaskStatus::ToDo)])
        .await
        .unwrap();
    let mut state = session.subscribe();

    session.logout(true).await.unwrap();
    assert!(store.stored_tasks().is_empty());
    assert!(store.stored_session().is_none());
    assert!(state.has_changed().unwrap());
    assert_eq!(*state.borrow_and_update(), SessionState::SignedOut { manual: true });
}

#[tokio::test]
async fn test_unauthorized_logout_keeps_tasks() {
    let store = Arc::new(MemoryStore::default());
    let session = manager(&store);
    session.sign_in(Session::new("alice", TOKEN)).await.unwrap();
    store
        .save_tasks(&[Task::new("unsynced", "", TaskStatus::ToDo)])
        .await
        .unwrap();
    let mut events = session.subscribe_events();

    session.handle_unauthorized().await.unwrap();
    assert_eq!(store.stored_tasks().len(), 1);
    assert!(store.stored_session().is_none());
    assert_eq!(session.state(), SessionState::SignedOut { manual: false });
    assert_eq!(events.recv().await.unwrap(), SessionEvent::LoggedOut { manual: false });

    // Already signed out: nothing happens.
    session.handle_unauthorized().await.unwrap();
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn test_login_without_auth_backend_fails() {
    let store = Arc::new(MemoryStore::default());
    let session = SessionManager::new(store, None);
    assert!(session.login("alice", PASSWORD).await.is_err());
}
