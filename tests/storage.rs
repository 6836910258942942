use tasklane::queue::{OperationKind, PendingOperation, PendingQueue};
use tasklane::session::Session;
use tasklane::storage::{DurableStore, LocalStorage};
use tasklane::task::{Task, TaskStatus};

#[tokio::test]
async fn test_empty_store_loads_defaults() {
    let storage = LocalStorage::in_memory().await.unwrap();
    assert!(storage.load_tasks().await.unwrap().is_empty());
    assert!(storage.load_queue().await.unwrap().is_empty());
    assert!(storage.load_session().await.unwrap().is_none());
}

#[tokio::test]
async fn test_tasks_and_queue_are_replaced_on_save() {
    let storage = LocalStorage::in_memory().await.unwrap();
    let mut task = Task::new("Pay rent", "", TaskStatus::InProgress);
    task.remote_id = Some("srv-9".to_string());
    let other = Task::new("Stretch", "5 minutes", TaskStatus::ToDo);

    storage.save_tasks(&[task.clone(), other.clone()]).await.unwrap();
    storage.save_tasks(&[task.clone()]).await.unwrap();
    assert_eq!(storage.load_tasks().await.unwrap(), vec![task.clone()]);

    let mut queue = PendingQueue::new();
    queue.push(PendingOperation::new(task.clone(), OperationKind::Update));
    queue.push(PendingOperation::new(other, OperationKind::Create));
    storage.save_queue(&queue).await.unwrap();

    let loaded = storage.load_queue().await.unwrap();
    assert_eq!(loaded, queue);
    assert_eq!(loaded.entries()[0].kind, OperationKind::Update);
}

#[tokio::test]
async fn test_session_lifecycle() {
    let storage = LocalStorage::in_memory().await.unwrap();
    let session = Session::new("alice", "token-1");

    storage.save_session(&session).await.unwrap();
    assert_eq!(storage.load_session().await.unwrap(), Some(session));

    storage.clear_session().await.unwrap();
    assert!(storage.load_session().await.unwrap().is_none());
}

#[tokio::test]
async fn test_clear_all_removes_everything() {
    let storage = LocalStorage::in_memory().await.unwrap();
    let task = Task::new("Gone soon", "", TaskStatus::ToDo);
    let mut queue = PendingQueue::new();
    queue.push(PendingOperation::new(task.clone(), OperationKind::Create));

    storage.save_tasks(&[task]).await.unwrap();
    storage.save_queue(&queue).await.unwrap();
    storage.save_session(&Session::new("alice", "token-1")).await.unwrap();

    storage.clear_all().await.unwrap();
    assert!(storage.load_tasks().await.unwrap().is_empty());
    assert!(storage.load_queue().await.unwrap().is_empty());
    assert!(storage.load_session().await.unwrap().is_none());
}

#[tokio::test]
async fn test_file_database_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data").join("tasklane.db");
    let task = Task::new("Durable", "", TaskStatus::Completed);

    {
        let storage = LocalStorage::open(&path).await.unwrap();
        storage.save_tasks(&[task.clone()]).await.unwrap();
    }

    let reopened = LocalStorage::open(&path).await.unwrap();
    assert_eq!(reopened.load_tasks().await.unwrap(), vec![task]);
}
