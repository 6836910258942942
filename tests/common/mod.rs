#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;

use tasklane::backend::{AuthBackend, Backend, BackendError};
use tasklane::network::Connectivity;
use tasklane::notify::{ChannelNotifier, Notification};
use tasklane::queue::PendingQueue;
use tasklane::session::{Session, SessionManager};
use tasklane::storage::DurableStore;
use tasklane::sync::SyncService;
use tasklane::task::Task;

pub const TOKEN: &str = "token-alice";
pub const PASSWORD: &str = "secret";

/// In-process durable store.
#[derive(Default)]
pub struct MemoryStore {
    tasks: Mutex<Vec<Task>>,
    queue: Mutex<PendingQueue>,
    session: Mutex<Option<Session>>,
}

impl MemoryStore {
    pub fn stored_tasks(&self) -> Vec<Task> {
        self.tasks.lock().unwrap().clone()
    }

    pub fn stored_queue(&self) -> PendingQueue {
        self.queue.lock().unwrap().clone()
    }

    pub fn stored_session(&self) -> Option<Session> {
        self.session.lock().unwrap().clone()
    }
}

#[async_trait]
impl DurableStore for MemoryStore {
    async fn load_tasks(&self) -> Result<Vec<Task>> {
        Ok(self.stored_tasks())
    }

    async fn save_tasks(&self, tasks: &[Task]) -> Result<()> {
        *self.tasks.lock().unwrap() = tasks.to_vec();
        Ok(())
    }

    async fn load_queue(&self) -> Result<PendingQueue> {
        Ok(self.stored_queue())
    }

    async fn save_queue(&self, queue: &PendingQueue) -> Result<()> {
        *self.queue.lock().unwrap() = queue.clone();
        Ok(())
    }

    async fn load_session(&self) -> Result<Option<Session>> {
        Ok(self.stored_session())
    }

    async fn save_session(&self, session: &Session) -> Result<()> {
        *self.session.lock().unwrap() = Some(session.clone());
        Ok(())
    }

    async fn clear_session(&self) -> Result<()> {
        *self.session.lock().unwrap() = None;
        Ok(())
    }

    async fn clear_all(&self) -> Result<()> {
        self.tasks.lock().unwrap().clear();
        self.queue.lock().unwrap().clear();
        *self.session.lock().unwrap() = None;
        Ok(())
    }
}

/// Scripted remote task service shared by any number of devices.
pub struct FakeBackend {
    tasks: Mutex<Vec<Task>>,
    next_id: AtomicUsize,
    valid_token: Mutex<String>,
    fetch_error: Mutex<Option<BackendError>>,
    rejected_titles: Mutex<HashSet<String>>,
    reject_deletes: Mutex<bool>,
    writes_until_expiry: Mutex<Option<usize>>,
    fetch_delay: Mutex<Option<Duration>>,
    write_delay: Mutex<Option<Duration>>,
    calls: Mutex<HashMap<&'static str, usize>>,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            tasks: Mutex::new(Vec::new()),
            next_id: AtomicUsize::new(1),
            valid_token: Mutex::new(TOKEN.to_string()),
            fetch_error: Mutex::new(None),
            rejected_titles: Mutex::new(HashSet::new()),
            reject_deletes: Mutex::new(false),
            writes_until_expiry: Mutex::new(None),
            fetch_delay: Mutex::new(None),
            write_delay: Mutex::new(None),
            calls: Mutex::new(HashMap::new()),
        })
    }

    /// Adds a task as if another client had created it.
    pub fn seed(&self, title: &str) -> Task {
        let remote_id = self.allocate_id();
        let task = Task {
            local_id: remote_id.clone(),
            remote_id: Some(remote_id),
            title: title.to_string(),
            description: String::new(),
            status: Default::default(),
            is_public: false,
        };
        self.tasks.lock().unwrap().push(task.clone());
        task
    }

    pub fn remote_tasks(&self) -> Vec<Task> {
        self.tasks.lock().unwrap().clone()
    }

    pub fn remote_titles(&self) -> Vec<String> {
        let mut titles: Vec<_> = self.remote_tasks().into_iter().map(|t| t.title).collect();
        titles.sort();
        titles
    }

    pub fn calls(&self, name: &str) -> usize {
        self.calls.lock().unwrap().get(name).copied().unwrap_or(0)
    }

    /// Every token issued so far stops working.
    pub fn revoke_tokens(&self) {
        *self.valid_token.lock().unwrap() = "revoked".to_string();
    }

    pub fn expire_after_writes(&self, writes: usize) {
        *self.writes_until_expiry.lock().unwrap() = Some(writes);
    }

    pub fn fail_fetch(&self, error: Option<BackendError>) {
        *self.fetch_error.lock().unwrap() = error;
    }

    pub fn reject_title(&self, title: &str) {
        self.rejected_titles.lock().unwrap().insert(title.to_string());
    }

    pub fn reject_deletes(&self, reject: bool) {
        *self.reject_deletes.lock().unwrap() = reject;
    }

    pub fn set_fetch_delay(&self, delay: Duration) {
        *self.fetch_delay.lock().unwrap() = Some(delay);
    }

    pub fn set_write_delay(&self, delay: Duration) {
        *self.write_delay.lock().unwrap() = Some(delay);
    }

    fn allocate_id(&self) -> String {
        format!("srv-{}", self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    fn record(&self, name: &'static str) {
        *self.calls.lock().unwrap().entry(name).or_default() += 1;
    }

    fn authorize(&self, token: &str) -> Result<(), BackendError> {
        if *self.valid_token.lock().unwrap() == token {
            Ok(())
        } else {
            Err(BackendError::Unauthorized)
        }
    }

    async fn begin_write(&self, name: &'static str, token: &str) -> Result<(), BackendError> {
        self.record(name);
        let delay = *self.write_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        {
            let mut remaining = self.writes_until_expiry.lock().unwrap();
            match *remaining {
                Some(0) => {
                    *remaining = None;
                    self.revoke_tokens();
                }
                Some(n) => *remaining = Some(n - 1),
                None => {}
            }
        }
        self.authorize(token)
    }

    fn check_title(&self, task: &Task) -> Result<(), BackendError> {
        if self.rejected_titles.lock().unwrap().contains(&task.title) {
            return Err(BackendError::Rejected {
                status: 422,
                message: "title rejected".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Backend for FakeBackend {
    fn backend_type(&self) -> &str {
        "fake"
    }

    async fn fetch_tasks(&self, token: &str) -> Result<Vec<Task>, BackendError> {
        self.record("fetch");
        let delay = *self.fetch_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.authorize(token)?;
        if let Some(error) = self.fetch_error.lock().unwrap().clone() {
            return Err(error);
        }
        Ok(self.remote_tasks())
    }

    async fn create_task(&self, task: &Task, token: &str) -> Result<Task, BackendError> {
        self.begin_write("create", token).await?;
        self.check_title(task)?;
        let remote_id = self.allocate_id();
        let created = Task {
            local_id: remote_id.clone(),
            remote_id: Some(remote_id),
            ..task.clone()
        };
        self.tasks.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn update_task(&self, remote_id: &str, task: &Task, token: &str) -> Result<Task, BackendError> {
        self.begin_write("update", token).await?;
        self.check_title(task)?;
        let mut tasks = self.tasks.lock().unwrap();
        let Some(stored) = tasks.iter_mut().find(|t| t.remote_id.as_deref() == Some(remote_id)) else {
            return Err(BackendError::Rejected {
                status: 404,
                message: "Task not found".to_string(),
            });
        };
        *stored = Task {
            local_id: remote_id.to_string(),
            remote_id: Some(remote_id.to_string()),
            ..task.clone()
        };
        Ok(stored.clone())
    }

    async fn delete_task(&self, remote_id: &str, token: &str) -> Result<(), BackendError> {
        self.begin_write("delete", token).await?;
        if *self.reject_deletes.lock().unwrap() {
            return Err(BackendError::Network("connection reset".to_string()));
        }
        self.tasks
            .lock()
            .unwrap()
            .retain(|t| t.remote_id.as_deref() != Some(remote_id));
        Ok(())
    }
}

#[async_trait]
impl AuthBackend for FakeBackend {
    async fn login(&self, _username: &str, password: &str) -> Result<String, BackendError> {
        if password == PASSWORD {
            Ok(self.valid_token.lock().unwrap().clone())
        } else {
            Err(BackendError::Rejected {
                status: 401,
                message: "Invalid credentials".to_string(),
            })
        }
    }

    async fn register(&self, username: &str, _email: &str, _password: &str) -> Result<String, BackendError> {
        Ok(format!("token-{username}"))
    }
}

/// One device: its own store, session, connectivity and sync service.
pub struct Device {
    pub store: Arc<MemoryStore>,
    pub backend: Arc<FakeBackend>,
    pub session: SessionManager,
    pub connectivity: Connectivity,
    pub sync: SyncService,
    pub notifications: UnboundedReceiver<Notification>,
}

impl Device {
    pub async fn new(backend: Arc<FakeBackend>, signed_in: bool, online: bool) -> Self {
        Self::with_store(Arc::new(MemoryStore::default()), backend, signed_in, online).await
    }

    pub async fn with_store(store: Arc<MemoryStore>, backend: Arc<FakeBackend>, signed_in: bool, online: bool) -> Self {
        let session = SessionManager::new(store.clone(), Some(backend.clone()));
        if signed_in {
            session.sign_in(Session::new("alice", TOKEN)).await.unwrap();
        }
        let connectivity = Connectivity::new(online);
        let (notifier, notifications) = ChannelNotifier::new();
        let sync = SyncService::new(
            backend.clone(),
            store.clone(),
            session.clone(),
            connectivity.clone(),
            Arc::new(notifier),
        );
        sync.load().await.unwrap();
        Self {
            store,
            backend,
            session,
            connectivity,
            sync,
            notifications,
        }
    }

    /// Notifications emitted since the last call.
    pub fn take_notifications(&mut self) -> Vec<Notification> {
        let mut taken = Vec::new();
        while let Ok(notification) = self.notifications.try_recv() {
            taken.push(notification);
        }
        taken
    }

    pub fn titles(tasks: &[Task]) -> Vec<String> {
        let mut titles: Vec<_> = tasks.iter().map(|t| t.title.clone()).collect();
        titles.sort();
        titles
    }
}
