//! REST backend implementation.
//!
//! Talks JSON over HTTP to the task service:
//! `GET /tasks`, `POST /tasks`, `PATCH /tasks/{id}`, `DELETE /tasks/{id}` with a
//! bearer token, plus `POST /users/login` and `POST /users/register`.

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{AuthBackend, Backend, BackendError};
use crate::task::{Task, TaskStatus};

/// Wire representation of a task.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiTask {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub category: String,
    #[serde(rename = "isPublic", default)]
    pub is_public: bool,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Map a local status to the service's category slug.
pub fn status_to_category(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::ToDo => "to-do",
        TaskStatus::InProgress => "in-progress",
        TaskStatus::Completed => "completed",
        TaskStatus::WontDo => "wont-do",
    }
}

/// Map a category slug back to a status. Unknown slugs fall back to to-do,
/// and the `completed` flag always wins.
pub fn category_to_status(category: &str, completed: bool) -> TaskStatus {
    if completed {
        return TaskStatus::Completed;
    }
    match category {
        "in-progress" => TaskStatus::InProgress,
        "completed" => TaskStatus::Completed,
        "wont-do" => TaskStatus::WontDo,
        _ => TaskStatus::ToDo,
    }
}

impl From<&Task> for ApiTask {
    fn from(task: &Task) -> Self {
        Self {
            id: None,
            title: task.title.clone(),
            description: task.description.clone(),
            completed: task.status == TaskStatus::Completed,
            category: status_to_category(task.status).to_string(),
            is_public: task.is_public,
        }
    }
}

impl TryFrom<ApiTask> for Task {
    type Error = BackendError;

    fn try_from(api_task: ApiTask) -> Result<Self, Self::Error> {
        let remote_id = api_task
            .id
            .ok_or_else(|| BackendError::InvalidData(format!("task '{}' has no _id", api_task.title)))?;
        Ok(Task {
            local_id: remote_id.clone(),
            remote_id: Some(remote_id),
            title: api_task.title,
            description: api_task.description,
            status: category_to_status(&api_task.category, api_task.completed),
            is_public: api_task.is_public,
        })
    }
}

/// HTTP client for the task service.
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    /// Create a backend for `base_url` whose requests time out after `timeout`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, BackendError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder, token: &str) -> RequestBuilder {
        request.bearer_auth(token)
    }

    /// Turn a non-success response into the matching error.
    async fn check(response: Response) -> Result<Response, BackendError> {
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(BackendError::Unauthorized);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Rejected {
                status: status.as_u16(),
                message: error_message(&body, status),
            });
        }
        Ok(response)
    }

    async fn request_token(&self, path: &str, body: serde_json::Value, fallback: &str) -> Result<String, BackendError> {
        let response = self.client.post(self.url(path)).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&text)
                .ok()
                .and_then(|b| b.message)
                .unwrap_or_else(|| fallback.to_string());
            return Err(BackendError::Rejected {
                status: status.as_u16(),
                message,
            });
        }
        let token: TokenResponse = response.json().await?;
        Ok(token.access_token)
    }
}

fn error_message(body: &str, status: StatusCode) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string())
}

#[async_trait]
impl Backend for HttpBackend {
    fn backend_type(&self) -> &str {
        "rest"
    }

    async fn fetch_tasks(&self, token: &str) -> Result<Vec<Task>, BackendError> {
        let response = self.authorized(self.client.get(self.url("/tasks")), token).send().await?;
        let api_tasks: Vec<ApiTask> = Self::check(response).await?.json().await?;
        debug!("Fetched {} tasks from {}", api_tasks.len(), self.base_url);

        let mut tasks = Vec::with_capacity(api_tasks.len());
        for api_task in api_tasks {
            match Task::try_from(api_task) {
                Ok(task) => tasks.push(task),
                Err(e) => warn!("⚠️  Skipping remote task: {e}"),
            }
        }
        Ok(tasks)
    }

    async fn create_task(&self, task: &Task, token: &str) -> Result<Task, BackendError> {
        let response = self
            .authorized(self.client.post(self.url("/tasks")), token)
            .json(&ApiTask::from(task))
            .send()
            .await?;
        let created: ApiTask = Self::check(response).await?.json().await?;
        Task::try_from(created)
    }

    async fn update_task(&self, remote_id: &str, task: &Task, token: &str) -> Result<Task, BackendError> {
        let response = self
            .authorized(self.client.patch(self.url(&format!("/tasks/{remote_id}"))), token)
            .json(&ApiTask::from(task))
            .send()
            .await?;
        let updated: ApiTask = Self::check(response).await?.json().await?;
        Task::try_from(updated)
    }

    async fn delete_task(&self, remote_id: &str, token: &str) -> Result<(), BackendError> {
        let response = self
            .authorized(self.client.delete(self.url(&format!("/tasks/{remote_id}"))), token)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn ping(&self) -> Result<(), BackendError> {
        // Any HTTP answer means the service is reachable.
        self.client.get(self.url("/")).send().await?;
        Ok(())
    }
}

#[async_trait]
impl AuthBackend for HttpBackend {
    async fn login(&self, username: &str, password: &str) -> Result<String, BackendError> {
        self.request_token(
            "/users/login",
            serde_json::json!({ "username": username, "password": password }),
            "Failed to login",
        )
        .await
    }

    async fn register(&self, username: &str, email: &str, password: &str) -> Result<String, BackendError> {
        self.request_token(
            "/users/register",
            serde_json::json!({ "username": username, "email": email, "password": password }),
            "Failed to register",
        )
        .await
    }
}
