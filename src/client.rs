use reqwest::{header::AUTHORIZATION, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::future::Future;
use tracing::debug;

use crate::models::{ItemKind, NewTodo, Note, NoteChanges, NoteView, TodoChanges, TodoList};

// ── Errors ─────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Incorrect password")]
    IncorrectPassword,
    #[error("not found")]
    NotFound,
    #[error("server responded with status {0}")]
    Status(u16),
    #[error("The Confirm Password does not match")]
    PasswordMismatch,
}

pub type ClientResult<T> = Result<T, ClientError>;

// ── Backend surface ────────────────────────────────────────────────────────

/// The CRUD surface of the notes server as seen by the client core.
pub trait Backend: Sync {
    fn list_notes(&self) -> impl Future<Output = ClientResult<Vec<NoteView>>> + Send;

    /// Fetch one note. `password` is sent as the `Authorization` header.
    fn get_note(
        &self,
        id: i64,
        password: Option<&str>,
    ) -> impl Future<Output = ClientResult<NoteView>> + Send;

    fn create_note(&self, changes: &NoteChanges) -> impl Future<Output = ClientResult<Note>> + Send;

    fn update_note(
        &self,
        id: i64,
        changes: &NoteChanges,
    ) -> impl Future<Output = ClientResult<Note>> + Send;

    fn list_todos(&self) -> impl Future<Output = ClientResult<Vec<TodoList>>> + Send;

    fn create_todo(&self, todo: &NewTodo) -> impl Future<Output = ClientResult<TodoList>> + Send;

    fn update_todo(
        &self,
        id: i64,
        changes: &TodoChanges,
    ) -> impl Future<Output = ClientResult<TodoList>> + Send;

    fn delete_note(&self, id: i64) -> impl Future<Output = ClientResult<()>> + Send;

    fn delete_todo(&self, id: i64) -> impl Future<Output = ClientResult<()>> + Send;

    /// Delete one item from the given collection.
    fn delete_item(&self, kind: ItemKind, id: i64) -> impl Future<Output = ClientResult<()>> + Send {
        async move {
            match kind {
                ItemKind::Notes => self.delete_note(id).await,
                ItemKind::Todos => self.delete_todo(id).await,
            }
        }
    }
}

// ── HTTP implementation ────────────────────────────────────────────────────

/// `reqwest`-based client for the notes server.
#[derive(Debug, Clone)]
pub struct NotesClient {
    http: reqwest::Client,
    base_url: String,
}

impl NotesClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http.request(method, format!("{}{}", self.base_url, path))
    }

    async fn delete(&self, kind: ItemKind, id: i64) -> ClientResult<()> {
        let _: serde_json::Value = self
            .send(self.request(Method::DELETE, &format!("/{}/{}", kind, id)))
            .await?;
        Ok(())
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> ClientResult<T> {
        let response = builder.send().await?;
        let status = response.status();
        debug!(url = %response.url(), status = status.as_u16(), "response");
        match status {
            StatusCode::FORBIDDEN => Err(ClientError::IncorrectPassword),
            StatusCode::NOT_FOUND => Err(ClientError::NotFound),
            s if s.is_success() => Ok(response.json::<T>().await?),
            s => Err(ClientError::Status(s.as_u16())),
        }
    }
}

impl Backend for NotesClient {
    async fn list_notes(&self) -> ClientResult<Vec<NoteView>> {
        self.send(self.request(Method::GET, "/notes")).await
    }

    async fn get_note(&self, id: i64, password: Option<&str>) -> ClientResult<NoteView> {
        let mut builder = self.request(Method::GET, &format!("/notes/{}", id));
        if let Some(password) = password {
            builder = builder.header(AUTHORIZATION, password);
        }
        self.send(builder).await
    }

    async fn create_note(&self, changes: &NoteChanges) -> ClientResult<Note> {
        self.send(self.request(Method::POST, "/notes").json(changes))
            .await
    }

    async fn update_note(&self, id: i64, changes: &NoteChanges) -> ClientResult<Note> {
        self.send(
            self.request(Method::PATCH, &format!("/notes/{}", id))
                .json(changes),
        )
        .await
    }

    async fn list_todos(&self) -> ClientResult<Vec<TodoList>> {
        self.send(self.request(Method::GET, "/todos")).await
    }

    async fn create_todo(&self, todo: &NewTodo) -> ClientResult<TodoList> {
        self.send(self.request(Method::POST, "/todos").json(todo)).await
    }

    async fn update_todo(&self, id: i64, changes: &TodoChanges) -> ClientResult<TodoList> {
        self.send(
            self.request(Method::PATCH, &format!("/todos/{}", id))
                .json(changes),
        )
        .await
    }

    async fn delete_note(&self, id: i64) -> ClientResult<()> {
        self.delete(ItemKind::Notes, id).await
    }

    async fn delete_todo(&self, id: i64) -> ClientResult<()> {
        self.delete(ItemKind::Todos, id).await
    }
}
