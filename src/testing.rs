//! In-memory `Backend` used by the client-core tests.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::client::{Backend, ClientError, ClientResult};
use crate::models::{ItemKind, NewTodo, Note, NoteChanges, NoteView, TodoChanges, TodoList};

/// Let spawned tasks woken by a clock advance run to completion.
pub async fn settle() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}

pub fn at(minutes: i64) -> DateTime<Utc> {
    let base: DateTime<Utc> = "2024-01-01T00:00:00Z".parse().expect("valid timestamp");
    base + Duration::minutes(minutes)
}

pub fn note(id: i64, title: &str, content: &str, minutes: i64) -> Note {
    Note {
        id,
        title: title.to_string(),
        content: content.to_string(),
        created_at: at(minutes),
        important: false,
        reminder: None,
    }
}

#[derive(Default)]
pub struct MockBackend {
    pub notes: Mutex<Vec<NoteView>>,
    pub todos: Mutex<Vec<TodoList>>,
    /// Password for `get_note`; `None` means every note is readable
    pub password: Option<String>,
    pub failing: HashSet<i64>,
    pub deletes: Mutex<Vec<(ItemKind, i64)>>,
    pub note_updates: Mutex<Vec<(i64, NoteChanges)>>,
    pub todo_updates: Mutex<Vec<(i64, TodoChanges)>>,
    pub list_calls: AtomicUsize,
    pub in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl MockBackend {
    pub fn failing_on(ids: impl IntoIterator<Item = i64>) -> Self {
        Self {
            failing: ids.into_iter().collect(),
            ..Default::default()
        }
    }

    pub fn with_notes(notes: Vec<NoteView>) -> Self {
        Self {
            notes: Mutex::new(notes),
            ..Default::default()
        }
    }

    pub fn with_todos(todos: Vec<TodoList>) -> Self {
        Self {
            todos: Mutex::new(todos),
            ..Default::default()
        }
    }

    pub fn deletes(&self) -> Vec<(ItemKind, i64)> {
        self.deletes.lock().unwrap().clone()
    }

    pub fn note_updates(&self) -> Vec<(i64, NoteChanges)> {
        self.note_updates.lock().unwrap().clone()
    }

    pub fn todo_updates(&self) -> Vec<(i64, TodoChanges)> {
        self.todo_updates.lock().unwrap().clone()
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn check(&self, id: i64) -> ClientResult<()> {
        if self.failing.contains(&id) {
            Err(ClientError::Status(400))
        } else {
            Ok(())
        }
    }
}

impl Backend for MockBackend {
    async fn list_notes(&self) -> ClientResult<Vec<NoteView>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.notes.lock().unwrap().clone())
    }

    async fn get_note(&self, id: i64, password: Option<&str>) -> ClientResult<NoteView> {
        self.check(id)?;
        if let (Some(expected), Some(supplied)) = (self.password.as_deref(), password) {
            if expected != supplied {
                return Err(ClientError::IncorrectPassword);
            }
        }
        self.notes
            .lock()
            .unwrap()
            .iter()
            .find(|n| n.id() == id)
            .cloned()
            .ok_or(ClientError::NotFound)
    }

    async fn create_note(&self, changes: &NoteChanges) -> ClientResult<Note> {
        let mut notes = self.notes.lock().unwrap();
        let id = notes.iter().map(|n| n.id()).max().unwrap_or(0) + 1;
        let created = Note {
            id,
            title: changes.title.clone().unwrap_or_default(),
            content: changes.content.clone().unwrap_or_default(),
            created_at: at(id),
            important: changes.important.unwrap_or(false),
            reminder: changes.reminder,
        };
        notes.push(NoteView::Full(created.clone()));
        Ok(created)
    }

    async fn update_note(&self, id: i64, changes: &NoteChanges) -> ClientResult<Note> {
        self.check(id)?;
        self.note_updates.lock().unwrap().push((id, changes.clone()));
        let mut notes = self.notes.lock().unwrap();
        let slot = notes
            .iter_mut()
            .find(|n| n.id() == id)
            .ok_or(ClientError::NotFound)?;
        let NoteView::Full(note) = slot else {
            return Err(ClientError::IncorrectPassword);
        };
        if let Some(title) = &changes.title {
            note.title = title.clone();
        }
        if let Some(content) = &changes.content {
            note.content = content.clone();
        }
        if let Some(important) = changes.important {
            note.important = important;
        }
        if changes.reminder.is_some() {
            note.reminder = changes.reminder;
        }
        Ok(note.clone())
    }

    async fn list_todos(&self) -> ClientResult<Vec<TodoList>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.todos.lock().unwrap().clone())
    }

    async fn create_todo(&self, todo: &NewTodo) -> ClientResult<TodoList> {
        let mut todos = self.todos.lock().unwrap();
        let id = todos.iter().map(|t| t.id).max().unwrap_or(0) + 1;
        let created = TodoList {
            id,
            title: todo.title.clone().unwrap_or_default(),
            tasks: todo.tasks.clone(),
            created_at: at(id),
        };
        todos.push(created.clone());
        Ok(created)
    }

    async fn update_todo(&self, id: i64, changes: &TodoChanges) -> ClientResult<TodoList> {
        self.check(id)?;
        self.todo_updates.lock().unwrap().push((id, changes.clone()));
        let mut todos = self.todos.lock().unwrap();
        let todo = todos
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(ClientError::NotFound)?;
        if let Some(tasks) = &changes.tasks {
            todo.tasks = tasks.clone();
        }
        if let Some(title) = &changes.title {
            todo.title = title.clone();
        }
        Ok(todo.clone())
    }

    async fn delete_note(&self, id: i64) -> ClientResult<()> {
        self.delete(ItemKind::Notes, id).await
    }

    async fn delete_todo(&self, id: i64) -> ClientResult<()> {
        self.delete(ItemKind::Todos, id).await
    }
}

impl MockBackend {
    async fn delete(&self, kind: ItemKind, id: i64) -> ClientResult<()> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::task::yield_now().await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        self.deletes.lock().unwrap().push((kind, id));
        self.check(id)?;
        match kind {
            ItemKind::Notes => self.notes.lock().unwrap().retain(|n| n.id() != id),
            ItemKind::Todos => self.todos.lock().unwrap().retain(|t| t.id != id),
        }
        Ok(())
    }
}
