use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::warn;

use crate::client::{Backend, ClientError, ClientResult};
use crate::models::{ItemKind, NewTodo, Note, NoteChanges, NoteView, Task, TodoChanges, TodoList};

// ── Note editor ────────────────────────────────────────────────────────────

/// Editing session for a single note page.
///
/// Keeps the last saved version next to the working copy so the page can tell
/// whether there is anything to save.
pub struct NoteEditor<B: Backend> {
    backend: Arc<B>,
    saved: NoteView,
    current: NoteView,
    incorrect_password: bool,
}

impl<B: Backend> NoteEditor<B> {
    /// Load note `id` without a password. Protected notes open locked.
    pub async fn open(backend: Arc<B>, id: i64) -> ClientResult<Self> {
        let view = backend.get_note(id, None).await?;
        Ok(Self::from_view(backend, view))
    }

    pub fn from_view(backend: Arc<B>, view: NoteView) -> Self {
        Self {
            backend,
            saved: view.clone(),
            current: view,
            incorrect_password: false,
        }
    }

    pub fn id(&self) -> i64 {
        self.current.id()
    }

    pub fn is_locked(&self) -> bool {
        self.current.is_locked()
    }

    pub fn note(&self) -> Option<&Note> {
        self.current.as_full()
    }

    /// Set after a rejected unlock attempt, cleared when the password input
    /// changes or an unlock succeeds.
    pub fn incorrect_password(&self) -> bool {
        self.incorrect_password
    }

    pub fn clear_password_error(&mut self) {
        self.incorrect_password = false;
    }

    pub fn is_dirty(&self) -> bool {
        self.saved != self.current
    }

    fn edit(&mut self, apply: impl FnOnce(&mut Note)) {
        if let NoteView::Full(note) = &mut self.current {
            apply(note);
        }
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        let title = title.into();
        self.edit(|note| note.title = title);
    }

    pub fn set_content(&mut self, content: impl Into<String>) {
        let content = content.into();
        self.edit(|note| note.content = content);
    }

    pub fn toggle_important(&mut self) {
        self.edit(|note| note.important = !note.important);
    }

    pub fn set_reminder(&mut self, reminder: Option<DateTime<Utc>>) {
        self.edit(|note| note.reminder = reminder);
    }

    /// Retry the fetch with `password`. Returns whether the note is now open.
    pub async fn unlock(&mut self, password: &str) -> bool {
        match self.backend.get_note(self.id(), Some(password)).await {
            Ok(view) => {
                self.incorrect_password = false;
                self.saved = view.clone();
                self.current = view;
                !self.is_locked()
            }
            Err(ClientError::IncorrectPassword) => {
                self.incorrect_password = true;
                false
            }
            Err(e) => {
                warn!(id = self.id(), "failed to unlock note: {}", e);
                false
            }
        }
    }

    /// Push the working copy to the server. The saved version becomes what
    /// the server returned, so a change it did not apply (clearing the
    /// reminder) keeps the editor dirty.
    pub async fn save(&mut self) -> bool {
        let Some(note) = self.current.as_full() else {
            return false;
        };
        if !self.is_dirty() {
            return true;
        }

        match self.backend.update_note(note.id, &NoteChanges::from(note)).await {
            Ok(stored) => {
                self.saved = NoteView::Full(stored);
                true
            }
            Err(e) => {
                warn!(id = note.id, "failed to update note: {}", e);
                false
            }
        }
    }

    /// Set a new password. Both entries must be identical.
    pub async fn change_password(&mut self, password: &str, confirm: &str) -> ClientResult<()> {
        if password != confirm {
            return Err(ClientError::PasswordMismatch);
        }
        let changes = NoteChanges {
            password: Some(password.to_string()),
            ..Default::default()
        };
        self.backend.update_note(self.id(), &changes).await.map_err(|e| {
            warn!(id = self.id(), "failed to change password: {}", e);
            e
        })?;
        Ok(())
    }

    pub async fn delete(self) -> bool {
        match self.backend.delete_item(ItemKind::Notes, self.id()).await {
            Ok(()) => true,
            Err(e) => {
                warn!(id = self.id(), "failed to delete note: {}", e);
                false
            }
        }
    }

    /// Leave the page. A note whose saved title and content are both empty is
    /// discarded. Returns whether it was deleted.
    pub async fn close(self) -> bool {
        let empty = match &self.saved {
            NoteView::Full(note) => note.title.is_empty() && note.content.is_empty(),
            NoteView::Locked(_) => false,
        };
        if empty {
            self.delete().await
        } else {
            false
        }
    }
}

// ── Todo draft ─────────────────────────────────────────────────────────────

/// Working copy of a todo list inside the edit modal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodoDraft {
    pub title: String,
    pub tasks: Vec<Task>,
}

impl Default for TodoDraft {
    fn default() -> Self {
        Self::new()
    }
}

impl TodoDraft {
    /// A fresh draft starts with one empty task.
    pub fn new() -> Self {
        Self {
            title: String::new(),
            tasks: vec![Task::new("")],
        }
    }

    pub fn from_list(todo: &TodoList) -> Self {
        Self {
            title: todo.title.clone(),
            tasks: todo.tasks.clone(),
        }
    }

    /// Append an empty task and return its index.
    pub fn add_task(&mut self) -> usize {
        self.tasks.push(Task::new(""));
        self.tasks.len() - 1
    }

    /// Insert an empty task right after `index` (Enter key) and return the
    /// new index.
    pub fn insert_after(&mut self, index: usize) -> usize {
        let at = (index + 1).min(self.tasks.len());
        self.tasks.insert(at, Task::new(""));
        at
    }

    pub fn remove_task(&mut self, index: usize) -> Option<Task> {
        (index < self.tasks.len()).then(|| self.tasks.remove(index))
    }

    /// Backspace on an empty task removes it. Returns the index that should
    /// receive focus next.
    pub fn backspace(&mut self, index: usize) -> Option<usize> {
        let empty = self.tasks.get(index).is_some_and(|t| t.text.is_empty());
        if !empty {
            return None;
        }
        self.tasks.remove(index);
        Some(index.saturating_sub(1))
    }

    pub fn set_text(&mut self, index: usize, text: impl Into<String>) {
        if let Some(task) = self.tasks.get_mut(index) {
            task.text = text.into();
        }
    }

    pub fn into_new_todo(self) -> NewTodo {
        NewTodo {
            tasks: self.tasks,
            title: Some(self.title),
        }
    }

    pub fn into_changes(self) -> TodoChanges {
        TodoChanges {
            tasks: Some(self.tasks),
            title: Some(self.title),
        }
    }
}
