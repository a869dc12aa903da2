use std::sync::Arc;
use tracing::{info, warn};

use crate::client::Backend;
use crate::editor::TodoDraft;
use crate::highlight::{contains_snippet, highlight, Segment};
use crate::models::{ItemKind, NoteChanges, NoteView, TodoChanges, TodoList};
use crate::selection::{BulkDeleteReport, PressOutcome, SelectionController};

/// State of one mounted list screen: the active collection, the fetched
/// items, the search query and the selection.
///
/// Backend failures are logged and leave the local state untouched; the next
/// refresh reconciles with the server.
pub struct ListView<B: Backend> {
    backend: Arc<B>,
    kind: ItemKind,
    notes: Vec<NoteView>,
    todos: Vec<TodoList>,
    search_query: String,
    selection: SelectionController,
}

/// Newest first, important notes ahead of the rest.
pub fn sort_notes(notes: &mut [NoteView]) {
    notes.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
    notes.sort_by_key(|n| !n.important());
}

pub fn sort_todos(todos: &mut [TodoList]) {
    todos.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

fn note_matches(note: &NoteView, query: &str) -> bool {
    match note {
        NoteView::Full(note) => {
            contains_snippet(&note.title, query) || contains_snippet(&note.content, query)
        }
        // Redacted content must not leak through search
        NoteView::Locked(_) => query.is_empty(),
    }
}

fn todo_matches(todo: &TodoList, query: &str) -> bool {
    contains_snippet(&todo.title, query) || todo.tasks.iter().any(|t| contains_snippet(&t.text, query))
}

impl<B: Backend> ListView<B> {
    pub fn new(backend: Arc<B>, kind: ItemKind) -> Self {
        Self {
            backend,
            kind,
            notes: Vec::new(),
            todos: Vec::new(),
            search_query: String::new(),
            selection: SelectionController::new(),
        }
    }

    pub fn kind(&self) -> ItemKind {
        self.kind
    }

    /// Switch the active collection. The selection belongs to the previous
    /// collection and is discarded along with its pending presses.
    pub async fn switch_kind(&mut self, kind: ItemKind) {
        if kind == self.kind {
            return;
        }
        self.kind = kind;
        self.selection = SelectionController::new();
        self.refresh().await;
    }

    /// Re-fetch the active collection.
    pub async fn refresh(&mut self) {
        match self.kind {
            ItemKind::Notes => match self.backend.list_notes().await {
                Ok(mut notes) => {
                    sort_notes(&mut notes);
                    self.notes = notes;
                }
                Err(e) => warn!("failed to refresh notes: {}", e),
            },
            ItemKind::Todos => match self.backend.list_todos().await {
                Ok(mut todos) => {
                    sort_todos(&mut todos);
                    self.todos = todos;
                }
                Err(e) => warn!("failed to refresh todos: {}", e),
            },
        }
    }

    pub fn notes(&self) -> &[NoteView] {
        &self.notes
    }

    pub fn todos(&self) -> &[TodoList] {
        &self.todos
    }

    // ---- Search ----

    pub fn search_query(&self) -> &str {
        &self.search_query
    }

    pub fn set_search_query(&mut self, query: impl Into<String>) {
        self.search_query = query.into();
    }

    /// Highlight `text` against the current search query.
    pub fn highlight<'a>(&self, text: &'a str) -> Vec<Segment<'a>> {
        highlight(text, &self.search_query)
    }

    pub fn visible_notes(&self) -> Vec<&NoteView> {
        self.notes
            .iter()
            .filter(|n| note_matches(n, &self.search_query))
            .collect()
    }

    pub fn visible_todos(&self) -> Vec<&TodoList> {
        self.todos
            .iter()
            .filter(|t| todo_matches(t, &self.search_query))
            .collect()
    }

    pub fn visible_ids(&self) -> Vec<i64> {
        match self.kind {
            ItemKind::Notes => self.visible_notes().iter().map(|n| n.id()).collect(),
            ItemKind::Todos => self.visible_todos().iter().map(|t| t.id).collect(),
        }
    }

    // ---- Selection ----

    pub fn selection(&self) -> &SelectionController {
        &self.selection
    }

    pub fn begin_press(&mut self, id: i64) {
        self.selection.begin_press(id);
    }

    pub fn end_press(&mut self, id: i64) -> PressOutcome {
        self.selection.end_press(id)
    }

    pub fn toggle_selection(&self, id: i64, checked: bool) {
        self.selection.toggle(id, checked);
    }

    pub fn select_all_visible(&self) {
        self.selection.select_all(self.visible_ids());
    }

    pub fn close_selection(&self) {
        self.selection.clear();
    }

    /// Delete every selected item, then reload the list.
    pub async fn delete_selected(&mut self) -> BulkDeleteReport {
        let report = self
            .selection
            .delete_selected(self.backend.as_ref(), self.kind)
            .await;
        info!(
            kind = %self.kind,
            requested = report.requested(),
            deleted = report.deleted.len(),
            failed = report.failed.len(),
            "bulk delete finished"
        );
        self.refresh().await;
        report
    }

    /// Single-item delete from a card's trash button, which only exists
    /// outside selection mode.
    pub async fn delete_one(&mut self, id: i64) -> bool {
        if !self.selection.is_idle() {
            return false;
        }
        if let Err(e) = self.backend.delete_item(self.kind, id).await {
            warn!(kind = %self.kind, id, "failed to delete item: {}", e);
            return false;
        }
        self.refresh().await;
        true
    }

    // ---- Mutations ----

    /// Create an empty note and return its id for navigation.
    pub async fn create_note(&mut self) -> Option<i64> {
        let changes = NoteChanges {
            content: Some(String::new()),
            ..Default::default()
        };
        match self.backend.create_note(&changes).await {
            Ok(note) => Some(note.id),
            Err(e) => {
                warn!("failed to create note: {}", e);
                None
            }
        }
    }

    pub async fn create_todo(&mut self, draft: TodoDraft) -> Option<i64> {
        match self.backend.create_todo(&draft.into_new_todo()).await {
            Ok(todo) => {
                self.refresh().await;
                Some(todo.id)
            }
            Err(e) => {
                warn!("failed to create todo list: {}", e);
                None
            }
        }
    }

    /// Save an edited todo list. Local state changes only once the server
    /// accepted the change.
    pub async fn save_todo(&mut self, id: i64, draft: TodoDraft) -> bool {
        match self.backend.update_todo(id, &draft.into_changes()).await {
            Ok(updated) => {
                self.replace_todo(updated);
                true
            }
            Err(e) => {
                warn!(id, "failed to save todo list: {}", e);
                false
            }
        }
    }

    /// Check or uncheck one task of a todo list.
    pub async fn toggle_task(&mut self, todo_id: i64, index: usize, checked: bool) -> bool {
        let Some(todo) = self.todos.iter().find(|t| t.id == todo_id) else {
            return false;
        };
        if index >= todo.tasks.len() {
            return false;
        }

        let mut tasks = todo.tasks.clone();
        tasks[index].checked = checked;
        let changes = TodoChanges {
            tasks: Some(tasks),
            title: None,
        };

        match self.backend.update_todo(todo_id, &changes).await {
            Ok(updated) => {
                self.replace_todo(updated);
                true
            }
            Err(e) => {
                warn!(todo_id, index, "failed to toggle task: {}", e);
                false
            }
        }
    }

    fn replace_todo(&mut self, updated: TodoList) {
        if let Some(slot) = self.todos.iter_mut().find(|t| t.id == updated.id) {
            *slot = updated;
        }
    }
}
