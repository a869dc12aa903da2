use chrono::Utc;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::debug;

use crate::models::{NewTodo, Note, NoteChanges, Task, TodoChanges, TodoList};

// ---- Errors ----

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Failed to encode tasks: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Failed to create database directory '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub type StoreResult<T> = Result<T, StoreError>;

// ---- Schema ----

/// Schema statements, applied in order on every open.
const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS notes (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        title       TEXT    NOT NULL DEFAULT '',
        content     TEXT    NOT NULL DEFAULT '',
        password    TEXT    NOT NULL DEFAULT '',
        created_at  TEXT    NOT NULL,
        important   INTEGER NOT NULL DEFAULT 0,
        reminder    TEXT
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS todos (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        title       TEXT    NOT NULL DEFAULT '',
        tasks       TEXT    NOT NULL DEFAULT '[]',
        created_at  TEXT    NOT NULL
    );
    "#,
];

const NOTE_COLUMNS: &str = "id, title, content, password, created_at, important, reminder";
const TODO_COLUMNS: &str = "id, title, tasks, created_at";

// ---- Row Types ----

/// A stored note together with its password. An empty password means the
/// note is not protected.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteRecord {
    pub note: Note,
    pub password: String,
}

impl NoteRecord {
    pub fn is_protected(&self) -> bool {
        !self.password.is_empty()
    }
}

fn note_from_row(row: &Row<'_>) -> rusqlite::Result<NoteRecord> {
    Ok(NoteRecord {
        note: Note {
            id: row.get(0)?,
            title: row.get(1)?,
            content: row.get(2)?,
            created_at: row.get(4)?,
            important: row.get(5)?,
            reminder: row.get(6)?,
        },
        password: row.get(3)?,
    })
}

fn todo_from_row(row: &Row<'_>) -> rusqlite::Result<TodoList> {
    let raw_tasks: String = row.get(2)?;
    let tasks: Vec<Task> = serde_json::from_str(&raw_tasks)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e)))?;
    Ok(TodoList {
        id: row.get(0)?,
        title: row.get(1)?,
        tasks,
        created_at: row.get(3)?,
    })
}

fn log_query(sql: &str, started: Instant, rows: usize) {
    debug!(
        text = sql.trim(),
        duration_ms = started.elapsed().as_millis() as u64,
        rows,
        "executed query"
    );
}

// ---- Store ----

/// SQLite-backed persistence for notes and todo lists.
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open (or create) the database file at `path` and apply the schema.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| StoreError::Io {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
            }
        }

        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    /// In-memory database, used by tests.
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    fn migrate(&self) -> StoreResult<()> {
        for statement in MIGRATIONS {
            let started = Instant::now();
            self.conn.execute_batch(statement)?;
            log_query(statement, started, 0);
        }
        Ok(())
    }

    // ---- Notes ----

    pub fn list_notes(&self) -> StoreResult<Vec<NoteRecord>> {
        let sql = format!("SELECT {} FROM notes ORDER BY id", NOTE_COLUMNS);
        let started = Instant::now();
        let mut stmt = self.conn.prepare(&sql)?;
        let notes = stmt
            .query_map([], note_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        log_query(&sql, started, notes.len());
        Ok(notes)
    }

    pub fn get_note(&self, id: i64) -> StoreResult<Option<NoteRecord>> {
        let sql = format!("SELECT {} FROM notes WHERE id = ?1", NOTE_COLUMNS);
        let started = Instant::now();
        let note = self
            .conn
            .query_row(&sql, params![id], note_from_row)
            .optional()?;
        log_query(&sql, started, usize::from(note.is_some()));
        Ok(note)
    }

    /// Insert a note, filling absent fields with their defaults.
    pub fn create_note(&self, changes: &NoteChanges) -> StoreResult<NoteRecord> {
        let sql = format!(
            "INSERT INTO notes (title, content, created_at, important, password, reminder)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             RETURNING {}",
            NOTE_COLUMNS
        );
        let started = Instant::now();
        let note = self.conn.query_row(
            &sql,
            params![
                changes.title.as_deref().unwrap_or(""),
                changes.content.as_deref().unwrap_or(""),
                Utc::now(),
                changes.important.unwrap_or(false),
                changes.password.as_deref().unwrap_or(""),
                changes.reminder,
            ],
            note_from_row,
        )?;
        log_query(&sql, started, 1);
        Ok(note)
    }

    /// Merge `changes` into the stored note. Returns `None` when the note does
    /// not exist. A missing reminder keeps the stored one.
    pub fn update_note(&mut self, id: i64, changes: &NoteChanges) -> StoreResult<Option<NoteRecord>> {
        let tx = self.conn.transaction()?;

        let select = format!("SELECT {} FROM notes WHERE id = ?1", NOTE_COLUMNS);
        let started = Instant::now();
        let previous = tx.query_row(&select, params![id], note_from_row).optional()?;
        log_query(&select, started, usize::from(previous.is_some()));

        let Some(previous) = previous else {
            return Ok(None);
        };

        let update = format!(
            "UPDATE notes
             SET title = ?1, content = ?2, important = ?3, password = ?4, reminder = ?5
             WHERE id = ?6
             RETURNING {}",
            NOTE_COLUMNS
        );
        let started = Instant::now();
        let updated = tx.query_row(
            &update,
            params![
                changes.title.as_deref().unwrap_or(&previous.note.title),
                changes.content.as_deref().unwrap_or(&previous.note.content),
                changes.important.unwrap_or(previous.note.important),
                changes.password.as_deref().unwrap_or(&previous.password),
                changes.reminder.or(previous.note.reminder),
                id,
            ],
            note_from_row,
        )?;
        log_query(&update, started, 1);

        tx.commit()?;
        Ok(Some(updated))
    }

    /// Delete a note. Returns the number of rows removed (0 or 1).
    pub fn delete_note(&self, id: i64) -> StoreResult<usize> {
        let sql = "DELETE FROM notes WHERE id = ?1";
        let started = Instant::now();
        let removed = self.conn.execute(sql, params![id])?;
        log_query(sql, started, removed);
        Ok(removed)
    }

    // ---- Todos ----

    pub fn list_todos(&self) -> StoreResult<Vec<TodoList>> {
        let sql = format!("SELECT {} FROM todos ORDER BY id", TODO_COLUMNS);
        let started = Instant::now();
        let mut stmt = self.conn.prepare(&sql)?;
        let todos = stmt
            .query_map([], todo_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        log_query(&sql, started, todos.len());
        Ok(todos)
    }

    pub fn get_todo(&self, id: i64) -> StoreResult<Option<TodoList>> {
        let sql = format!("SELECT {} FROM todos WHERE id = ?1", TODO_COLUMNS);
        let started = Instant::now();
        let todo = self
            .conn
            .query_row(&sql, params![id], todo_from_row)
            .optional()?;
        log_query(&sql, started, usize::from(todo.is_some()));
        Ok(todo)
    }

    pub fn create_todo(&self, todo: &NewTodo) -> StoreResult<TodoList> {
        let sql = format!(
            "INSERT INTO todos (tasks, title, created_at)
             VALUES (?1, ?2, ?3)
             RETURNING {}",
            TODO_COLUMNS
        );
        let tasks = serde_json::to_string(&todo.tasks)?;
        let started = Instant::now();
        let created = self.conn.query_row(
            &sql,
            params![tasks, todo.title.as_deref().unwrap_or(""), Utc::now()],
            todo_from_row,
        )?;
        log_query(&sql, started, 1);
        Ok(created)
    }

    /// Merge `changes` into the stored todo list. Returns `None` when the list
    /// does not exist.
    pub fn update_todo(&mut self, id: i64, changes: &TodoChanges) -> StoreResult<Option<TodoList>> {
        let tx = self.conn.transaction()?;

        let select = format!("SELECT {} FROM todos WHERE id = ?1", TODO_COLUMNS);
        let started = Instant::now();
        let previous = tx.query_row(&select, params![id], todo_from_row).optional()?;
        log_query(&select, started, usize::from(previous.is_some()));

        let Some(previous) = previous else {
            return Ok(None);
        };

        let tasks = serde_json::to_string(changes.tasks.as_ref().unwrap_or(&previous.tasks))?;
        let update = format!(
            "UPDATE todos SET tasks = ?1, title = ?2 WHERE id = ?3 RETURNING {}",
            TODO_COLUMNS
        );
        let started = Instant::now();
        let updated = tx.query_row(
            &update,
            params![tasks, changes.title.as_deref().unwrap_or(&previous.title), id],
            todo_from_row,
        )?;
        log_query(&update, started, 1);

        tx.commit()?;
        Ok(Some(updated))
    }

    pub fn delete_todo(&self, id: i64) -> StoreResult<usize> {
        let sql = "DELETE FROM todos WHERE id = ?1";
        let started = Instant::now();
        let removed = self.conn.execute(sql, params![id])?;
        log_query(sql, started, removed);
        Ok(removed)
    }

    // ---- Stats ----

    /// Row counts for (notes, todos).
    pub fn counts(&self) -> StoreResult<(usize, usize)> {
        let notes: i64 = self.conn.query_row("SELECT COUNT(*) FROM notes", [], |r| r.get(0))?;
        let todos: i64 = self.conn.query_row("SELECT COUNT(*) FROM todos", [], |r| r.get(0))?;
        Ok((notes as usize, todos as usize))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn store() -> Store {
        Store::open_in_memory().unwrap()
    }

    #[test]
    fn test_open_creates_file_and_parent() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("nested").join("notes.db");
        let store = Store::open(&db_path).unwrap();
        assert!(db_path.exists());
        assert_eq!(store.counts().unwrap(), (0, 0));
    }

    #[test]
    fn test_reopen_keeps_data() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("notes.db");
        {
            let store = Store::open(&db_path).unwrap();
            store.create_note(&NoteChanges::default()).unwrap();
        }
        let store = Store::open(&db_path).unwrap();
        assert_eq!(store.list_notes().unwrap().len(), 1);
    }

    #[test]
    fn test_create_note_defaults() {
        let store = store();
        let record = store.create_note(&NoteChanges::default()).unwrap();
        assert_eq!(record.note.title, "");
        assert_eq!(record.note.content, "");
        assert!(!record.note.important);
        assert!(record.note.reminder.is_none());
        assert!(!record.is_protected());
    }

    #[test]
    fn test_get_note_roundtrip() {
        let store = store();
        let created = store
            .create_note(&NoteChanges {
                title: Some("Groceries".to_string()),
                content: Some("eggs, milk".to_string()),
                important: Some(true),
                password: Some("hunter2".to_string()),
                reminder: Some("2030-01-01T09:00:00Z".parse().unwrap()),
            })
            .unwrap();

        let fetched = store.get_note(created.note.id).unwrap().unwrap();
        assert_eq!(fetched, created);
        assert!(fetched.is_protected());
        assert!(store.get_note(9999).unwrap().is_none());
    }

    #[test]
    fn test_update_note_merges_fields() {
        let mut store = store();
        let created = store
            .create_note(&NoteChanges {
                title: Some("Old".to_string()),
                content: Some("body".to_string()),
                reminder: Some("2030-01-01T09:00:00Z".parse().unwrap()),
                ..Default::default()
            })
            .unwrap();

        let updated = store
            .update_note(
                created.note.id,
                &NoteChanges {
                    title: Some("New".to_string()),
                    important: Some(true),
                    ..Default::default()
                },
            )
            .unwrap()
            .unwrap();

        assert_eq!(updated.note.title, "New");
        assert_eq!(updated.note.content, "body");
        assert!(updated.note.important);
        assert_eq!(updated.note.reminder, created.note.reminder);
        assert_eq!(updated.note.created_at, created.note.created_at);
    }

    #[test]
    fn test_update_missing_note() {
        let mut store = store();
        assert!(store.update_note(42, &NoteChanges::default()).unwrap().is_none());
    }

    #[test]
    fn test_delete_note() {
        let store = store();
        let created = store.create_note(&NoteChanges::default()).unwrap();
        assert_eq!(store.delete_note(created.note.id).unwrap(), 1);
        assert_eq!(store.delete_note(created.note.id).unwrap(), 0);
        assert!(store.list_notes().unwrap().is_empty());
    }

    #[test]
    fn test_todo_crud() {
        let mut store = store();
        let created = store
            .create_todo(&NewTodo {
                tasks: vec![Task::new("buy milk"), Task::new("call mom")],
                title: None,
            })
            .unwrap();
        assert_eq!(created.title, "");
        assert_eq!(created.tasks.len(), 2);

        let mut tasks = created.tasks.clone();
        tasks[0].checked = true;
        let updated = store
            .update_todo(
                created.id,
                &TodoChanges {
                    tasks: Some(tasks),
                    title: None,
                },
            )
            .unwrap()
            .unwrap();
        assert!(updated.tasks[0].checked);
        assert_eq!(updated.title, "");

        let renamed = store
            .update_todo(
                created.id,
                &TodoChanges {
                    tasks: None,
                    title: Some("Errands".to_string()),
                },
            )
            .unwrap()
            .unwrap();
        assert_eq!(renamed.title, "Errands");
        assert!(renamed.tasks[0].checked);

        assert_eq!(store.get_todo(created.id).unwrap(), Some(renamed));
        assert_eq!(store.delete_todo(created.id).unwrap(), 1);
        assert!(store.list_todos().unwrap().is_empty());
    }

    #[test]
    fn test_counts() {
        let store = store();
        store.create_note(&NoteChanges::default()).unwrap();
        store.create_note(&NoteChanges::default()).unwrap();
        store
            .create_todo(&NewTodo {
                tasks: vec![],
                title: Some("empty".to_string()),
            })
            .unwrap();
        assert_eq!(store.counts().unwrap(), (2, 1));
    }
}
