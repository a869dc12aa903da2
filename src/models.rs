use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

// ---- Notes ----

/// A note as seen by clients. The password never leaves the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub important: bool,
    pub reminder: Option<DateTime<Utc>>,
}

/// Capability-reduced projection of a password-protected note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "LockedWire", try_from = "LockedWire")]
pub struct LockedNote {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub important: bool,
}

const LOCKED_PLACEHOLDER: &str = "locked";

// Wire shape kept compatible with existing clients: redacted title/content
// plus the `needAPassword` marker.
#[derive(Serialize, Deserialize)]
struct LockedWire {
    id: i64,
    title: String,
    content: String,
    created_at: DateTime<Utc>,
    important: bool,
    reminder: Option<DateTime<Utc>>,
    #[serde(rename = "needAPassword")]
    need_a_password: bool,
}

impl From<LockedNote> for LockedWire {
    fn from(note: LockedNote) -> Self {
        Self {
            id: note.id,
            title: LOCKED_PLACEHOLDER.to_string(),
            content: LOCKED_PLACEHOLDER.to_string(),
            created_at: note.created_at,
            important: note.important,
            reminder: None,
            need_a_password: true,
        }
    }
}

impl TryFrom<LockedWire> for LockedNote {
    type Error = String;

    fn try_from(wire: LockedWire) -> Result<Self, Self::Error> {
        if !wire.need_a_password {
            return Err("needAPassword must be true for a locked note".to_string());
        }
        Ok(Self {
            id: wire.id,
            created_at: wire.created_at,
            important: wire.important,
        })
    }
}

/// Either the full note or its locked projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NoteView {
    // Locked must be tried first: a full note would also accept the locked shape
    Locked(LockedNote),
    Full(Note),
}

impl NoteView {
    pub fn id(&self) -> i64 {
        match self {
            NoteView::Full(note) => note.id,
            NoteView::Locked(note) => note.id,
        }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        match self {
            NoteView::Full(note) => note.created_at,
            NoteView::Locked(note) => note.created_at,
        }
    }

    pub fn important(&self) -> bool {
        match self {
            NoteView::Full(note) => note.important,
            NoteView::Locked(note) => note.important,
        }
    }

    pub fn is_locked(&self) -> bool {
        matches!(self, NoteView::Locked(_))
    }

    pub fn as_full(&self) -> Option<&Note> {
        match self {
            NoteView::Full(note) => Some(note),
            NoteView::Locked(_) => None,
        }
    }
}

/// Fields accepted by `POST /notes` and `PATCH /notes/:id`. Absent fields
/// take their default on create and keep the stored value on update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NoteChanges {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub important: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reminder: Option<DateTime<Utc>>,
}

impl From<&Note> for NoteChanges {
    fn from(note: &Note) -> Self {
        Self {
            title: Some(note.title.clone()),
            content: Some(note.content.clone()),
            important: Some(note.important),
            password: None,
            reminder: note.reminder,
        }
    }
}

/// Keep a field only when its JSON value has the expected type.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// Body of `PATCH /notes/:id`. A field of the wrong type, or a reminder that
/// is not a timestamp, is dropped and the stored value kept.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct NotePatch {
    #[serde(default, deserialize_with = "lenient")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub content: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub important: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub password: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub reminder: Option<DateTime<Utc>>,
}

impl From<NotePatch> for NoteChanges {
    fn from(patch: NotePatch) -> Self {
        Self {
            title: patch.title,
            content: patch.content,
            important: patch.important,
            password: patch.password,
            reminder: patch.reminder,
        }
    }
}

// ---- Todos ----

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub text: String,
    pub checked: bool,
}

impl Task {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            checked: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TodoList {
    pub id: i64,
    pub title: String,
    pub tasks: Vec<Task>,
    pub created_at: DateTime<Utc>,
}

/// Body of `POST /todos`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTodo {
    pub tasks: Vec<Task>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// Body of `PATCH /todos/:id`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TodoChanges {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tasks: Option<Vec<Task>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

// ---- Shared ----

/// The collection a view is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Notes,
    Todos,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Notes => "notes",
            ItemKind::Todos => "todos",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// `{ "message": ... }` body used by acknowledgements and errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub message: String,
}

impl Message {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
