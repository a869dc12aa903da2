use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State as AxumState,
    },
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::Json,
    routing::get,
    Router,
};
use tracing::info;

use crate::database::NoteRecord;
use crate::error::{ApiError, ApiResult};
use crate::models::{LockedNote, Message, Note, NoteChanges, NotePatch, NoteView};
use crate::AppState;

const NOT_FOUND: &str = "Note not found!";

// ── Locked projection ──────────────────────────────────────────────────────

/// Outcome of comparing a request's `Authorization` header with a note's
/// password.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Granted,
    /// Protected note, no password supplied
    Missing,
    /// Protected note, wrong password supplied
    Denied,
}

pub fn check_access(record: &NoteRecord, authorization: Option<&str>) -> Access {
    if !record.is_protected() {
        return Access::Granted;
    }
    match authorization {
        None => Access::Missing,
        Some(supplied) if supplied == record.password => Access::Granted,
        Some(_) => Access::Denied,
    }
}

fn locked(note: &Note) -> NoteView {
    NoteView::Locked(LockedNote {
        id: note.id,
        created_at: note.created_at,
        important: note.important,
    })
}

/// View used in listings: protected notes are always redacted.
pub fn list_view(record: NoteRecord) -> NoteView {
    if record.is_protected() {
        locked(&record.note)
    } else {
        NoteView::Full(record.note)
    }
}

// ── Routes ─────────────────────────────────────────────────────────────────

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/notes", get(list_notes).post(create_note))
        .route(
            "/notes/{id}",
            get(get_note).patch(update_note).delete(delete_note),
        )
}

async fn list_notes(AxumState(state): AxumState<AppState>) -> ApiResult<Json<Vec<NoteView>>> {
    let records = state.with_store(|store| store.list_notes())?;
    Ok(Json(records.into_iter().map(list_view).collect()))
}

async fn get_note(
    AxumState(state): AxumState<AppState>,
    path: Result<Path<i64>, PathRejection>,
    headers: HeaderMap,
) -> ApiResult<(StatusCode, Json<NoteView>)> {
    let Path(id) = path?;
    let record = state
        .with_store(|store| store.get_note(id))?
        .ok_or(ApiError::NotFound(NOT_FOUND))?;

    let authorization = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
    let response = match check_access(&record, authorization) {
        Access::Granted => (StatusCode::OK, Json(NoteView::Full(record.note))),
        Access::Missing => (
            StatusCode::NON_AUTHORITATIVE_INFORMATION,
            Json(locked(&record.note)),
        ),
        Access::Denied => {
            info!(note_id = id, "rejected note password");
            (StatusCode::FORBIDDEN, Json(locked(&record.note)))
        }
    };
    Ok(response)
}

async fn create_note(
    AxumState(state): AxumState<AppState>,
    payload: Result<Json<NoteChanges>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Note>)> {
    let Json(changes) = payload?;
    let record = state.with_store(|store| store.create_note(&changes))?;
    info!(note_id = record.note.id, "created note");
    Ok((StatusCode::CREATED, Json(record.note)))
}

async fn update_note(
    AxumState(state): AxumState<AppState>,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<NotePatch>, JsonRejection>,
) -> ApiResult<Json<Note>> {
    let Path(id) = path?;
    let Json(patch) = payload?;
    let changes = NoteChanges::from(patch);
    let record = state
        .with_store(|store| store.update_note(id, &changes))?
        .ok_or(ApiError::NotFound(NOT_FOUND))?;
    Ok(Json(record.note))
}

async fn delete_note(
    AxumState(state): AxumState<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Message>> {
    let Path(id) = path?;
    let removed = state.with_store(|store| store.delete_note(id))?;
    info!(note_id = id, removed, "deleted note");
    Ok(Json(Message::new("successfully deleted")))
}
