use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State as AxumState,
    },
    response::Json,
    routing::get,
    Router,
};
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::models::{Message, NewTodo, TodoChanges, TodoList};
use crate::AppState;

const NOT_FOUND: &str = "To-do not found";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/todos", get(list_todos).post(create_todo))
        .route(
            "/todos/{id}",
            get(get_todo).patch(update_todo).delete(delete_todo),
        )
}

async fn list_todos(AxumState(state): AxumState<AppState>) -> ApiResult<Json<Vec<TodoList>>> {
    Ok(Json(state.with_store(|store| store.list_todos())?))
}

async fn get_todo(
    AxumState(state): AxumState<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<TodoList>> {
    let Path(id) = path?;
    state
        .with_store(|store| store.get_todo(id))?
        .map(Json)
        .ok_or(ApiError::NotFound(NOT_FOUND))
}

async fn create_todo(
    AxumState(state): AxumState<AppState>,
    payload: Result<Json<NewTodo>, JsonRejection>,
) -> ApiResult<Json<TodoList>> {
    let Json(todo) = payload?;
    let created = state.with_store(|store| store.create_todo(&todo))?;
    info!(todo_id = created.id, tasks = created.tasks.len(), "created todo list");
    Ok(Json(created))
}

async fn update_todo(
    AxumState(state): AxumState<AppState>,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<TodoChanges>, JsonRejection>,
) -> ApiResult<Json<TodoList>> {
    let Path(id) = path?;
    let Json(changes) = payload?;
    state
        .with_store(|store| store.update_todo(id, &changes))?
        .map(Json)
        .ok_or(ApiError::NotFound(NOT_FOUND))
}

async fn delete_todo(
    AxumState(state): AxumState<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Message>> {
    let Path(id) = path?;
    let removed = state.with_store(|store| store.delete_todo(id))?;
    info!(todo_id = id, removed, "deleted todo list");
    Ok(Json(Message::new("successfully deleted")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Store;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app() -> Router {
        routes().with_state(AppState::new(Store::open_in_memory().unwrap()))
    }

    async fn send(router: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn test_create_and_fetch_todo() {
        let router = app();
        let (status, created) = send(
            &router,
            "POST",
            "/todos",
            Some(json!({ "title": "Weekend", "tasks": [{ "text": "laundry", "checked": false }] })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(created["title"], "Weekend");
        assert_eq!(created["tasks"][0]["text"], "laundry");

        let uri = format!("/todos/{}", created["id"]);
        let (status, fetched) = send(&router, "GET", &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched, created);

        let (_, listed) = send(&router, "GET", "/todos", None).await;
        assert_eq!(listed.as_array().map(|a| a.len()), Some(1));
    }

    #[tokio::test]
    async fn test_create_rejects_bad_tasks() {
        let router = app();
        let bad_bodies = [
            json!({ "title": "no tasks" }),
            json!({ "tasks": "not an array" }),
            json!({ "tasks": [{ "text": "x" }] }),
            json!({ "tasks": [{ "text": 3, "checked": true }] }),
            json!({ "tasks": [], "title": 12 }),
        ];
        for body in bad_bodies {
            let (status, response) = send(&router, "POST", "/todos", Some(body.clone())).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
            assert_eq!(response["message"], "Bad request");
        }
    }

    #[tokio::test]
    async fn test_patch_tasks_keeps_title() {
        let router = app();
        let (_, created) = send(
            &router,
            "POST",
            "/todos",
            Some(json!({ "title": "Chores", "tasks": [{ "text": "dishes", "checked": false }] })),
        )
        .await;
        let uri = format!("/todos/{}", created["id"]);

        let (status, updated) = send(
            &router,
            "PATCH",
            &uri,
            Some(json!({ "tasks": [{ "text": "dishes", "checked": true }] })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["title"], "Chores");
        assert_eq!(updated["tasks"][0]["checked"], true);

        let (status, _) = send(&router, "PATCH", &uri, Some(json!({ "tasks": [{ "checked": true }] }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_non_numeric_id() {
        let router = app();
        for method in ["GET", "DELETE"] {
            let (status, body) = send(&router, method, "/todos/first", None).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{method}");
            assert_eq!(body["message"], "Invalid id");
        }
    }

    #[tokio::test]
    async fn test_missing_todo() {
        let router = app();
        let (status, body) = send(&router, "GET", "/todos/5", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "To-do not found");

        let (status, _) = send(&router, "PATCH", "/todos/5", Some(json!({ "title": "x" }))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send(&router, "DELETE", "/todos/5", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "successfully deleted");
    }
}
