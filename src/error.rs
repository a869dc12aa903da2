use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use tracing::{error, warn};

use crate::database::StoreError;
use crate::models::Message;

/// Errors returned by HTTP handlers. Every variant renders as a
/// `{ "message": ... }` body.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(&'static str),
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            // Store failures surface as 400, like any other rejected statement
            ApiError::BadRequest(_) | ApiError::Store(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        warn!("rejected request body: {}", rejection.body_text());
        ApiError::BadRequest("Bad request".to_string())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        warn!("rejected request path: {}", rejection.body_text());
        ApiError::BadRequest("Invalid id".to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::Internal(detail) => {
                error!("internal error: {}", detail);
                "Something broke!".to_string()
            }
            ApiError::Store(e) => {
                warn!("store error: {}", e);
                e.to_string()
            }
            other => other.to_string(),
        };
        (status, Json(Message::new(message))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
