use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use exam_utils::{UserLessonProgress, UserLessonResponse};
use serde_json::json;
use thiserror::Error;

use crate::db::DbError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("Missing or invalid fields.")]
    InvalidFields,

    #[error("{0}")]
    Rejected(&'static str),

    /// The progress row is not where the client thinks it is.
    #[error("lesson progress has moved on")]
    Conflict(UserLessonProgress),

    #[error("Database error: {0}")]
    Database(#[from] DbError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::MissingField(_) | AppError::InvalidFields | AppError::Rejected(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        match self {
            AppError::Conflict(current) => (
                status,
                Json(UserLessonResponse {
                    lesson: Some(current),
                }),
            )
                .into_response(),
            AppError::Database(e) => {
                log::error!("{e}");
                (status, Json(json!({ "error": e.to_string() }))).into_response()
            }
            other => (status, Json(json!({ "error": other.to_string() }))).into_response(),
        }
    }
}
