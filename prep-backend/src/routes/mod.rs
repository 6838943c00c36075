mod content;
mod exams;
mod feedback;
mod lessons;

use axum::{Json, extract::rejection::JsonRejection};

use crate::error::AppError;

pub use content::{get_flashcards, get_lessons, get_questions};
pub use exams::{get_exam_history, save_exams, update_tries};
pub use feedback::save_data_rating;
pub use lessons::{get_user_lesson, reset_lesson_progress, save_lesson_progress};

/// Unwrap a JSON body, answering 400 for anything malformed.
fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload.map(|Json(value)| value).map_err(|e| {
        log::warn!("Rejected request body: {e}");
        AppError::InvalidFields
    })
}

fn required(value: Option<String>, field: &'static str) -> Result<String, AppError> {
    value
        .filter(|value| !value.trim().is_empty())
        .ok_or(AppError::MissingField(field))
}
