use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use exam_utils::{ExamAttempt, ExamHistoryResponse, SaveExamResponse, SuccessResponse};

use super::body;
use crate::{AppState, auth::CurrentUser, error::AppError};

/// Stores a finished attempt. The attempt names its own user; no session is
/// required.
pub async fn save_exams(
    State(state): State<AppState>,
    payload: Result<Json<ExamAttempt>, JsonRejection>,
) -> Result<Json<SaveExamResponse>, AppError> {
    let attempt = body(payload)?;
    if attempt.user_id.trim().is_empty() {
        return Err(AppError::InvalidFields);
    }
    let data = state.db.save_exam(attempt).await?;
    log::info!(
        "Saved exam {} for {}: {}/{}",
        data.id,
        data.user_id,
        data.score,
        data.total_questions
    );
    Ok(Json(SaveExamResponse {
        success: true,
        data,
    }))
}

/// Spends the signed-in user's remaining tries.
pub async fn update_tries(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<SuccessResponse>, AppError> {
    state.db.reset_tries(user.id).await?;
    Ok(Json(SuccessResponse { success: true }))
}

pub async fn get_exam_history(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<ExamHistoryResponse>, AppError> {
    let exams = state.db.exam_history(user.id).await?;
    Ok(Json(ExamHistoryResponse { exams }))
}
