use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use exam_utils::{Feedback, FeedbackResponse, MAX_RATING};

use super::body;
use crate::{AppState, error::AppError};

pub async fn save_data_rating(
    State(state): State<AppState>,
    payload: Result<Json<Feedback>, JsonRejection>,
) -> Result<Json<FeedbackResponse>, AppError> {
    let feedback = body(payload)?;
    if feedback.rating > MAX_RATING {
        return Err(AppError::InvalidFields);
    }
    if feedback.is_empty() {
        return Err(AppError::Rejected("A rating or feedback text is required."));
    }
    state.db.save_feedback(feedback).await?;
    Ok(Json(FeedbackResponse {
        message: "Successful".to_string(),
    }))
}
