use axum::{
    Json,
    extract::{Query, State, rejection::JsonRejection},
};
use exam_utils::{Flashcard, Lesson, Question};
use serde::Deserialize;

use super::body;
use crate::{AppState, auth::CurrentUser, error::AppError};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionsRequest {
    #[serde(default)]
    is_exam: bool,
}

/// Mock exams get the whole pool whatever the role; practice is gated.
pub async fn get_questions(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    payload: Result<Json<QuestionsRequest>, JsonRejection>,
) -> Result<Json<Vec<Question>>, AppError> {
    let request = body(payload)?;
    let limit = if request.is_exam {
        None
    } else {
        user.role.visible_limit(state.config.basic_item_limit)
    };
    Ok(Json(state.db.questions(limit).await?))
}

pub async fn get_flashcards(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<Flashcard>>, AppError> {
    let limit = user.role.visible_limit(state.config.basic_item_limit);
    Ok(Json(state.db.flashcards(limit).await?))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonsQuery {
    id_prefix: Option<String>,
}

pub async fn get_lessons(
    State(state): State<AppState>,
    CurrentUser(_): CurrentUser,
    Query(query): Query<LessonsQuery>,
) -> Result<Json<Vec<Lesson>>, AppError> {
    let level = query.id_prefix.filter(|prefix| !prefix.is_empty());
    Ok(Json(state.db.lessons(level).await?))
}
