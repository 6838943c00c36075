use axum::{
    Json,
    extract::{Query, State, rejection::JsonRejection},
};
use exam_utils::{ResetLessonResponse, UserLessonResponse};
use serde::Deserialize;

use super::{body, required};
use crate::{AppState, auth::CurrentUser, db::LessonAdvance, error::AppError};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonQuery {
    lesson_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonBody {
    #[serde(default)]
    lesson_id: Option<String>,
    #[serde(default)]
    expected_position: Option<u32>,
}

pub async fn get_user_lesson(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<LessonQuery>,
) -> Result<Json<UserLessonResponse>, AppError> {
    let lesson_id = required(query.lesson_id, "lessonId")?;
    let lesson = state.db.user_lesson(user.id, lesson_id).await?;
    Ok(Json(UserLessonResponse { lesson }))
}

pub async fn save_lesson_progress(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    payload: Result<Json<LessonBody>, JsonRejection>,
) -> Result<Json<UserLessonResponse>, AppError> {
    let request = body(payload)?;
    let lesson_id = required(request.lesson_id, "lessonId")?;
    match state
        .db
        .advance_lesson(user.id, lesson_id, request.expected_position)
        .await?
    {
        LessonAdvance::Saved(lesson) => Ok(Json(UserLessonResponse {
            lesson: Some(lesson),
        })),
        LessonAdvance::Stale(current) => Err(AppError::Conflict(current)),
    }
}

pub async fn reset_lesson_progress(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    payload: Result<Json<LessonBody>, JsonRejection>,
) -> Result<Json<ResetLessonResponse>, AppError> {
    let lesson_id = required(body(payload)?.lesson_id, "lessonId")?;
    let lesson = state.db.reset_lesson(user.id, lesson_id).await?;
    log::info!("Reset {} for {}", lesson.lesson_id, lesson.user_id);
    Ok(Json(ResetLessonResponse {
        lesson,
        reset: true,
    }))
}
