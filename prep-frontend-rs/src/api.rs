//! JSON-over-HTTP access to the backend routes.
//!
//! The engines only see the [`ExamApi`] and [`LessonApi`] traits so they can be
//! driven against fakes in tests. [`HttpBackend`] is the real thing.

use exam_utils::{
    ExamAttempt, ExamHistoryResponse, ExamResult, Feedback, FeedbackResponse, Flashcard, Lesson,
    LessonProgressRequest, Question, ResetLessonResponse, SaveExamResponse, SuccessResponse,
    UserLessonProgress, UserLessonResponse,
};
use reqwest::StatusCode;
use serde::{Serialize, de::DeserializeOwned};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("could not decode response: {0}")]
    Decode(#[from] serde_json::Error),
    /// The progress row moved on since we last saw it.
    #[error("progress for lesson {} is at position {}", .0.lesson_id, .0.position)]
    Conflict(UserLessonProgress),
}

#[allow(async_fn_in_trait)]
pub trait ExamApi {
    async fn fetch_question_pool(&self, is_exam: bool) -> Result<Vec<Question>, ApiError>;
    async fn save_exam(&self, attempt: &ExamAttempt) -> Result<ExamResult, ApiError>;
    async fn reset_tries(&self) -> Result<(), ApiError>;
}

#[allow(async_fn_in_trait)]
pub trait LessonApi {
    async fn fetch_user_lesson(
        &self,
        lesson_id: &str,
    ) -> Result<Option<UserLessonProgress>, ApiError>;
    async fn save_lesson_progress(
        &self,
        request: &LessonProgressRequest,
    ) -> Result<UserLessonProgress, ApiError>;
    async fn reset_lesson_progress(&self, lesson_id: &str)
    -> Result<UserLessonProgress, ApiError>;
}

#[derive(Clone, Debug)]
pub struct ApiConfig {
    pub base_url: String,
    pub access_token: Option<String>,
}

#[derive(Clone, Debug)]
pub struct HttpBackend {
    client: reqwest::Client,
    config: ApiConfig,
}

impl HttpBackend {
    pub fn new(config: ApiConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url.trim_end_matches('/'))
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ApiError> {
        let request = self.authorize(self.client.get(self.url(path)).query(query));
        let (status, body) = send(request).await?;
        decode(status, &body)
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let request = self.authorize(self.client.post(self.url(path)).json(body));
        let (status, body) = send(request).await?;
        decode(status, &body)
    }

    pub async fn fetch_flashcards(&self) -> Result<Vec<Flashcard>, ApiError> {
        self.get("/api/getFlashcards", &[]).await
    }

    pub async fn fetch_lessons(&self, level: Option<&str>) -> Result<Vec<Lesson>, ApiError> {
        match level {
            Some(level) => self.get("/api/getLessons", &[("idPrefix", level)]).await,
            None => self.get("/api/getLessons", &[]).await,
        }
    }

    pub async fn fetch_exam_history(&self) -> Result<Vec<ExamResult>, ApiError> {
        let response: ExamHistoryResponse = self.get("/api/getExamHistory", &[]).await?;
        Ok(response.exams)
    }

    pub async fn save_feedback(&self, feedback: &Feedback) -> Result<(), ApiError> {
        let _: FeedbackResponse = self.post("/api/saveDataRating", feedback).await?;
        Ok(())
    }
}

async fn send(request: reqwest::RequestBuilder) -> Result<(StatusCode, String), ApiError> {
    let response = request.send().await?;
    let status = response.status();
    let body = response.text().await?;
    Ok((status, body))
}

fn decode<T: DeserializeOwned>(status: StatusCode, body: &str) -> Result<T, ApiError> {
    if !status.is_success() {
        return Err(ApiError::Status {
            status: status.as_u16(),
            body: body.to_string(),
        });
    }
    Ok(serde_json::from_str(body)?)
}

impl ExamApi for HttpBackend {
    async fn fetch_question_pool(&self, is_exam: bool) -> Result<Vec<Question>, ApiError> {
        self.post("/api/getQuestions", &serde_json::json!({ "isExam": is_exam }))
            .await
    }

    async fn save_exam(&self, attempt: &ExamAttempt) -> Result<ExamResult, ApiError> {
        let response: SaveExamResponse = self.post("/api/saveExams", attempt).await?;
        Ok(response.data)
    }

    async fn reset_tries(&self) -> Result<(), ApiError> {
        let _: SuccessResponse = self
            .post("/api/updateTries", &serde_json::json!({}))
            .await?;
        Ok(())
    }
}

impl LessonApi for HttpBackend {
    async fn fetch_user_lesson(
        &self,
        lesson_id: &str,
    ) -> Result<Option<UserLessonProgress>, ApiError> {
        let response: UserLessonResponse = self
            .get("/api/getUserLesson", &[("lessonId", lesson_id)])
            .await?;
        Ok(response.lesson)
    }

    async fn save_lesson_progress(
        &self,
        request: &LessonProgressRequest,
    ) -> Result<UserLessonProgress, ApiError> {
        let http = self.authorize(
            self.client
                .post(self.url("/api/saveLessonProgress"))
                .json(request),
        );
        let (status, body) = send(http).await?;
        if status == StatusCode::CONFLICT {
            let current: UserLessonResponse = serde_json::from_str(&body)?;
            if let Some(lesson) = current.lesson {
                return Err(ApiError::Conflict(lesson));
            }
        }
        let response: UserLessonResponse = decode(status, &body)?;
        response.lesson.ok_or_else(|| ApiError::Status {
            status: status.as_u16(),
            body,
        })
    }

    async fn reset_lesson_progress(
        &self,
        lesson_id: &str,
    ) -> Result<UserLessonProgress, ApiError> {
        let response: ResetLessonResponse = self
            .post(
                "/api/resetLessonProgress",
                &LessonProgressRequest {
                    lesson_id: lesson_id.to_string(),
                    expected_position: None,
                },
            )
            .await?;
        Ok(response.lesson)
    }
}
