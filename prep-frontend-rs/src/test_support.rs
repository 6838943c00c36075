use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;

use chrono::{TimeZone, Utc};
use exam_utils::{
    ExamAttempt, ExamDomain, ExamResult, LessonProgressRequest, POINTS_PER_STEP, Question,
    UserLessonProgress,
};

use crate::api::{ApiError, ExamApi, LessonApi};

pub(crate) fn pool(per_domain: &[(ExamDomain, usize)]) -> Vec<Question> {
    per_domain
        .iter()
        .flat_map(|(domain, n)| {
            (0..*n).map(move |i| Question {
                id: format!("{}-{i}", domain.label()),
                question: format!("{} question {i}", domain.label()),
                options: ["a", "b", "c", "d"].map(String::from).to_vec(),
                correct_indexes: vec![i % 4],
                explanation: String::new(),
                category: domain.clone(),
                difficulty: "medium".to_string(),
            })
        })
        .collect()
}

fn unavailable() -> ApiError {
    ApiError::Status {
        status: 503,
        body: "unavailable".to_string(),
    }
}

#[derive(Default)]
pub(crate) struct FakeExamApi {
    pub fail: bool,
    pub pool: Vec<Question>,
    pub tries_resets: Cell<u32>,
    pub saved: RefCell<Vec<ExamAttempt>>,
}

impl ExamApi for FakeExamApi {
    async fn fetch_question_pool(&self, _is_exam: bool) -> Result<Vec<Question>, ApiError> {
        if self.fail {
            return Err(unavailable());
        }
        Ok(self.pool.clone())
    }

    async fn save_exam(&self, attempt: &ExamAttempt) -> Result<ExamResult, ApiError> {
        if self.fail {
            return Err(unavailable());
        }
        let mut saved = self.saved.borrow_mut();
        saved.push(attempt.clone());
        Ok(ExamResult {
            id: saved.len() as i64,
            user_id: attempt.user_id.clone(),
            score: attempt.score,
            total_questions: attempt.total_questions,
            duration_seconds: attempt.duration_seconds,
            submitted_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            answers: attempt.answers.clone(),
        })
    }

    async fn reset_tries(&self) -> Result<(), ApiError> {
        if self.fail {
            return Err(unavailable());
        }
        self.tries_resets.set(self.tries_resets.get() + 1);
        Ok(())
    }
}

/// Keeps progress rows in memory and behaves like the real upsert: a missing
/// row starts at position 1, a stale `expected_position` is a conflict.
fn empty_row(lesson_id: &str) -> UserLessonProgress {
    UserLessonProgress {
        user_id: "user-1".to_string(),
        lesson_id: lesson_id.to_string(),
        position: 0,
        points: 0,
    }
}

#[derive(Default)]
pub(crate) struct FakeLessonApi {
    pub fail: bool,
    pub rows: RefCell<BTreeMap<String, UserLessonProgress>>,
}

impl FakeLessonApi {
    pub fn with_row(lesson_id: &str, position: u32, points: u32) -> Self {
        let api = Self::default();
        api.rows.borrow_mut().insert(
            lesson_id.to_string(),
            UserLessonProgress {
                user_id: "user-1".to_string(),
                lesson_id: lesson_id.to_string(),
                position,
                points,
            },
        );
        api
    }

    pub fn row(&self, lesson_id: &str) -> Option<UserLessonProgress> {
        self.rows.borrow().get(lesson_id).cloned()
    }
}

impl LessonApi for FakeLessonApi {
    async fn fetch_user_lesson(
        &self,
        lesson_id: &str,
    ) -> Result<Option<UserLessonProgress>, ApiError> {
        if self.fail {
            return Err(unavailable());
        }
        Ok(self.row(lesson_id))
    }

    async fn save_lesson_progress(
        &self,
        request: &LessonProgressRequest,
    ) -> Result<UserLessonProgress, ApiError> {
        if self.fail {
            return Err(unavailable());
        }
        let mut rows = self.rows.borrow_mut();
        let row = rows
            .entry(request.lesson_id.clone())
            .or_insert_with(|| empty_row(&request.lesson_id));
        if request
            .expected_position
            .is_some_and(|expected| expected != row.position)
        {
            return Err(ApiError::Conflict(row.clone()));
        }
        row.position += 1;
        row.points += POINTS_PER_STEP;
        Ok(row.clone())
    }

    async fn reset_lesson_progress(
        &self,
        lesson_id: &str,
    ) -> Result<UserLessonProgress, ApiError> {
        if self.fail {
            return Err(unavailable());
        }
        let mut rows = self.rows.borrow_mut();
        let row = rows
            .entry(lesson_id.to_string())
            .or_insert_with(|| empty_row(lesson_id));
        row.position = 0;
        row.points = 0;
        Ok(row.clone())
    }
}
