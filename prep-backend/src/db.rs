//! SQLite storage for users, content, lesson progress, exam results and
//! feedback.
//!
//! One connection behind a mutex. Every query runs on the blocking pool via
//! [`Db::call`] so the async handlers never wait on SQLite directly.

use std::sync::{Arc, Mutex};

use chrono::Utc;
use exam_utils::{
    ContentBundle, ExamAttempt, ExamResult, Feedback, Flashcard, Lesson, Question, Role, User,
    UserLessonProgress, POINTS_PER_STEP,
};
use rusqlite::{Connection, OptionalExtension, Row, params, types::Type};
use serde::de::DeserializeOwned;

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("json column: {0}")]
    Json(#[from] serde_json::Error),
    #[error("database task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
    #[error("database lock poisoned")]
    Poisoned,
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    role TEXT NOT NULL DEFAULT 'basic',
    tries INTEGER NOT NULL DEFAULT 0
);
CREATE TABLE IF NOT EXISTS questions (
    id TEXT PRIMARY KEY,
    question TEXT NOT NULL,
    options TEXT NOT NULL,
    correct_indexes TEXT NOT NULL,
    explanation TEXT NOT NULL,
    category TEXT NOT NULL,
    difficulty TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS lessons (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    description TEXT NOT NULL,
    steps TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS flashcards (
    id INTEGER PRIMARY KEY,
    question TEXT NOT NULL,
    answer TEXT NOT NULL,
    category TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS user_lessons (
    user_id TEXT NOT NULL,
    lesson_id TEXT NOT NULL,
    position INTEGER NOT NULL DEFAULT 0,
    points INTEGER NOT NULL DEFAULT 0,
    UNIQUE (user_id, lesson_id)
);
CREATE TABLE IF NOT EXISTS mock_exam_results (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL,
    score INTEGER NOT NULL,
    total_questions INTEGER NOT NULL,
    duration_seconds INTEGER NOT NULL,
    submitted_at TEXT NOT NULL,
    answers TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS mock_exam_results_user ON mock_exam_results (user_id);
CREATE TABLE IF NOT EXISTS feedback (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    rating INTEGER NOT NULL,
    feedback TEXT NOT NULL,
    created_at TEXT NOT NULL
);
";

/// Outcome of a progress save.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LessonAdvance {
    Saved(UserLessonProgress),
    /// The caller's `expected_position` was stale. Nothing was written.
    Stale(UserLessonProgress),
}

#[derive(Clone)]
pub struct Db {
    conn: Arc<Mutex<Connection>>,
}

impl Db {
    pub fn open(path: &str) -> Result<Self, DbError> {
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, DbError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, DbError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub async fn call<F, T>(&self, f: F) -> Result<T, DbError>
    where
        F: FnOnce(&mut Connection) -> Result<T, DbError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock().map_err(|_| DbError::Poisoned)?;
            f(&mut conn)
        })
        .await?
    }

    /// The user row for `id`, created as a basic user with `default_tries`
    /// on first sight.
    pub async fn get_or_create_user(&self, id: String, default_tries: u32) -> Result<User, DbError> {
        self.call(move |conn| {
            conn.execute(
                "INSERT INTO users (id, role, tries) VALUES (?1, 'basic', ?2)
                 ON CONFLICT (id) DO NOTHING",
                params![id, default_tries],
            )?;
            let user = conn.query_row(
                "SELECT id, role, tries FROM users WHERE id = ?1",
                params![id],
                user_from_row,
            )?;
            Ok(user)
        })
        .await
    }

    pub async fn set_role(&self, id: String, role: Role) -> Result<(), DbError> {
        self.call(move |conn| {
            conn.execute(
                "UPDATE users SET role = ?2 WHERE id = ?1",
                params![id, role.as_str()],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn reset_tries(&self, id: String) -> Result<(), DbError> {
        self.call(move |conn| {
            conn.execute("UPDATE users SET tries = 0 WHERE id = ?1", params![id])?;
            Ok(())
        })
        .await
    }

    /// Questions in import order, at most `limit` of them.
    pub async fn questions(&self, limit: Option<usize>) -> Result<Vec<Question>, DbError> {
        self.call(move |conn| {
            let mut statement = conn.prepare(
                "SELECT id, question, options, correct_indexes, explanation, category, difficulty
                 FROM questions ORDER BY rowid LIMIT ?1",
            )?;
            let questions = statement
                .query_map(params![sql_limit(limit)], question_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(questions)
        })
        .await
    }

    pub async fn flashcards(&self, limit: Option<usize>) -> Result<Vec<Flashcard>, DbError> {
        self.call(move |conn| {
            let mut statement = conn.prepare(
                "SELECT id, question, answer, category FROM flashcards ORDER BY id LIMIT ?1",
            )?;
            let cards = statement
                .query_map(params![sql_limit(limit)], |row| {
                    Ok(Flashcard {
                        id: row.get(0)?,
                        question: row.get(1)?,
                        answer: row.get(2)?,
                        category: label_column(row, 3)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(cards)
        })
        .await
    }

    /// Lessons whose id starts with `<level>-`, or every lesson.
    pub async fn lessons(&self, level: Option<String>) -> Result<Vec<Lesson>, DbError> {
        self.call(move |conn| {
            let mut statement = conn.prepare(
                "SELECT id, title, description, steps FROM lessons
                 WHERE ?1 IS NULL OR substr(id, 1, length(?1) + 1) = ?1 || '-'
                 ORDER BY rowid",
            )?;
            let lessons = statement
                .query_map(params![level], |row| {
                    Ok(Lesson {
                        id: row.get(0)?,
                        title: row.get(1)?,
                        description: row.get(2)?,
                        steps: json_column(row, 3)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(lessons)
        })
        .await
    }

    pub async fn user_lesson(
        &self,
        user_id: String,
        lesson_id: String,
    ) -> Result<Option<UserLessonProgress>, DbError> {
        self.call(move |conn| Ok(select_user_lesson(conn, &user_id, &lesson_id)?))
            .await
    }

    /// Credit one step: position + 1 and points + [`POINTS_PER_STEP`], starting
    /// from zero when there is no row yet. The increment is a single upsert so
    /// concurrent saves never lose one.
    pub async fn advance_lesson(
        &self,
        user_id: String,
        lesson_id: String,
        expected_position: Option<u32>,
    ) -> Result<LessonAdvance, DbError> {
        self.call(move |conn| {
            let tx = conn.transaction()?;
            if let Some(expected) = expected_position {
                let current = select_user_lesson(&tx, &user_id, &lesson_id)?
                    .unwrap_or_else(|| empty_progress(&user_id, &lesson_id));
                if current.position != expected {
                    return Ok(LessonAdvance::Stale(current));
                }
            }
            let saved = tx.query_row(
                "INSERT INTO user_lessons (user_id, lesson_id, position, points)
                 VALUES (?1, ?2, 1, ?3)
                 ON CONFLICT (user_id, lesson_id)
                 DO UPDATE SET position = position + 1, points = points + ?3
                 RETURNING user_id, lesson_id, position, points",
                params![user_id, lesson_id, POINTS_PER_STEP],
                progress_from_row,
            )?;
            tx.commit()?;
            Ok(LessonAdvance::Saved(saved))
        })
        .await
    }

    pub async fn reset_lesson(
        &self,
        user_id: String,
        lesson_id: String,
    ) -> Result<UserLessonProgress, DbError> {
        self.call(move |conn| {
            let reset = conn.query_row(
                "INSERT INTO user_lessons (user_id, lesson_id, position, points)
                 VALUES (?1, ?2, 0, 0)
                 ON CONFLICT (user_id, lesson_id) DO UPDATE SET position = 0, points = 0
                 RETURNING user_id, lesson_id, position, points",
                params![user_id, lesson_id],
                progress_from_row,
            )?;
            Ok(reset)
        })
        .await
    }

    pub async fn save_exam(&self, attempt: ExamAttempt) -> Result<ExamResult, DbError> {
        self.call(move |conn| {
            let answers = serde_json::to_string(&attempt.answers)?;
            let saved = conn.query_row(
                "INSERT INTO mock_exam_results
                     (user_id, score, total_questions, duration_seconds, submitted_at, answers)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 RETURNING id, user_id, score, total_questions, duration_seconds, submitted_at, answers",
                params![
                    attempt.user_id,
                    attempt.score,
                    attempt.total_questions,
                    attempt.duration_seconds,
                    Utc::now(),
                    answers,
                ],
                exam_result_from_row,
            )?;
            Ok(saved)
        })
        .await
    }

    pub async fn exam_history(&self, user_id: String) -> Result<Vec<ExamResult>, DbError> {
        self.call(move |conn| {
            let mut statement = conn.prepare(
                "SELECT id, user_id, score, total_questions, duration_seconds, submitted_at, answers
                 FROM mock_exam_results WHERE user_id = ?1 ORDER BY id",
            )?;
            let results = statement
                .query_map(params![user_id], exam_result_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(results)
        })
        .await
    }

    pub async fn save_feedback(&self, feedback: Feedback) -> Result<(), DbError> {
        self.call(move |conn| {
            conn.execute(
                "INSERT INTO feedback (rating, feedback, created_at) VALUES (?1, ?2, ?3)",
                params![feedback.rating, feedback.feedback, Utc::now()],
            )?;
            Ok(())
        })
        .await
    }

    /// Insert or update every item of the bundle. Items keep their original
    /// position in listings when re-imported.
    pub async fn import(&self, bundle: ContentBundle) -> Result<(), DbError> {
        self.call(move |conn| {
            let tx = conn.transaction()?;
            for question in &bundle.questions {
                tx.execute(
                    "INSERT INTO questions
                         (id, question, options, correct_indexes, explanation, category, difficulty)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                     ON CONFLICT (id) DO UPDATE SET
                         question = excluded.question,
                         options = excluded.options,
                         correct_indexes = excluded.correct_indexes,
                         explanation = excluded.explanation,
                         category = excluded.category,
                         difficulty = excluded.difficulty",
                    params![
                        question.id,
                        question.question,
                        serde_json::to_string(&question.options)?,
                        serde_json::to_string(&question.correct_indexes)?,
                        question.explanation,
                        question.category.label(),
                        question.difficulty,
                    ],
                )?;
            }
            for lesson in &bundle.lessons {
                tx.execute(
                    "INSERT INTO lessons (id, title, description, steps) VALUES (?1, ?2, ?3, ?4)
                     ON CONFLICT (id) DO UPDATE SET
                         title = excluded.title,
                         description = excluded.description,
                         steps = excluded.steps",
                    params![
                        lesson.id,
                        lesson.title,
                        lesson.description,
                        serde_json::to_string(&lesson.steps)?,
                    ],
                )?;
            }
            for card in &bundle.flashcards {
                tx.execute(
                    "INSERT INTO flashcards (id, question, answer, category) VALUES (?1, ?2, ?3, ?4)
                     ON CONFLICT (id) DO UPDATE SET
                         question = excluded.question,
                         answer = excluded.answer,
                         category = excluded.category",
                    params![
                        card.id,
                        card.question,
                        card.answer,
                        serde_json::to_value(card.category)?.as_str().unwrap_or_default(),
                    ],
                )?;
            }
            tx.commit()?;
            log::info!(
                "Imported {} questions, {} lessons and {} flashcards",
                bundle.questions.len(),
                bundle.lessons.len(),
                bundle.flashcards.len()
            );
            Ok(())
        })
        .await
    }
}

fn sql_limit(limit: Option<usize>) -> i64 {
    // SQLite reads a negative LIMIT as no limit
    limit.map_or(-1, |limit| i64::try_from(limit).unwrap_or(i64::MAX))
}

fn empty_progress(user_id: &str, lesson_id: &str) -> UserLessonProgress {
    UserLessonProgress {
        user_id: user_id.to_string(),
        lesson_id: lesson_id.to_string(),
        position: 0,
        points: 0,
    }
}

fn select_user_lesson(
    conn: &Connection,
    user_id: &str,
    lesson_id: &str,
) -> rusqlite::Result<Option<UserLessonProgress>> {
    conn.query_row(
        "SELECT user_id, lesson_id, position, points FROM user_lessons
         WHERE user_id = ?1 AND lesson_id = ?2",
        params![user_id, lesson_id],
        progress_from_row,
    )
    .optional()
}

fn conversion_error(
    idx: usize,
    e: impl Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, e.into())
}

fn json_column<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let text: String = row.get(idx)?;
    serde_json::from_str(&text).map_err(|e| conversion_error(idx, e))
}

/// A unit enum stored as its serde name, e.g. `Cloud Concepts`.
fn label_column<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let label: String = row.get(idx)?;
    serde_json::from_value(serde_json::Value::String(label)).map_err(|e| conversion_error(idx, e))
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    let role: String = row.get(1)?;
    Ok(User {
        id: row.get(0)?,
        role: role.parse().map_err(|e: String| conversion_error(1, e))?,
        tries: row.get(2)?,
    })
}

fn question_from_row(row: &Row<'_>) -> rusqlite::Result<Question> {
    Ok(Question {
        id: row.get(0)?,
        question: row.get(1)?,
        options: json_column(row, 2)?,
        correct_indexes: json_column(row, 3)?,
        explanation: row.get(4)?,
        category: label_column(row, 5)?,
        difficulty: row.get(6)?,
    })
}

fn progress_from_row(row: &Row<'_>) -> rusqlite::Result<UserLessonProgress> {
    Ok(UserLessonProgress {
        user_id: row.get(0)?,
        lesson_id: row.get(1)?,
        position: row.get(2)?,
        points: row.get(3)?,
    })
}

fn exam_result_from_row(row: &Row<'_>) -> rusqlite::Result<ExamResult> {
    Ok(ExamResult {
        id: row.get(0)?,
        user_id: row.get(1)?,
        score: row.get(2)?,
        total_questions: row.get(3)?,
        duration_seconds: row.get(4)?,
        submitted_at: row.get(5)?,
        answers: json_column(row, 6)?,
    })
}
