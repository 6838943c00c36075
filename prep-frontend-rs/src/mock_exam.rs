//! # Mock exam
//! A timed, question-by-question practice exam.
//!
//! The session is a plain value. Everything that happens to it is an
//! [`ExamEvent`], and [`MockExam::apply_event`] folds the event into a new
//! state. Anything random or remote (drawing the question set, resetting the
//! server-side tries counter, saving the attempt) happens outside the fold,
//! so a sequence of events always replays to the same session.
//!
//! ```text
//! NotStarted --start--> InProgress --next past last / timer at 0--> Results
//!                           ^                                          |
//!                           +------------------start-------------------+
//! ```

use exam_utils::{
    AnswerRecord, ExamAttempt, MAX_SELECTED, Question, Role, User, is_correct_selection,
};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::api::ExamApi;
use crate::exam_assembly::assemble_exam;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExamConfig {
    pub question_count: usize,
    pub duration_seconds: u32,
}

impl Default for ExamConfig {
    fn default() -> Self {
        Self {
            question_count: 65,
            duration_seconds: 90 * 60,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum ExamPhase {
    #[default]
    NotStarted,
    InProgress,
    Results,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum ExamEvent {
    PoolLoaded(Vec<Question>),
    /// A basic user without tries asked to start.
    UpgradeRequired,
    DismissUpgradePrompt,
    Started {
        questions: Vec<Question>,
        consumed_last_try: bool,
    },
    ToggleOption(usize),
    Next,
    /// One wall-clock second passed.
    Tick,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MockExam {
    config: ExamConfig,
    user: Option<User>,
    pool: Vec<Question>,
    phase: ExamPhase,
    questions: Vec<Question>,
    selections: Vec<Vec<usize>>,
    current_index: usize,
    seconds_left: u32,
    upgrade_prompt: bool,
    pending_attempt: Option<ExamAttempt>,
}

impl MockExam {
    pub fn new(user: User, config: ExamConfig) -> Self {
        Self {
            config,
            user: Some(user),
            seconds_left: config.duration_seconds,
            ..Default::default()
        }
    }

    pub fn phase(&self) -> ExamPhase {
        self.phase
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn pool(&self) -> &[Question] {
        &self.pool
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_question(&self) -> Option<&Question> {
        match self.phase {
            ExamPhase::InProgress => self.questions.get(self.current_index),
            _ => None,
        }
    }

    pub fn current_selection(&self) -> &[usize] {
        self.selections
            .get(self.current_index)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn is_last_question(&self) -> bool {
        self.current_index + 1 >= self.questions.len()
    }

    pub fn can_advance(&self) -> bool {
        self.phase == ExamPhase::InProgress && !self.current_selection().is_empty()
    }

    pub fn seconds_left(&self) -> u32 {
        self.seconds_left
    }

    /// Whoever drives the one-second ticks stops once this turns false.
    pub fn timer_running(&self) -> bool {
        self.phase == ExamPhase::InProgress
    }

    pub fn upgrade_prompt(&self) -> bool {
        self.upgrade_prompt
    }

    pub fn is_question_correct(&self, index: usize) -> bool {
        let Some(question) = self.questions.get(index) else {
            return false;
        };
        let selected = self.selections.get(index).map(Vec::as_slice).unwrap_or(&[]);
        is_correct_selection(selected, &question.correct_indexes)
    }

    pub fn score(&self) -> u32 {
        (0..self.questions.len())
            .filter(|&index| self.is_question_correct(index))
            .count() as u32
    }

    /// Per-question breakdown, in exam order.
    pub fn answers(&self) -> Vec<AnswerRecord> {
        self.questions
            .iter()
            .enumerate()
            .map(|(index, question)| {
                let selected = self.selections.get(index).cloned().unwrap_or_default();
                AnswerRecord {
                    question_id: question.id.clone(),
                    question: question.question.clone(),
                    options: question.options.clone(),
                    correct_indexes: question.correct_indexes.clone(),
                    is_correct: is_correct_selection(&selected, &question.correct_indexes),
                    selected_indexes: selected,
                }
            })
            .collect()
    }

    pub fn elapsed_seconds(&self) -> u32 {
        self.config.duration_seconds.saturating_sub(self.seconds_left)
    }

    /// Decide what pressing "start" does. `None` means nothing happens: the
    /// pool has not arrived yet, or an exam is already running.
    ///
    /// A basic user with exactly one try left is let in and the try is
    /// consumed. Basic users with more than one try are never decremented
    /// here, which hands out one more attempt than the counter suggests.
    /// Kept as observed; see DESIGN.md.
    pub fn request_start<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<ExamEvent> {
        if self.phase == ExamPhase::InProgress {
            return None;
        }
        if self.pool.is_empty() {
            log::warn!("Mock exam start requested before any questions were loaded");
            return None;
        }

        let (role, tries) = self
            .user
            .as_ref()
            .map(|user| (user.role, user.tries))
            .unwrap_or((Role::Basic, 0));

        if role == Role::Basic && tries == 0 {
            return Some(ExamEvent::UpgradeRequired);
        }

        Some(ExamEvent::Started {
            questions: assemble_exam(&self.pool, self.config.question_count, rng),
            consumed_last_try: role == Role::Basic && tries == 1,
        })
    }

    /// Hand out the finished attempt. Yields it once per session.
    pub fn take_pending_attempt(&mut self) -> Option<ExamAttempt> {
        self.pending_attempt.take()
    }

    fn finish(&mut self) {
        self.phase = ExamPhase::Results;
        self.pending_attempt = Some(ExamAttempt {
            user_id: self
                .user
                .as_ref()
                .map(|user| user.id.clone())
                .unwrap_or_default(),
            score: self.score(),
            total_questions: self.questions.len() as u32,
            duration_seconds: self.elapsed_seconds(),
            answers: self.answers(),
        });
    }

    fn toggle_option(&mut self, option: usize) {
        let Some(question) = self.questions.get(self.current_index) else {
            return;
        };
        if option >= question.options.len() {
            return;
        }
        let Some(selected) = self.selections.get_mut(self.current_index) else {
            return;
        };
        if let Some(position) = selected.iter().position(|&i| i == option) {
            selected.remove(position);
        } else if selected.len() < MAX_SELECTED {
            selected.push(option);
        }
    }
}

impl AppState for MockExam {
    type Event = ExamEvent;

    fn apply_event(mut self, event: &ExamEvent) -> Self {
        match event {
            ExamEvent::PoolLoaded(questions) => {
                self.pool = questions.clone();
            }
            ExamEvent::UpgradeRequired => {
                if self.phase != ExamPhase::InProgress {
                    self.upgrade_prompt = true;
                }
            }
            ExamEvent::DismissUpgradePrompt => {
                self.upgrade_prompt = false;
            }
            ExamEvent::Started {
                questions,
                consumed_last_try,
            } => {
                if self.phase == ExamPhase::InProgress {
                    log::warn!("Ignoring start while an exam is already running");
                    return self;
                }
                if *consumed_last_try {
                    if let Some(user) = self.user.as_mut() {
                        user.tries = 0;
                    }
                }
                self.phase = ExamPhase::InProgress;
                self.selections = vec![Vec::new(); questions.len()];
                self.questions = questions.clone();
                self.current_index = 0;
                self.seconds_left = self.config.duration_seconds;
                self.upgrade_prompt = false;
                self.pending_attempt = None;
            }
            ExamEvent::ToggleOption(option) => {
                if self.phase == ExamPhase::InProgress {
                    self.toggle_option(*option);
                }
            }
            ExamEvent::Next => {
                if !self.can_advance() {
                    return self;
                }
                if self.is_last_question() {
                    self.finish();
                } else {
                    self.current_index += 1;
                }
            }
            ExamEvent::Tick => {
                if self.phase != ExamPhase::InProgress {
                    return self;
                }
                if self.seconds_left <= 1 {
                    self.seconds_left = 0;
                    self.finish();
                } else {
                    self.seconds_left -= 1;
                }
            }
        }
        self
    }
}

impl MockExam {
    /// Fetch the exam pool. On failure the pool stays as it was and the
    /// error is only logged.
    pub async fn load_pool<A: ExamApi>(self, api: &A) -> Self {
        match fetch_pool(api).await {
            Some(event) => self.apply_event(&event),
            None => self,
        }
    }

    pub async fn start_exam<A: ExamApi, R: Rng + ?Sized>(self, api: &A, rng: &mut R) -> Self {
        let Some(event) = self.request_start(rng) else {
            return self;
        };
        spend_last_try(api, &event).await;
        self.apply_event(&event)
    }

    /// Send the finished attempt, if there is one still unsent. Failures are
    /// logged and dropped; the results stay on screen either way.
    pub async fn persist_results<A: ExamApi>(&mut self, api: &A) -> bool {
        match self.take_pending_attempt() {
            Some(attempt) => save_attempt(api, &attempt).await,
            None => false,
        }
    }
}

/// The [`ExamEvent::PoolLoaded`] for a fresh exam pool, or `None` (logged)
/// when it could not be fetched.
pub async fn fetch_pool<A: ExamApi>(api: &A) -> Option<ExamEvent> {
    match api.fetch_question_pool(true).await {
        Ok(questions) => {
            log::info!("Loaded {} exam questions", questions.len());
            Some(ExamEvent::PoolLoaded(questions))
        }
        Err(e) => {
            log::error!("Failed to fetch questions: {e}");
            None
        }
    }
}

/// Zero the server-side tries counter when `event` starts the user's last
/// try. Must run before the event is applied.
pub async fn spend_last_try<A: ExamApi>(api: &A, event: &ExamEvent) -> bool {
    let ExamEvent::Started {
        consumed_last_try: true,
        ..
    } = event
    else {
        return false;
    };
    if let Err(e) = api.reset_tries().await {
        log::error!("Error resetting tries: {e}");
    }
    true
}

pub async fn save_attempt<A: ExamApi>(api: &A, attempt: &ExamAttempt) -> bool {
    match api.save_exam(attempt).await {
        Ok(saved) => {
            log::info!(
                "Saved exam attempt {} ({}/{})",
                saved.id,
                saved.score,
                saved.total_questions
            );
            true
        }
        Err(e) => {
            log::error!("Error saving results: {e}");
            false
        }
    }
}

/// `m:ss`, e.g. `90:00` or `4:05`.
pub fn format_time(seconds: u32) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}
