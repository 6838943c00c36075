//! Walks a learner through a lesson's steps.
//!
//! Two indexes are tracked. `view_index` is the step on screen and
//! `unlocked_index` is the furthest step the progress store has credited.
//! Steps before `unlocked_index` can be revisited freely; moving past it
//! requires passing the step and a round trip to the store, whose answer
//! replaces whatever we believed locally.
//!
//! When a save fails the learner still moves on, and the runner remembers it
//! is ahead of the store. Until the store catches up, saves are sent without
//! an expected position and a store row behind us never moves us back.

use exam_utils::{Exercise, Lesson, LessonProgressRequest, LessonStep, StepAnswer, UserLessonProgress};
use serde::Serialize;

use crate::api::{ApiError, LessonApi};

#[derive(Debug, thiserror::Error)]
pub enum LessonError {
    #[error("the lesson is already complete")]
    Completed,
    #[error("the current step has to be answered correctly first")]
    CheckRequired,
    #[error("the current step has nothing to check")]
    NothingToCheck,
    #[error("step {index} is locked, furthest unlocked step is {unlocked}")]
    Locked { index: usize, unlocked: usize },
    #[error("reset was not requested")]
    ResetNotRequested,
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// What advancing needs after the local checks pass.
#[derive(Debug, PartialEq, Eq)]
pub enum AdvanceStep {
    /// Moved forward through already-credited steps; nothing to save.
    Revisited,
    /// Moving past the furthest step. Send this and hand the outcome to
    /// [`LessonRunner::finish_advance`].
    NeedsSave(LessonProgressRequest),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Advance {
    Revisited,
    /// The store credited the step.
    Saved,
    /// The store had moved on without us; its row was adopted.
    Resynced,
    /// The store could not be reached. Moved forward locally, no points.
    LocalOnly,
}

#[derive(Clone, Debug, Serialize)]
pub struct LessonRunner {
    lesson: Lesson,
    view_index: usize,
    unlocked_index: usize,
    points: u32,
    checked: Option<bool>,
    reset_pending: bool,
    /// Steps were unlocked locally that the store has not credited.
    ahead_of_store: bool,
}

impl LessonRunner {
    /// Start from a stored progress row, or from the beginning without one.
    pub fn resume(lesson: Lesson, progress: Option<UserLessonProgress>) -> Self {
        let mut runner = Self {
            lesson,
            view_index: 0,
            unlocked_index: 0,
            points: 0,
            checked: None,
            reset_pending: false,
            ahead_of_store: false,
        };
        if let Some(progress) = progress {
            runner.adopt(&progress);
        }
        runner
    }

    pub async fn open<A: LessonApi>(lesson: Lesson, api: &A) -> Self {
        let progress = match api.fetch_user_lesson(&lesson.id).await {
            Ok(progress) => progress,
            Err(e) => {
                log::error!("Failed to load progress for lesson {}: {e}", lesson.id);
                None
            }
        };
        Self::resume(lesson, progress)
    }

    pub fn lesson(&self) -> &Lesson {
        &self.lesson
    }

    pub fn view_index(&self) -> usize {
        self.view_index
    }

    pub fn unlocked_index(&self) -> usize {
        self.unlocked_index
    }

    pub fn points(&self) -> u32 {
        self.points
    }

    pub fn step_count(&self) -> usize {
        self.lesson.steps.len()
    }

    pub fn current_step(&self) -> Option<&LessonStep> {
        self.lesson.steps.get(self.view_index)
    }

    /// Past the last step. Nothing moves forward from here.
    pub fn is_complete(&self) -> bool {
        self.view_index >= self.step_count()
    }

    /// Looking at a step that was already credited.
    pub fn is_review_mode(&self) -> bool {
        self.view_index < self.unlocked_index
    }

    pub fn last_check(&self) -> Option<bool> {
        self.checked
    }

    pub fn reset_pending(&self) -> bool {
        self.reset_pending
    }

    pub fn is_ahead_of_store(&self) -> bool {
        self.ahead_of_store
    }

    fn current_exercise(&self) -> Option<&Exercise> {
        match self.current_step()? {
            LessonStep::Exercise(exercise) => Some(exercise),
            LessonStep::Theory(_) => None,
        }
    }

    pub fn check(&mut self, answer: &StepAnswer) -> Result<bool, LessonError> {
        if self.is_complete() {
            return Err(LessonError::Completed);
        }
        let correct = self
            .current_exercise()
            .ok_or(LessonError::NothingToCheck)?
            .check(answer);
        self.checked = Some(correct);
        Ok(correct)
    }

    pub fn can_continue(&self) -> bool {
        if self.is_complete() {
            return false;
        }
        self.is_review_mode() || self.current_exercise().is_none() || self.checked == Some(true)
    }

    pub fn back(&mut self) {
        if self.view_index > 0 {
            self.view_index -= 1;
            self.checked = None;
        }
    }

    pub fn go_to(&mut self, index: usize) -> Result<(), LessonError> {
        if index > self.unlocked_index {
            return Err(LessonError::Locked {
                index,
                unlocked: self.unlocked_index,
            });
        }
        self.view_index = index;
        self.checked = None;
        Ok(())
    }

    pub fn begin_advance(&mut self) -> Result<AdvanceStep, LessonError> {
        if self.is_complete() {
            return Err(LessonError::Completed);
        }
        if !self.can_continue() {
            return Err(LessonError::CheckRequired);
        }
        if self.is_review_mode() {
            self.view_index += 1;
            self.checked = None;
            return Ok(AdvanceStep::Revisited);
        }
        // our index is not the store's, so there is nothing to compare against
        let expected_position = if self.ahead_of_store {
            None
        } else {
            Some(self.unlocked_index as u32)
        };
        Ok(AdvanceStep::NeedsSave(LessonProgressRequest {
            lesson_id: self.lesson.id.clone(),
            expected_position,
        }))
    }

    pub fn finish_advance(&mut self, saved: Result<UserLessonProgress, ApiError>) -> Advance {
        self.checked = None;
        match saved {
            Ok(progress) => {
                self.adopt_after_save(&progress);
                Advance::Saved
            }
            Err(ApiError::Conflict(progress)) => {
                log::warn!(
                    "Lesson {} progress moved to {} elsewhere, adopting it",
                    progress.lesson_id,
                    progress.position
                );
                self.adopt_after_save(&progress);
                Advance::Resynced
            }
            Err(e) => {
                log::error!("Error saving progress for lesson {}: {e}", self.lesson.id);
                self.unlocked_index = (self.unlocked_index + 1).min(self.step_count());
                self.view_index = self.unlocked_index;
                self.ahead_of_store = true;
                Advance::LocalOnly
            }
        }
    }

    pub async fn advance<A: LessonApi>(&mut self, api: &A) -> Result<Advance, LessonError> {
        match self.begin_advance()? {
            AdvanceStep::Revisited => Ok(Advance::Revisited),
            AdvanceStep::NeedsSave(request) => {
                let saved = api.save_lesson_progress(&request).await;
                Ok(self.finish_advance(saved))
            }
        }
    }

    /// First half of a reset. Nothing is sent until [`Self::confirm_reset`].
    pub fn request_reset(&mut self) {
        self.reset_pending = true;
    }

    pub fn cancel_reset(&mut self) {
        self.reset_pending = false;
    }

    /// Take the pending confirmation, if any. Used by callers that issue the
    /// reset call themselves.
    pub fn take_reset_request(&mut self) -> Result<String, LessonError> {
        if !std::mem::take(&mut self.reset_pending) {
            return Err(LessonError::ResetNotRequested);
        }
        Ok(self.lesson.id.clone())
    }

    pub fn finish_reset(&mut self, reset: Result<UserLessonProgress, ApiError>) -> Result<(), LessonError> {
        let progress = reset?;
        self.adopt(&progress);
        self.view_index = 0;
        self.checked = None;
        log::info!("Reset progress for lesson {}", self.lesson.id);
        Ok(())
    }

    pub async fn confirm_reset<A: LessonApi>(&mut self, api: &A) -> Result<(), LessonError> {
        let lesson_id = self.take_reset_request()?;
        let reset = api.reset_lesson_progress(&lesson_id).await;
        self.finish_reset(reset)
    }

    fn adopt(&mut self, progress: &UserLessonProgress) {
        self.unlocked_index = (progress.position as usize).min(self.step_count());
        self.view_index = self.unlocked_index;
        self.points = progress.points;
        self.ahead_of_store = false;
    }

    /// Take the store's answer to a save. While ahead of the store, the step
    /// being passed still unlocks even if the store credited less.
    fn adopt_after_save(&mut self, progress: &UserLessonProgress) {
        let was_ahead = self.ahead_of_store;
        let next = (self.unlocked_index + 1).min(self.step_count());
        self.adopt(progress);
        if was_ahead && self.unlocked_index < next {
            self.unlocked_index = next;
            self.view_index = next;
            self.ahead_of_store = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use exam_utils::{MatchingPair, Theory};
    use futures::executor::block_on;

    use crate::test_support::FakeLessonApi;

    const LESSON_ID: &str = "A1-1";

    fn lesson() -> Lesson {
        Lesson {
            id: LESSON_ID.to_string(),
            title: "What is the cloud?".to_string(),
            description: String::new(),
            steps: vec![
                LessonStep::Theory(Theory {
                    text: "The cloud is someone else's computer.".to_string(),
                    image: None,
                }),
                LessonStep::Exercise(Exercise::Input {
                    question: "Which service gives you virtual servers?".to_string(),
                    answer: "ec2".to_string(),
                }),
                LessonStep::Exercise(Exercise::MultipleChoice {
                    question: "Which is object storage?".to_string(),
                    options: vec!["S3".to_string(), "EBS".to_string()],
                    correct_option: "S3".to_string(),
                }),
                LessonStep::Exercise(Exercise::Matching {
                    question: "Match the services".to_string(),
                    pairs: vec![
                        MatchingPair {
                            left: "Lambda".to_string(),
                            right: "Serverless compute".to_string(),
                        },
                        MatchingPair {
                            left: "RDS".to_string(),
                            right: "Managed databases".to_string(),
                        },
                    ],
                }),
            ],
        }
    }

    fn answer_for(step: &LessonStep) -> Option<StepAnswer> {
        match step {
            LessonStep::Theory(_) => None,
            LessonStep::Exercise(Exercise::Input { answer, .. }) => {
                Some(StepAnswer::Input(format!("  {}  ", answer.to_uppercase())))
            }
            LessonStep::Exercise(Exercise::MultipleChoice { correct_option, .. }) => {
                Some(StepAnswer::MultipleChoice(correct_option.clone()))
            }
            LessonStep::Exercise(Exercise::Matching { pairs, .. }) => Some(StepAnswer::Matching(
                pairs
                    .iter()
                    .map(|pair| (pair.left.clone(), pair.right.clone()))
                    .collect::<BTreeMap<_, _>>(),
            )),
        }
    }

    fn pass_current(runner: &mut LessonRunner) {
        if let Some(answer) = runner.current_step().and_then(answer_for) {
            assert!(runner.check(&answer).unwrap());
        }
    }

    #[test]
    fn opens_at_stored_position() {
        let api = FakeLessonApi::with_row(LESSON_ID, 2, 200);
        let runner = block_on(LessonRunner::open(lesson(), &api));
        assert_eq!(runner.view_index(), 2);
        assert_eq!(runner.unlocked_index(), 2);
        assert_eq!(runner.points(), 200);
    }

    #[test]
    fn opens_at_start_without_a_row() {
        let api = FakeLessonApi::default();
        let runner = block_on(LessonRunner::open(lesson(), &api));
        assert_eq!(runner.view_index(), 0);
        assert_eq!(runner.points(), 0);
    }

    #[test]
    fn stored_position_past_the_end_is_clamped() {
        let runner = LessonRunner::resume(
            lesson(),
            Some(UserLessonProgress {
                user_id: "user-1".to_string(),
                lesson_id: LESSON_ID.to_string(),
                position: 40,
                points: 4000,
            }),
        );
        assert_eq!(runner.unlocked_index(), 4);
        assert!(runner.is_complete());
    }

    #[test]
    fn exercise_blocks_until_passed() {
        let api = FakeLessonApi::with_row(LESSON_ID, 1, 100);
        let mut runner = block_on(LessonRunner::open(lesson(), &api));
        assert!(!runner.can_continue());
        assert!(matches!(
            block_on(runner.advance(&api)),
            Err(LessonError::CheckRequired)
        ));

        assert!(!runner.check(&StepAnswer::Input("s3".to_string())).unwrap());
        assert!(!runner.can_continue());

        assert!(runner.check(&StepAnswer::Input(" EC2 ".to_string())).unwrap());
        assert!(runner.can_continue());
    }

    #[test]
    fn theory_has_nothing_to_check() {
        let mut runner = LessonRunner::resume(lesson(), None);
        assert!(matches!(
            runner.check(&StepAnswer::Input("x".to_string())),
            Err(LessonError::NothingToCheck)
        ));
        assert!(runner.can_continue());
    }

    #[test]
    fn server_position_is_adopted() {
        let api = FakeLessonApi::with_row(LESSON_ID, 2, 200);
        let mut runner = block_on(LessonRunner::open(lesson(), &api));
        pass_current(&mut runner);

        assert_eq!(block_on(runner.advance(&api)).unwrap(), Advance::Saved);
        assert_eq!(runner.unlocked_index(), 3);
        assert_eq!(runner.view_index(), 3);
        assert_eq!(runner.points(), 300);
    }

    /// Answers every save with one fixed row.
    struct FixedStore(UserLessonProgress);

    impl LessonApi for FixedStore {
        async fn fetch_user_lesson(
            &self,
            _lesson_id: &str,
        ) -> Result<Option<UserLessonProgress>, ApiError> {
            Ok(None)
        }

        async fn save_lesson_progress(
            &self,
            _request: &LessonProgressRequest,
        ) -> Result<UserLessonProgress, ApiError> {
            Ok(self.0.clone())
        }

        async fn reset_lesson_progress(
            &self,
            _lesson_id: &str,
        ) -> Result<UserLessonProgress, ApiError> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn saved_row_wins_over_the_local_index() {
        let mut runner = LessonRunner::resume(lesson(), None);
        let api = FixedStore(UserLessonProgress {
            user_id: "user-1".to_string(),
            lesson_id: LESSON_ID.to_string(),
            position: 3,
            points: 300,
        });

        assert_eq!(block_on(runner.advance(&api)).unwrap(), Advance::Saved);
        assert_eq!(runner.unlocked_index(), 3);
        assert_eq!(runner.view_index(), 3);
        assert_eq!(runner.points(), 300);
    }

    #[test]
    fn save_failure_moves_on_without_points() {
        let mut runner = LessonRunner::resume(lesson(), None);
        let api = FakeLessonApi {
            fail: true,
            ..Default::default()
        };
        assert_eq!(block_on(runner.advance(&api)).unwrap(), Advance::LocalOnly);
        assert_eq!(runner.unlocked_index(), 1);
        assert_eq!(runner.points(), 0);
    }

    #[test]
    fn save_after_a_failed_one_keeps_moving_forward() {
        let mut runner = LessonRunner::resume(lesson(), None);
        let offline = FakeLessonApi {
            fail: true,
            ..Default::default()
        };
        assert_eq!(block_on(runner.advance(&offline)).unwrap(), Advance::LocalOnly);
        assert_eq!(runner.unlocked_index(), 1);
        assert!(runner.is_ahead_of_store());

        pass_current(&mut runner);
        assert!(matches!(
            runner.clone().begin_advance().unwrap(),
            AdvanceStep::NeedsSave(LessonProgressRequest {
                expected_position: None,
                ..
            })
        ));

        let api = FakeLessonApi::default();
        assert_eq!(block_on(runner.advance(&api)).unwrap(), Advance::Saved);
        assert_eq!(runner.unlocked_index(), 2);
        assert_eq!(runner.view_index(), 2);
        assert_eq!(runner.points(), 100);
        assert_eq!(api.row(LESSON_ID).unwrap().position, 1);
        assert!(runner.is_ahead_of_store());
    }

    #[test]
    fn store_catching_up_clears_the_local_lead() {
        let mut runner = LessonRunner::resume(lesson(), None);
        let offline = FakeLessonApi {
            fail: true,
            ..Default::default()
        };
        block_on(runner.advance(&offline)).unwrap();
        pass_current(&mut runner);

        // another device already credited three steps
        let api = FakeLessonApi::with_row(LESSON_ID, 2, 200);
        assert_eq!(block_on(runner.advance(&api)).unwrap(), Advance::Saved);
        assert_eq!(runner.unlocked_index(), 3);
        assert_eq!(runner.points(), 300);
        assert!(!runner.is_ahead_of_store());
    }

    #[test]
    fn stale_position_adopts_the_stored_row() {
        let api = FakeLessonApi::with_row(LESSON_ID, 1, 100);
        let mut runner = block_on(LessonRunner::open(lesson(), &api));
        pass_current(&mut runner);

        // another device got two steps further in the meantime
        api.rows.borrow_mut().get_mut(LESSON_ID).unwrap().position = 3;
        api.rows.borrow_mut().get_mut(LESSON_ID).unwrap().points = 300;

        assert_eq!(block_on(runner.advance(&api)).unwrap(), Advance::Resynced);
        assert_eq!(runner.unlocked_index(), 3);
        assert_eq!(runner.points(), 300);
        assert_eq!(api.row(LESSON_ID).unwrap().position, 3);
    }

    #[test]
    fn completed_steps_can_be_revisited_without_checks() {
        let api = FakeLessonApi::with_row(LESSON_ID, 3, 300);
        let mut runner = block_on(LessonRunner::open(lesson(), &api));
        runner.back();
        runner.back();
        assert_eq!(runner.view_index(), 1);
        assert!(runner.is_review_mode());
        assert!(runner.can_continue());

        assert_eq!(block_on(runner.advance(&api)).unwrap(), Advance::Revisited);
        assert_eq!(runner.view_index(), 2);
        assert_eq!(api.row(LESSON_ID).unwrap().position, 3);
    }

    #[test]
    fn cannot_jump_past_the_unlocked_step() {
        let mut runner = LessonRunner::resume(lesson(), None);
        assert!(matches!(
            runner.go_to(2),
            Err(LessonError::Locked {
                index: 2,
                unlocked: 0
            })
        ));
        assert!(runner.go_to(0).is_ok());
    }

    #[test]
    fn walking_every_step_completes_the_lesson() {
        let api = FakeLessonApi::default();
        let mut runner = block_on(LessonRunner::open(lesson(), &api));
        while !runner.is_complete() {
            pass_current(&mut runner);
            assert_eq!(block_on(runner.advance(&api)).unwrap(), Advance::Saved);
        }
        assert_eq!(runner.points(), 400);
        assert_eq!(api.row(LESSON_ID).unwrap().position, 4);
        assert!(!runner.can_continue());
        assert!(matches!(
            block_on(runner.advance(&api)),
            Err(LessonError::Completed)
        ));
    }

    #[test]
    fn reset_then_reopen_starts_over() {
        let api = FakeLessonApi::with_row(LESSON_ID, 3, 300);
        let mut runner = block_on(LessonRunner::open(lesson(), &api));

        runner.request_reset();
        block_on(runner.confirm_reset(&api)).unwrap();
        assert_eq!(runner.view_index(), 0);
        assert_eq!(runner.points(), 0);

        let reopened = block_on(LessonRunner::open(lesson(), &api));
        assert_eq!(reopened.view_index(), 0);
        assert_eq!(reopened.unlocked_index(), 0);
        assert_eq!(reopened.points(), 0);
    }

    #[test]
    fn reset_needs_confirmation() {
        let api = FakeLessonApi::with_row(LESSON_ID, 3, 300);
        let mut runner = block_on(LessonRunner::open(lesson(), &api));
        assert!(matches!(
            block_on(runner.confirm_reset(&api)),
            Err(LessonError::ResetNotRequested)
        ));

        runner.request_reset();
        runner.cancel_reset();
        assert!(block_on(runner.confirm_reset(&api)).is_err());
        assert_eq!(api.row(LESSON_ID).unwrap().position, 3);
    }
}
