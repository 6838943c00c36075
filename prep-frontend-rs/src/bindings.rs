//! JS-facing wrappers around the engines.
//!
//! Each session keeps its state in a `RefCell`. Never hold a borrow across an
//! `.await`: JS can call back into the same session while a request is in
//! flight, and a live borrow would then panic.

use std::cell::RefCell;
use std::sync::LazyLock;

use exam_utils::{
    Feedback, FlashcardCategory, Lesson, ReviewStatus, Role, StepAnswer, User,
};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use wasm_bindgen::prelude::*;

use crate::api::{ApiConfig, ApiError, HttpBackend, LessonApi};
use crate::flashcards::{CategoryFilter, FlashcardEvent, FlashcardReviewer};
use crate::history::{ExamHistory, HistoryEvent};
use crate::lesson_runner::{AdvanceStep, LessonError, LessonRunner};
use crate::mock_exam::{self, ExamConfig, ExamEvent, ExamPhase, MockExam};
use crate::review_store::{LocalStorage, ReviewProgressStore};
use crate::{AppState, utils};

// putting this inside LOGGER prevents us from accidentally initializing the logger more than once
#[allow(clippy::declare_interior_mutable_const)]
const LOGGER: LazyLock<()> = LazyLock::new(|| {
    utils::set_panic_hook();

    wasm_logger::init(wasm_logger::Config::default());
    log::info!("Logging initialized");
});

fn init_logging() {
    #[allow(clippy::borrow_interior_mutable_const)]
    *LOGGER;
}

fn backend(base_url: String, access_token: Option<String>) -> HttpBackend {
    init_logging();
    HttpBackend::new(ApiConfig {
        base_url,
        access_token,
    })
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value).map_err(JsValue::from)
}

fn js_error(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

#[wasm_bindgen]
pub struct MockExamSession {
    exam: RefCell<MockExam>,
    rng: RefCell<ChaCha8Rng>,
    api: HttpBackend,
}

#[wasm_bindgen]
impl MockExamSession {
    #[wasm_bindgen(constructor)]
    pub fn new(base_url: String, access_token: Option<String>, user: User) -> Self {
        Self {
            exam: RefCell::new(MockExam::new(user, ExamConfig::default())),
            rng: RefCell::new(utils::seeded_rng()),
            api: backend(base_url, access_token),
        }
    }

    pub async fn load_pool(&self) {
        if let Some(event) = mock_exam::fetch_pool(&self.api).await {
            self.exam.borrow_mut().apply_in_place(&event);
        }
    }

    pub async fn start(&self) {
        let event = {
            let mut rng = self.rng.borrow_mut();
            self.exam.borrow().request_start(&mut *rng)
        };
        let Some(event) = event else {
            return;
        };
        mock_exam::spend_last_try(&self.api, &event).await;
        self.exam.borrow_mut().apply_in_place(&event);
    }

    pub fn toggle_option(&self, option: usize) {
        self.exam
            .borrow_mut()
            .apply_in_place(&ExamEvent::ToggleOption(option));
    }

    pub fn next(&self) {
        self.apply(ExamEvent::Next);
    }

    /// Call once per second. Returns whether the timer should keep running.
    pub fn tick(&self) -> bool {
        self.apply(ExamEvent::Tick);
        self.exam.borrow().timer_running()
    }

    pub fn dismiss_upgrade_prompt(&self) {
        self.exam
            .borrow_mut()
            .apply_in_place(&ExamEvent::DismissUpgradePrompt);
    }

    pub fn snapshot(&self) -> Result<JsValue, JsValue> {
        to_js(&*self.exam.borrow())
    }

    fn apply(&self, event: ExamEvent) {
        let attempt = {
            let mut exam = self.exam.borrow_mut();
            exam.apply_in_place(&event);
            if exam.phase() != ExamPhase::Results {
                return;
            }
            exam.take_pending_attempt()
        };
        let Some(attempt) = attempt else {
            return;
        };
        let api = self.api.clone();
        wasm_bindgen_futures::spawn_local(async move {
            mock_exam::save_attempt(&api, &attempt).await;
        });
    }
}

#[wasm_bindgen]
pub struct LessonSession {
    runner: RefCell<LessonRunner>,
    api: HttpBackend,
}

#[wasm_bindgen]
impl LessonSession {
    pub async fn open(base_url: String, access_token: Option<String>, lesson: Lesson) -> Self {
        let api = backend(base_url, access_token);
        let runner = LessonRunner::open(lesson, &api).await;
        Self {
            runner: RefCell::new(runner),
            api,
        }
    }

    pub fn check(&self, answer: StepAnswer) -> Result<bool, JsValue> {
        self.runner.borrow_mut().check(&answer).map_err(js_error)
    }

    pub fn can_continue(&self) -> bool {
        self.runner.borrow().can_continue()
    }

    pub async fn advance(&self) -> Result<JsValue, JsValue> {
        let step = self.runner.borrow_mut().begin_advance().map_err(js_error)?;
        let outcome = match step {
            AdvanceStep::Revisited => crate::lesson_runner::Advance::Revisited,
            AdvanceStep::NeedsSave(request) => {
                let saved = self.api.save_lesson_progress(&request).await;
                self.runner.borrow_mut().finish_advance(saved)
            }
        };
        to_js(&outcome)
    }

    pub fn back(&self) {
        self.runner.borrow_mut().back();
    }

    pub fn go_to(&self, index: usize) -> Result<(), JsValue> {
        self.runner.borrow_mut().go_to(index).map_err(js_error)
    }

    pub fn request_reset(&self) {
        self.runner.borrow_mut().request_reset();
    }

    pub fn cancel_reset(&self) {
        self.runner.borrow_mut().cancel_reset();
    }

    pub async fn confirm_reset(&self) -> Result<(), JsValue> {
        let lesson_id = self
            .runner
            .borrow_mut()
            .take_reset_request()
            .map_err(js_error)?;
        let reset = self.api.reset_lesson_progress(&lesson_id).await;
        self.runner
            .borrow_mut()
            .finish_reset(reset)
            .map_err(|e: LessonError| js_error(e))
    }

    pub fn snapshot(&self) -> Result<JsValue, JsValue> {
        to_js(&*self.runner.borrow())
    }
}

#[wasm_bindgen]
pub struct FlashcardSession {
    reviewer: RefCell<FlashcardReviewer>,
    rng: RefCell<ChaCha8Rng>,
    store: ReviewProgressStore<LocalStorage>,
    api: HttpBackend,
}

#[wasm_bindgen]
impl FlashcardSession {
    #[wasm_bindgen(constructor)]
    pub fn new(base_url: String, access_token: Option<String>, role: Role) -> Result<Self, JsValue> {
        let api = backend(base_url, access_token);
        let store = ReviewProgressStore::new(LocalStorage::open().map_err(js_error)?);
        let reviewer = FlashcardReviewer::new(role)
            .apply_event(&FlashcardEvent::ProgressLoaded(store.load()));
        Ok(Self {
            reviewer: RefCell::new(reviewer),
            rng: RefCell::new(utils::seeded_rng()),
            store,
            api,
        })
    }

    pub async fn load(&self) -> Result<(), JsValue> {
        let cards = self.api.fetch_flashcards().await.map_err(js_error)?;
        self.apply(FlashcardEvent::Loaded(cards));
        Ok(())
    }

    pub fn select_category(&self, category: FlashcardCategory) {
        self.apply(FlashcardEvent::SelectCategory(CategoryFilter::Only(category)));
    }

    pub fn show_all_categories(&self) {
        self.apply(FlashcardEvent::SelectCategory(CategoryFilter::All));
    }

    pub fn next(&self) {
        self.apply(FlashcardEvent::Next);
    }

    pub fn previous(&self) {
        self.apply(FlashcardEvent::Previous);
    }

    pub fn random_pick(&self) {
        let event = {
            let mut rng = self.rng.borrow_mut();
            self.reviewer.borrow().random_pick_event(&mut *rng)
        };
        if let Some(event) = event {
            self.apply(event);
        }
    }

    pub fn flip(&self) {
        self.apply(FlashcardEvent::Flip);
    }

    pub fn mark(&self, card_id: u32, status: ReviewStatus) -> Result<(), JsValue> {
        self.apply(FlashcardEvent::Mark { card_id, status });
        self.store
            .save(self.reviewer.borrow().progress())
            .map_err(js_error)
    }

    pub fn snapshot(&self) -> Result<JsValue, JsValue> {
        let reviewer = self.reviewer.borrow();
        to_js(&FlashcardSnapshot {
            current: reviewer.current_card(),
            flipped: reviewer.is_flipped(),
            cursor: reviewer.cursor(),
            filtered_len: reviewer.filtered_len(),
            filter: reviewer.filter(),
            status: reviewer
                .current_card()
                .map(|card| reviewer.status(card.id)),
            summary: reviewer.summary(),
            upsell: reviewer.upsell_visible(),
        })
    }

    fn apply(&self, event: FlashcardEvent) {
        self.reviewer.borrow_mut().apply_in_place(&event);
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FlashcardSnapshot<'a> {
    current: Option<&'a exam_utils::Flashcard>,
    flipped: bool,
    cursor: usize,
    filtered_len: usize,
    filter: CategoryFilter,
    status: Option<ReviewStatus>,
    summary: crate::flashcards::ReviewSummary,
    upsell: bool,
}

#[wasm_bindgen]
pub struct HistorySession {
    history: RefCell<ExamHistory>,
    api: HttpBackend,
}

#[wasm_bindgen]
impl HistorySession {
    #[wasm_bindgen(constructor)]
    pub fn new(base_url: String, access_token: Option<String>) -> Self {
        Self {
            history: RefCell::new(ExamHistory::default()),
            api: backend(base_url, access_token),
        }
    }

    pub async fn load(&self) -> Result<(), JsValue> {
        let results = self.api.fetch_exam_history().await.map_err(js_error)?;
        self.apply(HistoryEvent::Loaded(results));
        Ok(())
    }

    pub fn filter_score(&self, score: Option<u32>) {
        self.apply(HistoryEvent::FilterScore(score));
    }

    /// `yyyy-mm-dd`, or nothing to clear the filter.
    pub fn filter_date(&self, day: Option<String>) -> Result<(), JsValue> {
        let day = day
            .map(|day| day.parse::<chrono::NaiveDate>())
            .transpose()
            .map_err(js_error)?;
        self.apply(HistoryEvent::FilterDate(day));
        Ok(())
    }

    pub fn go_to_page(&self, page: usize) {
        self.apply(HistoryEvent::GoToPage(page));
    }

    pub fn toggle_expanded(&self, id: i64) {
        self.apply(HistoryEvent::ToggleExpanded(id));
    }

    pub fn snapshot(&self) -> Result<JsValue, JsValue> {
        let history = self.history.borrow();
        to_js(&HistorySnapshot {
            stats: history.stats(),
            score_options: history.score_options(),
            date_options: history.date_options(),
            page: history.page(),
            total_pages: history.total_pages(),
            results: history.current_page(),
        })
    }

    fn apply(&self, event: HistoryEvent) {
        self.history.borrow_mut().apply_in_place(&event);
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HistorySnapshot<'a> {
    stats: crate::history::HistoryStats,
    score_options: Vec<u32>,
    date_options: Vec<chrono::NaiveDate>,
    page: usize,
    total_pages: usize,
    results: Vec<&'a exam_utils::ExamResult>,
}

#[wasm_bindgen]
pub async fn fetch_lessons(
    base_url: String,
    access_token: Option<String>,
    level: Option<String>,
) -> Result<JsValue, JsValue> {
    let lessons = backend(base_url, access_token)
        .fetch_lessons(level.as_deref())
        .await
        .map_err(js_error)?;
    to_js(&lessons)
}

#[wasm_bindgen]
pub async fn submit_feedback(
    base_url: String,
    access_token: Option<String>,
    rating: u8,
    feedback: String,
) -> Result<(), JsValue> {
    let feedback = Feedback { rating, feedback };
    if feedback.is_empty() {
        return Err(JsValue::from_str("a rating or a comment is required"));
    }
    backend(base_url, access_token)
        .save_feedback(&feedback)
        .await
        .map_err(|e: ApiError| js_error(e))
}
