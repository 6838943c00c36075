mod api;
mod exam_assembly;
mod flashcards;
mod history;
mod lesson_runner;
mod mock_exam;
mod review_store;
mod utils;

#[cfg(target_arch = "wasm32")]
mod bindings;
#[cfg(test)]
pub(crate) mod test_support;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

pub use api::{ApiConfig, ApiError, ExamApi, HttpBackend, LessonApi};
pub use exam_assembly::assemble_exam;
pub use flashcards::{CategoryFilter, FlashcardEvent, FlashcardReviewer, ReviewSummary};
pub use history::{ExamHistory, HistoryEvent, HistoryStats, RESULTS_PER_PAGE};
pub use lesson_runner::{Advance, AdvanceStep, LessonError, LessonRunner};
pub use mock_exam::{
    ExamConfig, ExamEvent, ExamPhase, MockExam, fetch_pool, format_time, save_attempt,
    spend_last_try,
};
pub use review_store::{
    KeyValueStore, MemoryStorage, REVIEW_PROGRESS_KEY, ReviewProgressStore, StoreError,
};
pub use utils::seeded_rng;

/// Session state that only changes by folding events into it.
pub trait AppState: Sized {
    type Event;

    fn apply_event(self, event: &Self::Event) -> Self;

    fn apply_in_place(&mut self, event: &Self::Event)
    where
        Self: Default,
    {
        let state = std::mem::take(self);
        *self = state.apply_event(event);
    }
}

#[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
pub fn get_app_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
