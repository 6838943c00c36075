//! Data model shared by the exam-prep frontend engines and the backend.
//!
//! Everything here is plain data: what the API sends and receives, and what
//! the stores hold. Behaviour lives in `prep-frontend-rs` (client state
//! machines) and `prep-backend` (routes).

mod attempt;
mod content;
mod feedback;
mod flashcard;
mod lesson;
mod question;
mod user;

pub use attempt::*;
pub use content::*;
pub use feedback::*;
pub use flashcard::*;
pub use lesson::*;
pub use question::*;
pub use user::*;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("question {id} has {count} options, at least 2 are required")]
    TooFewOptions { id: String, count: usize },
    #[error("question {id} must have 1 or 2 correct indexes, found {count}")]
    CorrectIndexCount { id: String, count: usize },
    #[error("question {id} marks option {index} correct but only has {options} options")]
    CorrectIndexOutOfRange {
        id: String,
        index: usize,
        options: usize,
    },
    #[error("lesson {id} has no steps")]
    EmptyLesson { id: String },
    #[error("lesson {id} does not follow the <LEVEL>-<n> naming scheme")]
    LessonId { id: String },
    #[error("step {step} of lesson {id}: {reason}")]
    Step {
        id: String,
        step: usize,
        reason: String,
    },
}
