use serde::{Deserialize, Serialize};

use crate::{Flashcard, Lesson, Question, ValidationError};

/// Authored content imported into the stores in one go.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContentBundle {
    #[serde(default)]
    pub questions: Vec<Question>,
    #[serde(default)]
    pub lessons: Vec<Lesson>,
    #[serde(default)]
    pub flashcards: Vec<Flashcard>,
}

impl ContentBundle {
    pub fn validate(&self) -> Result<(), ValidationError> {
        for question in &self.questions {
            question.validate()?;
        }
        for lesson in &self.lessons {
            lesson.validate()?;
        }
        Ok(())
    }
}
