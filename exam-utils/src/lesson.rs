use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Points credited for each newly completed lesson step.
pub const POINTS_PER_STEP: u32 = 100;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(target_arch = "wasm32", derive(tsify::Tsify))]
#[cfg_attr(target_arch = "wasm32", tsify(into_wasm_abi, from_wasm_abi))]
pub struct Lesson {
    /// `<LEVEL>-<n>`, e.g. `A1-3`.
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub steps: Vec<LessonStep>,
}

impl Lesson {
    /// The level prefix of the id (`A1` for `A1-3`).
    pub fn level(&self) -> Option<&str> {
        lesson_level(&self.id)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.level().is_none() {
            return Err(ValidationError::LessonId {
                id: self.id.clone(),
            });
        }
        if self.steps.is_empty() {
            return Err(ValidationError::EmptyLesson {
                id: self.id.clone(),
            });
        }
        for (step, lesson_step) in self.steps.iter().enumerate() {
            if let Err(reason) = lesson_step.validate() {
                return Err(ValidationError::Step {
                    id: self.id.clone(),
                    step,
                    reason,
                });
            }
        }
        Ok(())
    }
}

pub fn lesson_level(lesson_id: &str) -> Option<&str> {
    let (level, number) = lesson_id.split_once('-')?;
    if level.is_empty() || number.is_empty() {
        return None;
    }
    Some(level)
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(target_arch = "wasm32", derive(tsify::Tsify))]
#[cfg_attr(target_arch = "wasm32", tsify(into_wasm_abi, from_wasm_abi))]
#[serde(tag = "type", content = "content", rename_all = "kebab-case")]
pub enum LessonStep {
    Theory(Theory),
    Exercise(Exercise),
}

impl LessonStep {
    fn validate(&self) -> Result<(), String> {
        match self {
            LessonStep::Theory(_) => Ok(()),
            LessonStep::Exercise(Exercise::Input { answer, .. }) => {
                if answer.trim().is_empty() {
                    return Err("input exercise has an empty answer".to_string());
                }
                Ok(())
            }
            LessonStep::Exercise(Exercise::MultipleChoice {
                options,
                correct_option,
                ..
            }) => {
                if !options.contains(correct_option) {
                    return Err(format!(
                        "correct option {correct_option:?} is not among the options"
                    ));
                }
                Ok(())
            }
            LessonStep::Exercise(Exercise::Matching { pairs, .. }) => {
                if pairs.is_empty() {
                    return Err("matching exercise has no pairs".to_string());
                }
                Ok(())
            }
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(target_arch = "wasm32", derive(tsify::Tsify))]
#[cfg_attr(target_arch = "wasm32", tsify(into_wasm_abi, from_wasm_abi))]
pub struct Theory {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(target_arch = "wasm32", derive(tsify::Tsify))]
#[cfg_attr(target_arch = "wasm32", tsify(into_wasm_abi, from_wasm_abi))]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Exercise {
    Input {
        question: String,
        answer: String,
    },
    #[serde(rename_all = "camelCase")]
    MultipleChoice {
        question: String,
        options: Vec<String>,
        correct_option: String,
    },
    Matching {
        question: String,
        pairs: Vec<MatchingPair>,
    },
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(target_arch = "wasm32", derive(tsify::Tsify))]
#[cfg_attr(target_arch = "wasm32", tsify(into_wasm_abi, from_wasm_abi))]
pub struct MatchingPair {
    pub left: String,
    pub right: String,
}

/// What the learner submitted for an exercise.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(target_arch = "wasm32", derive(tsify::Tsify))]
#[cfg_attr(target_arch = "wasm32", tsify(into_wasm_abi, from_wasm_abi))]
#[serde(tag = "type", content = "value", rename_all = "kebab-case")]
pub enum StepAnswer {
    Input(String),
    MultipleChoice(String),
    /// left item -> right item the learner dropped onto it
    Matching(BTreeMap<String, String>),
}

impl Exercise {
    pub fn question(&self) -> &str {
        match self {
            Exercise::Input { question, .. }
            | Exercise::MultipleChoice { question, .. }
            | Exercise::Matching { question, .. } => question,
        }
    }

    /// Compare a submission against the authored key. A submission of the
    /// wrong kind is simply wrong.
    pub fn check(&self, answer: &StepAnswer) -> bool {
        match (self, answer) {
            (Exercise::Input { answer: key, .. }, StepAnswer::Input(given)) => {
                given.trim().to_lowercase() == key.to_lowercase()
            }
            (
                Exercise::MultipleChoice { correct_option, .. },
                StepAnswer::MultipleChoice(chosen),
            ) => chosen == correct_option,
            (Exercise::Matching { pairs, .. }, StepAnswer::Matching(assigned)) => pairs
                .iter()
                .all(|pair| assigned.get(&pair.left) == Some(&pair.right)),
            _ => false,
        }
    }
}

/// Per-user, per-lesson progress row. Unique on `(user_id, lesson_id)`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(target_arch = "wasm32", derive(tsify::Tsify))]
#[cfg_attr(target_arch = "wasm32", tsify(into_wasm_abi, from_wasm_abi))]
#[serde(rename_all = "camelCase")]
pub struct UserLessonProgress {
    pub user_id: String,
    pub lesson_id: String,
    pub position: u32,
    pub points: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LessonProgressRequest {
    pub lesson_id: String,
    /// Position the client believes is stored. When present and stale the
    /// save is refused and the current row is returned instead.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_position: Option<u32>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserLessonResponse {
    pub lesson: Option<UserLessonProgress>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResetLessonResponse {
    pub lesson: UserLessonProgress,
    pub reset: bool,
}
