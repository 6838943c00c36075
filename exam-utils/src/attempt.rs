use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Percentage at or above which a mock exam counts as passed.
pub const PASS_PERCENTAGE: f64 = 70.0;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(target_arch = "wasm32", derive(tsify::Tsify))]
#[cfg_attr(target_arch = "wasm32", tsify(into_wasm_abi, from_wasm_abi))]
pub struct AnswerRecord {
    #[serde(default)]
    pub question_id: String,
    pub question: String,
    pub options: Vec<String>,
    pub correct_indexes: Vec<usize>,
    pub selected_indexes: Vec<usize>,
    pub is_correct: bool,
}

/// A finished mock exam as sent to the backend. Written once, never updated.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(target_arch = "wasm32", derive(tsify::Tsify))]
#[cfg_attr(target_arch = "wasm32", tsify(into_wasm_abi, from_wasm_abi))]
pub struct ExamAttempt {
    pub user_id: String,
    pub score: u32,
    pub total_questions: u32,
    pub duration_seconds: u32,
    pub answers: Vec<AnswerRecord>,
}

/// A stored attempt, as returned by the exam history route.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(target_arch = "wasm32", derive(tsify::Tsify))]
#[cfg_attr(target_arch = "wasm32", tsify(into_wasm_abi, from_wasm_abi))]
#[serde(rename_all = "camelCase")]
pub struct ExamResult {
    pub id: i64,
    pub user_id: String,
    pub score: u32,
    pub total_questions: u32,
    pub duration_seconds: u32,
    pub submitted_at: DateTime<Utc>,
    pub answers: Vec<AnswerRecord>,
}

impl ExamResult {
    pub fn percentage(&self) -> f64 {
        if self.total_questions == 0 {
            return 0.0;
        }
        f64::from(self.score) / f64::from(self.total_questions) * 100.0
    }

    pub fn passed(&self) -> bool {
        self.percentage() >= PASS_PERCENTAGE
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SaveExamResponse {
    pub success: bool,
    pub data: ExamResult,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExamHistoryResponse {
    pub exams: Vec<ExamResult>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(score: u32, total: u32) -> ExamResult {
        ExamResult {
            id: 1,
            user_id: "u".to_string(),
            score,
            total_questions: total,
            duration_seconds: 60,
            submitted_at: Utc::now(),
            answers: vec![],
        }
    }

    #[test]
    fn pass_threshold_is_inclusive() {
        assert!(result(7, 10).passed());
        assert!(!result(45, 65).passed());
        assert!(result(46, 65).passed());
    }

    #[test]
    fn empty_exam_never_passes() {
        assert_eq!(result(0, 0).percentage(), 0.0);
        assert!(!result(0, 0).passed());
    }

    #[test]
    fn attempt_uses_snake_case_on_the_wire() {
        let attempt = ExamAttempt {
            user_id: "u1".to_string(),
            score: 1,
            total_questions: 1,
            duration_seconds: 30,
            answers: vec![],
        };
        let json = serde_json::to_value(&attempt).unwrap();
        assert_eq!(json["user_id"], "u1");
        assert_eq!(json["total_questions"], 1);
        assert_eq!(json["duration_seconds"], 30);
    }
}
