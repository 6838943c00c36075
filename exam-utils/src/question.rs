use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// The most options a candidate may hold selected on one question.
/// Questions are either multiple choice or "choose two" multiple response.
pub const MAX_SELECTED: usize = 2;

/// Exam domain a question is tagged with. Travels as its label, e.g.
/// `"Cloud Concepts"`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(from = "String", into = "String")]
pub enum ExamDomain {
    CloudConcepts,
    SecurityAndCompliance,
    Technology,
    BillingAndPricing,
    /// Anything the question store tags outside the four exam domains,
    /// kept verbatim.
    Other(String),
}

impl ExamDomain {
    /// The domains a mock exam must cover, in the order they are drawn.
    pub const COVERED: [ExamDomain; 4] = [
        ExamDomain::CloudConcepts,
        ExamDomain::SecurityAndCompliance,
        ExamDomain::Technology,
        ExamDomain::BillingAndPricing,
    ];

    pub fn label(&self) -> &str {
        match self {
            ExamDomain::CloudConcepts => "Cloud Concepts",
            ExamDomain::SecurityAndCompliance => "Security and Compliance",
            ExamDomain::Technology => "Technology",
            ExamDomain::BillingAndPricing => "Billing and Pricing",
            ExamDomain::Other(label) => label,
        }
    }
}

impl From<String> for ExamDomain {
    fn from(label: String) -> Self {
        match label.as_str() {
            "Cloud Concepts" => ExamDomain::CloudConcepts,
            "Security and Compliance" => ExamDomain::SecurityAndCompliance,
            "Technology" => ExamDomain::Technology,
            "Billing and Pricing" => ExamDomain::BillingAndPricing,
            _ => ExamDomain::Other(label),
        }
    }
}

impl From<ExamDomain> for String {
    fn from(domain: ExamDomain) -> Self {
        match domain {
            ExamDomain::Other(label) => label,
            known => known.label().to_string(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(target_arch = "wasm32", derive(tsify::Tsify))]
#[cfg_attr(target_arch = "wasm32", tsify(into_wasm_abi, from_wasm_abi))]
#[serde(rename_all = "camelCase")]
pub struct Question {
    #[serde(alias = "_id")]
    pub id: String,
    pub question: String,
    pub options: Vec<String>,
    pub correct_indexes: Vec<usize>,
    pub explanation: String,
    #[cfg_attr(target_arch = "wasm32", tsify(type = "string"))]
    pub category: ExamDomain,
    pub difficulty: String,
}

impl Question {
    pub fn is_correct(&self, selected: &[usize]) -> bool {
        is_correct_selection(selected, &self.correct_indexes)
    }

    /// Option texts for a list of indexes, skipping any that are out of range.
    pub fn option_texts(&self, indexes: &[usize]) -> Vec<&str> {
        indexes
            .iter()
            .filter_map(|&i| self.options.get(i).map(String::as_str))
            .collect()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.options.len() < 2 {
            return Err(ValidationError::TooFewOptions {
                id: self.id.clone(),
                count: self.options.len(),
            });
        }
        if self.correct_indexes.is_empty() || self.correct_indexes.len() > MAX_SELECTED {
            return Err(ValidationError::CorrectIndexCount {
                id: self.id.clone(),
                count: self.correct_indexes.len(),
            });
        }
        if let Some(&index) = self
            .correct_indexes
            .iter()
            .find(|&&i| i >= self.options.len())
        {
            return Err(ValidationError::CorrectIndexOutOfRange {
                id: self.id.clone(),
                index,
                options: self.options.len(),
            });
        }
        Ok(())
    }
}

/// A selection is correct when it has exactly as many entries as the answer
/// key and every entry appears in it. Order does not matter.
pub fn is_correct_selection(selected: &[usize], correct: &[usize]) -> bool {
    selected.len() == correct.len() && selected.iter().all(|i| correct.contains(i))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(correct: Vec<usize>) -> Question {
        Question {
            id: "q1".to_string(),
            question: "Which services are serverless?".to_string(),
            options: vec![
                "Lambda".to_string(),
                "EC2".to_string(),
                "Fargate".to_string(),
                "EBS".to_string(),
            ],
            correct_indexes: correct,
            explanation: String::new(),
            category: ExamDomain::Technology,
            difficulty: "easy".to_string(),
        }
    }

    #[test]
    fn selection_order_does_not_matter() {
        assert!(is_correct_selection(&[0, 2], &[2, 0]));
    }

    #[test]
    fn partial_selection_is_wrong() {
        assert!(!is_correct_selection(&[0], &[0, 2]));
    }

    #[test]
    fn same_size_different_option_is_wrong() {
        assert!(!is_correct_selection(&[0, 1], &[0, 2]));
    }

    #[test]
    fn empty_selection_is_wrong() {
        assert!(!question(vec![1]).is_correct(&[]));
    }

    #[test]
    fn deserializes_document_store_shape() {
        let json = serde_json::json!({
            "_id": "65f1",
            "question": "What is S3?",
            "options": ["Storage", "Compute", "Network", "Database"],
            "correctIndexes": [0],
            "explanation": "Object storage",
            "category": "Technology",
            "difficulty": "easy"
        });
        let q: Question = serde_json::from_value(json).unwrap();
        assert_eq!(q.id, "65f1");
        assert_eq!(q.category, ExamDomain::Technology);
        assert_eq!(q.correct_indexes, vec![0]);
    }

    #[test]
    fn unknown_category_keeps_its_label() {
        let category: ExamDomain = serde_json::from_str("\"Networking\"").unwrap();
        assert_eq!(category, ExamDomain::Other("Networking".to_string()));
        assert_eq!(serde_json::to_string(&category).unwrap(), "\"Networking\"");

        let category: ExamDomain = serde_json::from_str("\"Billing and Pricing\"").unwrap();
        assert_eq!(category, ExamDomain::BillingAndPricing);
        assert_eq!(
            serde_json::to_string(&category).unwrap(),
            "\"Billing and Pricing\""
        );
    }

    #[test]
    fn validation_rejects_bad_answer_keys() {
        assert!(question(vec![0, 2]).validate().is_ok());
        assert!(matches!(
            question(vec![]).validate(),
            Err(ValidationError::CorrectIndexCount { count: 0, .. })
        ));
        assert!(matches!(
            question(vec![0, 1, 2]).validate(),
            Err(ValidationError::CorrectIndexCount { count: 3, .. })
        ));
        assert!(matches!(
            question(vec![4]).validate(),
            Err(ValidationError::CorrectIndexOutOfRange { index: 4, .. })
        ));
    }
}
