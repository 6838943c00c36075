use serde::{Deserialize, Serialize};

pub const MAX_RATING: u8 = 5;

/// Star rating plus free-text feedback left from the dashboard.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(target_arch = "wasm32", derive(tsify::Tsify))]
#[cfg_attr(target_arch = "wasm32", tsify(into_wasm_abi, from_wasm_abi))]
pub struct Feedback {
    #[serde(default)]
    pub rating: u8,
    #[serde(default)]
    pub feedback: String,
}

impl Feedback {
    /// A rating of zero with blank text carries nothing worth storing.
    pub fn is_empty(&self) -> bool {
        self.rating == 0 && self.feedback.trim().is_empty()
    }

    pub fn rating_label(&self) -> Option<&'static str> {
        match self.rating {
            1 => Some("Very dissatisfied"),
            2 => Some("Dissatisfied"),
            3 => Some("Neutral"),
            4 => Some("Satisfied"),
            5 => Some("Very satisfied"),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeedbackResponse {
    pub message: String,
}
