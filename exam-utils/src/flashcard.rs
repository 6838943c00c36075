use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(target_arch = "wasm32", derive(tsify::Tsify))]
#[cfg_attr(target_arch = "wasm32", tsify(into_wasm_abi, from_wasm_abi))]
pub enum FlashcardCategory {
    General,
    Security,
    Billing,
    Support,
}

impl FlashcardCategory {
    pub const ALL: [FlashcardCategory; 4] = [
        FlashcardCategory::General,
        FlashcardCategory::Security,
        FlashcardCategory::Billing,
        FlashcardCategory::Support,
    ];
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(target_arch = "wasm32", derive(tsify::Tsify))]
#[cfg_attr(target_arch = "wasm32", tsify(into_wasm_abi, from_wasm_abi))]
pub struct Flashcard {
    pub id: u32,
    pub question: String,
    pub answer: String,
    pub category: FlashcardCategory,
}

/// Review status is kept on the learner's device, never in the database.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[cfg_attr(target_arch = "wasm32", derive(tsify::Tsify))]
#[cfg_attr(target_arch = "wasm32", tsify(into_wasm_abi, from_wasm_abi))]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    #[default]
    Unseen,
    Known,
    Review,
}
