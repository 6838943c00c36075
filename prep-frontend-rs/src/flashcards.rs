//! Flashcard browsing: category filter, cursor, random draw and per-card
//! review status.

use std::collections::BTreeMap;

use exam_utils::{Flashcard, FlashcardCategory, ReviewStatus, Role};
use rand::Rng;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};

use crate::AppState;

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(FlashcardCategory),
}

impl CategoryFilter {
    pub fn matches(&self, card: &Flashcard) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Only(category) => card.category == *category,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum FlashcardEvent {
    Loaded(Vec<Flashcard>),
    ProgressLoaded(BTreeMap<u32, ReviewStatus>),
    SelectCategory(CategoryFilter),
    Next,
    Previous,
    /// Show this card until the next navigation.
    RandomPick(u32),
    Flip,
    Mark { card_id: u32, status: ReviewStatus },
}

#[derive(Clone, Copy, Debug, Default, Serialize, PartialEq, Eq)]
pub struct ReviewSummary {
    pub reviewed: usize,
    pub known: usize,
    pub review: usize,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct FlashcardReviewer {
    role: Role,
    all: Vec<Flashcard>,
    filter: CategoryFilter,
    /// Positions in `all` that pass `filter`.
    filtered: Vec<usize>,
    cursor: usize,
    random_pick: Option<usize>,
    flipped: bool,
    progress: BTreeMap<u32, ReviewStatus>,
}

impl FlashcardReviewer {
    pub fn new(role: Role) -> Self {
        Self {
            role,
            ..Default::default()
        }
    }

    pub fn cards(&self) -> &[Flashcard] {
        &self.all
    }

    pub fn filter(&self) -> CategoryFilter {
        self.filter
    }

    pub fn filtered_cards(&self) -> impl Iterator<Item = &Flashcard> {
        self.filtered.iter().filter_map(|&i| self.all.get(i))
    }

    pub fn filtered_len(&self) -> usize {
        self.filtered.len()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn random_pick(&self) -> Option<&Flashcard> {
        self.random_pick.and_then(|i| self.all.get(i))
    }

    pub fn is_flipped(&self) -> bool {
        self.flipped
    }

    /// The random pick when there is one, otherwise the card under the cursor.
    pub fn current_card(&self) -> Option<&Flashcard> {
        match self.random_pick {
            Some(i) => self.all.get(i),
            None => self
                .filtered
                .get(self.cursor)
                .and_then(|&i| self.all.get(i)),
        }
    }

    pub fn status(&self, card_id: u32) -> ReviewStatus {
        self.progress.get(&card_id).copied().unwrap_or_default()
    }

    pub fn progress(&self) -> &BTreeMap<u32, ReviewStatus> {
        &self.progress
    }

    /// Basic users see a truncated deck and are offered the rest.
    pub fn upsell_visible(&self) -> bool {
        self.role == Role::Basic
    }

    pub fn summary(&self) -> ReviewSummary {
        self.progress
            .values()
            .fold(ReviewSummary::default(), |mut summary, status| {
                match status {
                    ReviewStatus::Known => summary.known += 1,
                    ReviewStatus::Review => summary.review += 1,
                    ReviewStatus::Unseen => return summary,
                }
                summary.reviewed += 1;
                summary
            })
    }

    /// Draw from the filtered cards, or from every card if the filter
    /// matches nothing.
    pub fn random_pick_event<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<FlashcardEvent> {
        let pool: Vec<&Flashcard> = if self.filtered.is_empty() {
            self.all.iter().collect()
        } else {
            self.filtered_cards().collect()
        };
        pool.choose(rng).map(|card| FlashcardEvent::RandomPick(card.id))
    }

    fn refilter(&mut self) {
        let filter = self.filter;
        self.filtered = self
            .all
            .iter()
            .enumerate()
            .filter(|(_, card)| filter.matches(card))
            .map(|(i, _)| i)
            .collect();
        self.cursor = 0;
        self.random_pick = None;
        self.flipped = false;
    }

    fn step(&mut self, forward: bool) {
        let len = self.filtered.len();
        if len > 0 {
            self.cursor = if forward {
                (self.cursor + 1) % len
            } else {
                (self.cursor + len - 1) % len
            };
        }
        self.random_pick = None;
        self.flipped = false;
    }
}

impl AppState for FlashcardReviewer {
    type Event = FlashcardEvent;

    fn apply_event(mut self, event: &FlashcardEvent) -> Self {
        match event {
            FlashcardEvent::Loaded(cards) => {
                // already cut down to what the role may see
                self.all = cards.clone();
                self.refilter();
            }
            FlashcardEvent::ProgressLoaded(progress) => {
                self.progress = progress.clone();
            }
            FlashcardEvent::SelectCategory(filter) => {
                self.filter = *filter;
                self.refilter();
            }
            FlashcardEvent::Next => self.step(true),
            FlashcardEvent::Previous => self.step(false),
            FlashcardEvent::RandomPick(card_id) => {
                if let Some(i) = self.all.iter().position(|card| card.id == *card_id) {
                    self.random_pick = Some(i);
                    self.flipped = false;
                }
            }
            FlashcardEvent::Flip => {
                if self.current_card().is_some() {
                    self.flipped = !self.flipped;
                }
            }
            FlashcardEvent::Mark { card_id, status } => {
                self.progress.insert(*card_id, *status);
            }
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn deck(n: u32) -> Vec<Flashcard> {
        (0..n)
            .map(|id| Flashcard {
                id,
                question: format!("question {id}"),
                answer: format!("answer {id}"),
                category: FlashcardCategory::ALL[id as usize % 4],
            })
            .collect()
    }

    fn loaded(role: Role, n: u32) -> FlashcardReviewer {
        FlashcardReviewer::new(role).apply_event(&FlashcardEvent::Loaded(deck(n)))
    }

    #[test]
    fn served_deck_is_kept_whole() {
        // the server's limit may be above the default of 20
        let reviewer = loaded(Role::Basic, 30);
        assert_eq!(reviewer.cards().len(), 30);
        assert_eq!(reviewer.cards().last().unwrap().id, 29);
        assert!(reviewer.upsell_visible());

        let reviewer = loaded(Role::Pro, 30);
        assert_eq!(reviewer.cards().len(), 30);
        assert!(!reviewer.upsell_visible());
    }

    #[test]
    fn category_change_resets_cursor_and_pick() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut reviewer = loaded(Role::Pro, 12)
            .apply_event(&FlashcardEvent::Next)
            .apply_event(&FlashcardEvent::Next);
        let pick = reviewer.random_pick_event(&mut rng).unwrap();
        reviewer = reviewer
            .apply_event(&pick)
            .apply_event(&FlashcardEvent::Flip);
        assert!(reviewer.random_pick().is_some());

        let reviewer = reviewer.apply_event(&FlashcardEvent::SelectCategory(
            CategoryFilter::Only(FlashcardCategory::Security),
        ));
        assert_eq!(reviewer.cursor(), 0);
        assert!(reviewer.random_pick().is_none());
        assert!(!reviewer.is_flipped());
        assert_eq!(reviewer.filtered_len(), 3);
        assert!(
            reviewer
                .filtered_cards()
                .all(|card| card.category == FlashcardCategory::Security)
        );
        assert_eq!(reviewer.current_card().unwrap().id, 1);
    }

    #[test]
    fn next_and_previous_wrap() {
        let reviewer = loaded(Role::Pro, 3).apply_event(&FlashcardEvent::Previous);
        assert_eq!(reviewer.cursor(), 2);
        let reviewer = reviewer.apply_event(&FlashcardEvent::Next);
        assert_eq!(reviewer.cursor(), 0);
    }

    #[test]
    fn navigation_clears_the_random_pick() {
        let reviewer = loaded(Role::Pro, 8)
            .apply_event(&FlashcardEvent::RandomPick(5))
            .apply_event(&FlashcardEvent::Flip);
        assert_eq!(reviewer.current_card().unwrap().id, 5);
        assert!(reviewer.is_flipped());

        let reviewer = reviewer.apply_event(&FlashcardEvent::Next);
        assert!(reviewer.random_pick().is_none());
        assert!(!reviewer.is_flipped());
        assert_eq!(reviewer.current_card().unwrap().id, 1);
    }

    #[test]
    fn random_draw_respects_the_filter() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let reviewer = loaded(Role::Pro, 20).apply_event(&FlashcardEvent::SelectCategory(
            CategoryFilter::Only(FlashcardCategory::Billing),
        ));
        for _ in 0..20 {
            let Some(FlashcardEvent::RandomPick(id)) = reviewer.random_pick_event(&mut rng) else {
                panic!("expected a random pick");
            };
            assert_eq!(id % 4, 2);
        }
    }

    #[test]
    fn random_draw_falls_back_to_every_card() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let cards = vec![Flashcard {
            id: 7,
            question: "q".to_string(),
            answer: "a".to_string(),
            category: FlashcardCategory::General,
        }];
        let reviewer = FlashcardReviewer::new(Role::Pro)
            .apply_event(&FlashcardEvent::Loaded(cards))
            .apply_event(&FlashcardEvent::SelectCategory(CategoryFilter::Only(
                FlashcardCategory::Support,
            )));
        assert_eq!(reviewer.current_card(), None);
        assert_eq!(
            reviewer.random_pick_event(&mut rng),
            Some(FlashcardEvent::RandomPick(7))
        );
    }

    #[test]
    fn marks_overwrite_and_summarize() {
        let reviewer = loaded(Role::Pro, 4)
            .apply_event(&FlashcardEvent::Mark {
                card_id: 0,
                status: ReviewStatus::Known,
            })
            .apply_event(&FlashcardEvent::Mark {
                card_id: 1,
                status: ReviewStatus::Review,
            })
            .apply_event(&FlashcardEvent::Mark {
                card_id: 1,
                status: ReviewStatus::Known,
            });
        assert_eq!(reviewer.status(1), ReviewStatus::Known);
        assert_eq!(reviewer.status(3), ReviewStatus::Unseen);
        assert_eq!(
            reviewer.summary(),
            ReviewSummary {
                reviewed: 2,
                known: 2,
                review: 0
            }
        );
    }
}
