//! Past mock exams: totals, filters and paging.

use chrono::NaiveDate;
use exam_utils::ExamResult;
use serde::{Deserialize, Serialize};

use crate::AppState;

pub const RESULTS_PER_PAGE: usize = 5;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum HistoryEvent {
    Loaded(Vec<ExamResult>),
    FilterScore(Option<u32>),
    /// Calendar day in UTC.
    FilterDate(Option<NaiveDate>),
    /// 1-based.
    GoToPage(usize),
    ToggleExpanded(i64),
}

#[derive(Clone, Copy, Debug, Default, Serialize, PartialEq)]
pub struct HistoryStats {
    pub total: usize,
    pub passed: usize,
    /// Mean raw score, rounded to one decimal.
    pub average_score: f64,
}

#[derive(Clone, Debug, Serialize)]
pub struct ExamHistory {
    results: Vec<ExamResult>,
    score_filter: Option<u32>,
    date_filter: Option<NaiveDate>,
    page: usize,
    expanded: Option<i64>,
}

impl Default for ExamHistory {
    fn default() -> Self {
        Self {
            results: Vec::new(),
            score_filter: None,
            date_filter: None,
            page: 1,
            expanded: None,
        }
    }
}

fn day_of(result: &ExamResult) -> NaiveDate {
    result.submitted_at.date_naive()
}

impl ExamHistory {
    pub fn stats(&self) -> HistoryStats {
        let total = self.results.len();
        let passed = self.results.iter().filter(|r| r.passed()).count();
        let average_score = if total == 0 {
            0.0
        } else {
            let sum: u32 = self.results.iter().map(|r| r.score).sum();
            (f64::from(sum) / total as f64 * 10.0).round() / 10.0
        };
        HistoryStats {
            total,
            passed,
            average_score,
        }
    }

    /// Distinct scores, highest first.
    pub fn score_options(&self) -> Vec<u32> {
        let mut scores: Vec<u32> = self.results.iter().map(|r| r.score).collect();
        scores.sort_unstable_by(|a, b| b.cmp(a));
        scores.dedup();
        scores
    }

    /// Distinct days with at least one exam, newest first.
    pub fn date_options(&self) -> Vec<NaiveDate> {
        let mut days: Vec<NaiveDate> = self.results.iter().map(day_of).collect();
        days.sort_unstable_by(|a, b| b.cmp(a));
        days.dedup();
        days
    }

    pub fn filtered(&self) -> impl Iterator<Item = &ExamResult> {
        self.results.iter().filter(|r| {
            self.score_filter.is_none_or(|score| r.score == score)
                && self.date_filter.is_none_or(|day| day_of(r) == day)
        })
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn total_pages(&self) -> usize {
        self.filtered().count().div_ceil(RESULTS_PER_PAGE)
    }

    pub fn current_page(&self) -> Vec<&ExamResult> {
        self.filtered()
            .skip((self.page - 1) * RESULTS_PER_PAGE)
            .take(RESULTS_PER_PAGE)
            .collect()
    }

    pub fn is_expanded(&self, id: i64) -> bool {
        self.expanded == Some(id)
    }
}

impl AppState for ExamHistory {
    type Event = HistoryEvent;

    fn apply_event(mut self, event: &HistoryEvent) -> Self {
        match event {
            HistoryEvent::Loaded(results) => {
                self.results = results.clone();
                self.page = 1;
            }
            HistoryEvent::FilterScore(score) => {
                self.score_filter = *score;
                self.page = 1;
            }
            HistoryEvent::FilterDate(day) => {
                self.date_filter = *day;
                self.page = 1;
            }
            HistoryEvent::GoToPage(page) => {
                if (1..=self.total_pages()).contains(page) {
                    self.page = *page;
                }
            }
            HistoryEvent::ToggleExpanded(id) => {
                self.expanded = if self.expanded == Some(*id) {
                    None
                } else {
                    Some(*id)
                };
            }
        }
        self
    }
}
