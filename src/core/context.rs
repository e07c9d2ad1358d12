/// Generation state: the novel's calendar and the per-chapter topic,
/// history, and subject-orthography tracking.
use chrono::{Days, NaiveDate};
use thiserror::Error;

use crate::core::grammar::StateKey;
use crate::schema::move_kind::MoveKind;
use crate::schema::span::Span;

const PRONOUNS: &[&str] = &["it", "they"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContextError {
    #[error("calendar overflow advancing {days} days from {date}")]
    CalendarOverflow { date: NaiveDate, days: u64 },
    #[error("invalid calendar date {year}-{month}-{day}")]
    InvalidDate { year: i32, month: u32, day: u32 },
}

/// State owned by one in-flight novel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NovelState {
    chapter_count: usize,
    chapter_index: usize,
    start_date: NaiveDate,
    current_date: NaiveDate,
}

impl NovelState {
    pub fn new(chapter_count: usize, start_date: NaiveDate) -> Self {
        Self {
            chapter_count,
            chapter_index: 0,
            start_date,
            current_date: start_date,
        }
    }

    pub fn chapter_count(&self) -> usize {
        self.chapter_count
    }

    pub fn chapter_index(&self) -> usize {
        self.chapter_index
    }

    pub fn begin_chapter(&mut self, index: usize) {
        self.chapter_index = index;
    }

    pub fn is_final_chapter(&self) -> bool {
        self.chapter_index + 1 == self.chapter_count
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    pub fn current_date(&self) -> NaiveDate {
        self.current_date
    }

    /// Days since the start date; zero in the first chapter.
    pub fn elapsed_days(&self) -> i64 {
        (self.current_date - self.start_date).num_days()
    }

    /// Move the calendar forward. The date never moves backward.
    pub fn advance(&mut self, days: u64) -> Result<(), ContextError> {
        self.current_date = self
            .current_date
            .checked_add_days(Days::new(days))
            .ok_or(ContextError::CalendarOverflow {
                date: self.current_date,
                days,
            })?;
        Ok(())
    }
}

/// State owned by one in-flight chapter.
///
/// Topics and subject orthography accumulate over the whole chapter; the
/// move history is cleared at every paragraph boundary.
#[derive(Debug)]
pub struct ChapterState<'n> {
    novel: &'n NovelState,
    paragraph_index: usize,
    paragraph_count: usize,
    topics: Vec<Span>,
    history: Vec<MoveKind>,
    subject_orth: Vec<String>,
}

impl<'n> ChapterState<'n> {
    pub fn new(novel: &'n NovelState, paragraph_count: usize) -> Self {
        Self {
            novel,
            paragraph_index: 0,
            paragraph_count,
            topics: Vec::new(),
            history: Vec::new(),
            subject_orth: Vec::new(),
        }
    }

    pub fn novel(&self) -> &NovelState {
        self.novel
    }

    pub fn begin_paragraph(&mut self, index: usize) {
        self.paragraph_index = index;
        self.history.clear();
    }

    pub fn paragraph_index(&self) -> usize {
        self.paragraph_index
    }

    pub fn paragraph_count(&self) -> usize {
        self.paragraph_count
    }

    pub fn is_first_paragraph(&self) -> bool {
        self.paragraph_index == 0
    }

    pub fn is_final_paragraph(&self) -> bool {
        self.paragraph_index + 1 == self.paragraph_count
    }

    /// The key for the next move: the previous move inside a paragraph, or
    /// a positional key for its first move.
    pub fn entry_key(&self) -> StateKey {
        match self.history.last() {
            Some(&previous) => StateKey::After(previous),
            None if self.is_final_paragraph() && self.novel.is_final_chapter() => {
                StateKey::EndNovel
            }
            None if self.is_final_paragraph() => StateKey::EndChapter,
            None => StateKey::Start,
        }
    }

    pub fn record(&mut self, move_kind: MoveKind) {
        self.history.push(move_kind);
    }

    pub fn history(&self) -> &[MoveKind] {
        &self.history
    }

    pub fn push_topic(&mut self, subject: Span) {
        self.topics.push(subject);
    }

    pub fn push_orth(&mut self, orth: String) {
        self.subject_orth.push(orth);
    }

    pub fn topics(&self) -> &[Span] {
        &self.topics
    }

    pub fn last_topic(&self) -> Option<&Span> {
        self.topics.last()
    }

    pub fn subject_orth(&self) -> &[String] {
        &self.subject_orth
    }

    /// True when the most recent subject was written as "it" or "they".
    pub fn last_orth_is_pronoun(&self) -> bool {
        self.subject_orth
            .last()
            .is_some_and(|orth| PRONOUNS.contains(&orth.to_lowercase().as_str()))
    }
}
