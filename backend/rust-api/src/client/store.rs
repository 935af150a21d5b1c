use serde::Serialize;
use std::time::{Duration, Instant};
use validator::{Validate, ValidationErrors};

use crate::models::{CategoryResponse, Language, QuestionResponse};

/// What the player chose before starting a quiz
#[derive(Debug, Clone, PartialEq, Validate)]
pub struct QuizSettings {
    #[validate(length(min = 1, message = "Select at least one category"))]
    pub category_ids: Vec<String>,
    pub language: Language,
    #[validate(range(min = 1, max = 50))]
    pub question_count: usize,
    #[validate(range(min = 5, max = 300))]
    pub seconds_per_question: u64,
}

impl Default for QuizSettings {
    fn default() -> Self {
        Self {
            category_ids: Vec::new(),
            language: Language::Eng,
            question_count: 10,
            seconds_per_question: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizAnswer {
    pub question_id: String,
    pub selected_option: String,
    pub is_correct: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizStats {
    pub total: usize,
    pub answered: usize,
    pub correct: usize,
    pub score_percent: f64,
}

/// Client-side quiz state. Owned by the caller and passed where needed;
/// every setter replaces the held value.
#[derive(Debug, Default)]
pub struct QuizStore {
    categories: Vec<CategoryResponse>,
    questions: Vec<QuestionResponse>,
    answers: Vec<QuizAnswer>,
    stats: Option<QuizStats>,
    settings: QuizSettings,
    question_started: Option<Instant>,
}

impl QuizStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn categories(&self) -> &[CategoryResponse] {
        &self.categories
    }

    pub fn set_categories(&mut self, categories: Vec<CategoryResponse>) {
        self.categories = categories;
    }

    /// Categories in the configured language
    pub fn categories_for_language(&self) -> Vec<&CategoryResponse> {
        self.categories
            .iter()
            .filter(|category| category.language == self.settings.language)
            .collect()
    }

    pub fn questions(&self) -> &[QuestionResponse] {
        &self.questions
    }

    pub fn set_questions(&mut self, questions: Vec<QuestionResponse>) {
        self.questions = questions;
    }

    pub fn answers(&self) -> &[QuizAnswer] {
        &self.answers
    }

    pub fn set_answers(&mut self, answers: Vec<QuizAnswer>) {
        self.answers = answers;
    }

    pub fn stats(&self) -> Option<&QuizStats> {
        self.stats.as_ref()
    }

    pub fn set_stats(&mut self, stats: Option<QuizStats>) {
        self.stats = stats;
    }

    pub fn settings(&self) -> &QuizSettings {
        &self.settings
    }

    /// Replaces the settings only if they pass validation
    pub fn set_settings(&mut self, settings: QuizSettings) -> Result<(), ValidationErrors> {
        settings.validate()?;
        self.settings = settings;
        Ok(())
    }

    /// Keeps questions from the selected categories, capped at the
    /// configured count, and resets answers and stats.
    pub fn start_quiz(&mut self, questions: Vec<QuestionResponse>) -> Result<usize, ValidationErrors> {
        self.settings.validate()?;

        let mut selected: Vec<QuestionResponse> = questions
            .into_iter()
            .filter(|question| self.settings.category_ids.contains(&question.category_id))
            .collect();
        selected.truncate(self.settings.question_count);

        self.questions = selected;
        self.answers.clear();
        self.stats = None;
        self.question_started = None;

        Ok(self.questions.len())
    }

    /// Starts the countdown for the question now on screen
    pub fn start_timer(&mut self, now: Instant) {
        self.question_started = Some(now);
    }

    fn time_limit(&self) -> Duration {
        Duration::from_secs(self.settings.seconds_per_question)
    }

    pub fn remaining(&self, now: Instant) -> Duration {
        match self.question_started {
            Some(started) => self
                .time_limit()
                .saturating_sub(now.saturating_duration_since(started)),
            None => self.time_limit(),
        }
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        self.question_started.is_some() && self.remaining(now).is_zero()
    }

    pub fn answer(&mut self, question_id: &str, option: &str) -> Option<&QuizAnswer> {
        self.answer_at(question_id, option, Instant::now())
    }

    /// Records the first answer to a question. Answers to unknown
    /// questions, repeated answers and answers after the timer ran out are
    /// ignored and return `None`.
    pub fn answer_at(&mut self, question_id: &str, option: &str, now: Instant) -> Option<&QuizAnswer> {
        if self.is_expired(now) {
            return None;
        }
        if self.answers.iter().any(|a| a.question_id == question_id) {
            return None;
        }

        let question = self.questions.iter().find(|q| q.id == question_id)?;
        self.answers.push(QuizAnswer {
            question_id: question.id.clone(),
            selected_option: option.to_string(),
            is_correct: question.correct_answer == option,
        });
        self.question_started = None;

        self.answers.last()
    }

    pub fn finish(&mut self) -> QuizStats {
        let total = self.questions.len();
        let answered = self.answers.len();
        let correct = self.answers.iter().filter(|a| a.is_correct).count();
        let score_percent = if total == 0 {
            0.0
        } else {
            correct as f64 * 100.0 / total as f64
        };

        let stats = QuizStats {
            total,
            answered,
            correct,
            score_percent,
        };
        self.stats = Some(stats.clone());
        stats
    }
}
