//! Timer-free quiz transitions.
//!
//! Every transition returns a [`TimerCommand`] describing what the owner's
//! single timer slot must hold afterwards; the machine itself never sleeps.

use std::time::Duration;

use crate::error::LoadError;
use crate::quiz::{self, QuizParams};

/// Shown to the player whenever a question set cannot be loaded.
pub const LOAD_FAILED_MESSAGE: &str = "Oops! Something went wrong while loading the questions.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizSettings {
    pub max_questions: usize,
    /// Countdown start value, in ticks.
    pub time_limit: u32,
    pub tick: Duration,
    /// Pause between an answer and the next question.
    pub advance_delay: Duration,
}

impl Default for QuizSettings {
    fn default() -> Self {
        Self {
            max_questions: 20,
            time_limit: 15,
            tick: Duration::from_secs(1),
            advance_delay: Duration::from_millis(800),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Loading,
    InProgress,
    Finished,
    /// Loading failed; holds the message for the player. Left through a retry.
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerCommand {
    /// Leave whatever is scheduled alone.
    Keep,
    Cancel,
    StartCountdown,
    ScheduleAdvance,
}

/// Result of a successful answer selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub correct: bool,
}

#[derive(Debug, Clone)]
pub struct QuizMachine {
    settings: QuizSettings,
    params: QuizParams,
    phase: Phase,
    questions: Vec<quiz::Question>,
    current_index: usize,
    score: u32,
    answer_chosen: bool,
    time_left: u32,
}

impl QuizMachine {
    pub fn new(settings: QuizSettings) -> Self {
        let time_left = settings.time_limit;
        Self {
            settings,
            params: QuizParams::default(),
            phase: Phase::Loading,
            questions: Vec::new(),
            current_index: 0,
            score: 0,
            answer_chosen: false,
            time_left,
        }
    }

    pub fn settings(&self) -> &QuizSettings {
        &self.settings
    }

    pub fn params(&self) -> &QuizParams {
        &self.params
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn questions(&self) -> &[quiz::Question] {
        &self.questions
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn answer_chosen(&self) -> bool {
        self.answer_chosen
    }

    pub fn time_left(&self) -> u32 {
        self.time_left
    }

    pub fn is_training(&self) -> bool {
        self.params.training
    }

    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    pub fn total_questions(&self) -> usize {
        self.questions.len()
    }

    pub fn current_question(&self) -> Option<&quiz::Question> {
        match self.phase {
            Phase::InProgress | Phase::Finished => self.questions.get(self.current_index),
            _ => None,
        }
    }

    /// Enters `Loading` for `params`, dropping the previous run.
    pub fn begin_loading(&mut self, params: QuizParams) -> TimerCommand {
        self.params = params;
        self.phase = Phase::Loading;
        self.questions.clear();
        self.current_index = 0;
        self.score = 0;
        self.answer_chosen = false;
        self.time_left = self.settings.time_limit;
        TimerCommand::Cancel
    }

    pub fn finish_loading(
        &mut self,
        result: Result<Vec<quiz::Question>, LoadError>,
    ) -> TimerCommand {
        if self.phase != Phase::Loading {
            return TimerCommand::Keep;
        }
        match result {
            Ok(questions) if !questions.is_empty() => {
                self.questions = questions;
                self.phase = Phase::InProgress;
                self.show_current()
            }
            Ok(_) => {
                log::error!("no questions for {}", self.params.operation);
                self.phase = Phase::Failed(LOAD_FAILED_MESSAGE.to_string());
                TimerCommand::Cancel
            }
            Err(err) => {
                log::error!("error loading questions: {err}");
                self.phase = Phase::Failed(LOAD_FAILED_MESSAGE.to_string());
                TimerCommand::Cancel
            }
        }
    }

    /// Records the pick of `answers[index]` on the current question.
    ///
    /// Returns `None` without touching anything when an answer is already
    /// chosen, no question is current or the index does not exist. On success
    /// the owner must cancel the countdown and schedule [`Self::advance`].
    pub fn select_answer(&mut self, index: usize) -> Option<Selection> {
        if self.answer_chosen || self.phase != Phase::InProgress {
            return None;
        }
        let question = self.questions.get_mut(self.current_index)?;
        let correct = question.answers.get(index)?.is_correct;

        question.selected = Some(index);
        self.answer_chosen = true;
        if correct {
            self.score += 1;
        }
        Some(Selection { correct })
    }

    /// One countdown step. At zero this advances as if the player ran out of time.
    pub fn tick(&mut self) -> TimerCommand {
        if self.phase != Phase::InProgress || self.params.training {
            return TimerCommand::Cancel;
        }
        self.time_left = self.time_left.saturating_sub(1);
        if self.time_left == 0 {
            self.advance()
        } else {
            TimerCommand::Keep
        }
    }

    pub fn advance(&mut self) -> TimerCommand {
        if self.phase != Phase::InProgress {
            return TimerCommand::Keep;
        }
        self.answer_chosen = false;
        if self.current_index + 1 < self.questions.len() {
            self.current_index += 1;
            self.show_current()
        } else {
            self.phase = Phase::Finished;
            TimerCommand::Cancel
        }
    }

    fn show_current(&mut self) -> TimerCommand {
        if self.params.training {
            return TimerCommand::Cancel;
        }
        self.time_left = self.settings.time_limit;
        TimerCommand::StartCountdown
    }
}
