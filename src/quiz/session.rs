//! A live quiz: the [`QuizMachine`] plus the timers that drive it.
//!
//! A session owns exactly one timer slot. Scheduling a timer replaces (and
//! aborts) whatever the slot held, and every timer carries the epoch it was
//! scheduled under so a firing that lost the race with a newer transition is
//! dropped. Timer tasks only hold a weak reference to the session.

use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::quiz::bank::{self, QuestionBank};
use crate::quiz::feedback::{AnswerCue, Cue};
use crate::quiz::machine::{Phase, QuizMachine, QuizSettings, TimerCommand};
use crate::quiz::{Operation, QuizParams};

/// Snapshot of a session handed to whoever renders it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizView {
    pub phase: Phase,
    pub operation: Operation,
    pub training: bool,
    pub table: Option<i64>,
    pub current_index: usize,
    pub total_questions: usize,
    pub score: u32,
    pub answer_chosen: bool,
    pub time_left: u32,
    pub prompt: Option<String>,
    pub answers: Vec<String>,
    pub selected: Option<usize>,
}

impl QuizView {
    fn of(machine: &QuizMachine) -> Self {
        let question = machine.current_question();
        Self {
            phase: machine.phase().clone(),
            operation: machine.params().operation,
            training: machine.is_training(),
            table: machine.params().table,
            current_index: machine.current_index(),
            total_questions: machine.total_questions(),
            score: machine.score(),
            answer_chosen: machine.answer_chosen(),
            time_left: machine.time_left(),
            prompt: question.map(|q| q.prompt.clone()),
            answers: question
                .map(|q| q.answers.iter().map(|a| a.text.clone()).collect())
                .unwrap_or_default(),
            selected: question.and_then(|q| q.selected),
        }
    }

    pub fn answer_position(&self, text: &str) -> Option<usize> {
        let text = text.trim();
        self.answers.iter().position(|a| a == text)
    }
}

struct ScheduledTimer {
    epoch: u64,
    handle: JoinHandle<()>,
}

impl Drop for ScheduledTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

struct SessionInner {
    machine: QuizMachine,
    bank: Arc<dyn QuestionBank>,
    cue: Arc<dyn AnswerCue>,
    views: watch::Sender<QuizView>,
    timer: Option<ScheduledTimer>,
    epoch: u64,
}

impl SessionInner {
    fn publish(&self) {
        self.views.send_replace(QuizView::of(&self.machine));
    }

    fn owns_timer(&self, epoch: u64) -> bool {
        self.timer.as_ref().map(|t| t.epoch) == Some(epoch)
    }

    fn cancel_timer(&mut self) {
        self.timer = None;
    }

    fn apply(&mut self, command: TimerCommand, this: &Weak<Mutex<SessionInner>>) {
        match command {
            TimerCommand::Keep => {}
            TimerCommand::Cancel => self.cancel_timer(),
            TimerCommand::StartCountdown => {
                let tick = self.machine.settings().tick;
                self.schedule(this, |weak, epoch| run_countdown(weak, epoch, tick));
            }
            TimerCommand::ScheduleAdvance => {
                let delay = self.machine.settings().advance_delay;
                self.schedule(this, |weak, epoch| run_advance(weak, epoch, delay));
            }
        }
    }

    fn schedule<F, Fut>(&mut self, this: &Weak<Mutex<SessionInner>>, task: F)
    where
        F: FnOnce(Weak<Mutex<SessionInner>>, u64) -> Fut,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        self.cancel_timer();
        self.epoch += 1;
        let epoch = self.epoch;
        let handle = tokio::spawn(task(this.clone(), epoch));
        self.timer = Some(ScheduledTimer { epoch, handle });
    }

    fn load(&mut self, params: QuizParams, this: &Weak<Mutex<SessionInner>>) {
        let command = self.machine.begin_loading(params);
        self.apply(command, this);
        self.publish();

        let params = self.machine.params().clone();
        let max_questions = self.machine.settings().max_questions;
        let result = bank::load(
            self.bank.as_ref(),
            &params,
            max_questions,
            &mut rand::thread_rng(),
        );
        let command = self.machine.finish_loading(result);
        self.apply(command, this);
        self.publish();

        if let Phase::InProgress = self.machine.phase() {
            log::info!(
                "quiz started: {} ({} questions, training: {})",
                params.operation,
                self.machine.total_questions(),
                params.training
            );
        }
    }
}

async fn run_countdown(session: Weak<Mutex<SessionInner>>, epoch: u64, tick: Duration) {
    loop {
        tokio::time::sleep(tick).await;
        let Some(inner) = session.upgrade() else {
            return;
        };
        let mut inner = inner.lock();
        if !inner.owns_timer(epoch) {
            return;
        }
        let command = inner.machine.tick();
        if command != TimerCommand::Keep {
            log::debug!("time is up on question {}", inner.machine.current_index() + 1);
            // replacing the slot aborts this task, which is about to return anyway
            inner.apply(command, &session);
            inner.publish();
            return;
        }
        inner.publish();
    }
}

async fn run_advance(session: Weak<Mutex<SessionInner>>, epoch: u64, delay: Duration) {
    tokio::time::sleep(delay).await;
    let Some(inner) = session.upgrade() else {
        return;
    };
    let mut inner = inner.lock();
    if !inner.owns_timer(epoch) {
        return;
    }
    inner.cancel_timer();
    let command = inner.machine.advance();
    inner.apply(command, &session);
    inner.publish();
    if inner.machine.is_finished() {
        log::info!(
            "quiz finished with {}/{}",
            inner.machine.score(),
            inner.machine.total_questions()
        );
    }
}

/// A running quiz. Must be used from within a tokio runtime.
pub struct QuizSession {
    inner: Arc<Mutex<SessionInner>>,
}

impl QuizSession {
    pub fn new(
        settings: QuizSettings,
        bank: Arc<dyn QuestionBank>,
        cue: Arc<dyn AnswerCue>,
    ) -> Self {
        let machine = QuizMachine::new(settings);
        let (views, _) = watch::channel(QuizView::of(&machine));
        Self {
            inner: Arc::new(Mutex::new(SessionInner {
                machine,
                bank,
                cue,
                views,
                timer: None,
                epoch: 0,
            })),
        }
    }

    pub fn start(&self, params: QuizParams) {
        let weak = Arc::downgrade(&self.inner);
        self.inner.lock().load(params, &weak);
    }

    /// Loads again with the parameters of the last start.
    pub fn retry(&self) {
        let weak = Arc::downgrade(&self.inner);
        let mut inner = self.inner.lock();
        let params = inner.machine.params().clone();
        inner.load(params, &weak);
    }

    /// Starts over, optionally switching to another operation.
    pub fn restart(&self, operation: Option<Operation>) {
        let weak = Arc::downgrade(&self.inner);
        let mut inner = self.inner.lock();
        inner.cancel_timer();
        let mut params = inner.machine.params().clone();
        if let Some(operation) = operation {
            params.operation = operation;
        }
        inner.load(params, &weak);
    }

    /// Picks `answers[index]` of the current question.
    ///
    /// Returns whether it was correct, or `None` when the pick was ignored.
    pub fn select_answer(&self, index: usize) -> Option<bool> {
        let weak = Arc::downgrade(&self.inner);
        let mut inner = self.inner.lock();
        let selection = inner.machine.select_answer(index)?;

        let cue = if selection.correct {
            Cue::Correct
        } else {
            Cue::Incorrect
        };
        if let Err(err) = inner.cue.play(cue) {
            log::debug!("{err}");
        }

        inner.apply(TimerCommand::ScheduleAdvance, &weak);
        inner.publish();
        Some(selection.correct)
    }

    /// Cancels every pending timer. Called on drop as well.
    pub fn teardown(&self) {
        let mut inner = self.inner.lock();
        inner.cancel_timer();
        inner.epoch += 1;
    }

    pub fn view(&self) -> QuizView {
        QuizView::of(&self.inner.lock().machine)
    }

    pub fn subscribe(&self) -> watch::Receiver<QuizView> {
        self.inner.lock().views.subscribe()
    }

    #[cfg(test)]
    pub(crate) fn has_pending_timer(&self) -> bool {
        self.inner
            .lock()
            .timer
            .as_ref()
            .is_some_and(|t| !t.handle.is_finished())
    }
}

impl Drop for QuizSession {
    fn drop(&mut self) {
        self.teardown();
    }
}
