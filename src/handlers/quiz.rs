use std::collections::HashMap;
use std::sync::Arc;

use math_quiz_bot::quiz::feedback::{score_evaluation, AnswerCue, Cue};
use math_quiz_bot::quiz::training::DEFAULT_TABLE;
use math_quiz_bot::quiz::{Operation, Phase, QuizParams, QuizSession, QuizView};
use math_quiz_bot::CueError;
use parking_lot::Mutex;
use teloxide::{
    prelude::*,
    types::{KeyboardButton, KeyboardMarkup},
};
use tokio::sync::watch;

use super::menu::{self, HOME};
use super::{AppContext, HandlerResult, QuizDialogue, State};

const RESTART: &str = "🔄 Restart";
const RETRY: &str = "🔁 Retry";

/// Live quiz sessions, one per chat. Removing a session tears its timers down.
///
/// The map lock only guards lookups; sessions are driven through a cloned
/// `Arc` so a slow bank load in one chat never blocks another.
#[derive(Default)]
pub struct QuizRegistry {
    sessions: Mutex<HashMap<ChatId, Arc<QuizSession>>>,
}

impl QuizRegistry {
    fn insert(&self, chat_id: ChatId, session: QuizSession) {
        let previous = self.sessions.lock().insert(chat_id, Arc::new(session));
        if let Some(previous) = previous {
            previous.teardown();
        }
    }

    pub fn stop(&self, chat_id: ChatId) {
        let removed = self.sessions.lock().remove(&chat_id);
        if let Some(session) = removed {
            session.teardown();
            log::debug!("quiz for {chat_id} torn down");
        }
    }

    fn get(&self, chat_id: ChatId) -> Option<Arc<QuizSession>> {
        self.sessions.lock().get(&chat_id).cloned()
    }
}

/// Stands in for the correct/incorrect sounds: a short chat message, not awaited.
struct ChatCue {
    bot: Bot,
    chat_id: ChatId,
}

impl AnswerCue for ChatCue {
    fn play(&self, cue: Cue) -> Result<(), CueError> {
        let text = match cue {
            Cue::Correct => "✅ Correct!",
            Cue::Incorrect => "❌ Wrong!",
        };
        let bot = self.bot.clone();
        let chat_id = self.chat_id;
        tokio::spawn(async move {
            // We don't really care about the result here
            let _ = bot.send_message(chat_id, text).await;
        });
        Ok(())
    }
}

pub async fn begin(
    bot: &Bot,
    dialogue: &QuizDialogue,
    ctx: &AppContext,
    chat_id: ChatId,
    params: QuizParams,
) -> HandlerResult {
    let cue = Arc::new(ChatCue {
        bot: bot.clone(),
        chat_id,
    });
    let session = QuizSession::new(ctx.config.quiz.clone(), ctx.bank.clone(), cue);
    spawn_renderer(bot.clone(), chat_id, session.subscribe());

    bot.send_message(chat_id, "🧠 Loading... get ready for a great quiz!")
        .await?;
    session.start(params);
    ctx.quizzes.insert(chat_id, session);

    dialogue.update(State::InQuiz).await?;
    Ok(())
}

/// `/quiz <operation>?mode=training&table=N`
pub async fn quiz_route(
    bot: Bot,
    dialogue: QuizDialogue,
    ctx: AppContext,
    route: String,
    msg: Message,
) -> HandlerResult {
    let route = route.trim();
    let (operation, query) = route.split_once('?').unwrap_or((route, ""));
    let operation = Some(operation).filter(|op| !op.is_empty());
    let params = QuizParams::from_route(operation, query);
    begin(&bot, &dialogue, &ctx, msg.chat.id, params).await
}

pub async fn ask_training_operation(
    bot: &Bot,
    dialogue: &QuizDialogue,
    chat_id: ChatId,
) -> HandlerResult {
    let keyboard = KeyboardMarkup::new(vec![Operation::ALL
        .iter()
        .map(|op| KeyboardButton::new(menu::operation_button(*op)))
        .collect::<Vec<_>>()]);
    bot.send_message(chat_id, "🏋️ Training mode\nWhich operation?")
        .reply_markup(keyboard)
        .await?;
    dialogue.update(State::ReceiveTrainingOperation).await?;
    Ok(())
}

pub async fn receive_training_operation(
    bot: Bot,
    dialogue: QuizDialogue,
    msg: Message,
) -> HandlerResult {
    let Some(operation) = msg.text().and_then(menu::operation_from_button) else {
        bot.send_message(msg.chat.id, "Please pick one of the operations")
            .await?;
        return Ok(());
    };

    let keyboard = KeyboardMarkup::new(
        (0..=12)
            .collect::<Vec<i64>>()
            .chunks(4)
            .map(|row| {
                row.iter()
                    .map(|n| KeyboardButton::new(n.to_string()))
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>(),
    );
    bot.send_message(msg.chat.id, "Which table?")
        .reply_markup(keyboard)
        .await?;
    dialogue
        .update(State::ReceiveTrainingTable { operation })
        .await?;
    Ok(())
}

pub async fn receive_training_table(
    bot: Bot,
    dialogue: QuizDialogue,
    ctx: AppContext,
    operation: Operation,
    msg: Message,
) -> HandlerResult {
    let table = msg
        .text()
        .map(|text| QuizParams::from_route(None, &format!("table={}", text.trim())).table);
    let Some(Some(table)) = table else {
        bot.send_message(msg.chat.id, "Please enter a number between 0 and 100")
            .await?;
        return Ok(());
    };

    let params = QuizParams::training(operation, Some(table));
    begin(&bot, &dialogue, &ctx, msg.chat.id, params).await
}

pub async fn in_quiz(
    bot: Bot,
    dialogue: QuizDialogue,
    ctx: AppContext,
    msg: Message,
) -> HandlerResult {
    let chat_id = msg.chat.id;
    let Some(text) = msg.text() else {
        bot.send_message(chat_id, "Please pick one of the answers")
            .await?;
        return Ok(());
    };

    if text == HOME {
        ctx.quizzes.stop(chat_id);
        return menu::show_menu(&bot, &dialogue, chat_id).await;
    }

    let outcome = ctx.quizzes.get(chat_id).map(|session| {
        let view = session.view();
        match (text, &view.phase) {
            (RESTART, Phase::Finished) => {
                session.restart(None);
                Outcome::Reloaded(session.view())
            }
            (RETRY, Phase::Failed(_)) => {
                session.retry();
                Outcome::Reloaded(session.view())
            }
            (answer, Phase::InProgress) if !view.answer_chosen => {
                match view.answer_position(answer) {
                    Some(index) => {
                        session.select_answer(index);
                        Outcome::Answered
                    }
                    None => Outcome::NotAnAnswer,
                }
            }
            _ => Outcome::Ignored,
        }
    });

    match outcome {
        // e.g. the bot was restarted while this chat was in a quiz
        None => {
            bot.send_message(chat_id, "This quiz is no longer running.")
                .await?;
            menu::show_menu(&bot, &dialogue, chat_id).await?;
        }
        Some(Outcome::Reloaded(view)) => {
            // a repeated failure has the same phase as before, so the renderer skips it
            if let Phase::Failed(message) = &view.phase {
                bot.send_message(chat_id, message.as_str())
                    .reply_markup(retry_keyboard())
                    .await?;
            }
        }
        Some(Outcome::NotAnAnswer) => {
            bot.send_message(chat_id, "Please pick one of the answers 👇")
                .await?;
        }
        Some(Outcome::Answered) | Some(Outcome::Ignored) => {}
    }
    Ok(())
}

enum Outcome {
    Reloaded(QuizView),
    Answered,
    NotAnAnswer,
    Ignored,
}

fn retry_keyboard() -> KeyboardMarkup {
    KeyboardMarkup::new(vec![vec![
        KeyboardButton::new(RETRY),
        KeyboardButton::new(HOME),
    ]])
}

/// Sends a message whenever the current question or the phase changes.
fn spawn_renderer(bot: Bot, chat_id: ChatId, mut views: watch::Receiver<QuizView>) {
    tokio::spawn(async move {
        let mut shown: Option<(Phase, usize)> = None;
        while views.changed().await.is_ok() {
            let view = views.borrow_and_update().clone();
            if view.phase == Phase::Loading {
                continue;
            }
            let key = (view.phase.clone(), view.current_index);
            if shown.as_ref() == Some(&key) {
                continue;
            }
            shown = Some(key);
            if let Err(err) = render(&bot, chat_id, &view).await {
                log::warn!("could not render quiz for {chat_id}: {err}");
            }
        }
    });
}

async fn render(bot: &Bot, chat_id: ChatId, view: &QuizView) -> HandlerResult {
    match &view.phase {
        Phase::Loading => {}
        Phase::InProgress => {
            let header = if view.training {
                format!(
                    "🏋️ Training: {} table of {}",
                    view.operation,
                    view.table.unwrap_or(DEFAULT_TABLE)
                )
            } else {
                format!(
                    "Question {}/{}   ⏰ {}s",
                    view.current_index + 1,
                    view.total_questions,
                    view.time_left
                )
            };
            let text = format!(
                "{header}\n\n{}\n\n🎯 Score: {}/{}",
                view.prompt.as_deref().unwrap_or_default(),
                view.score,
                view.total_questions
            );
            let answers = view
                .answers
                .iter()
                .map(|a| KeyboardButton::new(a.clone()))
                .collect::<Vec<_>>();
            bot.send_message(chat_id, text)
                .reply_markup(KeyboardMarkup::new(vec![answers, vec![KeyboardButton::new(HOME)]]))
                .await?;
        }
        Phase::Finished => {
            let total = u32::try_from(view.total_questions).unwrap_or(u32::MAX);
            let text = format!(
                "🎉 You're done!\n{}\n🌈 Final score: {}/{}",
                score_evaluation(view.score, total),
                view.score,
                view.total_questions
            );
            bot.send_message(chat_id, text)
                .reply_markup(KeyboardMarkup::new(vec![vec![
                    KeyboardButton::new(RESTART),
                    KeyboardButton::new(HOME),
                ]]))
                .await?;
        }
        Phase::Failed(message) => {
            bot.send_message(chat_id, message.as_str())
                .reply_markup(retry_keyboard())
                .await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use math_quiz_bot::quiz::feedback::SilentCue;
    use math_quiz_bot::quiz::machine::QuizSettings;
    use math_quiz_bot::quiz::bank::EmbeddedBank;

    fn session() -> QuizSession {
        QuizSession::new(QuizSettings::default(), Arc::new(EmbeddedBank), Arc::new(SilentCue))
    }

    #[tokio::test(start_paused = true)]
    async fn sessions_are_driven_outside_the_registry_lock() {
        let registry = QuizRegistry::default();
        registry.insert(ChatId(1), session());
        registry.insert(ChatId(2), session());

        let first = registry.get(ChatId(1)).expect("first chat");
        first.start(QuizParams::timed(Operation::Addition));
        // the map is free while `first` is held and used
        assert!(registry.sessions.try_lock().is_some());
        assert!(registry.get(ChatId(2)).is_some());
        assert_eq!(first.view().phase, Phase::InProgress);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_removes_and_freezes_the_quiz() {
        let registry = QuizRegistry::default();
        registry.insert(ChatId(1), session());
        let quiz = registry.get(ChatId(1)).expect("registered");
        quiz.start(QuizParams::timed(Operation::Addition));

        registry.stop(ChatId(1));
        assert!(registry.get(ChatId(1)).is_none());
        let time_left = quiz.view().time_left;
        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
        assert_eq!(quiz.view().time_left, time_left);
    }
}
