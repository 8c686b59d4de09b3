use math_quiz_bot::quiz::{Operation, QuizParams};
use teloxide::{
    prelude::*,
    types::{KeyboardButton, KeyboardMarkup},
    utils::command::BotCommands,
};

use super::account::DashboardPage;
use super::form::FormKind;
use super::{account, form, quiz, AppContext, Command, HandlerResult, QuizDialogue, State};

pub const ADDITION: &str = "➕ Addition";
pub const SUBTRACTION: &str = "➖ Subtraction";
pub const MULTIPLICATION: &str = "✖️ Multiplication";
pub const TRAINING: &str = "🏋️ Training";
pub const CONTACT: &str = "✉️ Contact";
pub const SIGN_UP: &str = "📝 Sign up";
pub const LOGIN: &str = "🔑 Login";
pub const LOGOUT: &str = "🚪 Logout";
pub const DASHBOARD: &str = "📊 Dashboard";
pub const ADMIN: &str = "🛡️ Admin";
pub const PROFILE: &str = "👤 Profile";
pub const SETTINGS: &str = "⚙️ Settings";
pub const HOME: &str = "🏠 Menu";

const GREETING_TEXT: &str = "Hi! I'm the math quiz bot 🧠 Pick a quiz and answer as many questions as you can before the clock runs out, or practise one table at a time in training mode.";

pub fn operation_button(operation: Operation) -> &'static str {
    match operation {
        Operation::Addition => ADDITION,
        Operation::Subtraction => SUBTRACTION,
        Operation::Multiplication => MULTIPLICATION,
    }
}

pub fn operation_from_button(text: &str) -> Option<Operation> {
    Operation::ALL
        .into_iter()
        .find(|operation| operation_button(*operation) == text)
}

fn main_menu_keyboard() -> KeyboardMarkup {
    KeyboardMarkup::new(vec![
        vec![
            KeyboardButton::new(ADDITION),
            KeyboardButton::new(SUBTRACTION),
            KeyboardButton::new(MULTIPLICATION),
        ],
        vec![
            KeyboardButton::new(TRAINING),
            KeyboardButton::new(CONTACT),
            KeyboardButton::new(SIGN_UP),
        ],
        vec![
            KeyboardButton::new(LOGIN),
            KeyboardButton::new(DASHBOARD),
            KeyboardButton::new(ADMIN),
            KeyboardButton::new(LOGOUT),
        ],
    ])
}

pub async fn show_menu(bot: &Bot, dialogue: &QuizDialogue, chat_id: ChatId) -> HandlerResult {
    bot.send_message(chat_id, "What would you like to do?")
        .reply_markup(main_menu_keyboard())
        .await?;
    dialogue.update(State::MainMenu).await?;
    Ok(())
}

pub async fn start(
    bot: Bot,
    dialogue: QuizDialogue,
    ctx: AppContext,
    msg: Message,
) -> HandlerResult {
    ctx.quizzes.stop(msg.chat.id);
    bot.send_message(msg.chat.id, GREETING_TEXT).await?;
    show_menu(&bot, &dialogue, msg.chat.id).await
}

pub async fn menu_command(
    bot: Bot,
    dialogue: QuizDialogue,
    ctx: AppContext,
    msg: Message,
) -> HandlerResult {
    ctx.quizzes.stop(msg.chat.id);
    show_menu(&bot, &dialogue, msg.chat.id).await
}

pub async fn help(bot: Bot, msg: Message) -> HandlerResult {
    bot.send_message(msg.chat.id, Command::descriptions().to_string())
        .await?;
    Ok(())
}

pub async fn receive_menu_choice(
    bot: Bot,
    dialogue: QuizDialogue,
    ctx: AppContext,
    msg: Message,
) -> HandlerResult {
    let chat_id = msg.chat.id;
    match msg.text() {
        Some(TRAINING) => quiz::ask_training_operation(&bot, &dialogue, chat_id).await,
        Some(CONTACT) => form::begin(&bot, &dialogue, chat_id, FormKind::Contact).await,
        Some(SIGN_UP) => form::begin(&bot, &dialogue, chat_id, FormKind::SignUp).await,
        Some(HOME) => show_menu(&bot, &dialogue, chat_id).await,
        Some(LOGIN) => account::login(&bot, &ctx, chat_id).await,
        Some(LOGOUT) => account::logout(&bot, &ctx, chat_id).await,
        Some(DASHBOARD) => account::dashboard(&bot, &ctx, chat_id, DashboardPage::Home).await,
        Some(PROFILE) => account::dashboard(&bot, &ctx, chat_id, DashboardPage::Profile).await,
        Some(SETTINGS) => account::dashboard(&bot, &ctx, chat_id, DashboardPage::Settings).await,
        Some(ADMIN) => account::admin(&bot, &ctx, chat_id).await,
        Some(text) => match operation_from_button(text) {
            Some(operation) => {
                quiz::begin(&bot, &dialogue, &ctx, chat_id, QuizParams::timed(operation)).await
            }
            None => {
                bot.send_message(chat_id, "Please pick one of the options")
                    .reply_markup(main_menu_keyboard())
                    .await?;
                Ok(())
            }
        },
        None => {
            bot.send_message(chat_id, "Please pick one of the options")
                .await?;
            Ok(())
        }
    }
}
