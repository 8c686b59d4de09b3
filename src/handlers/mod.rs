pub mod account;
pub mod form;
pub mod menu;
pub mod quiz;

use std::collections::BTreeMap;
use std::sync::Arc;

use math_quiz_bot::quiz::bank::QuestionBank;
use math_quiz_bot::quiz::Operation;
use math_quiz_bot::store::StorageBackend;
use math_quiz_bot::Config;
use teloxide::{
    dispatching::{dialogue::ErasedStorage, UpdateHandler},
    prelude::*,
    utils::command::BotCommands,
};

pub type QuizDialogue = Dialogue<State, ErasedStorage<State>>;
pub type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;
pub type DialogueStorage = Arc<ErasedStorage<State>>;

#[derive(Clone, Default, serde::Serialize, serde::Deserialize)]
pub enum State {
    #[default]
    Start,
    MainMenu,
    ReceiveTrainingOperation,
    ReceiveTrainingTable {
        operation: Operation,
    },
    /// The live session itself is kept in [`quiz::QuizRegistry`].
    InQuiz,
    FillForm {
        kind: form::FormKind,
        step: usize,
        values: BTreeMap<String, String>,
    },
}

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "These commands are supported:")]
pub enum Command {
    #[command(description = "start over.")]
    Start,
    #[command(description = "show the main menu.")]
    Menu,
    #[command(description = "display this text.")]
    Help,
    #[command(description = "open a quiz route, e.g. /quiz multiplication?mode=training&table=7")]
    Quiz(String),
}

/// Everything the handlers share, injected as a single dependency.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    pub bank: Arc<dyn QuestionBank>,
    pub quizzes: Arc<quiz::QuizRegistry>,
    pub accounts: Arc<account::Accounts>,
}

impl AppContext {
    pub fn new(
        config: Config,
        bank: Arc<dyn QuestionBank>,
        account_storage: Arc<dyn StorageBackend>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            bank,
            quizzes: Arc::new(quiz::QuizRegistry::default()),
            accounts: Arc::new(account::Accounts::new(account_storage)),
        }
    }
}

pub fn schema() -> UpdateHandler<Box<dyn std::error::Error + Send + Sync + 'static>> {
    use dptree::case;

    let command_handler = teloxide::filter_command::<Command, _>()
        .branch(case![Command::Start].endpoint(menu::start))
        .branch(case![Command::Menu].endpoint(menu::menu_command))
        .branch(case![Command::Help].endpoint(menu::help))
        .branch(case![Command::Quiz(route)].endpoint(quiz::quiz_route));

    Update::filter_message()
        .enter_dialogue::<Message, ErasedStorage<State>, State>()
        .branch(command_handler)
        .branch(case![State::Start].endpoint(menu::start))
        .branch(case![State::MainMenu].endpoint(menu::receive_menu_choice))
        .branch(case![State::ReceiveTrainingOperation].endpoint(quiz::receive_training_operation))
        .branch(case![State::ReceiveTrainingTable { operation }].endpoint(quiz::receive_training_table))
        .branch(case![State::InQuiz].endpoint(quiz::in_quiz))
        .branch(case![State::FillForm { kind, step, values }].endpoint(form::receive_form_field))
}
