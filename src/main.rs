mod handlers;

use std::sync::Arc;

use dotenv::dotenv;
use handlers::{AppContext, DialogueStorage};
use math_quiz_bot::quiz::bank::{DirectoryBank, EmbeddedBank, QuestionBank};
use math_quiz_bot::store::{FileStorage, StorageBackend};
use math_quiz_bot::Config;
use teloxide::{
    dispatching::dialogue::{serializer::Json, SqliteStorage, Storage},
    prelude::*,
};

#[tokio::main]
async fn main() {
    // A missing .env is fine, the variables may come from the environment
    dotenv().ok();
    pretty_env_logger::init();
    log::info!("Starting math quiz bot...");

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            log::error!("invalid configuration: {err}");
            return;
        }
    };

    let bot = Bot::from_env();

    let storage: DialogueStorage = match SqliteStorage::open(&config.database_path, Json).await {
        Ok(storage) => storage.erase(),
        Err(err) => {
            log::error!("could not open {}: {err}", config.database_path);
            return;
        }
    };

    let bank: Arc<dyn QuestionBank> = match &config.data_dir {
        Some(dir) => {
            log::info!("loading question banks from {}", dir.display());
            Arc::new(DirectoryBank::new(dir))
        }
        None => Arc::new(EmbeddedBank),
    };
    let accounts: Arc<dyn StorageBackend> = Arc::new(FileStorage::new(&config.store_dir));
    let ctx = AppContext::new(config, bank, accounts);

    Dispatcher::builder(bot, handlers::schema())
        .dependencies(dptree::deps![storage, ctx])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

