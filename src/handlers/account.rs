use std::collections::HashMap;
use std::sync::Arc;

use math_quiz_bot::auth::{self, Access, AppState, AppStore, Route, ADMIN_ROLE};
use math_quiz_bot::store::StorageBackend;
use parking_lot::Mutex;
use teloxide::{
    prelude::*,
    types::{KeyboardButton, KeyboardMarkup},
};

use super::menu::{HOME, PROFILE, SETTINGS};
use super::{AppContext, HandlerResult};

/// Per-chat auth stores, all persisted through the same backend.
pub struct Accounts {
    storage: Arc<dyn StorageBackend>,
    stores: Mutex<HashMap<ChatId, AppStore>>,
}

impl Accounts {
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Self {
            storage,
            stores: Mutex::new(HashMap::new()),
        }
    }

    /// The store is created (and restored from storage) on first use.
    pub fn store_for(&self, chat_id: ChatId) -> AppStore {
        self.stores
            .lock()
            .entry(chat_id)
            .or_insert_with(|| {
                auth::app_store(
                    Some(self.storage.clone()),
                    format!("app_state_{}", chat_id.0),
                )
            })
            .clone()
    }
}

fn redirect_text(route: Route) -> &'static str {
    match route {
        Route::Login => "🔒 You need to log in first. Press \"🔑 Login\".",
        Route::AccessDenied => "⛔ Access denied. This page is for admins only.",
    }
}

pub async fn login(bot: &Bot, ctx: &AppContext, chat_id: ChatId) -> HandlerResult {
    let store = ctx.accounts.store_for(chat_id);
    auth::login_demo(&store);
    log::info!("chat {chat_id} logged in");
    bot.send_message(chat_id, "🔓 Logged in as demo user.")
        .await?;
    dashboard(bot, ctx, chat_id, DashboardPage::Home).await
}

pub async fn logout(bot: &Bot, ctx: &AppContext, chat_id: ChatId) -> HandlerResult {
    auth::logout(&ctx.accounts.store_for(chat_id));
    bot.send_message(chat_id, "👋 Logged out.").await?;
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashboardPage {
    Home,
    Profile,
    Settings,
}

fn dashboard_keyboard() -> KeyboardMarkup {
    KeyboardMarkup::new(vec![
        vec![KeyboardButton::new(PROFILE), KeyboardButton::new(SETTINGS)],
        vec![KeyboardButton::new(HOME)],
    ])
}

fn page_text(page: DashboardPage, state: &AppState, ctx: &AppContext) -> String {
    match page {
        DashboardPage::Home => "📊 Dashboard\nPick a page below.".to_string(),
        DashboardPage::Profile => format!(
            "👤 Profile\nRole: {}\nToken: {}",
            state.user_role.as_deref().unwrap_or("none"),
            state.auth_token.as_deref().unwrap_or("none")
        ),
        DashboardPage::Settings => {
            let quiz = &ctx.config.quiz;
            format!(
                "⚙️ Settings\nQuestions per quiz: {}\nTime per question: {}s\nPause after an answer: {}ms",
                quiz.max_questions,
                quiz.time_limit,
                quiz.advance_delay.as_millis()
            )
        }
    }
}

/// Every dashboard page sits behind the login guard.
pub async fn dashboard(
    bot: &Bot,
    ctx: &AppContext,
    chat_id: ChatId,
    page: DashboardPage,
) -> HandlerResult {
    let state = ctx.accounts.store_for(chat_id).get_state();
    match auth::auth_guard(&state) {
        Access::Granted => {
            bot.send_message(chat_id, page_text(page, &state, ctx))
                .reply_markup(dashboard_keyboard())
                .await?;
        }
        Access::Redirect(route) => {
            bot.send_message(chat_id, redirect_text(route)).await?;
        }
    }
    Ok(())
}

pub async fn admin(bot: &Bot, ctx: &AppContext, chat_id: ChatId) -> HandlerResult {
    let state = ctx.accounts.store_for(chat_id).get_state();
    let access = match auth::auth_guard(&state) {
        Access::Granted => auth::role_guard(ADMIN_ROLE, &state),
        redirect => redirect,
    };
    let text = match access {
        Access::Granted => "🛡️ Admin area. Nothing to administer yet.",
        Access::Redirect(route) => redirect_text(route),
    };
    bot.send_message(chat_id, text).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use math_quiz_bot::quiz::bank::EmbeddedBank;
    use math_quiz_bot::store::MemoryStorage;
    use math_quiz_bot::Config;

    #[test]
    fn each_chat_gets_its_own_store() {
        let accounts = Accounts::new(Arc::new(MemoryStorage::default()));
        auth::login_demo(&accounts.store_for(ChatId(1)));

        assert!(accounts.store_for(ChatId(1)).get_state().auth_token.is_some());
        assert!(accounts.store_for(ChatId(2)).get_state().auth_token.is_none());
    }

    #[test]
    fn login_survives_a_fresh_registry() {
        let storage: Arc<dyn StorageBackend> = Arc::new(MemoryStorage::default());
        auth::login_demo(&Accounts::new(storage.clone()).store_for(ChatId(7)));

        let state = Accounts::new(storage).store_for(ChatId(7)).get_state();
        assert_eq!(state.user_role.as_deref(), Some(ADMIN_ROLE));
    }

    #[test]
    fn dashboard_pages_show_the_account_and_quiz_settings() {
        let ctx = AppContext::new(
            Config::default(),
            Arc::new(EmbeddedBank),
            Arc::new(MemoryStorage::default()),
        );
        let store = ctx.accounts.store_for(ChatId(3));
        auth::login_demo(&store);
        let state = store.get_state();

        let profile = page_text(DashboardPage::Profile, &state, &ctx);
        assert!(profile.contains("Role: admin"));
        let settings = page_text(DashboardPage::Settings, &state, &ctx);
        assert!(settings.contains("Questions per quiz: 20"));
        assert!(settings.contains("Time per question: 15s"));
    }
}
