use std::collections::BTreeMap;

use math_quiz_bot::forms::contact::{contact_form, prompt_for};
use math_quiz_bot::forms::simple::simple_form;
use math_quiz_bot::forms::FormSession;
use math_quiz_bot::FormError;
use serde_json::Value;
use teloxide::{
    prelude::*,
    types::{KeyboardButton, KeyboardMarkup, KeyboardRemove},
};

use super::{menu, HandlerResult, QuizDialogue, State};

const BACK: &str = "⬅️ Back";

/// Which form a chat is filling in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum FormKind {
    Contact,
    SignUp,
}

impl FormKind {
    fn build(self) -> Result<FormSession, FormError> {
        match self {
            FormKind::Contact => contact_form(),
            FormKind::SignUp => simple_form(),
        }
    }

    fn title(self) -> &'static str {
        match self {
            FormKind::Contact => "✉️ Contact us",
            FormKind::SignUp => "📝 Sign up",
        }
    }

    fn thanks(self) -> &'static str {
        match self {
            FormKind::Contact => "🙏 Thanks! Your message has been sent.",
            FormKind::SignUp => "🎉 Thanks for signing up!",
        }
    }
}

pub async fn begin(
    bot: &Bot,
    dialogue: &QuizDialogue,
    chat_id: ChatId,
    kind: FormKind,
) -> HandlerResult {
    let form = kind.build()?;
    bot.send_message(chat_id, kind.title())
        .reply_markup(KeyboardRemove::new())
        .await?;
    if let Some(field) = pending_field(&form, &BTreeMap::new()) {
        ask(bot, chat_id, &form, &field).await?;
    }
    dialogue
        .update(State::FillForm {
            kind,
            step: 0,
            values: BTreeMap::new(),
        })
        .await?;
    Ok(())
}

/// Rebuilds the form from what the dialogue remembers.
fn restore(
    kind: FormKind,
    step: usize,
    values: &BTreeMap<String, String>,
) -> Result<FormSession, FormError> {
    let mut form = kind.build()?;
    for (name, value) in values {
        form.set_value(name, Value::String(value.clone()));
    }
    while form.current_step() < step && !form.is_last_step() {
        let before = form.current_step();
        form.next_step();
        if form.current_step() == before {
            break;
        }
    }
    Ok(form)
}

/// First field of the current step the user hasn't answered yet.
fn pending_field(form: &FormSession, values: &BTreeMap<String, String>) -> Option<String> {
    form.steps()
        .get(form.current_step())?
        .iter()
        .find(|name| !values.contains_key(*name))
        .cloned()
}

async fn ask(bot: &Bot, chat_id: ChatId, form: &FormSession, field: &str) -> HandlerResult {
    let request = bot.send_message(chat_id, prompt_for(field));
    if form.current_step() > 0 {
        request
            .reply_markup(KeyboardMarkup::new(vec![vec![KeyboardButton::new(BACK)]]))
            .await?;
    } else {
        request.await?;
    }
    Ok(())
}

pub async fn receive_form_field(
    bot: Bot,
    dialogue: QuizDialogue,
    (kind, step, mut values): (FormKind, usize, BTreeMap<String, String>),
    msg: Message,
) -> HandlerResult {
    let chat_id = msg.chat.id;
    let mut form = restore(kind, step, &values)?;

    let Some(text) = msg.text() else {
        bot.send_message(chat_id, "Please send text").await?;
        return Ok(());
    };

    if text == BACK {
        form.prev_step();
        for name in form.steps().get(form.current_step()).into_iter().flatten() {
            values.remove(name);
        }
        if let Some(field) = pending_field(&form, &values) {
            ask(&bot, chat_id, &form, &field).await?;
        }
        dialogue
            .update(State::FillForm {
                kind,
                step: form.current_step(),
                values,
            })
            .await?;
        return Ok(());
    }

    let Some(field) = pending_field(&form, &values) else {
        // nothing left to ask on this step; should not happen, start over
        return begin(&bot, &dialogue, chat_id, kind).await;
    };

    form.set_value(&field, Value::String(text.trim().to_string()));
    if !form.validate_field(&field) {
        let error = form.error(&field).unwrap_or("Invalid value");
        bot.send_message(chat_id, format!("⚠️ {error}")).await?;
        return ask(&bot, chat_id, &form, &field).await;
    }
    values.insert(field, text.trim().to_string());

    if let Some(next) = pending_field(&form, &values) {
        ask(&bot, chat_id, &form, &next).await?;
    } else if form.is_last_step() {
        let mut submitted = None;
        if form.submit(|data| submitted = Some(data)) {
            log::info!("{kind:?} form submitted from {chat_id}: {submitted:?}");
            bot.send_message(chat_id, kind.thanks()).await?;
            return menu::show_menu(&bot, &dialogue, chat_id).await;
        }
        // a previous step no longer validates
        bot.send_message(chat_id, "⚠️ Some fields are invalid, let's start over.")
            .await?;
        return begin(&bot, &dialogue, chat_id, kind).await;
    } else {
        form.next_step();
        if let Some(next) = pending_field(&form, &values) {
            ask(&bot, chat_id, &form, &next).await?;
        }
    }

    dialogue
        .update(State::FillForm {
            kind,
            step: form.current_step(),
            values,
        })
        .await?;
    Ok(())
}
