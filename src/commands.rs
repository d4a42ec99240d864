use std::sync::Arc;

use teloxide::{
    payloads::SendMessageSetters,
    prelude::Requester,
    types::{ChatId, Message},
    utils::command::BotCommands,
    Bot,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{AuthBlob, FileAuthStore},
    keyboard::action_keyboard,
    state::QuizState,
    HandlerResult, UserDialogue,
};

#[derive(Debug, Clone, BotCommands)]
#[command(rename_rule = "lowercase")]
pub enum Command {
    #[command(description = "display help.")]
    Help,
    #[command(description = "start the bot")]
    Start,
    #[command(description = "abandon the current quiz")]
    Cancel,
    #[command(description = "attach your shop account: /login <token>")]
    Login(String),
    #[command(description = "forget your shop account")]
    Logout,
}

/// Auth store key holding the token of one chat.
pub fn chat_key(chat_id: ChatId) -> String {
    format!("chat:{}", chat_id.0)
}

pub(crate) async fn help(bot: Bot, msg: Message) -> HandlerResult {
    bot.send_message(msg.chat.id, Command::descriptions().to_string())
        .await?;
    Ok(())
}

pub(crate) async fn cancel(bot: Bot, dialogue: UserDialogue, msg: Message) -> HandlerResult {
    bot.send_message(msg.chat.id, "Cancelling quiz. Your answers were not submitted.")
        .reply_markup(action_keyboard())
        .await?;
    dialogue.update(QuizState::Start).await?;
    Ok(())
}

pub(crate) async fn start(bot: Bot, msg: Message, dialogue: UserDialogue) -> HandlerResult {
    bot.send_message(msg.chat.id, "Please choose what to do:")
        .reply_markup(action_keyboard())
        .await?;
    dialogue.update(QuizState::Start).await?;
    Ok(())
}

#[instrument(level = "info", skip(bot, msg, token, store), fields(chat = %msg.chat.id))]
pub(crate) async fn login(
    bot: Bot,
    msg: Message,
    token: String,
    store: Arc<FileAuthStore>,
) -> HandlerResult {
    let token = token.trim();
    if token.is_empty() {
        bot.send_message(msg.chat.id, "Usage: /login <token>").await?;
        return Ok(());
    }

    // The token should not linger in the chat history.
    if let Err(e) = bot.delete_message(msg.chat.id, msg.id).await {
        warn!("Could not delete login message: {e}");
    }

    let mut blob = AuthBlob::new(token);
    if let Some(username) = msg.chat.username() {
        blob.extra.insert("username".into(), username.into());
    }

    match store.save(&chat_key(msg.chat.id), blob) {
        Ok(()) => {
            info!("{} signed in", msg.chat.username().unwrap_or_default());
            bot.send_message(msg.chat.id, "Signed in. Quiz results will count towards your milestones.")
                .reply_markup(action_keyboard())
                .await?;
        }
        Err(e) => {
            warn!("Failed to store token: {e}");
            bot.send_message(msg.chat.id, "Could not save your token, please try again later.")
                .await?;
        }
    }

    Ok(())
}

#[instrument(level = "info", skip(bot, msg, store), fields(chat = %msg.chat.id))]
pub(crate) async fn logout(bot: Bot, msg: Message, store: Arc<FileAuthStore>) -> HandlerResult {
    let text = match store.remove(&chat_key(msg.chat.id)) {
        Ok(true) => "Signed out.",
        Ok(false) => "You were not signed in.",
        Err(e) => {
            warn!("Failed to remove token: {e}");
            "Could not sign you out, please try again later."
        }
    };
    bot.send_message(msg.chat.id, text).await?;
    Ok(())
}
