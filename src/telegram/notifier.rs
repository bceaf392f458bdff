//! Chat notifier for submission outcomes.

use teloxide::prelude::*;
use thiserror::Error;

/// Errors that can occur when delivering a chat message.
#[derive(Debug, Error)]
pub enum TelegramError {
    #[error("Telegram request failed: {0}")]
    Request(#[from] teloxide::RequestError),
}

/// Delivers messages to users outside the command/response cycle.
///
/// The dispatcher replies to commands directly; this wrapper exists for
/// the scheduler, which has no inbound message to reply to.
#[derive(Debug, Clone)]
pub struct Notifier {
    bot: Bot,
}

impl Notifier {
    /// Creates a notifier from a bot handle.
    #[must_use]
    pub const fn new(bot: Bot) -> Self {
        Self { bot }
    }

    /// Sends a plain-text message to a user's private chat.
    ///
    /// # Errors
    ///
    /// Returns an error if the Bot API rejects the request.
    pub async fn notify(&self, user: i64, text: &str) -> Result<(), TelegramError> {
        self.bot.send_message(ChatId(user), text).await?;
        Ok(())
    }
}
