//! Telegram delivery module.
//!
//! Thin wrapper over the Bot API client used to push submission
//! outcomes back to users.

mod notifier;

pub use notifier::{Notifier, TelegramError};
