//! Chat platform channels.
//!
//! [`telegram::TelegramChannel`] speaks the Bot API over long polling.
//! [`trigger`] decides whether an incoming message is addressed to the bot
//! at all — the channel delivers everything, the trigger filters.

pub mod telegram;
pub mod trigger;

pub use telegram::TelegramChannel;
pub use trigger::extract_trigger;
