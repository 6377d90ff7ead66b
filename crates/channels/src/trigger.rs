//! Should the bot answer this message?
//!
//! Private chats: always. Group chats: only when mentioned by username or
//! when the message replies to one of the bot's own messages. The returned
//! text has the mention stripped so the model never sees its own handle.

use bumblebot_core::channel::ChannelMessage;

/// Returns the query text when the bot should respond, `None` otherwise.
pub fn extract_trigger(message: &ChannelMessage, bot_username: &str) -> Option<String> {
    if !message.is_group {
        return Some(message.text.trim().to_string());
    }

    let mention = format!("@{bot_username}");
    let lower = message.text.to_lowercase();
    if lower.contains(&mention.to_lowercase()) {
        let stripped = strip_mention(&message.text, &mention);
        return Some(stripped);
    }

    if message
        .reply_to
        .as_ref()
        .map(|r| r.from_bot)
        .unwrap_or(false)
    {
        return Some(message.text.trim().to_string());
    }

    None
}

/// Remove every occurrence of the mention, case-insensitively.
///
/// Telegram usernames are ASCII, so the match is an ASCII-case-insensitive
/// scan over the original text.
fn strip_mention(text: &str, mention: &str) -> String {
    let mention_len = mention.len();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < text.len() {
        if i + mention_len <= text.len()
            && text.is_char_boundary(i + mention_len)
            && text[i..i + mention_len].eq_ignore_ascii_case(mention)
        {
            i += mention_len;
            continue;
        }
        let Some(ch) = text[i..].chars().next() else {
            break;
        };
        out.push(ch);
        i += ch.len_utf8();
    }

    out.split_whitespace().collect::<Vec<_>>().join(" ")
}
