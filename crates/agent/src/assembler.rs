//! System prompt assembly.
//!
//! The system prompt is the persona followed by whichever context blocks are
//! non-empty, in a fixed order: group history, private dialogue history,
//! stored facts, reply quote. Blocks arrive pre-rendered (headers included)
//! from the memory and tracker crates; this module only decides order and
//! separation.

use bumblebot_core::message::truncate_body;

/// Quoted reply bodies are cut at this many characters.
const QUOTE_CHARS: usize = 100;

/// Pre-rendered context blocks for one incoming message.
#[derive(Debug, Clone, Default)]
pub struct ContextBlocks {
    /// Group history (user thread + chat stream), empty in private chats
    pub group_context: String,

    /// Private dialogue history, empty in group chats
    pub conversation_context: String,

    /// Stored facts about the asker
    pub fact_context: String,

    /// Text of the bot message the user replies to, if any
    pub reply_quote: Option<String>,
}

/// Fold persona and context blocks into one system prompt.
pub fn assemble_system(persona: &str, blocks: &ContextBlocks) -> String {
    let mut system = persona.to_string();

    for block in [
        &blocks.group_context,
        &blocks.conversation_context,
        &blocks.fact_context,
    ] {
        if !block.is_empty() {
            system.push('\n');
            system.push_str(block);
        }
    }

    if let Some(quote) = &blocks.reply_quote {
        system.push_str(&format!(
            "\nПользователь отвечает на твоё сообщение: «{}»",
            truncate_body(quote, QUOTE_CHARS)
        ));
    }

    system
}

#[cfg(test)]
mod tests {
    use super::*;

    const PERSONA: &str = "Ты — Шмель.";

    #[test]
    fn persona_alone_when_no_context() {
        assert_eq!(assemble_system(PERSONA, &ContextBlocks::default()), PERSONA);
    }

    #[test]
    fn blocks_appear_in_fixed_order() {
        let blocks = ContextBlocks {
            group_context: "👥 чат".into(),
            conversation_context: "**Последние сообщения**".into(),
            fact_context: "**Что я знаю**".into(),
            reply_quote: None,
        };
        let system = assemble_system(PERSONA, &blocks);
        let group_at = system.find("👥 чат").unwrap();
        let dialogue_at = system.find("**Последние сообщения**").unwrap();
        let facts_at = system.find("**Что я знаю**").unwrap();
        assert!(system.starts_with(PERSONA));
        assert!(group_at < dialogue_at);
        assert!(dialogue_at < facts_at);
    }

    #[test]
    fn empty_blocks_add_no_separators() {
        let blocks = ContextBlocks {
            fact_context: "факты".into(),
            ..Default::default()
        };
        assert_eq!(assemble_system(PERSONA, &blocks), "Ты — Шмель.\nфакты");
    }

    #[test]
    fn reply_quote_is_truncated() {
        let blocks = ContextBlocks {
            reply_quote: Some("б".repeat(300)),
            ..Default::default()
        };
        let system = assemble_system(PERSONA, &blocks);
        assert!(system.contains("Пользователь отвечает на твоё сообщение"));
        assert!(system.contains(&format!("«{}...»", "б".repeat(100))));
    }
}
