//! `bumblebot check` — Validate configuration and report what is enabled.

use bumblebot_config::AppConfig;

pub async fn run(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    println!("🐝 Bumblebot — Configuration Check");
    println!("==================================\n");

    let mut issues = 0;

    match config.validate() {
        Ok(()) => println!("  ✅ Config values valid"),
        Err(e) => {
            println!("  ❌ Config invalid: {e}");
            issues += 1;
        }
    }

    if config.telegram.bot_token.is_some() {
        println!("  ✅ Telegram bot token configured");
    } else {
        println!("  ❌ No Telegram bot token — set TELEGRAM_BOT_TOKEN");
        issues += 1;
    }

    if config.llm.api_key.is_some() {
        println!("  ✅ LLM API key configured (model: {})", config.llm.model);
    } else {
        println!("  ❌ No LLM API key — set GEMINI_API_KEY");
        issues += 1;
    }

    if config.search.api_key.is_some() {
        println!(
            "  ✅ Web search enabled ({} requests/month)",
            config.search.monthly_limit
        );
    } else {
        println!("  ⚠️  No Tavily API key — /search disabled");
    }

    if config.telegram.allowed_chats.is_empty() {
        println!("  ⚠️  No chat allowlist — the bot will answer in any chat");
    } else {
        println!(
            "  ✅ Allowlist active ({} chats)",
            config.telegram.allowed_chats.len()
        );
    }

    println!("  ℹ️  Fact store: {}", config.memory.db_path);
    println!("  ℹ️  Chat stats: {}", config.context.stats_db_path);

    println!();
    if issues == 0 {
        println!("  🎉 Ready to run!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
