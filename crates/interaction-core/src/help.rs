use core::fmt::Write as _;

use crate::{
    model::Category,
    registry::{CommandRegistry, DISABLE_COMMAND, ENABLE_COMMAND},
};

const USAGE_HINT: &str = "mention someone or quote a message";

const fn section_title(category: Category) -> &'static str {
    match category {
        Category::General => "🖼️ *General / Memes*",
        Category::AnimeSfw => "💖 *Anime reactions*",
        Category::Nsfw => "🔞 *NSFW reactions*",
    }
}

/// Help text listing every interaction command by category, followed by the
/// admin commands. Categories with no commands are left out.
#[must_use]
pub fn render_help(registry: &CommandRegistry, bot_name: &str) -> String {
    let prefix = registry.prefix();
    let mut out = String::new();
    _ = writeln!(
        out,
        "👋 *Hi!* I'm {bot_name}. Here is what I can do:\n\n✨ *Public commands* ✨"
    );

    for category in Category::ALL {
        let mut commands = registry.list_by_category(category).peekable();
        if commands.peek().is_none() {
            continue;
        }
        _ = writeln!(out, "\n{}\n", section_title(category));
        for def in commands {
            let aliases = if def.aliases.is_empty() {
                String::new()
            } else {
                let list = def
                    .aliases
                    .iter()
                    .map(|a| registry.normalize(a))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!(" [{list}]")
            };
            _ = writeln!(
                out,
                "🔸 *{}*{aliases}:\n   _{} ({USAGE_HINT})_",
                registry.normalize(&def.name),
                def.action
            );
        }
    }

    _ = write!(
        out,
        "\n🛡️ *Admin commands* 🛡️\n\
         _Only group admins and the bot owner can use these._\n\n\
         🔹 *{prefix}{ENABLE_COMMAND}*: enable the bot in this chat.\n\
         🔹 *{prefix}{DISABLE_COMMAND}*: disable the bot in this chat."
    );
    out
}
