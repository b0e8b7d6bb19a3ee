use std::path::PathBuf;

use crate::model::{Category, CommandDefinition, PayloadSource};

const WAIFU_SFW: &str = "https://api.waifu.pics/sfw/";
const WAIFU_NSFW: &str = "https://api.waifu.pics/nsfw/";
const NEKOS: &str = "https://nekos.life/api/v2/img/";

fn remote(
    name: &str,
    aliases: &[&str],
    action: &str,
    provider: &str,
    category: Category,
) -> CommandDefinition {
    CommandDefinition {
        name: name.to_owned(),
        aliases: aliases.iter().map(|a| (*a).to_owned()).collect(),
        action: action.to_owned(),
        category,
        source: PayloadSource::Remote {
            provider: provider.to_owned(),
            category: name.to_owned(),
        },
    }
}

/// Command set used when the config file does not list any.
#[must_use]
pub fn default_commands() -> Vec<CommandDefinition> {
    use Category::{AnimeSfw, Nsfw};
    vec![
        CommandDefinition {
            name: "memes".to_owned(),
            aliases: vec!["momos".to_owned(), "gracioso".to_owned()],
            action: "found an epic meme for".to_owned(),
            category: Category::General,
            source: PayloadSource::Local {
                directory: PathBuf::from("./assets/memes"),
            },
        },
        remote("kiss", &["beso", "muack"], "gave a kiss to", WAIFU_SFW, AnimeSfw),
        remote("hug", &["abrazo", "abrazar"], "gave a warm hug to", WAIFU_SFW, AnimeSfw),
        remote("slap", &["cachetada", "golpe"], "landed a huge slap on", WAIFU_SFW, AnimeSfw),
        remote("pat", &["palmadita"], "gave an approving pat to", WAIFU_SFW, AnimeSfw),
        remote("cuddle", &["acurrucar"], "cuddled up with", WAIFU_SFW, AnimeSfw),
        remote("wink", &["guiño"], "winked at", WAIFU_SFW, AnimeSfw),
        remote("happy", &["feliz", "alegre"], "is celebrating with", WAIFU_SFW, AnimeSfw),
        remote("dance", &["bailar", "baile"], "danced for", WAIFU_SFW, AnimeSfw),
        remote("feed", &["alimentar", "comer"], "fed", NEKOS, AnimeSfw),
        remote("blowjob", &["bj", "mamada"], "eagerly sucks off", WAIFU_NSFW, Nsfw),
        remote("cum", &["semen", "corrida"], "came inside", WAIFU_NSFW, Nsfw),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::CommandRegistry;

    #[test]
    fn default_catalog_registers_cleanly() {
        let registry = CommandRegistry::from_definitions('!', default_commands()).unwrap();
        assert_eq!(registry.len(), 12);
        assert_eq!(registry.lookup("!bj").unwrap().name, "blowjob");
        assert_eq!(registry.list_by_category(Category::General).count(), 1);
        match &registry.lookup("!alimentar").unwrap().source {
            PayloadSource::Remote { provider, category } => {
                assert_eq!(provider, NEKOS);
                assert_eq!(category, "feed");
            }
            PayloadSource::Local { .. } => panic!("feed is remote"),
        }
    }
}
