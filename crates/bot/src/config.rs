use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use interaction_core::{CommandDefinition, DispatchSettings, catalog::default_commands};
use serde::Deserialize;
use tracing::info;

const fn default_prefix() -> char {
    '!'
}

fn default_bot_name() -> String {
    "Minato".to_owned()
}

fn default_state_file() -> PathBuf {
    PathBuf::from("./conversation_states.json")
}

const fn default_stale_after_secs() -> u64 {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub(crate) struct BotConfig {
    #[serde(default = "default_prefix")]
    pub(crate) prefix: char,
    #[serde(default = "default_bot_name")]
    pub(crate) bot_name: String,
    /// Matrix user allowed to toggle the bot anywhere, direct rooms
    /// included. Without it only group admins can toggle.
    #[serde(default)]
    pub(crate) owner: Option<String>,
    #[serde(default = "default_state_file")]
    pub(crate) state_file: PathBuf,
    #[serde(default = "default_stale_after_secs")]
    pub(crate) stale_after_secs: u64,
    #[serde(default)]
    pub(crate) commands: Option<Vec<CommandDefinition>>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            bot_name: default_bot_name(),
            owner: None,
            state_file: default_state_file(),
            stale_after_secs: default_stale_after_secs(),
            commands: None,
        }
    }
}

impl BotConfig {
    /// Configured commands, or the built-in catalog when none are listed.
    pub(crate) fn commands(&self) -> Vec<CommandDefinition> {
        self.commands.clone().unwrap_or_else(default_commands)
    }

    /// Configured owner, if it names anyone.
    pub(crate) fn owner(&self) -> Option<String> {
        self.owner
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ToOwned::to_owned)
    }

    pub(crate) fn dispatch_settings(&self) -> DispatchSettings {
        let secs = i64::try_from(self.stale_after_secs).unwrap_or(i64::MAX);
        DispatchSettings {
            bot_name: self.bot_name.clone(),
            stale_after: time::Duration::seconds(secs),
        }
    }
}

pub(crate) fn load_config(path: &Path) -> Result<BotConfig> {
    if !path.exists() {
        info!(file = %path.display(), "No config file; using built-in defaults");
        return Ok(BotConfig::default());
    }
    let yaml = std::fs::read_to_string(path)
        .with_context(|| format!("reading config file at {}", path.display()))?;
    let cfg: BotConfig = serde_yaml::from_str(&yaml).context("parsing YAML config")?;
    Ok(cfg)
}
