use core::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Help-text grouping for interaction commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    General,
    AnimeSfw,
    Nsfw,
}

impl Category {
    /// Order in which categories appear in the help text.
    pub const ALL: [Self; 3] = [Self::General, Self::AnimeSfw, Self::Nsfw];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::General => "general",
            Self::AnimeSfw => "anime_sfw",
            Self::Nsfw => "nsfw",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where an interaction command gets its media from.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PayloadSource {
    /// Pick a random file from a directory on disk.
    Local { directory: PathBuf },
    /// Ask `{provider}{category}` for a media url, then download it.
    Remote { provider: String, category: String },
}

impl PayloadSource {
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Local { .. } => "local",
            Self::Remote { .. } => "remote",
        }
    }
}

/// One interaction command as configured. Names and aliases are stored without
/// the trigger prefix.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CommandDefinition {
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Phrase placed between sender and subject, e.g. "gave a hug to".
    pub action: String,
    pub category: Category,
    pub source: PayloadSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationKind {
    Group,
    Direct,
}

/// Reference to the message the trigger replied to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotedRef {
    pub message_id: String,
}

/// Everything the dispatcher needs to know about one inbound message.
#[derive(Debug, Clone)]
pub struct InteractionContext {
    pub message_id: String,
    pub sender: String,
    pub conversation: String,
    pub kind: ConversationKind,
    pub body: String,
    pub sent_at: OffsetDateTime,
    pub quoted: Option<QuotedRef>,
    /// Explicit mentions in order of appearance. Only meaningful in groups.
    pub mentions: Vec<String>,
}

impl InteractionContext {
    #[must_use]
    pub const fn is_group(&self) -> bool {
        matches!(self.kind, ConversationKind::Group)
    }
}

/// Subject of an interaction plus the identities to notify.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub display_name: String,
    pub notify: Vec<String>,
}
