use std::borrow::ToOwned;

use anyhow::Result;
use async_trait::async_trait;

use crate::media::MediaPayload;

/// Names a contact has published about themselves.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactProfile {
    /// Self-chosen display name.
    pub display_name: Option<String>,
    /// Verified, business or otherwise secondary name.
    pub verified_name: Option<String>,
}

impl ContactProfile {
    /// Display name, then verified name, then `fallback`.
    #[must_use]
    pub fn name_or(&self, fallback: &str) -> String {
        let usable = |name: &Option<String>| {
            name.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(ToOwned::to_owned)
        };
        usable(&self.display_name)
            .or_else(|| usable(&self.verified_name))
            .unwrap_or_else(|| fallback.to_owned())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticipantRank {
    Member,
    Admin,
    SuperAdmin,
}

impl ParticipantRank {
    #[must_use]
    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Admin | Self::SuperAdmin)
    }
}

/// The message a trigger replied to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotedMessage {
    pub author: String,
    pub from_self: bool,
}

/// A reply ready to hand to the transport.
#[derive(Debug, Clone, Default)]
pub struct OutboundMessage {
    /// Plain text, or the caption when `media` is set.
    pub text: String,
    pub media: Option<MediaPayload>,
    /// Identities to notify.
    pub mentions: Vec<String>,
    /// Message to cite, when the transport supports replies.
    pub reply_to: Option<String>,
}

impl OutboundMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn replying_to(mut self, message_id: impl Into<String>) -> Self {
        self.reply_to = Some(message_id.into());
        self
    }

    #[must_use]
    pub fn with_mentions(mut self, mentions: Vec<String>) -> Self {
        self.mentions = mentions;
        self
    }

    #[must_use]
    pub fn with_media(mut self, media: MediaPayload) -> Self {
        self.media = Some(media);
        self
    }
}

/// The messaging network as seen by the dispatcher.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send(&self, conversation: &str, message: OutboundMessage) -> Result<()>;

    async fn profile(&self, conversation: &str, identity: &str) -> Result<ContactProfile>;

    /// Rank of `identity` in a group conversation, `None` if not a participant.
    async fn participant_rank(
        &self,
        conversation: &str,
        identity: &str,
    ) -> Result<Option<ParticipantRank>>;

    async fn quoted_message(&self, conversation: &str, message_id: &str) -> Result<QuotedMessage>;

    /// The human on the other side of a direct conversation.
    async fn counterpart(&self, conversation: &str) -> Result<String>;
}
