use tracing::{debug, warn};

use crate::{model::InteractionContext, transport::ChatTransport};

/// Decides who may switch the bot on or off in a conversation.
#[derive(Debug, Clone)]
pub struct Authorizer {
    owner: Option<String>,
}

impl Authorizer {
    #[must_use]
    pub const fn new(owner: Option<String>) -> Self {
        Self { owner }
    }

    /// Owner anywhere, or a group admin in their group. Asked fresh every time
    /// since ranks change.
    pub async fn can_toggle(&self, ctx: &InteractionContext, transport: &dyn ChatTransport) -> bool {
        if self.owner.as_deref() == Some(ctx.sender.as_str()) {
            return true;
        }
        if !ctx.is_group() {
            return false;
        }
        match transport
            .participant_rank(&ctx.conversation, &ctx.sender)
            .await
        {
            Ok(rank) => {
                debug!(conversation = %ctx.conversation, sender = %ctx.sender, rank = ?rank, "Checked participant rank");
                rank.is_some_and(|r| r.is_admin())
            }
            Err(e) => {
                warn!(conversation = %ctx.conversation, sender = %ctx.sender, error = %e, "Rank lookup failed");
                false
            }
        }
    }
}
