//! Works out who an interaction command is aimed at.
//!
//! Groups need an explicit mention. Direct chats use the author of a quoted
//! message when there is one (and it isn't the bot's own), otherwise the person
//! on the other side of the chat.

use tracing::{debug, warn};

use crate::{
    model::{InteractionContext, ResolvedTarget},
    transport::ChatTransport,
};

pub const MENTIONED_FALLBACK: &str = "Unknown User";
pub const QUOTED_FALLBACK: &str = "Your Friend";
pub const COUNTERPART_FALLBACK: &str = "The Bot";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetResolution {
    Resolved(ResolvedTarget),
    /// Group message without a mention; nothing to aim at.
    MissingMention,
}

pub async fn resolve_target(
    ctx: &InteractionContext,
    transport: &dyn ChatTransport,
) -> TargetResolution {
    if ctx.is_group() {
        return resolve_mentioned(ctx, transport).await;
    }
    if let Some(target) = resolve_quoted(ctx, transport).await {
        return TargetResolution::Resolved(target);
    }
    TargetResolution::Resolved(resolve_counterpart(ctx, transport).await)
}

async fn resolve_mentioned(
    ctx: &InteractionContext,
    transport: &dyn ChatTransport,
) -> TargetResolution {
    let mut notify: Vec<String> = Vec::with_capacity(ctx.mentions.len());
    for id in &ctx.mentions {
        if !notify.contains(id) {
            notify.push(id.clone());
        }
    }
    let Some(first) = notify.first() else {
        return TargetResolution::MissingMention;
    };
    let display_name = display_name(transport, &ctx.conversation, first, MENTIONED_FALLBACK).await;
    TargetResolution::Resolved(ResolvedTarget {
        display_name,
        notify,
    })
}

async fn resolve_quoted(
    ctx: &InteractionContext,
    transport: &dyn ChatTransport,
) -> Option<ResolvedTarget> {
    let quoted_ref = ctx.quoted.as_ref()?;
    let quoted = match transport
        .quoted_message(&ctx.conversation, &quoted_ref.message_id)
        .await
    {
        Ok(q) => q,
        Err(e) => {
            warn!(conversation = %ctx.conversation, quoted = %quoted_ref.message_id, error = %e, "Quoted message lookup failed");
            return None;
        }
    };
    if quoted.from_self {
        debug!(conversation = %ctx.conversation, "Ignoring quote of the bot's own message");
        return None;
    }
    let display_name =
        display_name(transport, &ctx.conversation, &quoted.author, QUOTED_FALLBACK).await;
    Some(ResolvedTarget {
        display_name,
        notify: Vec::new(),
    })
}

async fn resolve_counterpart(
    ctx: &InteractionContext,
    transport: &dyn ChatTransport,
) -> ResolvedTarget {
    let display_name = match transport.counterpart(&ctx.conversation).await {
        Ok(id) => display_name(transport, &ctx.conversation, &id, COUNTERPART_FALLBACK).await,
        Err(e) => {
            warn!(conversation = %ctx.conversation, error = %e, "Counterpart lookup failed");
            COUNTERPART_FALLBACK.to_owned()
        }
    };
    ResolvedTarget {
        display_name,
        notify: Vec::new(),
    }
}

/// Display name of `identity`, or `fallback` when lookup fails or yields
/// nothing usable.
pub async fn display_name(
    transport: &dyn ChatTransport,
    conversation: &str,
    identity: &str,
    fallback: &str,
) -> String {
    match transport.profile(conversation, identity).await {
        Ok(profile) => profile.name_or(fallback),
        Err(e) => {
            debug!(conversation, identity, error = %e, "Profile lookup failed");
            fallback.to_owned()
        }
    }
}
