use core::fmt;
use std::sync::Arc;

use anyhow::Result;
use time::{Duration, OffsetDateTime};
use tracing::{debug, info, warn};

use crate::{
    activation::ActivationStore,
    authz::Authorizer,
    help::render_help,
    media::{MediaError, MediaSource},
    model::InteractionContext,
    registry::{CommandRegistry, DISABLE_COMMAND, ENABLE_COMMAND, HELP_COMMAND},
    replies,
    target::{TargetResolution, display_name, resolve_target},
    transport::{ChatTransport, OutboundMessage},
};

pub const SENDER_FALLBACK: &str = "An Anonymous User";

/// What happened to one inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Stale,
    NotCommand,
    UnknownCommand,
    /// Command ignored because the conversation is switched off.
    Inactive,
    Toggled { active: bool },
    AlreadyInState { active: bool },
    Rejected,
    Help,
    MissingMention,
    NoImages,
    Interaction { with_media: bool },
}

#[derive(Debug, Clone)]
pub struct DispatchSettings {
    pub bot_name: String,
    /// Messages older than this are dropped (replays after reconnect).
    pub stale_after: Duration,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            bot_name: "Minato".to_owned(),
            stale_after: Duration::seconds(10),
        }
    }
}

/// Routes inbound messages to the toggle, help and interaction handlers.
pub struct Dispatcher {
    registry: Arc<CommandRegistry>,
    activation: Arc<ActivationStore>,
    authorizer: Authorizer,
    media: Arc<dyn MediaSource>,
    transport: Arc<dyn ChatTransport>,
    settings: DispatchSettings,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("commands", &self.registry.len())
            .field("state_file", &self.activation.path())
            .field("authorizer", &self.authorizer)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    #[must_use]
    pub fn new(
        registry: Arc<CommandRegistry>,
        activation: Arc<ActivationStore>,
        authorizer: Authorizer,
        media: Arc<dyn MediaSource>,
        transport: Arc<dyn ChatTransport>,
        settings: DispatchSettings,
    ) -> Self {
        Self {
            registry,
            activation,
            authorizer,
            media,
            transport,
            settings,
        }
    }

    /// Handle one message. Errors only come from sending the reply; the caller
    /// logs them and moves on to the next message.
    pub async fn handle(&self, ctx: &InteractionContext) -> Result<Outcome> {
        let age = OffsetDateTime::now_utc() - ctx.sent_at;
        if age > self.settings.stale_after {
            debug!(conversation = %ctx.conversation, age_secs = age.whole_seconds(), "Dropping stale message");
            return Ok(Outcome::Stale);
        }

        let prefix = self.registry.prefix();
        let body = ctx.body.trim();
        if !body.starts_with(prefix) {
            return Ok(Outcome::NotCommand);
        }
        let token = body
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_lowercase();

        if token == self.registry.normalize(ENABLE_COMMAND) {
            return self.toggle(ctx, true).await;
        }
        if token == self.registry.normalize(DISABLE_COMMAND) {
            return self.toggle(ctx, false).await;
        }
        if token == self.registry.normalize(HELP_COMMAND) {
            let help = render_help(&self.registry, &self.settings.bot_name);
            self.reply(ctx, OutboundMessage::text(help)).await?;
            info!(conversation = %ctx.conversation, sender = %ctx.sender, "Sent help");
            return Ok(Outcome::Help);
        }

        if !self.activation.is_active(&ctx.conversation).await {
            debug!(conversation = %ctx.conversation, command = %token, "Conversation inactive; ignoring command");
            return Ok(Outcome::Inactive);
        }

        self.interact(ctx, &token).await
    }

    async fn toggle(&self, ctx: &InteractionContext, desired: bool) -> Result<Outcome> {
        if !self
            .authorizer
            .can_toggle(ctx, self.transport.as_ref())
            .await
        {
            info!(conversation = %ctx.conversation, sender = %ctx.sender, "Rejected toggle from unauthorized sender");
            self.reply(ctx, OutboundMessage::text(replies::RESTRICTED))
                .await?;
            return Ok(Outcome::Rejected);
        }

        let current = self.activation.is_active(&ctx.conversation).await;
        if current == desired {
            self.reply(ctx, OutboundMessage::text(replies::already(current)))
                .await?;
            return Ok(Outcome::AlreadyInState { active: current });
        }

        // Memory already holds the change; the next toggle retries the flush.
        if let Err(e) = self.activation.set_active(&ctx.conversation, desired).await {
            debug!(conversation = %ctx.conversation, error = %e, "Toggle kept in memory only");
        }
        info!(conversation = %ctx.conversation, sender = %ctx.sender, active = desired, "Toggled conversation");
        self.reply(ctx, OutboundMessage::text(replies::toggled(desired)))
            .await?;
        Ok(Outcome::Toggled { active: desired })
    }

    async fn interact(&self, ctx: &InteractionContext, token: &str) -> Result<Outcome> {
        let Some(definition) = self.registry.lookup(token) else {
            debug!(command = %token, "Unknown command");
            return Ok(Outcome::UnknownCommand);
        };
        info!(conversation = %ctx.conversation, sender = %ctx.sender, command = %definition.name, source = definition.source.kind(), "Command detected");

        let transport = self.transport.as_ref();
        let target = match resolve_target(ctx, transport).await {
            TargetResolution::Resolved(target) => target,
            TargetResolution::MissingMention => {
                self.reply(ctx, OutboundMessage::text(replies::missing_mention(token)))
                    .await?;
                return Ok(Outcome::MissingMention);
            }
        };
        let sender_name =
            display_name(transport, &ctx.conversation, &ctx.sender, SENDER_FALLBACK).await;
        let line = replies::interaction_line(&sender_name, &definition.action, &target.display_name);

        let message = match self.media.acquire(&definition.source).await {
            Ok(media) => {
                debug!(command = %definition.name, mime = %media.mime, animated = media.animated, bytes = media.data.len(), "Media acquired");
                OutboundMessage::text(line).with_media(media)
            }
            Err(MediaError::EmptyDirectory { directory }) => {
                warn!(command = %definition.name, directory = %directory.display(), "No local media available");
                self.reply(ctx, OutboundMessage::text(replies::no_images(&directory)))
                    .await?;
                return Ok(Outcome::NoImages);
            }
            Err(e) => {
                warn!(command = %definition.name, error = %e, "Media acquisition failed; sending text only");
                OutboundMessage::text(replies::with_media_failure(&line))
            }
        };

        let with_media = message.media.is_some();
        self.reply(ctx, message.with_mentions(target.notify)).await?;
        info!(conversation = %ctx.conversation, command = %definition.name, subject = %target.display_name, with_media, "Interaction sent");
        Ok(Outcome::Interaction { with_media })
    }

    async fn reply(&self, ctx: &InteractionContext, message: OutboundMessage) -> Result<()> {
        self.transport
            .send(&ctx.conversation, message.replying_to(ctx.message_id.as_str()))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        model::{Category, ConversationKind},
        testing::{FakeMedia, FakeTransport, ROOM, context, local_def, remote_def},
        transport::ParticipantRank,
    };
    use tempfile::TempDir;

    struct Harness {
        dispatcher: Dispatcher,
        transport: Arc<FakeTransport>,
        media: Arc<FakeMedia>,
        activation: Arc<ActivationStore>,
        _tmp: TempDir,
    }

    async fn harness(transport: FakeTransport, media: FakeMedia) -> Harness {
        let tmp = TempDir::new().unwrap();
        let registry = CommandRegistry::from_definitions(
            '!',
            [
                remote_def("hug", &["abrazo"], Category::AnimeSfw),
                local_def("memes", tmp.path()),
            ],
        )
        .unwrap();
        let activation = Arc::new(ActivationStore::load(tmp.path().join("states.json")).await);
        let transport = Arc::new(transport.with_name("@ana:x", "Ana"));
        let media = Arc::new(media);
        let dispatcher = Dispatcher::new(
            Arc::new(registry),
            Arc::clone(&activation),
            Authorizer::new(Some("@owner:x".to_owned())),
            Arc::clone(&media) as Arc<dyn MediaSource>,
            Arc::clone(&transport) as Arc<dyn ChatTransport>,
            DispatchSettings::default(),
        );
        Harness {
            dispatcher,
            transport,
            media,
            activation,
            _tmp: tmp,
        }
    }

    fn group_hug(mentions: &[&str]) -> InteractionContext {
        let mut ctx = context("@ana:x", ConversationKind::Group, "!hug @bea");
        ctx.mentions = mentions.iter().map(|m| (*m).to_owned()).collect();
        ctx
    }

    #[tokio::test]
    async fn stale_messages_are_dropped() {
        let h = harness(FakeTransport::default(), FakeMedia::ok()).await;
        let mut ctx = context("@owner:x", ConversationKind::Group, "!off");
        ctx.sent_at = OffsetDateTime::now_utc() - Duration::seconds(11);
        assert_eq!(h.dispatcher.handle(&ctx).await.unwrap(), Outcome::Stale);
        assert!(h.transport.sent().is_empty());
        assert!(h.activation.is_active(ROOM).await);
    }

    #[tokio::test]
    async fn plain_text_and_unknown_commands_are_ignored() {
        let h = harness(FakeTransport::default(), FakeMedia::ok()).await;
        let ctx = context("@ana:x", ConversationKind::Direct, "hello there");
        assert_eq!(h.dispatcher.handle(&ctx).await.unwrap(), Outcome::NotCommand);
        let ctx = context("@ana:x", ConversationKind::Direct, "!nope");
        assert_eq!(
            h.dispatcher.handle(&ctx).await.unwrap(),
            Outcome::UnknownCommand
        );
        assert!(h.transport.sent().is_empty());
        assert_eq!(h.media.calls(), 0);
    }

    #[tokio::test]
    async fn group_hug_with_mention_sends_media() {
        let transport = FakeTransport::default().with_name("@bea:x", "Bea");
        let h = harness(transport, FakeMedia::ok()).await;
        let outcome = h.dispatcher.handle(&group_hug(&["@bea:x"])).await.unwrap();
        assert_eq!(outcome, Outcome::Interaction { with_media: true });

        let reply = h.transport.only_sent();
        assert_eq!(reply.text, "*Ana* did hug to *Bea*");
        assert_eq!(reply.mentions, ["@bea:x"]);
        assert_eq!(reply.reply_to.as_deref(), Some("$trigger"));
        assert!(reply.media.unwrap().animated);
    }

    #[tokio::test]
    async fn alias_dispatches_like_canonical_name() {
        let transport = FakeTransport::default().with_name("@bea:x", "Bea");
        let h = harness(transport, FakeMedia::ok()).await;
        let mut ctx = group_hug(&["@bea:x"]);
        ctx.body = "!ABRAZO @bea".to_owned();
        let outcome = h.dispatcher.handle(&ctx).await.unwrap();
        assert_eq!(outcome, Outcome::Interaction { with_media: true });
        assert_eq!(h.transport.only_sent().text, "*Ana* did hug to *Bea*");
    }

    #[tokio::test]
    async fn group_without_mention_never_fetches_media() {
        let h = harness(FakeTransport::default(), FakeMedia::ok()).await;
        let outcome = h.dispatcher.handle(&group_hug(&[])).await.unwrap();
        assert_eq!(outcome, Outcome::MissingMention);
        assert_eq!(h.media.calls(), 0);
        let reply = h.transport.only_sent();
        assert_eq!(reply.text, replies::missing_mention("!hug"));
        assert!(reply.media.is_none());
    }

    #[tokio::test]
    async fn direct_chat_targets_counterpart() {
        let transport = FakeTransport::default()
            .with_counterpart("@pal:x")
            .with_name("@pal:x", "Pal");
        let h = harness(transport, FakeMedia::ok()).await;
        let ctx = context("@ana:x", ConversationKind::Direct, "!hug");
        h.dispatcher.handle(&ctx).await.unwrap();
        let reply = h.transport.only_sent();
        assert_eq!(reply.text, "*Ana* did hug to *Pal*");
        assert!(reply.mentions.is_empty());
    }

    #[tokio::test]
    async fn failed_fetch_falls_back_to_text() {
        let transport = FakeTransport::default().with_name("@bea:x", "Bea");
        let h = harness(transport, FakeMedia::failing()).await;
        let outcome = h.dispatcher.handle(&group_hug(&["@bea:x"])).await.unwrap();
        assert_eq!(outcome, Outcome::Interaction { with_media: false });

        let reply = h.transport.only_sent();
        assert!(reply.media.is_none());
        assert_eq!(
            reply.text,
            format!("*Ana* did hug to *Bea*\n\n{}", replies::MEDIA_FAILED_NOTICE)
        );
        assert_eq!(reply.mentions, ["@bea:x"]);
    }

    #[tokio::test]
    async fn empty_local_directory_reports_no_images() {
        let transport = FakeTransport::default()
            .with_counterpart("@pal:x")
            .with_name("@pal:x", "Pal");
        let h = harness(transport, FakeMedia::empty_directory()).await;
        let ctx = context("@ana:x", ConversationKind::Direct, "!memes");
        assert_eq!(h.dispatcher.handle(&ctx).await.unwrap(), Outcome::NoImages);
        let reply = h.transport.only_sent();
        assert!(reply.text.starts_with("❌ No images available in ./assets/memes"));
        assert!(reply.media.is_none());
    }

    #[tokio::test]
    async fn unauthorized_toggle_is_rejected() {
        let transport = FakeTransport::default().with_rank("@ana:x", ParticipantRank::Member);
        let h = harness(transport, FakeMedia::ok()).await;
        let ctx = context("@ana:x", ConversationKind::Group, "!off");
        assert_eq!(h.dispatcher.handle(&ctx).await.unwrap(), Outcome::Rejected);
        assert_eq!(h.transport.only_sent().text, replies::RESTRICTED);
        assert!(h.activation.is_active(ROOM).await);
    }

    #[tokio::test]
    async fn admin_toggles_and_commands_are_gated() {
        let transport = FakeTransport::default()
            .with_rank("@ana:x", ParticipantRank::Admin)
            .with_name("@bea:x", "Bea");
        let h = harness(transport, FakeMedia::ok()).await;

        let off = context("@ana:x", ConversationKind::Group, "!OFF");
        assert_eq!(
            h.dispatcher.handle(&off).await.unwrap(),
            Outcome::Toggled { active: false }
        );
        assert!(!h.activation.is_active(ROOM).await);
        assert_eq!(
            h.dispatcher.handle(&off).await.unwrap(),
            Outcome::AlreadyInState { active: false }
        );

        assert_eq!(
            h.dispatcher.handle(&group_hug(&["@bea:x"])).await.unwrap(),
            Outcome::Inactive
        );
        assert_eq!(h.media.calls(), 0);

        let on = context("@ana:x", ConversationKind::Group, "!on");
        assert_eq!(
            h.dispatcher.handle(&on).await.unwrap(),
            Outcome::Toggled { active: true }
        );
        let texts: Vec<_> = h.transport.sent().into_iter().map(|m| m.text).collect();
        assert_eq!(
            texts,
            [
                replies::toggled(false),
                replies::already(false),
                replies::toggled(true)
            ]
        );
    }

    #[tokio::test]
    async fn help_ignores_activation_state() {
        let h = harness(FakeTransport::default(), FakeMedia::ok()).await;
        let help = context("@ana:x", ConversationKind::Group, "!help");

        assert_eq!(h.dispatcher.handle(&help).await.unwrap(), Outcome::Help);
        h.activation.set_active(ROOM, false).await.unwrap();
        assert_eq!(h.dispatcher.handle(&help).await.unwrap(), Outcome::Help);

        let sent = h.transport.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].text, sent[1].text);
        assert!(sent[0].text.contains("*!hug* [!abrazo]"));
    }

    #[tokio::test]
    async fn toggle_survives_unwritable_state_file() {
        let tmp = TempDir::new().unwrap();
        let blocker = tmp.path().join("blocker");
        std::fs::write(&blocker, "not a directory").unwrap();
        let activation = Arc::new(ActivationStore::load(blocker.join("states.json")).await);
        let transport = Arc::new(FakeTransport::default());
        let dispatcher = Dispatcher::new(
            Arc::new(CommandRegistry::new('!')),
            Arc::clone(&activation),
            Authorizer::new(Some("@owner:x".to_owned())),
            Arc::new(FakeMedia::ok()) as Arc<dyn MediaSource>,
            Arc::clone(&transport) as Arc<dyn ChatTransport>,
            DispatchSettings::default(),
        );

        let off = context("@owner:x", ConversationKind::Direct, "!off");
        assert_eq!(
            dispatcher.handle(&off).await.unwrap(),
            Outcome::Toggled { active: false }
        );
        assert!(!activation.is_active(ROOM).await);
        assert_eq!(transport.only_sent().text, replies::toggled(false));
    }
}
