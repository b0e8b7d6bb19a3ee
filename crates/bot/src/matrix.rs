//! Matrix side of the bot: turns room events into [`InteractionContext`]s and
//! implements [`ChatTransport`] on top of a logged-in client.

use std::borrow::ToOwned;

use anyhow::{Context as _, Result, anyhow};
use async_trait::async_trait;
use interaction_core::{
    ChatTransport, ContactProfile, ConversationKind, InteractionContext, MediaPayload,
    OutboundMessage, ParticipantRank, QuotedMessage, QuotedRef,
};
use matrix_sdk::{
    Client, RoomMemberships,
    attachment::AttachmentConfig,
    room::{Room, RoomMemberRole},
    ruma::{
        EventId, OwnedUserId, RoomId, UserId,
        events::{
            Mentions,
            relation::InReplyTo,
            room::message::{
                MessageType, OriginalSyncRoomMessageEvent, Relation, RoomMessageEventContent,
            },
        },
    },
};
use time::OffsetDateTime;
use tracing::debug;

/// Build the dispatcher's view of a text message. Non-text messages yield
/// `None`.
pub(crate) async fn interaction_context(
    ev: &OriginalSyncRoomMessageEvent,
    room: &Room,
) -> Option<InteractionContext> {
    let (raw_body, formatted) = match &ev.content.msgtype {
        MessageType::Text(t) => (t.body.as_str(), t.formatted.as_ref()),
        MessageType::Notice(n) => (n.body.as_str(), n.formatted.as_ref()),
        MessageType::Audio(_)
        | MessageType::Emote(_)
        | MessageType::File(_)
        | MessageType::Image(_)
        | MessageType::Location(_)
        | MessageType::ServerNotice(_)
        | MessageType::Video(_)
        | MessageType::VerificationRequest(_)
        | _ => return None,
    };

    let quoted = match &ev.content.relates_to {
        Some(Relation::Reply { in_reply_to }) => Some(QuotedRef {
            message_id: in_reply_to.event_id.to_string(),
        }),
        _ => None,
    };
    let body = if quoted.is_some() {
        strip_reply_fallback(raw_body)
    } else {
        raw_body
    };

    let kind = match room.is_direct().await {
        Ok(true) => ConversationKind::Direct,
        Ok(false) => ConversationKind::Group,
        Err(e) => {
            debug!(room_id = %room.room_id(), error = %e, "Direct flag unavailable; using member count");
            if room.joined_members_count() <= 2 {
                ConversationKind::Direct
            } else {
                ConversationKind::Group
            }
        }
    };

    let mentioned: Vec<String> = ev
        .content
        .mentions
        .as_ref()
        .map(|m| m.user_ids.iter().map(ToString::to_string).collect())
        .unwrap_or_default();
    let mentions = in_typed_order(mentioned, formatted.map(|f| f.body.as_str()), raw_body);

    Some(InteractionContext {
        message_id: ev.event_id.to_string(),
        sender: ev.sender.to_string(),
        conversation: room.room_id().to_string(),
        kind,
        body: body.trim().to_owned(),
        sent_at: sent_at(u64::from(ev.origin_server_ts.0)),
        quoted,
        mentions,
    })
}

fn sent_at(millis: u64) -> OffsetDateTime {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000)
        .unwrap_or_else(|_| OffsetDateTime::now_utc())
}

/// Drop the `> quoted` block that clients prepend to replies.
fn strip_reply_fallback(body: &str) -> &str {
    if !body.starts_with('>') {
        return body;
    }
    body.find("\n\n").map_or(body, |idx| body[idx..].trim_start_matches('\n'))
}

/// `m.mentions` is an unordered set. Recover the order the user typed by the
/// position of each pill in the HTML body, then of the raw id in the plain
/// body. Ids found in neither keep their set order at the end.
fn in_typed_order(ids: Vec<String>, formatted: Option<&str>, body: &str) -> Vec<String> {
    let mut keyed: Vec<_> = ids
        .into_iter()
        .map(|id| (mention_position(&id, formatted, body), id))
        .collect();
    keyed.sort_by_key(|(pos, _)| *pos);
    keyed.into_iter().map(|(_, id)| id).collect()
}

fn mention_position(id: &str, formatted: Option<&str>, body: &str) -> (u8, usize) {
    let encoded = id.replace('@', "%40").replace(':', "%3A");
    let pill = formatted.and_then(|html| {
        [id, encoded.as_str()]
            .iter()
            .filter_map(|needle| html.find(&format!("matrix.to/#/{needle}")))
            .min()
    });
    match (pill, body.find(id)) {
        (Some(pos), _) => (0, pos),
        (None, Some(pos)) => (1, pos),
        (None, None) => (2, 0),
    }
}

/// File name for an upload. Matrix has no looping flag, so animated media is
/// always named after its real container (`.gif`, `.mp4`, `.webm`) and
/// clients pick their clip player from that.
fn attachment_name(media: &MediaPayload) -> String {
    let ext = media.mime.subtype().as_str();
    if media.animated {
        let stem = media
            .file_name
            .rsplit_once('.')
            .map_or(media.file_name.as_str(), |(stem, _)| stem);
        return format!("{stem}.{ext}");
    }
    if media.file_name.contains('.') {
        return media.file_name.clone();
    }
    format!("{}.{ext}", media.file_name)
}

fn rank_for_role(role: RoomMemberRole) -> ParticipantRank {
    match role {
        RoomMemberRole::Creator | RoomMemberRole::Administrator => ParticipantRank::SuperAdmin,
        RoomMemberRole::Moderator => ParticipantRank::Admin,
        RoomMemberRole::User => ParticipantRank::Member,
    }
}

#[derive(Debug, Clone)]
pub(crate) struct MatrixTransport {
    client: Client,
}

impl MatrixTransport {
    pub(crate) const fn new(client: Client) -> Self {
        Self { client }
    }

    fn room(&self, conversation: &str) -> Result<Room> {
        let room_id = RoomId::parse(conversation)?;
        self.client
            .get_room(&room_id)
            .ok_or_else(|| anyhow!("unknown room {conversation}"))
    }

    fn own_user(&self) -> Result<OwnedUserId> {
        self.client
            .user_id()
            .map(ToOwned::to_owned)
            .ok_or_else(|| anyhow!("client is not logged in"))
    }
}

#[async_trait]
impl ChatTransport for MatrixTransport {
    async fn send(&self, conversation: &str, message: OutboundMessage) -> Result<()> {
        let room = self.room(conversation)?;

        if let Some(media) = message.media {
            let name = attachment_name(&media);
            debug!(room_id = %room.room_id(), file = %name, mime = %media.mime, animated = media.animated, "Uploading media");
            room.send_attachment(&name, &media.mime, media.data, AttachmentConfig::new())
                .await
                .with_context(|| format!("sending attachment {name}"))?;
        }

        let mut content = RoomMessageEventContent::text_plain(message.text);
        if let Some(reply_to) = message.reply_to.as_deref() {
            content.relates_to = Some(Relation::Reply {
                in_reply_to: InReplyTo::new(EventId::parse(reply_to)?),
            });
        }
        if !message.mentions.is_empty() {
            let user_ids = message
                .mentions
                .iter()
                .map(|id| UserId::parse(id.as_str()))
                .collect::<Result<Vec<_>, _>>()?;
            content = content.add_mentions(Mentions::with_user_ids(user_ids));
        }
        room.send(content).await.context("sending reply")?;
        Ok(())
    }

    async fn profile(&self, conversation: &str, identity: &str) -> Result<ContactProfile> {
        let room = self.room(conversation)?;
        let user_id = UserId::parse(identity)?;
        let member = room.get_member(&user_id).await?;
        Ok(ContactProfile {
            display_name: member
                .as_ref()
                .and_then(|m| m.display_name())
                .map(ToOwned::to_owned),
            verified_name: Some(user_id.localpart().to_owned()),
        })
    }

    async fn participant_rank(
        &self,
        conversation: &str,
        identity: &str,
    ) -> Result<Option<ParticipantRank>> {
        let room = self.room(conversation)?;
        let user_id = UserId::parse(identity)?;
        let Some(member) = room.get_member(&user_id).await? else {
            return Ok(None);
        };
        Ok(Some(rank_for_role(member.suggested_role_for_power_level())))
    }

    async fn quoted_message(&self, conversation: &str, message_id: &str) -> Result<QuotedMessage> {
        let room = self.room(conversation)?;
        let event_id = EventId::parse(message_id)?;
        let event = room
            .event(&event_id, None)
            .await
            .with_context(|| format!("fetching quoted event {message_id}"))?;
        let author: OwnedUserId = event
            .raw()
            .get_field("sender")?
            .ok_or_else(|| anyhow!("quoted event {message_id} has no sender"))?;
        let from_self = author == self.own_user()?;
        Ok(QuotedMessage {
            author: author.to_string(),
            from_self,
        })
    }

    async fn counterpart(&self, conversation: &str) -> Result<String> {
        let room = self.room(conversation)?;
        let own = self.own_user()?;
        room.members(RoomMemberships::JOIN)
            .await?
            .into_iter()
            .map(|m| m.user_id().to_owned())
            .find(|id| *id != own)
            .map(|id| id.to_string())
            .ok_or_else(|| anyhow!("no other member in {conversation}"))
    }
}
