use std::{
    collections::HashMap,
    path::Path,
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use time::OffsetDateTime;

use crate::{
    media::{MediaError, MediaPayload, MediaSource},
    model::{Category, CommandDefinition, ConversationKind, InteractionContext, PayloadSource},
    transport::{ChatTransport, ContactProfile, OutboundMessage, ParticipantRank, QuotedMessage},
};

pub const ROOM: &str = "!room:x";

pub fn context(sender: &str, kind: ConversationKind, body: &str) -> InteractionContext {
    InteractionContext {
        message_id: "$trigger".to_owned(),
        sender: sender.to_owned(),
        conversation: ROOM.to_owned(),
        kind,
        body: body.to_owned(),
        sent_at: OffsetDateTime::now_utc(),
        quoted: None,
        mentions: Vec::new(),
    }
}

pub fn remote_def(name: &str, aliases: &[&str], category: Category) -> CommandDefinition {
    CommandDefinition {
        name: name.to_owned(),
        aliases: aliases.iter().map(|a| (*a).to_owned()).collect(),
        action: format!("did {name} to"),
        category,
        source: PayloadSource::Remote {
            provider: "http://provider.invalid/sfw/".to_owned(),
            category: name.to_owned(),
        },
    }
}

pub fn local_def(name: &str, directory: &Path) -> CommandDefinition {
    CommandDefinition {
        name: name.to_owned(),
        aliases: Vec::new(),
        action: "found a meme for".to_owned(),
        category: Category::General,
        source: PayloadSource::Local {
            directory: directory.to_path_buf(),
        },
    }
}

#[derive(Debug, Default)]
pub struct FakeTransport {
    names: HashMap<String, String>,
    ranks: HashMap<String, ParticipantRank>,
    quotes: HashMap<String, QuotedMessage>,
    counterpart: Option<String>,
    pub sent: Mutex<Vec<(String, OutboundMessage)>>,
}

impl FakeTransport {
    pub fn with_name(mut self, id: &str, name: &str) -> Self {
        self.names.insert(id.to_owned(), name.to_owned());
        self
    }

    pub fn with_rank(mut self, id: &str, rank: ParticipantRank) -> Self {
        self.ranks.insert(id.to_owned(), rank);
        self
    }

    pub fn with_quote(mut self, message_id: &str, quoted: QuotedMessage) -> Self {
        self.quotes.insert(message_id.to_owned(), quoted);
        self
    }

    pub fn with_counterpart(mut self, id: &str) -> Self {
        self.counterpart = Some(id.to_owned());
        self
    }

    pub fn sent(&self) -> Vec<OutboundMessage> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(_, m)| m.clone())
            .collect()
    }

    pub fn only_sent(&self) -> OutboundMessage {
        let sent = self.sent();
        assert_eq!(sent.len(), 1, "expected exactly one reply, got {sent:?}");
        sent.into_iter().next().unwrap()
    }
}

#[async_trait]
impl ChatTransport for FakeTransport {
    async fn send(&self, conversation: &str, message: OutboundMessage) -> Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((conversation.to_owned(), message));
        Ok(())
    }

    async fn profile(&self, _conversation: &str, identity: &str) -> Result<ContactProfile> {
        self.names
            .get(identity)
            .map(|name| ContactProfile {
                display_name: Some(name.clone()),
                verified_name: None,
            })
            .ok_or_else(|| anyhow!("no profile for {identity}"))
    }

    async fn participant_rank(
        &self,
        _conversation: &str,
        identity: &str,
    ) -> Result<Option<ParticipantRank>> {
        Ok(self.ranks.get(identity).copied())
    }

    async fn quoted_message(&self, _conversation: &str, message_id: &str) -> Result<QuotedMessage> {
        self.quotes
            .get(message_id)
            .cloned()
            .ok_or_else(|| anyhow!("unknown message {message_id}"))
    }

    async fn counterpart(&self, _conversation: &str) -> Result<String> {
        self.counterpart
            .clone()
            .ok_or_else(|| anyhow!("no counterpart"))
    }
}

/// Media source returning a canned result and counting calls.
#[derive(Debug)]
pub struct FakeMedia {
    pub calls: AtomicUsize,
    outcome: fn() -> Result<MediaPayload, MediaError>,
}

impl FakeMedia {
    pub fn ok() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            outcome: || Ok(MediaPayload::new(vec![0x47, 0x49, 0x46], mime::IMAGE_GIF, "hug.gif")),
        }
    }

    pub fn failing() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            outcome: || Err(MediaError::Http("connection refused".to_owned())),
        }
    }

    pub fn empty_directory() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            outcome: || {
                Err(MediaError::EmptyDirectory {
                    directory: "./assets/memes".into(),
                })
            },
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaSource for FakeMedia {
    async fn acquire(&self, _source: &PayloadSource) -> Result<MediaPayload, MediaError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.outcome)()
    }
}
