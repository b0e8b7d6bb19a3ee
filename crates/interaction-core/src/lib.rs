//! Command routing for a chat reaction bot: which messages are commands, who
//! may switch the bot off, who an interaction targets and what gets sent back.

pub mod activation;
pub mod authz;
pub mod catalog;
pub mod dispatch;
pub mod error;
pub mod help;
pub mod media;
pub mod model;
pub mod registry;
pub mod replies;
pub mod target;
pub mod transport;

#[cfg(test)]
mod testing;

pub use activation::{ActivationStore, StateError};
pub use authz::Authorizer;
pub use dispatch::{DispatchSettings, Dispatcher, Outcome};
pub use error::{ConfigError, RegistryError};
pub use media::{MediaError, MediaPayload, MediaSource};
pub use model::{
    Category, CommandDefinition, ConversationKind, InteractionContext, PayloadSource, QuotedRef,
    ResolvedTarget,
};
pub use registry::CommandRegistry;
pub use transport::{
    ChatTransport, ContactProfile, OutboundMessage, ParticipantRank, QuotedMessage,
};
