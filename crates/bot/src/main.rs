mod config;
mod logging;
mod matrix;
mod session;

use core::time::Duration;
use std::{path::PathBuf, sync::Arc};

use anyhow::{Context as _, Result, anyhow};
use clap::Parser;
use interaction_core::{
    ActivationStore, Authorizer, ChatTransport, CommandRegistry, Dispatcher, MediaSource,
};
use matrix_sdk::{
    Client,
    config::SyncSettings,
    room::Room,
    ruma::events::room::{
        member::{MembershipState, StrippedRoomMemberEvent},
        message::OriginalSyncRoomMessageEvent,
    },
};
use media_fetch::MediaPipeline;
use tracing::{debug, info, warn};

use crate::{
    config::load_config,
    logging::init_tracing,
    matrix::{MatrixTransport, interaction_context},
    session::{Credentials, connect},
};

#[derive(Parser, Debug)]
#[command(
    name = "matrix-reaction-bot",
    version,
    about = "Matrix bot answering reaction commands with images"
)]
struct Args {
    /// Homeserver base URL, e.g. `https://matrix-client.matrix.org`.
    #[arg(long, env = "MATRIX_HOMESERVER")]
    homeserver: String,

    /// Username (localpart or full user ID)
    #[arg(long, env = "MATRIX_USERNAME")]
    username: String,

    /// Password (if omitted, will prompt if needed)
    #[arg(long, env = "MATRIX_PASSWORD")]
    password: Option<String>,

    /// Directory for persistent state (encryption keys, sync cache)
    #[arg(long, env = "MATRIX_STORE", default_value = "./bot-store")]
    store: PathBuf,

    /// JSON session file for access token/device info
    #[arg(long, env = "MATRIX_SESSION_FILE", default_value = "./session.json")]
    session_file: PathBuf,

    /// Device display name
    #[arg(long, env = "MATRIX_DEVICE_NAME", default_value = "matrix-reaction-bot")]
    device_name: String,

    /// YAML config with owner, prefix and the command list
    #[arg(long, env = "MATRIX_CONFIG", default_value = "./config.yaml")]
    config: PathBuf,

    /// Disable auto-joining rooms when invited
    #[arg(long)]
    no_autojoin: bool,

    /// Sync timeout in milliseconds
    #[arg(long, env = "MATRIX_SYNC_TIMEOUT_MS", default_value_t = 30000)]
    sync_timeout_ms: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    // Load .env if present so clap can pick up env vars.
    let _ = dotenvy::dotenv();
    let args = Args::parse();

    let config = load_config(&args.config)?;
    let registry = CommandRegistry::from_definitions(config.prefix, config.commands())
        .context("building command table")?;
    registry
        .verify_assets()
        .context("checking command asset directories")?;
    let commands: Vec<String> = registry
        .definitions()
        .map(|d| registry.normalize(&d.name))
        .collect();
    info!(prefix = %config.prefix, commands = ?commands, "Registered interaction commands");

    let activation = Arc::new(ActivationStore::load(&config.state_file).await);
    let media = MediaPipeline::new().map_err(|e| anyhow!("building media client: {e}"))?;

    let client = connect(&Credentials {
        homeserver: &args.homeserver,
        username: &args.username,
        password: args.password.as_deref(),
        device_name: &args.device_name,
        store: &args.store,
        session_file: &args.session_file,
    })
    .await?;

    // The bot's own messages are never dispatched, so its account cannot
    // stand in for a missing owner.
    let owner = config.owner();
    match &owner {
        Some(owner) => info!(%owner, "Toggle owner"),
        None => warn!("No owner configured; only group admins can run !on / !off"),
    }

    let dispatcher = Arc::new(Dispatcher::new(
        Arc::new(registry),
        activation,
        Authorizer::new(owner),
        Arc::new(media) as Arc<dyn MediaSource>,
        Arc::new(MatrixTransport::new(client.clone())) as Arc<dyn ChatTransport>,
        config.dispatch_settings(),
    ));

    if !args.no_autojoin {
        client.add_event_handler(
            async move |ev: StrippedRoomMemberEvent, room: Room, client: Client| {
                if ev.content.membership != MembershipState::Invite {
                    return;
                }
                let Some(own_id) = client.user_id() else {
                    return;
                };
                if ev.state_key != own_id.as_str() {
                    return;
                }
                info!(room_id = %room.room_id(), "Auto-joining invited room");
                if let Err(e) = room.join().await {
                    warn!(error = %e, "Failed to accept invite");
                }
            },
        );
    }

    client.add_event_handler(
        async move |ev: OriginalSyncRoomMessageEvent, room: Room, client: Client| {
            let Some(own_id) = client.user_id() else {
                return;
            };
            // Our own replies start with the prefix too; never route them back in.
            if ev.sender == own_id {
                return;
            }
            let Some(ctx) = interaction_context(&ev, &room).await else {
                return;
            };
            match dispatcher.handle(&ctx).await {
                Ok(outcome) => {
                    debug!(room_id = %ctx.conversation, sender = %ctx.sender, outcome = ?outcome, "Dispatched message");
                }
                Err(e) => {
                    warn!(room_id = %ctx.conversation, sender = %ctx.sender, error = %e, "Failed to answer message");
                }
            }
        },
    );

    info!(
        timeout_ms = args.sync_timeout_ms,
        "Starting sync… Press Ctrl+C to stop."
    );
    let settings = SyncSettings::new().timeout(Duration::from_millis(args.sync_timeout_ms));
    client
        .sync(settings)
        .await
        .map_err(|e| anyhow!("sync terminated: {e}"))
}
