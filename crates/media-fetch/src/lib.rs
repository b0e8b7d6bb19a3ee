//! Media acquisition for interaction commands: random files from a local
//! directory, or images from a remote provider.

pub mod local;
pub mod remote;

use async_trait::async_trait;
use interaction_core::{MediaError, MediaPayload, MediaSource, PayloadSource};

pub use remote::RemoteProvider;

#[derive(Debug, Clone)]
pub struct MediaPipeline {
    remote: RemoteProvider,
}

impl MediaPipeline {
    pub fn new() -> Result<Self, MediaError> {
        Ok(Self {
            remote: RemoteProvider::new()?,
        })
    }
}

#[async_trait]
impl MediaSource for MediaPipeline {
    async fn acquire(&self, source: &PayloadSource) -> Result<MediaPayload, MediaError> {
        match source {
            PayloadSource::Local { directory } => local::pick_random(directory).await,
            PayloadSource::Remote { provider, category } => {
                self.remote.fetch(provider, category).await
            }
        }
    }
}
