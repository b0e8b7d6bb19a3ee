use std::path::PathBuf;

use async_trait::async_trait;
use mime::Mime;
use thiserror::Error;

use crate::model::PayloadSource;

/// Media attached to an interaction reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaPayload {
    pub data: Vec<u8>,
    pub mime: Mime,
    /// Render as a looping clip instead of a still image.
    pub animated: bool,
    pub file_name: String,
}

impl MediaPayload {
    #[must_use]
    pub fn new(data: Vec<u8>, mime: Mime, file_name: impl Into<String>) -> Self {
        let animated = is_animated(&mime);
        Self {
            data,
            mime,
            animated,
            file_name: file_name.into(),
        }
    }
}

/// GIF, WebM and MP4 play as looping clips.
#[must_use]
pub fn is_animated(mime: &Mime) -> bool {
    let essence = mime.essence_str();
    ["gif", "webm", "mp4"]
        .iter()
        .any(|needle| essence.contains(needle))
}

#[derive(Debug, Error)]
pub enum MediaError {
    /// Local directory holds no usable files. Answered with its own message
    /// instead of the generic fallback.
    #[error("no media files in {}", directory.display())]
    EmptyDirectory { directory: PathBuf },
    #[error("reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("provider request failed: {0}")]
    Http(String),
    #[error("provider answered {status} for {url}")]
    Status { status: u16, url: String },
    #[error("malformed provider response: {0}")]
    Malformed(String),
}

/// Turns a command's payload source into bytes.
#[async_trait]
pub trait MediaSource: Send + Sync {
    async fn acquire(&self, source: &PayloadSource) -> Result<MediaPayload, MediaError>;
}
