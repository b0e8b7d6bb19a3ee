use core::time::Duration;

use interaction_core::{MediaError, MediaPayload};
use mime::{APPLICATION_OCTET_STREAM, Mime};
use reqwest::{Client, Response, header::CONTENT_TYPE, redirect::Policy};
use serde::Deserialize;
use tracing::debug;

pub const RESOLVE_TIMEOUT: Duration = Duration::from_secs(10);
pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(5);
pub const MAX_REDIRECTS: usize = 5;

/// `{"url": "..."}` as returned by waifu.pics and nekos.life.
#[derive(Debug, Deserialize)]
struct ProviderResponse {
    #[serde(default)]
    url: Option<String>,
}

/// Client for "category → media url → bytes" image providers.
#[derive(Debug, Clone)]
pub struct RemoteProvider {
    client: Client,
}

impl RemoteProvider {
    pub fn new() -> Result<Self, MediaError> {
        let client = Client::builder()
            .redirect(Policy::limited(MAX_REDIRECTS))
            .build()
            .map_err(http_error)?;
        Ok(Self { client })
    }

    /// Resolve a url, then download it. The first failing step ends the
    /// attempt.
    pub async fn fetch(&self, provider: &str, category: &str) -> Result<MediaPayload, MediaError> {
        let url = self.resolve_url(provider, category).await?;
        self.download(&url).await
    }

    pub async fn resolve_url(&self, provider: &str, category: &str) -> Result<String, MediaError> {
        let endpoint = format!("{provider}{category}");
        let response = self
            .client
            .get(&endpoint)
            .timeout(RESOLVE_TIMEOUT)
            .send()
            .await
            .map_err(http_error)?;
        let response = ensure_success(response)?;
        let body: ProviderResponse = response
            .json()
            .await
            .map_err(|e| MediaError::Malformed(e.to_string()))?;
        let url = body
            .url
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| MediaError::Malformed(format!("no url in response from {endpoint}")))?;
        debug!(endpoint = %endpoint, url = %url, "Resolved media url");
        Ok(url)
    }

    pub async fn download(&self, url: &str) -> Result<MediaPayload, MediaError> {
        let response = self
            .client
            .get(url)
            .timeout(DOWNLOAD_TIMEOUT)
            .send()
            .await
            .map_err(http_error)?;
        let response = ensure_success(response)?;

        let mime = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<Mime>().ok())
            .unwrap_or(APPLICATION_OCTET_STREAM);
        let file_name = response
            .url()
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .filter(|s| !s.is_empty())
            .unwrap_or("interaction_media")
            .to_owned();
        let data = response.bytes().await.map_err(http_error)?.to_vec();
        debug!(url = %url, mime = %mime, bytes = data.len(), "Downloaded media");
        Ok(MediaPayload::new(data, mime, file_name))
    }
}

fn ensure_success(response: Response) -> Result<Response, MediaError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(MediaError::Status {
            status: status.as_u16(),
            url: response.url().to_string(),
        })
    }
}

#[allow(clippy::needless_pass_by_value)]
fn http_error(e: reqwest::Error) -> MediaError {
    MediaError::Http(e.to_string())
}
