//! HTTP collaborator seam
//!
//! The coordinator only sees [`ListFetcher`]; the production implementation
//! is [`HttpFetcher`] on top of `reqwest`.

use std::time::Duration;

use reqwest::header::{HeaderMap, ETAG, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED};
use reqwest::Client;

use crate::config::SyncConfig;
use crate::error::FetchError;
use crate::store::Subscription;

/// Cache validators sent with a conditional request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Validators {
    pub etag: Option<String>,
    pub last_modified: Option<String>,
}

impl From<&Subscription> for Validators {
    fn from(sub: &Subscription) -> Self {
        Self {
            etag: sub.etag.clone(),
            last_modified: sub.last_modified.clone(),
        }
    }
}

/// Raw response as seen by the coordinator.
#[derive(Debug, Clone, Default)]
pub struct FetchedList {
    pub status: u16,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
    pub body: Vec<u8>,
}

/// Transport used for subscription refreshes.
#[async_trait::async_trait]
pub trait ListFetcher: Send + Sync {
    /// Issue a conditional GET for `url`.
    async fn fetch(&self, url: &str, validators: &Validators) -> Result<FetchedList, FetchError>;
}

pub struct HttpFetcher {
    client: Client,
    max_body_bytes: u64,
}

impl HttpFetcher {
    pub fn new(config: &SyncConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(concat!("Sieve/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            max_body_bytes: config.max_body_bytes,
        })
    }
}

fn header_string(headers: &HeaderMap, name: reqwest::header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string())
}

#[async_trait::async_trait]
impl ListFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, validators: &Validators) -> Result<FetchedList, FetchError> {
        let mut request = self.client.get(url);
        if let Some(etag) = &validators.etag {
            request = request.header(IF_NONE_MATCH, etag.as_str());
        }
        if let Some(last_modified) = &validators.last_modified {
            request = request.header(IF_MODIFIED_SINCE, last_modified.as_str());
        }

        let mut response = request.send().await?;
        let status = response.status().as_u16();
        let etag = header_string(response.headers(), ETAG);
        let last_modified = header_string(response.headers(), LAST_MODIFIED);

        let mut fetched = FetchedList {
            status,
            etag,
            last_modified,
            body: Vec::new(),
        };

        if !response.status().is_success() {
            return Ok(fetched);
        }

        let limit = self.max_body_bytes;
        if let Some(size) = response.content_length() {
            if size > limit {
                return Err(FetchError::BodyTooLarge { size, limit });
            }
        }

        // Content-Length may be absent or wrong, so bound the stream too.
        while let Some(chunk) = response.chunk().await? {
            let size = (fetched.body.len() + chunk.len()) as u64;
            if size > limit {
                return Err(FetchError::BodyTooLarge { size, limit });
            }
            fetched.body.extend_from_slice(&chunk);
        }

        log::debug!("Fetched {} ({} bytes, status {})", url, fetched.body.len(), status);
        Ok(fetched)
    }
}
